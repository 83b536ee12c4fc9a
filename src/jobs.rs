//! Job driver
//!
//! Polls for pending extraction jobs one at a time and walks each through
//! the pipeline: validate inputs, fetch page-range text, detect the format,
//! pattern extraction, structural validation, the generative fallback when
//! yield is weak, then batched persistence. Status updates fire at each
//! milestone and merge their log fields into the job's prior logs.
//!
//! Error policy: input errors fail the job immediately; parsing weaknesses
//! degrade to the selector or the generative fallback; persistence accepts
//! partial success (failed chunks are logged and skipped); only "pattern
//! extraction weak AND fallback empty" aborts the job.

use crate::ai_extractor::{self, FALLBACK_THRESHOLD};
use crate::db::{Database, JobStatus, ParseJob};
use crate::extract::extract_document;
use crate::merge::merge_questions;
use crate::pdf::Bookshelf;
use crate::question::Question;
use crate::validator::validate_questions;
use chrono::Utc;
use regex::Regex;
use serde_json::json;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use thiserror::Error;

/// Questions inserted per transaction; keeps individual writes bounded.
const CHUNK_SIZE: usize = 20;
/// Pause between chunks so bulk inserts don't monopolize the store.
const CHUNK_PAUSE_MS: u64 = 500;
/// Page ranges yielding less text than this are not plausible content.
const MIN_TEXT_LEN: usize = 500;
/// Status updates retry with exponential backoff up to this many attempts.
const STATUS_MAX_RETRIES: u32 = 3;
/// One pending job is taken per tick, so extraction never runs concurrently.
const POLL_INTERVAL_SECS: u64 = 60;
/// Pages probed beyond the window when tail questions look truncated.
const EXTENSION_PROBE_PAGES: u32 = 5;

static ANSWERS_AHEAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^\s*(?:Answers|Answer Key|(?:\d+\.\s+)?The answer is)").unwrap()
});

#[derive(Debug, Error)]
pub enum JobError {
    /// Malformed page range, missing book, implausibly short text
    #[error("invalid parameters: {0}")]
    InvalidInput(String),
    /// Reading the page-range text failed
    #[error("PDF extraction error: {0}")]
    TextSource(String),
    /// Pattern extraction weak and the generative fallback returned nothing
    #[error("no valid questions found in specified page range")]
    NoQuestions,
    /// Every persistence chunk failed
    #[error("failed to save questions to database: {0}")]
    Storage(String),
}

/// Parse an inclusive "start-end" page range.
pub fn parse_page_range(range: &str) -> Result<(u32, u32), JobError> {
    let (start, end) = range
        .split_once('-')
        .ok_or_else(|| JobError::InvalidInput(format!("malformed page range '{}'", range)))?;
    let start: u32 = start
        .trim()
        .parse()
        .map_err(|_| JobError::InvalidInput(format!("malformed page range '{}'", range)))?;
    let end: u32 = end
        .trim()
        .parse()
        .map_err(|_| JobError::InvalidInput(format!("malformed page range '{}'", range)))?;
    if start == 0 || start >= end {
        return Err(JobError::InvalidInput(format!(
            "page range must satisfy 1 <= start < end, got '{}'",
            range
        )));
    }
    Ok((start, end))
}

/// Poll for pending jobs forever, processing the oldest one per tick.
pub async fn poll_loop(db: Arc<Database>, shelf: Arc<Bookshelf>) {
    let mut interval = tokio::time::interval(Duration::from_secs(POLL_INTERVAL_SECS));
    loop {
        interval.tick().await;
        match db.fetch_oldest_pending() {
            Ok(Some(job)) => process_job(&db, &shelf, &job).await,
            Ok(None) => {}
            Err(e) => eprintln!("[Jobs] Error fetching pending jobs: {}", e),
        }
    }
}

/// Run one job to completion, recording success or failure on the job row.
/// This is the only catch-and-record boundary in the pipeline.
pub async fn process_job(db: &Database, shelf: &Bookshelf, job: &ParseJob) {
    println!("[Jobs] Starting job {} for {}, pages {}", job.id, job.book, job.range);

    update_status_with_retry(
        db,
        &job.id,
        JobStatus::Processing,
        json!({ "startedAt": Utc::now().to_rfc3339() }),
    )
    .await;

    match run_job(db, shelf, job).await {
        Ok(outcome) => {
            update_status_with_retry(
                db,
                &job.id,
                JobStatus::Completed,
                json!({
                    "questionCount": outcome.saved,
                    "pageRange": job.range,
                    "format": outcome.format,
                    "completedAt": Utc::now().to_rfc3339(),
                }),
            )
            .await;
            println!("[Jobs] Job {} completed: {} questions saved", job.id, outcome.saved);
        }
        Err(e) => {
            eprintln!("[Jobs] Job {} failed: {}", job.id, e);
            update_status_with_retry(
                db,
                &job.id,
                JobStatus::Failed,
                json!({ "error": e.to_string(), "failedAt": Utc::now().to_rfc3339() }),
            )
            .await;
        }
    }
}

struct JobOutcome {
    saved: usize,
    format: String,
}

async fn run_job(db: &Database, shelf: &Bookshelf, job: &ParseJob) -> Result<JobOutcome, JobError> {
    if job.book.trim().is_empty() {
        return Err(JobError::InvalidInput("missing book name".to_string()));
    }
    let (start, end) = parse_page_range(&job.range)?;

    update_status_with_retry(
        db,
        &job.id,
        JobStatus::Processing,
        json!({ "progress": "File validated, extracting text..." }),
    )
    .await;

    let text = shelf.page_range_text(&job.book, start, end).map_err(JobError::TextSource)?;
    if text.trim().len() < MIN_TEXT_LEN {
        return Err(JobError::InvalidInput(format!(
            "insufficient text extracted from pages {}-{}",
            start, end
        )));
    }

    let (format, questions) = extract_document(&text, &job.book, &job.book);
    update_status_with_retry(
        db,
        &job.id,
        JobStatus::Processing,
        json!({
            "progress": format!("Format detected: {}, processing content...", format.as_str()),
            "detectedFormat": format.as_str(),
        }),
    )
    .await;
    println!("[Jobs] Pattern-based extraction found {} questions", questions.len());

    let (valid, incomplete) = validate_questions(questions);

    if !incomplete.is_empty() {
        println!("[Jobs] Detected {} potentially incomplete questions", incomplete.len());
        save_incomplete_questions(&incomplete, &job.book);
        suggest_extension(db, shelf, job, start, end, &incomplete).await;
    }

    let mut final_questions = valid;
    if final_questions.len() < FALLBACK_THRESHOLD {
        update_status_with_retry(
            db,
            &job.id,
            JobStatus::Processing,
            json!({ "progress": "Pattern extraction insufficient, using AI extraction..." }),
        )
        .await;

        let ai_questions = ai_extractor::extract_questions_ai(&text, &job.book).await;
        if !ai_questions.is_empty() {
            final_questions = ai_questions;
        }
    }

    if final_questions.is_empty() {
        return Err(JobError::NoQuestions);
    }

    update_status_with_retry(
        db,
        &job.id,
        JobStatus::Processing,
        json!({
            "progress": format!("Extracted {} questions, saving...", final_questions.len()),
            "extractedCount": final_questions.len(),
        }),
    )
    .await;

    let saved = save_in_chunks(db, &final_questions).await?;
    Ok(JobOutcome { saved, format: format.as_str().to_string() })
}

/// Insert questions in bounded chunks with a pause between them.
///
/// A failed chunk is logged and skipped; only all chunks failing is an
/// error.
pub async fn save_in_chunks(db: &Database, questions: &[Question]) -> Result<usize, JobError> {
    let total_chunks = questions.len().div_ceil(CHUNK_SIZE);
    let mut saved = 0usize;

    for (i, chunk) in questions.chunks(CHUNK_SIZE).enumerate() {
        println!("[Jobs] Inserting chunk {}/{} ({} questions)", i + 1, total_chunks, chunk.len());
        match db.insert_question_chunk(chunk) {
            Ok(n) => saved += n,
            Err(e) => eprintln!("[Jobs] Chunk {} failed, skipping: {}", i + 1, e),
        }
        if i + 1 < total_chunks {
            tokio::time::sleep(Duration::from_millis(CHUNK_PAUSE_MS)).await;
        }
    }

    if saved == 0 {
        return Err(JobError::Storage("every chunk failed".to_string()));
    }
    println!("[Jobs] Successfully saved {} of {} questions", saved, questions.len());
    Ok(saved)
}

/// Update a job's status, retrying with exponential backoff. Exhausting the
/// retries is logged and swallowed: a lost status update must not kill the
/// extraction itself.
pub async fn update_status_with_retry(
    db: &Database,
    id: &str,
    status: JobStatus,
    logs: serde_json::Value,
) {
    let mut attempt = 0;
    loop {
        match db.update_job_status(id, status, &logs) {
            Ok(()) => return,
            Err(e) => {
                attempt += 1;
                eprintln!("[Jobs] Error updating job status (attempt {}): {}", attempt, e);
                if attempt >= STATUS_MAX_RETRIES {
                    eprintln!(
                        "[Jobs] Failed to update job {} after {} attempts",
                        id, STATUS_MAX_RETRIES
                    );
                    return;
                }
                tokio::time::sleep(Duration::from_secs(2u64.pow(attempt))).await;
            }
        }
    }
}

/// Probe the pages just past the window; when they appear to hold the tail
/// questions' completions or the answers section, record a suggested
/// extended range in the job logs.
async fn suggest_extension(
    db: &Database,
    shelf: &Bookshelf,
    job: &ParseJob,
    start: u32,
    end: u32,
    incomplete: &[Question],
) {
    let Ok(total_pages) = shelf.page_count(&job.book) else { return };
    let probe_end = (end + EXTENSION_PROBE_PAGES).min(total_pages);
    if probe_end <= end {
        return;
    }

    match shelf.page_range_text(&job.book, end + 1, probe_end) {
        Ok(ahead) if window_extension_needed(&ahead, incomplete) => {
            println!("[Jobs] Suggesting expanded page range: {}-{}", start, probe_end);
            update_status_with_retry(
                db,
                &job.id,
                JobStatus::Processing,
                json!({ "suggestedNextRange": format!("{}-{}", start, probe_end) }),
            )
            .await;
        }
        Ok(_) => {}
        Err(e) => eprintln!("[Jobs] Probe of pages {}-{} failed: {}", end + 1, probe_end, e),
    }
}

/// True when the probed text contains an answers heading or a tail
/// question's number / leading stem words.
pub fn window_extension_needed(extended_text: &str, incomplete: &[Question]) -> bool {
    if ANSWERS_AHEAD.is_match(extended_text) {
        return true;
    }
    incomplete.iter().any(|q| {
        let number_marker = format!("{}.", q.question_number);
        let stem_prefix: String =
            q.question.split_whitespace().take(3).collect::<Vec<_>>().join(" ");
        extended_text.contains(&number_marker)
            || (!stem_prefix.is_empty() && extended_text.contains(&stem_prefix))
    })
}

/// Append tail-incomplete questions to the book's side file so an extended
/// window can merge and complete them later.
pub fn save_incomplete_questions(questions: &[Question], book: &str) {
    if questions.is_empty() {
        return;
    }

    let safe_book: String = book.split_whitespace().collect::<Vec<_>>().join("_");
    let filename = format!("incomplete_questions_{}.json", safe_book);

    let existing: Vec<Question> = std::fs::read_to_string(&filename)
        .ok()
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default();
    let merged = merge_questions(existing, questions.to_vec());

    match serde_json::to_string_pretty(&merged) {
        Ok(content) => match std::fs::write(&filename, content) {
            Ok(()) => println!(
                "[Jobs] Saved {} incomplete questions to {}",
                questions.len(),
                filename
            ),
            Err(e) => eprintln!("[Jobs] Failed to save incomplete questions: {}", e),
        },
        Err(e) => eprintln!("[Jobs] Failed to serialize incomplete questions: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_parse_page_range_happy_path() {
        assert_eq!(parse_page_range("10-25").unwrap(), (10, 25));
        assert_eq!(parse_page_range(" 1 - 2 ").unwrap(), (1, 2));
    }

    #[test]
    fn test_parse_page_range_rejects_malformed() {
        assert!(parse_page_range("").is_err());
        assert!(parse_page_range("10").is_err());
        assert!(parse_page_range("a-b").is_err());
        assert!(parse_page_range("0-5").is_err());
        assert!(parse_page_range("9-9").is_err());
        assert!(parse_page_range("25-10").is_err());
    }

    fn incomplete_question(number: u32, stem: &str) -> Question {
        let mut options = BTreeMap::new();
        options.insert('A', "alone".to_string());
        Question {
            question_number: number,
            question: stem.to_string(),
            options,
            correct_answer: String::new(),
            answer_details: String::new(),
            chapter: "Default Chapter".to_string(),
            chapter_index: 1,
            setorder: number,
            bookname: "book.pdf".to_string(),
        }
    }

    #[test]
    fn test_extension_needed_on_answers_heading() {
        let q = [incomplete_question(7, "A truncated question stem here")];
        assert!(window_extension_needed("prose\nAnswers\n7. B. Because.", &q));
        assert!(window_extension_needed("1. The answer is b. Reasons.", &q));
    }

    #[test]
    fn test_extension_needed_on_stem_continuation() {
        let q = [incomplete_question(7, "A truncated question stem here")];
        assert!(window_extension_needed("unrelated 7. more text", &q));
        assert!(window_extension_needed("...A truncated question continues", &q));
        assert!(!window_extension_needed("nothing relevant at all", &q));
    }

    #[tokio::test]
    async fn test_save_in_chunks_partial_batches() {
        let db = Database::in_memory().unwrap();
        let questions: Vec<Question> = (1..=45)
            .map(|i| {
                let mut q = incomplete_question(i, "A question of sufficient length?");
                q.setorder = i;
                q
            })
            .collect();
        let saved = save_in_chunks(&db, &questions).await.unwrap();
        assert_eq!(saved, 45);
        assert_eq!(db.question_count_for_book("book.pdf").unwrap(), 45);
    }
}
