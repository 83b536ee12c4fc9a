//! Chapter-aware extraction pipeline
//!
//! Ties the core together: normalize, segment into chapters, parse each
//! chapter with the format's parser (or the selector when the format is
//! unconfirmed), then assign the document-wide order in a single fold once
//! every chapter has been parsed. Per-chapter extraction is pure and
//! order-independent; nothing here touches I/O beyond logging.

use crate::format::{detect_format, FormatTag};
use crate::normalize::normalize;
use crate::parsers::{parser_for, ParsedQuestion};
use crate::question::Question;
use crate::segmenter::{segment_chapters, ChapterRegion};
use crate::selector::select_best;

/// Detect the format from content and filename, then extract everything.
pub fn extract_document(text: &str, filename: &str, bookname: &str) -> (FormatTag, Vec<Question>) {
    let format = detect_format(text, filename);
    println!("[Extract] Detected format for {}: {}", bookname, format.as_str());
    let questions = extract_all_questions(text, format, bookname);
    (format, questions)
}

/// Extract all questions from all chapters of a document.
///
/// `setorder` is assigned exactly once, after per-chapter extraction
/// completes, by enumerating chapters in detected order and questions in
/// detected order within each chapter: a strictly increasing, gapless
/// sequence starting at 1.
pub fn extract_all_questions(text: &str, format: FormatTag, bookname: &str) -> Vec<Question> {
    let normalized = normalize(text);
    let chapters = segment_chapters(&normalized);
    println!("[Extract] Found {} chapters", chapters.len());

    let per_chapter: Vec<(String, u32, Vec<ParsedQuestion>)> = chapters
        .iter()
        .map(|chapter| {
            let parsed = extract_chapter(chapter, format);
            println!(
                "[Extract] Chapter '{}' ({}): {} questions",
                chapter.title,
                chapter.index,
                parsed.len()
            );
            (chapter.title.clone(), chapter.index, parsed)
        })
        .collect();

    let mut questions = Vec::new();
    let mut next_order = 1u32;
    for (title, index, parsed) in per_chapter {
        for p in parsed {
            questions.push(lift(p, &title, index, next_order, bookname));
            next_order += 1;
        }
    }
    questions
}

fn extract_chapter(chapter: &ChapterRegion, format: FormatTag) -> Vec<ParsedQuestion> {
    let Some(questions_text) = chapter.questions_text() else {
        println!(
            "[Extract] Skipping chapter '{}': no resolvable questions region",
            chapter.title
        );
        return Vec::new();
    };
    let answers_text = chapter.answers_text().unwrap_or("");

    match parser_for(format) {
        Some(parser) => parser.parse(questions_text, answers_text),
        None => {
            let (name, parsed) = select_best(questions_text, answers_text);
            println!("[Extract] Selector chose {} for chapter '{}'", name, chapter.title);
            parsed
        }
    }
}

fn lift(p: ParsedQuestion, chapter: &str, chapter_index: u32, setorder: u32, bookname: &str) -> Question {
    Question {
        question_number: p.number,
        question: p.question,
        options: p.options,
        correct_answer: p.correct_answer,
        answer_details: p.answer_details,
        chapter: chapter.to_string(),
        chapter_index,
        setorder,
        bookname: bookname.to_string(),
    }
}
