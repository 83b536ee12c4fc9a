use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Result};
use std::path::Path;
use std::sync::Mutex;

use super::models::{ChapterSummary, JobStatus, ParseJob};
use crate::question::Question;

pub struct Database {
    conn: Mutex<Connection>,
    path: String,
}

impl Database {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let conn = Connection::open(&path)?;
        let db = Database { conn: Mutex::new(conn), path: path_str };
        db.init()?;
        Ok(db)
    }

    pub fn get_path(&self) -> String {
        self.path.clone()
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn: Mutex::new(conn), path: ":memory:".to_string() };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS quiz_questions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                question TEXT NOT NULL,
                options TEXT NOT NULL,      -- JSON map of option letter to text
                correct_answer TEXT NOT NULL DEFAULT '',
                answer_details TEXT NOT NULL DEFAULT '',
                chapter TEXT NOT NULL DEFAULT '',
                chapter_index INTEGER NOT NULL DEFAULT 0,
                question_number INTEGER NOT NULL DEFAULT 0,
                -- Document-wide sort key assigned by the extraction pipeline
                setorder INTEGER NOT NULL DEFAULT 0,
                bookname TEXT NOT NULL,
                active INTEGER NOT NULL DEFAULT 1,
                created_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_questions_bookname ON quiz_questions(bookname);
            CREATE INDEX IF NOT EXISTS idx_questions_setorder ON quiz_questions(bookname, setorder);

            CREATE TABLE IF NOT EXISTS parse_jobs (
                id TEXT PRIMARY KEY,
                book TEXT NOT NULL,
                range TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                logs TEXT NOT NULL DEFAULT '{}',
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_jobs_status ON parse_jobs(status, created_at);
            ",
        )?;

        Ok(())
    }

    // ==================== Questions ====================

    /// Insert one chunk of questions inside a single transaction.
    ///
    /// The job driver slices the full set into bounded chunks and pauses
    /// between them; a failed chunk rolls back only itself.
    pub fn insert_question_chunk(&self, questions: &[Question]) -> Result<usize> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let now = Utc::now().timestamp_millis();
        {
            let mut stmt = tx.prepare(
                "INSERT INTO quiz_questions
                 (question, options, correct_answer, answer_details, chapter,
                  chapter_index, question_number, setorder, bookname, active, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 1, ?10)",
            )?;
            for q in questions {
                let options_json =
                    serde_json::to_string(&q.options).unwrap_or_else(|_| "{}".to_string());
                stmt.execute(params![
                    q.question,
                    options_json,
                    q.correct_answer,
                    q.answer_details,
                    q.chapter,
                    q.chapter_index,
                    q.question_number,
                    q.setorder,
                    q.bookname,
                    now,
                ])?;
            }
        }
        tx.commit()?;
        Ok(questions.len())
    }

    pub fn question_count_for_book(&self, book: &str) -> Result<u32> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT COUNT(*) FROM quiz_questions WHERE bookname = ?1 AND active = 1",
            params![book],
            |row| row.get(0),
        )
    }

    /// Distinct chapters of a book in reading order.
    pub fn chapters_for_book(&self, book: &str) -> Result<Vec<ChapterSummary>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT DISTINCT chapter, chapter_index FROM quiz_questions
             WHERE bookname = ?1 ORDER BY chapter_index ASC",
        )?;
        let rows = stmt.query_map(params![book], |row| {
            Ok(ChapterSummary { chapter: row.get(0)?, chapter_index: row.get(1)? })
        })?;
        rows.collect()
    }

    // ==================== Jobs ====================

    pub fn create_job(&self, book: &str, range: &str) -> Result<ParseJob> {
        let now = Utc::now().timestamp_millis();
        let job = ParseJob {
            id: uuid::Uuid::new_v4().to_string(),
            book: book.to_string(),
            range: range.to_string(),
            status: JobStatus::Pending,
            logs: serde_json::json!({}),
            created_at: now,
            updated_at: now,
        };

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO parse_jobs (id, book, range, status, logs, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                job.id,
                job.book,
                job.range,
                job.status.as_str(),
                job.logs.to_string(),
                job.created_at,
                job.updated_at,
            ],
        )?;
        Ok(job)
    }

    pub fn get_job(&self, id: &str) -> Result<Option<ParseJob>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, book, range, status, logs, created_at, updated_at
             FROM parse_jobs WHERE id = ?1",
            params![id],
            job_from_row,
        )
        .optional()
    }

    /// Oldest pending job, if any. The poll loop takes one at a time so
    /// extraction jobs never run concurrently.
    pub fn fetch_oldest_pending(&self) -> Result<Option<ParseJob>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, book, range, status, logs, created_at, updated_at
             FROM parse_jobs WHERE status = 'pending'
             ORDER BY created_at ASC LIMIT 1",
            [],
            job_from_row,
        )
        .optional()
    }

    /// Set a job's status and merge new log fields into the existing logs.
    ///
    /// Existing log keys survive unless the patch rewrites them; a
    /// `lastUpdated` timestamp is stamped on every merge.
    pub fn update_job_status(
        &self,
        id: &str,
        status: JobStatus,
        log_patch: &serde_json::Value,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        let current: Option<String> = conn
            .query_row("SELECT logs FROM parse_jobs WHERE id = ?1", params![id], |row| row.get(0))
            .optional()?;
        let mut logs: serde_json::Value = current
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_else(|| serde_json::json!({}));

        if let Some(target) = logs.as_object_mut() {
            if let Some(patch) = log_patch.as_object() {
                for (key, value) in patch {
                    target.insert(key.clone(), value.clone());
                }
            }
            target.insert("lastUpdated".to_string(), serde_json::json!(Utc::now().to_rfc3339()));
        }

        let updated = conn.execute(
            "UPDATE parse_jobs SET status = ?1, logs = ?2, updated_at = ?3 WHERE id = ?4",
            params![status.as_str(), logs.to_string(), Utc::now().timestamp_millis(), id],
        )?;
        if updated == 0 {
            return Err(rusqlite::Error::QueryReturnedNoRows);
        }
        Ok(())
    }
}

fn job_from_row(row: &rusqlite::Row) -> Result<ParseJob> {
    let status: String = row.get(3)?;
    let logs: String = row.get(4)?;
    Ok(ParseJob {
        id: row.get(0)?,
        book: row.get(1)?,
        range: row.get(2)?,
        status: JobStatus::from_str(&status).unwrap_or(JobStatus::Pending),
        logs: serde_json::from_str(&logs).unwrap_or_else(|_| serde_json::json!({})),
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}
