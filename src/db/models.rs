use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "processing" => Some(JobStatus::Processing),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }
}

/// One extraction job as queued and tracked in `parse_jobs`.
///
/// `logs` is a JSON object that accumulates milestone fields across status
/// updates; updates merge into it, never replace it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseJob {
    pub id: String,
    pub book: String,
    /// Inclusive page range, "start-end"
    pub range: String,
    pub status: JobStatus,
    pub logs: serde_json::Value,
    pub created_at: i64,
    pub updated_at: i64,
}

/// One distinct chapter of a book, for the chapters listing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterSummary {
    pub chapter: String,
    pub chapter_index: u32,
}
