//! Publisher format detection
//!
//! Each supported textbook family lays out questions, options, and answers
//! differently (uppercase vs lowercase option letters, "The answer is a."
//! vs "1. A." answer lines). Detection is two-stage: a filename substring
//! match is authoritative and short-circuits; otherwise weighted content
//! signatures accumulate per format and the highest score wins, ties broken
//! by enumeration order. Detection never fails; unknown input is Generic.

use crate::utils::safe_truncate;
use regex::Regex;
use std::sync::LazyLock;

/// How many leading bytes of the document participate in content scoring.
const DETECTION_WINDOW: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatTag {
    PreTest,
    Virgilio,
    Schwartz,
    GetThrough,
    Rush,
    Generic,
}

impl FormatTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormatTag::PreTest => "pretest",
            FormatTag::Virgilio => "virgilio",
            FormatTag::Schwartz => "schwartz",
            FormatTag::GetThrough => "getthrough",
            FormatTag::Rush => "rush",
            FormatTag::Generic => "generic",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pretest" => Some(FormatTag::PreTest),
            "virgilio" => Some(FormatTag::Virgilio),
            "schwartz" => Some(FormatTag::Schwartz),
            "getthrough" => Some(FormatTag::GetThrough),
            "rush" => Some(FormatTag::Rush),
            "generic" => Some(FormatTag::Generic),
            _ => None,
        }
    }

    /// Enumeration order used for tie-breaking during content scoring.
    fn scored() -> [FormatTag; 5] {
        [
            FormatTag::PreTest,
            FormatTag::Virgilio,
            FormatTag::Schwartz,
            FormatTag::GetThrough,
            FormatTag::Rush,
        ]
    }
}

/// Filename substrings that identify a publisher outright.
const FILENAME_MARKERS: [(&str, FormatTag); 6] = [
    ("pretest", FormatTag::PreTest),
    ("virgilio", FormatTag::Virgilio),
    ("schwartz", FormatTag::Schwartz),
    ("get through", FormatTag::GetThrough),
    ("getthrough", FormatTag::GetThrough),
    ("rush", FormatTag::Rush),
];

// PreTest: "N. The answer is a." answer lines, lowercase option columns
static PRETEST_ANSWER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^\d+\.\s+The answer is [a-e]\.").unwrap());
static LOWERCASE_OPTION_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\d+\.\s+.+\na\.\s+.+\nb\.\s+.+\nc\.\s+.+").unwrap());

// Virgilio: "ANSWERS" key with "N. A." entries, uppercase option columns
static VIRGILIO_ANSWER_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ANSWERS\s+\d+\.\s+[A-E]\.").unwrap());
static UPPERCASE_OPTION_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\d+\.\s+.+\nA\.\s+.+\nB\.\s+.+\nC\.\s+.+").unwrap());

// Schwartz: inline "Answer: X" after each question
static SCHWARTZ_ANSWER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Answer:\s+[A-E]").unwrap());

// Get Through SBAs: "Question N" headers (weak signal on its own)
static QUESTION_N_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bQuestion\s+\d+").unwrap());

/// Detect the publisher format for a document.
pub fn detect_format(text: &str, filename: &str) -> FormatTag {
    let lower_name = filename.to_lowercase();
    for (marker, tag) in FILENAME_MARKERS {
        if lower_name.contains(marker) {
            println!("[Format] Filename marker '{}' -> {}", marker, tag.as_str());
            return tag;
        }
    }

    let head = safe_truncate(text, DETECTION_WINDOW);
    let lower_head = head.to_lowercase();

    let mut best = FormatTag::Generic;
    let mut best_score = 0u32;
    for tag in FormatTag::scored() {
        let score = content_score(tag, head, &lower_head);
        // Strictly greater keeps the earlier-listed format on ties
        if score > best_score {
            best_score = score;
            best = tag;
        }
    }

    if best_score > 0 {
        println!("[Format] Content signatures -> {} (score {})", best.as_str(), best_score);
    }
    best
}

fn content_score(tag: FormatTag, head: &str, lower_head: &str) -> u32 {
    let mut score = 0;
    match tag {
        FormatTag::PreTest => {
            if lower_head.contains("pretest") || lower_head.contains("self-assessment and review") {
                score += 5;
            }
            if PRETEST_ANSWER_LINE.is_match(head) {
                score += 5;
            }
            if LOWERCASE_OPTION_BLOCK.is_match(head) {
                score += 3;
            }
        }
        FormatTag::Virgilio => {
            if lower_head.contains("de virgilio")
                || lower_head.contains("areg grigorian")
                || lower_head.contains("review of surgery for absite and boards")
            {
                score += 5;
            }
            if VIRGILIO_ANSWER_KEY.is_match(head) {
                score += 5;
            }
            if UPPERCASE_OPTION_BLOCK.is_match(head) {
                score += 3;
            }
        }
        FormatTag::Schwartz => {
            if lower_head.contains("schwartz") || lower_head.contains("principles of surgery") {
                score += 5;
            }
            if SCHWARTZ_ANSWER_LINE.is_match(head) {
                score += 5;
            }
        }
        FormatTag::GetThrough => {
            if lower_head.contains("get through sbas") {
                score += 5;
            }
            // "Question N" also appears in generic prose, so it only nudges
            if QUESTION_N_HEADER.is_match(head) {
                score += 2;
            }
        }
        FormatTag::Rush => {
            if lower_head.contains("rush university") || lower_head.contains("surgerybook") {
                score += 5;
            }
        }
        FormatTag::Generic => {}
    }
    score
}
