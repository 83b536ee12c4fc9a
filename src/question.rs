//! Canonical structured representation of one extracted multiple-choice question.
//!
//! Field names follow the persisted `quiz_questions` columns, so the same
//! struct serializes for the database layer, the HTTP API, and JSON dumps.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One extracted question with its options, answer, and chapter context.
///
/// `question_number` is unique within a chapter only; `setorder` is the
/// strictly increasing, document-wide sort key assigned after all chapters
/// are processed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Question {
    pub question_number: u32,
    pub question: String,
    /// Option letter (A-E) to option text. Keys form a contiguous prefix of
    /// A..E in the happy path but may be incomplete near page boundaries.
    pub options: BTreeMap<char, String>,
    /// One of the option letters, or empty when unresolved. Never a letter
    /// absent from `options`.
    pub correct_answer: String,
    pub answer_details: String,
    pub chapter: String,
    pub chapter_index: u32,
    pub setorder: u32,
    pub bookname: String,
}

impl Question {
    pub fn has_answer(&self) -> bool {
        !self.correct_answer.is_empty()
    }

    /// Option letters in alphabetical order (BTreeMap keys are sorted).
    pub fn option_letters(&self) -> Vec<char> {
        self.options.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Question {
        let mut options = BTreeMap::new();
        options.insert('B', "100C".to_string());
        options.insert('A', "50C".to_string());
        Question {
            question_number: 1,
            question: "What is the boiling point of water?".to_string(),
            options,
            correct_answer: "B".to_string(),
            answer_details: "Water boils at 100C at sea level.".to_string(),
            chapter: "Default Chapter".to_string(),
            chapter_index: 1,
            setorder: 1,
            bookname: "physics.pdf".to_string(),
        }
    }

    #[test]
    fn test_option_letters_sorted() {
        assert_eq!(sample().option_letters(), vec!['A', 'B']);
    }

    #[test]
    fn test_json_round_trip_uses_letter_keys() {
        let q = sample();
        let json = serde_json::to_string(&q).unwrap();
        assert!(json.contains(r#""A":"50C""#));
        let back: Question = serde_json::from_str(&json).unwrap();
        assert_eq!(back, q);
    }
}
