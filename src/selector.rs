//! Parser selection and quality scoring
//!
//! When no format is confirmed, every parser variant runs against the same
//! chapter regions and the highest-scoring result set wins. The score
//! rewards volume and completeness together: the 10-points-per-question
//! floor keeps count competitive only up to roughly one fully-complete
//! question per ten weak stubs, so a parser spraying low-quality fragments
//! does not beat one producing fewer solid records.

use crate::parsers::{all_parsers, ParsedQuestion};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Explanations shorter than this don't count toward the completeness score.
const MIN_EXPLANATION_LEN: usize = 30;

/// Heuristic completeness/volume score for a parsed-question set.
///
/// `score = 10*count + 50*frac(>=3 options) + 30*frac(answered)
///        + 20*frac(explained)`; empty input scores 0.
pub fn score_questions(questions: &[ParsedQuestion]) -> f64 {
    if questions.is_empty() {
        return 0.0;
    }
    let count = questions.len() as f64;

    let with_options = questions.iter().filter(|q| q.options.len() >= 3).count() as f64;
    let with_answers =
        questions.iter().filter(|q| !q.correct_answer.trim().is_empty()).count() as f64;
    let with_explanations =
        questions.iter().filter(|q| q.answer_details.len() > MIN_EXPLANATION_LEN).count() as f64;

    count * 10.0
        + (with_options / count) * 50.0
        + (with_answers / count) * 30.0
        + (with_explanations / count) * 20.0
}

/// Run every parser variant and keep the best-scoring result.
///
/// A parser that panics internally scores zero and is excluded; nothing
/// propagates. Ties keep the earlier-listed parser.
pub fn select_best(questions_text: &str, answers_text: &str) -> (&'static str, Vec<ParsedQuestion>) {
    let mut best_name = "none";
    let mut best: Vec<ParsedQuestion> = Vec::new();
    let mut best_score = 0.0;

    for parser in all_parsers() {
        let name = parser.name();
        let result =
            match catch_unwind(AssertUnwindSafe(|| parser.parse(questions_text, answers_text))) {
                Ok(r) => r,
                Err(_) => {
                    eprintln!("[Select] {} parser failed, scoring zero", name);
                    continue;
                }
            };

        let score = score_questions(&result);
        println!(
            "[Select] {} parser: {} questions, quality score {:.2}",
            name,
            result.len(),
            score
        );
        if score > best_score {
            best_score = score;
            best = result;
            best_name = name;
        }
    }

    (best_name, best)
}
