//! Structural validation of extracted questions
//!
//! Splits a question sequence into a valid set and an incomplete set.
//! Truncation artifacts cluster at the end of a page-bounded extraction
//! window, so only suspects in the last few positions are withheld for
//! completion from an extended window; suspects elsewhere are logged but
//! kept, since the window is not trusted to localize all truncation.

use crate::question::Question;

/// Trailing window where incompleteness is attributed to page truncation.
const TAIL_WINDOW: usize = 3;
/// Stems shorter than this are parsing noise, not questions.
const MIN_STEM_LEN: usize = 10;

/// Classify questions into (valid, incomplete).
///
/// Questions with a missing number or a sub-minimal stem appear in neither
/// set.
pub fn validate_questions(questions: Vec<Question>) -> (Vec<Question>, Vec<Question>) {
    let total = questions.len();
    let mut valid = Vec::new();
    let mut incomplete = Vec::new();

    for (idx, q) in questions.into_iter().enumerate() {
        if q.question_number == 0 || q.question.trim().len() < MIN_STEM_LEN {
            continue;
        }

        if is_suspect(&q) {
            if idx + TAIL_WINDOW >= total {
                incomplete.push(q);
            } else {
                println!(
                    "[Validate] Question {} in '{}' looks incomplete mid-sequence, keeping",
                    q.question_number, q.chapter
                );
                valid.push(q);
            }
        } else {
            valid.push(q);
        }
    }

    (valid, incomplete)
}

fn is_suspect(q: &Question) -> bool {
    let letters = q.option_letters();

    if letters.len() < 2 {
        return true;
    }

    // Option letters must be an exact contiguous prefix of A, B, C, ...
    let contiguous = letters
        .iter()
        .enumerate()
        .all(|(i, &letter)| letter == (b'A' + i as u8) as char);
    if !contiguous {
        return true;
    }

    // A last option that stops mid-sentence suggests a page boundary cut
    if let Some(last) = letters.last() {
        let text = q.options[last].trim_end();
        if !text.ends_with(['.', '?', '!', ':', ';']) {
            return true;
        }
    }

    // An answer letter without its explanation means the answers section
    // itself was cut short
    if q.has_answer() && q.answer_details.trim().is_empty() {
        return true;
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn question(number: u32, letters: &[(char, &str)]) -> Question {
        let mut options = BTreeMap::new();
        for (letter, text) in letters {
            options.insert(*letter, text.to_string());
        }
        Question {
            question_number: number,
            question: "A question of sufficient length?".to_string(),
            options,
            correct_answer: String::new(),
            answer_details: String::new(),
            chapter: "Default Chapter".to_string(),
            chapter_index: 1,
            setorder: number,
            bookname: "book.pdf".to_string(),
        }
    }

    fn complete(number: u32) -> Question {
        question(number, &[('A', "first."), ('B', "second.")])
    }

    #[test]
    fn test_short_stem_dropped_entirely() {
        let mut q = complete(1);
        q.question = "Too short".to_string(); // 9 chars
        let (valid, incomplete) = validate_questions(vec![q]);
        assert!(valid.is_empty());
        assert!(incomplete.is_empty());
    }

    #[test]
    fn test_missing_number_dropped_entirely() {
        let mut q = complete(1);
        q.question_number = 0;
        let (valid, incomplete) = validate_questions(vec![q]);
        assert!(valid.is_empty());
        assert!(incomplete.is_empty());
    }

    #[test]
    fn test_single_option_at_tail_goes_incomplete() {
        let questions = vec![
            complete(1),
            complete(2),
            complete(3),
            question(4, &[('A', "alone.")]),
        ];
        let (valid, incomplete) = validate_questions(questions);
        assert_eq!(valid.len(), 3);
        assert_eq!(incomplete.len(), 1);
        assert_eq!(incomplete[0].question_number, 4);
    }

    #[test]
    fn test_single_option_mid_sequence_stays_valid() {
        let questions = vec![
            question(1, &[('A', "alone.")]),
            complete(2),
            complete(3),
            complete(4),
        ];
        let (valid, incomplete) = validate_questions(questions);
        assert_eq!(valid.len(), 4);
        assert!(incomplete.is_empty());
    }

    #[test]
    fn test_non_contiguous_letters_flagged() {
        let questions = vec![
            complete(1),
            complete(2),
            complete(3),
            question(4, &[('A', "first."), ('C', "skipped B.")]),
        ];
        let (_, incomplete) = validate_questions(questions);
        assert_eq!(incomplete.len(), 1);
    }

    #[test]
    fn test_unterminated_last_option_flagged_at_tail() {
        let q = question(1, &[('A', "complete."), ('B', "cut off mid sent")]);
        let (valid, incomplete) = validate_questions(vec![q]);
        assert!(valid.is_empty());
        assert_eq!(incomplete.len(), 1);
    }

    #[test]
    fn test_answer_without_explanation_flagged_at_tail() {
        let mut q = complete(1);
        q.correct_answer = "A".to_string();
        let (valid, incomplete) = validate_questions(vec![q]);
        assert!(valid.is_empty());
        assert_eq!(incomplete.len(), 1);
    }

    #[test]
    fn test_complete_question_with_answer_and_explanation_valid() {
        let mut q = complete(1);
        q.correct_answer = "A".to_string();
        q.answer_details = "Because the first option is right.".to_string();
        let (valid, incomplete) = validate_questions(vec![q]);
        assert_eq!(valid.len(), 1);
        assert!(incomplete.is_empty());
    }
}
