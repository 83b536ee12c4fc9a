//! Reconciling question sets from overlapping extraction windows
//!
//! When a page range is extended to complete questions cut off at a window
//! boundary, both windows see partial views of the same questions. Merging
//! is keyed by question number: the longer field value wins, and an answer
//! already present in the first set takes precedence over a conflicting one
//! from the second.

use crate::question::Question;

/// Merge two question sets keyed by question number.
///
/// Questions present in only one set pass through unchanged. Idempotent on
/// identical inputs; on conflicting non-empty answers the first set wins.
pub fn merge_questions(first: Vec<Question>, second: Vec<Question>) -> Vec<Question> {
    if first.is_empty() {
        return second;
    }
    if second.is_empty() {
        return first;
    }

    let mut merged = first;
    for q2 in second {
        let Some(idx) =
            merged.iter().position(|q| q.question_number == q2.question_number)
        else {
            merged.push(q2);
            continue;
        };
        let existing = &mut merged[idx];

        if q2.question.len() > existing.question.len() {
            existing.question = q2.question;
        }

        // Options first: the answer check below relies on the merged keys
        for (letter, text) in q2.options {
            let keep_existing =
                existing.options.get(&letter).map(|t| t.len() >= text.len()).unwrap_or(false);
            if !keep_existing {
                existing.options.insert(letter, text);
            }
        }

        if existing.correct_answer.is_empty() && !q2.correct_answer.is_empty() {
            existing.correct_answer = q2.correct_answer;
        }

        if q2.answer_details.len() > existing.answer_details.len() {
            existing.answer_details = q2.answer_details;
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn question(number: u32, stem: &str, options: &[(char, &str)], answer: &str) -> Question {
        let mut opts = BTreeMap::new();
        for (letter, text) in options {
            opts.insert(*letter, text.to_string());
        }
        Question {
            question_number: number,
            question: stem.to_string(),
            options: opts,
            correct_answer: answer.to_string(),
            answer_details: String::new(),
            chapter: "Default Chapter".to_string(),
            chapter_index: 1,
            setorder: number,
            bookname: "book.pdf".to_string(),
        }
    }

    #[test]
    fn test_disjoint_sets_concatenate() {
        let a = vec![question(1, "First question?", &[('A', "x.")], "")];
        let b = vec![question(2, "Second question?", &[('A', "y.")], "")];
        let merged = merge_questions(a, b);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_longer_fields_win() {
        let a = vec![question(1, "Truncated stem", &[('A', "short"), ('B', "kept.")], "")];
        let b = vec![question(
            1,
            "Truncated stem now completed by the wider window?",
            &[('A', "short but longer."), ('C', "new option.")],
            "",
        )];
        let merged = merge_questions(a, b);
        assert_eq!(merged.len(), 1);
        assert!(merged[0].question.ends_with("window?"));
        assert_eq!(merged[0].options[&'A'], "short but longer.");
        assert_eq!(merged[0].options[&'B'], "kept.");
        assert_eq!(merged[0].options[&'C'], "new option.");
    }

    #[test]
    fn test_answer_filled_from_second_when_missing() {
        let a = vec![question(1, "A question here?", &[('A', "x."), ('B', "y.")], "")];
        let b = vec![question(1, "A question here?", &[('A', "x."), ('B', "y.")], "B")];
        let merged = merge_questions(a, b);
        assert_eq!(merged[0].correct_answer, "B");
    }

    #[test]
    fn test_conflicting_answers_keep_first() {
        let a = vec![question(1, "A question here?", &[('A', "x."), ('B', "y.")], "A")];
        let b = vec![question(1, "A question here?", &[('A', "x."), ('B', "y.")], "B")];
        let merged = merge_questions(a, b);
        assert_eq!(merged[0].correct_answer, "A");
    }

    #[test]
    fn test_idempotent_on_identical_inputs() {
        let a = vec![
            question(1, "A question here?", &[('A', "x."), ('B', "y.")], "A"),
            question(2, "Another question?", &[('A', "p."), ('B', "q.")], ""),
        ];
        let merged = merge_questions(a.clone(), a.clone());
        assert_eq!(merged, a);
    }

    #[test]
    fn test_empty_sides_pass_through() {
        let a = vec![question(1, "A question here?", &[('A', "x.")], "")];
        assert_eq!(merge_questions(a.clone(), Vec::new()), a);
        assert_eq!(merge_questions(Vec::new(), a.clone()), a);
    }
}
