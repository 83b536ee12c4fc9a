//! Generic fallback parser
//!
//! Loosest grammar in the set, for publishers without a dedicated parser
//! (Get Through SBAs, Rush question banks) and for unidentified documents.
//! Accepts either option-letter case and "a)" style markers, "Question N"
//! stems, inline answer markers in several spellings, and explanation
//! headers. Also runs a loose answer-map pass over the answers region for
//! questions that had no inline answer.

use super::{attach_answers, scan_answer_map, ParsedQuestion, QuestionParser};
use regex::Regex;
use std::sync::LazyLock;

static QUESTION_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:Question\s+)?(\d+)\.?\s+(.+)$").unwrap());
static OPTION_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Ea-e])[.)]\s+(.+)$").unwrap());
static INLINE_ANSWER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^.*?\b(?:answer|correct)(?:\s+is)?:?\s+([A-Ea-e])\b[.):]?\s*(.*)$").unwrap()
});
static EXPLANATION_HEAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:explanation|discussion):?\s*(.*)$").unwrap());

// Answer-map grammars, strictest first. The bare "N. b." form requires
// punctuation after the letter so ordinary prose ("12. A patient...") is
// not read as an answer.
static MAP_ANSWER_IS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d+)\.\s+(?:the\s+)?answer(?:\s+is)?:?\s+([A-Ea-e])\b\.?\s*(.*)$").unwrap()
});
static MAP_CORRECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(\d+)\.\s+correct:?\s+([A-Ea-e])\b\.?\s*(.*)$").unwrap());
static MAP_BARE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\.\s+([A-Ea-e])[.:]\s*(.*)$").unwrap());

pub struct GenericParser;

impl QuestionParser for GenericParser {
    fn name(&self) -> &'static str {
        "Generic"
    }

    fn parse(&self, questions_text: &str, answers_text: &str) -> Vec<ParsedQuestion> {
        let mut questions: Vec<ParsedQuestion> = Vec::new();
        let mut current: Option<ParsedQuestion> = None;
        let mut in_explanation = false;
        let mut last_letter: Option<char> = None;

        for raw in questions_text.lines() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            // Option check first: "d)" would otherwise be read as a number
            if let Some(caps) = OPTION_LINE.captures(line) {
                if let Some(q) = current.as_mut() {
                    let letter = caps[1].chars().next().unwrap().to_ascii_uppercase();
                    q.options.insert(letter, caps[2].trim().to_string());
                    last_letter = Some(letter);
                    in_explanation = false;
                }
                continue;
            }

            if let Some(caps) = QUESTION_LINE.captures(line) {
                if let Ok(number) = caps[1].parse::<u32>() {
                    close_question(&mut questions, current.take());
                    current = Some(ParsedQuestion::new(number, caps[2].trim().to_string()));
                    in_explanation = false;
                    last_letter = None;
                    continue;
                }
            }

            if let Some(caps) = INLINE_ANSWER.captures(line) {
                if let Some(q) = current.as_mut() {
                    if q.correct_answer.is_empty() {
                        q.correct_answer = caps[1].to_uppercase();
                        q.answer_details = caps[2].trim().to_string();
                        in_explanation = true;
                        continue;
                    }
                }
            }

            if !in_explanation {
                if let Some(caps) = EXPLANATION_HEAD.captures(line) {
                    if let Some(q) = current.as_mut() {
                        q.answer_details = caps[1].trim().to_string();
                        in_explanation = true;
                        continue;
                    }
                }
            }

            if let Some(q) = current.as_mut() {
                if in_explanation {
                    if !q.answer_details.is_empty() {
                        q.answer_details.push(' ');
                    }
                    q.answer_details.push_str(line);
                } else if q.options.is_empty() {
                    q.question.push(' ');
                    q.question.push_str(line);
                } else if let Some(letter) = last_letter {
                    if let Some(text) = q.options.get_mut(&letter) {
                        text.push(' ');
                        text.push_str(line);
                    }
                }
            }
        }

        close_question(&mut questions, current.take());

        let answers = scan_answer_map(answers_text, &[&MAP_ANSWER_IS, &MAP_CORRECT, &MAP_BARE]);
        attach_answers(&mut questions, &answers);
        questions
    }
}

fn close_question(questions: &mut Vec<ParsedQuestion>, current: Option<ParsedQuestion>) {
    let Some(mut q) = current else { return };
    if q.options.is_empty() {
        return;
    }
    if let Some(letter) = q.correct_answer.chars().next() {
        if !q.options.contains_key(&letter) {
            eprintln!(
                "[Parse] Answer {} for question {} has no matching option, leaving unresolved",
                letter, q.number
            );
            q.correct_answer.clear();
        }
    }
    q.answer_details = q.answer_details.trim().to_string();
    questions.push(q);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_prefix_and_paren_options() {
        let q = "Question 12 Which nerve is at risk during thyroidectomy?\n\
                 a) Vagus\nb) Recurrent laryngeal\nc) Phrenic\n";
        let a = "12. The answer is b. It runs in the tracheoesophageal groove.\n";
        let parsed = GenericParser.parse(q, a);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].number, 12);
        assert_eq!(parsed[0].options[&'B'], "Recurrent laryngeal");
        assert_eq!(parsed[0].correct_answer, "B");
        assert!(parsed[0].answer_details.contains("tracheoesophageal"));
    }

    #[test]
    fn test_inline_answer_with_explanation_header() {
        let q = "1. Pick one\nA. x\nB. y\nThe correct answer is B.\nExplanation: because y wins.\n";
        let parsed = GenericParser.parse(q, "");
        assert_eq!(parsed[0].correct_answer, "B");
        assert!(parsed[0].answer_details.contains("because y wins."));
    }

    #[test]
    fn test_bare_map_requires_punctuation_after_letter() {
        let q = "2. Q?\nA. x\nB. y\n";
        // "12. A patient..." must not be read as answer A for question 12
        let a = "2. B. Correct because y.\n12. A patient recovering from surgery.\n";
        let parsed = GenericParser.parse(q, a);
        assert_eq!(parsed[0].correct_answer, "B");
    }

    #[test]
    fn test_mixed_case_options_accepted() {
        let q = "1. Q?\nA. upper\nb. lower\n";
        let parsed = GenericParser.parse(q, "");
        assert_eq!(parsed[0].options.len(), 2);
        assert_eq!(parsed[0].options[&'B'], "lower");
    }
}
