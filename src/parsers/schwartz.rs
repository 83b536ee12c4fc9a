//! Schwartz family parser
//!
//! "Principles of Surgery" review volumes carry the answer inline after
//! each question ("Answer: C" followed by the explanation) instead of a
//! separate answers section, so both regions are scanned as one stream and
//! the usual answer-map pass does not apply.

use super::{ParsedQuestion, QuestionParser};
use regex::Regex;
use std::sync::LazyLock;

static QUESTION_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\.\s+(.+)$").unwrap());
static OPTION_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([A-E])\.\s+(.+)$").unwrap());
static ANSWER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^Answer:?\s+([A-E])\b[.:]?\s*(.*)$").unwrap());

pub struct SchwartzParser;

impl QuestionParser for SchwartzParser {
    fn name(&self) -> &'static str {
        "Schwartz"
    }

    fn parse(&self, questions_text: &str, answers_text: &str) -> Vec<ParsedQuestion> {
        let mut questions: Vec<ParsedQuestion> = Vec::new();
        let mut current: Option<ParsedQuestion> = None;
        let mut in_explanation = false;

        for raw in questions_text.lines().chain(answers_text.lines()) {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(caps) = QUESTION_LINE.captures(line) {
                if let Ok(number) = caps[1].parse::<u32>() {
                    close_question(&mut questions, current.take());
                    current = Some(ParsedQuestion::new(number, caps[2].trim().to_string()));
                    in_explanation = false;
                    continue;
                }
            }

            if let Some(caps) = OPTION_LINE.captures(line) {
                if let Some(q) = current.as_mut() {
                    let letter = caps[1].chars().next().unwrap();
                    q.options.insert(letter, caps[2].trim().to_string());
                }
                continue;
            }

            if let Some(caps) = ANSWER_LINE.captures(line) {
                if let Some(q) = current.as_mut() {
                    q.correct_answer = caps[1].to_uppercase();
                    q.answer_details = caps[2].trim().to_string();
                    in_explanation = true;
                }
                continue;
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
                }
            }
        }

        close_question(&mut questions, current.take());
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
    questions.push(q);
}
