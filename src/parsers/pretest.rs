//! PreTest family parser
//!
//! "PreTest Self-Assessment and Review" volumes use lowercase option
//! columns ("a. ...") and prose answer lines ("7. The answer is b.
//! explanation..."), with explanations running across many lines until the
//! next numbered answer.

use super::{
    attach_answers, scan_answer_map, scan_questions, ParsedQuestion, QuestionParser, ScanGrammar,
};
use regex::Regex;
use std::sync::LazyLock;

static QUESTION_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\.\s+(.+)$").unwrap());
static OPTION_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([a-e])\.\s+(.+)$").unwrap());
static ANSWER_OPENER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(\d+)\.\s+The answer is ([a-e])\.?\s*(.*)$").unwrap());

pub struct PreTestParser;

impl QuestionParser for PreTestParser {
    fn name(&self) -> &'static str {
        "PreTest"
    }

    fn parse(&self, questions_text: &str, answers_text: &str) -> Vec<ParsedQuestion> {
        let answers = scan_answer_map(answers_text, &[&ANSWER_OPENER]);
        let grammar = ScanGrammar { question_line: &QUESTION_LINE, option_line: &OPTION_LINE };
        let mut questions = scan_questions(questions_text, &grammar);
        attach_answers(&mut questions, &answers);
        questions
    }
}
