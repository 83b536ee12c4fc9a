//! Virgilio family parser
//!
//! "Review of Surgery for ABSITE and Boards" (de Virgilio): uppercase
//! option columns and terse answer entries ("14. B. explanation...").

use super::{
    attach_answers, scan_answer_map, scan_questions, ParsedQuestion, QuestionParser, ScanGrammar,
};
use regex::Regex;
use std::sync::LazyLock;

static QUESTION_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\.\s+(.+)$").unwrap());
static OPTION_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([A-E])\.\s+(.+)$").unwrap());
static ANSWER_OPENER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\.\s+([A-E])\.\s*(.*)$").unwrap());

pub struct VirgilioParser;

impl QuestionParser for VirgilioParser {
    fn name(&self) -> &'static str {
        "Virgilio"
    }

    fn parse(&self, questions_text: &str, answers_text: &str) -> Vec<ParsedQuestion> {
        let answers = scan_answer_map(answers_text, &[&ANSWER_OPENER]);
        let grammar = ScanGrammar { question_line: &QUESTION_LINE, option_line: &OPTION_LINE };
        let mut questions = scan_questions(questions_text, &grammar);
        attach_answers(&mut questions, &answers);
        questions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boiling_point_round_trip() {
        let q = "1. What is the boiling point of water?\nA. 50C\nB. 100C\nC. 150C\n";
        let a = "Answers\n1. B. Water boils at 100C at sea level.\n";
        let parsed = VirgilioParser.parse(q, a);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].options[&'A'], "50C");
        assert_eq!(parsed[0].options[&'B'], "100C");
        assert_eq!(parsed[0].options[&'C'], "150C");
        assert_eq!(parsed[0].correct_answer, "B");
        assert_eq!(parsed[0].answer_details, "Water boils at 100C at sea level.");
    }

    #[test]
    fn test_absent_answers_section_keeps_question() {
        let q = "1. What is the boiling point of water?\nA. 50C\nB. 100C\nC. 150C\n";
        let parsed = VirgilioParser.parse(q, "");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].correct_answer, "");
        assert_eq!(parsed[0].answer_details, "");
    }

    #[test]
    fn test_multi_line_explanations_accumulate() {
        let q = "1. Q one?\nA. x\nB. y\n2. Q two?\nA. p\nB. q\n";
        let a = "1. A. First explanation\ncontinuing on.\n2. B. Second explanation.\n";
        let parsed = VirgilioParser.parse(q, a);
        assert_eq!(parsed[0].answer_details, "First explanation continuing on.");
        assert_eq!(parsed[1].correct_answer, "B");
    }

    #[test]
    fn test_lowercase_options_not_recognized() {
        let q = "1. Q?\na. lower\nb. case\n";
        let parsed = VirgilioParser.parse(q, "");
        assert!(parsed.is_empty());
    }
}
