//! Format-specific question parsers
//!
//! One parser per publisher layout plus a loose generic fallback. All
//! variants share the same contract: given a chapter's questions region and
//! answers region, emit question records with at least one parsed option.
//! The shared line scanner is an explicit state machine (seeking a question,
//! accumulating its stem, accumulating its options) so the edge cases
//! (option lines before any stem, stray blank lines, wrapped option text)
//! live in one tested place instead of inline pattern branching.

pub mod generic;
pub mod pretest;
pub mod schwartz;
pub mod virgilio;

use crate::format::FormatTag;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};

/// A question as one parser saw it, before chapter context and global
/// ordering are stamped on by the extraction pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedQuestion {
    pub number: u32,
    pub question: String,
    pub options: BTreeMap<char, String>,
    pub correct_answer: String,
    pub answer_details: String,
}

impl ParsedQuestion {
    fn new(number: u32, stem: String) -> Self {
        ParsedQuestion {
            number,
            question: stem,
            options: BTreeMap::new(),
            correct_answer: String::new(),
            answer_details: String::new(),
        }
    }
}

/// Per-chapter lookup from question number to its answer letter and
/// explanation. Built from the answers region, consumed during attachment,
/// then discarded.
#[derive(Debug, Clone)]
pub struct AnswerEntry {
    pub letter: char,
    pub explanation: String,
}

pub type AnswerMap = HashMap<u32, AnswerEntry>;

/// Common parser contract: questions region + answers region in, question
/// records out. Implementations never fail; weak input yields fewer records.
pub trait QuestionParser {
    fn name(&self) -> &'static str;
    fn parse(&self, questions_text: &str, answers_text: &str) -> Vec<ParsedQuestion>;
}

/// The closed set of parser variants, in selector preference order.
pub fn all_parsers() -> Vec<Box<dyn QuestionParser>> {
    vec![
        Box::new(pretest::PreTestParser),
        Box::new(virgilio::VirgilioParser),
        Box::new(schwartz::SchwartzParser),
        Box::new(generic::GenericParser),
    ]
}

/// Parser for a confirmed format tag. Generic means "not confirmed": the
/// caller should run the selector over all variants instead.
pub fn parser_for(tag: FormatTag) -> Option<Box<dyn QuestionParser>> {
    match tag {
        FormatTag::PreTest => Some(Box::new(pretest::PreTestParser)),
        FormatTag::Virgilio => Some(Box::new(virgilio::VirgilioParser)),
        FormatTag::Schwartz => Some(Box::new(schwartz::SchwartzParser)),
        // Get Through SBAs and Rush share the loose grammar
        FormatTag::GetThrough | FormatTag::Rush => Some(Box::new(generic::GenericParser)),
        FormatTag::Generic => None,
    }
}

/// Line grammar for the shared questions-region scanner.
pub(crate) struct ScanGrammar<'a> {
    /// Opens a new question; capture 1 = number, capture 2 = first stem line
    pub question_line: &'a Regex,
    /// An option line; capture 1 = letter, capture 2 = option text
    pub option_line: &'a Regex,
}

/// Scanner states for the questions region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    /// No question open yet; option lines and prose are ignored
    Seeking,
    /// Accumulating stem continuation lines
    Stem,
    /// Options have begun; stem accumulation is over
    Options,
}

/// Scan a questions region line by line into open questions.
///
/// A numbered line opens a question; following prose extends the stem until
/// the first option line; option text accumulates across wrapped lines until
/// the next option letter or question number. A numbered block with no
/// option lines is discarded silently: the numbering grammar is ambiguous
/// with other enumerations and an option-less question is unusable anyway.
pub(crate) fn scan_questions(questions_text: &str, grammar: &ScanGrammar) -> Vec<ParsedQuestion> {
    let mut questions: Vec<ParsedQuestion> = Vec::new();
    let mut current: Option<ParsedQuestion> = None;
    let mut state = ScanState::Seeking;
    let mut last_letter: Option<char> = None;

    for raw in questions_text.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        // Option lines take priority: "a." would otherwise be ambiguous with
        // a numbered marker in the loosest grammars
        if let Some(caps) = grammar.option_line.captures(line) {
            if let Some(q) = current.as_mut() {
                let letter = letter_of(&caps[1]);
                q.options.insert(letter, caps[2].trim().to_string());
                last_letter = Some(letter);
                state = ScanState::Options;
            }
            continue;
        }

        if let Some(caps) = grammar.question_line.captures(line) {
            if let Ok(number) = caps[1].parse::<u32>() {
                close_question(&mut questions, current.take());
                current = Some(ParsedQuestion::new(number, caps[2].trim().to_string()));
                state = ScanState::Stem;
                last_letter = None;
                continue;
            }
        }

        match (state, current.as_mut()) {
            (ScanState::Stem, Some(q)) => {
                q.question.push(' ');
                q.question.push_str(line);
            }
            (ScanState::Options, Some(q)) => {
                // Wrapped option text continues until the next marker
                if let Some(letter) = last_letter {
                    if let Some(text) = q.options.get_mut(&letter) {
                        text.push(' ');
                        text.push_str(line);
                    }
                }
            }
            _ => {}
        }
    }

    close_question(&mut questions, current.take());
    questions
}

fn close_question(questions: &mut Vec<ParsedQuestion>, current: Option<ParsedQuestion>) {
    if let Some(q) = current {
        if !q.options.is_empty() {
            questions.push(q);
        }
    }
}

/// Build an answer-map from an answers region.
///
/// Each opener regex must capture (number, letter, rest-of-line); the first
/// opener that matches a line wins. Lines matching no opener extend the
/// current entry's explanation, so multi-line explanations accumulate until
/// the next numbered answer marker.
pub(crate) fn scan_answer_map(answers_text: &str, openers: &[&Regex]) -> AnswerMap {
    let mut map = AnswerMap::new();
    let mut current: Option<(u32, char, String)> = None;

    for raw in answers_text.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        let opened = openers.iter().find_map(|re| re.captures(line));
        if let Some(caps) = opened {
            if let Ok(number) = caps[1].parse::<u32>() {
                store_entry(&mut map, current.take());
                current = Some((number, letter_of(&caps[2]), caps[3].trim().to_string()));
                continue;
            }
        }

        if let Some((_, _, explanation)) = current.as_mut() {
            if !explanation.is_empty() {
                explanation.push(' ');
            }
            explanation.push_str(line);
        }
    }

    store_entry(&mut map, current.take());
    map
}

fn store_entry(map: &mut AnswerMap, entry: Option<(u32, char, String)>) {
    if let Some((number, letter, explanation)) = entry {
        map.insert(number, AnswerEntry { letter, explanation: explanation.trim().to_string() });
    }
}

/// Populate answers and explanations from the answer-map.
///
/// Never fabricates: an answer letter with no matching parsed option leaves
/// `correct_answer` empty (the explanation is still kept for a later merge).
/// Fields already filled by an inline grammar are left alone.
pub(crate) fn attach_answers(questions: &mut [ParsedQuestion], map: &AnswerMap) {
    for q in questions.iter_mut() {
        let Some(entry) = map.get(&q.number) else { continue };

        if q.correct_answer.is_empty() {
            if q.options.contains_key(&entry.letter) {
                q.correct_answer = entry.letter.to_string();
            } else {
                eprintln!(
                    "[Parse] Answer {} for question {} has no matching option, leaving unresolved",
                    entry.letter, q.number
                );
            }
        }

        if q.answer_details.is_empty() && !entry.explanation.is_empty() {
            q.answer_details = entry.explanation.clone();
        }
    }
}

fn letter_of(capture: &str) -> char {
    capture.chars().next().unwrap_or('?').to_ascii_uppercase()
}
