//! Chapter segmentation
//!
//! Splits a normalized document into chapter regions covering the entire
//! text with no gaps and no overlaps, then locates the "Questions" and
//! "Answers" sub-regions inside each chapter. Chapters are detected by
//! heading lines: an explicit "Chapter N" marker, or a capitalized phrase
//! ending in a domain noun ("Pre- and Postoperative Care", "Trauma and
//! Shock"). A document with no recognizable headings becomes one default
//! chapter.

use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

/// Heading lines longer than this are treated as prose, not chapter titles.
const MAX_HEADING_LEN: usize = 80;

static CHAPTER_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^Chapter\s+\d+[.:]?\s*(\S[^\n]*)$").unwrap());

static DOMAIN_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^([A-Z][A-Za-z ,:\-]+(?:Care|Surgery|Problems|Shock|Endocrine|Breast|Tract|Pancreas|Liver))\s*$",
    )
    .unwrap()
});

static QUESTIONS_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^\s*Questions\s*$").unwrap());

static ANSWERS_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^\s*(?:Answers(?:\s+and\s+Explanations)?|Answer\s+Key)\s*$").unwrap()
});

static NUMBERED_ITEM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^\d+\.\s+").unwrap());

/// One chapter's slice of the document, with optional questions/answers
/// sub-spans. Transient: consumed by the parser for this chapter and
/// discarded once question records exist.
#[derive(Debug, Clone)]
pub struct ChapterRegion {
    pub title: String,
    pub index: u32,
    pub content: String,
    questions: Option<Range<usize>>,
    answers: Option<Range<usize>>,
}

impl ChapterRegion {
    pub fn questions_text(&self) -> Option<&str> {
        self.questions.as_ref().map(|r| &self.content[r.clone()])
    }

    pub fn answers_text(&self) -> Option<&str> {
        self.answers.as_ref().map(|r| &self.content[r.clone()])
    }
}

/// Split normalized text into an ordered sequence of chapter regions.
///
/// Concatenating the regions' contents in order reproduces the input
/// exactly: text before the first heading is folded into the first chapter.
pub fn segment_chapters(text: &str) -> Vec<ChapterRegion> {
    let mut headings = find_headings(text);

    if headings.is_empty() {
        let mut chapter = ChapterRegion {
            title: "Default Chapter".to_string(),
            index: 1,
            content: text.to_string(),
            questions: None,
            answers: None,
        };
        locate_sections(&mut chapter);
        return vec![chapter];
    }

    // Fold any preamble into the first chapter so regions tile the document
    headings[0].0 = 0;

    let mut chapters = Vec::with_capacity(headings.len());
    for (i, (start, title)) in headings.iter().enumerate() {
        let end = headings.get(i + 1).map(|(s, _)| *s).unwrap_or(text.len());
        let mut chapter = ChapterRegion {
            title: title.clone(),
            index: (i + 1) as u32,
            content: text[*start..end].to_string(),
            questions: None,
            answers: None,
        };
        locate_sections(&mut chapter);
        chapters.push(chapter);
    }
    chapters
}

/// Collect chapter-heading matches as (byte offset, title), in document order.
fn find_headings(text: &str) -> Vec<(usize, String)> {
    let mut headings: Vec<(usize, String)> = Vec::new();

    for caps in CHAPTER_MARKER.captures_iter(text) {
        let m = caps.get(0).unwrap();
        let title = caps.get(1).unwrap().as_str().trim();
        if title.len() > 3 {
            headings.push((m.start(), title.to_string()));
        }
    }

    for caps in DOMAIN_HEADING.captures_iter(text) {
        let m = caps.get(0).unwrap();
        let title = caps.get(1).unwrap().as_str().trim();
        if title.len() > 3 && m.as_str().trim_end().len() < MAX_HEADING_LEN {
            headings.push((m.start(), title.to_string()));
        }
    }

    headings.sort_by_key(|(start, _)| *start);
    headings.dedup_by_key(|(start, _)| *start);
    headings
}

/// Locate the questions and answers sub-regions within one chapter.
///
/// The questions region runs from the "Questions" heading (or the first
/// numbered item when the heading is absent) to the "Answers" heading.
/// When no Answers heading line exists, a plain substring search and then
/// the chapter midpoint serve as progressively cruder end boundaries.
fn locate_sections(chapter: &mut ChapterRegion) {
    let content = &chapter.content;

    let q_start = QUESTIONS_HEADING
        .find(content)
        .map(|m| m.end())
        .or_else(|| NUMBERED_ITEM.find(content).map(|m| m.start()));

    let q_start = match q_start {
        Some(s) => s,
        None => return, // no resolvable questions region; caller logs and skips
    };

    let a_start = ANSWERS_HEADING
        .find(content)
        .map(|m| m.start())
        .filter(|&s| s > q_start)
        .or_else(|| plain_answers_search(content, q_start))
        .or_else(|| {
            let mid = char_floor(content, content.len() / 2);
            (mid > q_start).then_some(mid)
        });

    match a_start {
        Some(a) => {
            chapter.questions = Some(q_start..a);
            chapter.answers = Some(a..content.len());
        }
        None => {
            chapter.questions = Some(q_start..content.len());
        }
    }
}

fn plain_answers_search(content: &str, after: usize) -> Option<usize> {
    let tail = &content[after..];
    tail.find("Answers")
        .or_else(|| tail.find("ANSWERS"))
        .map(|pos| after + pos)
}

/// Largest char boundary at or below `at`.
fn char_floor(s: &str, at: usize) -> usize {
    let mut i = at.min(s.len());
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_CHAPTERS: &str = "\
Front matter before any heading.
Chapter 1: Pre- and Postoperative Care
Questions
1. First question?
A. yes
B. no
Answers
1. A. Because.
Chapter 2: Trauma and Shock
Questions
2. Second question?
A. maybe
Answers and Explanations
2. A. Indeed.
";

    #[test]
    fn test_two_chapters_found_in_order() {
        let chapters = segment_chapters(TWO_CHAPTERS);
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].title, "Pre- and Postoperative Care");
        assert_eq!(chapters[0].index, 1);
        assert_eq!(chapters[1].title, "Trauma and Shock");
        assert_eq!(chapters[1].index, 2);
    }

    #[test]
    fn test_regions_tile_the_document() {
        let chapters = segment_chapters(TWO_CHAPTERS);
        let rebuilt: String = chapters.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(rebuilt, TWO_CHAPTERS);
    }

    #[test]
    fn test_questions_and_answers_subregions() {
        let chapters = segment_chapters(TWO_CHAPTERS);
        let q = chapters[0].questions_text().unwrap();
        assert!(q.contains("1. First question?"));
        assert!(!q.contains("Because"));
        let a = chapters[0].answers_text().unwrap();
        assert!(a.contains("1. A. Because."));
        assert!(!a.contains("First question"));
    }

    #[test]
    fn test_no_headings_yields_default_chapter() {
        let text = "1. Lone question?\nA. yes\nB. no\n\nAnswers\n1. B. Reason.\n";
        let chapters = segment_chapters(text);
        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].title, "Default Chapter");
        assert_eq!(chapters[0].content, text);
        assert!(chapters[0].questions_text().is_some());
        assert!(chapters[0].answers_text().is_some());
    }

    #[test]
    fn test_domain_noun_heading_without_chapter_marker() {
        let text = "Alimentary Tract\nQuestions\n1. Q?\nA. x\nAnswers\n1. A. Y.\n";
        let chapters = segment_chapters(text);
        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].title, "Alimentary Tract");
    }

    #[test]
    fn test_long_prose_line_is_not_a_heading() {
        let text = format!(
            "{} Surgery\nQuestions\n1. Q?\nA. x\n",
            "A sentence that rambles on about many things concerning general and vascular"
        );
        let chapters = segment_chapters(&text);
        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].title, "Default Chapter");
    }

    #[test]
    fn test_missing_answers_heading_falls_back_to_midpoint() {
        // No Answers line anywhere: the questions region must still close
        let text = "1. Q one?\nA. alpha\nB. beta\n2. Q two?\nA. alpha\nB. beta\n";
        let chapters = segment_chapters(text);
        let q = chapters[0].questions_text().unwrap();
        assert!(q.len() <= text.len() / 2 + 1);
        assert!(chapters[0].answers_text().is_some());
    }

    #[test]
    fn test_chapter_without_numbered_items_has_no_questions_region() {
        let text = "Chapter 1: Hepatobiliary Surgery\nOnly prose here, nothing numbered.\n";
        let chapters = segment_chapters(text);
        assert_eq!(chapters.len(), 1);
        assert!(chapters[0].questions_text().is_none());
        assert!(chapters[0].answers_text().is_none());
    }
}
