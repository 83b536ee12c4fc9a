//! Generative fallback extractor
//!
//! Last-resort path used by the job driver when pattern extraction yields
//! fewer than [`FALLBACK_THRESHOLD`] valid questions. Sends a bounded slice
//! of the raw text to the Anthropic API under a system instruction that
//! fixes the output JSON schema (chapters containing questions), then
//! parses the response defensively. Every failure mode (missing key,
//! network error, non-JSON response, missing chapters field) degrades to
//! an empty result; this path never returns an error to its caller.

use crate::question::Question;
use crate::settings;
use crate::utils::{lenient_json_slice, safe_truncate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Below this many valid questions from pattern extraction, the job driver
/// invokes the generative fallback.
pub const FALLBACK_THRESHOLD: usize = 5;

/// Upper bound on the text slice sent to the model.
const MAX_INPUT_CHARS: usize = 50_000;

const MODEL: &str = "claude-haiku-4-5-20251001";
const MAX_TOKENS: u32 = 8192;

/// The only cancellation boundary in the pipeline: on expiry the request
/// fails and the fallback degrades to zero questions.
const REQUEST_TIMEOUT_SECS: u64 = 180;

/// Anthropic API message format
#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

/// Anthropic API request format
#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<Message>,
}

/// Anthropic API response format
#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u64,
    output_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    text: String,
}

const SYSTEM_PROMPT: &str = r#"You are a specialized system for extracting medical multiple-choice questions from textbooks. Extract questions with CHAPTER ORGANIZATION using this structure:

{
  "chapters": [
    {
      "title": "Chapter title (e.g., 'Pre- and Postoperative Care')",
      "index": 1,
      "questions": [
        {
          "question_number": 1,
          "question": "Complete question text",
          "options": {
            "A": "First option text",
            "B": "Second option text",
            "C": "Third option text",
            "D": "Fourth option text",
            "E": "Fifth option text if present"
          },
          "correct_answer": "Letter of correct answer (A-E)",
          "answer_details": "Complete explanation text"
        }
      ]
    }
  ]
}

IMPORTANT RULES:
1. Maintain original question numbering exactly as in the text
2. Preserve chapter organization - each chapter should have its own questions
3. Include ALL questions in each chapter - they must match the original count
4. Make options EXACTLY A, B, C, D, E (capital letters)
5. Include the COMPLETE explanation for each answer
6. Return ONLY valid JSON"#;

/// Extract questions from raw text via the generative API.
///
/// Returns an empty vector on any failure; the caller treats an empty
/// result after a weak pattern pass as terminal extraction failure.
pub async fn extract_questions_ai(text: &str, bookname: &str) -> Vec<Question> {
    println!("[AI] Using generative extraction for {}", bookname);

    let Some(api_key) = settings::get_api_key() else {
        eprintln!("[AI] ANTHROPIC_API_KEY not set, skipping generative extraction");
        return Vec::new();
    };

    let request = AnthropicRequest {
        model: MODEL.to_string(),
        max_tokens: MAX_TOKENS,
        system: SYSTEM_PROMPT.to_string(),
        messages: vec![Message {
            role: "user".to_string(),
            content: format!(
                "Extract all multiple-choice questions with their chapters from this medical textbook excerpt:\n\n{}",
                safe_truncate(text, MAX_INPUT_CHARS)
            ),
        }],
    };

    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
    {
        Ok(c) => c,
        Err(e) => {
            eprintln!("[AI] Failed to build HTTP client: {}", e);
            return Vec::new();
        }
    };

    let response = match client
        .post("https://api.anthropic.com/v1/messages")
        .header("x-api-key", &api_key)
        .header("anthropic-version", "2023-06-01")
        .header("content-type", "application/json")
        .json(&request)
        .send()
        .await
    {
        Ok(r) => r,
        Err(e) => {
            eprintln!("[AI] HTTP request failed: {}", e);
            return Vec::new();
        }
    };

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        eprintln!("[AI] API error {}: {}", status, safe_truncate(&body, 500));
        return Vec::new();
    }

    let api_response: AnthropicResponse = match response.json().await {
        Ok(r) => r,
        Err(e) => {
            eprintln!("[AI] Failed to parse response envelope: {}", e);
            return Vec::new();
        }
    };

    // Track token usage
    if let Some(usage) = &api_response.usage {
        let _ = settings::add_anthropic_tokens(usage.input_tokens, usage.output_tokens);
    }

    let text_out = api_response
        .content
        .first()
        .map(|c| c.text.clone())
        .unwrap_or_default();

    parse_ai_questions(&text_out, bookname)
}

/// Parse a model response into question records.
///
/// Tolerates prose around the JSON object; validates the top-level shape
/// has a chapters array, then flattens into the common question-record
/// shape with a freshly assigned global order. Shape violations at the
/// question level skip that question, never the whole batch.
pub fn parse_ai_questions(response_text: &str, bookname: &str) -> Vec<Question> {
    let Some(json_text) = lenient_json_slice(response_text) else {
        eprintln!("[AI] No JSON object found in response");
        return Vec::new();
    };

    let parsed: serde_json::Value = match serde_json::from_str(json_text) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("[AI] Response is not valid JSON: {}", e);
            return Vec::new();
        }
    };

    let Some(chapters) = parsed.get("chapters").and_then(|v| v.as_array()) else {
        eprintln!("[AI] Response has no chapters array");
        return Vec::new();
    };

    let mut questions = Vec::new();
    let mut next_order = 1u32;

    for (i, chapter) in chapters.iter().enumerate() {
        let title = chapter
            .get("title")
            .and_then(|v| v.as_str())
            .unwrap_or("Unknown Chapter");
        let index = chapter
            .get("index")
            .and_then(|v| v.as_u64())
            .unwrap_or(i as u64 + 1) as u32;

        let Some(items) = chapter.get("questions").and_then(|v| v.as_array()) else {
            continue;
        };
        for item in items {
            if let Some(q) = lift_ai_question(item, title, index, next_order, bookname) {
                questions.push(q);
                next_order += 1;
            }
        }
    }

    println!(
        "[AI] Generative extraction found {} questions in {} chapters",
        questions.len(),
        chapters.len()
    );
    questions
}

fn lift_ai_question(
    item: &serde_json::Value,
    chapter: &str,
    chapter_index: u32,
    setorder: u32,
    bookname: &str,
) -> Option<Question> {
    let stem = item.get("question")?.as_str()?.trim().to_string();
    if stem.is_empty() {
        return None;
    }

    let mut options = BTreeMap::new();
    if let Some(map) = item.get("options").and_then(|v| v.as_object()) {
        for (key, value) in map {
            let (Some(letter), Some(text)) = (key.trim().chars().next(), value.as_str()) else {
                continue;
            };
            let letter = letter.to_ascii_uppercase();
            if ('A'..='E').contains(&letter) && !text.trim().is_empty() {
                options.insert(letter, text.trim().to_string());
            }
        }
    }
    // Zero-option questions are never emitted, same as the pattern parsers
    if options.is_empty() {
        return None;
    }

    let mut correct = item
        .get("correct_answer")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .trim()
        .to_uppercase();
    let keeps_answer = correct
        .chars()
        .next()
        .map(|letter| correct.len() == 1 && options.contains_key(&letter))
        .unwrap_or(false);
    if !keeps_answer {
        correct.clear();
    }

    Some(Question {
        question_number: item.get("question_number").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
        question: stem,
        options,
        correct_answer: correct,
        answer_details: item
            .get("answer_details")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .trim()
            .to_string(),
        chapter: chapter.to_string(),
        chapter_index,
        setorder,
        bookname: bookname.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD_RESPONSE: &str = r#"Here is the extracted JSON:
{
  "chapters": [
    {
      "title": "Pre- and Postoperative Care",
      "index": 1,
      "questions": [
        {
          "question_number": 1,
          "question": "What is the boiling point of water?",
          "options": {"A": "50C", "B": "100C", "C": "150C"},
          "correct_answer": "B",
          "answer_details": "Water boils at 100C at sea level."
        },
        {
          "question_number": 2,
          "question": "A question with no options at all",
          "options": {},
          "correct_answer": "",
          "answer_details": ""
        }
      ]
    },
    {
      "title": "Trauma",
      "index": 2,
      "questions": [
        {
          "question_number": 1,
          "question": "Another question here?",
          "options": {"A": "yes", "B": "no"},
          "correct_answer": "D",
          "answer_details": ""
        }
      ]
    }
  ]
}
Let me know if you need anything else."#;

    #[test]
    fn test_prose_wrapped_response_parses() {
        let questions = parse_ai_questions(GOOD_RESPONSE, "book.pdf");
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].correct_answer, "B");
        assert_eq!(questions[0].chapter, "Pre- and Postoperative Care");
        assert_eq!(questions[1].chapter_index, 2);
    }

    #[test]
    fn test_option_less_question_skipped_and_order_stays_gapless() {
        let questions = parse_ai_questions(GOOD_RESPONSE, "book.pdf");
        let orders: Vec<u32> = questions.iter().map(|q| q.setorder).collect();
        assert_eq!(orders, vec![1, 2]);
    }

    #[test]
    fn test_answer_for_absent_option_cleared() {
        let questions = parse_ai_questions(GOOD_RESPONSE, "book.pdf");
        // Second kept question claimed D with only A/B present
        assert_eq!(questions[1].correct_answer, "");
    }

    #[test]
    fn test_non_json_response_yields_empty() {
        assert!(parse_ai_questions("I could not find any questions.", "b").is_empty());
    }

    #[test]
    fn test_invalid_json_yields_empty() {
        assert!(parse_ai_questions("{\"chapters\": [", "b").is_empty());
    }

    #[test]
    fn test_missing_chapters_field_yields_empty() {
        assert!(parse_ai_questions(r#"{"questions": []}"#, "b").is_empty());
    }

    #[test]
    fn test_bookname_stamped() {
        let questions = parse_ai_questions(GOOD_RESPONSE, "surgery.pdf");
        assert!(questions.iter().all(|q| q.bookname == "surgery.pdf"));
    }
}
