/// Shared utility functions

/// Safely truncate a string at a UTF-8 boundary
pub fn safe_truncate(s: &str, max_bytes: usize) -> &str {
    if max_bytes >= s.len() { return s; }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Slice the first balanced-looking JSON object out of free-form text.
///
/// Generative models wrap their JSON in prose, markdown fences, or trailing
/// commentary. This takes everything from the first `{` to the last `}`
/// inclusive and leaves actual validation to the JSON parser. Returns None
/// when no such span exists.
pub fn lenient_json_slice(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_truncate_ascii() {
        assert_eq!(safe_truncate("hello", 3), "hel");
        assert_eq!(safe_truncate("hello", 10), "hello");
        assert_eq!(safe_truncate("hello", 5), "hello");
    }

    #[test]
    fn test_safe_truncate_utf8() {
        // Multi-byte character straddling the cut point
        let s = "héllo";
        assert_eq!(safe_truncate(s, 2), "h");
    }

    #[test]
    fn test_lenient_json_plain_object() {
        assert_eq!(lenient_json_slice(r#"{"a":1}"#), Some(r#"{"a":1}"#));
    }

    #[test]
    fn test_lenient_json_prose_wrapped() {
        let text = "Here is the JSON you asked for:\n```json\n{\"a\": 1}\n```\nHope that helps!";
        assert_eq!(lenient_json_slice(text), Some("{\"a\": 1}"));
    }

    #[test]
    fn test_lenient_json_multiple_objects_spans_outermost() {
        // Everything between the first { and the last }: nested and sibling
        // objects stay inside the slice for the parser to judge
        let text = "x {\"a\":{\"b\":2}} y {\"c\":3} z";
        assert_eq!(lenient_json_slice(text), Some("{\"a\":{\"b\":2}} y {\"c\":3}"));
    }

    #[test]
    fn test_lenient_json_truncated_still_sliced() {
        // A brace-less tail means no closing } after the opener
        assert_eq!(lenient_json_slice("{\"a\": 1"), None);
        // Truncated inner content is sliced; the parser rejects it later
        let sliced = lenient_json_slice("{\"a\": \"unterminated}").unwrap();
        assert!(serde_json::from_str::<serde_json::Value>(sliced).is_err());
    }

    #[test]
    fn test_lenient_json_none_when_absent() {
        assert_eq!(lenient_json_slice("no json here"), None);
        assert_eq!(lenient_json_slice("} reversed {"), None);
    }
}
