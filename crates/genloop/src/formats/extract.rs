//! Lenient JSON extraction from model text, which may be wrapped in prose or code fences
//! and, while streaming, truncated at any byte.

use serde_json::Value;

/// Find the first JSON object or array in `text` and parse it, repairing truncation
///
/// Only an unterminated value is repaired. A complete container that does not parse yields
/// `None`.
pub fn extract_json(text: &str) -> Option<Value> {
    let start = text.find(|c: char| c == '{' || c == '[')?;
    let candidate = &text[start..];
    match balanced_end(candidate) {
        Some(end) => serde_json::from_str(&candidate[..end]).ok(),
        None => parse_partial_json(candidate),
    }
}

/// Parse JSON that may have been cut off, closing open strings and containers
///
/// Falls back to dropping the trailing incomplete element when closing alone is not enough.
pub fn parse_partial_json(text: &str) -> Option<Value> {
    let text = text.trim_start();
    if text.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str(text) {
        return Some(value);
    }
    if let Some(value) = close(text).and_then(|closed| serde_json::from_str(&closed).ok()) {
        return Some(value);
    }

    cut_points(text)
        .into_iter()
        .rev()
        .find_map(|end| close(&text[..end]).and_then(|closed| serde_json::from_str(&closed).ok()))
}

/// The complete top-level items of a JSON array, ignoring an unfinished last item
pub fn extract_items(text: &str) -> Vec<Value> {
    let Some(start) = text.find('[') else {
        return Vec::new();
    };

    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut item_start = start + 1;

    for (i, c) in text.char_indices().skip_while(|(i, _)| *i < start) {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                if depth == 1 {
                    push_item(&text[item_start..i], &mut items);
                    return items;
                }
                depth = depth.saturating_sub(1);
            }
            ',' if depth == 1 => {
                push_item(&text[item_start..i], &mut items);
                item_start = i + 1;
            }
            _ => {}
        }
    }
    items
}

fn push_item(raw: &str, items: &mut Vec<Value>) {
    let raw = raw.trim();
    if raw.is_empty() {
        return;
    }
    if let Ok(value) = serde_json::from_str(raw) {
        items.push(value);
    }
}

/// Byte offset just past the container that opens at the start of `text`
fn balanced_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + c.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}

/// Append whatever closes the strings and containers left open in `text`
fn close(text: &str) -> Option<String> {
    let mut closers = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    for c in text.chars() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => closers.push('}'),
            '[' => closers.push(']'),
            '}' | ']' => {
                if closers.pop() != Some(c) {
                    return None;
                }
            }
            _ => {}
        }
    }

    let mut closed = if in_string {
        text.to_string()
    } else {
        text.trim_end().to_string()
    };
    if escaped {
        closed.pop();
    }
    if in_string {
        closed.push('"');
    }
    while closed.ends_with(',') {
        closed.pop();
    }
    closed.extend(closers.iter().rev());
    Some(closed)
}

/// Offsets where an unfinished trailing element can be dropped: before top-level-of-container
/// commas and just after opening brackets
fn cut_points(text: &str) -> Vec<usize> {
    let mut points = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' | '[' => points.push(i + 1),
            ',' => points.push(i),
            _ => {}
        }
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use serde_json::json;

    #[test]
    fn test_extract_json_from_fenced_prose() {
        let text = indoc! {r#"
            Sure, here it is:
            ```json
            {"name": "Ada", "tags": ["x", "y"]}
            ```
            Anything else?
        "#};
        assert_eq!(
            extract_json(text),
            Some(json!({"name": "Ada", "tags": ["x", "y"]}))
        );
    }

    #[test]
    fn test_extract_json_none_without_json() {
        assert_eq!(extract_json("no structured output here"), None);
    }

    #[test]
    fn test_extract_json_rejects_complete_invalid_value() {
        assert_eq!(extract_json(r#"{"tempC": 20, "note": 'warm'}"#), None);
        assert_eq!(extract_json(r#"{"a": 1,, "b": 2}"#), None);
        assert_eq!(extract_json(r#"See [note]: {"tempC": 20}"#), None);
    }

    #[test]
    fn test_extract_json_repairs_truncated_value() {
        assert_eq!(
            extract_json(r#"Result: {"tempC": 20, "note": "wa"#),
            Some(json!({"tempC": 20, "note": "wa"}))
        );
    }

    #[test]
    fn test_partial_json_keeps_whitespace_in_open_string() {
        assert_eq!(
            parse_partial_json(r#"{"a": "hello "#),
            Some(json!({"a": "hello "}))
        );
        assert_eq!(parse_partial_json("[1, 2 "), Some(json!([1, 2])));
    }

    #[test]
    fn test_partial_json_closes_string_and_object() {
        assert_eq!(
            parse_partial_json(r#"{"city": "Par"#),
            Some(json!({"city": "Par"}))
        );
        assert_eq!(parse_partial_json("[1, 2, "), Some(json!([1, 2])));
    }

    #[test]
    fn test_partial_json_drops_dangling_key() {
        assert_eq!(
            parse_partial_json(r#"{"a": 1, "b""#),
            Some(json!({"a": 1}))
        );
        assert_eq!(
            parse_partial_json(r#"{"a": {"b": tr"#),
            Some(json!({"a": {}}))
        );
    }

    #[test]
    fn test_partial_json_ignores_brackets_in_strings() {
        assert_eq!(
            parse_partial_json(r#"{"text": "a [b] {c"#),
            Some(json!({"text": "a [b] {c"}))
        );
    }

    #[test]
    fn test_extract_items_skips_unfinished_item() {
        let text = r#"Items: [{"id": 1}, {"id": 2, "note": "a, b"}, {"id": 3"#;
        assert_eq!(
            extract_items(text),
            vec![json!({"id": 1}), json!({"id": 2, "note": "a, b"})]
        );
    }

    #[test]
    fn test_extract_items_complete_array() {
        assert_eq!(
            extract_items("[1, [2, 3], \"x\"]"),
            vec![json!(1), json!([2, 3]), json!("x")]
        );
        assert!(extract_items("no array").is_empty());
    }
}
