//! JSON parsing for free-text model responses.
//!
//! Models asked for "JSON only" still sometimes wrap the object in a markdown
//! fence or add a sentence before it. Parsing tries the text as-is first and
//! then looks for an embedded object before giving up.

use serde_json::Value;

/// Parse a model response as a JSON value.
///
/// Tries, in order:
/// 1. The trimmed response as-is
/// 2. The contents of a ` ```json ` or bare ` ``` ` fenced block
/// 3. The first balanced `{ ... }` object in the text
///
/// On failure, returns the parse error of the full response so the model sees
/// what was wrong with what it actually sent.
pub fn parse_json_response(response: &str) -> Result<Value, serde_json::Error> {
    let trimmed = response.trim();

    let direct = match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    if let Some(inner) = fenced_block(trimmed)
        && let Ok(value) = serde_json::from_str::<Value>(inner)
    {
        return Ok(value);
    }

    if let Some(value) = find_embedded_object(trimmed) {
        return Ok(value);
    }

    Err(direct)
}

/// Contents of the first fenced code block, with any `json` tag removed.
fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after = &text[start + 3..];
    let end = after.find("```")?;
    let inner = &after[..end];
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    Some(inner.trim())
}

/// First `{` position whose balanced object parses as JSON.
///
/// Stops at the first `{` that is never closed: the text is truncated from
/// there on and no later start can be trusted.
fn find_embedded_object(text: &str) -> Option<Value> {
    for (start, _) in text.match_indices('{') {
        let candidate = balanced_object(&text[start..])?;
        if let Ok(value) = serde_json::from_str::<Value>(candidate) {
            return Some(value);
        }
    }
    None
}

/// Slice from the leading `{` through its matching `}`.
///
/// Braces inside string literals (including escaped quotes) are not counted.
fn balanced_object(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (idx, ch) in text.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[..=idx]);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_plain_object() {
        assert_eq!(parse_json_response(r#"{"x": 1}"#).unwrap(), json!({"x": 1}));
    }

    #[test]
    fn test_parse_with_whitespace() {
        assert_eq!(parse_json_response("\n  {\"x\": 1}\n").unwrap(), json!({"x": 1}));
    }

    #[test]
    fn test_parse_json_fence() {
        let response = "Here you go:\n```json\n{\"x\": 2}\n```";
        assert_eq!(parse_json_response(response).unwrap(), json!({"x": 2}));
    }

    #[test]
    fn test_parse_bare_fence() {
        let response = "```\n{\"x\": 3}\n```";
        assert_eq!(parse_json_response(response).unwrap(), json!({"x": 3}));
    }

    #[test]
    fn test_parse_object_in_prose() {
        let response = r#"The answer is {"x": {"y": [1, 2]}} as requested."#;
        assert_eq!(
            parse_json_response(response).unwrap(),
            json!({"x": {"y": [1, 2]}})
        );
    }

    #[test]
    fn test_parse_braces_inside_strings() {
        let response = r#"Result: {"msg": "use { and } carefully", "q": "say \"hi\""} end"#;
        let value = parse_json_response(response).unwrap();
        assert_eq!(value["msg"], "use { and } carefully");
        assert_eq!(value["q"], "say \"hi\"");
    }

    #[test]
    fn test_parse_non_object_json() {
        assert_eq!(parse_json_response("[1, 2]").unwrap(), json!([1, 2]));
    }

    #[test]
    fn test_not_json_fails() {
        assert!(parse_json_response("not json").is_err());
    }

    #[test]
    fn test_bad_object_fails() {
        assert!(parse_json_response("{bad}").is_err());
    }

    #[test]
    fn test_unbalanced_braces_fail() {
        assert!(parse_json_response("}} {").is_err());
        assert!(parse_json_response(r#"{"x": 1"#).is_err());
    }

    #[test]
    fn test_skips_unparsable_balanced_object() {
        let response = r#"Draft {bad} final {"x": 5}"#;
        assert_eq!(parse_json_response(response).unwrap(), json!({"x": 5}));
    }

    #[test]
    fn test_truncated_outer_object_fails() {
        assert!(parse_json_response(r#"{"wrapper": {"x": 1}"#).is_err());
    }

    #[test]
    fn test_many_unclosed_braces_fail_fast() {
        let response = "{".repeat(200_000);
        let started = std::time::Instant::now();
        assert!(parse_json_response(&response).is_err());
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
    }

    #[test]
    fn test_error_refers_to_full_response() {
        let err = parse_json_response("prefix {bad}").unwrap_err();
        assert!(err.is_syntax());
        assert_eq!(err.line(), 1);
    }
}
