/// Truncate to at most `max_chars` characters (not bytes).
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Strip markdown code fences from a model response.
pub fn strip_code_blocks(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

/// Pull the outermost `{...}` span out of a response that may carry prose
/// around the JSON. Returns `None` when no balanced object is present.
pub fn extract_json_object(response: &str) -> Option<&str> {
    let body = strip_code_blocks(response);
    let start = body.find('{')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in body[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&body[start..start + offset + 1]);
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

    #[test]
    fn truncate_counts_characters() {
        let text = "Hello 世界!";
        assert_eq!(truncate_chars(text, 7), "Hello 世");
        assert_eq!(truncate_chars(text, 100), text);
    }

    #[test]
    fn test_strip_code_blocks() {
        assert_eq!(strip_code_blocks("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_blocks("```\n{}\n```"), "{}");
        assert_eq!(strip_code_blocks("{}"), "{}");
    }

    #[test]
    fn extracts_object_surrounded_by_prose() {
        let raw = "Sure! Here you go:\n{\"a\": {\"b\": \"}\"}}\nHope that helps.";
        assert_eq!(extract_json_object(raw), Some("{\"a\": {\"b\": \"}\"}}"));
    }

    #[test]
    fn unbalanced_object_is_rejected() {
        assert_eq!(extract_json_object("{\"a\": 1"), None);
        assert_eq!(extract_json_object("no json here"), None);
    }
}
