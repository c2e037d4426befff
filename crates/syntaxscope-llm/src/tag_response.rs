//! Tag extraction from free-form model output.

use syntaxscope_catalog::normalize_tags;

/// Parse a model reply into normalized tags.
///
/// Tried in order: the reply as a JSON array of strings, the same after
/// stripping a fenced code block, and finally the text between the first `[`
/// and the last `]` split on commas. Anything else yields no tags.
pub fn parse_tags_response(response: &str) -> Vec<String> {
    let trimmed = response.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    if let Some(tags) = json_tags(trimmed) {
        return tags;
    }

    let unfenced = strip_code_fence(trimmed);
    if let Some(tags) = json_tags(unfenced) {
        return tags;
    }

    match (unfenced.find('['), unfenced.rfind(']')) {
        (Some(open), Some(close)) if open < close => {
            tracing::debug!(response = trimmed, "tags reply is not valid JSON, splitting on commas");
            normalize_tags(
                unfenced[open + 1..close]
                    .split(',')
                    .map(|t| t.trim().trim_matches(|c| c == '"' || c == '\'')),
            )
        }
        _ => {
            tracing::warn!(response = trimmed, "could not extract tags from reply");
            Vec::new()
        }
    }
}

fn json_tags(text: &str) -> Option<Vec<String>> {
    let serde_json::Value::Array(items) = serde_json::from_str::<serde_json::Value>(text).ok()? else {
        return None;
    };
    Some(normalize_tags(items.iter().filter_map(|v| v.as_str())))
}

/// Drop the first and last line of a ```fenced``` block.
fn strip_code_fence(text: &str) -> &str {
    if text.len() < 6 || !text.starts_with("```") || !text.ends_with("```") {
        return text;
    }
    match (text.find('\n'), text.rfind('\n')) {
        (Some(first), Some(last)) if first < last => text[first + 1..last].trim(),
        _ => text,
    }
}
