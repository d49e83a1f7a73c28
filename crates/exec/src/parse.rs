//! Shared CLI output parsing (spec.md §4.3): JSON object/array unwrap with a
//! raw-text fallback, `SKIP` detection, and `NEXT_MENTIONS` marker extraction.

use std::sync::OnceLock;

use arena_types::{AgentOutput, ExecutionMeta};
use regex::Regex;
use serde_json::Value;

fn next_mentions_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<!--NEXT_MENTIONS:(\[.*?\])-->").expect("valid regex"))
}

/// Unwraps a `{"result": ...}` / `{"content": ...}` object, joins a
/// `[{"type":"text","text":...}]` block array, or falls back to the raw text.
fn unwrap_json_content(raw: &str) -> String {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map
            .get("result")
            .or_else(|| map.get("content"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| raw.to_string()),
        Ok(Value::Array(items)) => {
            let text_parts: Vec<String> = items
                .iter()
                .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
                .filter_map(|block| block.get("text").and_then(Value::as_str))
                .map(str::to_string)
                .collect();
            if text_parts.is_empty() {
                raw.to_string()
            } else {
                text_parts.join("\n")
            }
        }
        _ => raw.to_string(),
    }
}

/// Parses raw subprocess stdout into an `AgentOutput`, given the exact prompt
/// that produced it (carried for the call log).
pub fn parse_output(raw: &str, prompt_sent: String) -> AgentOutput {
    let mut content = unwrap_json_content(raw.trim());

    // When multiple markers are present, the last one wins (agents sometimes
    // echo an example marker earlier in their reasoning before the real one).
    let mut next_mentions = Vec::new();
    if let Some(last) = next_mentions_re().captures_iter(&content).last() {
        if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(&last[1]) {
            next_mentions = items
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect();
        }
    }
    if next_mentions_re().is_match(&content) {
        content = next_mentions_re().replace_all(&content, "").trim().to_string();
    }

    let trimmed = content.trim();
    let should_respond = !(trimmed == "SKIP" || trimmed.starts_with("SKIP"));
    if !should_respond {
        content = String::new();
    }

    AgentOutput {
        content,
        next_mentions,
        should_respond,
        execution_meta: ExecutionMeta::default(),
        prompt_sent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_json_object_result_field() {
        let out = parse_output(r#"{"result": "all good here"}"#, "p".to_string());
        assert_eq!(out.content, "all good here");
        assert!(out.should_respond);
    }

    #[test]
    fn parses_json_array_of_text_blocks() {
        let out = parse_output(r#"[{"type":"text","text":"hello"},{"type":"text","text":"world"}]"#, "p".to_string());
        assert_eq!(out.content, "hello\nworld");
    }

    #[test]
    fn falls_back_to_raw_text_on_non_json() {
        let out = parse_output("just plain text", "p".to_string());
        assert_eq!(out.content, "just plain text");
    }

    #[test]
    fn detects_skip_and_clears_content() {
        let out = parse_output("SKIP", "p".to_string());
        assert!(!out.should_respond);
        assert_eq!(out.content, "");
    }

    #[test]
    fn extracts_and_strips_next_mentions() {
        let out = parse_output(
            r#"sounds good <!--NEXT_MENTIONS:["borealis","atlas"]-->"#,
            "p".to_string(),
        );
        assert_eq!(out.next_mentions, vec!["borealis", "atlas"]);
        assert_eq!(out.content, "sounds good");
    }

    #[test]
    fn malformed_next_mentions_payload_is_ignored() {
        let out = parse_output(r#"reply text <!--NEXT_MENTIONS:[not json]-->"#, "p".to_string());
        assert!(out.next_mentions.is_empty());
        assert_eq!(out.content, "reply text");
    }

    #[test]
    fn last_marker_wins_when_multiple_present() {
        let out = parse_output(
            r#"draft <!--NEXT_MENTIONS:["atlas"]--> final <!--NEXT_MENTIONS:["borealis"]-->"#,
            "p".to_string(),
        );
        assert_eq!(out.next_mentions, vec!["borealis"]);
        assert_eq!(out.content, "draft  final");
    }

    #[test]
    fn marker_tolerates_embedded_newlines() {
        let out = parse_output(
            "reply text <!--NEXT_MENTIONS:[\n  \"atlas\"\n]-->",
            "p".to_string(),
        );
        assert_eq!(out.next_mentions, vec!["atlas"]);
        assert_eq!(out.content, "reply text");
    }
}
