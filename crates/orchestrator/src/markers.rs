//! `<!--MEMORY:{json}-->` and `<!--PERSONAL_LOG:text-->` marker extraction
//! (spec.md §4.4). Stripped from the persisted content regardless of whether
//! they parsed — the user never sees a marker, valid or malformed.

use std::sync::OnceLock;

use arena_types::MemoryKind;
use regex::Regex;
use serde::Deserialize;
use tracing::warn;

fn memory_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<!--MEMORY:(\{.*?\})-->").expect("valid regex"))
}

fn personal_log_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<!--PERSONAL_LOG:(.*?)-->").expect("valid regex"))
}

#[derive(Debug, Deserialize)]
struct RawMemoryMarker {
    #[serde(rename = "type")]
    kind: MemoryKind,
    content: String,
    #[serde(default = "default_importance")]
    importance: f32,
}

fn default_importance() -> f32 {
    arena_types::DEFAULT_IMPORTANCE
}

pub struct ParsedMemoryMarker {
    pub kind: MemoryKind,
    pub content: String,
    pub importance: f32,
}

pub struct MarkerExtraction {
    pub content: String,
    pub memory_markers: Vec<ParsedMemoryMarker>,
    pub personal_logs: Vec<String>,
}

/// Extracts and strips both marker kinds from agent output.
pub fn extract_markers(raw_content: &str) -> MarkerExtraction {
    let mut memory_markers = Vec::new();
    for caps in memory_re().captures_iter(raw_content) {
        match serde_json::from_str::<RawMemoryMarker>(&caps[1]) {
            Ok(parsed) => memory_markers.push(ParsedMemoryMarker {
                kind: parsed.kind,
                content: parsed.content,
                importance: parsed.importance,
            }),
            Err(err) => warn!(error = %err, "skipping malformed MEMORY marker"),
        }
    }

    let personal_logs: Vec<String> = personal_log_re()
        .captures_iter(raw_content)
        .map(|caps| caps[1].trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let stripped = personal_log_re().replace_all(raw_content, "");
    let stripped = memory_re().replace_all(&stripped, "");
    let content = stripped.trim().to_string();

    MarkerExtraction { content, memory_markers, personal_logs }
}
