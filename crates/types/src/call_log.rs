use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::invocation::InvocationMode;

/// Append-only (spec.md §3, §4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallLogEntry {
    pub log_id: Uuid,
    pub session_id: String,
    pub turn_id: String,
    pub agent_id: String,
    pub agent_name: String,
    pub mode: InvocationMode,
    pub prompt: String,
    pub raw_output: String,
    pub parsed_content: String,
    pub duration_ms: u64,
    pub cost: f64,
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub tool_calls: Vec<String>,
    pub is_error: bool,
    pub timestamp: DateTime<Utc>,
}
