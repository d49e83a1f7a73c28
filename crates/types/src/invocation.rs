use serde::{Deserialize, Serialize};

use crate::message::DialogueMessage;
use crate::profile::PeerInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationMode {
    MustReply,
    MayReply,
}

/// Context Builder output — one per agent per turn (spec.md §3, §4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationRecord {
    pub session_id: String,
    pub turn_id: String,
    pub agent_id: String,
    pub agent_display_name: String,
    pub role_prompt: String,
    pub mode: InvocationMode,
    pub mentioned_by: Option<String>,
    pub messages: Vec<DialogueMessage>,
    pub peers: Vec<PeerInfo>,
    pub memory_context: Option<String>,
    pub max_output_tokens: u32,
    pub prefer_concise: bool,
}

/// Adapter execution metadata carried alongside an `AgentOutput`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionMeta {
    pub duration_ms: u64,
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub tool_calls: Vec<String>,
    pub is_error: bool,
}

/// Content already has memory markers stripped — adapters stay pure with
/// respect to the model; the Orchestrator, not the adapter, processes the
/// memory/personal-log markers (spec.md §4.3, §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentOutput {
    pub content: String,
    pub next_mentions: Vec<String>,
    pub should_respond: bool,
    pub execution_meta: ExecutionMeta,
    pub prompt_sent: String,
}

impl AgentOutput {
    pub fn skip(prompt_sent: String) -> Self {
        Self {
            content: String::new(),
            next_mentions: Vec::new(),
            should_respond: false,
            execution_meta: ExecutionMeta::default(),
            prompt_sent,
        }
    }

    pub fn error_sentinel(prefix: &str, detail: &str, prompt_sent: String) -> Self {
        Self {
            content: format!("[{prefix}] {detail}"),
            next_mentions: Vec::new(),
            should_respond: true,
            execution_meta: ExecutionMeta {
                is_error: true,
                ..Default::default()
            },
            prompt_sent,
        }
    }
}
