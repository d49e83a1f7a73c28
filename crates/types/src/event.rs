use serde::{Deserialize, Serialize};

/// Egress events (spec.md §6). Typed so the Broadcaster can fan these out
/// without the host needing to parse free-form strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ArenaEvent {
    UserMessage {
        group_id: String,
        message_id: String,
        content: String,
    },
    AgentMessage {
        group_id: String,
        agent_id: String,
        turn_id: String,
        content: String,
    },
    TurnLog {
        group_id: String,
        turn_id: String,
        agent_id: String,
        duration_ms: u64,
        tool_count: usize,
        is_error: bool,
    },
    AgentStatus {
        group_id: String,
        agent_id: String,
        status: AgentStatus,
    },
    SystemMessage {
        group_id: String,
        content: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Analyzing,
    Done,
    Error,
}

impl ArenaEvent {
    pub fn group_id(&self) -> &str {
        match self {
            ArenaEvent::UserMessage { group_id, .. }
            | ArenaEvent::AgentMessage { group_id, .. }
            | ArenaEvent::TurnLog { group_id, .. }
            | ArenaEvent::AgentStatus { group_id, .. }
            | ArenaEvent::SystemMessage { group_id, .. } => group_id,
        }
    }
}
