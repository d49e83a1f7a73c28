use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorKind {
    Human,
    Agent,
    System,
}

/// Key used to stash `next_mentions` in `Message::metadata` (spec.md §3).
pub const NEXT_MENTIONS_KEY: &str = "next_mentions";

/// Immutable once written (spec.md §3 invariant).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub message_id: String,
    pub group_id: String,
    /// Non-empty for `author_type = agent`; may be empty for human messages
    /// (spec.md §3 invariant).
    pub turn_id: String,
    pub author_id: String,
    pub author_kind: AuthorKind,
    pub author_name: String,
    pub content: String,
    pub mentions: Vec<String>,
    pub attachments: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub metadata: HashMap<String, Value>,
}

/// The Context Builder's dialogue form — a Stored Message adapted via the
/// author-type mapping in spec.md §4.5 (human→user, system→system,
/// otherwise→assistant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogueRole {
    User,
    Assistant,
    System,
}

impl From<AuthorKind> for DialogueRole {
    fn from(kind: AuthorKind) -> Self {
        match kind {
            AuthorKind::Human => DialogueRole::User,
            AuthorKind::System => DialogueRole::System,
            AuthorKind::Agent => DialogueRole::Assistant,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueMessage {
    pub role: DialogueRole,
    pub author_name: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl From<&StoredMessage> for DialogueMessage {
    fn from(msg: &StoredMessage) -> Self {
        Self {
            role: msg.author_kind.into(),
            author_name: msg.author_name.clone(),
            content: msg.content.clone(),
            timestamp: msg.timestamp,
        }
    }
}
