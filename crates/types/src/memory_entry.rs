use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Session-scoped shared memory kind (spec.md §4.4 marker grammar).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    Decision,
    Requirement,
    Task,
    Issue,
    Summary,
}

impl MemoryKind {
    /// Fixed grouping order used by the Session Summary rebuild (spec.md §4.4).
    pub const ORDER: [MemoryKind; 5] = [
        MemoryKind::Decision,
        MemoryKind::Requirement,
        MemoryKind::Task,
        MemoryKind::Issue,
        MemoryKind::Summary,
    ];

    pub fn heading(&self) -> &'static str {
        match self {
            MemoryKind::Decision => "decision",
            MemoryKind::Requirement => "requirement",
            MemoryKind::Task => "task",
            MemoryKind::Issue => "issue",
            MemoryKind::Summary => "summary",
        }
    }
}

pub const DEFAULT_IMPORTANCE: f32 = 0.7;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub entry_id: Uuid,
    pub session_id: String,
    pub content: String,
    pub kind: MemoryKind,
    pub importance: f32,
    pub created_at: DateTime<Utc>,
    pub source_message_id: Option<String>,
}
