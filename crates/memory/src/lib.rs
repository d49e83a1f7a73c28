//! Memory Plane: session-scoped shared memory with keyword+importance
//! retrieval, a derived rolling summary, and per-agent personal memory
//! (spec.md §4.4).

mod locks;
mod personal;
mod retrieval;
mod store;
mod summary;

pub use personal::PersonalMemory;
pub use store::MemoryStore;
pub use summary::SummaryStore;

use std::path::PathBuf;

use arena_types::{ArenaResult, MemoryEntry};

/// Facade wiring the Memory Store and Session Summary together so a memory
/// write always triggers a summary rebuild (spec.md §4.4).
pub struct MemoryPlane {
    store: MemoryStore,
    summary: SummaryStore,
    personal: PersonalMemory,
}

impl MemoryPlane {
    pub fn new(memory_dir: impl Into<PathBuf>) -> Self {
        let memory_dir = memory_dir.into();
        Self {
            store: MemoryStore::new(memory_dir.clone()),
            summary: SummaryStore::new(memory_dir),
            personal: PersonalMemory::new(),
        }
    }

    pub async fn record(&self, session_id: &str, entry: MemoryEntry) -> ArenaResult<()> {
        self.store.save_memory(session_id, entry).await?;
        let entries = self.store.get_all_memories(session_id).await?;
        self.summary.rebuild(session_id, &entries).await
    }

    pub async fn search(&self, session_id: &str, query: &str, k: usize) -> ArenaResult<Vec<MemoryEntry>> {
        self.store.search(session_id, query, k).await
    }

    pub async fn summary(&self, session_id: &str) -> ArenaResult<String> {
        self.summary.read(session_id).await
    }

    pub fn personal(&self) -> &PersonalMemory {
        &self.personal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_types::MemoryKind;

    #[tokio::test]
    async fn record_rebuilds_summary() {
        let dir = tempfile::tempdir().unwrap();
        let plane = MemoryPlane::new(dir.path());
        plane
            .record(
                "g1",
                MemoryEntry {
                    entry_id: uuid::Uuid::new_v4(),
                    session_id: "g1".to_string(),
                    content: "migrate to the new queue".to_string(),
                    kind: MemoryKind::Decision,
                    importance: 0.9,
                    created_at: chrono::Utc::now(),
                    source_message_id: None,
                },
            )
            .await
            .unwrap();

        let summary = plane.summary("g1").await.unwrap();
        assert!(summary.contains("migrate to the new queue"));
    }
}
