//! Session Summary: a rolling Markdown digest rebuilt from Memory Store
//! entries, injected into every invocation alongside conversation history
//! (spec.md §4.4). No extra model call — pure text formatting over whatever
//! the Memory Store already holds.

use std::path::{Path, PathBuf};

use arena_types::{ArenaError, ArenaResult, MemoryEntry, MemoryKind};
use tokio::fs;

const MAX_ENTRIES: usize = 20;

pub struct SummaryStore {
    memory_dir: PathBuf,
}

impl SummaryStore {
    pub fn new(memory_dir: impl Into<PathBuf>) -> Self {
        Self { memory_dir: memory_dir.into() }
    }

    fn summary_path(&self, session_id: &str) -> PathBuf {
        self.memory_dir.join(format!("summary_{session_id}.md"))
    }

    pub async fn read(&self, session_id: &str) -> ArenaResult<String> {
        match fs::read_to_string(self.summary_path(session_id)).await {
            Ok(text) => Ok(text.trim().to_string()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(ArenaError::Persistence(format!("reading session summary: {e}"))),
        }
    }

    /// Rebuild and persist the summary file for `session_id` from `entries`.
    /// A no-op when there are no entries yet.
    pub async fn rebuild(&self, session_id: &str, entries: &[MemoryEntry]) -> ArenaResult<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let rendered = render_summary(entries);
        let path = self.summary_path(session_id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ArenaError::Persistence(format!("creating {}: {e}", parent.display())))?;
        }
        write_atomic(&path, &rendered).await
    }
}

fn render_summary(entries: &[MemoryEntry]) -> String {
    let mut sorted: Vec<&MemoryEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    sorted.truncate(MAX_ENTRIES);

    let mut lines = vec!["# Session Summary".to_string(), String::new()];
    for kind in MemoryKind::ORDER {
        let items: Vec<&str> = sorted
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| e.content.as_str())
            .collect();
        if items.is_empty() {
            continue;
        }
        lines.push(format!("## {}", kind.heading()));
        for item in items {
            lines.push(format!("- {item}"));
        }
        lines.push(String::new());
    }
    lines.join("\n")
}

async fn write_atomic(path: &Path, content: &str) -> ArenaResult<()> {
    let tmp_path = path.with_extension("md.tmp");
    if let Err(e) = fs::write(&tmp_path, content).await {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(ArenaError::Persistence(format!("writing {}: {e}", tmp_path.display())));
    }
    fs::rename(&tmp_path, path)
        .await
        .map_err(|e| ArenaError::Persistence(format!("renaming {} -> {}: {e}", tmp_path.display(), path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn entry(content: &str, kind: MemoryKind, importance: f32) -> MemoryEntry {
        MemoryEntry {
            entry_id: Uuid::new_v4(),
            session_id: "g1".to_string(),
            content: content.to_string(),
            kind,
            importance,
            created_at: Utc::now(),
            source_message_id: None,
        }
    }

    #[tokio::test]
    async fn rebuild_then_read_round_trips_and_groups_by_kind() {
        let dir = tempfile::tempdir().unwrap();
        let store = SummaryStore::new(dir.path());
        let entries = vec![
            entry("ship by friday", MemoryKind::Decision, 0.9),
            entry("needs dark mode", MemoryKind::Requirement, 0.6),
        ];
        store.rebuild("g1", &entries).await.unwrap();
        let text = store.read("g1").await.unwrap();
        assert!(text.contains("ship by friday"));
        assert!(text.contains("needs dark mode"));
        let decision_pos = text.find("ship by friday").unwrap();
        let requirement_pos = text.find("needs dark mode").unwrap();
        assert!(decision_pos < requirement_pos, "Decision group must precede Requirement group");
    }

    #[tokio::test]
    async fn empty_entries_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = SummaryStore::new(dir.path());
        store.rebuild("g1", &[]).await.unwrap();
        assert_eq!(store.read("g1").await.unwrap(), "");
    }

    #[tokio::test]
    async fn caps_at_twenty_entries_by_importance() {
        let dir = tempfile::tempdir().unwrap();
        let store = SummaryStore::new(dir.path());
        let entries: Vec<MemoryEntry> = (0..30)
            .map(|i| entry(&format!("item {i}"), MemoryKind::Task, i as f32 / 30.0))
            .collect();
        store.rebuild("g1", &entries).await.unwrap();
        let text = store.read("g1").await.unwrap();
        assert!(text.contains("item 29"));
        assert!(!text.contains("item 0\n") && !text.contains("item 5\n"));
    }
}
