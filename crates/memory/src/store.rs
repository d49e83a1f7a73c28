//! Memory Store: one JSON file per session, keyword+importance retrieval
//! (spec.md §4.4).

use std::path::{Path, PathBuf};

use arena_types::{ArenaError, ArenaResult, MemoryEntry};
use tokio::fs;

use crate::locks::KeyedLocks;
use crate::retrieval;

pub struct MemoryStore {
    memory_dir: PathBuf,
    locks: KeyedLocks,
}

impl MemoryStore {
    pub fn new(memory_dir: impl Into<PathBuf>) -> Self {
        Self {
            memory_dir: memory_dir.into(),
            locks: KeyedLocks::new(),
        }
    }

    fn session_file(&self, session_id: &str) -> PathBuf {
        self.memory_dir.join(format!("session_{session_id}.json"))
    }

    /// Append a memory entry to the session's file, serializing concurrent
    /// writers on the same session.
    pub async fn save_memory(&self, session_id: &str, entry: MemoryEntry) -> ArenaResult<()> {
        let lock = self.locks.lock_for(session_id);
        let _guard = lock.lock().await;

        let path = self.session_file(session_id);
        let mut entries = load_entries(&path).await?;
        entries.push(entry);
        write_entries_atomic(&path, &entries).await
    }

    pub async fn get_all_memories(&self, session_id: &str) -> ArenaResult<Vec<MemoryEntry>> {
        load_entries(&self.session_file(session_id)).await
    }

    /// Top-k entries scored against `query` (spec.md §4.4 formula).
    pub async fn search(&self, session_id: &str, query: &str, k: usize) -> ArenaResult<Vec<MemoryEntry>> {
        let entries = self.get_all_memories(session_id).await?;
        Ok(retrieval::search(&entries, query, k)
            .into_iter()
            .map(|(entry, _score)| entry.clone())
            .collect())
    }
}

async fn load_entries(path: &Path) -> ArenaResult<Vec<MemoryEntry>> {
    match fs::read_to_string(path).await {
        Ok(text) => serde_json::from_str(&text)
            .map_err(|e| ArenaError::Persistence(format!("corrupt memory file {}: {e}", path.display()))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(ArenaError::Persistence(format!("reading {}: {e}", path.display()))),
    }
}

/// Write-temp-then-rename so a crash mid-write never leaves a truncated file
/// (mirrors the event-log overwrite pattern used elsewhere in this plane).
async fn write_entries_atomic(path: &Path, entries: &[MemoryEntry]) -> ArenaResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| ArenaError::Persistence(format!("creating {}: {e}", parent.display())))?;
    }
    let tmp_path = path.with_extension("json.tmp");
    let body = serde_json::to_vec_pretty(entries)
        .map_err(|e| ArenaError::Persistence(format!("serializing memory entries: {e}")))?;

    let write_result = fs::write(&tmp_path, body).await;
    if let Err(e) = write_result {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(ArenaError::Persistence(format!("writing {}: {e}", tmp_path.display())));
    }
    fs::rename(&tmp_path, path)
        .await
        .map_err(|e| ArenaError::Persistence(format!("renaming {} -> {}: {e}", tmp_path.display(), path.display())))
}
