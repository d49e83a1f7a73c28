//! Per-agent personal memory: a long-term `MEMORY.md` plus daily work logs
//! under `workspace_dir/memory/YYYY-MM-DD.md` (spec.md §4.4).

use std::path::Path;

use arena_types::{ArenaError, ArenaResult};
use chrono::{Duration, Utc};
use tokio::fs;

use crate::locks::KeyedLocks;

const MEMORY_MD_MAX_CHARS: usize = 2_400;
const DAILY_LOG_MAX_CHARS: usize = 1_600;

#[derive(Default)]
pub struct PersonalMemory {
    locks: KeyedLocks,
}

impl PersonalMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// `MEMORY.md` plus today's and yesterday's daily logs, each truncated
    /// independently, joined under headings. Missing files contribute nothing.
    pub async fn read_context(&self, workspace_dir: &Path) -> ArenaResult<String> {
        let mut parts = Vec::new();

        let memory_md = workspace_dir.join("MEMORY.md");
        if let Some(text) = read_truncated(&memory_md, MEMORY_MD_MAX_CHARS).await? {
            parts.push(format!("### Long-term memory\n{text}"));
        }

        let today = Utc::now().date_naive();
        let yesterday = today - Duration::days(1);
        for date in [today, yesterday] {
            let log_path = workspace_dir.join("memory").join(format!("{date}.md"));
            if let Some(text) = read_truncated(&log_path, DAILY_LOG_MAX_CHARS).await? {
                parts.push(format!("### {date} work log\n{text}"));
            }
        }

        Ok(parts.join("\n\n"))
    }

    /// Append a timestamped line to today's daily log, serializing concurrent
    /// writers for the same workspace.
    pub async fn append_daily_log(&self, workspace_dir: &Path, content: &str) -> ArenaResult<()> {
        let key = workspace_dir.to_string_lossy().into_owned();
        let lock = self.locks.lock_for(&key);
        let _guard = lock.lock().await;

        let memory_dir = workspace_dir.join("memory");
        fs::create_dir_all(&memory_dir)
            .await
            .map_err(|e| ArenaError::Persistence(format!("creating {}: {e}", memory_dir.display())))?;

        let now = Utc::now();
        let log_path = memory_dir.join(format!("{}.md", now.date_naive()));
        let line = format!("\n- [{}] {}\n", now.format("%H:%M"), content.trim());

        use tokio::io::AsyncWriteExt;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .await
            .map_err(|e| ArenaError::Persistence(format!("opening {}: {e}", log_path.display())))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| ArenaError::Persistence(format!("appending to {}: {e}", log_path.display())))
    }
}

async fn read_truncated(path: &Path, max_chars: usize) -> ArenaResult<Option<String>> {
    let text = match fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(ArenaError::Persistence(format!("reading {}: {e}", path.display()))),
    };
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() <= max_chars {
        return Ok(Some(trimmed.to_string()));
    }
    let truncated: String = trimmed.chars().take(max_chars).collect();
    Ok(Some(format!("{truncated}\n...(truncated)")))
}
