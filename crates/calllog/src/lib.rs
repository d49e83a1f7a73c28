//! Call Logger: append-only per-session record of every agent invocation
//! (spec.md §4.6). One JSONL file per session; reads return newest-first and
//! silently skip lines that fail to parse rather than fail the whole read.

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use arena_types::{ArenaError, ArenaResult, CallLogEntry};
use tokio::io::AsyncWriteExt;

pub struct CallLogger {
    logs_dir: PathBuf,
}

fn persistence_err(context: &str, e: impl std::fmt::Display) -> ArenaError {
    ArenaError::Persistence(format!("{context}: {e}"))
}

impl CallLogger {
    pub fn new(logs_dir: impl Into<PathBuf>) -> Self {
        Self { logs_dir: logs_dir.into() }
    }

    fn session_path(&self, session_id: &str) -> PathBuf {
        self.logs_dir.join(format!("session_{session_id}.jsonl"))
    }

    pub async fn save(&self, entry: &CallLogEntry) -> ArenaResult<()> {
        let path = self.session_path(&entry.session_id);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| persistence_err("creating logs directory", e))?;
        }
        let line = serde_json::to_string(entry).map_err(|e| persistence_err("serializing call log entry", e))?;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| persistence_err("opening call log file", e))?;
        file.write_all(line.as_bytes()).await.map_err(|e| persistence_err("writing call log entry", e))?;
        file.write_all(b"\n").await.map_err(|e| persistence_err("writing call log entry", e))?;
        file.flush().await.map_err(|e| persistence_err("flushing call log file", e))?;
        Ok(())
    }

    /// Newest-first (spec.md §4.6). Malformed lines are skipped, not an error.
    pub fn get_session_logs(&self, session_id: &str) -> ArenaResult<Vec<CallLogEntry>> {
        let path = self.session_path(session_id);
        read_reverse_chronological(&path)
    }
}

fn read_reverse_chronological(path: &Path) -> ArenaResult<Vec<CallLogEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let file = std::fs::File::open(path).map_err(|e| persistence_err("opening call log file", e))?;
    let reader = BufReader::new(file);
    let mut entries = Vec::new();
    for (line_idx, line_result) in reader.lines().enumerate() {
        let line = line_result.map_err(|e| persistence_err("reading call log line", e))?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<CallLogEntry>(&line) {
            Ok(entry) => entries.push(entry),
            Err(err) => {
                tracing::warn!(line = line_idx + 1, error = %err, path = %path.display(), "skipping malformed call log line");
            }
        }
    }
    entries.reverse();
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_types::InvocationMode;
    use chrono::Utc;
    use std::io::Write as _;
    use uuid::Uuid;

    fn entry(session_id: &str, agent_id: &str) -> CallLogEntry {
        CallLogEntry {
            log_id: Uuid::new_v4(),
            session_id: session_id.to_string(),
            turn_id: "t1".to_string(),
            agent_id: agent_id.to_string(),
            agent_name: agent_id.to_string(),
            mode: InvocationMode::MustReply,
            prompt: "prompt".to_string(),
            raw_output: "raw".to_string(),
            parsed_content: "parsed".to_string(),
            duration_ms: 100,
            cost: 0.0,
            prompt_tokens: None,
            completion_tokens: None,
            tool_calls: vec![],
            is_error: false,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn save_then_read_returns_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let logger = CallLogger::new(dir.path());
        logger.save(&entry("g1", "atlas")).await.unwrap();
        logger.save(&entry("g1", "borealis")).await.unwrap();

        let logs = logger.get_session_logs("g1").unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].agent_id, "borealis");
        assert_eq!(logs[1].agent_id, "atlas");
    }

    #[tokio::test]
    async fn unknown_session_returns_empty() {
        let dir = tempfile::tempdir().unwrap();
        let logger = CallLogger::new(dir.path());
        assert!(logger.get_session_logs("ghost").unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_line_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let logger = CallLogger::new(dir.path());
        logger.save(&entry("g1", "atlas")).await.unwrap();

        let path = dir.path().join("session_g1.jsonl");
        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "not valid json").unwrap();
        logger.save(&entry("g1", "borealis")).await.unwrap();

        let logs = logger.get_session_logs("g1").unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].agent_id, "borealis");
        assert_eq!(logs[1].agent_id, "atlas");
    }
}
