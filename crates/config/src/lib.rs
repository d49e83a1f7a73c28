use std::fs;
use std::path::Path;

use anyhow::Result;
use arena_types::GroupConfig;
use serde::{Deserialize, Serialize};

/// Context Builder budgets (spec.md §4.2, §9 — "keep the caps configurable").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextBudget {
    /// `N` — most recent messages read per invocation.
    pub recent_message_count: usize,
    pub personal_memory_chars: usize,
    pub daily_log_chars: usize,
    pub memory_store_top_k: usize,
}

impl Default for ContextBudget {
    fn default() -> Self {
        Self {
            recent_message_count: 50,
            personal_memory_chars: 2_400,
            daily_log_chars: 1_600,
            memory_store_top_k: 5,
        }
    }
}

/// Session Summary rebuild parameters (spec.md §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    pub top_entries: usize,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self { top_entries: 20 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database_path: String,
    pub memory_dir: String,
    pub logs_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: "data/arena.redb".to_string(),
            memory_dir: "data/memory".to_string(),
            logs_dir: "data/logs".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub default_group_config: GroupConfig,
    pub context: ContextBudget,
    pub summary: SummaryConfig,
    pub storage: StorageConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::default();
        if let Ok(raw) = fs::read_to_string(path) {
            config = toml::from_str(&raw)?;
        }
        Ok(config)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        let rendered = toml::to_string_pretty(self)?;
        fs::write(path, rendered)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("arena.toml");
        let config = AppConfig::default();
        config.save_to(&path)?;
        let loaded = AppConfig::load_from(&path)?;
        assert_eq!(loaded.context.recent_message_count, config.context.recent_message_count);
        Ok(())
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_from("/nonexistent/path/arena.toml").unwrap();
        assert_eq!(config.default_group_config.max_responders, 3);
    }
}
