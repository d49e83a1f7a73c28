use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// CLI type tag — selects which adapter builds the prompt and interprets the
/// workspace convention for this agent (spec.md §4.3, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CliKind {
    Claude,
    Cursor,
    Generic,
}

/// Per-agent response policy: when an agent is in the `may_reply` set, these
/// fields are informational only — spec.md §4.1 delegates relevance judgement
/// to the agent itself via the invocation mode, not to scoring at this layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponsePolicy {
    pub auto_respond: bool,
    pub relevance_threshold: f32,
    pub priority_keywords: Vec<String>,
}

impl Default for ResponsePolicy {
    fn default() -> Self {
        Self {
            auto_respond: true,
            relevance_threshold: 0.5,
            priority_keywords: Vec::new(),
        }
    }
}

/// Describes the external command used to invoke this agent's CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CliDescriptor {
    pub kind: CliKind,
    pub command_override: Option<String>,
    pub timeout_seconds: u64,
    pub extra_args: Vec<String>,
    pub env: HashMap<String, String>,
}

impl Default for CliDescriptor {
    fn default() -> Self {
        Self {
            kind: CliKind::Generic,
            command_override: None,
            timeout_seconds: 60,
            extra_args: Vec::new(),
            env: HashMap::new(),
        }
    }
}

impl CliDescriptor {
    /// Resolves the program name to invoke, honoring an explicit override.
    pub fn command(&self) -> &str {
        self.command_override.as_deref().unwrap_or(match self.kind {
            CliKind::Claude => "claude",
            CliKind::Cursor => "cursor-agent",
            CliKind::Generic => "agent",
        })
    }
}

/// Identity and invocation parameters for one agent. Owned by the Registry;
/// created by onboarding, mutated only via explicit update, destroyed by
/// removal (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProfile {
    pub agent_id: String,
    pub display_name: String,
    pub avatar: Option<String>,
    pub workspace_dir: PathBuf,
    pub role_prompt: String,
    pub skill_tags: Vec<String>,
    pub response_policy: ResponsePolicy,
    pub cli: CliDescriptor,
    pub max_output_tokens: u32,
}

impl AgentProfile {
    pub fn new(agent_id: impl Into<String>, display_name: impl Into<String>, workspace_dir: PathBuf) -> Self {
        Self {
            agent_id: agent_id.into(),
            display_name: display_name.into(),
            avatar: None,
            workspace_dir,
            role_prompt: String::new(),
            skill_tags: Vec::new(),
            response_policy: ResponsePolicy::default(),
            cli: CliDescriptor::default(),
            max_output_tokens: 1024,
        }
    }
}

/// A peer reference exposed to another agent's prompt (self excluded).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerInfo {
    pub agent_id: String,
    pub display_name: String,
    pub skill_tags: Vec<String>,
}

impl From<&AgentProfile> for PeerInfo {
    fn from(profile: &AgentProfile) -> Self {
        Self {
            agent_id: profile.agent_id.clone(),
            display_name: profile.display_name.clone(),
            skill_tags: profile.skill_tags.clone(),
        }
    }
}
