use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Group-wide scheduling and chaining parameters (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupConfig {
    /// Turn-wide cap on the number of agent speakers (must-reply is never
    /// gated by this — see spec.md §8 boundary behaviors).
    pub max_responders: usize,
    pub turn_timeout_seconds: u64,
    pub chain_depth_limit: u32,
    /// When `false`, an agent that already replied this turn is excluded from
    /// a chained follow-up turn's `must`/`may` sets.
    pub re_invoke_already_replied: bool,
    pub supervisor_enabled: bool,
    /// Minutes between automatic session-summary rebuild triggers outside of
    /// the per-memory-write rebuild already mandated by spec.md §4.4. `0`
    /// disables the periodic trigger (the per-write rebuild still runs).
    pub auto_summary_interval: u64,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            max_responders: 3,
            turn_timeout_seconds: 30,
            chain_depth_limit: 2,
            re_invoke_already_replied: false,
            supervisor_enabled: false,
            auto_summary_interval: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub group_id: String,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub config: GroupConfig,
}

impl Group {
    pub fn new(group_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            name: name.into(),
            description: String::new(),
            created_at: Utc::now(),
            config: GroupConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberKind {
    Human,
    Agent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMember {
    pub member_id: String,
    pub group_id: String,
    pub kind: MemberKind,
    pub agent_id: Option<String>,
    pub display_name: String,
    pub joined_at: DateTime<Utc>,
    pub role_override: Option<String>,
}

impl GroupMember {
    pub fn agent(group_id: impl Into<String>, agent_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        let agent_id = agent_id.into();
        Self {
            member_id: agent_id.clone(),
            group_id: group_id.into(),
            kind: MemberKind::Agent,
            agent_id: Some(agent_id),
            display_name: display_name.into(),
            joined_at: Utc::now(),
            role_override: None,
        }
    }

    pub fn human(group_id: impl Into<String>, member_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            member_id: member_id.into(),
            group_id: group_id.into(),
            kind: MemberKind::Human,
            agent_id: None,
            display_name: display_name.into(),
            joined_at: Utc::now(),
            role_override: None,
        }
    }
}
