//! Turns a small TOML roster file into a seeded group: one `Group`, one
//! `GroupMember` + `AgentProfile` per agent. Exists purely so `arena send`
//! has something to exercise the core against; the real onboarding flow
//! (spec.md §1 Non-goals) is out of scope here.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use arena_registry::Registry;
use arena_session::SessionManager;
use arena_types::{AgentProfile, CliDescriptor, CliKind, Group, GroupConfig, GroupMember};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Roster {
    pub group_name: String,
    #[serde(default)]
    pub agents: Vec<RosterAgent>,
}

#[derive(Debug, Deserialize)]
pub struct RosterAgent {
    pub agent_id: String,
    pub display_name: String,
    pub workspace_dir: PathBuf,
    #[serde(default)]
    pub role_prompt: String,
    #[serde(default = "default_cli_kind")]
    pub cli_kind: String,
    pub command_override: Option<String>,
}

fn default_cli_kind() -> String {
    "generic".to_string()
}

impl Roster {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
    }
}

/// Creates the group (idempotent: reuses a group already named `group_name`),
/// registers every agent in the Registry, and adds them as group members.
/// Returns the group id.
pub fn apply(roster: &Roster, registry: &Registry, sessions: &SessionManager, default_config: &GroupConfig) -> Result<String> {
    let existing = sessions
        .list_groups()
        .context("listing groups")?
        .into_iter()
        .find(|g| g.name == roster.group_name);

    let group = match existing {
        Some(group) => group,
        None => {
            let mut group = Group::new(uuid::Uuid::new_v4().to_string(), roster.group_name.clone());
            group.config = default_config.clone();
            sessions.create_group(group).context("creating group")?
        }
    };

    let members = sessions.list_group_members(&group.group_id).context("listing members")?;

    for agent in &roster.agents {
        std::fs::create_dir_all(&agent.workspace_dir)
            .with_context(|| format!("creating workspace {}", agent.workspace_dir.display()))?;

        let kind = parse_cli_kind(&agent.cli_kind);
        let mut profile = AgentProfile::new(agent.agent_id.clone(), agent.display_name.clone(), agent.workspace_dir.clone());
        profile.role_prompt = agent.role_prompt.clone();
        profile.cli = CliDescriptor {
            kind,
            command_override: agent.command_override.clone(),
            ..CliDescriptor::default()
        };
        registry.upsert(profile);

        match kind {
            CliKind::Claude => arena_exec::write_claude_md(&agent.workspace_dir, &agent.role_prompt)
                .with_context(|| format!("writing CLAUDE.md for {}", agent.agent_id))?,
            CliKind::Cursor => arena_exec::write_role_rule(&agent.workspace_dir, &agent.role_prompt)
                .with_context(|| format!("writing role rule for {}", agent.agent_id))?,
            CliKind::Generic => {}
        }

        if !members.iter().any(|m| m.agent_id.as_deref() == Some(agent.agent_id.as_str())) {
            sessions
                .add_member(GroupMember::agent(group.group_id.clone(), agent.agent_id.clone(), agent.display_name.clone()))
                .context("adding member")?;
        }
    }

    Ok(group.group_id)
}

fn parse_cli_kind(raw: &str) -> CliKind {
    match raw {
        "claude" => CliKind::Claude,
        "cursor" => CliKind::Cursor,
        _ => CliKind::Generic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_group_and_registers_agents() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::new();
        let sessions = SessionManager::open(dir.path().join("arena.redb")).unwrap();

        let roster = Roster {
            group_name: "Squad".to_string(),
            agents: vec![RosterAgent {
                agent_id: "atlas".to_string(),
                display_name: "Atlas".to_string(),
                workspace_dir: dir.path().join("atlas"),
                role_prompt: "You design systems.".to_string(),
                cli_kind: "generic".to_string(),
                command_override: Some("echo".to_string()),
            }],
        };

        let group_id = apply(&roster, &registry, &sessions, &GroupConfig::default()).unwrap();
        assert!(registry.exists("atlas"));
        let members = sessions.list_group_members(&group_id).unwrap();
        assert_eq!(members.len(), 1);
    }

    #[test]
    fn applying_twice_does_not_duplicate_the_group_or_member() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::new();
        let sessions = SessionManager::open(dir.path().join("arena.redb")).unwrap();

        let roster = Roster {
            group_name: "Squad".to_string(),
            agents: vec![RosterAgent {
                agent_id: "atlas".to_string(),
                display_name: "Atlas".to_string(),
                workspace_dir: dir.path().join("atlas"),
                role_prompt: String::new(),
                cli_kind: "generic".to_string(),
                command_override: Some("echo".to_string()),
            }],
        };

        let first = apply(&roster, &registry, &sessions, &GroupConfig::default()).unwrap();
        let second = apply(&roster, &registry, &sessions, &GroupConfig::default()).unwrap();
        assert_eq!(first, second);
        assert_eq!(sessions.list_groups().unwrap().len(), 1);
        assert_eq!(sessions.list_group_members(&first).unwrap().len(), 1);
    }
}
