//! In-memory agent-profile table.
//!
//! Read-mostly, in-process. Onboarding/removal writes are serialized at the
//! registry boundary by a single `RwLock` (spec.md §5 shared-resource policy).

use std::collections::HashMap;
use std::sync::RwLock;

use arena_types::{AgentProfile, ArenaError, ArenaResult, PeerInfo};
use tracing::info;

#[derive(Default)]
pub struct Registry {
    profiles: RwLock<HashMap<String, AgentProfile>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Onboard a new agent profile, or replace an existing one with the same id.
    pub fn upsert(&self, profile: AgentProfile) {
        let agent_id = profile.agent_id.clone();
        self.profiles
            .write()
            .expect("registry lock poisoned")
            .insert(agent_id.clone(), profile);
        info!(agent_id, "agent profile registered");
    }

    pub fn remove(&self, agent_id: &str) -> Option<AgentProfile> {
        let removed = self
            .profiles
            .write()
            .expect("registry lock poisoned")
            .remove(agent_id);
        if removed.is_some() {
            info!(agent_id, "agent profile removed");
        }
        removed
    }

    pub fn get(&self, agent_id: &str) -> Option<AgentProfile> {
        self.profiles
            .read()
            .expect("registry lock poisoned")
            .get(agent_id)
            .cloned()
    }

    /// Resolve the agent profile; fails the whole build if missing
    /// (Context Builder step 1, spec.md §4.2).
    pub fn require(&self, agent_id: &str) -> ArenaResult<AgentProfile> {
        self.get(agent_id)
            .ok_or_else(|| ArenaError::Config(format!("agent '{agent_id}' not in registry")))
    }

    /// Resolve every other roster id against the registry; unresolved ids are
    /// skipped (Context Builder step 2, spec.md §4.2).
    pub fn resolve_peers(&self, self_id: &str, roster: &[String]) -> Vec<PeerInfo> {
        let profiles = self.profiles.read().expect("registry lock poisoned");
        roster
            .iter()
            .filter(|id| id.as_str() != self_id)
            .filter_map(|id| profiles.get(id))
            .map(PeerInfo::from)
            .collect()
    }

    pub fn exists(&self, agent_id: &str) -> bool {
        self.profiles
            .read()
            .expect("registry lock poisoned")
            .contains_key(agent_id)
    }

    /// Exact display-name match within a candidate roster.
    pub fn resolve_by_display_name(&self, roster: &[String], name: &str) -> Option<String> {
        let profiles = self.profiles.read().expect("registry lock poisoned");
        roster
            .iter()
            .find(|id| profiles.get(*id).is_some_and(|p| p.display_name == name))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.profiles.read().expect("registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn profile(id: &str, name: &str) -> AgentProfile {
        AgentProfile::new(id, name, PathBuf::from("/tmp/ws"))
    }

    #[test]
    fn upsert_then_get_round_trips() {
        let registry = Registry::new();
        registry.upsert(profile("a1", "Atlas"));
        assert_eq!(registry.get("a1").unwrap().display_name, "Atlas");
    }

    #[test]
    fn require_fails_for_unknown_agent() {
        let registry = Registry::new();
        assert!(registry.require("ghost").is_err());
    }

    #[test]
    fn resolve_peers_excludes_self_and_skips_unresolved() {
        let registry = Registry::new();
        registry.upsert(profile("a1", "Atlas"));
        registry.upsert(profile("a2", "Borealis"));
        let roster = vec!["a1".to_string(), "a2".to_string(), "ghost".to_string()];
        let peers = registry.resolve_peers("a1", &roster);
        let ids: Vec<_> = peers.iter().map(|p| p.agent_id.as_str()).collect();
        assert_eq!(ids, vec!["a2"]);
    }

    #[test]
    fn remove_makes_agent_unresolvable() {
        let registry = Registry::new();
        registry.upsert(profile("a1", "Atlas"));
        registry.remove("a1");
        assert!(!registry.exists("a1"));
    }
}
