use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// In-memory only — never persisted (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub turn_id: String,
    pub group_id: String,
    pub trigger_source: String,
    pub must_reply: HashSet<String>,
    pub may_reply: HashSet<String>,
    pub all_agent_ids: Vec<String>,
    pub max_responders: usize,
    pub timeout_seconds: u64,
    pub chain_depth: u32,
}

impl Turn {
    /// Union of must/may is a subset of the group's agent members; the two
    /// sets are disjoint (spec.md §3, §8 invariants).
    pub fn is_well_formed(&self) -> bool {
        let roster: HashSet<&String> = self.all_agent_ids.iter().collect();
        self.must_reply.is_disjoint(&self.may_reply)
            && self.must_reply.iter().all(|id| roster.contains(id))
            && self.may_reply.iter().all(|id| roster.contains(id))
    }
}
