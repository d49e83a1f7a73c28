//! `@token` mention parsing and must/may partitioning (spec.md §4.1).
//!
//! The parser only matches `@token` at the start of a line or after
//! whitespace, so `user@example.com` and filenames are never mistaken for a
//! mention. `@` followed immediately by whitespace is not a mention either —
//! `\S+` requires at least one non-whitespace character.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

/// Literal broadcast tokens recognized in addition to `all` (spec.md §9
/// Open Question: restrict to the explicit set, no further enumeration).
const ALL_SYNONYMS: [&str; 2] = ["all", "所有人"];

fn mention_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)(?:^|\s)@(\S+)").expect("valid regex"))
}

pub struct AgentRoster<'a> {
    pub members: &'a [(String, String)],
}

impl<'a> AgentRoster<'a> {
    fn resolve(&self, token: &str) -> Option<Mention> {
        if ALL_SYNONYMS.contains(&token) {
            return Some(Mention::All);
        }
        if self.members.iter().any(|(id, _)| id == token) {
            return Some(Mention::Agent(token.to_string()));
        }
        self.members
            .iter()
            .find(|(_, name)| name == token)
            .map(|(id, _)| Mention::Agent(id.clone()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mention {
    All,
    Agent(String),
}

/// Parses `content` for mentions, resolving each token against `roster`.
/// Unresolvable tokens are discarded.
pub fn parse_mentions(content: &str, roster: &AgentRoster<'_>) -> Vec<Mention> {
    mention_re()
        .captures_iter(content)
        .filter_map(|caps| roster.resolve(&caps[1]))
        .collect()
}

/// Partitions `agent_members` into must-reply / may-reply per spec.md §4.1:
/// `@all` (or any broadcast synonym) makes everyone must-reply; otherwise
/// must = mentions ∩ roster, may = roster \ must; if neither set would be
/// non-empty, may = the whole roster (no mention at all).
pub fn partition(mentions: &[Mention], agent_members: &[String]) -> (HashSet<String>, HashSet<String>) {
    if mentions.iter().any(|m| matches!(m, Mention::All)) {
        return (agent_members.iter().cloned().collect(), HashSet::new());
    }

    let must: HashSet<String> = mentions
        .iter()
        .filter_map(|m| match m {
            Mention::Agent(id) if agent_members.contains(id) => Some(id.clone()),
            _ => None,
        })
        .collect();

    if must.is_empty() {
        return (HashSet::new(), agent_members.iter().cloned().collect());
    }

    let may = agent_members.iter().filter(|id| !must.contains(*id)).cloned().collect();
    (must, may)
}
