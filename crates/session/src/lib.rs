//! Session Manager: persistence over an embedded relational store — groups,
//! group members, and messages — with cascade delete and an index mirroring
//! `messages(group_id)` / `messages(timestamp)` (spec.md §4.5). Pure data
//! plumbing; it holds no orchestration state.

use std::path::Path;

use arena_types::{ArenaError, ArenaResult, Group, GroupMember, StoredMessage};
use chrono::{DateTime, Utc};
use redb::{Database, ReadableTable, TableDefinition};

const GROUPS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("groups");
const MEMBERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("group_members");
/// `group_id -> newline-joined member_id list`, in join order.
const MEMBERS_BY_GROUP_TABLE: TableDefinition<&str, &str> = TableDefinition::new("members_by_group");
const MESSAGES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("messages");
/// `group_id -> newline-joined message_id list`, in chronological insertion order —
/// this list IS the `messages(group_id)` / `messages(timestamp)` index.
const MESSAGES_BY_GROUP_TABLE: TableDefinition<&str, &str> = TableDefinition::new("messages_by_group");

pub struct SessionManager {
    db: Database,
}

fn persistence_err(context: &str, e: impl std::fmt::Display) -> ArenaError {
    ArenaError::Persistence(format!("{context}: {e}"))
}

fn split_ids(joined: &str) -> Vec<String> {
    joined.lines().filter(|l| !l.is_empty()).map(str::to_string).collect()
}

fn join_ids(ids: &[String]) -> String {
    ids.join("\n")
}

impl SessionManager {
    pub fn open(path: impl AsRef<Path>) -> ArenaResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| persistence_err("creating data directory", e))?;
        }
        let db = Database::create(path).map_err(|e| persistence_err("opening session database", e))?;
        let tx = db.begin_write().map_err(|e| persistence_err("opening init transaction", e))?;
        {
            tx.open_table(GROUPS_TABLE).map_err(|e| persistence_err("creating groups table", e))?;
            tx.open_table(MEMBERS_TABLE).map_err(|e| persistence_err("creating group_members table", e))?;
            tx.open_table(MEMBERS_BY_GROUP_TABLE)
                .map_err(|e| persistence_err("creating members_by_group table", e))?;
            tx.open_table(MESSAGES_TABLE).map_err(|e| persistence_err("creating messages table", e))?;
            tx.open_table(MESSAGES_BY_GROUP_TABLE)
                .map_err(|e| persistence_err("creating messages_by_group table", e))?;
        }
        tx.commit().map_err(|e| persistence_err("committing init transaction", e))?;
        Ok(Self { db })
    }

    // ── groups ──────────────────────────────────────────────────────────────

    pub fn create_group(&self, group: Group) -> ArenaResult<Group> {
        let body = serde_json::to_vec(&group).map_err(|e| persistence_err("serializing group", e))?;
        let tx = self.db.begin_write().map_err(|e| persistence_err("opening write txn", e))?;
        {
            let mut table = tx.open_table(GROUPS_TABLE).map_err(|e| persistence_err("opening groups table", e))?;
            table
                .insert(group.group_id.as_str(), body.as_slice())
                .map_err(|e| persistence_err("inserting group", e))?;
        }
        tx.commit().map_err(|e| persistence_err("committing group insert", e))?;
        Ok(group)
    }

    pub fn get_group(&self, group_id: &str) -> ArenaResult<Option<Group>> {
        let tx = self.db.begin_read().map_err(|e| persistence_err("opening read txn", e))?;
        let table = tx.open_table(GROUPS_TABLE).map_err(|e| persistence_err("opening groups table", e))?;
        let Some(value) = table.get(group_id).map_err(|e| persistence_err("reading group", e))? else {
            return Ok(None);
        };
        let group: Group = serde_json::from_slice(value.value()).map_err(|e| persistence_err("deserializing group", e))?;
        Ok(Some(group))
    }

    pub fn list_groups(&self) -> ArenaResult<Vec<Group>> {
        let tx = self.db.begin_read().map_err(|e| persistence_err("opening read txn", e))?;
        let table = tx.open_table(GROUPS_TABLE).map_err(|e| persistence_err("opening groups table", e))?;
        let mut groups = Vec::new();
        for entry in table.iter().map_err(|e| persistence_err("iterating groups", e))? {
            let (_, value) = entry.map_err(|e| persistence_err("reading group row", e))?;
            let group: Group = serde_json::from_slice(value.value()).map_err(|e| persistence_err("deserializing group", e))?;
            groups.push(group);
        }
        groups.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(groups)
    }

    /// Deletes the group and cascades to its members and messages.
    pub fn delete_group(&self, group_id: &str) -> ArenaResult<()> {
        let tx = self.db.begin_write().map_err(|e| persistence_err("opening write txn", e))?;
        {
            let mut groups = tx.open_table(GROUPS_TABLE).map_err(|e| persistence_err("opening groups table", e))?;
            groups.remove(group_id).map_err(|e| persistence_err("removing group", e))?;

            let mut members = tx.open_table(MEMBERS_TABLE).map_err(|e| persistence_err("opening members table", e))?;
            let mut members_by_group = tx
                .open_table(MEMBERS_BY_GROUP_TABLE)
                .map_err(|e| persistence_err("opening members_by_group table", e))?;
            if let Some(joined) = members_by_group
                .remove(group_id)
                .map_err(|e| persistence_err("removing members_by_group entry", e))?
            {
                for member_id in split_ids(joined.value()) {
                    members.remove(member_id.as_str()).map_err(|e| persistence_err("removing member", e))?;
                }
            }

            let mut messages = tx.open_table(MESSAGES_TABLE).map_err(|e| persistence_err("opening messages table", e))?;
            let mut messages_by_group = tx
                .open_table(MESSAGES_BY_GROUP_TABLE)
                .map_err(|e| persistence_err("opening messages_by_group table", e))?;
            if let Some(joined) = messages_by_group
                .remove(group_id)
                .map_err(|e| persistence_err("removing messages_by_group entry", e))?
            {
                for message_id in split_ids(joined.value()) {
                    messages.remove(message_id.as_str()).map_err(|e| persistence_err("removing message", e))?;
                }
            }
        }
        tx.commit().map_err(|e| persistence_err("committing group delete", e))
    }

    // ── members ─────────────────────────────────────────────────────────────

    pub fn add_member(&self, member: GroupMember) -> ArenaResult<GroupMember> {
        let body = serde_json::to_vec(&member).map_err(|e| persistence_err("serializing member", e))?;
        let tx = self.db.begin_write().map_err(|e| persistence_err("opening write txn", e))?;
        {
            let mut members = tx.open_table(MEMBERS_TABLE).map_err(|e| persistence_err("opening members table", e))?;
            members
                .insert(member.member_id.as_str(), body.as_slice())
                .map_err(|e| persistence_err("inserting member", e))?;

            let mut members_by_group = tx
                .open_table(MEMBERS_BY_GROUP_TABLE)
                .map_err(|e| persistence_err("opening members_by_group table", e))?;
            let mut ids = members_by_group
                .get(member.group_id.as_str())
                .map_err(|e| persistence_err("reading members_by_group", e))?
                .map(|v| split_ids(v.value()))
                .unwrap_or_default();
            ids.push(member.member_id.clone());
            members_by_group
                .insert(member.group_id.as_str(), join_ids(&ids).as_str())
                .map_err(|e| persistence_err("updating members_by_group", e))?;
        }
        tx.commit().map_err(|e| persistence_err("committing member insert", e))?;
        Ok(member)
    }

    pub fn remove_member(&self, group_id: &str, member_id: &str) -> ArenaResult<()> {
        let tx = self.db.begin_write().map_err(|e| persistence_err("opening write txn", e))?;
        {
            let mut members = tx.open_table(MEMBERS_TABLE).map_err(|e| persistence_err("opening members table", e))?;
            members.remove(member_id).map_err(|e| persistence_err("removing member", e))?;

            let mut members_by_group = tx
                .open_table(MEMBERS_BY_GROUP_TABLE)
                .map_err(|e| persistence_err("opening members_by_group table", e))?;
            let joined_opt = members_by_group
                .get(group_id)
                .map_err(|e| persistence_err("reading members_by_group", e))?
                .map(|v| v.value().to_string());
            if let Some(joined) = joined_opt
            {
                let remaining: Vec<String> = split_ids(&joined).into_iter().filter(|id| id != member_id).collect();
                members_by_group
                    .insert(group_id, join_ids(&remaining).as_str())
                    .map_err(|e| persistence_err("updating members_by_group", e))?;
            }
        }
        tx.commit().map_err(|e| persistence_err("committing member removal", e))
    }

    /// Members in join order (spec.md §4.5 plumbing, no orchestration logic).
    pub fn list_group_members(&self, group_id: &str) -> ArenaResult<Vec<GroupMember>> {
        let tx = self.db.begin_read().map_err(|e| persistence_err("opening read txn", e))?;
        let members_by_group = tx
            .open_table(MEMBERS_BY_GROUP_TABLE)
            .map_err(|e| persistence_err("opening members_by_group table", e))?;
        let Some(joined) = members_by_group
            .get(group_id)
            .map_err(|e| persistence_err("reading members_by_group", e))?
        else {
            return Ok(Vec::new());
        };
        let ids = split_ids(joined.value());
        drop(joined);

        let members = tx.open_table(MEMBERS_TABLE).map_err(|e| persistence_err("opening members table", e))?;
        let mut result = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(value) = members.get(id.as_str()).map_err(|e| persistence_err("reading member", e))? {
                let member: GroupMember =
                    serde_json::from_slice(value.value()).map_err(|e| persistence_err("deserializing member", e))?;
                result.push(member);
            }
        }
        Ok(result)
    }

    // ── messages ────────────────────────────────────────────────────────────

    /// Immutable once written (spec.md §3 invariant).
    pub fn save_message(&self, message: StoredMessage) -> ArenaResult<StoredMessage> {
        let body = serde_json::to_vec(&message).map_err(|e| persistence_err("serializing message", e))?;
        let tx = self.db.begin_write().map_err(|e| persistence_err("opening write txn", e))?;
        {
            let mut messages = tx.open_table(MESSAGES_TABLE).map_err(|e| persistence_err("opening messages table", e))?;
            messages
                .insert(message.message_id.as_str(), body.as_slice())
                .map_err(|e| persistence_err("inserting message", e))?;

            let mut messages_by_group = tx
                .open_table(MESSAGES_BY_GROUP_TABLE)
                .map_err(|e| persistence_err("opening messages_by_group table", e))?;
            let mut ids = messages_by_group
                .get(message.group_id.as_str())
                .map_err(|e| persistence_err("reading messages_by_group", e))?
                .map(|v| split_ids(v.value()))
                .unwrap_or_default();
            ids.push(message.message_id.clone());
            messages_by_group
                .insert(message.group_id.as_str(), join_ids(&ids).as_str())
                .map_err(|e| persistence_err("updating messages_by_group", e))?;
        }
        tx.commit().map_err(|e| persistence_err("committing message insert", e))?;
        Ok(message)
    }

    /// Up to `limit` messages older than `before` (or the newest `limit` if
    /// `before` is `None`), returned in chronological order (spec.md §4.5).
    pub fn get_messages(&self, group_id: &str, limit: usize, before: Option<DateTime<Utc>>) -> ArenaResult<Vec<StoredMessage>> {
        let tx = self.db.begin_read().map_err(|e| persistence_err("opening read txn", e))?;
        let messages_by_group = tx
            .open_table(MESSAGES_BY_GROUP_TABLE)
            .map_err(|e| persistence_err("opening messages_by_group table", e))?;
        let Some(joined) = messages_by_group
            .get(group_id)
            .map_err(|e| persistence_err("reading messages_by_group", e))?
        else {
            return Ok(Vec::new());
        };
        let ids = split_ids(joined.value());
        drop(joined);

        let messages_table = tx.open_table(MESSAGES_TABLE).map_err(|e| persistence_err("opening messages table", e))?;
        let mut all = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(value) = messages_table.get(id.as_str()).map_err(|e| persistence_err("reading message", e))? {
                let msg: StoredMessage =
                    serde_json::from_slice(value.value()).map_err(|e| persistence_err("deserializing message", e))?;
                all.push(msg);
            }
        }

        let filtered: Vec<StoredMessage> = match before {
            Some(cursor) => all.into_iter().filter(|m| m.timestamp < cursor).collect(),
            None => all,
        };
        let start = filtered.len().saturating_sub(limit);
        Ok(filtered[start..].to_vec())
    }
}
