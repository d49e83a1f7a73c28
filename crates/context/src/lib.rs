//! Context Builder: assembles one `InvocationRecord` per agent per turn
//! (spec.md §4.2). Five steps: resolve the agent's profile, build its peer
//! list, read recent history, assemble a merged memory string in strict
//! priority order, then emit the record. Any layer that comes back empty is
//! skipped — the merged string never carries empty section headers.

use std::sync::Arc;

use arena_config::ContextBudget;
use arena_memory::MemoryPlane;
use arena_registry::Registry;
use arena_session::SessionManager;
use arena_types::{ArenaResult, DialogueMessage, InvocationMode, InvocationRecord};

pub struct ContextBuilder {
    registry: Arc<Registry>,
    sessions: Arc<SessionManager>,
    memory: Arc<MemoryPlane>,
    budget: ContextBudget,
}

impl ContextBuilder {
    pub fn new(registry: Arc<Registry>, sessions: Arc<SessionManager>, memory: Arc<MemoryPlane>, budget: ContextBudget) -> Self {
        Self { registry, sessions, memory, budget }
    }

    /// Builds the invocation record for `agent_id` in `group_id` for the turn
    /// named `turn_id`, having been invoked in `mode` (optionally because
    /// `mentioned_by` named them).
    pub async fn build(
        &self,
        group_id: &str,
        turn_id: &str,
        agent_id: &str,
        mode: InvocationMode,
        mentioned_by: Option<String>,
        roster: &[String],
    ) -> ArenaResult<InvocationRecord> {
        // Step 1: resolve profile — fails the whole build if missing.
        let profile = self.registry.require(agent_id)?;

        // Step 2: peer list — self excluded, unresolved roster entries skipped.
        let peers = self.registry.resolve_peers(agent_id, roster);

        // Step 3: recent history.
        let stored = self.sessions.get_messages(group_id, self.budget.recent_message_count, None)?;
        let messages: Vec<DialogueMessage> = stored.iter().map(DialogueMessage::from).collect();

        // Step 4: merged memory string, strict priority order, empty layers skipped.
        let query = stored.last().map(|m| m.content.as_str()).unwrap_or_default();
        let memory_context = self.build_memory_context(group_id, agent_id, &profile.workspace_dir, query).await?;

        // Step 5: emit.
        Ok(InvocationRecord {
            session_id: group_id.to_string(),
            turn_id: turn_id.to_string(),
            agent_id: profile.agent_id.clone(),
            agent_display_name: profile.display_name.clone(),
            role_prompt: profile.role_prompt.clone(),
            mode,
            mentioned_by,
            messages,
            peers,
            memory_context,
            max_output_tokens: profile.max_output_tokens,
            prefer_concise: true,
        })
    }

    async fn build_memory_context(
        &self,
        group_id: &str,
        agent_id: &str,
        workspace_dir: &std::path::Path,
        query: &str,
    ) -> ArenaResult<Option<String>> {
        let mut sections = Vec::new();

        let personal = self.memory.personal().read_context(workspace_dir).await?;
        if !personal.trim().is_empty() {
            sections.push(personal);
        }

        let summary = self.memory.summary(group_id).await?;
        if !summary.trim().is_empty() {
            sections.push(format!("### Session summary\n{summary}"));
        }

        let entries = self.memory.search(group_id, query, self.budget.memory_store_top_k).await?;
        if !entries.is_empty() {
            let lines: Vec<String> = entries.iter().map(|e| format!("- [{:?}] {}", e.kind, e.content)).collect();
            sections.push(format!("### Relevant memories ({agent_id})\n{}", lines.join("\n")));
        }

        if sections.is_empty() {
            Ok(None)
        } else {
            Ok(Some(sections.join("\n\n")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_types::{AgentProfile, AuthorKind, MemoryEntry, MemoryKind, StoredMessage};
    use chrono::Utc;
    use std::collections::HashMap;
    use std::path::PathBuf;

    async fn setup() -> (ContextBuilder, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(Registry::new());
        let sessions = Arc::new(SessionManager::open(dir.path().join("arena.redb")).unwrap());
        let memory = Arc::new(MemoryPlane::new(dir.path().join("memory")));
        let builder = ContextBuilder::new(registry.clone(), sessions.clone(), memory, ContextBudget::default());

        let mut profile = AgentProfile::new("atlas", "Atlas", PathBuf::from(dir.path()));
        profile.role_prompt = "You triage incidents.".to_string();
        registry.upsert(profile);
        registry.upsert(AgentProfile::new("borealis", "Borealis", PathBuf::from(dir.path())));

        sessions
            .save_message(StoredMessage {
                message_id: "m1".to_string(),
                group_id: "g1".to_string(),
                turn_id: String::new(),
                author_id: "dana".to_string(),
                author_kind: AuthorKind::Human,
                author_name: "Dana".to_string(),
                content: "can someone look at the outage".to_string(),
                mentions: vec![],
                attachments: vec![],
                timestamp: Utc::now(),
                metadata: HashMap::new(),
            })
            .unwrap();

        (builder, dir)
    }

    #[tokio::test]
    async fn unknown_agent_fails_the_build() {
        let (builder, _dir) = setup().await;
        let result = builder.build("g1", "t1", "ghost", InvocationMode::MustReply, None, &["ghost".to_string()]).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn builds_record_with_history_and_excludes_self_from_peers() {
        let (builder, _dir) = setup().await;
        let roster = vec!["atlas".to_string(), "borealis".to_string()];
        let record = builder.build("g1", "t1", "atlas", InvocationMode::MustReply, None, &roster).await.unwrap();

        assert_eq!(record.agent_display_name, "Atlas");
        assert_eq!(record.messages.len(), 1);
        assert_eq!(record.peers.len(), 1);
        assert_eq!(record.peers[0].agent_id, "borealis");
    }

    #[tokio::test]
    async fn memory_context_is_none_when_all_layers_are_empty() {
        let (builder, _dir) = setup().await;
        let record = builder.build("g1", "t1", "atlas", InvocationMode::MustReply, None, &["atlas".to_string()]).await.unwrap();
        assert!(record.memory_context.is_none());
    }

    #[tokio::test]
    async fn memory_context_includes_store_entries_when_present() {
        let (builder, _dir) = setup().await;
        builder
            .memory
            .record(
                "g1",
                MemoryEntry {
                    entry_id: uuid::Uuid::new_v4(),
                    session_id: "g1".to_string(),
                    content: "rolled back the bad deploy".to_string(),
                    kind: MemoryKind::Decision,
                    importance: 0.9,
                    created_at: Utc::now(),
                    source_message_id: None,
                },
            )
            .await
            .unwrap();

        let record = builder.build("g1", "t1", "atlas", InvocationMode::MustReply, None, &["atlas".to_string()]).await.unwrap();
        let context = record.memory_context.unwrap();
        assert!(context.contains("rolled back the bad deploy"));
    }
}
