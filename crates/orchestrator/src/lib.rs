//! The Orchestrator: a turn-based scheduler that resolves mentions,
//! partitions repliers into must/may sets, fans out concurrent agent
//! invocations with per-turn timeouts and a bounded reply quota, and decides
//! whether to chain a follow-up turn from agent-emitted next-mentions
//! (spec.md §4.1).

mod markers;
mod mentions;

use std::collections::HashMap;
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arena_broadcast::Broadcaster;
use arena_calllog::CallLogger;
use arena_context::ContextBuilder;
use arena_memory::MemoryPlane;
use arena_registry::Registry;
use arena_session::SessionManager;
use arena_types::{
    AgentOutput, AgentStatus, ArenaEvent, AuthorKind, CallLogEntry, GroupConfig, InvocationMode, MemberKind, MemoryEntry,
    StoredMessage, Turn, NEXT_MENTIONS_KEY,
};
use chrono::Utc;
use mentions::{partition, AgentRoster, Mention};
use tracing::{error, warn};
use uuid::Uuid;

pub struct Orchestrator {
    registry: Arc<Registry>,
    sessions: Arc<SessionManager>,
    memory: Arc<MemoryPlane>,
    context_builder: Arc<ContextBuilder>,
    broadcaster: Arc<Broadcaster>,
    call_logger: Arc<CallLogger>,
}

/// The outcome of one invocation: `output` is `None` exactly when the outer
/// per-invocation timeout expired or the context build failed — a case that
/// persists nothing and is distinct from an adapter-level sentinel output,
/// which is `Some` with `execution_meta.is_error = true` (spec.md §7).
struct InvokeResult {
    agent_id: String,
    output: Option<AgentOutput>,
    duration_ms: u64,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<Registry>,
        sessions: Arc<SessionManager>,
        memory: Arc<MemoryPlane>,
        context_builder: Arc<ContextBuilder>,
        broadcaster: Arc<Broadcaster>,
        call_logger: Arc<CallLogger>,
    ) -> Self {
        Self { registry, sessions, memory, context_builder, broadcaster, call_logger }
    }

    /// Single ingress point (spec.md §6). The caller is expected to have
    /// already persisted the human message; this fires and forgets — agent
    /// replies surface asynchronously via the Broadcaster.
    pub async fn on_new_message(self: &Arc<Self>, group_id: &str, content: &str, author_id: &str, mentions: Option<Vec<String>>) {
        let Ok(Some(group)) = self.sessions.get_group(group_id) else {
            warn!(group_id, "on_new_message: group not found");
            return;
        };
        let Ok(members) = self.sessions.list_group_members(group_id) else {
            warn!(group_id, "on_new_message: failed to list members");
            return;
        };

        let agent_members: Vec<String> =
            members.iter().filter(|m| m.kind == MemberKind::Agent).filter_map(|m| m.agent_id.clone()).collect();
        let roster: Vec<(String, String)> =
            members.iter().filter(|m| m.kind == MemberKind::Agent).map(|m| (m.member_id.clone(), m.display_name.clone())).collect();

        let resolved: Vec<Mention> = match mentions {
            Some(ids) => ids
                .into_iter()
                .map(|id| if id == "all" { Mention::All } else { Mention::Agent(id) })
                .collect(),
            None => mentions::parse_mentions(content, &AgentRoster { members: &roster }),
        };

        let (must_reply, may_reply) = partition(&resolved, &agent_members);

        let turn = Turn {
            turn_id: Uuid::new_v4().to_string(),
            group_id: group_id.to_string(),
            trigger_source: author_id.to_string(),
            must_reply,
            may_reply,
            all_agent_ids: agent_members,
            max_responders: group.config.max_responders,
            timeout_seconds: group.config.turn_timeout_seconds,
            chain_depth: 0,
        };

        self.clone().execute_turn(turn, group.config).await;
    }

    fn execute_turn(self: Arc<Self>, turn: Turn, config: GroupConfig) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async move {
            let mut all_next_mentions: HashSet<String> = HashSet::new();
            let mut replied_agents: HashSet<String> = HashSet::new();

            // Phase A — must-reply, never quota-gated.
            if !turn.must_reply.is_empty() {
                let results = self.invoke_concurrently(&turn, turn.must_reply.iter().cloned().collect(), InvocationMode::MustReply).await;
                for result in results {
                    self.finalize(&turn, result, false, &mut all_next_mentions, &mut replied_agents).await;
                }
            }

            // Phase B — may-reply, gated by remaining quota, stable roster order.
            let remaining = turn.max_responders.saturating_sub(replied_agents.len());
            if remaining > 0 && !turn.may_reply.is_empty() {
                let candidates: Vec<String> = turn
                    .all_agent_ids
                    .iter()
                    .filter(|id| turn.may_reply.contains(*id) && !replied_agents.contains(*id))
                    .take(remaining)
                    .cloned()
                    .collect();
                let results = self.invoke_concurrently(&turn, candidates, InvocationMode::MayReply).await;
                for result in results {
                    self.finalize(&turn, result, true, &mut all_next_mentions, &mut replied_agents).await;
                }
            }

            if !config.re_invoke_already_replied {
                for id in &replied_agents {
                    all_next_mentions.remove(id);
                }
            }

            if !all_next_mentions.is_empty() && turn.chain_depth < config.chain_depth_limit {
                let next_must: HashSet<String> =
                    all_next_mentions.iter().filter(|id| turn.all_agent_ids.contains(*id)).cloned().collect();
                let next_may: HashSet<String> = turn
                    .all_agent_ids
                    .iter()
                    .filter(|id| !next_must.contains(*id) && !replied_agents.contains(*id))
                    .cloned()
                    .collect();
                let next_turn = Turn {
                    turn_id: Uuid::new_v4().to_string(),
                    group_id: turn.group_id.clone(),
                    trigger_source: "system".to_string(),
                    must_reply: next_must,
                    may_reply: next_may,
                    all_agent_ids: turn.all_agent_ids.clone(),
                    max_responders: turn.max_responders,
                    timeout_seconds: turn.timeout_seconds,
                    chain_depth: turn.chain_depth + 1,
                };
                self.clone().execute_turn(next_turn, config).await;
            } else if !all_next_mentions.is_empty() {
                self.broadcaster.publish(ArenaEvent::SystemMessage {
                    group_id: turn.group_id.clone(),
                    content: format!(
                        "Automatic follow-up turns reached the limit of {} and are paused until the next human message.",
                        config.chain_depth_limit
                    ),
                });
            }
        })
    }

    async fn invoke_concurrently(&self, turn: &Turn, agent_ids: Vec<String>, mode: InvocationMode) -> Vec<InvokeResult> {
        let mut set = tokio::task::JoinSet::new();
        for agent_id in agent_ids {
            let registry = self.registry.clone();
            let context_builder = self.context_builder.clone();
            let broadcaster = self.broadcaster.clone();
            let group_id = turn.group_id.clone();
            let turn_id = turn.turn_id.clone();
            let roster = turn.all_agent_ids.clone();
            let mentioned_by = Some(turn.trigger_source.clone());
            let timeout_seconds = turn.timeout_seconds;
            set.spawn(async move {
                invoke_one(registry, context_builder, broadcaster, group_id, turn_id, agent_id, mode, mentioned_by, roster, timeout_seconds).await
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(err) => error!(error = %err, "invocation task panicked"),
            }
        }
        results
    }

    async fn finalize(
        &self,
        turn: &Turn,
        result: InvokeResult,
        quota_gated: bool,
        all_next_mentions: &mut HashSet<String>,
        replied_agents: &mut HashSet<String>,
    ) {
        let Some(output) = result.output else {
            error!(agent_id = %result.agent_id, "invocation failed: outer timeout or context build error");
            self.broadcaster.publish(ArenaEvent::TurnLog {
                group_id: turn.group_id.clone(),
                turn_id: turn.turn_id.clone(),
                agent_id: result.agent_id.clone(),
                duration_ms: result.duration_ms,
                tool_count: 0,
                is_error: true,
            });
            self.save_call_log(turn, &result.agent_id, None, "", result.duration_ms, true).await;
            return;
        };

        let kept = !quota_gated || output.should_respond;

        self.broadcaster.publish(ArenaEvent::TurnLog {
            group_id: turn.group_id.clone(),
            turn_id: turn.turn_id.clone(),
            agent_id: result.agent_id.clone(),
            duration_ms: result.duration_ms,
            tool_count: output.execution_meta.tool_calls.len(),
            is_error: output.execution_meta.is_error,
        });

        if !kept {
            self.save_call_log(turn, &result.agent_id, Some(&output), "", result.duration_ms, output.execution_meta.is_error).await;
            return;
        }

        let extraction = markers::extract_markers(&output.content);
        let profile = self.registry.get(&result.agent_id);
        let display_name = profile.as_ref().map(|p| p.display_name.clone()).unwrap_or_else(|| result.agent_id.clone());

        let mut metadata = HashMap::new();
        metadata.insert(NEXT_MENTIONS_KEY.to_string(), serde_json::json!(output.next_mentions));

        let message = StoredMessage {
            message_id: Uuid::new_v4().to_string(),
            group_id: turn.group_id.clone(),
            turn_id: turn.turn_id.clone(),
            author_id: result.agent_id.clone(),
            author_kind: AuthorKind::Agent,
            author_name: display_name,
            content: extraction.content.clone(),
            mentions: vec![],
            attachments: vec![],
            timestamp: Utc::now(),
            metadata,
        };
        let message_id = message.message_id.clone();

        if let Err(err) = self.sessions.save_message(message) {
            error!(agent_id = %result.agent_id, error = %err, "failed to persist agent message");
            return;
        }
        self.broadcaster.publish(ArenaEvent::AgentMessage {
            group_id: turn.group_id.clone(),
            agent_id: result.agent_id.clone(),
            turn_id: turn.turn_id.clone(),
            content: extraction.content.clone(),
        });

        for marker in extraction.memory_markers {
            let entry = MemoryEntry {
                entry_id: Uuid::new_v4(),
                session_id: turn.group_id.clone(),
                content: marker.content,
                kind: marker.kind,
                importance: marker.importance,
                created_at: Utc::now(),
                source_message_id: Some(message_id.clone()),
            };
            if let Err(err) = self.memory.record(&turn.group_id, entry).await {
                warn!(agent_id = %result.agent_id, error = %err, "failed to record memory marker");
            }
        }
        if let Some(profile) = &profile {
            for log_text in extraction.personal_logs {
                if let Err(err) = self.memory.personal().append_daily_log(&profile.workspace_dir, &log_text).await {
                    warn!(agent_id = %result.agent_id, error = %err, "failed to append personal log");
                }
            }
        }

        self.save_call_log(turn, &result.agent_id, Some(&output), &extraction.content, result.duration_ms, output.execution_meta.is_error).await;

        all_next_mentions.extend(output.next_mentions);
        replied_agents.insert(result.agent_id.clone());
    }

    async fn save_call_log(
        &self,
        turn: &Turn,
        agent_id: &str,
        output: Option<&AgentOutput>,
        parsed_content: &str,
        duration_ms: u64,
        is_error: bool,
    ) {
        let display_name = self.registry.get(agent_id).map(|p| p.display_name).unwrap_or_else(|| agent_id.to_string());
        let mode = if turn.must_reply.contains(agent_id) { InvocationMode::MustReply } else { InvocationMode::MayReply };
        let entry = CallLogEntry {
            log_id: Uuid::new_v4(),
            session_id: turn.group_id.clone(),
            turn_id: turn.turn_id.clone(),
            agent_id: agent_id.to_string(),
            agent_name: display_name,
            mode,
            prompt: output.map(|o| o.prompt_sent.clone()).unwrap_or_default(),
            raw_output: output.map(|o| o.content.clone()).unwrap_or_default(),
            parsed_content: parsed_content.to_string(),
            duration_ms,
            cost: 0.0,
            prompt_tokens: output.and_then(|o| o.execution_meta.prompt_tokens),
            completion_tokens: output.and_then(|o| o.execution_meta.completion_tokens),
            tool_calls: output.map(|o| o.execution_meta.tool_calls.clone()).unwrap_or_default(),
            is_error,
            timestamp: Utc::now(),
        };
        if let Err(err) = self.call_logger.save(&entry).await {
            warn!(agent_id, error = %err, "failed to write call log entry");
        }
    }
}

/// Free function so it can be spawned onto a `JoinSet` without borrowing
/// `Orchestrator` across the task boundary.
#[allow(clippy::too_many_arguments)]
async fn invoke_one(
    registry: Arc<Registry>,
    context_builder: Arc<ContextBuilder>,
    broadcaster: Arc<Broadcaster>,
    group_id: String,
    turn_id: String,
    agent_id: String,
    mode: InvocationMode,
    mentioned_by: Option<String>,
    roster: Vec<String>,
    timeout_seconds: u64,
) -> InvokeResult {
    broadcaster.publish(ArenaEvent::AgentStatus { group_id: group_id.clone(), agent_id: agent_id.clone(), status: AgentStatus::Analyzing });

    let start = Instant::now();
    let attempt = async {
        let record = context_builder.build(&group_id, &turn_id, &agent_id, mode, mentioned_by, &roster).await?;
        let profile = registry.require(&agent_id)?;
        let output = arena_exec::invoke_agent(&record, &profile.cli, &profile.workspace_dir).await;
        arena_types::ArenaResult::Ok(output)
    };

    let outcome = tokio::time::timeout(Duration::from_secs(timeout_seconds), attempt).await;
    let duration_ms = start.elapsed().as_millis() as u64;

    match outcome {
        Ok(Ok(output)) => {
            let status = if output.execution_meta.is_error { AgentStatus::Error } else { AgentStatus::Done };
            broadcaster.publish(ArenaEvent::AgentStatus { group_id, agent_id: agent_id.clone(), status });
            InvokeResult { agent_id, output: Some(output), duration_ms }
        }
        Ok(Err(err)) => {
            error!(agent_id, error = %err, "context build failed");
            broadcaster.publish(ArenaEvent::AgentStatus { group_id, agent_id: agent_id.clone(), status: AgentStatus::Error });
            InvokeResult { agent_id, output: None, duration_ms }
        }
        Err(_elapsed) => {
            error!(agent_id, timeout_seconds, "invocation exceeded the per-turn wall-clock timeout");
            broadcaster.publish(ArenaEvent::AgentStatus { group_id, agent_id: agent_id.clone(), status: AgentStatus::Error });
            InvokeResult { agent_id, output: None, duration_ms }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_config::ContextBudget;
    use arena_types::{AgentProfile, CliDescriptor, CliKind, Group, GroupMember};

    struct Fixture {
        orchestrator: Arc<Orchestrator>,
        broadcaster: Arc<Broadcaster>,
        sessions: Arc<SessionManager>,
        registry: Arc<Registry>,
        memory: Arc<MemoryPlane>,
        _dir: tempfile::TempDir,
    }

    fn agent_profile(dir: &std::path::Path, id: &str, name: &str) -> AgentProfile {
        let workspace = dir.join(id);
        std::fs::create_dir_all(&workspace).unwrap();
        let mut profile = AgentProfile::new(id, name, workspace);
        // `echo` stands in for a real CLI so invocations complete instantly in tests.
        profile.cli = CliDescriptor { kind: CliKind::Generic, command_override: Some("echo".to_string()), ..CliDescriptor::default() };
        profile
    }

    fn fixture(max_responders: usize, chain_depth_limit: u32) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(Registry::new());
        let sessions = Arc::new(SessionManager::open(dir.path().join("arena.redb")).unwrap());
        let memory = Arc::new(MemoryPlane::new(dir.path().join("memory")));
        let context_builder =
            Arc::new(ContextBuilder::new(registry.clone(), sessions.clone(), memory.clone(), ContextBudget::default()));
        let broadcaster = Arc::new(Broadcaster::new());
        let call_logger = Arc::new(CallLogger::new(dir.path().join("logs")));

        let mut group = Group::new("g1", "Squad");
        group.config.max_responders = max_responders;
        group.config.chain_depth_limit = chain_depth_limit;
        sessions.create_group(group).unwrap();

        for (id, name) in [("atlas", "Atlas"), ("borealis", "Borealis"), ("cairn", "Cairn")] {
            registry.upsert(agent_profile(dir.path(), id, name));
            sessions.add_member(GroupMember::agent("g1", id, name)).unwrap();
        }

        let orchestrator = Arc::new(Orchestrator::new(
            registry.clone(),
            sessions.clone(),
            memory.clone(),
            context_builder,
            broadcaster.clone(),
            call_logger,
        ));
        Fixture { orchestrator, broadcaster, sessions, registry, memory, _dir: dir }
    }

    #[tokio::test]
    async fn direct_address_invokes_only_the_mentioned_agent_in_must_phase() {
        let fixture = fixture(3, 2);
        let mut rx = fixture.broadcaster.subscribe("g1");
        fixture.orchestrator.on_new_message("g1", "@atlas please design X", "dana", None).await;

        let messages = fixture.sessions.get_messages("g1", 10, None).unwrap();
        assert!(messages.iter().any(|m| m.author_id == "atlas"));

        let mut saw_agent_message = false;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, ArenaEvent::AgentMessage { agent_id, .. } if agent_id == "atlas") {
                saw_agent_message = true;
            }
        }
        assert!(saw_agent_message);
    }

    #[tokio::test]
    async fn broadcast_mention_invokes_everyone_with_no_phase_b() {
        let fixture = fixture(3, 2);
        fixture.orchestrator.on_new_message("g1", "@all status?", "dana", None).await;

        let messages = fixture.sessions.get_messages("g1", 10, None).unwrap();
        let repliers: HashSet<&str> = messages.iter().map(|m| m.author_id.as_str()).collect();
        assert_eq!(repliers, ["atlas", "borealis", "cairn"].into_iter().collect());
    }

    #[tokio::test]
    async fn unknown_mention_is_dropped_and_agent_still_invoked_in_may_mode() {
        let fixture = fixture(3, 2);
        fixture.orchestrator.on_new_message("g1", "@nonexistent fix it", "dana", None).await;

        // echo's stdout is not "SKIP", so the lone agent's may-reply output is kept.
        let messages = fixture.sessions.get_messages("g1", 10, None).unwrap();
        assert!(!messages.is_empty());
    }

    #[tokio::test]
    async fn memory_marker_is_persisted_and_stripped_from_message() {
        let fixture = fixture(3, 2);
        let marker = r#"<!--MEMORY:{"type":"decision","content":"use B-tree","importance":0.9}-->"#;
        let mut updated = fixture.registry.get("atlas").unwrap();
        updated.cli.extra_args = vec![format!("Decision made. {marker}")];
        fixture.registry.upsert(updated);

        fixture.orchestrator.on_new_message("g1", "@atlas decide", "dana", None).await;

        let messages = fixture.sessions.get_messages("g1", 10, None).unwrap();
        let reply = messages.iter().find(|m| m.author_id == "atlas").unwrap();
        assert!(!reply.content.contains("MEMORY:"));

        let summary = fixture.memory.summary("g1").await.unwrap();
        assert!(summary.contains("use B-tree"));
    }
}
