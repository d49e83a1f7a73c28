//! Shared prompt assembly across CLI adapters (spec.md §4.3).
//!
//! Block order: session roster, read-only conversation history, memory
//! context, the current message to reply to, reply rules, and the
//! collaboration hint describing the `NEXT_MENTIONS` marker. Role prompt is
//! deliberately excluded here — Claude-class adapters write it to
//! `CLAUDE.md` in the workspace instead of inlining it in every prompt.

use arena_types::{DialogueRole, InvocationMode, InvocationRecord};

pub fn build_roster_block(record: &InvocationRecord) -> String {
    let mut lines = vec![format!(
        "## Session roster\nYou are {} ({}).",
        record.agent_display_name, record.agent_id
    )];
    if !record.peers.is_empty() {
        lines.push("Other members of this group:".to_string());
        for peer in &record.peers {
            let skills = if peer.skill_tags.is_empty() {
                "none".to_string()
            } else {
                peer.skill_tags.join(", ")
            };
            lines.push(format!("- {} ({}) — skills: {}", peer.display_name, peer.agent_id, skills));
        }
    }
    lines.join("\n")
}

pub fn build_history_block(record: &InvocationRecord) -> Option<String> {
    if record.messages.len() <= 1 {
        return None;
    }
    let mut lines = vec!["## Conversation history (read-only context, do not reply to these)".to_string()];
    for msg in &record.messages[..record.messages.len() - 1] {
        let label = role_label(msg.role, &msg.author_name);
        lines.push(format!("[{label}]: {}", msg.content));
    }
    Some(lines.join("\n"))
}

pub fn build_memory_block(record: &InvocationRecord) -> Option<String> {
    record
        .memory_context
        .as_ref()
        .filter(|text| !text.is_empty())
        .map(|text| format!("## Relevant memory\n{text}"))
}

pub fn build_current_message_block(record: &InvocationRecord) -> Option<String> {
    let current = record.messages.last()?;
    let label = role_label(current.role, &current.author_name);
    Some(format!(
        "## Message to reply to\nFrom: {label}\nContent:\n{}",
        current.content
    ))
}

pub fn build_reply_rules_block(record: &InvocationRecord) -> String {
    let mut rules = vec!["## Reply rules".to_string(), "1. Reply only to the message above; the history is context, not something to respond to.".to_string()];
    if record.prefer_concise {
        rules.push("2. Be concise and lead with the key point.".to_string());
    }
    if record.mode == InvocationMode::MayReply {
        rules.push("3. If this does not concern you, reply with exactly: SKIP".to_string());
    }
    rules.join("\n")
}

pub fn build_collaboration_block() -> &'static str {
    "## Collaboration\n\
     If you need another teammate to weigh in, end your reply with (agent_id must come \
     from the session roster):\n\
     <!--NEXT_MENTIONS:[\"agent_id_1\",\"agent_id_2\"]-->"
}

/// Full prompt assembly shared by the Claude-class and generic adapters.
pub fn build_prompt(record: &InvocationRecord) -> String {
    let mut blocks = vec![build_roster_block(record)];
    blocks.extend(build_history_block(record));
    blocks.extend(build_memory_block(record));
    blocks.extend(build_current_message_block(record));
    blocks.push(build_reply_rules_block(record));
    blocks.push(build_collaboration_block().to_string());
    blocks.join("\n\n")
}

fn role_label(role: DialogueRole, author_name: &str) -> String {
    if !author_name.is_empty() {
        return author_name.to_string();
    }
    match role {
        DialogueRole::User => "user".to_string(),
        DialogueRole::Assistant => "assistant".to_string(),
        DialogueRole::System => "system".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_types::{DialogueMessage, PeerInfo};
    use chrono::Utc;

    fn record() -> InvocationRecord {
        InvocationRecord {
            session_id: "g1".to_string(),
            turn_id: "t1".to_string(),
            agent_id: "atlas".to_string(),
            agent_display_name: "Atlas".to_string(),
            role_prompt: "You are Atlas.".to_string(),
            mode: InvocationMode::MayReply,
            mentioned_by: None,
            messages: vec![
                DialogueMessage { role: DialogueRole::User, author_name: "Dana".to_string(), content: "earlier note".to_string(), timestamp: Utc::now() },
                DialogueMessage { role: DialogueRole::User, author_name: "Dana".to_string(), content: "what's the status?".to_string(), timestamp: Utc::now() },
            ],
            peers: vec![PeerInfo { agent_id: "borealis".to_string(), display_name: "Borealis".to_string(), skill_tags: vec!["qa".to_string()] }],
            memory_context: Some("decided to ship Friday".to_string()),
            max_output_tokens: 512,
            prefer_concise: true,
        }
    }

    #[test]
    fn prompt_includes_all_blocks_in_order() {
        let prompt = build_prompt(&record());
        let roster_pos = prompt.find("Session roster").unwrap();
        let history_pos = prompt.find("Conversation history").unwrap();
        let memory_pos = prompt.find("Relevant memory").unwrap();
        let current_pos = prompt.find("Message to reply to").unwrap();
        let rules_pos = prompt.find("Reply rules").unwrap();
        let collab_pos = prompt.find("Collaboration").unwrap();
        assert!(roster_pos < history_pos);
        assert!(history_pos < memory_pos);
        assert!(memory_pos < current_pos);
        assert!(current_pos < rules_pos);
        assert!(rules_pos < collab_pos);
    }

    #[test]
    fn may_reply_mode_includes_skip_rule() {
        let prompt = build_prompt(&record());
        assert!(prompt.contains("SKIP"));
    }

    #[test]
    fn must_reply_mode_omits_skip_rule() {
        let mut r = record();
        r.mode = InvocationMode::MustReply;
        let prompt = build_prompt(&r);
        assert!(!prompt.contains("reply with exactly: SKIP"));
    }

    #[test]
    fn single_message_has_no_history_block() {
        let mut r = record();
        r.messages.truncate(1);
        let prompt = build_prompt(&r);
        assert!(!prompt.contains("Conversation history"));
    }
}
