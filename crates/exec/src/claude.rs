//! Claude-class adapter: `claude -p "<prompt>" --output-format json`.
//!
//! The agent's role prompt is not inlined here — it lives in
//! `workspace_dir/CLAUDE.md`, which the CLI reads on its own (spec.md §6).

use std::path::Path;

use arena_types::{AgentOutput, CliDescriptor, InvocationRecord};
use async_trait::async_trait;

use crate::adapter::{run_prompt_argv, run_subprocess, Adapter};
use crate::parse::parse_output;
use crate::prompt::build_prompt;

pub struct ClaudeAdapter;

#[async_trait]
impl Adapter for ClaudeAdapter {
    async fn invoke(&self, record: &InvocationRecord, cli: &CliDescriptor, workspace_dir: &Path) -> AgentOutput {
        let prompt = build_prompt(record);
        match run_prompt_argv(cli.command(), &prompt, &cli.extra_args, &prompt, workspace_dir, cli, &record.agent_id).await {
            Ok(raw) => parse_output(&raw, prompt),
            Err(sentinel) => sentinel,
        }
    }

    async fn health_check(&self, cli: &CliDescriptor) -> bool {
        let workspace = std::env::temp_dir();
        run_subprocess(cli.command(), &["--version".to_string()], None, "", &workspace, cli, "health-check")
            .await
            .is_ok()
    }
}

/// Writes the agent's role/background to `workspace_dir/CLAUDE.md`, which
/// the Claude CLI reads on its own (spec.md §6). Onboarding calls this once
/// per agent; a no-op if the file already exists, so a hand-edited file
/// survives restarts.
pub fn write_claude_md(workspace_dir: &Path, role_prompt: &str) -> std::io::Result<()> {
    let path = workspace_dir.join("CLAUDE.md");
    if path.exists() {
        return Ok(());
    }
    std::fs::write(path, role_prompt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_types::InvocationMode;
    use chrono::Utc;

    fn record() -> InvocationRecord {
        InvocationRecord {
            session_id: "g1".to_string(),
            turn_id: "t1".to_string(),
            agent_id: "atlas".to_string(),
            agent_display_name: "Atlas".to_string(),
            role_prompt: "You are Atlas.".to_string(),
            mode: InvocationMode::MustReply,
            mentioned_by: None,
            messages: vec![arena_types::DialogueMessage {
                role: arena_types::DialogueRole::User,
                author_name: "Dana".to_string(),
                content: "status please".to_string(),
                timestamp: Utc::now(),
            }],
            peers: vec![],
            memory_context: None,
            max_output_tokens: 512,
            prefer_concise: true,
        }
    }

    #[tokio::test]
    async fn missing_claude_binary_surfaces_as_sentinel() {
        let mut cli = CliDescriptor::default();
        cli.command_override = Some("definitely-not-claude-xyz".to_string());
        let workspace = tempfile::tempdir().unwrap();
        let adapter = ClaudeAdapter;
        let output = adapter.invoke(&record(), &cli, workspace.path()).await;
        assert!(output.content.starts_with("[Error]"));
        assert!(output.execution_meta.is_error);
    }

    #[test]
    fn write_claude_md_creates_file_once() {
        let dir = tempfile::tempdir().unwrap();
        write_claude_md(dir.path(), "You are Atlas, the systems-design lead.").unwrap();
        let path = dir.path().join("CLAUDE.md");
        assert!(path.exists());
        let first = std::fs::read_to_string(&path).unwrap();

        write_claude_md(dir.path(), "different text, should be ignored").unwrap();
        let second = std::fs::read_to_string(&path).unwrap();
        assert_eq!(first, second);
    }
}
