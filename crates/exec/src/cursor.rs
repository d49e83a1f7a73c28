//! Cursor-class adapter: same invocation shape as the Claude-class adapter,
//! but the role/background convention is `.cursor/rules/role.mdc` with
//! `alwaysApply: true` rather than `CLAUDE.md` (spec.md §6). Prompt assembly
//! and output parsing are otherwise identical, so this adapter is a thin
//! wrapper rather than a parallel reimplementation.

use std::path::Path;

use arena_types::{AgentOutput, CliDescriptor, InvocationRecord};
use async_trait::async_trait;

use crate::adapter::{run_prompt_argv, run_subprocess, Adapter};
use crate::parse::parse_output;
use crate::prompt::build_prompt;

pub struct CursorAdapter;

#[async_trait]
impl Adapter for CursorAdapter {
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

/// Writes the always-applied role rule Cursor CLI loads from every
/// workspace it runs in. Onboarding calls this once per agent; re-invoking
/// is a no-op if the file already exists, so a hand-edited rule survives
/// restarts (spec.md §6 — workspace provisioning is host glue, but this
/// convention is part of the adapter contract).
pub fn write_role_rule(workspace_dir: &Path, role_prompt: &str) -> std::io::Result<()> {
    let rules_dir = workspace_dir.join(".cursor").join("rules");
    let rule_path = rules_dir.join("role.mdc");
    if rule_path.exists() {
        return Ok(());
    }
    std::fs::create_dir_all(&rules_dir)?;
    let content = format!(
        "---\ndescription: Agent role and background (always applied)\nalwaysApply: true\n---\n\n{role_prompt}"
    );
    std::fs::write(rule_path, content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_role_rule_creates_file_once() {
        let dir = tempfile::tempdir().unwrap();
        write_role_rule(dir.path(), "You are Borealis, the QA lead.").unwrap();
        let rule_path = dir.path().join(".cursor").join("rules").join("role.mdc");
        assert!(rule_path.exists());
        let first = std::fs::read_to_string(&rule_path).unwrap();

        write_role_rule(dir.path(), "different text, should be ignored").unwrap();
        let second = std::fs::read_to_string(&rule_path).unwrap();
        assert_eq!(first, second);
    }
}
