//! Generic adapter: an arbitrary shell command, prompt delivered on stdin.
//! For CLI tools that are neither Claude- nor Cursor-class — local scripts,
//! other model CLIs (spec.md §6 escape hatch).

use std::path::Path;

use arena_types::{AgentOutput, CliDescriptor, InvocationRecord};
use async_trait::async_trait;

use crate::adapter::{run_subprocess, Adapter};
use crate::parse::parse_output;
use crate::prompt::build_prompt;

pub struct GenericAdapter;

#[async_trait]
impl Adapter for GenericAdapter {
    async fn invoke(&self, record: &InvocationRecord, cli: &CliDescriptor, workspace_dir: &Path) -> AgentOutput {
        let program = cli.command_override.as_deref().unwrap_or_default();
        if program.is_empty() {
            return AgentOutput::error_sentinel("Error", "generic adapter: no command configured", String::new());
        }

        let prompt = build_prompt(record);
        let args: Vec<String> = cli.extra_args.clone();

        match run_subprocess(program, &args, Some(&prompt), &prompt, workspace_dir, cli, &record.agent_id).await {
            Ok(raw) => parse_output(&raw, prompt),
            Err(sentinel) => sentinel,
        }
    }

    async fn health_check(&self, cli: &CliDescriptor) -> bool {
        cli.command_override.as_deref().is_some_and(|c| !c.is_empty())
    }
}
