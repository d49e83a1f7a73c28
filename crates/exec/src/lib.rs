//! Worker Runtime: dispatches an `InvocationRecord` to the adapter matching
//! the agent's configured CLI kind and runs it as a subprocess in the
//! agent's workspace (spec.md §4.3, §6).

mod adapter;
mod claude;
mod cursor;
mod generic;
mod parse;
mod prompt;

pub use adapter::Adapter;
pub use claude::{write_claude_md, ClaudeAdapter};
pub use cursor::{write_role_rule, CursorAdapter};
pub use generic::GenericAdapter;

use std::path::Path;

use arena_types::{AgentOutput, CliKind, InvocationRecord};

/// Resolves the adapter for a given CLI kind. Adapters are stateless, so a
/// fresh instance per call is free.
fn adapter_for(kind: CliKind) -> Box<dyn Adapter> {
    match kind {
        CliKind::Claude => Box::new(ClaudeAdapter),
        CliKind::Cursor => Box::new(CursorAdapter),
        CliKind::Generic => Box::new(GenericAdapter),
    }
}

/// Invokes the agent named in `record` via its configured CLI, in
/// `workspace_dir`. Never returns an error: subprocess failures surface as
/// a sentinel `AgentOutput` with `should_respond = true` so the turn
/// scheduler always has something to persist and the human sees what broke.
pub async fn invoke_agent(
    record: &InvocationRecord,
    cli: &arena_types::CliDescriptor,
    workspace_dir: &Path,
) -> AgentOutput {
    adapter_for(cli.kind).invoke(record, cli, workspace_dir).await
}

pub async fn health_check(cli: &arena_types::CliDescriptor) -> bool {
    adapter_for(cli.kind).health_check(cli).await
}
