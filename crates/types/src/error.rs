use thiserror::Error;

/// Taxonomy from the error-handling design: one named kind per failure class
/// so the orchestrator can match on *kind*, not message text.
#[derive(Debug, Error)]
pub enum ArenaError {
    /// Agent not in registry, workspace missing, unknown CLI type.
    /// Aborts the current operation; never propagates to sibling agents.
    #[error("config error: {0}")]
    Config(String),

    /// Subprocess timeout, non-zero exit, missing binary. Captured inside the
    /// adapter as a sentinel `AgentOutput`; never bubbles past the adapter.
    #[error("invocation error: {0}")]
    Invocation(String),

    /// Unparseable JSON from the CLI, or a malformed memory marker. Callers
    /// degrade locally (raw text fallback, skip-and-log) rather than abort.
    #[error("parse error: {0}")]
    Parse(String),

    /// Storage layer failure (session DB, memory event log, call log).
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Missing group, unknown mention. Logged; the operation returns silently.
    #[error("protocol error: {0}")]
    Protocol(String),
}

pub type ArenaResult<T> = Result<T, ArenaError>;
