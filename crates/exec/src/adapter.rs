//! Adapter trait and subprocess execution shared by all CLI adapters
//! (spec.md §4.3, §6, §9 Design Notes).

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use arena_types::{AgentOutput, CliDescriptor, InvocationRecord};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{error, info};

/// Maximum bytes of combined stdout/stderr kept in a sentinel error message
/// (spec.md §9: adapters truncate rather than propagate unbounded output).
const MAX_ERROR_PREVIEW: usize = 2048;

#[async_trait]
pub trait Adapter: Send + Sync {
    /// Runs one invocation in `workspace_dir`, returning a sentinel
    /// `AgentOutput` on timeout, missing binary, or non-zero exit rather than
    /// propagating an error — a failing agent must never abort the turn for
    /// its peers (spec.md §4.3).
    async fn invoke(&self, record: &InvocationRecord, cli: &CliDescriptor, workspace_dir: &Path) -> AgentOutput;

    /// Best-effort liveness probe; never blocks the turn scheduler for long.
    async fn health_check(&self, cli: &CliDescriptor) -> bool;
}

/// Builds the child environment: process environment overlaid with the
/// agent's `cli.env` overrides (spec.md §6 — e.g. proxy settings per agent).
fn merged_env(extra: &HashMap<String, String>) -> HashMap<String, String> {
    let mut env: HashMap<String, String> = std::env::vars().collect();
    env.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
    env
}

/// Most shells reliably pass a single argv element under this size; past it
/// some platforms truncate or reject the command line (spec.md §4.3).
const ARGV_PROMPT_THRESHOLD: usize = 8 * 1024;

/// A prompt spilled to disk so a shell can read it back instead of carrying
/// it as one long argv element. Removed on drop, success or failure alike.
struct TempPromptFile {
    path: std::path::PathBuf,
}

impl TempPromptFile {
    fn write(prompt: &str) -> std::io::Result<Self> {
        let path = std::env::temp_dir().join(format!("arena-prompt-{}.txt", uuid::Uuid::new_v4()));
        std::fs::write(&path, prompt)?;
        Ok(Self { path })
    }
}

impl Drop for TempPromptFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

/// Runs a Claude/Cursor-class CLI with `prompt` as its `-p` argument. Below
/// `ARGV_PROMPT_THRESHOLD` the prompt is passed directly; above it, the
/// prompt is written to a temp file and a shell is asked to read it back
/// (spec.md §4.3), keeping the temp file only for the duration of the call.
pub async fn run_prompt_argv(
    program: &str,
    prompt: &str,
    extra_args: &[String],
    prompt_sent: &str,
    workspace_dir: &Path,
    cli: &CliDescriptor,
    agent_id: &str,
) -> Result<String, AgentOutput> {
    if prompt.len() <= ARGV_PROMPT_THRESHOLD {
        let mut args = vec!["-p".to_string(), prompt.to_string(), "--output-format".to_string(), "json".to_string()];
        args.extend(extra_args.iter().cloned());
        return run_subprocess(program, &args, None, prompt_sent, workspace_dir, cli, agent_id).await;
    }

    let temp_file = match TempPromptFile::write(prompt) {
        Ok(file) => file,
        Err(e) => {
            return Err(AgentOutput::error_sentinel(
                "Error",
                &format!("writing temp prompt file: {e}"),
                prompt_sent.to_string(),
            ))
        }
    };

    let extra: String = extra_args.iter().map(|a| format!(" {}", shell_quote(a))).collect();
    let shell_command = format!(
        "{program} -p \"$(cat {})\" --output-format json{extra}",
        shell_quote(&temp_file.path.to_string_lossy())
    );
    let result = run_subprocess("sh", &["-c".to_string(), shell_command], None, prompt_sent, workspace_dir, cli, agent_id).await;
    drop(temp_file);
    result
}

/// Spawns `program` with `args`, returning combined truncated stdout/stderr.
/// When `stdin_payload` is set the prompt is piped on stdin (the Generic
/// adapter's convention); Claude/Cursor-class adapters instead bake the
/// prompt into `args` and pass `None`. Timeout, missing binary, and
/// non-zero exit are reported via `Err(AgentOutput)` sentinel so a failing
/// agent never aborts the turn for its peers.
pub async fn run_subprocess(
    program: &str,
    args: &[String],
    stdin_payload: Option<&str>,
    prompt_sent: &str,
    workspace_dir: &Path,
    cli: &CliDescriptor,
    agent_id: &str,
) -> Result<String, AgentOutput> {
    let mut command = Command::new(program);
    command
        .args(args)
        .current_dir(workspace_dir)
        .envs(merged_env(&cli.env))
        .kill_on_drop(true);

    info!(agent_id, program, "spawning agent CLI subprocess");

    let timeout = Duration::from_secs(cli.timeout_seconds);
    let spawn_and_wait = async {
        use tokio::io::AsyncWriteExt;
        command.stdin(std::process::Stdio::piped());
        command.stdout(std::process::Stdio::piped());
        command.stderr(std::process::Stdio::piped());
        let mut child = command.spawn()?;
        if let Some(payload) = stdin_payload {
            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(payload.as_bytes()).await?;
            }
        }
        child.wait_with_output().await
    };

    let output = match tokio::time::timeout(timeout, spawn_and_wait).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            error!(agent_id, program, "agent CLI binary not found on PATH");
            return Err(AgentOutput::error_sentinel(
                "Error",
                &format!("'{program}' not found; confirm the CLI is installed and on PATH"),
                prompt_sent.to_string(),
            ));
        }
        Ok(Err(e)) => {
            error!(agent_id, program, error = %e, "agent CLI subprocess failed to run");
            return Err(AgentOutput::error_sentinel("Error", &e.to_string(), prompt_sent.to_string()));
        }
        Err(_) => {
            error!(agent_id, program, timeout_seconds = cli.timeout_seconds, "agent CLI invocation timed out");
            return Err(AgentOutput::error_sentinel(
                "Timeout",
                &format!("no response within {}s", cli.timeout_seconds),
                prompt_sent.to_string(),
            ));
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

    if !output.status.success() {
        let detail = if stderr.is_empty() { &stdout } else { &stderr };
        let truncated: String = detail.chars().take(MAX_ERROR_PREVIEW).collect();
        error!(agent_id, program, exit_code = ?output.status.code(), "agent CLI exited non-zero");
        return Err(AgentOutput::error_sentinel("CLI Error", &truncated, prompt_sent.to_string()));
    }

    Ok(stdout)
}
