// ABOUTME: Tool dispatcher: maps tool calls to shell, file, and system-info operations.
// ABOUTME: Every call yields a tagged outcome that is only turned into text at the protocol edge.

use crate::exec::{run_shell, ExecError};
use crate::tools::{
    self, DEFAULT_COMMAND_TIMEOUT_SECS, GET_SYSTEM_INFO, READ_FILE, RUN_COMMAND, WRITE_FILE,
};
use futures::future::join_all;
use rmcp::model::{CallToolResult, Content, Tool};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::io;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const NO_OUTPUT: &str = "(no output)";
pub const UNAVAILABLE: &str = "(unavailable)";

/// Upper bound for each system-info probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Labelled shell probes reported by `get_system_info`, in output order.
pub const SYSTEM_PROBES: [(&str, &str); 6] = [
    ("hostname", "hostname 2>/dev/null || cat /proc/sys/kernel/hostname"),
    ("uptime", "uptime"),
    ("memory", "free -h | head -2"),
    ("disk", "df -h / | tail -1"),
    ("cpu", "grep -m1 'model name' /proc/cpuinfo | cut -d: -f2"),
    ("os", ". /etc/os-release && echo \"$PRETTY_NAME\""),
];

/// Why a tool call produced no regular output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolFailure {
    #[error("Command timed out after {seconds} seconds")]
    TimedOut { seconds: u64 },

    #[error("File not found: {path}")]
    NotFound { path: String },

    #[error("Permission denied: {path}")]
    PermissionDenied { path: String },

    #[error("Error executing command: {0}")]
    Exec(String),

    #[error("Error reading file: {0}")]
    Read(String),

    #[error("Error writing file: {0}")]
    Write(String),

    #[error("Invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },

    #[error("Unknown tool: {0}")]
    UnknownTool(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutcome {
    Output(String),
    Failure(ToolFailure),
}

impl ToolOutcome {
    /// Text shown to the agent.
    pub fn text(&self) -> String {
        match self {
            ToolOutcome::Output(text) => text.clone(),
            ToolOutcome::Failure(failure) => failure.to_string(),
        }
    }

    /// True when the call itself was malformed.
    ///
    /// Operational failures (timeouts, missing files) are ordinary results the
    /// agent reads and reacts to, so they are not flagged.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            ToolOutcome::Failure(
                ToolFailure::UnknownTool(_) | ToolFailure::InvalidArguments { .. }
            )
        )
    }

    pub fn into_content(self) -> Vec<Content> {
        vec![Content::text(self.text())]
    }
}

impl From<ToolFailure> for ToolOutcome {
    fn from(failure: ToolFailure) -> Self {
        ToolOutcome::Failure(failure)
    }
}

impl From<Result<String, ToolFailure>> for ToolOutcome {
    fn from(result: Result<String, ToolFailure>) -> Self {
        match result {
            Ok(text) => ToolOutcome::Output(text),
            Err(failure) => ToolOutcome::Failure(failure),
        }
    }
}

impl From<ToolOutcome> for CallToolResult {
    fn from(outcome: ToolOutcome) -> Self {
        if outcome.is_error() {
            CallToolResult::error(outcome.into_content())
        } else {
            CallToolResult::success(outcome.into_content())
        }
    }
}

fn default_timeout() -> u64 {
    DEFAULT_COMMAND_TIMEOUT_SECS
}

#[derive(Debug, Deserialize)]
struct RunCommandArgs {
    command: String,
    #[serde(default = "default_timeout")]
    timeout: u64,
}

#[derive(Debug, Deserialize)]
struct ReadFileArgs {
    path: String,
}

#[derive(Debug, Deserialize)]
struct WriteFileArgs {
    path: String,
    content: String,
}

fn parse_args<T: DeserializeOwned>(tool: &str, arguments: Value) -> Result<T, ToolFailure> {
    serde_json::from_value(arguments).map_err(|e| ToolFailure::InvalidArguments {
        tool: tool.to_string(),
        message: e.to_string(),
    })
}

/// Stdout, then a `[stderr]` block, then a non-zero exit code.
pub fn format_command_output(stdout: &str, stderr: &str, exit_code: i32) -> String {
    let mut output = stdout.to_string();
    if !stderr.is_empty() {
        output.push_str("\n[stderr]\n");
        output.push_str(stderr);
    }
    if exit_code != 0 {
        output.push_str(&format!("\n[exit code: {exit_code}]"));
    }
    if output.is_empty() {
        NO_OUTPUT.to_string()
    } else {
        output
    }
}

pub async fn run_command(command: &str, timeout_secs: u64) -> ToolOutcome {
    debug!(command, timeout_secs, "Running command");
    match run_shell(command, Duration::from_secs(timeout_secs)).await {
        Ok(out) => ToolOutcome::Output(format_command_output(
            &out.stdout,
            &out.stderr,
            out.exit_code(),
        )),
        Err(ExecError::TimedOut(_)) => {
            warn!(command, timeout_secs, "Command timed out");
            ToolFailure::TimedOut {
                seconds: timeout_secs,
            }
            .into()
        }
        Err(ExecError::Io(e)) => ToolFailure::Exec(e.to_string()).into(),
    }
}

fn read_failure(path: &str, err: io::Error) -> ToolFailure {
    match err.kind() {
        io::ErrorKind::NotFound => ToolFailure::NotFound {
            path: path.to_string(),
        },
        io::ErrorKind::PermissionDenied => ToolFailure::PermissionDenied {
            path: path.to_string(),
        },
        _ => ToolFailure::Read(err.to_string()),
    }
}

fn write_failure(path: &str, err: io::Error) -> ToolFailure {
    match err.kind() {
        io::ErrorKind::PermissionDenied => ToolFailure::PermissionDenied {
            path: path.to_string(),
        },
        _ => ToolFailure::Write(err.to_string()),
    }
}

pub async fn read_file(path: &str) -> ToolOutcome {
    let result = match tokio::fs::read(path).await {
        Ok(bytes) => String::from_utf8(bytes).map_err(|e| ToolFailure::Read(e.to_string())),
        Err(e) => Err(read_failure(path, e)),
    };
    result.into()
}

/// Create or truncate `path` and write `content`. Parent directories are not created.
pub async fn write_file(path: &str, content: &str) -> ToolOutcome {
    let result = match tokio::fs::write(path, content).await {
        Ok(()) => Ok(format!("Successfully wrote to {path}")),
        Err(e) => Err(write_failure(path, e)),
    };
    result.into()
}

/// Collapse whitespace and join lines with ` | ` so a value fits on one line.
pub fn fold_lines(text: &str) -> String {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" | ")
}

async fn probe(label: &str, command: &str, timeout: Duration) -> String {
    match run_shell(command, timeout).await {
        Ok(out) if out.success() => {
            let value = fold_lines(&out.stdout);
            if value.is_empty() {
                UNAVAILABLE.to_string()
            } else {
                value
            }
        }
        Ok(out) => {
            debug!(label, exit_code = out.exit_code(), "System probe failed");
            UNAVAILABLE.to_string()
        }
        Err(e) => {
            debug!(label, error = %e, "System probe failed");
            UNAVAILABLE.to_string()
        }
    }
}

/// One `label: value` line per probe, in order. Probes run concurrently; a
/// probe that fails, prints nothing, or overruns `timeout` reads `(unavailable)`.
pub async fn collect_info(probes: &[(&str, &str)], timeout: Duration) -> String {
    let lines = join_all(probes.iter().map(|&(label, command)| async move {
        format!("{label}: {}", probe(label, command, timeout).await)
    }))
    .await;
    lines.join("\n")
}

pub async fn get_system_info() -> ToolOutcome {
    ToolOutcome::Output(collect_info(&SYSTEM_PROBES, PROBE_TIMEOUT).await)
}

/// Dispatches tool calls for one device.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    hostname: String,
}

impl Dispatcher {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Name reported to clients during `initialize`.
    pub fn server_name(&self) -> String {
        format!("{}-mcp", self.hostname)
    }

    pub fn tools(&self) -> Vec<Tool> {
        tools::definitions(&self.hostname)
    }

    pub async fn call(&self, name: &str, arguments: Value) -> ToolOutcome {
        let arguments = if arguments.is_null() {
            Value::Object(Default::default())
        } else {
            arguments
        };

        let outcome = match name {
            RUN_COMMAND => match parse_args::<RunCommandArgs>(name, arguments) {
                Ok(args) => run_command(&args.command, args.timeout).await,
                Err(failure) => failure.into(),
            },
            READ_FILE => match parse_args::<ReadFileArgs>(name, arguments) {
                Ok(args) => read_file(&args.path).await,
                Err(failure) => failure.into(),
            },
            WRITE_FILE => match parse_args::<WriteFileArgs>(name, arguments) {
                Ok(args) => write_file(&args.path, &args.content).await,
                Err(failure) => failure.into(),
            },
            GET_SYSTEM_INFO => get_system_info().await,
            other => ToolFailure::UnknownTool(other.to_string()).into(),
        };

        match &outcome {
            ToolOutcome::Output(_) => info!(tool = %name, "Tool call completed"),
            ToolOutcome::Failure(failure) => info!(tool = %name, failure = %failure, "Tool call failed"),
        }
        outcome
    }
}
