// ABOUTME: Launches the agent in a detached terminal, restricted to one space's manifest.
// ABOUTME: Resolves the terminal (with one fallback), builds its argv, and spawns without waiting.

use crate::config::AppConfig;
use crate::error::{LanError, Result};
use crate::model::Space;
use crate::scope::{ensure_scope, ScopeReport};
use crate::terminal::{self, quote_path, FALLBACK_TERMINAL};
use std::process::{Command, Stdio};
use tracing::{info, warn};

/// Flag that makes the agent ignore every tool config except the one passed with MANIFEST_FLAG.
pub const STRICT_SCOPE_FLAG: &str = "--strict-mcp-config";
pub const MANIFEST_FLAG: &str = "--mcp-config";

/// A terminal started for a space. The launcher does not track it further.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchedSession {
    pub pid: u32,
    /// Terminal actually used, which may be the fallback.
    pub terminal: String,
    pub argv: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Launch {
    pub scope: ScopeReport,
    pub session: LaunchedSession,
}

/// Problems worth showing before the user tries to launch anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prerequisite {
    /// Configured terminal is missing but the fallback is installed.
    TerminalFallback { configured: String, fallback: String },
    /// Neither the configured terminal nor the fallback is installed.
    TerminalMissing { configured: String },
    /// Agent binary is not on PATH.
    AgentMissing { command: String },
}

impl Prerequisite {
    /// True when launching cannot work at all; a fallback terminal only warrants a warning.
    pub fn is_missing(&self) -> bool {
        !matches!(self, Prerequisite::TerminalFallback { .. })
    }
}

impl std::fmt::Display for Prerequisite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Prerequisite::TerminalFallback {
                configured,
                fallback,
            } => write!(f, "Terminal '{configured}' not found, using '{fallback}'"),
            Prerequisite::TerminalMissing { configured } => {
                write!(f, "Terminal '{configured}' not found")
            }
            Prerequisite::AgentMissing { command } => write!(f, "Agent '{command}' not found"),
        }
    }
}

fn on_path(program: &str) -> bool {
    which::which(program).is_ok()
}

/// Program name of the agent command (the command may carry extra arguments).
fn agent_program(config: &AppConfig) -> &str {
    config
        .agent_command
        .split_whitespace()
        .next()
        .unwrap_or(config.agent_command.as_str())
}

/// Shell command run inside the terminal.
pub fn agent_command_line(config: &AppConfig, space: &Space) -> String {
    format!(
        "{} {} {} {}",
        config.agent_command,
        STRICT_SCOPE_FLAG,
        MANIFEST_FLAG,
        quote_path(&space.manifest_path())
    )
}

/// Pick the configured terminal, or the fallback when the configured one is not installed.
pub fn resolve_terminal(configured: &str) -> Result<String> {
    resolve_terminal_with(configured, on_path)
}

pub fn resolve_terminal_with(configured: &str, installed: impl Fn(&str) -> bool) -> Result<String> {
    let mut tried = vec![configured.to_string()];
    if installed(configured) {
        return Ok(configured.to_string());
    }
    if configured != FALLBACK_TERMINAL {
        tried.push(FALLBACK_TERMINAL.to_string());
        if installed(FALLBACK_TERMINAL) {
            warn!(
                configured = %configured,
                fallback = FALLBACK_TERMINAL,
                "Configured terminal not found, using fallback"
            );
            return Ok(FALLBACK_TERMINAL.to_string());
        }
    }
    Err(LanError::TerminalNotFound { tried })
}

/// Check terminal and agent availability without launching anything.
pub fn preflight(config: &AppConfig) -> Vec<Prerequisite> {
    preflight_with(config, on_path)
}

pub fn preflight_with(config: &AppConfig, installed: impl Fn(&str) -> bool) -> Vec<Prerequisite> {
    let mut problems = Vec::new();
    let configured = config.terminal_emulator.clone();
    match resolve_terminal_with(&configured, &installed) {
        Ok(found) if found != configured => problems.push(Prerequisite::TerminalFallback {
            configured,
            fallback: found,
        }),
        Ok(_) => {}
        Err(_) => problems.push(Prerequisite::TerminalMissing { configured }),
    }
    let agent = agent_program(config);
    if !installed(agent) {
        problems.push(Prerequisite::AgentMissing {
            command: agent.to_string(),
        });
    }
    problems
}

/// Start a terminal running the agent in the space directory and return immediately.
///
/// The child starts a new session, so neither the launcher exiting nor a
/// Ctrl+C or hangup aimed at its terminal reaches the agent. Call
/// [`ensure_scope`] first; [`launch`] does both in order.
pub fn spawn(config: &AppConfig, space: &Space) -> Result<LaunchedSession> {
    let terminal = resolve_terminal(&config.terminal_emulator)?;
    let command = agent_command_line(config, space);
    let argv = terminal::argv(&terminal, space.root(), &command);

    let mut cmd = Command::new(&argv[0]);
    cmd.args(&argv[1..])
        .current_dir(space.root())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        // SAFETY: setsid is async-signal-safe and touches no parent state.
        unsafe {
            cmd.pre_exec(|| {
                if libc::setsid() == -1 {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }
    }

    let mut child = cmd.spawn().map_err(|source| LanError::Spawn {
        terminal: terminal.clone(),
        source,
    })?;
    let pid = child.id();

    // Reap the terminal when it exits; nothing waits on it otherwise.
    let reaper = std::thread::Builder::new()
        .name(format!("reap-{pid}"))
        .spawn(move || {
            let _ = child.wait();
        });
    if let Err(e) = reaper {
        warn!(pid, error = %e, "Failed to start reaper thread");
    }

    info!(
        space = %space.id,
        terminal = %terminal,
        pid,
        "Launched agent session"
    );

    Ok(LaunchedSession {
        pid,
        terminal,
        argv,
    })
}

/// Regenerate the space's scope files, then spawn the session.
pub fn launch(config: &AppConfig, space: &Space) -> Result<Launch> {
    let scope = ensure_scope(config, space)?;
    let session = spawn(config, space)?;
    Ok(Launch { scope, session })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn config() -> AppConfig {
        AppConfig::new("/spaces").with_space(Space::new("nas", "NAS", Path::new("/spaces")))
    }

    #[test]
    fn test_agent_command_line_forces_manifest() {
        let config = config();
        let space = config.space("nas").unwrap();
        assert_eq!(
            agent_command_line(&config, space),
            "claude --strict-mcp-config --mcp-config /spaces/nas/.mcp.json"
        );
    }

    #[test]
    fn test_agent_command_line_quotes_manifest_path() {
        let config = AppConfig::new("/my spaces")
            .with_space(Space::new("nas", "NAS", Path::new("/")));
        let space = config.space("nas").unwrap();
        assert!(agent_command_line(&config, space)
            .ends_with("--mcp-config '/my spaces/nas/.mcp.json'"));
    }

    #[test]
    fn test_resolve_terminal_prefers_configured() {
        let found = resolve_terminal_with("kitty", |_| true).unwrap();
        assert_eq!(found, "kitty");
    }

    #[test]
    fn test_resolve_terminal_falls_back() {
        let found = resolve_terminal_with("kitty", |t| t == FALLBACK_TERMINAL).unwrap();
        assert_eq!(found, FALLBACK_TERMINAL);
    }

    #[test]
    fn test_resolve_terminal_reports_all_candidates() {
        let err = resolve_terminal_with("kitty", |_| false).unwrap_err();
        match err {
            LanError::TerminalNotFound { tried } => {
                assert_eq!(tried, vec!["kitty".to_string(), FALLBACK_TERMINAL.to_string()])
            }
            other => panic!("expected TerminalNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_resolve_fallback_not_tried_twice() {
        let err = resolve_terminal_with(FALLBACK_TERMINAL, |_| false).unwrap_err();
        assert!(matches!(err, LanError::TerminalNotFound { tried } if tried.len() == 1));
    }

    #[test]
    fn test_preflight_all_present() {
        assert!(preflight_with(&config(), |_| true).is_empty());
    }

    #[test]
    fn test_preflight_reports_fallback_and_agent() {
        let mut config = config();
        config.agent_command = "claude --verbose".to_string();
        let problems = preflight_with(&config, |p| p == FALLBACK_TERMINAL);
        assert_eq!(
            problems,
            vec![
                Prerequisite::TerminalFallback {
                    configured: "konsole".to_string(),
                    fallback: FALLBACK_TERMINAL.to_string(),
                },
                Prerequisite::AgentMissing {
                    command: "claude".to_string(),
                },
            ]
        );
        assert_eq!(
            problems[0].to_string(),
            "Terminal 'konsole' not found, using 'x-terminal-emulator'"
        );
        assert!(!problems[0].is_missing());
        assert!(problems[1].is_missing());
    }

    #[test]
    fn test_preflight_terminal_missing() {
        let problems = preflight_with(&config(), |p| p == "claude");
        assert_eq!(
            problems,
            vec![Prerequisite::TerminalMissing {
                configured: "konsole".to_string()
            }]
        );
    }
}
