// ABOUTME: Error types for lanman-core.
// ABOUTME: LanError covers config loading, scope file IO, and terminal launch failures.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LanError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error(
        "No spaces configured. Create a config file at ./config/config.toml or \
         ~/.config/lan-manager/config.toml (see `lanman copy-config`)"
    )]
    NoSpaces,

    #[error("Unknown space: {0}")]
    UnknownSpace(String),

    #[error("Failed to {action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to encode tool manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("Failed to encode config: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("No terminal emulator found (tried: {})", .tried.join(", "))]
    TerminalNotFound { tried: Vec<String> },

    #[error("Failed to start terminal '{terminal}': {source}")]
    Spawn {
        terminal: String,
        source: std::io::Error,
    },
}

impl LanError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LanError::Io {
            action,
            path: path.into(),
            source,
        }
    }

    /// True when the failure should be shown as a status message rather than an error.
    pub fn is_status(&self) -> bool {
        matches!(self, LanError::TerminalNotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, LanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_not_found_lists_candidates() {
        let err = LanError::TerminalNotFound {
            tried: vec!["konsole".to_string(), "x-terminal-emulator".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "No terminal emulator found (tried: konsole, x-terminal-emulator)"
        );
        assert!(err.is_status());
    }

    #[test]
    fn test_io_error_display() {
        let err = LanError::io(
            "write",
            "/tmp/space/.mcp.json",
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        let display = err.to_string();
        assert!(display.starts_with("Failed to write /tmp/space/.mcp.json"));
        assert!(!err.is_status());
    }
}
