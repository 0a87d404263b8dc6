// ABOUTME: Shared logging setup for all lanman binaries
// ABOUTME: init_file() for the interactive launcher, init_for() for the device server

use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Directory name used under the platform config dir for log files.
pub const APP_DIR: &str = "lan-manager";

/// File-based logging for the interactive launcher. Default: INFO level, RUST_LOG override.
/// Logs to ~/.config/lan-manager/{app_name}.log so the picker output stays clean.
/// If setup fails, prints a warning to stderr and continues without logging.
pub fn init_file(app_name: &str) {
    let Some(dir) = log_dir() else {
        eprintln!("Warning: failed to set up file logging: could not determine config directory");
        return;
    };
    if let Err(e) = init_file_in(&dir, app_name) {
        eprintln!("Warning: failed to set up file logging: {e}");
    }
}

/// Where log files for lanman binaries live.
pub fn log_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR))
}

fn init_file_in(dir: &Path, app_name: &str) -> Result<(), Box<dyn std::error::Error>> {
    let log_file = open_log_file(dir, app_name)?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_ansi(false)
        .init();

    Ok(())
}

fn open_log_file(dir: &Path, app_name: &str) -> std::io::Result<std::fs::File> {
    std::fs::create_dir_all(dir)?;
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(format!("{app_name}.log")))
}

/// Crate-filtered logging to stderr. Default: INFO for named crate, WARN for everything else.
/// Used by the device server so axum/hyper internals stay quiet.
pub fn init_for(crate_name: &str) {
    let directive = format!("{crate_name}=info");
    let filter = EnvFilter::from_default_env()
        .add_directive(tracing::Level::WARN.into())
        .add_directive(
            directive
                .parse()
                .unwrap_or_else(|_| tracing::Level::INFO.into()),
        );

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exports_init_for() {
        let _ = super::init_for as fn(&str);
    }

    #[test]
    fn test_open_log_file_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested").join("logs");
        open_log_file(&dir, "lanman").unwrap();
        assert!(dir.join("lanman.log").exists());
    }

    #[test]
    fn test_log_dir_uses_app_dir() {
        if let Some(dir) = log_dir() {
            assert!(dir.ends_with(APP_DIR));
        }
    }
}
