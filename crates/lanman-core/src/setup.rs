// ABOUTME: Setup helpers: initialize every space up front and write an example config.
// ABOUTME: Used by `lanman init` and `lanman copy-config`.

use crate::config::AppConfig;
use crate::error::{LanError, Result};
use crate::model::Space;
use crate::scope::{create_dir, ensure_scope, write_file, write_role_file};
use std::path::{Path, PathBuf};
use tracing::info;

pub const LOGS_README: &str = "README.md";

/// Files touched while initializing one space.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitReport {
    pub written: Vec<PathBuf>,
}

impl InitReport {
    pub fn changed(&self) -> bool {
        !self.written.is_empty()
    }
}

fn logs_readme(space: &Space) -> String {
    format!(
        r#"# {} Logs

Notes and logs written during agent sessions in this space.

- `session-YYYY-MM-DD.md`: daily session notes
- `changes.md`: configuration and system changes
- `issues.md`: problems encountered and how they were resolved
"#,
        space.name
    )
}

/// Create a space's directory, scope files and logs README.
///
/// The manifest always reflects the current config. The role file and the
/// README are only written when missing, or when `force` is set.
pub fn initialize_space(config: &AppConfig, space: &Space, force: bool) -> Result<InitReport> {
    let mut report = InitReport::default();

    let scope = ensure_scope(config, space)?;
    if scope.role_written {
        report.written.push(scope.role_path.clone());
    } else if force && write_role_file(config, space, true)? {
        report.written.push(scope.role_path.clone());
    }
    report.written.push(scope.manifest_path);

    let readme = space.logs_path().join(LOGS_README);
    if force || !readme.exists() {
        write_file(&readme, &logs_readme(space))?;
        report.written.push(readme);
    }

    Ok(report)
}

/// Initialize every configured space. Returns the ids of spaces whose files changed.
pub fn initialize_spaces(config: &AppConfig, force: bool) -> Result<Vec<String>> {
    let mut changed = Vec::new();
    for space in &config.spaces {
        let report = initialize_space(config, space, force)?;
        info!(space = %space.id, files = report.written.len(), "Initialized space");
        if report.changed() {
            changed.push(space.id.clone());
        }
    }
    Ok(changed)
}

/// Write the example configuration to `dest`. Refuses to overwrite unless `force`.
pub fn write_example_config(dest: &Path, force: bool) -> Result<PathBuf> {
    if dest.exists() && !force {
        return Err(LanError::Config(format!(
            "{} already exists (use --force to overwrite)",
            dest.display()
        )));
    }
    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() {
            create_dir(parent)?;
        }
    }
    write_file(dest, AppConfig::example_toml())?;
    Ok(dest.to_path_buf())
}

/// Where `copy-config` writes when no destination is given.
pub fn default_config_destination() -> PathBuf {
    PathBuf::from("config").join("config.toml")
}
