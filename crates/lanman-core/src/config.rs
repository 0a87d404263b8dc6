// ABOUTME: Configuration loading and management for lanman
// ABOUTME: Defaults, then environment overrides, then a TOML config file with devices and spaces

use crate::error::{LanError, Result};
use crate::model::{Device, Space};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Directory name under the config and data dirs.
pub const APP_DIR: &str = "lan-manager";

pub const DEFAULT_TERMINAL: &str = "konsole";
pub const DEFAULT_AGENT_COMMAND: &str = "claude";

pub const ENV_SPACES_PATH: &str = "CLAUDE_SPACES_PATH";
pub const ENV_TERMINAL: &str = "TERMINAL_EMULATOR";
pub const ENV_AGENT_COMMAND: &str = "CLAUDE_CODE_CMD";

/// Application configuration, built once at startup and passed by reference.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Parent directory of every space root.
    pub spaces_base_path: PathBuf,
    /// Terminal emulator identifier, looked up in the profile table.
    pub terminal_emulator: String,
    /// Agent binary run inside the terminal.
    pub agent_command: String,
    pub devices: BTreeMap<String, Device>,
    /// Spaces in config file order.
    pub spaces: Vec<Space>,
    /// Config file the values came from, if any.
    pub source: Option<PathBuf>,
}

/// On-disk shape of the config file.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct ConfigFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    spaces_base_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    terminal_emulator: Option<String>,
    #[serde(alias = "claude_code_cmd", skip_serializing_if = "Option::is_none")]
    agent_command: Option<String>,
    devices: Vec<Device>,
    spaces: Vec<Space>,
}

impl AppConfig {
    /// Empty configuration rooted at `spaces_base_path` with default terminal and agent.
    pub fn new(spaces_base_path: impl Into<PathBuf>) -> Self {
        Self {
            spaces_base_path: spaces_base_path.into(),
            terminal_emulator: DEFAULT_TERMINAL.to_string(),
            agent_command: DEFAULT_AGENT_COMMAND.to_string(),
            devices: BTreeMap::new(),
            spaces: Vec::new(),
            source: None,
        }
    }

    pub fn with_device(mut self, device: Device) -> Self {
        self.devices.insert(device.id.clone(), device);
        self
    }

    /// Add a space, re-rooting it under this config's base path.
    pub fn with_space(mut self, space: Space) -> Self {
        self.push_space(space);
        self
    }

    fn push_space(&mut self, mut space: Space) {
        space.root = self.spaces_base_path.join(&space.id);
        self.spaces.push(space);
    }

    /// Default base path: $XDG_DATA_HOME/lan-manager/spaces (~/.local/share when unset).
    pub fn default_spaces_path(env: impl Fn(&str) -> Option<String>) -> PathBuf {
        env("XDG_DATA_HOME")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .map(|p| p.join(".local").join("share"))
                    .unwrap_or_else(|| PathBuf::from("."))
            })
            .join(APP_DIR)
            .join("spaces")
    }

    /// Config file locations checked when no explicit path is given, in order.
    pub fn candidate_paths() -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            candidates.push(cwd.join("config").join("config.toml"));
            candidates.push(cwd.join("config.toml"));
        }
        if let Some(dir) = dirs::config_dir() {
            candidates.push(dir.join(APP_DIR).join("config.toml"));
        }
        candidates
    }

    /// Load configuration from `.env`, the process environment, and a config file.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        // A missing .env is the normal case.
        if let Ok(env_path) = dotenvy::dotenv() {
            debug!(path = %env_path.display(), "Loaded .env");
        }

        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Self::candidate_paths().into_iter().find(|p| p.exists()),
        };

        Self::load_with(path.as_deref(), |var| std::env::var(var).ok())
    }

    /// Load with an explicit environment lookup. `path` must exist when given.
    pub fn load_with(path: Option<&Path>, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::new(Self::default_spaces_path(&env));

        if let Some(base) = env(ENV_SPACES_PATH).filter(|v| !v.is_empty()) {
            config.spaces_base_path = expand_path(&base);
        }
        if let Some(terminal) = env(ENV_TERMINAL).filter(|v| !v.is_empty()) {
            config.terminal_emulator = terminal;
        }
        if let Some(agent) = env(ENV_AGENT_COMMAND).filter(|v| !v.is_empty()) {
            config.agent_command = agent;
        }

        if let Some(path) = path {
            let contents = std::fs::read_to_string(path)
                .map_err(|e| LanError::io("read config", path, e))?;
            config.apply_toml(&contents, path, &env)?;
            config.source = Some(path.to_path_buf());
        }

        config.validate()?;

        debug!(
            base = %config.spaces_base_path.display(),
            terminal = %config.terminal_emulator,
            devices = config.devices.len(),
            spaces = config.spaces.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    fn apply_toml(
        &mut self,
        contents: &str,
        path: &Path,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<()> {
        // Expand environment variables, warning on undefined vars.
        let contents = shellexpand::env_with_context_no_errors(contents, |var: &str| {
            match env(var) {
                Some(val) => Some(val),
                None => {
                    warn!(
                        variable = %var,
                        "Environment variable not defined, using empty string"
                    );
                    Some(String::new())
                }
            }
        });

        let file: ConfigFile = toml::from_str(&contents).map_err(|source| LanError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        if let Some(base) = file.spaces_base_path {
            self.spaces_base_path = expand_path(&base);
        }
        if let Some(terminal) = file.terminal_emulator {
            self.terminal_emulator = terminal;
        }
        if let Some(agent) = file.agent_command {
            self.agent_command = agent;
        }

        for device in file.devices {
            if self.devices.contains_key(&device.id) {
                return Err(LanError::Config(format!(
                    "duplicate device id '{}'",
                    device.id
                )));
            }
            self.devices.insert(device.id.clone(), device);
        }

        for space in file.spaces {
            if self.spaces.iter().any(|s| s.id == space.id) {
                return Err(LanError::Config(format!(
                    "duplicate space id '{}'",
                    space.id
                )));
            }
            self.push_space(space);
        }

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.terminal_emulator.trim().is_empty() {
            return Err(LanError::Config("terminal_emulator is required".into()));
        }
        if self.agent_command.trim().is_empty() {
            return Err(LanError::Config("agent_command is required".into()));
        }
        for device in self.devices.values() {
            if device.id.trim().is_empty() {
                return Err(LanError::Config("device id must not be empty".into()));
            }
        }
        for space in &self.spaces {
            if !is_safe_segment(&space.id) {
                return Err(LanError::Config(format!(
                    "space id '{}' must be a single directory name",
                    space.id
                )));
            }
        }
        Ok(())
    }

    /// Fail fast when there is nothing to launch.
    pub fn require_spaces(&self) -> Result<()> {
        if self.spaces.is_empty() {
            return Err(LanError::NoSpaces);
        }
        Ok(())
    }

    pub fn space(&self, id: &str) -> Option<&Space> {
        self.spaces.iter().find(|s| s.id == id)
    }

    pub fn require_space(&self, id: &str) -> Result<&Space> {
        self.space(id)
            .ok_or_else(|| LanError::UnknownSpace(id.to_string()))
    }

    /// Devices a space is allowed to reach. Dangling ids are skipped, repeats resolve once.
    pub fn devices_for_space(&self, space: &Space) -> Vec<&Device> {
        let mut seen = HashSet::new();
        space
            .device_ids
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .filter_map(|id| {
                let device = self.devices.get(id);
                if device.is_none() {
                    debug!(space = %space.id, device = %id, "Skipping unknown device reference");
                }
                device
            })
            .collect()
    }

    /// Serialize back to the config file format.
    pub fn to_toml(&self) -> Result<String> {
        let file = ConfigFile {
            spaces_base_path: Some(self.spaces_base_path.display().to_string()),
            terminal_emulator: Some(self.terminal_emulator.clone()),
            agent_command: Some(self.agent_command.clone()),
            devices: self.devices.values().cloned().collect(),
            spaces: self.spaces.clone(),
        };
        Ok(toml::to_string_pretty(&file)?)
    }

    /// Write the configuration to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| LanError::io("create directory", parent, e))?;
        }
        let contents = self.to_toml()?;
        std::fs::write(path, contents).map_err(|e| LanError::io("write config", path, e))
    }

    /// Annotated example configuration.
    pub fn example_toml() -> &'static str {
        r#"# lanman configuration
# Location: ./config/config.toml or ~/.config/lan-manager/config.toml

# Where space directories are created (one per space id)
spaces_base_path = "~/.local/share/lan-manager/spaces"

# Terminal used to open sessions: konsole, gnome-terminal, xterm, kitty,
# alacritty, wezterm, foot, x-terminal-emulator
terminal_emulator = "konsole"

# Agent binary started in each space
agent_command = "claude"

[[devices]]
id = "nas"
name = "NAS"
address = "10.0.0.10"
port = 3000
description = "File server"

[[devices]]
id = "pihole"
name = "Pi-hole"
address = "10.0.0.11"
port = 3000
description = "DNS sinkhole"
icon = "router"

[[spaces]]
id = "lan"
name = "LAN Manager"
category = "consolidated"
description = "Every device on the network"
devices = ["nas", "pihole"]

[[spaces]]
id = "nas"
name = "NAS"
devices = ["nas"]
"#
    }
}

/// Expand `~` and environment variables in a path value.
fn expand_path(value: &str) -> PathBuf {
    match shellexpand::full(value) {
        Ok(expanded) => PathBuf::from(expanded.into_owned()),
        Err(e) => {
            warn!(value = %value, error = %e, "Failed to expand path, using it verbatim");
            PathBuf::from(shellexpand::tilde(value).into_owned())
        }
    }
}

fn is_safe_segment(id: &str) -> bool {
    !id.trim().is_empty() && id != "." && id != ".." && !id.contains(['/', '\\', '\0'])
}
