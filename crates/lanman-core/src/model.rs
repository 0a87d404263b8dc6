// ABOUTME: Data model for devices and spaces.
// ABOUTME: Devices are tool endpoints on the LAN; spaces are directories scoped to a set of devices.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Fixed path every device endpoint serves MCP on.
pub const ENDPOINT_PATH: &str = "/mcp";

/// Role description file the agent picks up from its working directory.
pub const ROLE_FILE: &str = "CLAUDE.md";

/// Tool manifest passed to the agent with --mcp-config.
pub const MANIFEST_FILE: &str = ".mcp.json";

/// Subdirectory for session notes and logs.
pub const LOGS_DIR: &str = "logs";

/// Cosmetic grouping for devices and spaces. Drives the role template and picker sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Category {
    #[default]
    Individual,
    Group,
    Consolidated,
}

impl From<String> for Category {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "group" => Category::Group,
            "consolidated" => Category::Consolidated,
            "individual" => Category::Individual,
            other => {
                tracing::warn!(category = %other, "Unknown category, treating as individual");
                Category::Individual
            }
        }
    }
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Individual => "individual",
            Category::Group => "group",
            Category::Consolidated => "consolidated",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A host on the network exposing a tool endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub name: String,
    #[serde(alias = "ip")]
    pub address: String,
    #[serde(alias = "mcp_port")]
    pub port: u16,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Category,
    /// Icon hint for front ends.
    #[serde(default = "default_icon")]
    pub icon: String,
}

fn default_icon() -> String {
    "computer".to_string()
}

impl Device {
    /// URL of the device's tool endpoint, e.g. `http://10.0.0.5:3000/mcp`.
    pub fn endpoint_url(&self) -> String {
        let host = if self.address.contains(':') && !self.address.starts_with('[') {
            format!("[{}]", self.address)
        } else {
            self.address.clone()
        };
        format!("http://{}:{}{}", host, self.port, ENDPOINT_PATH)
    }

    /// Key used for this device in a tool manifest.
    pub fn manifest_key(&self) -> String {
        format!("{}-mcp", self.id)
    }
}

/// A working directory bound to an allow-list of devices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Space {
    pub id: String,
    pub name: String,
    #[serde(rename = "devices", default)]
    pub device_ids: Vec<String>,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub description: String,
    /// Filled in from the config's base path after loading.
    #[serde(skip)]
    pub root: PathBuf,
}

impl Space {
    pub fn new(id: impl Into<String>, name: impl Into<String>, base: &Path) -> Self {
        let id = id.into();
        let root = base.join(&id);
        Self {
            id,
            name: name.into(),
            device_ids: Vec::new(),
            category: Category::default(),
            description: String::new(),
            root,
        }
    }

    pub fn with_devices<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.device_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn role_path(&self) -> PathBuf {
        self.root.join(ROLE_FILE)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    pub fn logs_path(&self) -> PathBuf {
        self.root.join(LOGS_DIR)
    }

    pub fn exists(&self) -> bool {
        self.root.exists()
    }

    /// "1 device" / "3 devices", counting configured ids.
    pub fn device_count_label(&self) -> String {
        match self.device_ids.len() {
            1 => "1 device".to_string(),
            n => format!("{n} devices"),
        }
    }
}
