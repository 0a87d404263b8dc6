// ABOUTME: Generates a space's on-disk scope: the tool manifest and the role file.
// ABOUTME: The manifest is rewritten on every launch; the role file is written once and then left to the user.

use crate::config::AppConfig;
use crate::error::{LanError, Result};
use crate::model::{Category, Device, Space};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Transport type the agent expects for Streamable HTTP servers.
pub const HTTP_TRANSPORT: &str = "http";

/// Contents of `.mcp.json`: one server entry per allowed device.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct McpManifest {
    #[serde(rename = "mcpServers")]
    pub mcp_servers: BTreeMap<String, ServerEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerEntry {
    #[serde(rename = "type")]
    pub transport: String,
    pub url: String,
}

impl McpManifest {
    pub fn to_json_pretty(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }
}

/// Build the manifest for exactly these devices and nothing else.
pub fn generate_manifest<'a>(devices: impl IntoIterator<Item = &'a Device>) -> McpManifest {
    let mcp_servers = devices
        .into_iter()
        .map(|device| {
            (
                device.manifest_key(),
                ServerEntry {
                    transport: HTTP_TRANSPORT.to_string(),
                    url: device.endpoint_url(),
                },
            )
        })
        .collect();
    McpManifest { mcp_servers }
}

/// Role heading and opening sentence for a space.
fn role_for(space: &Space, devices: &[&Device]) -> (String, String) {
    match space.category {
        Category::Consolidated => (
            "LAN Manager".to_string(),
            "You are the LAN Manager for the home network, with access to every device listed below."
                .to_string(),
        ),
        Category::Group => (
            space.name.clone(),
            format!(
                "You are the {}, responsible for a group of related devices.",
                space.name
            ),
        ),
        Category::Individual => {
            let device_name = devices
                .first()
                .map(|d| d.name.as_str())
                .unwrap_or("Unknown Device");
            (
                format!("{device_name} Manager"),
                format!("You are the dedicated manager for {device_name}."),
            )
        }
    }
}

/// Markdown role description the agent reads from its working directory.
pub fn generate_role_file(space: &Space, devices: &[&Device]) -> String {
    let (role, intro) = role_for(space, devices);

    let device_list = if devices.is_empty() {
        "- (no devices configured)".to_string()
    } else {
        devices
            .iter()
            .map(|d| {
                let mut line = format!("- **{}** ({}:{})", d.name, d.address, d.port);
                if !d.description.is_empty() {
                    line.push_str(": ");
                    line.push_str(&d.description);
                }
                line
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"# {role}

{intro}

## Managed Devices

{device_list}

## Tools

Each device above exposes a tool endpoint. Through it you can:
- run shell commands on the device
- read and write files
- collect system information (uptime, memory, disk, CPU, OS)

Only the endpoints for these devices are available in this session.

## Guidelines

1. Confirm with the user before deleting files or making changes that cannot be undone.
2. Record noteworthy actions in the `logs/` folder.
3. Work only on the devices assigned to this space.
4. Report connection problems or command failures to the user instead of retrying blindly.

## Logs

Keep notes in the `logs/` folder of this space:
- `logs/session-YYYY-MM-DD.md` for session notes
- `logs/changes.md` for configuration changes
- `logs/issues.md` for problems and how they were resolved

## Network

All devices are on the local network. Their tool endpoints speak MCP over HTTP and are
unauthenticated, so they must never be exposed beyond the LAN.
"#
    )
}

/// What `ensure_scope` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeReport {
    pub manifest_path: PathBuf,
    pub role_path: PathBuf,
    /// False when an existing role file was left untouched.
    pub role_written: bool,
    /// Number of devices that made it into the manifest.
    pub device_count: usize,
}

pub(crate) fn create_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|e| LanError::io("create directory", path, e))
}

pub(crate) fn write_file(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).map_err(|e| LanError::io("write", path, e))
}

/// Write the role file, overwriting only when `force` is set. Returns whether it was written.
pub(crate) fn write_role_file(
    config: &AppConfig,
    space: &Space,
    force: bool,
) -> Result<bool> {
    let path = space.role_path();
    if !force && path.exists() {
        debug!(path = %path.display(), "Role file exists, leaving it alone");
        return Ok(false);
    }
    let devices = config.devices_for_space(space);
    write_file(&path, &generate_role_file(space, &devices))?;
    Ok(true)
}

/// Make sure the space directory exists and its manifest matches the current config.
///
/// The manifest is always rewritten so that the agent can only reach the
/// space's devices, even if the config changed since the last launch.
pub fn ensure_scope(config: &AppConfig, space: &Space) -> Result<ScopeReport> {
    create_dir(space.root())?;
    create_dir(&space.logs_path())?;

    let role_written = write_role_file(config, space, false)?;

    let devices = config.devices_for_space(space);
    let manifest = generate_manifest(devices.iter().copied());
    let manifest_path = space.manifest_path();
    write_file(&manifest_path, &manifest.to_json_pretty()?)?;

    info!(
        space = %space.id,
        devices = manifest.mcp_servers.len(),
        role_written,
        "Scope files ready"
    );

    Ok(ScopeReport {
        manifest_path,
        role_path: space.role_path(),
        role_written,
        device_count: manifest.mcp_servers.len(),
    })
}
