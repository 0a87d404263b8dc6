// ABOUTME: CLI library components for the lanman launcher.
// ABOUTME: Picker entries grouped by category and plain-text reports for show-config and check.

//! # lanman-cli
//!
//! The `lanman` binary opens a space picker by default:
//!
//! ```text
//! lanman
//! ├── launch <space>      # Launch one space without the picker
//! ├── init [--force]      # Create every space's directory and scope files
//! ├── copy-config         # Write the example config
//! ├── show-config         # Print the loaded configuration
//! └── check               # Report missing terminal / agent
//! ```

use lanman_core::{AppConfig, Category, Prerequisite, Space};
use std::fmt::Write;

/// Picker sections, in display order.
pub const SECTIONS: [(Category, &str); 3] = [
    (Category::Consolidated, "LAN Manager"),
    (Category::Group, "Groups"),
    (Category::Individual, "Devices"),
];

/// One row in the interactive picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerItem {
    Section(&'static str),
    Space { id: String, label: String },
}

impl PickerItem {
    pub fn label(&self) -> String {
        match self {
            PickerItem::Section(title) => format!("── {title} ──"),
            PickerItem::Space { label, .. } => format!("  {label}"),
        }
    }

    pub fn space_id(&self) -> Option<&str> {
        match self {
            PickerItem::Space { id, .. } => Some(id),
            PickerItem::Section(_) => None,
        }
    }
}

fn space_label(space: &Space) -> String {
    let mut label = format!("{} ({})", space.name, space.device_count_label());
    if !space.description.is_empty() {
        let _ = write!(label, " - {}", space.description);
    }
    label
}

/// Spaces grouped under their section headers. Empty sections are left out.
pub fn picker_items(config: &AppConfig) -> Vec<PickerItem> {
    let mut items = Vec::new();
    for (category, title) in SECTIONS {
        let mut spaces = config
            .spaces
            .iter()
            .filter(|s| s.category == category)
            .peekable();
        if spaces.peek().is_none() {
            continue;
        }
        items.push(PickerItem::Section(title));
        items.extend(spaces.map(|space| PickerItem::Space {
            id: space.id.clone(),
            label: space_label(space),
        }));
    }
    items
}

/// Index of the first selectable row.
pub fn first_space(items: &[PickerItem]) -> usize {
    items
        .iter()
        .position(|item| item.space_id().is_some())
        .unwrap_or(0)
}

pub fn render_config(config: &AppConfig) -> String {
    let mut out = String::new();
    let source = config
        .source
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(none, using defaults)".to_string());
    let _ = writeln!(out, "Config file: {source}");
    let _ = writeln!(out, "Spaces path: {}", config.spaces_base_path.display());
    let _ = writeln!(out, "Terminal:    {}", config.terminal_emulator);
    let _ = writeln!(out, "Agent:       {}", config.agent_command);

    let _ = writeln!(out, "\nDevices ({}):", config.devices.len());
    for device in config.devices.values() {
        let _ = write!(out, "  {:<12} {:<20} {}", device.id, device.name, device.endpoint_url());
        if !device.description.is_empty() {
            let _ = write!(out, "  {}", device.description);
        }
        out.push('\n');
    }

    let _ = writeln!(out, "\nSpaces ({}):", config.spaces.len());
    for space in &config.spaces {
        let state = if space.exists() { "" } else { "  (not created yet)" };
        let _ = writeln!(
            out,
            "  {:<12} {:<20} {:<13} {}: {}{state}",
            space.id,
            space.name,
            space.category.as_str(),
            space.device_count_label(),
            space.device_ids.join(", "),
        );
    }
    out
}

pub fn render_preflight(config: &AppConfig, problems: &[Prerequisite]) -> String {
    let mut out = String::new();
    match &config.source {
        Some(path) => {
            let _ = writeln!(out, "ok       config {}", path.display());
        }
        None => {
            let _ = writeln!(out, "warning  no config file found");
        }
    }
    let _ = writeln!(
        out,
        "ok       {} devices, {} spaces",
        config.devices.len(),
        config.spaces.len()
    );
    if problems.is_empty() {
        let _ = writeln!(out, "ok       terminal {}", config.terminal_emulator);
        let _ = writeln!(out, "ok       agent {}", config.agent_command);
    }
    for problem in problems {
        let level = if problem.is_missing() { "missing" } else { "warning" };
        let _ = writeln!(out, "{level:<8} {problem}");
    }
    out
}
