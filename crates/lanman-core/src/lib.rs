// ABOUTME: Core library for lanman - devices, spaces, scope files, terminal launch
// ABOUTME: Shared by the lanman CLI and its tests

pub mod config;
pub mod error;
pub mod launcher;
pub mod model;
pub mod scope;
pub mod setup;
pub mod terminal;

pub use config::AppConfig;
pub use error::{LanError, Result};
pub use launcher::{launch, preflight, spawn, Launch, LaunchedSession, Prerequisite};
pub use model::{Category, Device, Space};
pub use scope::{ensure_scope, generate_manifest, generate_role_file, McpManifest, ScopeReport};
pub use setup::{initialize_space, initialize_spaces, write_example_config};
