// ABOUTME: Device-side tool endpoint for lanman
// ABOUTME: Dispatches shell, file, and system-info tools and serves them over MCP HTTP

pub mod dispatch;
pub mod exec;
pub mod server;
pub mod tools;

pub use dispatch::{Dispatcher, ToolFailure, ToolOutcome};
pub use server::{router, serve, serve_listener, DeviceServer};

/// This machine's hostname, or "localhost" when it cannot be read.
pub fn local_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}
