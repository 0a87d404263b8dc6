// ABOUTME: Tool definitions advertised by the device endpoint.
// ABOUTME: Names, host-specific descriptions, and JSON-schema input descriptions.

use rmcp::model::{JsonObject, Tool};
use serde_json::{json, Value};
use std::sync::Arc;

pub const RUN_COMMAND: &str = "run_command";
pub const READ_FILE: &str = "read_file";
pub const WRITE_FILE: &str = "write_file";
pub const GET_SYSTEM_INFO: &str = "get_system_info";

pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 60;

fn schema(value: Value) -> Arc<JsonObject> {
    match value {
        Value::Object(map) => Arc::new(map),
        _ => Arc::default(),
    }
}

/// The four tools, in listing order, described for `hostname`.
pub fn definitions(hostname: &str) -> Vec<Tool> {
    vec![
        Tool::new(
            RUN_COMMAND,
            format!("Execute a shell command on {hostname}"),
            schema(json!({
                "type": "object",
                "properties": {
                    "command": {
                        "type": "string",
                        "description": "The shell command to execute"
                    },
                    "timeout": {
                        "type": "integer",
                        "description": format!("Timeout in seconds (default: {DEFAULT_COMMAND_TIMEOUT_SECS})"),
                        "default": DEFAULT_COMMAND_TIMEOUT_SECS,
                        "minimum": 0
                    }
                },
                "required": ["command"]
            })),
        ),
        Tool::new(
            READ_FILE,
            format!("Read a file from {hostname}"),
            schema(json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Absolute path to the file"
                    }
                },
                "required": ["path"]
            })),
        ),
        Tool::new(
            WRITE_FILE,
            format!("Write content to a file on {hostname}"),
            schema(json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Absolute path to the file"
                    },
                    "content": {
                        "type": "string",
                        "description": "Content to write"
                    }
                },
                "required": ["path", "content"]
            })),
        ),
        Tool::new(
            GET_SYSTEM_INFO,
            format!("Get system information from {hostname}"),
            schema(json!({
                "type": "object",
                "properties": {},
                "required": []
            })),
        ),
    ]
}
