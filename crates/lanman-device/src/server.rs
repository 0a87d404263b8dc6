// ABOUTME: MCP Streamable HTTP endpoint for one device, served by rmcp inside an axum router.
// ABOUTME: The handler lists the four tools and hands every call to the dispatcher.

use crate::dispatch::Dispatcher;
use anyhow::{Context, Result};
use axum::routing::get;
use axum::Router;
use rmcp::model::{
    CallToolRequestParams, CallToolResult, ErrorData, Implementation, ListToolsResult,
    PaginatedRequestParams, ServerCapabilities, ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::transport::streamable_http_server::{StreamableHttpServerConfig, StreamableHttpService};
use rmcp::{RoleServer, ServerHandler};
use serde_json::Value;
use std::future::{Future, IntoFuture};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};

pub const MCP_PATH: &str = "/mcp";
pub const HEALTH_PATH: &str = "/health";

/// How long open streams get to close after shutdown is requested.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// MCP server handler for one device.
#[derive(Debug, Clone)]
pub struct DeviceServer {
    dispatcher: Arc<Dispatcher>,
}

impl DeviceServer {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

impl ServerHandler for DeviceServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: self.dispatcher.server_name(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some(format!(
                "Shell, file, and system-info access to {}",
                self.dispatcher.hostname()
            )),
            ..Default::default()
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<ListToolsResult, ErrorData>> + Send + '_ {
        std::future::ready(Ok(ListToolsResult::with_all_items(self.dispatcher.tools())))
    }

    fn call_tool(
        &self,
        request: CallToolRequestParams,
        _: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<CallToolResult, ErrorData>> + Send + '_ {
        async move {
            let arguments = request.arguments.map(Value::Object).unwrap_or(Value::Null);
            let outcome = self.dispatcher.call(&request.name, arguments).await;
            Ok(outcome.into())
        }
    }
}

async fn health() -> &'static str {
    "ok"
}

/// Routes for the device endpoint: the MCP service under `/mcp` and a health check.
pub fn router(dispatcher: Dispatcher) -> Router {
    let server = DeviceServer::new(dispatcher);
    let mcp = StreamableHttpService::new(
        move || Ok(server.clone()),
        LocalSessionManager::default().into(),
        StreamableHttpServerConfig::default(),
    );

    Router::new()
        .nest_service(MCP_PATH, mcp)
        .route(HEALTH_PATH, get(health))
}

/// Serve on an already bound listener until `shutdown` resolves.
///
/// Connections still open [`SHUTDOWN_GRACE`] after shutdown are dropped.
pub async fn serve_listener<F>(listener: TcpListener, dispatcher: Dispatcher, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr().context("Listener has no local address")?;
    info!(
        url = %format!("http://{addr}{MCP_PATH}"),
        server = %dispatcher.server_name(),
        "MCP server listening"
    );
    warn!("No authentication: only expose this endpoint on a trusted local network");

    let (stopping_tx, mut stopping) = tokio::sync::watch::channel(false);
    let signal = async move {
        shutdown.await;
        let _ = stopping_tx.send(true);
    };
    let server = axum::serve(listener, router(dispatcher))
        .with_graceful_shutdown(signal)
        .into_future();
    let deadline = async move {
        if stopping.wait_for(|stopped| *stopped).await.is_err() {
            std::future::pending::<()>().await;
        }
        tokio::time::sleep(SHUTDOWN_GRACE).await;
    };

    tokio::select! {
        result = server => result.context("MCP server failed")?,
        () = deadline => warn!(
            grace_secs = SHUTDOWN_GRACE.as_secs(),
            "Open connections did not close in time, stopping anyway"
        ),
    }

    info!("MCP server stopped");
    Ok(())
}

pub async fn serve<F>(host: &str, port: u16, dispatcher: Dispatcher, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind((host, port))
        .await
        .with_context(|| format!("Failed to bind {host}:{port}"))?;
    serve_listener(listener, dispatcher, shutdown).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    fn initialize_body() -> String {
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {
                "protocolVersion": "2025-03-26",
                "capabilities": {},
                "clientInfo": {"name": "lanman-test", "version": "0"}
            }
        })
        .to_string()
    }

    #[test]
    fn test_server_info_names_the_device() {
        let info = DeviceServer::new(Dispatcher::new("testhost")).get_info();
        assert_eq!(info.server_info.name, "testhost-mcp");
        assert!(info.capabilities.tools.is_some());
        assert!(info.instructions.unwrap().contains("testhost"));
    }

    #[test]
    fn test_handler_shares_one_dispatcher() {
        let server = DeviceServer::new(Dispatcher::new("testhost"));
        let copy = server.clone();
        assert!(std::ptr::eq(server.dispatcher(), copy.dispatcher()));
        assert_eq!(copy.dispatcher().tools().len(), 4);
    }

    #[tokio::test]
    async fn test_initialize_opens_a_session() {
        let response = router(Dispatcher::new("testhost"))
            .oneshot(
                Request::post(MCP_PATH)
                    .header("content-type", "application/json")
                    .header("accept", "application/json, text/event-stream")
                    .body(Body::from(initialize_body()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let session = response.headers().get("mcp-session-id");
        assert!(session.is_some_and(|id| !id.is_empty()));
    }

    #[tokio::test]
    async fn test_post_without_stream_accept_is_rejected() {
        let response = router(Dispatcher::new("testhost"))
            .oneshot(
                Request::post(MCP_PATH)
                    .header("content-type", "application/json")
                    .body(Body::from(initialize_body()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(response.status().is_client_error(), "{}", response.status());
    }

    #[tokio::test]
    async fn test_health() {
        let response = router(Dispatcher::new("testhost"))
            .oneshot(Request::get(HEALTH_PATH).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"ok");
    }
}
