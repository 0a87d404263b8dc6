// ABOUTME: Entry point for the lanman-device binary.
// ABOUTME: Serves this machine's tools over MCP HTTP until Ctrl+C or SIGTERM.

use anyhow::Result;
use clap::Parser;
use lanman_device::Dispatcher;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "lanman-device")]
#[command(about = "MCP tool endpoint exposing this machine to lanman spaces")]
#[command(version)]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Name used in tool descriptions and the server name (defaults to the system hostname)
    #[arg(long, env = "DEVICE_HOSTNAME")]
    hostname: Option<String>,
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    lanman_log::init_for("lanman_device");

    let cli = Cli::parse();
    let hostname = cli.hostname.unwrap_or_else(lanman_device::local_hostname);
    let dispatcher = Dispatcher::new(hostname);

    lanman_device::serve(&cli.host, cli.port, dispatcher, shutdown_signal()).await
}
