//! gelf-relay entry point.
//!
//! Loads the two configuration documents (a flat *transports* document
//! and a nested *filters* document), builds the `Server` from them, and
//! drives it until a shutdown signal arrives.

use anyhow::{Context, Result};
use gelf_config::TransportsConfig;
use gelf_router::Server;
use std::path::PathBuf;
use tokio::signal;
use tracing::info;

const FILTERS_CONFIG_ENV: &str = "GELF_RELAY_FILTERS";
const FILTERS_CONFIG_PATHS: &[&str] = &["filters.toml", "rules.toml", "./config/filters.toml", "/etc/gelf-relay/filters.toml"];

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    gelf_common::logging::init_logging("gelf-relay");

    info!("starting gelf-relay");

    let transports = TransportsConfig::load().context("failed to load transports configuration")?;
    let filters_doc = load_filters_document().context("failed to load filters configuration")?;

    log_startup_summary(&transports);

    let server = Server::build(&transports, &filters_doc).context("failed to build server from configuration")?;

    info!("gelf-relay started, press Ctrl+C to shut down");
    shutdown_signal().await;
    info!("shutdown signal received, draining in-flight work");

    server.shutdown().await;
    info!("gelf-relay shutdown complete");
    Ok(())
}

/// Find and parse the filters/destinations/rules document. An absent file
/// is not an error — it simply means no rules are compiled, matching the
/// behavior of `gelf_router::rules::build` on an empty `toml::Value`.
fn load_filters_document() -> Result<toml::Value> {
    let path = find_filters_config_file();
    let Some(path) = path else {
        info!("no filters configuration file found, starting with zero compiled rules");
        return Ok(toml::Value::Table(toml::map::Map::new()));
    };

    info!(?path, "loading filters configuration from file");
    let content = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

fn find_filters_config_file() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(FILTERS_CONFIG_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }
    for candidate in FILTERS_CONFIG_PATHS {
        let path = PathBuf::from(candidate);
        if path.exists() {
            return Some(path);
        }
    }
    None
}

fn log_startup_summary(transports: &TransportsConfig) {
    info!("=== gelf-relay startup summary ===");
    info!(udp = transports.gelf.udp, tcp = transports.gelf.tcp, http = transports.gelf.http, "listener ports (0 = disabled)");
    info!(configured = !transports.twilio.sid.is_empty(), "sms sender (twilio)");
    info!(hostport = %transports.smtp.hostport, "smtp sender");
    info!(xmlrpc_path = %transports.mantis.xmlrpc, "issue tracker sender (mantis)");
    info!(configured = !transports.elasticsearch.url.is_empty(), "indexer store forwarder");
    info!("===================================");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {
            info!("received SIGTERM");
        },
    }
}
