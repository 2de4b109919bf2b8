//! Daemon entrypoint: load config, open storage, serve the socket.

use std::sync::Arc;

use anyhow::Context;
use paddock_daemon::config::DaemonConfig;
use paddock_daemon::orchestrator::Orchestrator;
use paddock_daemon::protocol::ProtocolServer;
use paddock_daemon::storage::{
    self, SqliteLedgerStore, SqliteModeStore, SqliteResultsStore, SqliteRosterStore,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = DaemonConfig::from_env().context("invalid configuration")?;
    let guard = config
        .operator_guard()
        .context("invalid operator secret")?;

    let conn = storage::open(&config.db_path).context("failed to open storage")?;
    let orchestrator = Orchestrator::new(
        Arc::new(SqliteModeStore::new(Arc::clone(&conn))),
        Arc::new(SqliteLedgerStore::new(Arc::clone(&conn))),
        Arc::new(SqliteResultsStore::new(Arc::clone(&conn))),
        Arc::new(SqliteRosterStore::new(conn)),
        guard,
    );

    let server = ProtocolServer::bind(&config.socket_path, orchestrator)
        .context("failed to bind protocol socket")?;
    info!(
        socket = %config.socket_path.display(),
        db = %config.db_path,
        "paddock daemon listening"
    );

    tokio::select! {
        result = server.run() => result.context("server loop failed")?,
        _ = tokio::signal::ctrl_c() => info!("shutdown requested"),
    }
    Ok(())
}
