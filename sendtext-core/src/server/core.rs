//! Main server integration for sendtext

use crate::dispatch::Dispatcher;
use crate::models::Configuration;
use crate::services::logging::log_error;
use crate::storage::{resolve_database, DatabaseEnv, DatabaseLayout};
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;

/// HTTP front-end owning one dispatcher and its identity cache
pub struct SendTextServer {
    host: String,
    port: u16,
    dispatcher: Arc<Dispatcher>,
    database: DatabaseLayout,
}

impl SendTextServer {
    /// Resolve the database layout and wire a production dispatcher.
    pub fn from_config(config: Configuration) -> Result<Self> {
        let database = resolve_database(&config.data_path, &DatabaseEnv::from_env())
            .map_err(|err| {
                log_error(&err.to_string(), Some("database"));
                err
            })
            .context("Failed to resolve database target")?;
        let host = config.server_host.clone();
        let port = config.server_port;
        let dispatcher =
            Arc::new(Dispatcher::from_config(config).context("Failed to create HTTP client")?);
        Ok(Self::new(host, port, dispatcher, database))
    }

    pub fn new(host: String, port: u16, dispatcher: Arc<Dispatcher>, database: DatabaseLayout) -> Self {
        Self {
            host,
            port,
            dispatcher,
            database,
        }
    }

    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        Arc::clone(&self.dispatcher)
    }

    pub fn database(&self) -> &DatabaseLayout {
        &self.database
    }

    /// Start the server and serve until the process is stopped
    pub async fn start(self) -> Result<()> {
        let address: SocketAddr = format!("{}:{}", self.host, self.port)
            .parse()
            .context("Invalid server address")?;

        let routes = crate::server::api::create_api_routes(
            Arc::clone(&self.dispatcher),
            self.database.target.engine_name(),
        );
        let (bound, server) = warp::serve(routes)
            .try_bind_ephemeral(address)
            .map_err(|err| {
                log_error(&err.to_string(), Some("bind"));
                err
            })
            .with_context(|| format!("Failed to bind to {}", address))?;

        let config = self.dispatcher.config();
        tracing::info!(
            address = %bound,
            storage = self.database.target.engine_name(),
            slack = !config.slack.token.is_empty(),
            telegram = !config.telegram.token.is_empty(),
            email = !config.email.relay_url.is_empty(),
            "sendtext server listening"
        );
        server.await;
        Ok(())
    }
}
