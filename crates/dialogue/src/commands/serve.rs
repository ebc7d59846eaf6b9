use std::io::Write;
use std::sync::Arc;

use async_trait::async_trait;
use dialogue_core::{GatewayConfig, SessionGateway};
use dialogue_server::{ServiceHost, ServiceHostConfig};
use eyre::{Result, eyre};
use tracing::info;

use super::Command;

pub struct ServeCommand {
    pub config: GatewayConfig,
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub remote_url: Option<String>,
    pub cache_capacity: Option<usize>,
}

impl ServeCommand {
    /// The loaded config with command-line overrides applied.
    pub fn effective_config(&self) -> GatewayConfig {
        let mut config = self.config.clone();
        if let Some(bind) = &self.bind {
            config.server.bind.clone_from(bind);
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(url) = &self.remote_url {
            config.remote.url.clone_from(url);
        }
        if let Some(capacity) = self.cache_capacity {
            config.gateway.runner_cache_capacity = capacity;
        }
        config
    }
}

#[async_trait]
impl Command for ServeCommand {
    async fn execute(&self) -> Result<()> {
        let config = self.effective_config();
        let host_config = ServiceHostConfig::from_gateway_config(&config)
            .map_err(|e| eyre!("Invalid server config: {}", e))?;
        let gateway = SessionGateway::from_config(&config)
            .map_err(|e| eyre!("Failed to create gateway: {}", e))?;

        let mut host = ServiceHost::new(host_config, Arc::new(gateway));
        host.start()
            .await
            .map_err(|e| eyre!("Failed to start server: {}", e))?;

        let addr = host
            .local_addr()
            .ok_or_else(|| eyre!("Server started without a bound address"))?;
        info!(remote = %config.remote.url, "Dialogue server started on {}", addr);
        {
            let mut out = std::io::stdout().lock();
            writeln!(out, "Server listening on {addr}")?;
            writeln!(out, "Press Ctrl+C to shutdown")?;
        }

        tokio::signal::ctrl_c().await?;
        info!("Shutdown signal received");

        host.shutdown()
            .await
            .map_err(|e| eyre!("Failed to shutdown server: {}", e))?;
        info!("Server shutdown complete");

        Ok(())
    }
}
