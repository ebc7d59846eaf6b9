use std::net::SocketAddr;
use std::sync::Arc;

use dialogue_core::{GatewayConfig, SessionGateway};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::error::ServerError;
use crate::http::{AppState, router};

type Result<T> = std::result::Result<T, ServerError>;

#[derive(Debug, Clone)]
pub struct ServiceHostConfig {
    pub bind_addr: SocketAddr,
}

impl ServiceHostConfig {
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self { bind_addr }
    }

    pub fn from_gateway_config(config: &GatewayConfig) -> Result<Self> {
        let addr = format!("{}:{}", config.server.bind, config.server.port);
        let bind_addr = addr.parse().map_err(|e| ServerError::InvalidHostState {
            reason: format!("Invalid bind address {addr}: {e}"),
        })?;
        Ok(Self { bind_addr })
    }
}

pub struct ServiceHost {
    gateway: Arc<SessionGateway>,
    server_handle: Option<JoinHandle<Result<()>>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    local_addr: Option<SocketAddr>,
    config: ServiceHostConfig,
}

impl ServiceHost {
    pub fn new(config: ServiceHostConfig, gateway: Arc<SessionGateway>) -> Self {
        Self {
            gateway,
            server_handle: None,
            shutdown_tx: None,
            local_addr: None,
            config,
        }
    }

    pub async fn start(&mut self) -> Result<()> {
        if self.server_handle.is_some() {
            return Err(ServerError::InvalidHostState {
                reason: "Server is already running".to_string(),
            });
        }

        let addr = self.config.bind_addr;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = listener.local_addr()?;

        let app = router(AppState::new(self.gateway.clone()));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let server_handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                    info!("HTTP server shutdown signal received");
                })
                .await
                .map_err(ServerError::Serve)
        });

        self.server_handle = Some(server_handle);
        self.shutdown_tx = Some(shutdown_tx);
        self.local_addr = Some(local_addr);

        info!("HTTP server listening on {}", local_addr);
        Ok(())
    }

    /// Address the server is bound to once started; resolves port 0.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn gateway(&self) -> &Arc<SessionGateway> {
        &self.gateway
    }

    pub async fn shutdown(mut self) -> Result<()> {
        info!("Initiating ServiceHost shutdown");

        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }

        if let Some(server_handle) = self.server_handle.take() {
            match server_handle.await {
                Ok(Ok(())) => info!("HTTP server shut down successfully"),
                Ok(Err(e)) => error!("HTTP server error during shutdown: {}", e),
                Err(e) => error!("Failed to join server task: {}", e),
            }
        }

        info!("ServiceHost shutdown complete");
        Ok(())
    }

    pub async fn wait(&mut self) -> Result<()> {
        if let Some(server_handle) = &mut self.server_handle {
            match server_handle.await {
                Ok(result) => result,
                Err(e) => Err(ServerError::InvalidHostState {
                    reason: format!("Server task panicked: {e}"),
                }),
            }
        } else {
            Err(ServerError::InvalidHostState {
                reason: "Server is not running".to_string(),
            })
        }
    }
}
