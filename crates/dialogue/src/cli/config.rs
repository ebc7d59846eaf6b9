use std::path::Path;

use dialogue_core::GatewayConfig;
use eyre::{Result, WrapErr};
use tracing::debug;

/// Load `.env` from the working directory. A missing file is not an error.
pub fn load_env() -> Result<()> {
    match dotenvy::dotenv() {
        Ok(path) => {
            debug!(path = %path.display(), "Loaded environment file");
            Ok(())
        }
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(e).wrap_err("Failed to load .env file"),
    }
}

/// Resolve the gateway config from `--config` or the standard discovery paths.
pub fn load_config(path: Option<&Path>) -> Result<GatewayConfig> {
    GatewayConfig::load(path).wrap_err("Failed to load gateway config")
}
