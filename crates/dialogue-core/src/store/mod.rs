pub mod paths;

use std::path::Path;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Error, Result};
use crate::run_spec::RunSpec;

pub use paths::{RunPaths, validate_path_component};

/// Read-only source of run specifications keyed by `(output_path, run_name)`.
#[async_trait]
pub trait RunConfigStore: Send + Sync {
    async fn load(&self, output_path: &Path, run_name: &str) -> Result<RunSpec>;
}

/// Reads `run_spec.json` from a run's output directory.
#[derive(Debug, Default, Clone)]
pub struct FileRunConfigStore;

impl FileRunConfigStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RunConfigStore for FileRunConfigStore {
    async fn load(&self, output_path: &Path, run_name: &str) -> Result<RunSpec> {
        validate_path_component("run_name", run_name)?;
        let path = RunPaths::run_spec(output_path, run_name);
        debug!(path = %path.display(), "Loading run spec");

        let not_found = |reason: String| Error::ConfigNotFound {
            run_name: run_name.to_string(),
            path: path.clone(),
            reason,
        };

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| not_found(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| not_found(format!("malformed run spec: {e}")))
    }
}

/// Writes a run spec where `FileRunConfigStore` will find it.
pub async fn write_run_spec(output_path: &Path, run_spec: &RunSpec) -> Result<()> {
    validate_path_component("run_name", &run_spec.name)?;
    let dir = RunPaths::run_dir(output_path, &run_spec.name);
    tokio::fs::create_dir_all(&dir).await?;
    let content = serde_json::to_string_pretty(run_spec)?;
    tokio::fs::write(RunPaths::run_spec(output_path, &run_spec.name), content).await?;
    Ok(())
}
