use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::InteractionTrace;
use crate::error::{Error, Result};
use crate::store::{RunPaths, validate_path_component};

/// Persistence for interaction traces.
#[async_trait]
pub trait TraceStore: Send + Sync {
    /// Fails with `TraceNotFound` and never creates anything when the id is unknown.
    async fn load(&self, trace_id: &str) -> Result<InteractionTrace>;

    /// Overwrite an existing trace.
    async fn save(&self, trace: &InteractionTrace) -> Result<()>;

    /// Persist a new trace; fails with `TraceAlreadyExists` if the id is taken.
    async fn create(&self, trace: &InteractionTrace) -> Result<()>;
}

/// One JSON file per trace under a run's `interaction_traces` directory.
#[derive(Debug, Clone)]
pub struct FileTraceStore {
    dir: PathBuf,
}

impl FileTraceStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn for_run(output_path: &Path, run_name: &str) -> Self {
        Self::new(RunPaths::interaction_traces_dir(output_path, run_name))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn trace_path(&self, trace_id: &str) -> Result<PathBuf> {
        validate_path_component("interaction_trace_id", trace_id)?;
        Ok(self.dir.join(format!("{trace_id}.json")))
    }
}

#[async_trait]
impl TraceStore for FileTraceStore {
    async fn load(&self, trace_id: &str) -> Result<InteractionTrace> {
        let path = self.trace_path(trace_id)?;
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::trace_not_found(trace_id));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&content)?)
    }

    async fn save(&self, trace: &InteractionTrace) -> Result<()> {
        let path = self.trace_path(&trace.id)?;
        if !tokio::fs::try_exists(&path).await? {
            return Err(Error::trace_not_found(&trace.id));
        }

        let tmp_path = self
            .dir
            .join(format!(".{}.{}.json.tmp", trace.id, uuid::Uuid::new_v4().simple()));
        let content = serde_json::to_vec_pretty(trace)?;
        tokio::fs::write(&tmp_path, content).await?;
        tokio::fs::rename(&tmp_path, &path).await?;

        debug!(trace_id = %trace.id, rounds = trace.rounds.len(), "Saved interaction trace");
        Ok(())
    }

    async fn create(&self, trace: &InteractionTrace) -> Result<()> {
        let path = self.trace_path(&trace.id)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(Error::TraceAlreadyExists {
                    trace_id: trace.id.clone(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(&serde_json::to_vec_pretty(trace)?).await?;
        file.flush().await?;

        debug!(trace_id = %trace.id, path = %path.display(), "Created interaction trace");
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryTraceStore {
    traces: RwLock<HashMap<String, InteractionTrace>>,
}

impl InMemoryTraceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.traces.read().map_or(0, |traces| traces.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn lock_poisoned() -> Error {
    Error::Io(std::io::Error::other("in-memory trace store lock poisoned"))
}

#[async_trait]
impl TraceStore for InMemoryTraceStore {
    async fn load(&self, trace_id: &str) -> Result<InteractionTrace> {
        let traces = self.traces.read().map_err(|_| lock_poisoned())?;
        traces
            .get(trace_id)
            .cloned()
            .ok_or_else(|| Error::trace_not_found(trace_id))
    }

    async fn save(&self, trace: &InteractionTrace) -> Result<()> {
        let mut traces = self.traces.write().map_err(|_| lock_poisoned())?;
        let Some(slot) = traces.get_mut(&trace.id) else {
            return Err(Error::trace_not_found(&trace.id));
        };
        *slot = trace.clone();
        Ok(())
    }

    async fn create(&self, trace: &InteractionTrace) -> Result<()> {
        let mut traces = self.traces.write().map_err(|_| lock_poisoned())?;
        if traces.contains_key(&trace.id) {
            return Err(Error::TraceAlreadyExists {
                trace_id: trace.id.clone(),
            });
        }
        traces.insert(trace.id.clone(), trace.clone());
        Ok(())
    }
}
