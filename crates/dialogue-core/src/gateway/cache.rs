use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lru::LruCache;
use tokio::sync::Mutex;
use tracing::debug;

use crate::runner::InteractionRunner;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RunnerKey {
    run_name: String,
    output_path: PathBuf,
}

/// Process-wide LRU of fully constructed runners keyed by `(run_name, output_path)`.
pub struct RunnerCache {
    runners: Mutex<LruCache<RunnerKey, Arc<dyn InteractionRunner>>>,
}

impl RunnerCache {
    /// Returns `None` for a zero capacity, which disables caching.
    pub fn new(capacity: usize) -> Option<Self> {
        let capacity = NonZeroUsize::new(capacity)?;
        Some(Self {
            runners: Mutex::new(LruCache::new(capacity)),
        })
    }

    pub async fn get(&self, run_name: &str, output_path: &Path) -> Option<Arc<dyn InteractionRunner>> {
        let key = RunnerKey {
            run_name: run_name.to_string(),
            output_path: output_path.to_path_buf(),
        };
        self.runners.lock().await.get(&key).cloned()
    }

    /// Insert `runner` unless another caller got there first; returns whichever is cached.
    pub async fn insert(
        &self,
        run_name: &str,
        output_path: &Path,
        runner: Arc<dyn InteractionRunner>,
    ) -> Arc<dyn InteractionRunner> {
        let key = RunnerKey {
            run_name: run_name.to_string(),
            output_path: output_path.to_path_buf(),
        };
        let mut runners = self.runners.lock().await;
        if let Some(existing) = runners.get(&key) {
            return existing.clone();
        }
        if let Some((evicted, _)) = runners.push(key, runner.clone()) {
            debug!(run = %evicted.run_name, "Evicted cached runner");
        }
        runner
    }

    pub async fn len(&self) -> usize {
        self.runners.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
