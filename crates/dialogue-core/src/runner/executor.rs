use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::api::{ModelClient, RequestResult};
use crate::error::{Error, Result};
use crate::run_spec::ExecutionSpec;
use crate::trace::RequestState;

/// Executes request states against a model client within an `ExecutionSpec`.
#[derive(Clone)]
pub struct Executor {
    client: Arc<dyn ModelClient>,
    spec: ExecutionSpec,
    permits: Arc<Semaphore>,
}

impl Executor {
    pub fn new(client: Arc<dyn ModelClient>, spec: ExecutionSpec) -> Self {
        let permits = Arc::new(Semaphore::new(spec.parallelism.max(1)));
        Self {
            client,
            spec,
            permits,
        }
    }

    pub fn spec(&self) -> &ExecutionSpec {
        &self.spec
    }

    /// Fill in the result of `state`. Dry runs never contact the model.
    pub async fn process(&self, mut state: RequestState) -> Result<RequestState> {
        if self.spec.dry_run {
            debug!(model = %state.request.model, "Dry run, skipping model request");
            state.result = Some(RequestResult::empty());
            return Ok(state);
        }

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| Error::model_unavailable("executor is shut down"))?;

        let result = self
            .client
            .make_request(&state.request)
            .await
            .map_err(|e| {
                warn!(provider = self.client.name(), error = %e, "Model request failed");
                Error::ModelUnavailable {
                    reason: format!("{} request failed", self.client.name()),
                    source: Some(e),
                }
            })?;

        state.result = Some(result);
        Ok(state)
    }
}
