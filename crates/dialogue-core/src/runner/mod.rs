pub mod adapter;
pub mod executor;
pub mod interactive;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::api::RequestResult;
use crate::error::Result;
use crate::run_spec::RunSpec;
use crate::trace::{InteractionTrace, UserInput};

pub use adapter::DialogueAdapter;
pub use executor::Executor;
pub use interactive::{InteractiveRunner, InteractiveRunnerFactory, TraceLocks};

/// Owns trace lifecycle, model invocation and survey recording for one run.
#[async_trait]
pub trait InteractionRunner: Send + Sync {
    /// The run configuration this runner was built for.
    fn run_spec(&self) -> &RunSpec;

    /// Initialise the trace for `user_id`, or return it unchanged if already initialised.
    async fn initialize_interaction_trace(
        &self,
        user_id: &str,
        interaction_trace_id: &str,
    ) -> Result<InteractionTrace>;

    /// Submit the user's turn and return the model's answer to it.
    async fn handle_user_input(
        &self,
        interaction_trace_id: &str,
        user_input: UserInput,
    ) -> Result<RequestResult>;

    async fn handle_survey(
        &self,
        user_id: &str,
        interaction_trace_id: &str,
        survey: Map<String, Value>,
    ) -> Result<()>;
}

/// Builds runners bound to a resolved run specification.
///
/// `run_name` is the directory the spec was loaded from; trace storage is
/// keyed by it rather than by `run_spec.name`.
pub trait RunnerFactory: Send + Sync {
    fn create(
        &self,
        output_path: &Path,
        run_name: &str,
        run_spec: RunSpec,
    ) -> Result<Arc<dyn InteractionRunner>>;
}
