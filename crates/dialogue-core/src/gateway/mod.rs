//! Stateless facade that resolves a run's runner and forwards dialogue operations to it.

mod cache;
pub mod types;

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::config::GatewayConfig;
use crate::error::{Error, Result};
use crate::runner::{InteractionRunner, InteractiveRunnerFactory, RunnerFactory};
use crate::store::{FileRunConfigStore, RunConfigStore, validate_path_component};
use crate::trace::UserInput;

pub use cache::RunnerCache;
pub use types::{
    ConversationalTurnRequest, ConversationalTurnResponse, StartConversationRequest,
    StartConversationResponse, SubmitSurveyRequest, SubmitSurveyResponse,
};

pub struct SessionGateway {
    configs: Arc<dyn RunConfigStore>,
    runners: Arc<dyn RunnerFactory>,
    cache: Option<RunnerCache>,
}

impl SessionGateway {
    /// Gateway that resolves a fresh runner on every call.
    pub fn new(configs: Arc<dyn RunConfigStore>, runners: Arc<dyn RunnerFactory>) -> Self {
        Self {
            configs,
            runners,
            cache: None,
        }
    }

    /// File-backed gateway talking to the configured model proxy.
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        let factory = InteractiveRunnerFactory::remote(
            &config.remote.url,
            config.remote.authentication(),
            config.remote.timeout(),
        )?;
        Ok(Self::new(Arc::new(FileRunConfigStore::new()), Arc::new(factory))
            .with_runner_cache(config.gateway.runner_cache_capacity))
    }

    /// Keep up to `capacity` resolved runners. Zero disables caching.
    pub fn with_runner_cache(mut self, capacity: usize) -> Self {
        self.cache = RunnerCache::new(capacity);
        self
    }

    pub fn runner_cache(&self) -> Option<&RunnerCache> {
        self.cache.as_ref()
    }

    /// Load the run's configuration and build a runner bound to it.
    pub async fn resolve_runner(
        &self,
        run_name: &str,
        output_path: &Path,
    ) -> Result<Arc<dyn InteractionRunner>> {
        validate_path_component("run_name", run_name)?;

        if let Some(cache) = &self.cache
            && let Some(runner) = cache.get(run_name, output_path).await
        {
            debug!(run = %run_name, "Using cached runner");
            return Ok(runner);
        }

        let run_spec = self.configs.load(output_path, run_name).await?;
        let runner = self.runners.create(output_path, run_name, run_spec)?;
        debug!(run = %run_name, output_path = %output_path.display(), "Resolved runner");

        match &self.cache {
            Some(cache) => Ok(cache.insert(run_name, output_path, runner).await),
            None => Ok(runner),
        }
    }

    pub async fn start_conversation(
        &self,
        request: StartConversationRequest,
    ) -> Result<StartConversationResponse> {
        validate_path_component("interaction_trace_id", &request.interaction_trace_id)?;
        let runner = self
            .resolve_runner(&request.run_name, &request.output_path)
            .await?;

        let trace = runner
            .initialize_interaction_trace(&request.user_id, &request.interaction_trace_id)
            .await?;

        info!(
            trace_id = %request.interaction_trace_id,
            run = %request.run_name,
            "Conversation started"
        );
        Ok(StartConversationResponse {
            bot_utterance: trace.last_bot_utterance(),
            prompt: trace.instance.input,
        })
    }

    pub async fn advance_turn(
        &self,
        request: ConversationalTurnRequest,
    ) -> Result<ConversationalTurnResponse> {
        validate_path_component("interaction_trace_id", &request.interaction_trace_id)?;
        let session_uuid = non_empty_or_new(request.session_uuid);
        let user_uuid = non_empty_or_new(request.user_uuid);
        let payload = request.payload.unwrap_or_default();

        let runner = self
            .resolve_runner(&request.run_name, &request.output_path)
            .await?;
        let result = runner
            .handle_user_input(
                &request.interaction_trace_id,
                UserInput {
                    input: request.user_utterance.unwrap_or_default(),
                },
            )
            .await?;

        let bot_utterance = result
            .first_text()
            .ok_or_else(|| Error::model_unavailable("model returned no usable completion"))?
            .to_string();

        debug!(
            trace_id = %request.interaction_trace_id,
            session_uuid = %session_uuid,
            "Turn completed"
        );
        Ok(ConversationalTurnResponse {
            session_uuid,
            user_uuid,
            bot_utterance,
            payload,
        })
    }

    pub async fn submit_survey(&self, request: SubmitSurveyRequest) -> Result<SubmitSurveyResponse> {
        validate_path_component("interaction_trace_id", &request.interaction_trace_id)?;
        let runner = self
            .resolve_runner(&request.run_name, &request.output_path)
            .await?;

        runner
            .handle_survey(
                &request.user_id,
                &request.interaction_trace_id,
                request.questions,
            )
            .await?;

        info!(
            trace_id = %request.interaction_trace_id,
            user_id = %request.user_id,
            "Survey submitted"
        );
        Ok(SubmitSurveyResponse { success: true })
    }
}

fn non_empty_or_new(value: Option<String>) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}
