use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use super::{DialogueAdapter, Executor, InteractionRunner, RunnerFactory};
use crate::api::{Authentication, ModelClient, RemoteServiceClient, RequestResult};
use crate::error::{Error, Result};
use crate::run_spec::{ExecutionSpec, RunSpec};
use crate::trace::{
    FileTraceStore, InteractionRound, InteractionTrace, TraceStatus, TraceStore, UserInput,
};

const TRACE_LOCK_STRIPES: usize = 16;

/// Hashed lock stripes that serialise operations on the same trace id.
///
/// Clones share the stripes, so runners handed the same `TraceLocks`
/// contend on the same trace even when each request builds a fresh runner.
#[derive(Clone)]
pub struct TraceLocks {
    stripes: Arc<[Mutex<()>]>,
}

impl TraceLocks {
    pub fn new() -> Self {
        Self {
            stripes: (0..TRACE_LOCK_STRIPES).map(|_| Mutex::new(())).collect(),
        }
    }

    async fn lock(&self, trace_id: &str) -> MutexGuard<'_, ()> {
        let mut hasher = DefaultHasher::new();
        trace_id.hash(&mut hasher);
        let stripe = (hasher.finish() as usize) % self.stripes.len();
        self.stripes[stripe].lock().await
    }
}

impl Default for TraceLocks {
    fn default() -> Self {
        Self::new()
    }
}

/// Runner for human-in-the-loop dialogue evaluation of a single run.
pub struct InteractiveRunner {
    run_spec: RunSpec,
    adapter: DialogueAdapter,
    executor: Executor,
    traces: Arc<dyn TraceStore>,
    trace_locks: TraceLocks,
}

impl InteractiveRunner {
    /// Runner whose traces live under `output_path/runs/{run_name}`.
    pub fn new(
        execution_spec: ExecutionSpec,
        client: Arc<dyn ModelClient>,
        output_path: &Path,
        run_name: &str,
        run_spec: RunSpec,
    ) -> Result<Self> {
        crate::store::validate_path_component("run_name", run_name)?;
        if run_spec.name != run_name {
            debug!(
                run = %run_name,
                spec_name = %run_spec.name,
                "Run spec name differs from its run directory"
            );
        }
        let traces = Arc::new(FileTraceStore::for_run(output_path, run_name));
        Ok(Self::with_trace_store(
            Executor::new(client, execution_spec),
            run_spec,
            traces,
        ))
    }

    pub fn with_trace_store(
        executor: Executor,
        run_spec: RunSpec,
        traces: Arc<dyn TraceStore>,
    ) -> Self {
        let adapter = DialogueAdapter::new(run_spec.adapter_spec.clone());
        Self {
            run_spec,
            adapter,
            executor,
            traces,
            trace_locks: TraceLocks::new(),
        }
    }

    /// Share `locks` with other runners serving the same traces.
    #[must_use]
    pub fn with_trace_locks(mut self, locks: TraceLocks) -> Self {
        self.trace_locks = locks;
        self
    }

    async fn open_trace(&self, trace: &mut InteractionTrace, user_id: &str) -> Result<()> {
        trace.user_id = Some(user_id.to_string());
        let opening = self.adapter.opening_request(trace);

        let request_state = if self.adapter.spec().model_initiates {
            let state = self.executor.process(opening).await?;
            if state
                .result
                .as_ref()
                .and_then(RequestResult::first_text)
                .is_none()
            {
                return Err(Error::model_unavailable(
                    "model returned no usable opening completion",
                ));
            }
            state
        } else {
            opening
        };

        trace.push_round(InteractionRound {
            user_input: None,
            request_state,
        });
        self.traces.save(trace).await
    }
}

#[async_trait]
impl InteractionRunner for InteractiveRunner {
    fn run_spec(&self) -> &RunSpec {
        &self.run_spec
    }

    async fn initialize_interaction_trace(
        &self,
        user_id: &str,
        interaction_trace_id: &str,
    ) -> Result<InteractionTrace> {
        let _guard = self.trace_locks.lock(interaction_trace_id).await;
        let mut trace = self.traces.load(interaction_trace_id).await?;

        if trace.status() == TraceStatus::Uninitialized {
            self.open_trace(&mut trace, user_id).await?;
            info!(
                trace_id = %interaction_trace_id,
                user_id = %user_id,
                run = %self.run_spec.name,
                "Initialised interaction trace"
            );
        } else if trace.user_id.as_deref() != Some(user_id) {
            warn!(
                trace_id = %interaction_trace_id,
                owner = ?trace.user_id,
                user_id = %user_id,
                "Interaction trace resumed by a different user"
            );
        }

        Ok(trace)
    }

    async fn handle_user_input(
        &self,
        interaction_trace_id: &str,
        user_input: UserInput,
    ) -> Result<RequestResult> {
        let _guard = self.trace_locks.lock(interaction_trace_id).await;
        let mut trace = self.traces.load(interaction_trace_id).await?;

        match trace.status() {
            TraceStatus::AwaitingUserTurn => {}
            TraceStatus::SurveySubmitted => {
                return Err(Error::TraceCompleted {
                    trace_id: trace.id,
                });
            }
            TraceStatus::Uninitialized => {
                return Err(Error::InvalidTraceState {
                    trace_id: trace.id,
                    reason: "conversation has not been started".to_string(),
                });
            }
            TraceStatus::AwaitingModelResponse => {
                return Err(Error::InvalidTraceState {
                    trace_id: trace.id,
                    reason: "previous turn is still awaiting a model response".to_string(),
                });
            }
        }

        let state = self
            .executor
            .process(self.adapter.turn_request(&trace, &user_input))
            .await?;
        let result = match &state.result {
            Some(result) if result.first_text().is_some() => result.clone(),
            _ => {
                return Err(Error::model_unavailable(
                    "model returned no usable completion",
                ));
            }
        };

        trace.push_round(InteractionRound {
            user_input: Some(user_input),
            request_state: state,
        });
        self.traces.save(&trace).await?;

        info!(
            trace_id = %interaction_trace_id,
            rounds = trace.rounds.len(),
            "Recorded conversational turn"
        );
        Ok(result)
    }

    async fn handle_survey(
        &self,
        user_id: &str,
        interaction_trace_id: &str,
        survey: Map<String, Value>,
    ) -> Result<()> {
        let _guard = self.trace_locks.lock(interaction_trace_id).await;
        let recording_failed = |e: Error| match e {
            Error::TraceNotFound { .. } | Error::InvalidRequest(_) => e,
            other => Error::SurveyRecordingFailed {
                trace_id: interaction_trace_id.to_string(),
                reason: other.to_string(),
            },
        };
        let mut trace = self
            .traces
            .load(interaction_trace_id)
            .await
            .map_err(recording_failed)?;

        trace.record_survey(user_id, survey);
        self.traces.save(&trace).await.map_err(recording_failed)?;

        info!(
            trace_id = %interaction_trace_id,
            user_id = %user_id,
            surveys = trace.surveys.len(),
            "Recorded survey"
        );
        Ok(())
    }
}

/// Builds `InteractiveRunner`s that share one model client and one set of
/// trace locks.
#[derive(Clone)]
pub struct InteractiveRunnerFactory {
    execution_spec: ExecutionSpec,
    client: Arc<dyn ModelClient>,
    trace_locks: TraceLocks,
}

impl InteractiveRunnerFactory {
    pub fn new(execution_spec: ExecutionSpec, client: Arc<dyn ModelClient>) -> Self {
        Self {
            execution_spec,
            client,
            trace_locks: TraceLocks::new(),
        }
    }

    /// Factory talking to the model proxy at `url` with the interactive execution context.
    pub fn remote(url: &str, auth: Authentication, timeout: Duration) -> Result<Self> {
        let client = RemoteServiceClient::with_timeout(url, auth.clone(), timeout)?;
        Ok(Self::new(
            ExecutionSpec::interactive(url, auth),
            Arc::new(client),
        ))
    }

    pub fn execution_spec(&self) -> &ExecutionSpec {
        &self.execution_spec
    }
}

impl RunnerFactory for InteractiveRunnerFactory {
    fn create(
        &self,
        output_path: &Path,
        run_name: &str,
        run_spec: RunSpec,
    ) -> Result<Arc<dyn InteractionRunner>> {
        let runner = InteractiveRunner::new(
            self.execution_spec.clone(),
            self.client.clone(),
            output_path,
            run_name,
            run_spec,
        )?
        .with_trace_locks(self.trace_locks.clone());
        Ok(Arc::new(runner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run_spec::AdapterSpec;
    use crate::test_utils::{ScriptedModelClient, seed_trace, test_adapter_spec, test_run_spec};
    use crate::trace::InMemoryTraceStore;

    struct Fixture {
        runner: InteractiveRunner,
        client: Arc<ScriptedModelClient>,
        traces: Arc<InMemoryTraceStore>,
    }

    fn fixture(client: ScriptedModelClient, adapter_spec: AdapterSpec) -> Fixture {
        let client = Arc::new(client);
        let traces = Arc::new(InMemoryTraceStore::new());
        let run_spec = RunSpec {
            adapter_spec,
            ..test_run_spec("dialogue")
        };
        let runner = InteractiveRunner::with_trace_store(
            Executor::new(
                client.clone(),
                ExecutionSpec::interactive("http://proxy", Authentication::default()),
            ),
            run_spec,
            traces.clone(),
        );
        Fixture {
            runner,
            client,
            traces,
        }
    }

    #[tokio::test]
    async fn initialize_without_model_opening_leaves_bot_silent() {
        let f = fixture(ScriptedModelClient::with_replies(["unused"]), test_adapter_spec());
        seed_trace(f.traces.as_ref(), "t1", "My dog ran away.")
            .await
            .unwrap();

        let trace = f
            .runner
            .initialize_interaction_trace("user-1", "t1")
            .await
            .unwrap();

        assert_eq!(trace.status(), TraceStatus::AwaitingUserTurn);
        assert_eq!(trace.user_id.as_deref(), Some("user-1"));
        assert_eq!(trace.last_bot_utterance(), None);
        assert!(f.client.requests().is_empty());
    }

    #[tokio::test]
    async fn initialize_with_model_opening_records_reply() {
        let spec = AdapterSpec {
            model_initiates: true,
            ..test_adapter_spec()
        };
        let f = fixture(ScriptedModelClient::with_replies([" Oh no! "]), spec);
        seed_trace(f.traces.as_ref(), "t1", "My dog ran away.")
            .await
            .unwrap();

        let trace = f
            .runner
            .initialize_interaction_trace("user-1", "t1")
            .await
            .unwrap();

        assert_eq!(trace.last_bot_utterance().as_deref(), Some("Oh no!"));
        assert_eq!(f.traces.load("t1").await.unwrap(), trace);
    }

    #[tokio::test]
    async fn initialize_is_idempotent() {
        let spec = AdapterSpec {
            model_initiates: true,
            ..test_adapter_spec()
        };
        let f = fixture(ScriptedModelClient::with_replies(["first"]), spec);
        seed_trace(f.traces.as_ref(), "t1", "prompt").await.unwrap();

        let first = f.runner.initialize_interaction_trace("u", "t1").await.unwrap();
        let second = f.runner.initialize_interaction_trace("u", "t1").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(f.client.requests().len(), 1);
    }

    #[tokio::test]
    async fn unknown_trace_is_not_created() {
        let f = fixture(ScriptedModelClient::with_replies(["x"]), test_adapter_spec());

        let err = f
            .runner
            .initialize_interaction_trace("u", "nope")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TraceNotFound { .. }));

        let err = f
            .runner
            .handle_user_input(
                "nope",
                UserInput {
                    input: "hi".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TraceNotFound { .. }));
        assert!(f.traces.is_empty());
    }

    #[tokio::test]
    async fn user_turn_appends_answered_round() {
        let f = fixture(
            ScriptedModelClient::with_replies([" Where did he go?"]),
            test_adapter_spec(),
        );
        seed_trace(f.traces.as_ref(), "t1", "My dog ran away.")
            .await
            .unwrap();
        f.runner.initialize_interaction_trace("u", "t1").await.unwrap();

        let result = f
            .runner
            .handle_user_input(
                "t1",
                UserInput {
                    input: "I miss him.".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(result.completions[0].text, " Where did he go?");
        let stored = f.traces.load("t1").await.unwrap();
        assert_eq!(stored.rounds.len(), 2);
        assert_eq!(
            stored.rounds[1].user_input.as_ref().map(|u| u.input.as_str()),
            Some("I miss him.")
        );
        assert!(f.client.requests()[0].prompt.ends_with("Jen: I miss him.\nBob:"));
    }

    #[tokio::test]
    async fn failed_turn_leaves_trace_unchanged() {
        let f = fixture(ScriptedModelClient::failing(), test_adapter_spec());
        seed_trace(f.traces.as_ref(), "t1", "prompt").await.unwrap();
        let before = f.runner.initialize_interaction_trace("u", "t1").await.unwrap();

        let err = f
            .runner
            .handle_user_input(
                "t1",
                UserInput {
                    input: "hello".to_string(),
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ModelUnavailable { .. }));
        assert_eq!(f.traces.load("t1").await.unwrap(), before);
    }

    #[tokio::test]
    async fn empty_completion_is_model_unavailable() {
        let f = fixture(ScriptedModelClient::with_replies(["   "]), test_adapter_spec());
        seed_trace(f.traces.as_ref(), "t1", "prompt").await.unwrap();
        f.runner.initialize_interaction_trace("u", "t1").await.unwrap();

        let err = f
            .runner
            .handle_user_input(
                "t1",
                UserInput {
                    input: "hello".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ModelUnavailable { .. }));
    }

    #[tokio::test]
    async fn turn_before_start_is_invalid_state() {
        let f = fixture(ScriptedModelClient::with_replies(["x"]), test_adapter_spec());
        seed_trace(f.traces.as_ref(), "t1", "prompt").await.unwrap();

        let err = f
            .runner
            .handle_user_input(
                "t1",
                UserInput {
                    input: "hello".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTraceState { .. }));
    }

    #[tokio::test]
    async fn survey_completes_trace_and_blocks_further_turns() {
        let f = fixture(ScriptedModelClient::with_replies(["x"]), test_adapter_spec());
        seed_trace(f.traces.as_ref(), "t1", "prompt").await.unwrap();
        f.runner.initialize_interaction_trace("u", "t1").await.unwrap();

        let mut answers = Map::new();
        answers.insert("engaging".to_string(), Value::from("yes"));
        f.runner
            .handle_survey("u", "t1", answers.clone())
            .await
            .unwrap();

        let stored = f.traces.load("t1").await.unwrap();
        assert_eq!(stored.status(), TraceStatus::SurveySubmitted);
        assert_eq!(stored.surveys[0].data, answers);

        let err = f
            .runner
            .handle_user_input(
                "t1",
                UserInput {
                    input: "one more".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TraceCompleted { .. }));
    }

    #[tokio::test]
    async fn survey_on_unreadable_trace_is_recording_failure() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("t1.json"), "{ not a trace")
            .await
            .unwrap();
        let runner = InteractiveRunner::with_trace_store(
            Executor::new(
                Arc::new(ScriptedModelClient::with_replies(["x"])),
                ExecutionSpec::interactive("http://proxy", Authentication::default()),
            ),
            test_run_spec("dialogue"),
            Arc::new(FileTraceStore::new(dir.path())),
        );

        let err = runner.handle_survey("u", "t1", Map::new()).await.unwrap_err();

        assert!(matches!(
            err,
            Error::SurveyRecordingFailed { ref trace_id, .. } if trace_id == "t1"
        ));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn survey_on_missing_trace_stays_not_found() {
        let f = fixture(ScriptedModelClient::with_replies(["x"]), test_adapter_spec());

        let err = f.runner.handle_survey("u", "nope", Map::new()).await.unwrap_err();

        assert!(matches!(err, Error::TraceNotFound { .. }));
    }

    fn factory(client: ScriptedModelClient) -> InteractiveRunnerFactory {
        InteractiveRunnerFactory::new(
            ExecutionSpec::interactive("http://proxy", Authentication::default()),
            Arc::new(client),
        )
    }

    #[tokio::test]
    async fn factory_binds_runner_to_given_spec() {
        let dir = tempfile::tempdir().unwrap();
        let factory = factory(ScriptedModelClient::with_replies(["x"]));
        let spec = test_run_spec("bound");
        let runner = factory.create(dir.path(), "bound", spec.clone()).unwrap();
        assert_eq!(runner.run_spec(), &spec);
        assert_eq!(factory.execution_spec().parallelism, 1);
    }

    #[tokio::test]
    async fn factory_keys_traces_by_run_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTraceStore::for_run(dir.path(), "dialogue_run");
        seed_trace(&store, "t", "I passed my exam.").await.unwrap();

        let runner = factory(ScriptedModelClient::with_replies(["x"]))
            .create(dir.path(), "dialogue_run", test_run_spec("dialogue:model=test"))
            .unwrap();
        let trace = runner.initialize_interaction_trace("u", "t").await.unwrap();

        assert_eq!(trace.instance.input, "I passed my exam.");
        assert_eq!(store.load("t").await.unwrap(), trace);
    }

    #[tokio::test]
    async fn factory_rejects_unsafe_run_directory() {
        let dir = tempfile::tempdir().unwrap();
        let result = factory(ScriptedModelClient::with_replies(["x"])).create(
            dir.path(),
            "..",
            test_run_spec("dialogue"),
        );
        assert!(matches!(result, Err(Error::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn runners_from_one_factory_serialise_turns_on_a_trace() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTraceStore::for_run(dir.path(), "dialogue");
        seed_trace(&store, "t1", "prompt").await.unwrap();
        let factory = factory(
            ScriptedModelClient::with_replies([" first", " second"])
                .with_delay(Duration::from_millis(100)),
        );
        let a = factory
            .create(dir.path(), "dialogue", test_run_spec("dialogue"))
            .unwrap();
        let b = factory
            .create(dir.path(), "dialogue", test_run_spec("dialogue"))
            .unwrap();
        a.initialize_interaction_trace("u", "t1").await.unwrap();

        let (one, two) = tokio::join!(
            a.handle_user_input(
                "t1",
                UserInput {
                    input: "one".to_string(),
                },
            ),
            b.handle_user_input(
                "t1",
                UserInput {
                    input: "two".to_string(),
                },
            ),
        );
        one.unwrap();
        two.unwrap();

        let stored = store.load("t1").await.unwrap();
        assert_eq!(stored.rounds.len(), 3);
    }
}
