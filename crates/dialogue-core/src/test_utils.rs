//! Test utilities for dialogue-core
//!
//! Fixtures shared by unit tests here and by the integration tests of the
//! server and CLI crates.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::api::{ApiError, ModelClient, Request, RequestResult, Sequence};
use crate::error::Result;
use crate::run_spec::{AdapterSpec, DEFAULT_BOT_NAME, DEFAULT_USER_NAME, RunSpec};
use crate::store::write_run_spec;
use crate::trace::{FileTraceStore, Instance, InteractionTrace, TraceStore};

/// Model client that answers from a fixed script and records every request.
pub struct ScriptedModelClient {
    replies: Mutex<VecDeque<String>>,
    fail: bool,
    delay: Duration,
    requests: Mutex<Vec<Request>>,
}

impl ScriptedModelClient {
    /// Answers each request with the next reply; errors once the script runs out.
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            fail: false,
            delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Fails every request with a 503.
    pub fn failing() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            fail: true,
            delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Waits `delay` before answering each request.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<Request> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    fn unavailable(details: &str) -> ApiError {
        ApiError::ServerError {
            provider: "scripted".to_string(),
            status_code: 503,
            details: details.to_string(),
        }
    }
}

#[async_trait]
impl ModelClient for ScriptedModelClient {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn make_request(&self, request: &Request) -> std::result::Result<RequestResult, ApiError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(Self::unavailable("scripted failure"));
        }

        let reply = self
            .replies
            .lock()
            .ok()
            .and_then(|mut replies| replies.pop_front())
            .ok_or_else(|| Self::unavailable("script exhausted"))?;

        Ok(RequestResult {
            completions: vec![Sequence {
                text: reply,
                logprob: -0.5,
            }],
            ..RequestResult::empty()
        })
    }
}

pub fn test_request(prompt: &str) -> Request {
    Request {
        model: "test/dialogue-model".to_string(),
        prompt: prompt.to_string(),
        temperature: 0.0,
        num_completions: 1,
        max_tokens: 100,
        stop_sequences: vec![DEFAULT_USER_NAME.to_string()],
    }
}

/// Adapter spec with no instructions or prefix, speaking as Jen and Bob.
pub fn test_adapter_spec() -> AdapterSpec {
    AdapterSpec {
        model: "test/dialogue-model".to_string(),
        instructions: String::new(),
        input_prefix: String::new(),
        user_name: DEFAULT_USER_NAME.to_string(),
        bot_name: DEFAULT_BOT_NAME.to_string(),
        temperature: 0.0,
        max_tokens: 100,
        num_outputs: 1,
        stop_sequences: vec![DEFAULT_USER_NAME.to_string()],
        model_initiates: false,
    }
}

pub fn test_run_spec(name: &str) -> RunSpec {
    RunSpec {
        name: name.to_string(),
        adapter_spec: test_adapter_spec(),
        scenario_spec: None,
        metric_specs: Vec::new(),
        groups: vec!["empathetic_dialogues".to_string()],
    }
}

/// Store an uninitialised trace whose prompt is `input`.
pub async fn seed_trace(
    store: &dyn TraceStore,
    trace_id: &str,
    input: &str,
) -> Result<InteractionTrace> {
    let trace = InteractionTrace::with_id(
        trace_id,
        Instance {
            id: None,
            input: input.to_string(),
        },
    );
    store.create(&trace).await?;
    Ok(trace)
}

/// Write `run_spec` under `output_path` and seed one trace for it on disk.
pub async fn seed_run(
    output_path: &Path,
    run_spec: &RunSpec,
    trace_id: &str,
    input: &str,
) -> Result<InteractionTrace> {
    write_run_spec(output_path, run_spec).await?;
    seed_trace(
        &FileTraceStore::for_run(output_path, &run_spec.name),
        trace_id,
        input,
    )
    .await
}
