//! Run specifications and the execution context runners are built with.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::Authentication;

pub const DEFAULT_USER_NAME: &str = "Jen";
pub const DEFAULT_BOT_NAME: &str = "Bob";

/// Immutable description of a benchmark run, as written by the run that produced it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSpec {
    pub name: String,
    pub adapter_spec: AdapterSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario_spec: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metric_specs: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
}

/// Model and sampling parameters used to build every request of a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdapterSpec {
    pub model: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub input_prefix: String,
    #[serde(default = "default_user_name")]
    pub user_name: String,
    #[serde(default = "default_bot_name")]
    pub bot_name: String,
    #[serde(default)]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_num_outputs")]
    pub num_outputs: u32,
    #[serde(default)]
    pub stop_sequences: Vec<String>,
    /// When set, the model speaks first as soon as a trace is initialised.
    #[serde(default)]
    pub model_initiates: bool,
}

fn default_user_name() -> String {
    DEFAULT_USER_NAME.to_string()
}

fn default_bot_name() -> String {
    DEFAULT_BOT_NAME.to_string()
}

fn default_max_tokens() -> u32 {
    100
}

fn default_num_outputs() -> u32 {
    1
}

/// Where and how requests are executed.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionSpec {
    pub url: String,
    pub auth: Authentication,
    pub parallelism: usize,
    pub dry_run: bool,
}

impl ExecutionSpec {
    /// Context used for interactive sessions: one request at a time, always executed.
    pub fn interactive(url: impl Into<String>, auth: Authentication) -> Self {
        Self {
            url: url.into(),
            auth,
            parallelism: 1,
            dry_run: false,
        }
    }
}
