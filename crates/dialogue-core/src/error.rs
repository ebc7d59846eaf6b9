use std::path::PathBuf;

use thiserror::Error;

use crate::api::ApiError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Run configuration '{run_name}' not found at {}: {reason}", path.display())]
    ConfigNotFound {
        run_name: String,
        path: PathBuf,
        reason: String,
    },

    #[error("Interaction trace not found: {trace_id}")]
    TraceNotFound { trace_id: String },

    #[error("Interaction trace already exists: {trace_id}")]
    TraceAlreadyExists { trace_id: String },

    #[error("Interaction trace {trace_id} is completed; no further turns are accepted")]
    TraceCompleted { trace_id: String },

    #[error("Interaction trace {trace_id} is in an invalid state: {reason}")]
    InvalidTraceState { trace_id: String, reason: String },

    #[error("Model unavailable: {reason}")]
    ModelUnavailable {
        reason: String,
        #[source]
        source: Option<ApiError>,
    },

    #[error("Failed to record survey for trace {trace_id}: {reason}")]
    SurveyRecordingFailed { trace_id: String, reason: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl Error {
    pub fn trace_not_found(trace_id: impl Into<String>) -> Self {
        Self::TraceNotFound {
            trace_id: trace_id.into(),
        }
    }

    pub fn model_unavailable(reason: impl Into<String>) -> Self {
        Self::ModelUnavailable {
            reason: reason.into(),
            source: None,
        }
    }

    /// Stable machine-readable code for presentation layers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigNotFound { .. } => "config_not_found",
            Self::TraceNotFound { .. } => "trace_not_found",
            Self::TraceAlreadyExists { .. } => "trace_already_exists",
            Self::TraceCompleted { .. } => "trace_completed",
            Self::InvalidTraceState { .. } => "invalid_trace_state",
            Self::ModelUnavailable { .. } => "model_unavailable",
            Self::SurveyRecordingFailed { .. } => "survey_recording_failed",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Api(_) => "model_api_error",
            Self::Io(_) | Self::Serialization(_) | Self::Configuration(_) => "internal",
        }
    }

    /// Whether the caller may retry the same operation unchanged.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ModelUnavailable { .. } | Self::SurveyRecordingFailed { .. } => true,
            Self::Api(err) => err.is_retryable(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_and_trace_errors_have_distinct_codes() {
        let config = Error::ConfigNotFound {
            run_name: "run".to_string(),
            path: PathBuf::from("/tmp/runs/run/run_spec.json"),
            reason: "missing".to_string(),
        };
        let trace = Error::trace_not_found("abc");

        assert_ne!(config.code(), trace.code());
        assert!(!config.is_retryable());
        assert!(!trace.is_retryable());
    }

    #[test]
    fn model_and_survey_failures_are_retryable() {
        assert!(Error::model_unavailable("no completions").is_retryable());
        assert!(
            Error::SurveyRecordingFailed {
                trace_id: "abc".to_string(),
                reason: "disk full".to_string(),
            }
            .is_retryable()
        );
    }

    #[test]
    fn config_not_found_message_names_the_path() {
        let err = Error::ConfigNotFound {
            run_name: "dialogue_run".to_string(),
            path: PathBuf::from("/out/runs/dialogue_run/run_spec.json"),
            reason: "No such file or directory".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("dialogue_run"));
        assert!(message.contains("/out/runs/dialogue_run/run_spec.json"));
    }
}
