pub mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::api::{Request, RequestResult};

pub use store::{FileTraceStore, InMemoryTraceStore, TraceStore};

/// The scenario instance a conversation is grounded on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Instance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Text shown to the user as the conversation prompt
    pub input: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserInput {
    pub input: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequestState {
    pub request: Request,
    #[serde(default)]
    pub result: Option<RequestResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InteractionRound {
    /// Absent for the opening round of a trace.
    #[serde(default)]
    pub user_input: Option<UserInput>,
    pub request_state: RequestState,
}

impl InteractionRound {
    pub fn has_result(&self) -> bool {
        self.request_state.result.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Survey {
    pub user_id: String,
    pub data: Map<String, Value>,
    pub submitted_at: DateTime<Utc>,
}

/// Lifecycle of a trace, derived from its contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceStatus {
    Uninitialized,
    AwaitingUserTurn,
    AwaitingModelResponse,
    SurveySubmitted,
}

impl std::fmt::Display for TraceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uninitialized => f.write_str("uninitialized"),
            Self::AwaitingUserTurn => f.write_str("awaiting_user_turn"),
            Self::AwaitingModelResponse => f.write_str("awaiting_model_response"),
            Self::SurveySubmitted => f.write_str("survey_submitted"),
        }
    }
}

/// Ordered history of one conversation between a user and the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InteractionTrace {
    pub id: String,
    pub instance: Instance,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub rounds: Vec<InteractionRound>,
    #[serde(default)]
    pub surveys: Vec<Survey>,
    #[serde(default)]
    pub trace_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InteractionTrace {
    /// Create an uninitialised trace for `instance` with a fresh id.
    pub fn new(instance: Instance) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), instance)
    }

    pub fn with_id(id: impl Into<String>, instance: Instance) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            instance,
            user_id: None,
            rounds: Vec::new(),
            surveys: Vec::new(),
            trace_completed: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn status(&self) -> TraceStatus {
        if self.trace_completed {
            return TraceStatus::SurveySubmitted;
        }
        match self.rounds.last() {
            None => TraceStatus::Uninitialized,
            Some(round) if round.user_input.is_some() && !round.has_result() => {
                TraceStatus::AwaitingModelResponse
            }
            Some(_) => TraceStatus::AwaitingUserTurn,
        }
    }

    pub fn last_round(&self) -> Option<&InteractionRound> {
        self.rounds.last()
    }

    /// Trimmed first completion of the most recent round, if it has been answered.
    pub fn last_bot_utterance(&self) -> Option<String> {
        self.last_round()
            .and_then(|round| round.request_state.result.as_ref())
            .and_then(RequestResult::first_completion)
            .map(|sequence| sequence.text.trim().to_string())
    }

    pub fn push_round(&mut self, round: InteractionRound) {
        self.rounds.push(round);
        self.touch();
    }

    pub fn record_survey(&mut self, user_id: impl Into<String>, data: Map<String, Value>) {
        self.surveys.push(Survey {
            user_id: user_id.into(),
            data,
            submitted_at: Utc::now(),
        });
        self.trace_completed = true;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Sequence;
    use crate::test_utils::test_request;

    fn answered(text: &str) -> RequestState {
        RequestState {
            request: test_request("prompt"),
            result: Some(RequestResult {
                completions: vec![Sequence {
                    text: text.to_string(),
                    logprob: 0.0,
                }],
                ..RequestResult::empty()
            }),
        }
    }

    fn trace() -> InteractionTrace {
        InteractionTrace::with_id(
            "trace-1",
            Instance {
                id: None,
                input: "I had a tire burst on a busy road.".to_string(),
            },
        )
    }

    #[test]
    fn status_follows_round_contents() {
        let mut trace = trace();
        assert_eq!(trace.status(), TraceStatus::Uninitialized);

        trace.push_round(InteractionRound {
            user_input: None,
            request_state: RequestState {
                request: test_request("opening"),
                result: None,
            },
        });
        assert_eq!(trace.status(), TraceStatus::AwaitingUserTurn);

        trace.push_round(InteractionRound {
            user_input: Some(UserInput {
                input: "hello".to_string(),
            }),
            request_state: RequestState {
                request: test_request("turn"),
                result: None,
            },
        });
        assert_eq!(trace.status(), TraceStatus::AwaitingModelResponse);

        trace.record_survey("user-1", Map::new());
        assert_eq!(trace.status(), TraceStatus::SurveySubmitted);
    }

    #[test]
    fn last_bot_utterance_is_trimmed_first_completion() {
        let mut trace = trace();
        assert_eq!(trace.last_bot_utterance(), None);

        trace.push_round(InteractionRound {
            user_input: None,
            request_state: answered("  That sounds scary!\n"),
        });
        assert_eq!(
            trace.last_bot_utterance().as_deref(),
            Some("That sounds scary!")
        );
    }

    #[test]
    fn survey_marks_trace_completed() {
        let mut trace = trace();
        let mut answers = Map::new();
        answers.insert("fluency".to_string(), Value::from(4));
        trace.record_survey("user-1", answers.clone());

        assert!(trace.trace_completed);
        assert_eq!(trace.surveys[0].user_id, "user-1");
        assert_eq!(trace.surveys[0].data, answers);
    }
}
