use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StartConversationRequest {
    pub run_name: String,
    pub output_path: PathBuf,
    pub interaction_trace_id: String,
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StartConversationResponse {
    /// The instance input shown to the user.
    pub prompt: String,
    /// Present only when the model opened the conversation.
    pub bot_utterance: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationalTurnRequest {
    pub run_name: String,
    pub output_path: PathBuf,
    pub interaction_trace_id: String,
    #[serde(default)]
    pub user_utterance: Option<String>,
    #[serde(default)]
    pub session_uuid: Option<String>,
    #[serde(default)]
    pub user_uuid: Option<String>,
    #[serde(default)]
    pub payload: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationalTurnResponse {
    pub session_uuid: String,
    pub user_uuid: String,
    pub bot_utterance: String,
    pub payload: Vec<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmitSurveyRequest {
    pub run_name: String,
    pub output_path: PathBuf,
    pub interaction_trace_id: String,
    pub user_id: String,
    pub questions: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmitSurveyResponse {
    pub success: bool,
}
