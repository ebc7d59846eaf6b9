use serde::{Deserialize, Serialize};

/// Credentials forwarded to the model proxy with every request.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Authentication {
    pub api_key: String,
}

impl std::fmt::Debug for Authentication {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authentication")
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// A single completion request sent to the model proxy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Request {
    pub model: String,
    pub prompt: String,
    pub temperature: f64,
    pub num_completions: u32,
    pub max_tokens: u32,
    #[serde(default)]
    pub stop_sequences: Vec<String>,
}

/// One candidate output returned for a request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sequence {
    pub text: String,
    #[serde(default)]
    pub logprob: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequestResult {
    pub success: bool,
    #[serde(default)]
    pub completions: Vec<Sequence>,
    #[serde(default)]
    pub cached: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RequestResult {
    /// Result used when the model is never contacted.
    pub fn empty() -> Self {
        Self {
            success: true,
            completions: Vec::new(),
            cached: false,
            request_time: None,
            error: None,
        }
    }

    pub fn first_completion(&self) -> Option<&Sequence> {
        self.completions.first()
    }

    /// First completion text, provided the result is usable as a reply.
    pub fn first_text(&self) -> Option<&str> {
        if !self.success {
            return None;
        }
        self.first_completion()
            .map(|sequence| sequence.text.as_str())
            .filter(|text| !text.trim().is_empty())
    }
}
