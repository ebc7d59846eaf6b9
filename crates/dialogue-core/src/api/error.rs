use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Authentication failed: {details}")]
    AuthenticationFailed { provider: String, details: String },

    #[error("Rate limited by {provider}: {details}")]
    RateLimited { provider: String, details: String },

    #[error("Invalid request to {provider}: {details}")]
    InvalidRequest { provider: String, details: String },

    #[error("{provider} server error (Status: {status_code}): {details}")]
    ServerError {
        provider: String,
        status_code: u16,
        details: String,
    },

    #[error("{provider} rejected the request: {details}")]
    Remote { provider: String, details: String },

    #[error("Failed to parse response from {provider}: {details}")]
    ResponseParsingError { provider: String, details: String },

    #[error("Failed to encode request for {provider}: {details}")]
    RequestEncoding { provider: String, details: String },
}

impl ApiError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(err) => err.is_timeout() || err.is_connect(),
            Self::RateLimited { .. } => true,
            Self::ServerError { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }
}
