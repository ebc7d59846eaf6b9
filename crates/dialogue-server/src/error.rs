use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error(transparent)]
    Gateway(#[from] dialogue_core::Error),

    #[error("Malformed request body: {0}")]
    MalformedBody(#[from] JsonRejection),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[from] std::io::Error),

    #[error("Invalid host state: {reason}")]
    InvalidHostState { reason: String },
}

impl ServerError {
    /// Machine-readable code carried in error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Gateway(err) => err.code(),
            Self::MalformedBody(_) => "invalid_request",
            Self::Bind { .. } | Self::Serve(_) | Self::InvalidHostState { .. } => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.code() {
            "config_not_found" | "trace_not_found" => StatusCode::NOT_FOUND,
            "invalid_request" => StatusCode::BAD_REQUEST,
            "invalid_trace_state" | "trace_completed" | "trace_already_exists" => {
                StatusCode::CONFLICT
            }
            "model_unavailable" => StatusCode::SERVICE_UNAVAILABLE,
            "model_api_error" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Gateway(err) => err.is_retryable(),
            _ => false,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "Request failed");
        } else {
            tracing::debug!(code = self.code(), error = %self, "Request rejected");
        }
        let body = Json(serde_json::json!({
            "error": self.to_string(),
            "code": self.code(),
            "retryable": self.is_retryable(),
        }));
        (status, body).into_response()
    }
}
