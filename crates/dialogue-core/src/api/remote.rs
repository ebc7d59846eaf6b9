use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, error};

use super::{ApiError, Authentication, ModelClient, Request, RequestResult};

pub const DEFAULT_REMOTE_URL: &str = "https://crfm-models.stanford.edu";
const REQUEST_PATH: &str = "/api/request";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// HTTP client for the model proxy's request endpoint.
#[derive(Clone)]
pub struct RemoteServiceClient {
    http_client: reqwest::Client,
    base_url: String,
    auth: Authentication,
}

impl RemoteServiceClient {
    pub fn new(base_url: impl Into<String>, auth: Authentication) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, auth, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        auth: Authentication,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request_url(&self) -> String {
        format!("{}{}", self.base_url, REQUEST_PATH)
    }

    fn encode_query(&self, request: &Request) -> Result<[(&'static str, String); 2], ApiError> {
        let encode = |value: serde_json::Result<String>| {
            value.map_err(|e| ApiError::RequestEncoding {
                provider: self.name().to_string(),
                details: e.to_string(),
            })
        };
        Ok([
            ("auth", encode(serde_json::to_string(&self.auth))?),
            ("request", encode(serde_json::to_string(request))?),
        ])
    }

    fn parse_body(&self, body: &str) -> Result<RequestResult, ApiError> {
        let value: Value =
            serde_json::from_str(body).map_err(|e| ApiError::ResponseParsingError {
                provider: self.name().to_string(),
                details: e.to_string(),
            })?;

        if let Some(remote_error) = value.get("error").filter(|e| !e.is_null()) {
            let details = remote_error
                .as_str()
                .map_or_else(|| remote_error.to_string(), str::to_string);
            return Err(ApiError::Remote {
                provider: self.name().to_string(),
                details,
            });
        }

        serde_json::from_value(value).map_err(|e| {
            error!(target: "remote::make_request", "Failed to parse response: {}", e);
            ApiError::ResponseParsingError {
                provider: self.name().to_string(),
                details: e.to_string(),
            }
        })
    }
}

#[async_trait]
impl ModelClient for RemoteServiceClient {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn make_request(&self, request: &Request) -> Result<RequestResult, ApiError> {
        let query = self.encode_query(request)?;

        debug!(
            target: "remote::make_request",
            model = %request.model,
            prompt_chars = request.prompt.len(),
            "Sending request to model proxy"
        );

        let response = self
            .http_client
            .get(self.request_url())
            .query(&query)
            .send()
            .await
            .map_err(ApiError::Network)?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            debug!(
                target: "remote::make_request",
                "Model proxy error - Status: {}, Body: {}",
                status,
                body
            );

            let provider = self.name().to_string();
            return Err(match status.as_u16() {
                401 | 403 => ApiError::AuthenticationFailed {
                    provider,
                    details: body,
                },
                429 => ApiError::RateLimited {
                    provider,
                    details: body,
                },
                400 => ApiError::InvalidRequest {
                    provider,
                    details: body,
                },
                code => ApiError::ServerError {
                    provider,
                    status_code: code,
                    details: body,
                },
            });
        }

        self.parse_body(&body)
    }
}
