pub mod error;
pub mod remote;
pub mod types;

use async_trait::async_trait;

pub use error::ApiError;
pub use remote::RemoteServiceClient;
pub use types::{Authentication, Request, RequestResult, Sequence};

/// Client for a completion service that answers one request at a time.
#[async_trait]
pub trait ModelClient: Send + Sync + 'static {
    /// Name used in errors and logs
    fn name(&self) -> &'static str;

    async fn make_request(&self, request: &Request) -> Result<RequestResult, ApiError>;
}
