pub mod error;
pub mod http;
pub mod service_host;

pub use error::ServerError;
pub use http::{AppState, router};
pub use service_host::*;
