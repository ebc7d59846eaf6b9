// Core dialogue gateway functionality without transport dependencies

pub mod api;
pub mod config;
pub mod error;
pub mod gateway;
pub mod run_spec;
pub mod runner;
pub mod store;
pub mod test_utils;
pub mod trace;
pub mod utils;

pub use config::GatewayConfig;
pub use error::{Error, Result};
pub use gateway::SessionGateway;
