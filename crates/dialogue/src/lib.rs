pub mod cli;
pub mod commands;

pub use dialogue_core::{api, config, gateway, run_spec, runner, store, trace};
