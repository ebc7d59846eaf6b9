use std::path::Path;

use chrono::Local;
use tracing_appender::rolling;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    prelude::*,
};

use crate::error::{Error, Result};

/// Initialize tracing with the filter taken from RUST_LOG (default `info`).
///
/// With a `log_dir` every run appends to its own timestamp-named file there;
/// otherwise output goes to stdout.
pub fn init_tracing(log_dir: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if let Some(log_dir) = log_dir {
        std::fs::create_dir_all(log_dir)?;
        let file_name = format!("{}.log", Local::now().format("%Y%m%d_%H%M%S"));
        let file_appender = rolling::never(log_dir, &file_name);

        tracing_subscriber::registry()
            .with(
                fmt::Layer::new()
                    .with_writer(file_appender)
                    .with_ansi(false)
                    .with_span_events(FmtSpan::CLOSE)
                    .with_file(true)
                    .with_line_number(true),
            )
            .with(filter)
            .try_init()
            .map_err(|e| Error::Configuration(format!("Failed to install subscriber: {e}")))?;

        tracing::debug!(
            target: "dialogue_core::utils::tracing",
            path = %log_dir.join(&file_name).display(),
            "Tracing initialized with file output"
        );
    } else {
        tracing_subscriber::registry()
            .with(fmt::Layer::default().with_ansi(true).with_target(true))
            .with(filter)
            .try_init()
            .map_err(|e| Error::Configuration(format!("Failed to install subscriber: {e}")))?;

        tracing::debug!(
            target: "dialogue_core::utils::tracing",
            "Tracing initialized with stdout output"
        );
    }

    Ok(())
}
