use std::io::Write;
use std::path::PathBuf;

use async_trait::async_trait;
use dialogue_core::store::{FileRunConfigStore, RunConfigStore};
use dialogue_core::trace::{FileTraceStore, Instance, InteractionTrace, TraceStore};
use eyre::{Result, WrapErr};
use tracing::info;

use super::super::Command;

pub struct CreateTraceCommand {
    pub output_path: PathBuf,
    pub run_name: String,
    pub input: String,
    pub id: Option<String>,
    pub instance_id: Option<String>,
}

impl CreateTraceCommand {
    /// Persist the trace and return it. The run must already have a run spec.
    pub async fn create(&self) -> Result<InteractionTrace> {
        FileRunConfigStore::new()
            .load(&self.output_path, &self.run_name)
            .await?;

        let instance = Instance {
            id: self.instance_id.clone(),
            input: self.input.clone(),
        };
        let trace = match &self.id {
            Some(id) => InteractionTrace::with_id(id.clone(), instance),
            None => InteractionTrace::new(instance),
        };

        FileTraceStore::for_run(&self.output_path, &self.run_name)
            .create(&trace)
            .await
            .wrap_err("Failed to create trace")?;
        info!(trace_id = %trace.id, run = %self.run_name, "Created interaction trace");
        Ok(trace)
    }
}

#[async_trait]
impl Command for CreateTraceCommand {
    async fn execute(&self) -> Result<()> {
        let trace = self.create().await?;
        writeln!(std::io::stdout().lock(), "{}", trace.id)?;
        Ok(())
    }
}
