use async_trait::async_trait;
use eyre::Result;

use super::Command;
use crate::cli::TraceCommands;

mod create;
mod show;

pub use create::CreateTraceCommand;
pub use show::{ShowTraceCommand, render_trace};

pub struct TraceCommand {
    pub command: TraceCommands,
}

#[async_trait]
impl Command for TraceCommand {
    async fn execute(&self) -> Result<()> {
        match &self.command {
            TraceCommands::Create {
                output_path,
                run_name,
                input,
                id,
                instance_id,
            } => {
                let cmd = CreateTraceCommand {
                    output_path: output_path.clone(),
                    run_name: run_name.clone(),
                    input: input.clone(),
                    id: id.clone(),
                    instance_id: instance_id.clone(),
                };
                cmd.execute().await
            }
            TraceCommands::Show {
                output_path,
                run_name,
                id,
            } => {
                let cmd = ShowTraceCommand {
                    output_path: output_path.clone(),
                    run_name: run_name.clone(),
                    id: id.clone(),
                };
                cmd.execute().await
            }
        }
    }
}
