use std::io::Write;
use std::path::PathBuf;

use async_trait::async_trait;
use dialogue_core::store::{FileRunConfigStore, RunConfigStore};
use eyre::Result;

use super::Command;

pub struct ShowRunSpecCommand {
    pub output_path: PathBuf,
    pub run_name: String,
}

#[async_trait]
impl Command for ShowRunSpecCommand {
    async fn execute(&self) -> Result<()> {
        let run_spec = FileRunConfigStore::new()
            .load(&self.output_path, &self.run_name)
            .await?;
        let json = serde_json::to_string_pretty(&run_spec)?;
        writeln!(std::io::stdout().lock(), "{json}")?;
        Ok(())
    }
}
