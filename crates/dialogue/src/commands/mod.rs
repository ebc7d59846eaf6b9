use async_trait::async_trait;
use eyre::Result;

pub mod run_spec;
pub mod serve;
pub mod trace;
pub mod turn;

#[async_trait]
pub trait Command {
    async fn execute(&self) -> Result<()>;
}
