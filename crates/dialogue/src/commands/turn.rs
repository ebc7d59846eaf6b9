use std::io::Write;
use std::path::PathBuf;

use async_trait::async_trait;
use dialogue_core::gateway::{ConversationalTurnRequest, StartConversationRequest};
use dialogue_core::{GatewayConfig, SessionGateway};
use eyre::{Result, WrapErr};

use super::Command;

pub struct TurnCommand {
    pub config: GatewayConfig,
    pub output_path: PathBuf,
    pub run_name: String,
    pub trace_id: String,
    pub message: Option<String>,
    pub user_id: String,
    pub remote_url: Option<String>,
}

#[async_trait]
impl Command for TurnCommand {
    async fn execute(&self) -> Result<()> {
        let mut config = self.config.clone();
        if let Some(url) = &self.remote_url {
            config.remote.url.clone_from(url);
        }
        let gateway = SessionGateway::from_config(&config)?;

        // No-op for a conversation that has already started.
        let start = gateway
            .start_conversation(StartConversationRequest {
                run_name: self.run_name.clone(),
                output_path: self.output_path.clone(),
                interaction_trace_id: self.trace_id.clone(),
                user_id: self.user_id.clone(),
            })
            .await
            .wrap_err("Failed to start conversation")?;

        let turn = gateway
            .advance_turn(ConversationalTurnRequest {
                run_name: self.run_name.clone(),
                output_path: self.output_path.clone(),
                interaction_trace_id: self.trace_id.clone(),
                user_utterance: self.message.clone(),
                session_uuid: None,
                user_uuid: None,
                payload: None,
            })
            .await
            .wrap_err("Turn failed")?;

        let mut out = std::io::stdout().lock();
        writeln!(out, "Prompt: {}", start.prompt)?;
        writeln!(out, "Bot: {}", turn.bot_utterance.trim())?;
        Ok(())
    }
}
