use clap::Parser;
use eyre::Result;

use dialogue::cli::{Cli, Commands, RunSpecCommands};
use dialogue::commands::{
    Command, run_spec::ShowRunSpecCommand, serve::ServeCommand, trace::TraceCommand,
    turn::TurnCommand,
};
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    // Load .env file if it exists
    dialogue::cli::config::load_env()?;

    let config = dialogue::cli::config::load_config(cli.config.as_deref())?;

    // Level configured via RUST_LOG
    dialogue_core::utils::tracing::init_tracing(config.logging.dir.as_deref())?;
    debug!(remote = %config.remote.url, "Configuration resolved");

    match cli.command {
        Commands::Serve {
            bind,
            port,
            remote_url,
            cache_capacity,
        } => {
            let cmd = ServeCommand {
                config,
                bind,
                port,
                remote_url,
                cache_capacity,
            };
            cmd.execute().await
        }
        Commands::Turn {
            output_path,
            run_name,
            trace_id,
            message,
            user_id,
            remote_url,
        } => {
            let cmd = TurnCommand {
                config,
                output_path,
                run_name,
                trace_id,
                message,
                user_id,
                remote_url,
            };
            cmd.execute().await
        }
        Commands::Trace { trace_command } => {
            let cmd = TraceCommand {
                command: trace_command,
            };
            cmd.execute().await
        }
        Commands::RunSpec { run_spec_command } => match run_spec_command {
            RunSpecCommands::Show {
                output_path,
                run_name,
            } => {
                let cmd = ShowRunSpecCommand {
                    output_path,
                    run_name,
                };
                cmd.execute().await
            }
        },
    }
}
