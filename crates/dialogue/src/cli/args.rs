use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Serve and drive human-in-the-loop dialogue evaluations.
#[derive(Parser)]
#[command(version, about, long_about = None, author)]
pub struct Cli {
    /// Path to the gateway configuration file (TOML format)
    #[arg(long, global = true, env = "DIALOGUE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Address to bind (overrides config)
        #[arg(long)]
        bind: Option<String>,
        /// Port to listen on (overrides config)
        #[arg(long, env = "DIALOGUE_PORT")]
        port: Option<u16>,
        /// Base URL of the model proxy (overrides config)
        #[arg(long, env = "DIALOGUE_REMOTE_URL")]
        remote_url: Option<String>,
        /// Number of resolved runners to keep; 0 disables caching
        #[arg(long)]
        cache_capacity: Option<usize>,
    },
    /// Send one user turn through the gateway and print the reply
    Turn {
        #[arg(long)]
        output_path: PathBuf,
        #[arg(long)]
        run_name: String,
        #[arg(long)]
        trace_id: String,
        /// What the user says; empty when omitted
        #[arg(long)]
        message: Option<String>,
        /// User the conversation is started for if it has not been yet
        #[arg(long, default_value = "cli")]
        user_id: String,
        /// Base URL of the model proxy (overrides config)
        #[arg(long, env = "DIALOGUE_REMOTE_URL")]
        remote_url: Option<String>,
    },
    /// Manage interaction traces
    Trace {
        #[command(subcommand)]
        trace_command: TraceCommands,
    },
    /// Inspect run specifications
    RunSpec {
        #[command(subcommand)]
        run_spec_command: RunSpecCommands,
    },
}

#[derive(Subcommand, Clone)]
pub enum TraceCommands {
    /// Seed a new, uninitialised trace
    Create {
        #[arg(long)]
        output_path: PathBuf,
        #[arg(long)]
        run_name: String,
        /// Prompt shown to the user
        #[arg(long)]
        input: String,
        /// Trace id (random UUID when omitted)
        #[arg(long)]
        id: Option<String>,
        /// Id of the scenario instance the prompt comes from
        #[arg(long)]
        instance_id: Option<String>,
    },
    /// Show a trace's status and rounds
    Show {
        #[arg(long)]
        output_path: PathBuf,
        #[arg(long)]
        run_name: String,
        #[arg(long)]
        id: String,
    },
}

#[derive(Subcommand, Clone)]
pub enum RunSpecCommands {
    /// Print the run specification as JSON
    Show {
        #[arg(long)]
        output_path: PathBuf,
        #[arg(long)]
        run_name: String,
    },
}
