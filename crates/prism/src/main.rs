use clap::Parser;
use eyre::Result;

use prism::cli::{Cli, Commands};
use prism::commands::{
    Command, replay::ReplayCommand, resolve::ResolveCommand, scan::ScanCommand,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Install color-eyre for better error reports
    color_eyre::install()?;

    let cli = Cli::parse();

    // Load .env file if it exists
    prism::cli::config::load_env()?;

    // Initialize tracing (level configured via RUST_LOG env var)
    prism_core::utils::tracing::init_tracing()?;

    let command: Box<dyn Command> = match cli.command {
        Commands::Scan { payload } => Box::new(ScanCommand { payload }),
        Commands::Resolve {
            payload,
            message_id,
            chat_id,
            persist,
        } => Box::new(ResolveCommand {
            payload,
            message_id,
            chat_id,
            persist,
            config: cli.config,
            db: cli.db,
        }),
        Commands::Replay { message_id } => Box::new(ReplayCommand {
            message_id,
            config: cli.config,
            db: cli.db,
        }),
    };

    command.execute().await
}
