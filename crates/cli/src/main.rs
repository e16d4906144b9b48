//! Sage CLI
//!
//! Grounded question answering over a local document corpus.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, ChatCommand, HealthCommand, IndexCommand, StatsCommand};
use sage_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// Sage - answer questions from your documents, with sources
#[derive(Parser, Debug)]
#[command(name = "sage")]
#[command(about = "Grounded question answering over a document corpus", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "SAGE_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "SAGE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Generation provider (ollama, openai, or a name declared in the config)
    #[arg(short, long, global = true, env = "SAGE_PROVIDER")]
    provider: Option<String>,

    /// Generation model identifier
    #[arg(short, long, global = true, env = "SAGE_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build and inspect the corpus index
    Index(IndexCommand),

    /// Ask a single question
    Ask(AskCommand),

    /// Interactive question loop
    Chat(ChatCommand),

    /// Show statistics of the current index
    Stats(StatsCommand),

    /// Check that the index and backends can be loaded
    Health(HealthCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_with(cli.workspace, cli.config)?.with_overrides(
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(
        config.log_level.as_deref(),
        config.no_color,
        config.log_format,
    )?;

    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    let command_name = match &cli.command {
        Commands::Index(_) => "index",
        Commands::Ask(_) => "ask",
        Commands::Chat(_) => "chat",
        Commands::Stats(_) => "stats",
        Commands::Health(_) => "health",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Index(cmd) => cmd.execute(&config).await,
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Chat(cmd) => cmd.execute(&config).await,
        Commands::Stats(cmd) => cmd.execute(&config),
        Commands::Health(cmd) => cmd.execute(&config),
    };

    match &result {
        Ok(_) => tracing::debug!("Command completed successfully"),
        Err(e) => tracing::error!(kind = e.kind().as_str(), "Command failed: {}", e),
    }

    result
}
