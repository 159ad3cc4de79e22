use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use pixel_assistant::Config;

mod commands;

#[derive(Parser)]
#[command(name = "pixel-assistant")]
#[command(version)]
#[command(about = "Offline chat with bundled on-device models", long_about = None)]
struct Cli {
    /// Application home directory (defaults to ~/.pixel-assistant)
    #[arg(long, global = true)]
    home: Option<PathBuf>,

    /// Log progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the selected model
    Chat {
        /// Catalog id of the model to use
        #[arg(long)]
        model: Option<String>,
        /// Do not save the conversation during this run
        #[arg(long)]
        no_memory: bool,
        /// Start from an empty conversation
        #[arg(long)]
        fresh: bool,
    },
    /// List the bundled models
    Models,
    /// Print the saved conversation
    History,
    /// Delete the saved conversation
    Clear,
    /// Download a model into the local cache
    Pull { id: String },
}

fn init_logging(verbose: bool) {
    let default_directive = if verbose {
        "pixel_assistant=info"
    } else {
        "pixel_assistant=warn"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    // stdout carries the chat, logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.home {
        Some(home) => Config::load_from(home)?,
        None => Config::load()?,
    };

    match cli.command {
        // no subcommand = chat
        None => commands::start_chat(&config, None, false, false).await,
        Some(Commands::Chat {
            model,
            no_memory,
            fresh,
        }) => commands::start_chat(&config, model.as_deref(), no_memory, fresh).await,
        Some(Commands::Models) => commands::list_models(&config).await,
        Some(Commands::History) => commands::show_history(&config).await,
        Some(Commands::Clear) => commands::clear_history(&config).await,
        Some(Commands::Pull { id }) => commands::pull_model(&config, &id).await,
    }
}
