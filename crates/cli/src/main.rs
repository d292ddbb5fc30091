//! Newsdesk CLI — the main entry point.
//!
//! Commands:
//! - `chat`    — Interactive chat session
//! - `ask`     — Single question, single answer
//! - `news`    — Scrape recent articles for a ticker
//! - `search`  — Web search through the fetch pipeline
//! - `config`  — Show, locate or initialize configuration

use clap::{Parser, Subcommand};

mod commands;

use commands::news::NewsSourceArg;

#[derive(Parser)]
#[command(
    name = "newsdesk",
    about = "Newsdesk — chat with an LLM that can read the news",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat session
    Chat,

    /// Ask a single question and print the answer
    Ask {
        /// The question
        message: String,
    },

    /// Print recent articles for a ticker symbol as JSON
    News {
        /// Ticker symbol, e.g. NVDA
        symbol: String,

        /// Which site to scrape
        #[arg(short, long, value_enum, default_value_t = NewsSourceArg::Yahoo)]
        source: NewsSourceArg,
    },

    /// Search the web and print readable snippets of the top results
    Search {
        /// The search query
        query: String,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration (secrets redacted)
    Show,
    /// Print the config file path
    Path,
    /// Write a default config file if none exists
    Init,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "info" };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }

    match cli.command {
        Commands::Chat => commands::chat::run().await?,
        Commands::Ask { message } => commands::chat::ask(&message).await?,
        Commands::News { symbol, source } => commands::news::run(&symbol, source).await?,
        Commands::Search { query } => commands::search::run(&query).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show().await?,
            ConfigAction::Path => commands::config_cmd::path().await?,
            ConfigAction::Init => commands::config_cmd::init().await?,
        },
    }

    Ok(())
}
