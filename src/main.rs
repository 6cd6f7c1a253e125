use anyhow::Result;
use athdiff::core::log::init_logging;
use athdiff::core::pipeline::AssetQuery;
use clap::{CommandFactory, Parser, Subcommand};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration (at --config-path when given)
    Setup,
    /// Serve the HTTP API and publish the digest on schedule
    Serve,
    /// Build the digest once and print it
    Digest {
        /// Also deliver it to the configured webhook
        #[arg(long)]
        notify: bool,
    },
    /// Show every tracked asset's distance from its all-time high
    List {
        /// Comma-separated symbols to show
        #[arg(short, long)]
        symbol: Option<String>,

        /// Maximum number of assets to fetch
        #[arg(short, long)]
        limit: Option<u32>,
    },
}

impl From<Commands> for athdiff::AppCommand {
    fn from(cmd: Commands) -> athdiff::AppCommand {
        match cmd {
            Commands::Serve => athdiff::AppCommand::Serve,
            Commands::Digest { notify } => athdiff::AppCommand::Digest { notify },
            Commands::List { symbol, limit } => athdiff::AppCommand::List {
                query: AssetQuery {
                    symbol,
                    limit,
                    ..Default::default()
                },
            },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => athdiff::cli::setup::setup_at_path(path),
            None => athdiff::cli::setup::setup(),
        },
        Some(cmd) => athdiff::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
