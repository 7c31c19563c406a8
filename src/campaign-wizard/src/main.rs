//! Campaign Wizard: run the six-step campaign wizard against a backend, or
//! talk to the scripted marketing experts in the terminal.

mod chat;
mod render;
mod wizard;

use std::net::SocketAddr;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use wizard_core::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "campaign-wizard")]
#[command(about = "Campaign wizard client and scripted marketing chat")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, env = "CAMPAIGN_WIZARD_CONFIG")]
    config: Option<String>,

    /// Backend base URL (overrides config)
    #[arg(long, env = "CAMPAIGN_WIZARD__API__BASE_URL")]
    base_url: Option<String>,

    /// Rows requested per preview (overrides config)
    #[arg(long)]
    preview_rows: Option<usize>,

    /// Emit logs as JSON
    #[arg(long, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a CSV and run every wizard step
    Run(wizard::RunArgs),
    /// Goal-driven marketing expert
    Expert(chat::ExpertArgs),
    /// Task-driven multi-agent marketing chat
    Chat(chat::ChatArgs),
    /// Serve the demo backend
    StubServer {
        #[arg(long, default_value = "127.0.0.1:8000")]
        addr: SocketAddr,
    },
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "campaign_wizard=info,wizard_flow=info,wizard_api=info".into());
    let fmt = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        fmt.json().init();
    } else {
        fmt.init();
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            AppConfig::load(Some(path.as_str())).with_context(|| format!("loading config {path}"))?
        }
        None => AppConfig::load(None).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load config, using defaults");
            AppConfig::default()
        }),
    };

    if let Some(url) = &cli.base_url {
        config.api.base_url = url.clone();
    }
    if let Some(rows) = cli.preview_rows {
        config.api.preview_rows = rows;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json);

    let config = load_config(&cli)?;
    info!(
        base_url = %config.api.base_url,
        preview_rows = config.api.preview_rows,
        "Configuration loaded"
    );

    match cli.command {
        Command::Run(args) => wizard::run(args, config).await,
        Command::Expert(args) => chat::expert(args, config).await,
        Command::Chat(args) => chat::chat(args, config).await,
        Command::StubServer { addr } => {
            wizard_api::stub::serve(addr).await?;
            Ok(())
        }
    }
}
