//! `run`: the six wizard steps in order, against the configured backend.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Args;
use tracing::info;

use wizard_api::{HttpGateway, StubServer};
use wizard_core::event_bus::noop_sink;
use wizard_core::types::ViewEvent;
use wizard_core::{AppConfig, EventSink};
use wizard_flow::{Outcome, WizardController, WizardSettings};

use crate::render::WizardView;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Audience CSV to upload
    #[arg(long)]
    pub file: PathBuf,

    /// Lines of business, comma separated (DATA, VOICE, VAS, ...)
    #[arg(long, value_delimiter = ',', required = true)]
    pub lobs: Vec<String>,

    /// Opportunity types, comma separated (Upsell, Retain, Auto, ...)
    #[arg(long = "opp-types", value_delimiter = ',', required = true)]
    pub opp_types: Vec<String>,

    /// Offers per opportunity type, e.g. `Upsell=2` (repeatable)
    #[arg(long = "offer-count", value_parser = parse_offer_count)]
    pub offer_counts: Vec<(String, u8)>,

    #[arg(long)]
    pub publish_target: Option<String>,

    #[arg(long)]
    pub publish_url: Option<String>,

    /// Stop after Review & Launch
    #[arg(long, default_value_t = false)]
    pub skip_publish: bool,

    /// Also open the download link after launch
    #[arg(long, default_value_t = false)]
    pub download: bool,

    /// Run against an in-process demo backend instead of `api.base_url`
    #[arg(long, default_value_t = false)]
    pub stub: bool,

    /// Print nothing but logs
    #[arg(long, default_value_t = false)]
    pub quiet: bool,
}

/// `Upsell=2` to `("Upsell", 2)`.
pub fn parse_offer_count(s: &str) -> Result<(String, u8), String> {
    let (name, count) = s
        .split_once('=')
        .ok_or_else(|| format!("expected TYPE=COUNT, got '{s}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing opportunity type in '{s}'"));
    }
    let count: u8 = count
        .trim()
        .parse()
        .map_err(|_| format!("count must be a number in '{s}'"))?;
    Ok((name.to_string(), count))
}

fn require(outcome: Outcome, action: &str) -> anyhow::Result<()> {
    if !outcome.is_completed() {
        bail!("{action} did not complete ({outcome:?})");
    }
    Ok(())
}

pub async fn run(args: RunArgs, mut config: AppConfig) -> anyhow::Result<()> {
    let _stub = if args.stub {
        let server = StubServer::spawn(([127, 0, 0, 1], 0).into()).await?;
        config.api.base_url = server.base_url();
        Some(server)
    } else {
        None
    };

    let bytes = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("reading {}", args.file.display()))?;
    let file_name = args
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "audience.csv".to_string());

    let gateway = HttpGateway::new(&config.api)?;
    info!(base_url = %gateway.base_url(), "Starting wizard run");
    let view: Arc<dyn EventSink<ViewEvent>> = if args.quiet {
        noop_sink()
    } else {
        Arc::new(WizardView)
    };
    let mut wizard = WizardController::new(Arc::new(gateway), view, WizardSettings::from(&config));

    wizard.start();
    require(wizard.upload(Some((file_name, bytes))).await, "Upload")?;
    require(wizard.advance(), "Next")?;

    require(wizard.run_lifecycle().await, "Lifecycle")?;
    require(wizard.preview_lifecycle().await, "Lifecycle preview")?;
    require(wizard.advance(), "Next")?;

    wizard.set_lobs(args.lobs.iter().map(|l| l.trim().to_string()));
    wizard.set_opp_types(args.opp_types.iter().map(|t| t.trim().to_string()));
    require(wizard.run_opportunity().await, "Opportunity")?;
    require(wizard.preview_opportunity().await, "Opportunity preview")?;
    require(wizard.advance(), "Next")?;

    for (opp_type, count) in &args.offer_counts {
        wizard.set_offer_count(opp_type, *count)?;
    }
    require(wizard.run_offers().await, "Offers")?;
    require(wizard.preview_offers().await, "Offers preview")?;
    require(wizard.advance(), "Next")?;

    require(wizard.run_forecast().await, "Forecast")?;
    require(wizard.advance(), "Next")?;

    require(wizard.launch().await, "Launch")?;
    if args.download {
        wizard.download();
    }
    if args.skip_publish {
        return Ok(());
    }

    if let Some(target) = args.publish_target {
        wizard.set_publish_target(target);
    }
    if let Some(url) = args.publish_url {
        wizard.set_publish_url(url);
    }
    require(wizard.publish().await, "Publish")
}
