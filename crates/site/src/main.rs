//! Dump the public site content as JSON.
//!
//! ```text
//! wasura-site              # sections, card lists and top-page reports
//! wasura-site reports 2    # one page of the report list
//! ```

use std::sync::Arc;

use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wasura_core::config::SiteConfig;
use wasura_core::error::CoreError;
use wasura_core::record::Record;
use wasura_editor::site::{PageLookup, SiteLoader, SiteSnapshot};
use wasura_gateway::{ContentStore, RemoteGateway};

#[derive(Serialize)]
struct TopPage {
    #[serde(flatten)]
    snapshot: SiteSnapshot,
    latest_reports: Option<Vec<Record>>,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "wasura_site=debug,wasura_editor=debug,wasura_gateway=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run(std::env::args().skip(1).collect()).await {
        tracing::error!(error = %e, "wasura-site failed");
        std::process::exit(1);
    }
}

async fn run(args: Vec<String>) -> Result<(), CoreError> {
    let config = SiteConfig::from_env()?;
    tracing::info!(rest_url = %config.rest_url, cloud = %config.cloud_name, "Configuration loaded");

    let gateway: Arc<dyn ContentStore> = Arc::new(RemoteGateway::from_config(&config)?);
    let loader = SiteLoader::from_config(gateway, &config);

    let output = match args.first().map(String::as_str) {
        None => {
            let (snapshot, latest) = tokio::join!(loader.load_all(), loader.top_reports());
            let latest_reports = latest
                .map_err(|e| tracing::warn!(error = %e, "Skipping latest reports"))
                .ok();
            to_json(&TopPage {
                snapshot,
                latest_reports,
            })?
        }
        Some("reports") => {
            let page = match args.get(1) {
                Some(raw) => raw.parse::<u32>().map_err(|_| {
                    CoreError::Validation(format!("Page must be a positive number, got '{raw}'"))
                })?,
                None => 1,
            };
            match loader.reports_page(page).await? {
                PageLookup::Found(page) => to_json(&page)?,
                PageLookup::PageOutOfRange { requested, .. } => {
                    tracing::info!(requested, "Page out of range, showing page 1");
                    match loader.reports_page(1).await? {
                        PageLookup::Found(page) => to_json(&page)?,
                        PageLookup::PageOutOfRange { .. } => "null".to_string(),
                    }
                }
            }
        }
        Some(other) => {
            return Err(CoreError::Validation(format!(
                "Unknown command '{other}'. Usage: wasura-site [reports <page>]"
            )));
        }
    };

    println!("{output}");
    Ok(())
}

fn to_json(value: &impl Serialize) -> Result<String, CoreError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| CoreError::InvariantViolation(format!("Failed to render JSON: {e}")))
}
