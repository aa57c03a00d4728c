use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voyage_console=debug,voyage_workflow=debug,voyage_store=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = voyage_store::Config::load().context("Failed to load config")?;
    let session = voyage_console::build_session(&config)?;

    let agency_ids: Vec<String> = std::env::args().skip(1).collect();
    if agency_ids.is_empty() {
        tracing::warn!("No agency ids given; nothing to load");
        return Ok(());
    }

    for line in voyage_console::warm(&session, &agency_ids).await {
        tracing::info!("{}", line);
    }
    Ok(())
}
