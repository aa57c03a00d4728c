use std::sync::Arc;

use anyhow::Context;
use voyage_core::{DepartureRepository, PackageRepository};
use voyage_store::{
    ApiClient, Config, HttpDepartureRepository, HttpPackageRepository, InMemoryDepartureRepository,
    InMemoryPackageRepository,
};
use voyage_workflow::{AgencyPackageCache, ConsoleSession, FetchOutcome};

pub type Repositories = (Arc<dyn PackageRepository>, Arc<dyn DepartureRepository>);

/// REST repositories when a backend is configured, in-memory ones otherwise
pub fn repositories(config: &Config) -> anyhow::Result<Repositories> {
    match &config.api.base_url {
        Some(base_url) => {
            let api = ApiClient::new(base_url, &config.api)
                .with_context(|| format!("Failed to build API client for {}", base_url))?;
            tracing::info!("Using backend at {}", base_url);
            Ok((
                Arc::new(HttpPackageRepository::new(api.clone())),
                Arc::new(HttpDepartureRepository::new(api)),
            ))
        }
        None => {
            tracing::warn!("api.base_url not set; running against empty in-memory repositories");
            Ok((
                Arc::new(InMemoryPackageRepository::new()),
                Arc::new(InMemoryDepartureRepository::new()),
            ))
        }
    }
}

pub fn build_session(config: &Config) -> anyhow::Result<ConsoleSession> {
    let (packages, departures) = repositories(config)?;
    Ok(ConsoleSession::new(
        packages,
        departures,
        &config.workflow.duplicate_suffix,
    ))
}

/// One line per agency: package count, departures, or the recorded error
pub fn summarize(cache: &AgencyPackageCache, agency_id: &str) -> String {
    match (cache.get(agency_id), cache.error(agency_id)) {
        (Some(packages), _) => {
            let departures: usize = packages.iter().map(|p| p.departures.len()).sum();
            let active = packages.iter().filter(|p| p.active).count();
            format!(
                "agency {}: {} packages ({} active), {} departures",
                agency_id,
                packages.len(),
                active,
                departures
            )
        }
        (None, Some(error)) => format!("agency {}: failed to load ({})", agency_id, error),
        (None, None) => format!("agency {}: not loaded", agency_id),
    }
}

/// Warm the cache for every agency and report each one
pub async fn warm(session: &ConsoleSession, agency_ids: &[String]) -> Vec<String> {
    let mut lines = Vec::with_capacity(agency_ids.len());
    for agency_id in agency_ids {
        if let FetchOutcome::Loaded { issues, .. } = session.open_agency(agency_id).await {
            if !issues.is_empty() {
                tracing::warn!("{} records of agency {} needed cleanup", issues.len(), agency_id);
            }
        }
        lines.push(summarize(&session.cache(), agency_id));
    }
    lines
}
