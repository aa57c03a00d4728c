use std::sync::Arc;
use tracing::{debug, info, warn};
use voyage_catalog::{normalize_package, NormalizationIssue};
use voyage_core::{PackageRepository, RepositoryError};

use crate::cache::SharedPackageCache;

/// Result of a fetch-if-absent call
#[derive(Debug)]
pub enum FetchOutcome {
    /// Bucket already present, no request made
    Cached,
    Loaded {
        count: usize,
        issues: Vec<NormalizationIssue>,
    },
    /// Request failed; the message is recorded on the agency and the bucket stays absent
    Failed(RepositoryError),
}

/// Populates the cache one agency at a time.
///
/// Concurrent calls for the same never-fetched agency are not collapsed:
/// each one issues its own request and the last write wins. Both writes are
/// the same server read, so the race is harmless.
pub struct PackageLoader {
    repository: Arc<dyn PackageRepository>,
    cache: SharedPackageCache,
}

impl PackageLoader {
    pub fn new(repository: Arc<dyn PackageRepository>, cache: SharedPackageCache) -> Self {
        Self { repository, cache }
    }

    pub async fn fetch_if_absent(&self, agency_id: &str) -> FetchOutcome {
        {
            let mut cache = self.cache.write();
            if cache.get(agency_id).is_some() {
                debug!("Packages for agency {} already cached", agency_id);
                return FetchOutcome::Cached;
            }
            cache.set_loading(agency_id, true);
            cache.set_error(agency_id, None);
        }

        let result = self.repository.list(agency_id).await;

        match result {
            Ok(records) => {
                let mut packages = Vec::with_capacity(records.len());
                let mut issues = Vec::new();
                for raw in records {
                    let normalized = normalize_package(raw);
                    packages.push(normalized.package);
                    issues.extend(normalized.issues);
                }

                let count = packages.len();
                let mut cache = self.cache.write();
                cache.set_for(agency_id, packages);
                cache.set_loading(agency_id, false);
                info!("Loaded {} packages for agency {}", count, agency_id);

                FetchOutcome::Loaded { count, issues }
            }
            Err(e) => {
                warn!("Failed to load packages for agency {}: {}", agency_id, e);
                let mut cache = self.cache.write();
                cache.set_error(agency_id, Some(e.to_string()));
                cache.set_loading(agency_id, false);

                FetchOutcome::Failed(e)
            }
        }
    }

    /// Drop the bucket and fetch it again
    pub async fn reload(&self, agency_id: &str) -> FetchOutcome {
        self.cache.write().invalidate(agency_id);
        self.fetch_if_absent(agency_id).await
    }
}
