use async_trait::async_trait;
use voyage_catalog::{Departure, PackagePayload, RawPackage};

use crate::RepositoryResult;

/// Backend access for agency packages.
///
/// Responses are returned in their raw wire shape; normalization happens
/// once, where the records enter the cache.
#[async_trait]
pub trait PackageRepository: Send + Sync {
    async fn list(&self, agency_id: &str) -> RepositoryResult<Vec<RawPackage>>;

    async fn create(&self, payload: PackagePayload) -> RepositoryResult<RawPackage>;

    async fn update(&self, id: i64, payload: PackagePayload) -> RepositoryResult<RawPackage>;

    async fn delete(&self, id: i64) -> RepositoryResult<()>;
}

/// Backend access for departures
#[async_trait]
pub trait DepartureRepository: Send + Sync {
    async fn list(&self) -> RepositoryResult<Vec<Departure>>;

    async fn get(&self, id: i64) -> RepositoryResult<Departure>;

    async fn create(&self, departure: &Departure) -> RepositoryResult<Departure>;

    async fn update(&self, id: i64, departure: &Departure) -> RepositoryResult<Departure>;

    async fn delete(&self, id: i64) -> RepositoryResult<()>;
}
