use std::sync::Arc;
use tracing::{debug, error, info};
use voyage_catalog::{normalize_package, Departure, Package, PackageForm, PackagePayload, PayloadError};
use voyage_core::{DepartureRepository, PackageRepository, RepositoryError};

use crate::cache::SharedPackageCache;

#[derive(Debug, thiserror::Error)]
pub enum MutationError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Payload(#[from] PayloadError),
}

pub type MutationResult<T> = Result<T, MutationError>;

/// Runs create/edit/duplicate/delete submissions and reconciles the cache.
///
/// The cache is written only after the backend confirms, so a failed
/// submission never leaves a partial local update behind.
pub struct MutationCoordinator {
    packages: Arc<dyn PackageRepository>,
    departures: Arc<dyn DepartureRepository>,
    cache: SharedPackageCache,
}

impl MutationCoordinator {
    pub fn new(
        packages: Arc<dyn PackageRepository>,
        departures: Arc<dyn DepartureRepository>,
        cache: SharedPackageCache,
    ) -> Self {
        Self {
            packages,
            departures,
            cache,
        }
    }

    // ---- packages ----

    pub async fn submit_create(&self, agency_id: &str, mut form: PackageForm) -> MutationResult<Package> {
        // A duplicated seed still names its source agency; the copy belongs to the target
        form.package.id = None;
        form.package.agency_ref = Some(agency_id.to_string());
        let payload = PackagePayload::from_form(&form)?;

        let raw = self.packages.create(payload).await.map_err(|e| {
            error!("Failed to create package for agency {}: {}", agency_id, e);
            e
        })?;
        let created = normalize_package(raw).package;

        if !self.cache.write().append_for(agency_id, created.clone()) {
            debug!("Agency {} not loaded yet; package {:?} will arrive with its first fetch", agency_id, created.id);
        }
        info!("Created package {:?} for agency {}", created.id, agency_id);
        Ok(created)
    }

    pub async fn submit_edit(&self, package_id: i64, agency_id: &str, mut form: PackageForm) -> MutationResult<Package> {
        form.package.id = Some(package_id);
        let payload = PackagePayload::from_form(&form)?;

        let raw = self.packages.update(package_id, payload).await.map_err(|e| {
            error!("Failed to update package {}: {}", package_id, e);
            e
        })?;
        let updated = normalize_package(raw).package;

        self.cache.write().replace_one(agency_id, package_id, updated.clone());
        info!("Updated package {} for agency {}", package_id, agency_id);
        Ok(updated)
    }

    /// Duplication is a plain create of the seeded form; there is no clone endpoint.
    pub async fn submit_duplicate(&self, agency_id: &str, form: PackageForm) -> MutationResult<Package> {
        self.submit_create(agency_id, form).await
    }

    pub async fn submit_delete(&self, package_id: i64) -> MutationResult<()> {
        self.packages.delete(package_id).await.map_err(|e| {
            error!("Failed to delete package {}: {}", package_id, e);
            e
        })?;

        let removed = self.cache.write().remove_everywhere(package_id);
        info!("Deleted package {} ({} cached copies dropped)", package_id, removed);
        Ok(())
    }

    // ---- departures ----

    /// Outbound body for a departure: parent set, transport sanitized,
    /// server-owned timestamps stripped.
    fn outbound_departure(departure: Departure, package_id: i64, id: Option<i64>) -> Departure {
        Departure {
            id,
            package_id,
            created_at: None,
            updated_at: None,
            ..departure.sanitized()
        }
    }

    pub async fn submit_departure_create(&self, package_id: i64, departure: Departure) -> MutationResult<Departure> {
        let body = Self::outbound_departure(departure, package_id, None);

        let created = self.departures.create(&body).await.map_err(|e| {
            error!("Failed to create departure for package {}: {}", package_id, e);
            e
        })?;

        if !self.cache.write().append_departure(package_id, created.clone()) {
            debug!("Package {} not cached; departure {:?} not reconciled", package_id, created.id);
        }
        info!("Created departure {:?} for package {}", created.id, package_id);
        Ok(created)
    }

    pub async fn submit_departure_edit(
        &self,
        departure_id: i64,
        package_id: i64,
        departure: Departure,
    ) -> MutationResult<Departure> {
        let body = Self::outbound_departure(departure, package_id, Some(departure_id));

        let updated = self.departures.update(departure_id, &body).await.map_err(|e| {
            error!("Failed to update departure {}: {}", departure_id, e);
            e
        })?;

        self.cache
            .write()
            .replace_departure(package_id, departure_id, updated.clone());
        info!("Updated departure {} of package {}", departure_id, package_id);
        Ok(updated)
    }

    pub async fn submit_departure_duplicate(&self, package_id: i64, seed: Departure) -> MutationResult<Departure> {
        self.submit_departure_create(package_id, seed).await
    }

    pub async fn submit_departure_delete(&self, departure_id: i64, package_id: i64) -> MutationResult<()> {
        self.departures.delete(departure_id).await.map_err(|e| {
            error!("Failed to delete departure {}: {}", departure_id, e);
            e
        })?;

        self.cache.write().remove_departure(package_id, departure_id);
        info!("Deleted departure {} of package {}", departure_id, package_id);
        Ok(())
    }

    /// Replace a package's embedded departures with the backend's current list
    pub async fn refresh_departures(&self, package_id: i64) -> MutationResult<Vec<Departure>> {
        let departures: Vec<Departure> = self
            .departures
            .list()
            .await?
            .into_iter()
            .filter(|d| d.package_id == package_id)
            .collect();

        self.cache.write().set_departures(package_id, departures.clone());
        debug!("Refreshed {} departures of package {}", departures.len(), package_id);
        Ok(departures)
    }

    /// Re-read one departure. One the parent does not list yet is appended.
    pub async fn refresh_departure(&self, departure_id: i64) -> MutationResult<Departure> {
        let departure = self.departures.get(departure_id).await?;
        let package_id = departure.package_id;

        let mut cache = self.cache.write();
        if !cache.replace_departure(package_id, departure_id, departure.clone())
            && !cache.append_departure(package_id, departure.clone())
        {
            debug!("Package {} not cached; departure {} not reconciled", package_id, departure_id);
        }
        Ok(departure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::shared_cache;
    use assert_matches::assert_matches;
    use voyage_catalog::{FlightLeg, TransportMode};
    use voyage_store::memory::{DepartureCall, PackageCall};
    use voyage_store::{InMemoryDepartureRepository, InMemoryPackageRepository};

    struct Fixture {
        packages: Arc<InMemoryPackageRepository>,
        departures: Arc<InMemoryDepartureRepository>,
        cache: SharedPackageCache,
        coordinator: MutationCoordinator,
    }

    fn fixture() -> Fixture {
        let packages = Arc::new(InMemoryPackageRepository::new());
        let departures = Arc::new(InMemoryDepartureRepository::new());
        let cache = shared_cache();
        let coordinator = MutationCoordinator::new(packages.clone(), departures.clone(), cache.clone());
        Fixture { packages, departures, cache, coordinator }
    }

    fn cached_package(id: i64, agency: &str) -> Package {
        Package {
            id: Some(id),
            title: format!("Paquete {}", id),
            agency_ref: Some(agency.to_string()),
            ..Package::blank()
        }
    }

    #[tokio::test]
    async fn test_create_appends_to_loaded_bucket() {
        let f = fixture();
        f.cache.write().set_for("7", vec![]);

        let form = PackageForm::new(Package { title: "Nuevo".to_string(), ..Package::blank() });
        let created = f.coordinator.submit_create("7", form).await.unwrap();

        assert!(created.id.is_some());
        assert_eq!(created.owning_agency(), Some("7"));
        assert_eq!(f.cache.read().get("7").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_ignores_stale_identity() {
        let f = fixture();
        let form = PackageForm::new(cached_package(3, "7"));
        f.coordinator.submit_duplicate("7", form).await.unwrap();

        assert_matches!(&f.packages.calls()[..], [PackageCall::Create { payload }] if payload.field("id").is_none());
    }

    #[tokio::test]
    async fn test_cross_agency_duplicate_is_owned_by_target() {
        let f = fixture();
        f.cache.write().set_for("A", vec![cached_package(3, "A")]);
        f.cache.write().set_for("B", vec![]);

        let seed = cached_package(3, "A").duplicate_seed();
        let created = f.coordinator.submit_duplicate("B", PackageForm::new(seed)).await.unwrap();

        assert_matches!(&f.packages.calls()[..], [PackageCall::Create { payload }] if payload.field("usuario_id") == Some("B"));
        assert_eq!(created.owning_agency(), Some("B"));

        let cache = f.cache.read();
        assert_eq!(cache.get("B").unwrap().len(), 1);
        assert_eq!(cache.get("A").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_image_never_reaches_backend() {
        let f = fixture();
        let form = PackageForm::new(Package::blank()).with_image(voyage_catalog::ImageAttachment {
            file_name: "scan".to_string(),
            mime_type: "scan".to_string(),
            bytes: vec![],
        });

        let result = f.coordinator.submit_create("7", form).await;
        assert_matches!(result, Err(MutationError::Payload(_)));
        assert!(f.packages.calls().is_empty());
    }

    #[tokio::test]
    async fn test_edit_failure_leaves_cache_untouched() {
        let f = fixture();
        f.packages.insert("7", &cached_package(3, "7"));
        f.cache.write().set_for("7", vec![cached_package(3, "7")]);
        let before = f.cache.read().clone();

        f.packages.fail_next(RepositoryError::Backend { status: 500, message: "boom".to_string() });
        let mut edited = cached_package(3, "7");
        edited.title = "Changed".to_string();
        let result = f.coordinator.submit_edit(3, "7", PackageForm::new(edited)).await;

        assert_matches!(result, Err(MutationError::Repository(RepositoryError::Backend { status: 500, .. })));
        assert_eq!(*f.cache.read(), before);
    }

    #[tokio::test]
    async fn test_edit_replaces_in_place() {
        let f = fixture();
        f.packages.insert("7", &cached_package(3, "7"));
        f.cache.write().set_for("7", vec![cached_package(2, "7"), cached_package(3, "7")]);

        let mut edited = cached_package(3, "7");
        edited.nights = 5;
        f.coordinator.submit_edit(3, "7", PackageForm::new(edited)).await.unwrap();

        let cache = f.cache.read();
        let bucket = cache.get("7").unwrap();
        assert_eq!(bucket[1].id, Some(3));
        assert_eq!(bucket[1].nights, 5);
    }

    #[tokio::test]
    async fn test_delete_failure_keeps_package() {
        let f = fixture();
        f.cache.write().set_for("7", vec![cached_package(3, "7")]);

        // Not stored in the repository, so the backend answers NotFound
        assert!(f.coordinator.submit_delete(3).await.is_err());
        assert_eq!(f.cache.read().get("7").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_departure_create_is_sanitized_and_reconciled() {
        let f = fixture();
        f.cache.write().set_for("7", vec![cached_package(3, "7")]);

        let departure = Departure {
            id: Some(99),
            transport: TransportMode::NoTransport,
            outbound: FlightLeg { carrier: Some("AR".to_string()), ..FlightLeg::default() },
            created_at: Some(chrono::Utc::now()),
            ..Departure::default()
        };
        let created = f.coordinator.submit_departure_create(3, departure).await.unwrap();

        let sent = match &f.departures.calls()[..] {
            [DepartureCall::Create { departure }] => departure.clone(),
            other => panic!("unexpected calls: {:?}", other),
        };
        assert!(sent.id.is_none());
        assert!(sent.created_at.is_none());
        assert_eq!(sent.package_id, 3);
        assert!(sent.outbound.is_empty());

        let cache = f.cache.read();
        assert_eq!(cache.find_package("7", 3).unwrap().departures, vec![created]);
    }

    #[tokio::test]
    async fn test_departure_edit_and_delete() {
        let f = fixture();
        let id = f.departures.insert(Departure::blank_for(3));
        let mut package = cached_package(3, "7");
        package.departures = vec![Departure { id: Some(id), package_id: 3, ..Departure::default() }];
        f.cache.write().set_for("7", vec![package]);

        let changed = Departure { capacity: 8, ..Departure::blank_for(3) };
        f.coordinator.submit_departure_edit(id, 3, changed).await.unwrap();
        assert_eq!(f.cache.read().find_package("7", 3).unwrap().departures[0].capacity, 8);

        f.coordinator.submit_departure_delete(id, 3).await.unwrap();
        assert!(f.cache.read().find_package("7", 3).unwrap().departures.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_departures_filters_by_parent() {
        let f = fixture();
        f.departures.insert(Departure::blank_for(3));
        f.departures.insert(Departure::blank_for(3));
        f.departures.insert(Departure::blank_for(4));
        f.cache.write().set_for("7", vec![cached_package(3, "7")]);

        let refreshed = f.coordinator.refresh_departures(3).await.unwrap();
        assert_eq!(refreshed.len(), 2);
        assert_eq!(f.cache.read().find_package("7", 3).unwrap().departures.len(), 2);
    }

    #[tokio::test]
    async fn test_refresh_departure_replaces_cached_copy() {
        let f = fixture();
        let id = f.departures.insert(Departure { capacity: 15, ..Departure::blank_for(3) });
        let mut package = cached_package(3, "7");
        package.departures = vec![
            Departure { id: Some(id), package_id: 3, capacity: 4, ..Departure::default() },
        ];
        f.cache.write().set_for("7", vec![package]);

        let refreshed = f.coordinator.refresh_departure(id).await.unwrap();

        assert_eq!(refreshed.capacity, 15);
        let cache = f.cache.read();
        let departures = &cache.find_package("7", 3).unwrap().departures;
        assert_eq!(departures.len(), 1);
        assert_eq!(departures[0].capacity, 15);
    }

    #[tokio::test]
    async fn test_refresh_departure_appends_when_not_listed() {
        let f = fixture();
        let id = f.departures.insert(Departure { capacity: 6, ..Departure::blank_for(3) });
        f.cache.write().set_for("7", vec![cached_package(3, "7")]);

        f.coordinator.refresh_departure(id).await.unwrap();

        let cache = f.cache.read();
        let departures = &cache.find_package("7", 3).unwrap().departures;
        assert_eq!(departures.len(), 1);
        assert_eq!(departures[0].id, Some(id));
        assert_matches!(f.departures.calls().last(), Some(DepartureCall::Get { id: got }) if *got == id);
    }

    #[tokio::test]
    async fn test_refresh_departure_without_cached_parent() {
        let f = fixture();
        let id = f.departures.insert(Departure::blank_for(4));
        f.cache.write().set_for("7", vec![cached_package(3, "7")]);
        let before = f.cache.read().clone();

        f.coordinator.refresh_departure(id).await.unwrap();
        assert_eq!(*f.cache.read(), before);
    }
}
