use parking_lot::RwLockReadGuard;
use std::sync::Arc;
use tracing::debug;
use voyage_catalog::{Departure, Package, PackageForm};
use voyage_core::{DepartureRepository, PackageRepository};

use crate::cache::{shared_cache, AgencyPackageCache, SharedPackageCache};
use crate::controller::{DepartureWorkflow, PackageWorkflow, WorkflowController};
use crate::coordinator::{MutationCoordinator, MutationError};
use crate::loader::{FetchOutcome, PackageLoader};

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("No form is open")]
    NoOpenForm,

    #[error("Package being edited has no identity")]
    MissingIdentity,

    #[error("No agency context for the open form")]
    MissingAgencyContext,

    #[error(transparent)]
    Mutation(#[from] MutationError),
}

/// One operator session: the cache, its loader, the workflow state and the
/// mutation coordinator wired around the same shared cache.
///
/// Submissions close the matching modal only when the backend accepted them;
/// on failure the modal stays open with the workflow state unchanged.
pub struct ConsoleSession {
    cache: SharedPackageCache,
    loader: PackageLoader,
    workflow: WorkflowController,
    mutations: MutationCoordinator,
}

impl ConsoleSession {
    pub fn new(
        packages: Arc<dyn PackageRepository>,
        departures: Arc<dyn DepartureRepository>,
        duplicate_suffix: &str,
    ) -> Self {
        let cache = shared_cache();
        Self {
            loader: PackageLoader::new(packages.clone(), cache.clone()),
            workflow: WorkflowController::with_duplicate_suffix(cache.clone(), duplicate_suffix),
            mutations: MutationCoordinator::new(packages, departures, cache.clone()),
            cache,
        }
    }

    pub fn cache(&self) -> RwLockReadGuard<'_, AgencyPackageCache> {
        self.cache.read()
    }

    pub fn workflow(&self) -> &WorkflowController {
        &self.workflow
    }

    pub fn workflow_mut(&mut self) -> &mut WorkflowController {
        &mut self.workflow
    }

    pub fn loader(&self) -> &PackageLoader {
        &self.loader
    }

    pub fn mutations(&self) -> &MutationCoordinator {
        &self.mutations
    }

    /// Make sure an agency's packages are loaded
    pub async fn open_agency(&self, agency_id: &str) -> FetchOutcome {
        self.loader.fetch_if_absent(agency_id).await
    }

    pub async fn submit_package_form(&mut self, form: PackageForm) -> Result<Package, SubmitError> {
        let saved = match self.workflow.package_workflow().clone() {
            PackageWorkflow::Idle => return Err(SubmitError::NoOpenForm),
            PackageWorkflow::Creating { agency_id } => {
                self.mutations.submit_create(&agency_id, form).await?
            }
            PackageWorkflow::Duplicating { agency_id, .. } => {
                self.mutations.submit_duplicate(&agency_id, form).await?
            }
            PackageWorkflow::Editing { package, agency_id } => {
                let package_id = package.id.ok_or(SubmitError::MissingIdentity)?;
                let agency_id = agency_id
                    .or_else(|| self.workflow.agency_context_id().map(str::to_string))
                    .ok_or(SubmitError::MissingAgencyContext)?;
                self.mutations.submit_edit(package_id, &agency_id, form).await?
            }
        };

        self.workflow.close_modal();
        self.workflow.refresh_departures_view();
        debug!("Package form for {:?} submitted", saved.id);
        Ok(saved)
    }

    pub async fn submit_departure_form(&mut self, departure: Departure) -> Result<Departure, SubmitError> {
        let saved = match self.workflow.departure_workflow().clone() {
            DepartureWorkflow::Idle => return Err(SubmitError::NoOpenForm),
            DepartureWorkflow::Creating { package_id, .. } => {
                self.mutations.submit_departure_create(package_id, departure).await?
            }
            DepartureWorkflow::Duplicating { package_id, .. } => {
                self.mutations.submit_departure_duplicate(package_id, departure).await?
            }
            DepartureWorkflow::Editing { departure: selected, package_id, .. } => {
                let departure_id = selected.id.ok_or(SubmitError::MissingIdentity)?;
                self.mutations
                    .submit_departure_edit(departure_id, package_id, departure)
                    .await?
            }
        };

        self.workflow.close_departure_modal();
        self.workflow.refresh_departures_view();
        debug!("Departure form for {:?} submitted", saved.id);
        Ok(saved)
    }

    pub async fn delete_package(&mut self, package_id: i64) -> Result<(), SubmitError> {
        self.mutations.submit_delete(package_id).await?;
        self.workflow.refresh_departures_view();
        Ok(())
    }

    pub async fn delete_departure(&mut self, departure_id: i64, package_id: i64) -> Result<(), SubmitError> {
        self.mutations
            .submit_departure_delete(departure_id, package_id)
            .await?;
        self.workflow.refresh_departures_view();
        Ok(())
    }
}
