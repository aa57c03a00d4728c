//! Selection state behind the shared create/edit/duplicate modals.
//!
//! Two independent state machines, one per entity level, each
//! `Idle | Creating | Editing | Duplicating`. A single variant per level
//! makes "selected" and "to duplicate" mutually exclusive by construction.
//! The departures view is a third, separately closable drawer.

use tracing::debug;
use voyage_catalog::{Departure, Package, DUPLICATE_SUFFIX};

use crate::cache::SharedPackageCache;

#[derive(Debug, Clone, Default, PartialEq)]
pub enum PackageWorkflow {
    #[default]
    Idle,
    Creating {
        agency_id: String,
    },
    Editing {
        package: Package,
        /// Taken from the package's owner reference, when it has one
        agency_id: Option<String>,
    },
    Duplicating {
        source: Package,
        agency_id: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum DepartureWorkflow {
    #[default]
    Idle,
    Creating {
        package_id: i64,
        agency_id: String,
    },
    Editing {
        departure: Departure,
        package_id: i64,
        agency_id: String,
    },
    Duplicating {
        source: Departure,
        package_id: i64,
        agency_id: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
struct DeparturesView {
    package: Option<Package>,
    agency_id: Option<String>,
}

/// Single owner of the session's workflow state. Every method runs to
/// completion synchronously, so no caller can observe a half-applied transition.
pub struct WorkflowController {
    cache: SharedPackageCache,
    duplicate_suffix: String,
    package: PackageWorkflow,
    departure: DepartureWorkflow,
    view: DeparturesView,
}

impl WorkflowController {
    pub fn new(cache: SharedPackageCache) -> Self {
        Self::with_duplicate_suffix(cache, DUPLICATE_SUFFIX)
    }

    pub fn with_duplicate_suffix(cache: SharedPackageCache, suffix: &str) -> Self {
        Self {
            cache,
            duplicate_suffix: suffix.to_string(),
            package: PackageWorkflow::Idle,
            departure: DepartureWorkflow::Idle,
            view: DeparturesView::default(),
        }
    }

    // ---- package level ----

    pub fn select_for_edit(&mut self, package: Package) {
        debug!("Editing package {:?}", package.id);
        let agency_id = package.agency_ref.clone();
        self.package = PackageWorkflow::Editing { package, agency_id };
    }

    pub fn select_for_create(&mut self, agency_id: &str) {
        debug!("Creating package for agency {}", agency_id);
        self.package = PackageWorkflow::Creating {
            agency_id: agency_id.to_string(),
        };
    }

    pub fn select_for_duplicate(&mut self, package: Package, agency_id: &str) {
        debug!("Duplicating package {:?} for agency {}", package.id, agency_id);
        self.package = PackageWorkflow::Duplicating {
            source: package,
            agency_id: agency_id.to_string(),
        };
    }

    /// Close the package modal. Discards any in-progress form.
    pub fn close_modal(&mut self) {
        self.package = PackageWorkflow::Idle;
    }

    pub fn package_workflow(&self) -> &PackageWorkflow {
        &self.package
    }

    pub fn selected_package(&self) -> Option<&Package> {
        match &self.package {
            PackageWorkflow::Editing { package, .. } => Some(package),
            _ => None,
        }
    }

    pub fn package_to_duplicate(&self) -> Option<&Package> {
        match &self.package {
            PackageWorkflow::Duplicating { source, .. } => Some(source),
            _ => None,
        }
    }

    pub fn package_modal_open(&self) -> bool {
        self.package != PackageWorkflow::Idle
    }

    /// What the package form is pre-filled with, if the modal is open
    pub fn package_form_seed(&self) -> Option<Package> {
        match &self.package {
            PackageWorkflow::Idle => None,
            PackageWorkflow::Creating { .. } => Some(Package::blank()),
            PackageWorkflow::Editing { package, .. } => Some(package.clone()),
            PackageWorkflow::Duplicating { source, .. } => {
                Some(source.duplicate_seed_with(&self.duplicate_suffix))
            }
        }
    }

    // ---- departures view ----

    pub fn view_departures_of(&mut self, package: Package, agency_id: &str) {
        self.view = DeparturesView {
            package: Some(package),
            agency_id: Some(agency_id.to_string()),
        };
    }

    pub fn close_departures_view(&mut self) {
        self.view = DeparturesView::default();
    }

    pub fn active_package_for_departures_view(&self) -> Option<&Package> {
        self.view.package.as_ref()
    }

    /// Re-read the viewed package from the cache after a mutation landed.
    /// Leaves the view alone when the agency bucket is not loaded.
    pub fn refresh_departures_view(&mut self) {
        let (Some(agency_id), Some(package_id)) = (
            self.view.agency_id.as_deref(),
            self.view.package.as_ref().and_then(|p| p.id),
        ) else {
            return;
        };

        let cache = self.cache.read();
        if cache.get(agency_id).is_some() {
            self.view.package = cache.find_package(agency_id, package_id).cloned();
        }
    }

    // ---- departure level ----

    pub fn select_departure_for_create(&mut self, package_id: i64, agency_id: &str) {
        self.focus_parent(package_id, agency_id);
        self.departure = DepartureWorkflow::Creating {
            package_id,
            agency_id: agency_id.to_string(),
        };
    }

    pub fn select_departure_for_edit(&mut self, departure: Departure, package_id: i64, agency_id: &str) {
        debug!("Editing departure {:?} of package {}", departure.id, package_id);
        self.focus_parent(package_id, agency_id);
        self.departure = DepartureWorkflow::Editing {
            departure,
            package_id,
            agency_id: agency_id.to_string(),
        };
    }

    pub fn select_departure_for_duplicate(&mut self, departure: Departure, package_id: i64, agency_id: &str) {
        debug!("Duplicating departure {:?} of package {}", departure.id, package_id);
        self.focus_parent(package_id, agency_id);
        self.departure = DepartureWorkflow::Duplicating {
            source: departure,
            package_id,
            agency_id: agency_id.to_string(),
        };
    }

    /// Point the departures view at the parent package. A cache miss clears
    /// the viewed package instead of failing.
    fn focus_parent(&mut self, package_id: i64, agency_id: &str) {
        let parent = self.cache.read().find_package(agency_id, package_id).cloned();
        if parent.is_none() {
            debug!("Package {} not cached for agency {}", package_id, agency_id);
        }
        self.view = DeparturesView {
            package: parent,
            agency_id: Some(agency_id.to_string()),
        };
    }

    pub fn clear_departure_selection(&mut self) {
        if matches!(self.departure, DepartureWorkflow::Editing { .. }) {
            self.departure = DepartureWorkflow::Idle;
        }
    }

    pub fn clear_departure_to_duplicate(&mut self) {
        if matches!(self.departure, DepartureWorkflow::Duplicating { .. }) {
            self.departure = DepartureWorkflow::Idle;
        }
    }

    pub fn close_departure_modal(&mut self) {
        self.departure = DepartureWorkflow::Idle;
    }

    pub fn departure_workflow(&self) -> &DepartureWorkflow {
        &self.departure
    }

    pub fn selected_departure(&self) -> Option<&Departure> {
        match &self.departure {
            DepartureWorkflow::Editing { departure, .. } => Some(departure),
            _ => None,
        }
    }

    pub fn departure_to_duplicate(&self) -> Option<&Departure> {
        match &self.departure {
            DepartureWorkflow::Duplicating { source, .. } => Some(source),
            _ => None,
        }
    }

    pub fn departure_modal_open(&self) -> bool {
        self.departure != DepartureWorkflow::Idle
    }

    pub fn departure_form_seed(&self) -> Option<Departure> {
        match &self.departure {
            DepartureWorkflow::Idle => None,
            DepartureWorkflow::Creating { package_id, .. } => Some(Departure::blank_for(*package_id)),
            DepartureWorkflow::Editing { departure, .. } => Some(departure.clone()),
            DepartureWorkflow::Duplicating { source, .. } => Some(source.duplicate_seed()),
        }
    }

    // ---- shared ----

    pub fn modal_open(&self) -> bool {
        self.package_modal_open() || self.departure_modal_open()
    }

    /// Agency the current operation is scoped to.
    ///
    /// Each drawer owns its own agency, so closing one never clears the
    /// context of the other while it is still open.
    pub fn agency_context_id(&self) -> Option<&str> {
        let from_package = match &self.package {
            PackageWorkflow::Idle => None,
            PackageWorkflow::Creating { agency_id } => Some(agency_id.as_str()),
            PackageWorkflow::Editing { agency_id, .. } => agency_id.as_deref(),
            PackageWorkflow::Duplicating { agency_id, .. } => Some(agency_id.as_str()),
        };
        let from_departure = match &self.departure {
            DepartureWorkflow::Idle => None,
            DepartureWorkflow::Creating { agency_id, .. }
            | DepartureWorkflow::Editing { agency_id, .. }
            | DepartureWorkflow::Duplicating { agency_id, .. } => Some(agency_id.as_str()),
        };

        from_package
            .or(from_departure)
            .or(self.view.agency_id.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::shared_cache;
    use assert_matches::assert_matches;

    fn package(id: i64, owner: Option<&str>) -> Package {
        Package {
            id: Some(id),
            title: format!("Paquete {}", id),
            agency_ref: owner.map(str::to_string),
            ..Package::default()
        }
    }

    #[test]
    fn test_starts_idle() {
        let controller = WorkflowController::new(shared_cache());
        assert!(!controller.modal_open());
        assert!(controller.package_form_seed().is_none());
        assert!(controller.agency_context_id().is_none());
    }

    #[test]
    fn test_edit_derives_agency_from_owner() {
        let mut controller = WorkflowController::new(shared_cache());
        controller.select_for_edit(package(3, Some("7")));

        assert!(controller.package_modal_open());
        assert_eq!(controller.selected_package().and_then(|p| p.id), Some(3));
        assert!(controller.package_to_duplicate().is_none());
        assert_eq!(controller.agency_context_id(), Some("7"));
    }

    #[test]
    fn test_selection_and_duplicate_are_exclusive() {
        let mut controller = WorkflowController::new(shared_cache());
        controller.select_for_edit(package(3, Some("7")));
        controller.select_for_duplicate(package(4, Some("7")), "7");

        assert!(controller.selected_package().is_none());
        assert_eq!(controller.package_to_duplicate().and_then(|p| p.id), Some(4));

        controller.select_for_edit(package(5, None));
        assert!(controller.package_to_duplicate().is_none());
        assert_eq!(controller.selected_package().and_then(|p| p.id), Some(5));
    }

    #[test]
    fn test_create_seed_is_blank() {
        let mut controller = WorkflowController::new(shared_cache());
        controller.select_for_edit(package(3, Some("7")));
        controller.select_for_create("8");

        assert_matches!(controller.package_workflow(), PackageWorkflow::Creating { agency_id } if agency_id == "8");
        let seed = controller.package_form_seed().unwrap();
        assert!(seed.id.is_none());
        assert!(seed.title.is_empty());
        assert_eq!(controller.agency_context_id(), Some("8"));
    }

    #[test]
    fn test_duplicate_seed_uses_configured_suffix() {
        let mut controller = WorkflowController::with_duplicate_suffix(shared_cache(), " (copia)");
        controller.select_for_duplicate(package(3, Some("7")), "7");

        let seed = controller.package_form_seed().unwrap();
        assert_eq!(seed.title, "Paquete 3 (copia)");
        assert!(seed.id.is_none());
        assert!(seed.active);
    }

    #[test]
    fn test_close_modal_keeps_departures_view_context() {
        let mut controller = WorkflowController::new(shared_cache());
        controller.view_departures_of(package(3, Some("A")), "A");
        controller.select_for_create("B");
        assert_eq!(controller.agency_context_id(), Some("B"));

        controller.close_modal();
        assert!(!controller.modal_open());
        assert_eq!(controller.agency_context_id(), Some("A"));
        assert!(controller.active_package_for_departures_view().is_some());

        controller.close_departures_view();
        assert!(controller.agency_context_id().is_none());
        assert!(controller.active_package_for_departures_view().is_none());
    }

    #[test]
    fn test_close_departures_view_keeps_package_modal() {
        let mut controller = WorkflowController::new(shared_cache());
        controller.view_departures_of(package(3, Some("A")), "A");
        controller.select_for_duplicate(package(3, Some("A")), "A");

        controller.close_departures_view();
        assert!(controller.package_modal_open());
        assert_eq!(controller.agency_context_id(), Some("A"));
    }

    #[test]
    fn test_departure_edit_resolves_parent_from_cache() {
        let cache = shared_cache();
        cache.write().set_for("A", vec![package(3, Some("A"))]);
        let mut controller = WorkflowController::new(cache);

        let departure = Departure { id: Some(11), package_id: 3, ..Departure::default() };
        controller.select_departure_for_edit(departure, 3, "A");

        assert!(controller.departure_modal_open());
        assert_eq!(controller.selected_departure().and_then(|d| d.id), Some(11));
        assert_eq!(controller.active_package_for_departures_view().and_then(|p| p.id), Some(3));
    }

    #[test]
    fn test_departure_edit_cache_miss_clears_view() {
        let mut controller = WorkflowController::new(shared_cache());
        controller.view_departures_of(package(9, Some("A")), "A");

        let departure = Departure { id: Some(11), package_id: 3, ..Departure::default() };
        controller.select_departure_for_edit(departure, 3, "A");

        assert!(controller.active_package_for_departures_view().is_none());
        assert!(controller.departure_modal_open());
        assert_eq!(controller.agency_context_id(), Some("A"));
    }

    #[test]
    fn test_departure_clears_are_targeted() {
        let mut controller = WorkflowController::new(shared_cache());
        let departure = Departure { id: Some(11), package_id: 3, ..Departure::default() };

        controller.select_departure_for_duplicate(departure.clone(), 3, "A");
        controller.clear_departure_selection();
        assert!(controller.departure_to_duplicate().is_some());
        controller.clear_departure_to_duplicate();
        assert!(!controller.departure_modal_open());

        controller.select_departure_for_edit(departure, 3, "A");
        controller.clear_departure_to_duplicate();
        assert!(controller.selected_departure().is_some());
        controller.clear_departure_selection();
        assert_matches!(controller.departure_workflow(), DepartureWorkflow::Idle);
    }

    #[test]
    fn test_departure_duplicate_seed() {
        let mut controller = WorkflowController::new(shared_cache());
        let departure = Departure {
            id: Some(11),
            package_id: 3,
            capacity: 40,
            created_at: Some(chrono::Utc::now()),
            ..Departure::default()
        };
        controller.select_departure_for_duplicate(departure, 3, "A");

        let seed = controller.departure_form_seed().unwrap();
        assert!(seed.id.is_none());
        assert!(seed.created_at.is_none());
        assert_eq!(seed.capacity, 40);
    }

    #[test]
    fn test_departure_create_seed() {
        let mut controller = WorkflowController::new(shared_cache());
        controller.select_departure_for_create(3, "A");
        let seed = controller.departure_form_seed().unwrap();
        assert_eq!(seed.package_id, 3);
        assert!(seed.id.is_none());
    }

    #[test]
    fn test_refresh_departures_view() {
        let cache = shared_cache();
        cache.write().set_for("A", vec![package(3, Some("A"))]);
        let mut controller = WorkflowController::new(cache.clone());
        controller.view_departures_of(package(3, Some("A")), "A");

        cache.write().append_departure(3, Departure { id: Some(1), package_id: 3, ..Departure::default() });
        controller.refresh_departures_view();
        assert_eq!(controller.active_package_for_departures_view().unwrap().departures.len(), 1);

        cache.write().remove_everywhere(3);
        controller.refresh_departures_view();
        assert!(controller.active_package_for_departures_view().is_none());
    }
}
