use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use voyage_catalog::{Departure, Package};

/// Handle shared by the loader, the workflow controller and the mutation coordinator
pub type SharedPackageCache = Arc<RwLock<AgencyPackageCache>>;

pub fn shared_cache() -> SharedPackageCache {
    Arc::new(RwLock::new(AgencyPackageCache::new()))
}

/// Packages per agency, with independent loading/error flags per agency.
///
/// An agency id is a key of the package map iff it has been fetched at least
/// once: `None` from [`get`](Self::get) means "never fetched", an empty slice
/// means "fetched, no packages".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgencyPackageCache {
    packages_by_agency: HashMap<String, Vec<Package>>,
    loading_by_agency: HashMap<String, bool>,
    error_by_agency: HashMap<String, String>,
}

impl AgencyPackageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, agency_id: &str) -> Option<&[Package]> {
        self.packages_by_agency.get(agency_id).map(Vec::as_slice)
    }

    /// Replace an agency's whole bucket
    pub fn set_for(&mut self, agency_id: &str, packages: Vec<Package>) {
        self.packages_by_agency.insert(agency_id.to_string(), packages);
    }

    /// Append a freshly created package.
    ///
    /// A bucket that was never fetched stays absent so the next
    /// fetch-if-absent still loads the full list from the backend.
    pub fn append_for(&mut self, agency_id: &str, package: Package) -> bool {
        match self.packages_by_agency.get_mut(agency_id) {
            Some(bucket) => {
                bucket.push(package);
                true
            }
            None => false,
        }
    }

    /// Replace one package in place. No-op when the id is not in the bucket.
    pub fn replace_one(&mut self, agency_id: &str, package_id: i64, updated: Package) -> bool {
        let Some(bucket) = self.packages_by_agency.get_mut(agency_id) else {
            return false;
        };
        match bucket.iter_mut().find(|p| p.id == Some(package_id)) {
            Some(slot) => {
                *slot = updated;
                true
            }
            None => false,
        }
    }

    /// Drop a package from every bucket that holds it. Returns how many copies were removed.
    pub fn remove_everywhere(&mut self, package_id: i64) -> usize {
        let mut removed = 0;
        for bucket in self.packages_by_agency.values_mut() {
            let before = bucket.len();
            bucket.retain(|p| p.id != Some(package_id));
            removed += before - bucket.len();
        }
        removed
    }

    /// Forget an agency's bucket so the next fetch-if-absent reloads it.
    pub fn invalidate(&mut self, agency_id: &str) {
        self.packages_by_agency.remove(agency_id);
    }

    pub fn set_loading(&mut self, agency_id: &str, loading: bool) {
        self.loading_by_agency.insert(agency_id.to_string(), loading);
    }

    pub fn is_loading(&self, agency_id: &str) -> bool {
        self.loading_by_agency.get(agency_id).copied().unwrap_or(false)
    }

    pub fn set_error(&mut self, agency_id: &str, message: Option<String>) {
        match message {
            Some(message) => {
                self.error_by_agency.insert(agency_id.to_string(), message);
            }
            None => {
                self.error_by_agency.remove(agency_id);
            }
        }
    }

    pub fn error(&self, agency_id: &str) -> Option<&str> {
        self.error_by_agency.get(agency_id).map(String::as_str)
    }

    pub fn find_package(&self, agency_id: &str, package_id: i64) -> Option<&Package> {
        self.get(agency_id)?.iter().find(|p| p.id == Some(package_id))
    }

    fn packages_mut(&mut self, package_id: i64) -> impl Iterator<Item = &mut Package> {
        self.packages_by_agency
            .values_mut()
            .flat_map(|bucket| bucket.iter_mut())
            .filter(move |p| p.id == Some(package_id))
    }

    // Departure reconciliation. A package may be cached under more than one
    // agency view, so every copy is updated. Each returns whether any copy changed.

    pub fn append_departure(&mut self, package_id: i64, departure: Departure) -> bool {
        let mut touched = false;
        for package in self.packages_mut(package_id) {
            package.departures.push(departure.clone());
            touched = true;
        }
        touched
    }

    pub fn replace_departure(&mut self, package_id: i64, departure_id: i64, departure: Departure) -> bool {
        let mut touched = false;
        for package in self.packages_mut(package_id) {
            if let Some(slot) = package
                .departures
                .iter_mut()
                .find(|d| d.id == Some(departure_id))
            {
                *slot = departure.clone();
                touched = true;
            }
        }
        touched
    }

    pub fn remove_departure(&mut self, package_id: i64, departure_id: i64) -> bool {
        let mut touched = false;
        for package in self.packages_mut(package_id) {
            let before = package.departures.len();
            package.departures.retain(|d| d.id != Some(departure_id));
            touched |= package.departures.len() != before;
        }
        touched
    }

    pub fn set_departures(&mut self, package_id: i64, departures: Vec<Departure>) -> bool {
        let mut touched = false;
        for package in self.packages_mut(package_id) {
            package.departures = departures.clone();
            touched = true;
        }
        touched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package(id: i64, title: &str) -> Package {
        Package {
            id: Some(id),
            title: title.to_string(),
            ..Package::default()
        }
    }

    #[test]
    fn test_never_fetched_vs_empty() {
        let mut cache = AgencyPackageCache::new();
        assert!(cache.get("7").is_none());

        cache.set_for("7", vec![]);
        assert_eq!(cache.get("7").map(|b| b.len()), Some(0));
    }

    #[test]
    fn test_flags_are_per_agency() {
        let mut cache = AgencyPackageCache::new();
        cache.set_loading("A", true);
        cache.set_error("A", Some("timeout".to_string()));

        assert!(cache.is_loading("A"));
        assert!(!cache.is_loading("B"));
        assert_eq!(cache.error("A"), Some("timeout"));
        assert_eq!(cache.error("B"), None);

        cache.set_error("A", None);
        assert_eq!(cache.error("A"), None);
    }

    #[test]
    fn test_append_requires_fetched_bucket() {
        let mut cache = AgencyPackageCache::new();
        assert!(!cache.append_for("7", package(1, "Uno")));
        assert!(cache.get("7").is_none());

        cache.set_for("7", vec![package(1, "Uno")]);
        assert!(cache.append_for("7", package(2, "Dos")));
        let ids: Vec<_> = cache.get("7").unwrap().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![Some(1), Some(2)]);
    }

    #[test]
    fn test_replace_one_missing_id_is_noop() {
        let mut cache = AgencyPackageCache::new();
        cache.set_for("7", vec![package(1, "Uno")]);
        let before = cache.clone();

        assert!(!cache.replace_one("7", 99, package(99, "Nope")));
        assert_eq!(cache, before);

        assert!(cache.replace_one("7", 1, package(1, "Uno bis")));
        assert_eq!(cache.get("7").unwrap()[0].title, "Uno bis");
    }

    #[test]
    fn test_remove_everywhere() {
        let mut cache = AgencyPackageCache::new();
        cache.set_for("A", vec![package(42, "X"), package(43, "Y")]);
        cache.set_for("B", vec![package(44, "Z")]);

        assert_eq!(cache.remove_everywhere(42), 1);
        assert_eq!(cache.get("A").unwrap().len(), 1);
        assert_eq!(cache.get("B").unwrap().len(), 1);
        assert_eq!(cache.remove_everywhere(42), 0);
    }

    #[test]
    fn test_departure_reconciliation() {
        let mut cache = AgencyPackageCache::new();
        cache.set_for("A", vec![package(1, "Uno")]);

        let departure = Departure {
            id: Some(5),
            package_id: 1,
            ..Departure::default()
        };
        assert!(cache.append_departure(1, departure.clone()));
        assert!(!cache.append_departure(2, departure.clone()));

        let changed = Departure { capacity: 30, ..departure };
        assert!(cache.replace_departure(1, 5, changed));
        assert_eq!(cache.find_package("A", 1).unwrap().departures[0].capacity, 30);

        assert!(cache.remove_departure(1, 5));
        assert!(cache.find_package("A", 1).unwrap().departures.is_empty());
    }

    #[test]
    fn test_invalidate_returns_to_never_fetched() {
        let mut cache = AgencyPackageCache::new();
        cache.set_for("A", vec![package(1, "Uno")]);
        cache.invalidate("A");
        assert!(cache.get("A").is_none());
        assert!(cache.find_package("A", 1).is_none());
    }
}
