//! In-process repositories.
//!
//! They behave like the REST backend closely enough to drive the workflow
//! layer without a network: ids are assigned on create, unknown ids are
//! `NotFound`, and every call is recorded so callers can check which
//! endpoint a workflow ended up hitting. Failures can be queued up front.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, VecDeque};
use voyage_catalog::{Departure, Package, PackagePayload, RawPackage};
use voyage_core::{DepartureRepository, PackageRepository, RepositoryError, RepositoryResult};

#[derive(Debug, Clone, PartialEq)]
pub enum PackageCall {
    List { agency_id: String },
    Create { payload: PackagePayload },
    Update { id: i64, payload: PackagePayload },
    Delete { id: i64 },
}

#[derive(Default)]
struct PackageState {
    // (owning agency, wire record)
    records: Vec<(String, Value)>,
    next_id: i64,
    calls: Vec<PackageCall>,
    failures: VecDeque<RepositoryError>,
}

pub struct InMemoryPackageRepository {
    state: Mutex<PackageState>,
}

impl InMemoryPackageRepository {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(PackageState {
                next_id: 1,
                ..PackageState::default()
            }),
        }
    }

    /// Seed a record exactly as the backend would return it.
    pub fn insert_raw(&self, agency_id: &str, record: Value) {
        let mut state = self.state.lock();
        if let Some(id) = record.get("id").and_then(Value::as_i64) {
            state.next_id = state.next_id.max(id + 1);
        }
        state.records.push((agency_id.to_string(), record));
    }

    pub fn insert(&self, agency_id: &str, package: &Package) {
        if let Ok(record) = serde_json::to_value(package) {
            self.insert_raw(agency_id, record);
        }
    }

    /// The next call, whatever it is, fails with `error`.
    pub fn fail_next(&self, error: RepositoryError) {
        self.state.lock().failures.push_back(error);
    }

    pub fn calls(&self) -> Vec<PackageCall> {
        self.state.lock().calls.clone()
    }

    fn begin(&self, call: PackageCall) -> RepositoryResult<parking_lot::MutexGuard<'_, PackageState>> {
        let mut state = self.state.lock();
        state.calls.push(call);
        match state.failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(state),
        }
    }
}

/// Rebuild a wire record from multipart text fields the way the backend does.
fn record_from_payload(id: i64, payload: &PackagePayload) -> Value {
    let mut record = Map::new();
    record.insert("id".to_string(), Value::from(id));

    for (key, value) in &payload.fields {
        let parsed = match *key {
            "cant_noches" => value.parse::<u64>().map(Value::from).unwrap_or(Value::Null),
            "activo" => Value::from(value == "true"),
            "hotel_id" => {
                let hotel_id = value.parse::<i64>().map(Value::from).unwrap_or(Value::Null);
                record.insert("hotel".to_string(), serde_json::json!({ "id": hotel_id }));
                continue;
            }
            _ => Value::from(value.clone()),
        };
        record.insert(key.to_string(), parsed);
    }

    if let Some(image) = &payload.image {
        record.insert("imagen".to_string(), Value::from(format!("paquetes/{}", image.file_name)));
    }

    Value::Object(record)
}

fn decode(record: &Value) -> RepositoryResult<RawPackage> {
    serde_json::from_value(record.clone()).map_err(|e| RepositoryError::Decode(e.to_string()))
}

impl Default for InMemoryPackageRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PackageRepository for InMemoryPackageRepository {
    async fn list(&self, agency_id: &str) -> RepositoryResult<Vec<RawPackage>> {
        let state = self.begin(PackageCall::List {
            agency_id: agency_id.to_string(),
        })?;
        let listed = state
            .records
            .iter()
            .filter(|(owner, _)| owner == agency_id)
            .map(|(_, record)| decode(record))
            .collect();
        listed
    }

    async fn create(&self, payload: PackagePayload) -> RepositoryResult<RawPackage> {
        let mut state = self.begin(PackageCall::Create {
            payload: payload.clone(),
        })?;
        let id = state.next_id;
        state.next_id += 1;

        let record = record_from_payload(id, &payload);
        let owner = payload.field("usuario_id").unwrap_or_default().to_string();
        let raw = decode(&record)?;
        state.records.push((owner, record));
        Ok(raw)
    }

    async fn update(&self, id: i64, payload: PackagePayload) -> RepositoryResult<RawPackage> {
        let mut state = self.begin(PackageCall::Update {
            id,
            payload: payload.clone(),
        })?;
        let record = record_from_payload(id, &payload);
        let raw = decode(&record)?;

        let slot = state
            .records
            .iter_mut()
            .find(|(_, existing)| existing.get("id").and_then(Value::as_i64) == Some(id))
            .ok_or_else(|| RepositoryError::NotFound(format!("paquete {}", id)))?;
        slot.1 = record;
        Ok(raw)
    }

    async fn delete(&self, id: i64) -> RepositoryResult<()> {
        let mut state = self.begin(PackageCall::Delete { id })?;
        let before = state.records.len();
        state
            .records
            .retain(|(_, record)| record.get("id").and_then(Value::as_i64) != Some(id));
        if state.records.len() == before {
            return Err(RepositoryError::NotFound(format!("paquete {}", id)));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DepartureCall {
    List,
    Get { id: i64 },
    Create { departure: Departure },
    Update { id: i64, departure: Departure },
    Delete { id: i64 },
}

#[derive(Default)]
struct DepartureState {
    records: BTreeMap<i64, Departure>,
    next_id: i64,
    calls: Vec<DepartureCall>,
    failures: VecDeque<RepositoryError>,
}

pub struct InMemoryDepartureRepository {
    state: Mutex<DepartureState>,
}

impl InMemoryDepartureRepository {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(DepartureState {
                next_id: 1,
                ..DepartureState::default()
            }),
        }
    }

    /// Seed a stored departure. Departures without identity get the next id.
    pub fn insert(&self, mut departure: Departure) -> i64 {
        let mut state = self.state.lock();
        let id = match departure.id {
            Some(id) => id,
            None => state.next_id,
        };
        state.next_id = state.next_id.max(id + 1);
        departure.id = Some(id);
        state.records.insert(id, departure);
        id
    }

    pub fn fail_next(&self, error: RepositoryError) {
        self.state.lock().failures.push_back(error);
    }

    pub fn calls(&self) -> Vec<DepartureCall> {
        self.state.lock().calls.clone()
    }

    fn begin(&self, call: DepartureCall) -> RepositoryResult<parking_lot::MutexGuard<'_, DepartureState>> {
        let mut state = self.state.lock();
        state.calls.push(call);
        match state.failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(state),
        }
    }
}

impl Default for InMemoryDepartureRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DepartureRepository for InMemoryDepartureRepository {
    async fn list(&self) -> RepositoryResult<Vec<Departure>> {
        let state = self.begin(DepartureCall::List)?;
        Ok(state.records.values().cloned().collect())
    }

    async fn get(&self, id: i64) -> RepositoryResult<Departure> {
        let state = self.begin(DepartureCall::Get { id })?;
        state
            .records
            .get(&id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(format!("salida {}", id)))
    }

    async fn create(&self, departure: &Departure) -> RepositoryResult<Departure> {
        let mut state = self.begin(DepartureCall::Create {
            departure: departure.clone(),
        })?;
        let id = state.next_id;
        state.next_id += 1;

        let now = Utc::now();
        let stored = Departure {
            id: Some(id),
            created_at: Some(now),
            updated_at: Some(now),
            ..departure.clone()
        };
        state.records.insert(id, stored.clone());
        Ok(stored)
    }

    async fn update(&self, id: i64, departure: &Departure) -> RepositoryResult<Departure> {
        let mut state = self.begin(DepartureCall::Update {
            id,
            departure: departure.clone(),
        })?;
        let existing = state
            .records
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound(format!("salida {}", id)))?;

        *existing = Departure {
            id: Some(id),
            created_at: existing.created_at,
            updated_at: Some(Utc::now()),
            ..departure.clone()
        };
        Ok(existing.clone())
    }

    async fn delete(&self, id: i64) -> RepositoryResult<()> {
        let mut state = self.begin(DepartureCall::Delete { id })?;
        state
            .records
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::NotFound(format!("salida {}", id)))
    }
}
