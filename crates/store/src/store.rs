//! The shared patient/measurement store.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::Utc;
use vitals_core::types::Timestamp;
use vitals_core::{validate_measurement, CoreError, Patient, PatientId, Record, TimestampMs};

use crate::listener::{ListenerId, ListenerRegistry, StoreListener};
use crate::stats::StoreStatistics;

/// Result of [`DataStore::add_record`].
///
/// Invalid and duplicate submissions are not errors from the caller's
/// point of view; they are reported here and counted.
#[derive(Debug, Clone, PartialEq)]
pub enum AddOutcome {
    /// The record was stored. `new_patient` is set when this was the
    /// patient's first record.
    Added { new_patient: bool },
    /// An identical record was already stored.
    Duplicate,
    /// The measurement failed validation and was dropped.
    Rejected(CoreError),
}

/// Composite identity used to detect re-submitted measurements.
///
/// Values are compared by their six-decimal rendering, which stays exact
/// for magnitudes an integer scale would overflow.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DuplicateKey {
    patient_id: PatientId,
    metric: String,
    timestamp: TimestampMs,
    value: String,
}

impl DuplicateKey {
    fn new(patient_id: PatientId, metric: &str, timestamp: TimestampMs, value: f64) -> Self {
        Self {
            patient_id,
            metric: metric.to_string(),
            timestamp,
            value: format!("{value:.6}"),
        }
    }
}

#[derive(Default)]
struct StoreState {
    patients: HashMap<PatientId, Patient>,
    seen: HashSet<DuplicateKey>,
    total_records: u64,
    duplicates_rejected: u64,
    last_update: Option<Timestamp>,
}

/// Thread-safe store of patient measurement histories.
///
/// Reads take a shared lock and may run in parallel; every mutation takes
/// the exclusive lock for its whole duration. Listener notification
/// happens after the lock is released.
#[derive(Default)]
pub struct DataStore {
    state: RwLock<StoreState>,
    listeners: ListenerRegistry,
}

impl DataStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor returning a shareable handle.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Validate and store one measurement.
    ///
    /// The duplicate check and the insert happen under the same write lock,
    /// so two concurrent submissions of the same measurement store exactly
    /// one record.
    pub fn add_record(
        &self,
        patient_id: PatientId,
        value: f64,
        metric: &str,
        timestamp: TimestampMs,
    ) -> AddOutcome {
        if let Err(e) = validate_measurement(patient_id, metric, timestamp) {
            tracing::warn!(error = %e, "Skipping invalid measurement");
            return AddOutcome::Rejected(e);
        }

        let key = DuplicateKey::new(patient_id, metric, timestamp, value);

        let (record, created) = {
            let mut state = self.write();

            if !state.seen.insert(key) {
                state.duplicates_rejected += 1;
                tracing::debug!(
                    patient_id,
                    metric,
                    timestamp,
                    value,
                    "Duplicate record rejected"
                );
                return AddOutcome::Duplicate;
            }

            let mut is_new = false;
            let patient = state.patients.entry(patient_id).or_insert_with(|| {
                is_new = true;
                Patient::new(patient_id)
            });
            patient.add_record(metric, value, timestamp);
            let created = is_new.then(|| patient.clone());

            state.total_records += 1;
            state.last_update = Some(Utc::now());

            if is_new {
                tracing::info!(patient_id, "New patient created");
            }

            (Record::new(patient_id, metric, value, timestamp), created)
        };

        self.listeners.notify(patient_id, &record, created.as_ref());

        AddOutcome::Added {
            new_patient: created.is_some(),
        }
    }

    /// Records for `patient_id` with `start <= timestamp <= end`.
    ///
    /// Empty when the patient is unknown or `start > end`.
    pub fn get_records(
        &self,
        patient_id: PatientId,
        start: TimestampMs,
        end: TimestampMs,
    ) -> Vec<Record> {
        self.read()
            .patients
            .get(&patient_id)
            .map(|p| p.records_in_range(start, end))
            .unwrap_or_default()
    }

    /// Snapshot of every patient.
    pub fn all_patients(&self) -> Vec<Patient> {
        self.read().patients.values().cloned().collect()
    }

    pub fn patient_count(&self) -> usize {
        self.read().patients.len()
    }

    pub fn has_patient(&self, patient_id: PatientId) -> bool {
        self.read().patients.contains_key(&patient_id)
    }

    /// Snapshot of one patient, if known.
    pub fn get_patient(&self, patient_id: PatientId) -> Option<Patient> {
        self.read().patients.get(&patient_id).cloned()
    }

    /// Drop all patients, duplicate history and counters.
    pub fn clear(&self) {
        let mut state = self.write();
        *state = StoreState::default();
        tracing::info!("All patient data cleared");
    }

    /// Register a listener. Keep the returned id to remove it later.
    pub fn add_listener(&self, listener: Arc<dyn StoreListener>) -> ListenerId {
        self.listeners.add(listener)
    }

    /// Unregister a listener. Returns `false` if it was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    pub fn statistics(&self) -> StoreStatistics {
        let state = self.read();
        StoreStatistics {
            patients: state.patients.len(),
            total_records: state.total_records,
            duplicates_rejected: state.duplicates_rejected,
            last_update: state.last_update,
            listeners: self.listeners.len(),
        }
    }

    pub fn duplicates_rejected(&self) -> u64 {
        self.read().duplicates_rejected
    }

    /// Whether a record was accepted within the last `max_age`.
    pub fn is_data_fresh(&self, max_age: Duration) -> bool {
        match self.read().last_update {
            Some(last) => (Utc::now() - last).to_std().unwrap_or_default() <= max_age,
            None => false,
        }
    }

    /// Up to `limit` records across all patients, newest timestamp first.
    pub fn recent_records(&self, limit: usize) -> Vec<Record> {
        let mut records: Vec<Record> = self
            .read()
            .patients
            .values()
            .flat_map(|p| p.records().iter().cloned())
            .collect();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        records.truncate(limit);
        records
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
