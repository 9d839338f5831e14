//! Measurement records and the per-patient history that owns them.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{PatientId, TimestampMs};

/// Check the identifying fields of a measurement before it is stored.
///
/// Patient id and timestamp must be positive and the metric label must be
/// non-empty after trimming. The value is not range-checked here.
pub fn validate_measurement(
    patient_id: PatientId,
    metric: &str,
    timestamp: TimestampMs,
) -> Result<(), CoreError> {
    if patient_id <= 0 {
        return Err(CoreError::InvalidPatientId(patient_id));
    }
    if metric.trim().is_empty() {
        return Err(CoreError::EmptyMetric(patient_id));
    }
    if timestamp <= 0 {
        return Err(CoreError::InvalidTimestamp {
            patient_id,
            timestamp,
        });
    }
    Ok(())
}

/// A single immutable measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub patient_id: PatientId,
    /// Metric label, e.g. `"HeartRate"` (see [`crate::metric_names`]).
    pub metric: String,
    pub value: f64,
    pub timestamp: TimestampMs,
}

impl Record {
    pub fn new(
        patient_id: PatientId,
        metric: impl Into<String>,
        value: f64,
        timestamp: TimestampMs,
    ) -> Self {
        Self {
            patient_id,
            metric: metric.into(),
            value,
            timestamp,
        }
    }
}

/// A patient and their measurement history in insertion order.
///
/// Insertion order is not necessarily timestamp order; use
/// [`records_in_range`](Self::records_in_range) for time-based access.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Patient {
    id: PatientId,
    records: Vec<Record>,
}

impl Patient {
    pub fn new(id: PatientId) -> Self {
        Self {
            id,
            records: Vec::new(),
        }
    }

    pub fn id(&self) -> PatientId {
        self.id
    }

    /// Append a measurement for this patient.
    pub fn add_record(&mut self, metric: impl Into<String>, value: f64, timestamp: TimestampMs) {
        self.records.push(Record::new(self.id, metric, value, timestamp));
    }

    /// All records, in insertion order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Records with `start <= timestamp <= end`, in insertion order.
    ///
    /// Returns an empty vector when `start > end`.
    pub fn records_in_range(&self, start: TimestampMs, end: TimestampMs) -> Vec<Record> {
        if start > end {
            return Vec::new();
        }
        self.records
            .iter()
            .filter(|r| (start..=end).contains(&r.timestamp))
            .cloned()
            .collect()
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }
}
