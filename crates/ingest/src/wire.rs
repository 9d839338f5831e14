//! Line-oriented measurement wire format.
//!
//! Each message is one line with four comma-separated fields in fixed
//! order: `patientId,timestamp,metricType,value`, e.g.
//! `123,1609459200000,HeartRate,75.5`. Surrounding whitespace on the line
//! and on each field is ignored.

use vitals_core::metric_names::{is_known_metric, METRIC_HEART_RATE};
use vitals_core::{PatientId, TimestampMs};

/// Number of fields in a wire message.
pub const FIELD_COUNT: usize = 4;

/// Timestamps further than this ahead of the local clock are logged.
const FUTURE_TOLERANCE_MS: TimestampMs = 86_400_000;

/// Plausible heart-rate range; values outside it are logged, not rejected.
const HEART_RATE_RANGE: std::ops::RangeInclusive<f64> = 0.0..=300.0;

/// A syntactically valid measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub patient_id: PatientId,
    pub timestamp: TimestampMs,
    pub metric: String,
    pub value: f64,
}

/// Why a wire message was rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WireError {
    #[error("empty message")]
    Empty,

    #[error("expected 4 fields, got {0}")]
    FieldCount(usize),

    #[error("patient id is not an integer: {0:?}")]
    PatientIdNotNumeric(String),

    #[error("patient id must be positive, got {0}")]
    NonPositivePatientId(PatientId),

    #[error("timestamp is not an integer: {0:?}")]
    TimestampNotNumeric(String),

    #[error("timestamp must be positive, got {0}")]
    NonPositiveTimestamp(TimestampMs),

    #[error("metric label is empty")]
    EmptyMetric,

    #[error("measurement value is not a number: {0:?}")]
    ValueNotNumeric(String),

    #[error("measurement value is not finite: {0}")]
    NonFiniteValue(f64),
}

/// Parse and validate one wire message.
pub fn parse_line(raw: &str) -> Result<Measurement, WireError> {
    let line = raw.trim();
    if line.is_empty() {
        return Err(WireError::Empty);
    }

    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() != FIELD_COUNT {
        return Err(WireError::FieldCount(fields.len()));
    }

    let patient_id: PatientId = fields[0]
        .parse()
        .map_err(|_| WireError::PatientIdNotNumeric(fields[0].to_string()))?;
    if patient_id <= 0 {
        return Err(WireError::NonPositivePatientId(patient_id));
    }

    let timestamp: TimestampMs = fields[1]
        .parse()
        .map_err(|_| WireError::TimestampNotNumeric(fields[1].to_string()))?;
    if timestamp <= 0 {
        return Err(WireError::NonPositiveTimestamp(timestamp));
    }

    let metric = fields[2];
    if metric.is_empty() {
        return Err(WireError::EmptyMetric);
    }

    let value: f64 = fields[3]
        .parse()
        .map_err(|_| WireError::ValueNotNumeric(fields[3].to_string()))?;
    if !value.is_finite() {
        return Err(WireError::NonFiniteValue(value));
    }

    Ok(Measurement {
        patient_id,
        timestamp,
        metric: metric.to_string(),
        value,
    })
}

/// Log measurements that are accepted but look wrong.
///
/// Covers unknown metric labels, timestamps more than a day ahead of `now`
/// and implausible heart rates.
pub fn warn_if_suspicious(m: &Measurement, now: TimestampMs) {
    if !is_known_metric(&m.metric) {
        tracing::warn!(patient_id = m.patient_id, metric = %m.metric, "Unknown health metric");
    }
    if m.timestamp > now.saturating_add(FUTURE_TOLERANCE_MS) {
        tracing::warn!(
            patient_id = m.patient_id,
            timestamp = m.timestamp,
            "Future timestamp detected"
        );
    }
    if m.metric == METRIC_HEART_RATE && !HEART_RATE_RANGE.contains(&m.value) {
        tracing::warn!(
            patient_id = m.patient_id,
            value = m.value,
            "Suspicious heart rate value"
        );
    }
}
