//! Clinical alert values produced by the rule evaluator.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{PatientId, TimestampMs};

/// Severity attached to an alert by the rule that raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AlertSeverity {
    type Err = crate::CoreError;

    /// Case-insensitive parse of `low`, `medium`, `high`, `critical`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            other => Err(crate::CoreError::Validation(format!(
                "unknown alert severity: {other}"
            ))),
        }
    }
}

/// A raised alert for one patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub patient_id: PatientId,
    /// Human-readable condition, e.g. `"High Heart Rate: 130 bpm"`.
    pub condition: String,
    /// Record timestamp for single-reading alerts, evaluation time otherwise.
    pub timestamp: TimestampMs,
    pub severity: Option<AlertSeverity>,
}

impl Alert {
    pub fn new(patient_id: PatientId, condition: impl Into<String>, timestamp: TimestampMs) -> Self {
        Self {
            patient_id,
            condition: condition.into(),
            timestamp,
            severity: None,
        }
    }

    pub fn with_severity(mut self, severity: AlertSeverity) -> Self {
        self.severity = Some(severity);
        self
    }
}
