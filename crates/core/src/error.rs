use crate::types::{PatientId, TimestampMs};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid patient id: {0}")]
    InvalidPatientId(PatientId),

    #[error("Invalid metric type for patient {0}")]
    EmptyMetric(PatientId),

    #[error("Invalid timestamp {timestamp} for patient {patient_id}")]
    InvalidTimestamp {
        patient_id: PatientId,
        timestamp: TimestampMs,
    },

    #[error("Validation failed: {0}")]
    Validation(String),
}
