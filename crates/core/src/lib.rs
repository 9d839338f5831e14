//! Shared domain types for the vitals monitoring workspace.
//!
//! Every other crate depends on this one for [`Record`], [`Patient`],
//! [`Alert`] and the canonical metric labels in [`metric_names`].

pub mod alert;
pub mod error;
pub mod metric_names;
pub mod record;
pub mod types;

pub use alert::{Alert, AlertSeverity};
pub use error::CoreError;
pub use record::{validate_measurement, Patient, Record};
pub use types::{PatientId, TimestampMs};
