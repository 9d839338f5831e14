use std::fmt;

use vitals_core::types::Timestamp;

/// Point-in-time counters describing store activity.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreStatistics {
    pub patients: usize,
    pub total_records: u64,
    pub duplicates_rejected: u64,
    /// When the most recent record was accepted, if any.
    pub last_update: Option<Timestamp>,
    pub listeners: usize,
}

impl fmt::Display for StoreStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let last = self
            .last_update
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never".into());
        write!(
            f,
            "DataStore Statistics - Patients: {}, Total Records: {}, Duplicates Rejected: {}, Last Update: {}, Active Listeners: {}",
            self.patients, self.total_records, self.duplicates_rejected, last, self.listeners,
        )
    }
}
