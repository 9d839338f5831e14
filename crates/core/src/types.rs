/// Patient identifiers are positive integers assigned by the source.
pub type PatientId = i64;

/// Measurement timestamps are milliseconds since the Unix epoch.
pub type TimestampMs = i64;

/// Wall-clock timestamps (statistics, freshness) are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Current time as epoch milliseconds.
pub fn now_ms() -> TimestampMs {
    chrono::Utc::now().timestamp_millis()
}
