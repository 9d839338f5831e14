//! Canonical metric labels carried in the `metricType` wire field.
//!
//! The alert rules match on these exact labels. Ingestion accepts any
//! non-empty label and only warns about ones outside [`KNOWN_METRICS`].

/// Heart rate in beats per minute.
pub const METRIC_HEART_RATE: &str = "HeartRate";

/// Systolic blood pressure in mmHg.
pub const METRIC_SYSTOLIC_BP: &str = "SystolicBloodPressure";

/// Diastolic blood pressure in mmHg.
pub const METRIC_DIASTOLIC_BP: &str = "DiastolicBloodPressure";

/// Blood oxygen saturation as a percentage.
pub const METRIC_OXYGEN_LEVEL: &str = "OxygenLevel";

/// Single ECG sample.
pub const METRIC_ECG: &str = "ECG";

/// Manual alert button. A value of `1.0` means pressed.
pub const METRIC_TRIGGERED_ALERT: &str = "TriggeredAlert";

/// Labels the simulator and bedside devices are known to emit.
pub const KNOWN_METRICS: &[&str] = &[
    METRIC_HEART_RATE,
    METRIC_SYSTOLIC_BP,
    METRIC_DIASTOLIC_BP,
    METRIC_OXYGEN_LEVEL,
    METRIC_ECG,
    METRIC_TRIGGERED_ALERT,
    "BloodPressure",
    "BloodSaturation",
    "Saturation",
    "BloodLevels",
    "Systolic",
    "Diastolic",
    "Alert",
];

/// Whether `label` is one of [`KNOWN_METRICS`].
pub fn is_known_metric(label: &str) -> bool {
    KNOWN_METRICS.contains(&label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_labels_are_known() {
        assert!(is_known_metric(METRIC_HEART_RATE));
        assert!(is_known_metric(METRIC_OXYGEN_LEVEL));
        assert!(is_known_metric(METRIC_TRIGGERED_ALERT));
    }

    #[test]
    fn lookup_is_case_sensitive() {
        assert!(!is_known_metric("heartrate"));
        assert!(!is_known_metric("Temperature"));
    }
}
