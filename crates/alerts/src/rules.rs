//! Thresholds and pure helpers behind the alert rules.

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Heart rate above this (bpm) raises an alert.
pub const HEART_RATE_HIGH: f64 = 120.0;

/// Oxygen saturation below this (%) raises an alert.
pub const OXYGEN_CRITICAL: f64 = 90.0;

/// Oxygen saturation below this (%) counts towards hypotensive hypoxemia.
pub const OXYGEN_LOW: f64 = 92.0;

/// Minimum drop between consecutive oxygen readings for a rapid-drop alert.
pub const OXYGEN_RAPID_DROP: f64 = 5.0;

/// Consecutive oxygen readings further apart than this are not compared.
pub const OXYGEN_RAPID_DROP_WINDOW_MS: i64 = 10 * 60 * 1000;

/// Systolic pressure outside `[SYSTOLIC_LOW, SYSTOLIC_HIGH]` is critical.
pub const SYSTOLIC_HIGH: f64 = 180.0;
pub const SYSTOLIC_LOW: f64 = 90.0;

/// Diastolic pressure outside `[DIASTOLIC_LOW, DIASTOLIC_HIGH]` is critical.
pub const DIASTOLIC_HIGH: f64 = 120.0;
pub const DIASTOLIC_LOW: f64 = 60.0;

/// Each step of a pressure trend must change by more than this (mmHg).
pub const TREND_STEP: f64 = 10.0;

/// ECG readings further than this fraction of the mean from it are anomalous.
pub const ECG_DEVIATION_RATIO: f64 = 0.5;

/// Value of a `TriggeredAlert` record that means "pressed".
pub const MANUAL_TRIGGER_VALUE: f64 = 1.0;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Index of the first triple in `values` that rises or falls by more than
/// [`TREND_STEP`] at both steps.
pub fn first_trend(values: &[f64]) -> Option<usize> {
    values.windows(3).position(|w| {
        let (a, b, c) = (w[0], w[1], w[2]);
        let rising = b - a > TREND_STEP && c - b > TREND_STEP;
        let falling = a - b > TREND_STEP && b - c > TREND_STEP;
        rising || falling
    })
}

/// Whether any reading deviates from the mean of `values` by more than
/// [`ECG_DEVIATION_RATIO`] of that mean. Empty input is never anomalous.
pub fn ecg_anomalous(values: &[f64]) -> bool {
    if values.is_empty() {
        return false;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values
        .iter()
        .any(|v| (v - mean).abs() > mean * ECG_DEVIATION_RATIO)
}

/// Render a measurement value for an alert condition.
///
/// Whole numbers keep one decimal place (`130.0`), others print as-is.
pub fn display_value(value: f64) -> String {
    format!("{value:?}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rising_trend_found_at_first_triple() {
        assert_eq!(first_trend(&[110.0, 125.0, 140.0]), Some(0));
    }

    #[test]
    fn falling_trend_found() {
        assert_eq!(first_trend(&[150.0, 150.0, 135.0, 120.0]), Some(1));
    }

    #[test]
    fn step_of_exactly_ten_is_not_a_trend() {
        assert_eq!(first_trend(&[100.0, 110.0, 120.0]), None);
    }

    #[test]
    fn mixed_direction_is_not_a_trend() {
        assert_eq!(first_trend(&[100.0, 120.0, 100.0, 120.0]), None);
    }

    #[test]
    fn fewer_than_three_values_never_trend() {
        assert_eq!(first_trend(&[]), None);
        assert_eq!(first_trend(&[100.0, 200.0]), None);
    }

    #[test]
    fn ecg_outlier_detected() {
        assert!(ecg_anomalous(&[1.0, 1.0, 1.0, 3.0]));
    }

    #[test]
    fn steady_ecg_is_not_anomalous() {
        assert!(!ecg_anomalous(&[0.9, 1.0, 1.1]));
        assert!(!ecg_anomalous(&[]));
    }

    #[test]
    fn values_keep_a_decimal_place() {
        assert_eq!(display_value(130.0), "130.0");
        assert_eq!(display_value(88.5), "88.5");
    }
}
