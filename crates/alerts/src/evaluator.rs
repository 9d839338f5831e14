//! Rule evaluation over a patient's trailing window of records.

use std::sync::Arc;
use std::time::Duration;

use vitals_core::metric_names::{
    METRIC_DIASTOLIC_BP, METRIC_ECG, METRIC_HEART_RATE, METRIC_OXYGEN_LEVEL, METRIC_SYSTOLIC_BP,
    METRIC_TRIGGERED_ALERT,
};
use vitals_core::types::now_ms;
use vitals_core::{Alert, AlertSeverity, Patient, PatientId, Record, TimestampMs};
use vitals_store::DataStore;

use crate::rules::{self, display_value};

/// Trailing window scanned by each evaluation.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60 * 60);

/// Applies the alert rules to records read from a [`DataStore`].
///
/// Raised alerts accumulate in the evaluator until taken. Evaluating the
/// same window twice raises the same alerts twice.
pub struct AlertEvaluator {
    store: Arc<DataStore>,
    window: Duration,
    triggered: Vec<Alert>,
}

impl AlertEvaluator {
    pub fn new(store: Arc<DataStore>) -> Self {
        Self {
            store,
            window: DEFAULT_WINDOW,
            triggered: Vec::new(),
        }
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Evaluate `patient` over the window ending now.
    pub fn evaluate(&mut self, patient: &Patient) -> Vec<Alert> {
        self.evaluate_at(patient.id(), now_ms())
    }

    /// Evaluate `patient_id` over the window ending at `now`.
    ///
    /// Returns the alerts raised by this call; they are also appended to
    /// [`triggered_alerts`](Self::triggered_alerts).
    pub fn evaluate_at(&mut self, patient_id: PatientId, now: TimestampMs) -> Vec<Alert> {
        let window_ms = i64::try_from(self.window.as_millis()).unwrap_or(i64::MAX);
        let mut records = self
            .store
            .get_records(patient_id, now.saturating_sub(window_ms), now);
        records.sort_by_key(|r| r.timestamp);

        let raised = scan_window(patient_id, &records, now);
        for alert in &raised {
            tracing::warn!(
                patient_id,
                condition = %alert.condition,
                timestamp = alert.timestamp,
                "Alert triggered",
            );
        }
        tracing::debug!(
            patient_id,
            records = records.len(),
            alerts = raised.len(),
            "Patient evaluated",
        );

        self.triggered.extend(raised.iter().cloned());
        raised
    }

    /// Every alert raised since the last [`take_alerts`](Self::take_alerts).
    pub fn triggered_alerts(&self) -> &[Alert] {
        &self.triggered
    }

    /// Drain the accumulated alerts.
    pub fn take_alerts(&mut self) -> Vec<Alert> {
        std::mem::take(&mut self.triggered)
    }
}

/// Apply every rule to `records`, which must be sorted by timestamp.
fn scan_window(patient_id: PatientId, records: &[Record], now: TimestampMs) -> Vec<Alert> {
    let mut alerts = Vec::new();
    let mut systolic = Vec::new();
    let mut diastolic = Vec::new();
    let mut ecg = Vec::new();
    let mut previous_oxygen: Option<&Record> = None;
    let mut low_bp = false;
    let mut low_oxygen = false;

    let raise = |alerts: &mut Vec<Alert>, condition: String, at, severity| {
        alerts.push(Alert::new(patient_id, condition, at).with_severity(severity));
    };

    for record in records {
        let value = record.value;
        let at = record.timestamp;

        match record.metric.as_str() {
            METRIC_HEART_RATE => {
                if value > rules::HEART_RATE_HIGH {
                    raise(
                        &mut alerts,
                        format!("High Heart Rate: {} bpm", display_value(value)),
                        at,
                        AlertSeverity::High,
                    );
                }
            }
            METRIC_OXYGEN_LEVEL => {
                if value < rules::OXYGEN_CRITICAL {
                    raise(
                        &mut alerts,
                        format!("Low Oxygen Level: {}%", display_value(value)),
                        at,
                        AlertSeverity::Critical,
                    );
                }
                if value < rules::OXYGEN_LOW {
                    low_oxygen = true;
                }
                if let Some(prev) = previous_oxygen {
                    let drop = prev.value - value;
                    if at - prev.timestamp <= rules::OXYGEN_RAPID_DROP_WINDOW_MS
                        && drop >= rules::OXYGEN_RAPID_DROP
                    {
                        raise(
                            &mut alerts,
                            format!("Rapid Oxygen Drop: -{}%", display_value(drop)),
                            at,
                            AlertSeverity::High,
                        );
                    }
                }
                previous_oxygen = Some(record);
            }
            METRIC_SYSTOLIC_BP => {
                systolic.push(value);
                if value > rules::SYSTOLIC_HIGH || value < rules::SYSTOLIC_LOW {
                    raise(
                        &mut alerts,
                        format!("Critical Systolic BP: {}mmHg", display_value(value)),
                        at,
                        AlertSeverity::Critical,
                    );
                }
                if value < rules::SYSTOLIC_LOW {
                    low_bp = true;
                }
            }
            METRIC_DIASTOLIC_BP => {
                diastolic.push(value);
                if value > rules::DIASTOLIC_HIGH || value < rules::DIASTOLIC_LOW {
                    raise(
                        &mut alerts,
                        format!("Critical Diastolic BP: {}mmHg", display_value(value)),
                        at,
                        AlertSeverity::Critical,
                    );
                }
            }
            METRIC_ECG => ecg.push(value),
            metric if metric.eq_ignore_ascii_case(METRIC_TRIGGERED_ALERT) => {
                if value == rules::MANUAL_TRIGGER_VALUE {
                    raise(
                        &mut alerts,
                        "Manual Triggered Alert".to_string(),
                        at,
                        AlertSeverity::High,
                    );
                }
            }
            _ => {}
        }
    }

    for (values, label) in [
        (&systolic, "Systolic Blood Pressure"),
        (&diastolic, "Diastolic Blood Pressure"),
    ] {
        if rules::first_trend(values).is_some() {
            raise(
                &mut alerts,
                format!("Trend Alert: {label}"),
                now,
                AlertSeverity::Medium,
            );
        }
    }

    if low_bp && low_oxygen {
        raise(
            &mut alerts,
            "Hypotensive Hypoxemia Alert".to_string(),
            now,
            AlertSeverity::Critical,
        );
    }

    if rules::ecg_anomalous(&ecg) {
        raise(
            &mut alerts,
            "Abnormal ECG Activity Detected".to_string(),
            now,
            AlertSeverity::High,
        );
    }

    alerts
}
