//! Evaluation against a populated store.

use std::sync::Arc;
use std::time::Duration;

use vitals_alerts::AlertEvaluator;
use vitals_core::metric_names::{METRIC_HEART_RATE, METRIC_OXYGEN_LEVEL, METRIC_SYSTOLIC_BP};
use vitals_core::AlertSeverity;
use vitals_store::DataStore;

const NOW: i64 = 1_700_000_000_000;
const MINUTE: i64 = 60 * 1000;

fn store_with(records: &[(i64, &str, f64, i64)]) -> Arc<DataStore> {
    let store = Arc::new(DataStore::new());
    for &(patient_id, metric, value, minutes_ago) in records {
        store.add_record(patient_id, value, metric, NOW - minutes_ago * MINUTE);
    }
    store
}

#[test]
fn systolic_trend_raises_exactly_one_alert() {
    let store = store_with(&[
        (1, METRIC_SYSTOLIC_BP, 110.0, 30),
        (1, METRIC_SYSTOLIC_BP, 125.0, 20),
        (1, METRIC_SYSTOLIC_BP, 140.0, 10),
    ]);
    let mut evaluator = AlertEvaluator::new(store);

    let alerts = evaluator.evaluate_at(1, NOW);

    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].condition, "Trend Alert: Systolic Blood Pressure");
    assert_eq!(alerts[0].timestamp, NOW);
}

#[test]
fn low_systolic_with_low_oxygen_raises_two_alerts() {
    let store = store_with(&[
        (1, METRIC_SYSTOLIC_BP, 88.0, 5),
        (1, METRIC_OXYGEN_LEVEL, 91.0, 4),
    ]);
    let mut evaluator = AlertEvaluator::new(store);

    let alerts = evaluator.evaluate_at(1, NOW);

    let conditions: Vec<_> = alerts.iter().map(|a| a.condition.as_str()).collect();
    assert_eq!(
        conditions,
        ["Critical Systolic BP: 88.0mmHg", "Hypotensive Hypoxemia Alert"]
    );
    assert!(alerts
        .iter()
        .all(|a| a.severity == Some(AlertSeverity::Critical)));
}

#[test]
fn out_of_order_insertion_is_scanned_chronologically() {
    let store = store_with(&[
        (1, METRIC_SYSTOLIC_BP, 140.0, 10),
        (1, METRIC_SYSTOLIC_BP, 110.0, 30),
        (1, METRIC_SYSTOLIC_BP, 125.0, 20),
    ]);
    let mut evaluator = AlertEvaluator::new(store);

    assert_eq!(evaluator.evaluate_at(1, NOW).len(), 1);
}

#[test]
fn records_outside_the_window_are_ignored() {
    let store = store_with(&[
        (1, METRIC_HEART_RATE, 150.0, 90),
        (1, METRIC_HEART_RATE, 150.0, -5),
        (1, METRIC_HEART_RATE, 80.0, 10),
    ]);
    let mut evaluator = AlertEvaluator::new(Arc::clone(&store));
    assert!(evaluator.evaluate_at(1, NOW).is_empty());

    let mut wide = AlertEvaluator::new(store).with_window(Duration::from_secs(2 * 60 * 60));
    assert_eq!(wide.evaluate_at(1, NOW).len(), 1);
}

#[test]
fn re_evaluation_accumulates_identical_alerts() {
    let store = store_with(&[(2, METRIC_HEART_RATE, 130.0, 1)]);
    let mut evaluator = AlertEvaluator::new(store);

    let first = evaluator.evaluate_at(2, NOW);
    let second = evaluator.evaluate_at(2, NOW);

    assert_eq!(first, second);
    assert_eq!(evaluator.triggered_alerts().len(), 2);
    assert_eq!(evaluator.take_alerts().len(), 2);
    assert!(evaluator.triggered_alerts().is_empty());
}

#[test]
fn unknown_patient_raises_nothing() {
    let mut evaluator = AlertEvaluator::new(Arc::new(DataStore::new()));
    assert!(evaluator.evaluate_at(42, NOW).is_empty());
}

#[test]
fn evaluate_reads_from_the_current_clock() {
    let store = Arc::new(DataStore::new());
    store.add_record(3, 130.0, METRIC_HEART_RATE, vitals_core::types::now_ms() - MINUTE);
    let patient = store.get_patient(3).expect("patient stored");
    let mut evaluator = AlertEvaluator::new(store);

    let alerts = evaluator.evaluate(&patient);

    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].condition, "High Heart Rate: 130.0 bpm");
}
