//! Periodic alert evaluation driven by store events.
//!
//! [`EvaluationLoop`] listens on the record [`EventBus`] for new records,
//! remembers which patients changed, and on every tick evaluates only those
//! patients. Raised alerts are logged and published as
//! [`MonitorEvent::AlertRaised`] on a separate alert bus.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use vitals_alerts::{AlertEvaluator, PrioritizedAlert};
use vitals_core::types::now_ms;
use vitals_core::{Alert, PatientId};
use vitals_events::{EventBus, MonitorEvent};
use vitals_store::DataStore;

// ---------------------------------------------------------------------------
// EvaluationLoop
// ---------------------------------------------------------------------------

/// Background service that re-evaluates patients with new data.
pub struct EvaluationLoop {
    store: Arc<DataStore>,
    alerts: Arc<EventBus>,
    receiver: broadcast::Receiver<MonitorEvent>,
    evaluator: AlertEvaluator,
    interval: Duration,
    dirty: BTreeSet<PatientId>,
}

impl EvaluationLoop {
    /// Create the loop and subscribe to `records` immediately, so records
    /// added before [`run`](Self::run) starts are not missed. Alerts are
    /// published on `alerts`.
    pub fn new(
        store: Arc<DataStore>,
        records: &EventBus,
        alerts: Arc<EventBus>,
        interval: Duration,
        window: Duration,
    ) -> Self {
        let receiver = records.subscribe();
        let evaluator = AlertEvaluator::new(Arc::clone(&store)).with_window(window);
        Self {
            store,
            alerts,
            receiver,
            evaluator,
            interval,
            dirty: BTreeSet::new(),
        }
    }

    /// Run until `cancel` fires or the bus closes.
    ///
    /// Patients still pending when the loop is cancelled get one final
    /// evaluation before it returns.
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    self.drain_pending();
                    self.evaluate_dirty();
                    tracing::info!("Evaluation loop cancelled");
                    break;
                }
                event = self.receiver.recv() => match event {
                    Ok(event) => self.observe(&event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Evaluation loop lagged, re-evaluating all patients");
                        self.mark_all_dirty();
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        self.evaluate_dirty();
                        tracing::info!("Event bus closed, evaluation loop shutting down");
                        break;
                    }
                },
                _ = interval.tick() => self.evaluate_dirty(),
            }
        }
    }

    fn observe(&mut self, event: &MonitorEvent) {
        if let MonitorEvent::RecordAdded { patient_id, .. } = event {
            self.dirty.insert(*patient_id);
        }
    }

    /// Pick up events already queued on the receiver.
    fn drain_pending(&mut self) {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => self.observe(&event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => self.mark_all_dirty(),
                Err(_) => break,
            }
        }
    }

    fn mark_all_dirty(&mut self) {
        self.dirty
            .extend(self.store.all_patients().iter().map(|p| p.id()));
    }

    fn evaluate_dirty(&mut self) {
        if self.dirty.is_empty() {
            return;
        }
        let patients = std::mem::take(&mut self.dirty);
        let now = now_ms();
        for patient_id in &patients {
            self.evaluator.evaluate_at(*patient_id, now);
        }

        let alerts = self.evaluator.take_alerts();
        tracing::debug!(
            patients = patients.len(),
            alerts = alerts.len(),
            "Evaluation pass complete",
        );
        for alert in alerts {
            self.emit(alert);
        }
    }

    fn emit(&self, alert: Alert) {
        match serde_json::to_string(&alert) {
            Ok(json) => tracing::info!(alert = %json, "Alert raised"),
            Err(e) => tracing::error!(error = %e, "Failed to serialize alert"),
        }
        PrioritizedAlert::from_severity(alert.clone(), "rule severity").announce();
        self.alerts.publish(MonitorEvent::AlertRaised { alert });
    }
}
