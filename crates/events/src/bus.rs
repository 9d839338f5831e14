//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the central publish/subscribe hub for [`MonitorEvent`]s.
//! It is designed to be shared via `Arc<EventBus>` across the application.

use serde::Serialize;
use tokio::sync::broadcast;
use vitals_core::{Alert, PatientId, Record};

// ---------------------------------------------------------------------------
// MonitorEvent
// ---------------------------------------------------------------------------

/// Something that happened in the monitor.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitorEvent {
    /// The store accepted a new record.
    RecordAdded { patient_id: PatientId, record: Record },

    /// The store saw a patient for the first time.
    PatientCreated { patient_id: PatientId },

    /// The evaluator raised an alert.
    AlertRaised { alert: Alert },
}

impl MonitorEvent {
    /// The patient this event concerns.
    pub fn patient_id(&self) -> PatientId {
        match self {
            Self::RecordAdded { patient_id, .. } | Self::PatientCreated { patient_id } => {
                *patient_id
            }
            Self::AlertRaised { alert } => alert.patient_id,
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`MonitorEvent`].
pub struct EventBus {
    sender: broadcast::Sender<MonitorEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// Never blocks. Returns the number of subscribers the event reached;
    /// with no subscribers the event is dropped.
    pub fn publish(&self, event: MonitorEvent) -> usize {
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(event)) => {
                tracing::debug!(
                    patient_id = event.patient_id(),
                    "No subscribers, event dropped"
                );
                0
            }
        }
    }

    /// Subscribe to all events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_and_receive_single_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(MonitorEvent::PatientCreated { patient_id: 12 });

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.patient_id(), 12);
        assert!(matches!(received, MonitorEvent::PatientCreated { .. }));
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(MonitorEvent::AlertRaised {
            alert: Alert::new(3, "Manual Triggered Alert", 10),
        });

        let e1 = rx1.recv().await.expect("subscriber 1 should receive");
        let e2 = rx2.recv().await.expect("subscriber 2 should receive");

        assert_eq!(e1.patient_id(), 3);
        assert_eq!(e2.patient_id(), 3);
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::default();
        // No subscribers; this must not panic.
        let reached = bus.publish(MonitorEvent::PatientCreated { patient_id: 1 });
        assert_eq!(reached, 0);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn publish_reports_subscribers_reached() {
        let bus = EventBus::default();
        let _rx1 = bus.subscribe();
        let _rx2 = bus.subscribe();

        let reached = bus.publish(MonitorEvent::PatientCreated { patient_id: 2 });
        assert_eq!(reached, 2);
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let event = MonitorEvent::RecordAdded {
            patient_id: 5,
            record: Record::new(5, "HeartRate", 80.0, 1000),
        };
        let json = serde_json::to_value(&event).expect("serializable");
        assert_eq!(json["type"], "record_added");
        assert_eq!(json["record"]["metric"], "HeartRate");
    }
}
