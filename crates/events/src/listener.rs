//! Bridge from synchronous store notifications to the async event bus.

use std::sync::Arc;

use vitals_core::{Patient, PatientId, Record};
use vitals_store::StoreListener;

use crate::bus::{EventBus, MonitorEvent};

/// Republishes every store notification as a [`MonitorEvent`].
///
/// Publishing on a broadcast channel never blocks, which keeps this
/// listener safe to run on the ingest path.
pub struct BusListener {
    bus: Arc<EventBus>,
}

impl BusListener {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }
}

impl StoreListener for BusListener {
    fn on_record_added(&self, patient_id: PatientId, record: &Record) {
        self.bus.publish(MonitorEvent::RecordAdded {
            patient_id,
            record: record.clone(),
        });
    }

    fn on_patient_created(&self, patient: &Patient) {
        self.bus.publish(MonitorEvent::PatientCreated {
            patient_id: patient.id(),
        });
    }
}
