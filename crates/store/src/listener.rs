//! Observer registry for store notifications.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use vitals_core::{Patient, PatientId, Record};

/// Receives notifications about accepted data.
///
/// Called synchronously on the thread that inserted the record, after the
/// store has released its write lock. Implementations must not block; they
/// may call back into the store.
pub trait StoreListener: Send + Sync {
    /// A new record was stored for `patient_id`.
    fn on_record_added(&self, patient_id: PatientId, record: &Record);

    /// The first record for a previously unknown patient was stored.
    fn on_patient_created(&self, _patient: &Patient) {}
}

/// Handle returned by [`DataStore::add_listener`](crate::DataStore::add_listener).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
pub(crate) struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: RwLock<Vec<(ListenerId, Arc<dyn StoreListener>)>>,
}

impl ListenerRegistry {
    pub(crate) fn add(&self, listener: Arc<dyn StoreListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        listeners.push((id, listener));
        tracing::debug!(total = listeners.len(), "Store listener registered");
        id
    }

    pub(crate) fn remove(&self, id: ListenerId) -> bool {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        let removed = listeners.len() != before;
        if removed {
            tracing::debug!(remaining = listeners.len(), "Store listener removed");
        }
        removed
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Deliver one record (and, if set, one new patient) to every listener.
    ///
    /// Works on a snapshot of the registry so listeners may register or
    /// remove listeners while being notified. A panicking listener is
    /// logged and skipped.
    pub(crate) fn notify(&self, patient_id: PatientId, record: &Record, created: Option<&Patient>) {
        let snapshot: Vec<(ListenerId, Arc<dyn StoreListener>)> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for (id, listener) in snapshot {
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                listener.on_record_added(patient_id, record);
                if let Some(patient) = created {
                    listener.on_patient_created(patient);
                }
            }));

            if let Err(payload) = result {
                tracing::error!(
                    listener = ?id,
                    patient_id,
                    reason = %panic_message(payload.as_ref()),
                    "Store listener failed",
                );
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
