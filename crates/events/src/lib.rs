//! In-process event fan-out for the vitals monitor.
//!
//! - [`EventBus`] is the publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`MonitorEvent`] is the envelope for store notifications and raised
//!   alerts.
//! - [`BusListener`] is a [`StoreListener`](vitals_store::StoreListener)
//!   that republishes store notifications on the bus.

pub mod bus;
pub mod listener;

pub use bus::{EventBus, MonitorEvent};
pub use listener::BusListener;
