//! Measurement ingestion for the vitals monitor.
//!
//! Provides the comma-separated wire format parser, a WebSocket
//! [`StreamReader`] with bounded exponential-backoff reconnection, and a
//! [`FileReader`] for replaying recorded streams. Both readers forward
//! valid measurements into a shared [`DataStore`](vitals_store::DataStore).

pub mod client;
pub mod error;
pub mod file;
pub mod reader;
pub mod reconnect;
pub mod source;
pub mod state;
pub mod wire;

pub use error::IngestError;
pub use file::{FileReadSummary, FileReader};
pub use reader::{ReaderConfig, ReaderStatistics, StreamReader};
pub use reconnect::BackoffPolicy;
pub use source::DataReader;
pub use state::ConnectionState;
pub use wire::{parse_line, Measurement, WireError};
