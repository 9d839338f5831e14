//! Common interface for measurement sources.

use std::sync::Arc;

use async_trait::async_trait;
use vitals_store::DataStore;

use crate::error::IngestError;
use crate::file::FileReader;
use crate::reader::StreamReader;

/// Something that feeds measurements into a [`DataStore`].
#[async_trait]
pub trait DataReader: Send + Sync {
    /// Begin delivering measurements into `store`.
    ///
    /// Streaming sources return once connected and keep delivering in the
    /// background; finite sources return after the last measurement.
    async fn start_reading(&self, store: Arc<DataStore>) -> Result<(), IngestError>;
}

#[async_trait]
impl DataReader for StreamReader {
    async fn start_reading(&self, store: Arc<DataStore>) -> Result<(), IngestError> {
        StreamReader::start_reading(self, store).await
    }
}

#[async_trait]
impl DataReader for FileReader {
    async fn start_reading(&self, store: Arc<DataStore>) -> Result<(), IngestError> {
        self.read_into(&store).await.map(|_| ())
    }
}
