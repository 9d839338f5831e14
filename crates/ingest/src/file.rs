//! Replay of recorded measurement streams from disk.

use std::path::{Path, PathBuf};

use tokio::io::{AsyncBufReadExt, BufReader};
use vitals_core::types::now_ms;
use vitals_store::DataStore;

use crate::error::IngestError;
use crate::wire;

/// Counters for one pass over a replay file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileReadSummary {
    /// Non-blank lines seen.
    pub lines: u64,
    pub accepted: u64,
    pub malformed: u64,
}

/// Reads a file of wire-format lines into a store.
///
/// Uses the same parser and validation as the stream reader. Blank lines
/// are skipped; malformed lines are counted and logged.
pub struct FileReader {
    path: PathBuf,
}

impl FileReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole file, forwarding valid lines to `store`.
    pub async fn read_into(&self, store: &DataStore) -> Result<FileReadSummary, IngestError> {
        let file = tokio::fs::File::open(&self.path).await?;
        let mut lines = BufReader::new(file).lines();
        let mut summary = FileReadSummary::default();
        let now = now_ms();
        let mut line_no = 0u64;

        while let Some(line) = lines.next_line().await? {
            line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            summary.lines += 1;

            match wire::parse_line(&line) {
                Ok(m) => {
                    wire::warn_if_suspicious(&m, now);
                    store.add_record(m.patient_id, m.value, &m.metric, m.timestamp);
                    summary.accepted += 1;
                }
                Err(e) => {
                    summary.malformed += 1;
                    tracing::warn!(line_no, error = %e, "Skipping malformed line");
                }
            }
        }

        tracing::info!(
            path = %self.path.display(),
            lines = summary.lines,
            accepted = summary.accepted,
            malformed = summary.malformed,
            "Replay file processed",
        );
        Ok(summary)
    }
}
