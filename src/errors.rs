use std::fmt;

use crate::store::StoreError;

/// Errors that abort a backup or restore run before (or without) any mutation.
///
/// Per-record failures during restore are not errors at this level — they are
/// counted in the run report and never stop the run.
#[derive(Debug)]
pub enum BackupError {
    NotAuthenticated,
    SnapshotFormat(String),
    Serialize(serde_json::Error),
}

impl fmt::Display for BackupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackupError::NotAuthenticated => write!(f, "no authenticated identity"),
            BackupError::SnapshotFormat(msg) => write!(f, "malformed snapshot: {msg}"),
            BackupError::Serialize(e) => write!(f, "snapshot serialization error: {e}"),
        }
    }
}

impl std::error::Error for BackupError {}

impl From<serde_json::Error> for BackupError {
    fn from(e: serde_json::Error) -> Self {
        BackupError::Serialize(e)
    }
}

/// Errors raised by the import pipelines.
///
/// Row-level validation problems are not errors at this level either; they
/// ride on each parsed row. `Blocked` is the commit gate refusing a batch
/// that still contains invalid rows.
#[derive(Debug)]
pub enum ImportError {
    NotAuthenticated,
    MissingHeader(String),
    Csv(csv::Error),
    Blocked { invalid_rows: usize },
    Store(StoreError),
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportError::NotAuthenticated => write!(f, "no authenticated identity"),
            ImportError::MissingHeader(name) => write!(f, "missing required column '{name}'"),
            ImportError::Csv(e) => write!(f, "CSV parse error: {e}"),
            ImportError::Blocked { invalid_rows } => {
                write!(f, "import blocked: {invalid_rows} row(s) have validation errors")
            }
            ImportError::Store(e) => write!(f, "store rejected the batch: {e}"),
        }
    }
}

impl std::error::Error for ImportError {}

impl From<csv::Error> for ImportError {
    fn from(e: csv::Error) -> Self {
        ImportError::Csv(e)
    }
}

impl From<StoreError> for ImportError {
    fn from(e: StoreError) -> Self {
        ImportError::Store(e)
    }
}
