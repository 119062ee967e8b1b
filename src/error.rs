use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error(
        "Claim store is full ({bytes} of {budget} bytes) and cannot be optimised further. \
         Delete the oldest snapshots and try again."
    )]
    CapacityExceeded { bytes: usize, budget: usize },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error(
        "No header row found; expected a row containing 'id zgłoszenia' or a header at line {line}"
    )]
    MissingHeader { line: usize },

    #[error("Required column '{column}' not found in header")]
    MissingColumn { column: &'static str },

    #[error("Cannot open {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Malformed CSV: {0}")]
    Csv(#[from] csv::Error),
}
