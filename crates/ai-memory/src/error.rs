use std::path::PathBuf;

use thiserror::Error;

/// Failure of a durable storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o error on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed storage document {path}")]
    Document {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot encode array value")]
    Encode(#[source] serde_json::Error),
    #[error("cannot decode stored array value")]
    Decode(#[source] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("write-through of field `{field}` failed")]
    WriteThrough {
        field: &'static str,
        #[source]
        source: StoreError,
    },
}
