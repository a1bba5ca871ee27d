//! Batch import of user records from CSV into MySQL.
//!
//! - Streaming path: local files, optionally gzip/zstd, any charset `encoding_rs` knows.
//! - Rows are normalized one at a time; accepted users are buffered, then inserted one by one.
//! - Dry run stops after normalization and never opens a connection.
//!
//! Data shape:
//! - `RawRow` -> `normalize` -> `UserRecord` or `RejectionReason`
//! - `ImportResult { rows_read, records, rejected }`
//! - `LoadSummary { attempted, inserted, failed }`
//
mod codec;
pub mod config;
pub mod db;
mod io;
pub mod loader;
pub mod logging;
pub mod normalize;
pub mod pipeline;

pub use crate::db::{connect, create_table, release, UserStore, DATABASE_NAME, USERS_TABLE};
pub use crate::io::{build_csv_reader, reader_from_path, Compression, CsvMeta};
pub use crate::loader::{load, FailedInsert, LoadSummary};
pub use crate::normalize::{normalize, RawRow, RejectionReason, UserRecord, REQUIRED_HEADERS};
pub use crate::pipeline::{
    collect_records, process_csv_stream, ImportResult, ParsedRow, RejectedRow, RowStream,
};

use thiserror::Error;

/// Error type for everything that ends a run (as opposed to rejecting a single row).
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Missing required header: {0}")]
    MissingHeader(String),
    #[error("Unknown character encoding: {0}")]
    UnknownEncoding(String),
    #[error("Missing required setting: {0}")]
    MissingSetting(&'static str),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv_async::Error),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type UploadResult<T> = std::result::Result<T, UploadError>;
