//! Broker file ingestion: raw row reading and normalization into fills.

pub mod normalizer;
pub mod reader;

pub use normalizer::{normalize_rows, NormalizeError};
pub use reader::{read_csv_upload, ImportFileError, RawRow};
