use crate::import::{ImportFileError, NormalizeError};
use thiserror::Error;

/// Unique index guarding one open trade per (user, symbol).
const OPEN_TRADE_INDEX_COLUMNS: &str = "trades.user_id, trades.symbol";

/// SQLite primary result codes for a busy or locked database.
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("{0}")]
    Validation(String),
    #[error("No data found in uploaded file")]
    NoData,
    #[error("Invalid file type. Please upload in .csv")]
    UnsupportedFileType,
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("An open trade already exists for this symbol")]
    OpenTradeExists,
    /// Lost an optimistic-concurrency race or hit a locked database. Retryable.
    #[error("The trade was modified concurrently, please retry")]
    Conflict,
    #[error("storage error: {0}")]
    Persistence(#[source] sqlx::Error),
}

impl JournalError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, JournalError::Conflict)
    }
}

fn is_busy_or_locked(code: Option<&str>) -> bool {
    code.and_then(|c| c.parse::<i32>().ok())
        .map(|c| matches!(c & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
        .unwrap_or(false)
}

impl From<sqlx::Error> for JournalError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if is_busy_or_locked(db_err.code().as_deref()) {
                return JournalError::Conflict;
            }
            if db_err.is_unique_violation() && db_err.message().contains(OPEN_TRADE_INDEX_COLUMNS)
            {
                return JournalError::OpenTradeExists;
            }
        }
        JournalError::Persistence(err)
    }
}

impl From<NormalizeError> for JournalError {
    fn from(err: NormalizeError) -> Self {
        match err {
            NormalizeError::NoData => JournalError::NoData,
            other @ NormalizeError::Validation { .. } => JournalError::Validation(other.to_string()),
        }
    }
}

impl From<ImportFileError> for JournalError {
    fn from(err: ImportFileError) -> Self {
        match err {
            ImportFileError::UnsupportedFileType => JournalError::UnsupportedFileType,
            ImportFileError::Csv(reason) => {
                JournalError::Validation(format!("unreadable file: {}", reason))
            }
        }
    }
}
