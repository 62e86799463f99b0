//! Repository layer for database operations.
//!
//! Queries are free functions generic over `sqlx::Executor`, so the same SQL
//! runs against the pool (`Repository`, reads) and against an open
//! transaction (`Session`, mutations). Submodules are organized by table:
//! - `trades.rs` - Position rows and tag links
//! - `executions.rs` - Execution rows and fingerprint lookups
//! - `annotations.rs` - Users, tags and comments

pub(crate) mod annotations;
pub(crate) mod executions;
pub(crate) mod trades;

use crate::db::Session;
use crate::domain::execution::{DATE_FORMAT, TIME_FORMAT};
use crate::domain::Decimal;
use chrono::{NaiveDate, NaiveTime};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use thiserror::Error;

/// Stored text that does not map back onto a domain value.
#[derive(Debug, Error)]
#[error("unexpected stored value '{0}'")]
pub(crate) struct UnexpectedValue(pub String);

/// Repository for pool-level reads.
///
/// Mutations go through a [`Session`] obtained from [`Repository::begin`].
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Open a transaction for one mutating operation.
    ///
    /// # Errors
    /// Returns an error if no connection is available or `BEGIN` fails.
    pub async fn begin(&self) -> Result<Session, sqlx::Error> {
        Session::begin(&self.pool).await
    }

    /// Cheap connectivity check for readiness.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

pub(crate) fn decode_error(
    column: &str,
    source: impl std::error::Error + Send + Sync + 'static,
) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(source),
    }
}

pub(crate) fn get_decimal(row: &SqliteRow, column: &str) -> Result<Decimal, sqlx::Error> {
    let raw: String = row.try_get(column)?;
    Decimal::from_str_canonical(&raw).map_err(|e| decode_error(column, e))
}

fn parse_date(column: &str, raw: &str) -> Result<NaiveDate, sqlx::Error> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|e| decode_error(column, e))
}

fn parse_time(column: &str, raw: &str) -> Result<NaiveTime, sqlx::Error> {
    NaiveTime::parse_from_str(raw, TIME_FORMAT).map_err(|e| decode_error(column, e))
}

pub(crate) fn get_date(row: &SqliteRow, column: &str) -> Result<NaiveDate, sqlx::Error> {
    let raw: String = row.try_get(column)?;
    parse_date(column, &raw)
}

pub(crate) fn get_opt_date(row: &SqliteRow, column: &str) -> Result<Option<NaiveDate>, sqlx::Error> {
    row.try_get::<Option<String>, _>(column)?
        .map(|raw| parse_date(column, &raw))
        .transpose()
}

pub(crate) fn get_time(row: &SqliteRow, column: &str) -> Result<NaiveTime, sqlx::Error> {
    let raw: String = row.try_get(column)?;
    parse_time(column, &raw)
}

pub(crate) fn get_opt_time(row: &SqliteRow, column: &str) -> Result<Option<NaiveTime>, sqlx::Error> {
    row.try_get::<Option<String>, _>(column)?
        .map(|raw| parse_time(column, &raw))
        .transpose()
}

pub(crate) fn fmt_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub(crate) fn fmt_time(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
