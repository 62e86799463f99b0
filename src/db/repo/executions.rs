//! Execution ("TradeDetail") rows.

use crate::domain::{BrokerFill, Execution, ExecutionId, Side, Symbol, TradeId, UserId};
use chrono::NaiveDate;
use sqlx::sqlite::{Sqlite, SqliteRow};
use sqlx::{Executor, Row};

use super::{
    decode_error, fmt_date, fmt_time, get_date, get_decimal, get_opt_date, get_time, now_ms,
    Repository, UnexpectedValue,
};

macro_rules! execution_columns {
    () => {
        "id, trade_id, account, trade_date, settlement_date, currency, exec_type, side, \
         symbol, quantity, price, execution_time, commission, sec, taf, nscc, nasdaq, \
         ecn_remove, ecn_add, gross_proceeds, net_proceeds, clearing_broker, liquidity, \
         notes, fingerprint"
    };
}

fn execution_from_row(row: &SqliteRow) -> Result<Execution, sqlx::Error> {
    let side: String = row.try_get("side")?;
    let side =
        Side::from_code(&side).ok_or_else(|| decode_error("side", UnexpectedValue(side.clone())))?;

    let fill = BrokerFill {
        account: row.try_get("account")?,
        trade_date: get_date(row, "trade_date")?,
        settlement_date: get_opt_date(row, "settlement_date")?,
        currency: row.try_get("currency")?,
        exec_type: row.try_get("exec_type")?,
        side,
        symbol: Symbol::new(row.try_get::<&str, _>("symbol")?),
        quantity: row.try_get("quantity")?,
        price: get_decimal(row, "price")?,
        execution_time: get_time(row, "execution_time")?,
        commission: get_decimal(row, "commission")?,
        sec: get_decimal(row, "sec")?,
        taf: get_decimal(row, "taf")?,
        nscc: get_decimal(row, "nscc")?,
        nasdaq: get_decimal(row, "nasdaq")?,
        ecn_remove: get_decimal(row, "ecn_remove")?,
        ecn_add: get_decimal(row, "ecn_add")?,
        gross_proceeds: get_decimal(row, "gross_proceeds")?,
        net_proceeds: get_decimal(row, "net_proceeds")?,
        clearing_broker: row.try_get("clearing_broker")?,
        liquidity: row.try_get("liquidity")?,
    };

    Ok(Execution {
        id: ExecutionId::new(row.try_get("id")?),
        trade_id: TradeId::new(row.try_get("trade_id")?),
        fill,
        notes: row.try_get("notes")?,
        fingerprint: row.try_get("fingerprint")?,
    })
}

pub(crate) async fn fetch_execution<'e, E>(
    executor: E,
    id: &ExecutionId,
) -> Result<Option<Execution>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(concat!(
        "SELECT ",
        execution_columns!(),
        " FROM executions WHERE id = ?"
    ))
    .bind(id.as_str())
    .fetch_optional(executor)
    .await?
    .map(|row| execution_from_row(&row))
    .transpose()
}

/// Executions linked to a trade, in storage order. Callers sequence them.
pub(crate) async fn fetch_executions_for_trade<'e, E>(
    executor: E,
    trade_id: &TradeId,
) -> Result<Vec<Execution>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(concat!(
        "SELECT ",
        execution_columns!(),
        " FROM executions WHERE trade_id = ? ORDER BY created_at ASC, rowid ASC"
    ))
    .bind(trade_id.as_str())
    .fetch_all(executor)
    .await?;

    rows.iter().map(execution_from_row).collect()
}

/// Whether the user already holds an execution with this import identity.
pub(crate) async fn fingerprint_exists<'e, E>(
    executor: E,
    user: &UserId,
    fingerprint: &str,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(
        "SELECT EXISTS(SELECT 1 FROM executions WHERE user_id = ? AND fingerprint = ?) AS found",
    )
    .bind(user.as_str())
    .bind(fingerprint)
    .fetch_one(executor)
    .await?;
    Ok(row.try_get::<i64, _>("found")? != 0)
}

pub(crate) async fn insert_execution<'e, E>(
    executor: E,
    user: &UserId,
    execution: &Execution,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let fill = &execution.fill;
    sqlx::query(
        r#"
        INSERT INTO executions (
            id, trade_id, user_id, account, trade_date, settlement_date, currency,
            exec_type, side, symbol, quantity, price, execution_time, commission,
            sec, taf, nscc, nasdaq, ecn_remove, ecn_add, gross_proceeds, net_proceeds,
            clearing_broker, liquidity, notes, fingerprint, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(execution.id.as_str())
    .bind(execution.trade_id.as_str())
    .bind(user.as_str())
    .bind(&fill.account)
    .bind(fmt_date(fill.trade_date))
    .bind(fill.settlement_date.map(fmt_date))
    .bind(&fill.currency)
    .bind(fill.exec_type)
    .bind(fill.side.code())
    .bind(fill.symbol.as_str())
    .bind(fill.quantity)
    .bind(fill.price.to_canonical_string())
    .bind(fmt_time(fill.execution_time))
    .bind(fill.commission.to_canonical_string())
    .bind(fill.sec.to_canonical_string())
    .bind(fill.taf.to_canonical_string())
    .bind(fill.nscc.to_canonical_string())
    .bind(fill.nasdaq.to_canonical_string())
    .bind(fill.ecn_remove.to_canonical_string())
    .bind(fill.ecn_add.to_canonical_string())
    .bind(fill.gross_proceeds.to_canonical_string())
    .bind(fill.net_proceeds.to_canonical_string())
    .bind(&fill.clearing_broker)
    .bind(&fill.liquidity)
    .bind(execution.notes.as_deref())
    .bind(&execution.fingerprint)
    .bind(now_ms())
    .execute(executor)
    .await?;
    Ok(())
}

/// Persist the editable fields of an execution.
pub(crate) async fn update_execution<'e, E>(
    executor: E,
    execution: &Execution,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE executions
        SET quantity = ?, price = ?, notes = ?, net_proceeds = ?
        WHERE id = ?
        "#,
    )
    .bind(execution.fill.quantity)
    .bind(execution.fill.price.to_canonical_string())
    .bind(execution.notes.as_deref())
    .bind(execution.fill.net_proceeds.to_canonical_string())
    .bind(execution.id.as_str())
    .execute(executor)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub(crate) async fn delete_execution<'e, E>(
    executor: E,
    id: &ExecutionId,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM executions WHERE id = ?")
        .bind(id.as_str())
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

impl Repository {
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn find_execution(&self, id: &ExecutionId) -> Result<Option<Execution>, sqlx::Error> {
        fetch_execution(&self.pool, id).await
    }

    /// Executions linked to one trade, in insertion order.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn executions_for_trade(
        &self,
        trade_id: &TradeId,
    ) -> Result<Vec<Execution>, sqlx::Error> {
        fetch_executions_for_trade(&self.pool, trade_id).await
    }

    /// Every execution of a user, newest first.
    ///
    /// # Errors
    /// Returns an error if the query fails or a stored row cannot be decoded.
    pub async fn executions_for_user(&self, user: &UserId) -> Result<Vec<Execution>, sqlx::Error> {
        let rows = sqlx::query(concat!(
            "SELECT ",
            execution_columns!(),
            " FROM executions WHERE user_id = ? \
             ORDER BY trade_date DESC, execution_time DESC, created_at DESC, rowid DESC"
        ))
        .bind(user.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(execution_from_row).collect()
    }

    /// Executions of the user's trades opened within `[start, end]`.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn executions_for_trades_opened_between(
        &self,
        user: &UserId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Execution>, sqlx::Error> {
        let rows = sqlx::query(concat!(
            "SELECT ",
            execution_columns!(),
            " FROM executions WHERE trade_id IN ( \
                 SELECT id FROM trades \
                 WHERE user_id = ? AND open_date >= ? AND open_date <= ? \
             ) ORDER BY created_at ASC, rowid ASC"
        ))
        .bind(user.as_str())
        .bind(fmt_date(start))
        .bind(fmt_date(end))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(execution_from_row).collect()
    }
}
