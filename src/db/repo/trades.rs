//! Position ("Trade") rows and their tag links.

use crate::domain::{Symbol, TagId, Trade, TradeId, TradeStatus, UserId};
use chrono::NaiveDate;
use sqlx::sqlite::{Sqlite, SqliteRow};
use sqlx::{Executor, Row};
use std::collections::{HashMap, HashSet};

use super::{
    decode_error, fmt_date, fmt_time, get_date, get_decimal, get_opt_date, get_opt_time,
    get_time, now_ms, Repository, UnexpectedValue,
};

macro_rules! trade_columns {
    () => {
        "id, user_id, symbol, status, open_date, open_time, close_date, close_time, \
         shares, profit_loss, open_price, notes, version"
    };
}

fn trade_from_row(row: &SqliteRow) -> Result<Trade, sqlx::Error> {
    let status: String = row.try_get("status")?;
    let status = TradeStatus::parse(&status)
        .ok_or_else(|| decode_error("status", UnexpectedValue(status.clone())))?;

    Ok(Trade {
        id: TradeId::new(row.try_get("id")?),
        user_id: UserId::new(row.try_get("user_id")?),
        symbol: Symbol::new(row.try_get::<&str, _>("symbol")?),
        status,
        open_date: get_date(row, "open_date")?,
        open_time: get_time(row, "open_time")?,
        close_date: get_opt_date(row, "close_date")?,
        close_time: get_opt_time(row, "close_time")?,
        shares: row.try_get("shares")?,
        profit_loss: get_decimal(row, "profit_loss")?,
        open_price: get_decimal(row, "open_price")?,
        notes: row.try_get("notes")?,
        version: row.try_get("version")?,
    })
}

pub(crate) async fn fetch_trade<'e, E>(
    executor: E,
    id: &TradeId,
) -> Result<Option<Trade>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(concat!("SELECT ", trade_columns!(), " FROM trades WHERE id = ?"))
        .bind(id.as_str())
        .fetch_optional(executor)
        .await?
        .map(|row| trade_from_row(&row))
        .transpose()
}

/// The user's open trade for a symbol, if any. The schema allows at most one.
pub(crate) async fn fetch_open_trade<'e, E>(
    executor: E,
    user: &UserId,
    symbol: &Symbol,
) -> Result<Option<Trade>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(concat!(
        "SELECT ",
        trade_columns!(),
        " FROM trades WHERE user_id = ? AND symbol = ? AND status = 'open'"
    ))
    .bind(user.as_str())
    .bind(symbol.as_str())
    .fetch_optional(executor)
    .await?
    .map(|row| trade_from_row(&row))
    .transpose()
}

pub(crate) async fn insert_trade<'e, E>(executor: E, trade: &Trade) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO trades (
            id, user_id, symbol, status, open_date, open_time, close_date, close_time,
            shares, profit_loss, open_price, notes, version, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(trade.id.as_str())
    .bind(trade.user_id.as_str())
    .bind(trade.symbol.as_str())
    .bind(trade.status.as_str())
    .bind(fmt_date(trade.open_date))
    .bind(fmt_time(trade.open_time))
    .bind(trade.close_date.map(fmt_date))
    .bind(trade.close_time.map(fmt_time))
    .bind(trade.shares)
    .bind(trade.profit_loss.to_canonical_string())
    .bind(trade.open_price.to_canonical_string())
    .bind(trade.notes.as_deref())
    .bind(trade.version)
    .bind(now_ms())
    .execute(executor)
    .await?;
    Ok(())
}

/// Write back a trade if its stored version still matches.
///
/// Returns false when the row changed (or vanished) since it was read.
pub(crate) async fn update_trade<'e, E>(executor: E, trade: &Trade) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE trades
        SET status = ?, close_date = ?, close_time = ?, shares = ?, profit_loss = ?,
            notes = ?, version = version + 1
        WHERE id = ? AND version = ?
        "#,
    )
    .bind(trade.status.as_str())
    .bind(trade.close_date.map(fmt_date))
    .bind(trade.close_time.map(fmt_time))
    .bind(trade.shares)
    .bind(trade.profit_loss.to_canonical_string())
    .bind(trade.notes.as_deref())
    .bind(trade.id.as_str())
    .bind(trade.version)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub(crate) async fn delete_trade<'e, E>(executor: E, id: &TradeId) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM trades WHERE id = ?")
        .bind(id.as_str())
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

impl Repository {
    /// Look up one trade by id.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn find_trade(&self, id: &TradeId) -> Result<Option<Trade>, sqlx::Error> {
        fetch_trade(&self.pool, id).await
    }

    /// All trades of a user: open ones first, then most recent.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn list_trades(&self, user: &UserId) -> Result<Vec<Trade>, sqlx::Error> {
        let rows = sqlx::query(concat!(
            "SELECT ",
            trade_columns!(),
            " FROM trades WHERE user_id = ? \
             ORDER BY status = 'open' DESC, open_date DESC, open_time DESC, id ASC"
        ))
        .bind(user.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(trade_from_row).collect()
    }

    /// Trades opened within `[start, end]`, in open order.
    ///
    /// # Errors
    /// Returns an error if the query fails or a stored row cannot be decoded.
    pub async fn trades_opened_between(
        &self,
        user: &UserId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Trade>, sqlx::Error> {
        let rows = sqlx::query(concat!(
            "SELECT ",
            trade_columns!(),
            " FROM trades WHERE user_id = ? AND open_date >= ? AND open_date <= ? \
             ORDER BY open_date ASC, open_time ASC, id ASC"
        ))
        .bind(user.as_str())
        .bind(fmt_date(start))
        .bind(fmt_date(end))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(trade_from_row).collect()
    }

    /// Tag ids attached to each of the user's tagged trades.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn tag_links_for_user(
        &self,
        user: &UserId,
    ) -> Result<HashMap<TradeId, HashSet<TagId>>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT tt.trade_id, tt.tag_id
            FROM trade_tags tt
            JOIN trades t ON t.id = tt.trade_id
            WHERE t.user_id = ?
            "#,
        )
        .bind(user.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut links: HashMap<TradeId, HashSet<TagId>> = HashMap::new();
        for row in rows {
            let trade_id = TradeId::new(row.try_get("trade_id")?);
            let tag_id = TagId::new(row.try_get("tag_id")?);
            links.entry(trade_id).or_default().insert(tag_id);
        }
        Ok(links)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repo::test_support::{create_user, setup_test_db};
    use crate::domain::Decimal;
    use chrono::NaiveTime;

    fn open_trade(user: &UserId, symbol: &str, date: &str) -> Trade {
        Trade {
            id: TradeId::generate(),
            user_id: user.clone(),
            symbol: Symbol::new(symbol),
            status: TradeStatus::Open,
            open_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            open_time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            close_date: None,
            close_time: None,
            shares: 100,
            profit_loss: Decimal::from_str_canonical("-23412.02").unwrap(),
            open_price: Decimal::from_str_canonical("234.10").unwrap(),
            notes: None,
            version: 0,
        }
    }

    #[tokio::test]
    async fn test_insert_and_fetch_trade() {
        let (repo, _temp) = setup_test_db().await;
        let user = create_user(&repo, "a@example.com").await;
        let trade = open_trade(&user, "AAPL", "2023-08-09");

        insert_trade(repo.pool(), &trade).await.unwrap();

        let stored = repo.find_trade(&trade.id).await.unwrap().unwrap();
        assert_eq!(stored, trade);
        assert_eq!(stored.open_price.to_string(), "234.1");

        let open = fetch_open_trade(repo.pool(), &user, &Symbol::new("aapl"))
            .await
            .unwrap();
        assert_eq!(open.map(|t| t.id), Some(trade.id));
    }

    #[tokio::test]
    async fn test_update_requires_matching_version() {
        let (repo, _temp) = setup_test_db().await;
        let user = create_user(&repo, "a@example.com").await;
        let mut trade = open_trade(&user, "AAPL", "2023-08-09");
        insert_trade(repo.pool(), &trade).await.unwrap();

        trade.notes = Some("first".to_string());
        assert!(update_trade(repo.pool(), &trade).await.unwrap());

        // Stale version: the row is now at version 1.
        trade.notes = Some("second".to_string());
        assert!(!update_trade(repo.pool(), &trade).await.unwrap());

        let stored = repo.find_trade(&trade.id).await.unwrap().unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.notes.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn test_trades_opened_between_is_inclusive() {
        let (repo, _temp) = setup_test_db().await;
        let user = create_user(&repo, "a@example.com").await;
        for (symbol, date) in [("A", "2023-08-01"), ("B", "2023-08-09"), ("C", "2023-08-31")] {
            insert_trade(repo.pool(), &open_trade(&user, symbol, date))
                .await
                .unwrap();
        }

        let trades = repo
            .trades_opened_between(
                &user,
                NaiveDate::from_ymd_opt(2023, 8, 9).unwrap(),
                NaiveDate::from_ymd_opt(2023, 8, 31).unwrap(),
            )
            .await
            .unwrap();

        let symbols: Vec<&str> = trades.iter().map(|t| t.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["B", "C"]);
    }
}
