//! Position ("Trade") type: the aggregate holding of one symbol for one user.

use crate::domain::{Decimal, Symbol, TradeId, TradeStatus, UserId};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// A round trip (or in-progress holding) of one symbol for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub user_id: UserId,
    pub symbol: Symbol,
    pub status: TradeStatus,
    pub open_date: NaiveDate,
    pub open_time: NaiveTime,
    pub close_date: Option<NaiveDate>,
    pub close_time: Option<NaiveTime>,
    /// Signed running net quantity.
    pub shares: i64,
    /// Running realized P/L, kept at 2 decimal places.
    pub profit_loss: Decimal,
    /// Price of the execution that opened the trade.
    pub open_price: Decimal,
    pub notes: Option<String>,
    /// Optimistic-concurrency counter, bumped on every persisted update.
    #[serde(skip)]
    pub version: i64,
}

impl Trade {
    pub fn is_open(&self) -> bool {
        self.status == TradeStatus::Open
    }

    /// Mark the trade closed at the given instant.
    pub fn close_at(&mut self, date: NaiveDate, time: NaiveTime) {
        self.status = TradeStatus::Closed;
        self.close_date = Some(date);
        self.close_time = Some(time);
    }

    /// Mark the trade open, clearing any close instant.
    pub fn reopen(&mut self) {
        self.status = TradeStatus::Open;
        self.close_date = None;
        self.close_time = None;
    }

    /// `open ⇔ shares ≠ 0 ⇔ no close instant`.
    pub fn is_consistent(&self) -> bool {
        let open = self.is_open();
        let has_shares = self.shares != 0;
        let unclosed = self.close_date.is_none() && self.close_time.is_none();
        open == has_shares && open == unclosed
    }
}
