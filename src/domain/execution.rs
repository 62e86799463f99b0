//! Execution types: a normalized broker fill and its persisted form.

use crate::domain::{Decimal, ExecutionId, Side, Symbol, TradeId};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Broker execution-type code for same-time cross prints.
pub const CROSS_PRINT_TYPE: i32 = 2;

/// Wire format for execution times.
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// Wire format for calendar dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Largest share quantity accepted on one execution.
pub const MAX_QUANTITY: i64 = 1_000_000_000;

/// Largest magnitude accepted for a price or money column of one execution.
///
/// Keeps every per-trade running sum far inside `i64` and `rust_decimal`.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000;

/// One broker fill after normalization, before it is linked to a trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerFill {
    pub account: String,
    pub trade_date: NaiveDate,
    pub settlement_date: Option<NaiveDate>,
    pub currency: String,
    /// Broker execution-type code.
    pub exec_type: i32,
    pub side: Side,
    pub symbol: Symbol,
    /// Unsigned share count; the sign comes from `side`.
    pub quantity: i64,
    pub price: Decimal,
    pub execution_time: NaiveTime,
    pub commission: Decimal,
    pub sec: Decimal,
    pub taf: Decimal,
    pub nscc: Decimal,
    pub nasdaq: Decimal,
    pub ecn_remove: Decimal,
    pub ecn_add: Decimal,
    /// Signed cash flow before costs: negative for buys.
    pub gross_proceeds: Decimal,
    /// Cash flow after commission and fees.
    pub net_proceeds: Decimal,
    pub clearing_broker: String,
    pub liquidity: String,
}

impl BrokerFill {
    /// Share delta this fill applies to its position.
    pub fn signed_quantity(&self) -> i64 {
        self.side.sign() * self.quantity
    }

    /// Sum of the regulatory fee columns.
    pub fn regulatory_fees(&self) -> Decimal {
        self.sec + self.taf + self.nscc + self.nasdaq
    }

    /// Realized cash effect used when a fill is reconciled on import:
    /// gross proceeds less commission and regulatory fees.
    pub fn cash_effect(&self) -> Decimal {
        self.gross_proceeds - self.commission - self.regulatory_fees()
    }

    /// Net proceeds derived from the other money columns, for feeds that
    /// leave the column blank.
    pub fn derived_net_proceeds(&self) -> Decimal {
        self.cash_effect() - self.ecn_remove + self.ecn_add
    }

    /// Name of the first field outside the accepted range, if any.
    pub fn out_of_range_field(&self) -> Option<&'static str> {
        if self.quantity <= 0 || self.quantity > MAX_QUANTITY {
            return Some("quantity");
        }
        [
            ("price", self.price),
            ("commission", self.commission),
            ("sec", self.sec),
            ("taf", self.taf),
            ("nscc", self.nscc),
            ("nasdaq", self.nasdaq),
            ("ecn_remove", self.ecn_remove),
            ("ecn_add", self.ecn_add),
            ("gross_proceeds", self.gross_proceeds),
            ("net_proceeds", self.net_proceeds),
        ]
        .into_iter()
        .find(|(_, value)| value.exceeds_abs(MAX_AMOUNT))
        .map(|(name, _)| name)
    }

    /// Stable identity of this fill for duplicate detection on re-import.
    ///
    /// Decimals are hashed in canonical form so `234.10` and `234.1` collide.
    /// ECN columns, settlement date and net proceeds are not part of the
    /// identity.
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        let mut field = |value: &str| {
            hasher.update(value.as_bytes());
            hasher.update([0x1f]);
        };
        field(&self.account);
        field(&self.trade_date.format(DATE_FORMAT).to_string());
        field(&self.currency);
        field(&self.exec_type.to_string());
        field(self.side.code());
        field(self.symbol.as_str());
        field(&self.quantity.to_string());
        field(&self.price.to_canonical_string());
        field(&self.execution_time.format(TIME_FORMAT).to_string());
        field(&self.commission.to_canonical_string());
        field(&self.sec.to_canonical_string());
        field(&self.taf.to_canonical_string());
        field(&self.nscc.to_canonical_string());
        field(&self.nasdaq.to_canonical_string());
        field(&self.gross_proceeds.to_canonical_string());
        field(&self.clearing_broker);
        field(&self.liquidity);
        hex::encode(hasher.finalize())
    }
}

impl AsRef<BrokerFill> for BrokerFill {
    fn as_ref(&self) -> &BrokerFill {
        self
    }
}

/// A persisted execution ("TradeDetail") linked to exactly one trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Execution {
    pub id: ExecutionId,
    pub trade_id: TradeId,
    #[serde(flatten)]
    pub fill: BrokerFill,
    pub notes: Option<String>,
    /// Import identity, fixed when the row was first imported.
    pub fingerprint: String,
}

impl Execution {
    /// Link a normalized fill to a trade under a fresh identifier.
    pub fn from_fill(fill: BrokerFill, trade_id: TradeId) -> Self {
        let fingerprint = fill.fingerprint();
        Execution {
            id: ExecutionId::generate(),
            trade_id,
            fill,
            notes: None,
            fingerprint,
        }
    }
}

impl AsRef<BrokerFill> for Execution {
    fn as_ref(&self) -> &BrokerFill {
        &self.fill
    }
}

/// Field change set for editing an execution.
///
/// Exactly the editable fields, each present or absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionChanges {
    pub quantity: Option<i64>,
    pub price: Option<Decimal>,
    pub notes: Option<String>,
    pub net_proceeds: Option<Decimal>,
}

impl ExecutionChanges {
    pub fn is_empty(&self) -> bool {
        self.quantity.is_none()
            && self.price.is_none()
            && self.notes.is_none()
            && self.net_proceeds.is_none()
    }

    /// True when the parent trade must be re-derived after applying.
    pub fn touches_position(&self) -> bool {
        self.quantity.is_some() || self.net_proceeds.is_some()
    }

    /// Apply the present fields to an execution in place.
    pub fn apply_to(&self, execution: &mut Execution) {
        if let Some(quantity) = self.quantity {
            execution.fill.quantity = quantity;
        }
        if let Some(price) = self.price {
            execution.fill.price = price;
        }
        if let Some(notes) = &self.notes {
            execution.notes = Some(notes.clone());
        }
        if let Some(net_proceeds) = self.net_proceeds {
            execution.fill.net_proceeds = net_proceeds;
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    /// A fill with zero costs except where overridden by the caller.
    pub fn fill(side: Side, quantity: i64, price: &str, date: &str, time: &str) -> BrokerFill {
        let price = d(price);
        let notional = Decimal::new(price.inner() * rust_decimal::Decimal::from(quantity));
        let gross = match side {
            Side::Buy => -notional,
            Side::Sell => notional,
        };
        BrokerFill {
            account: "TRZ0001".to_string(),
            trade_date: NaiveDate::parse_from_str(date, DATE_FORMAT).unwrap(),
            settlement_date: None,
            currency: "USD".to_string(),
            exec_type: 2,
            side,
            symbol: Symbol::new("AAPL"),
            quantity,
            price,
            execution_time: NaiveTime::parse_from_str(time, TIME_FORMAT).unwrap(),
            commission: Decimal::zero(),
            sec: Decimal::zero(),
            taf: Decimal::zero(),
            nscc: Decimal::zero(),
            nasdaq: Decimal::zero(),
            ecn_remove: Decimal::zero(),
            ecn_add: Decimal::zero(),
            gross_proceeds: gross,
            net_proceeds: gross,
            clearing_broker: "VELO".to_string(),
            liquidity: "A".to_string(),
        }
    }
}
