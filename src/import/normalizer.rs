//! Cleaning, validating and casting raw broker rows into typed fills.

use crate::domain::decimal::PRICE_MAX_SCALE;
use crate::domain::execution::{DATE_FORMAT, MAX_AMOUNT, MAX_QUANTITY, TIME_FORMAT};
use crate::domain::{BrokerFill, Decimal, Side, Symbol};
use crate::import::reader::RawRow;
use chrono::{Days, NaiveDate, NaiveTime, Timelike};
use rust_decimal::prelude::ToPrimitive;
use thiserror::Error;

/// Column headers of the broker execution export.
pub mod columns {
    pub const ACCOUNT: &str = "Account";
    pub const TRADE_DATE: &str = "T/D";
    pub const SETTLEMENT_DATE: &str = "S/D";
    pub const CURRENCY: &str = "Currency";
    pub const TYPE: &str = "Type";
    pub const SIDE: &str = "Side";
    pub const SYMBOL: &str = "Symbol";
    pub const QTY: &str = "Qty";
    pub const PRICE: &str = "Price";
    pub const EXEC_TIME: &str = "Exec Time";
    pub const COMMISSION: &str = "Comm";
    pub const SEC: &str = "SEC";
    pub const TAF: &str = "TAF";
    pub const NSCC: &str = "NSCC";
    pub const NASDAQ: &str = "Nasdaq";
    pub const ECN_REMOVE: &str = "ECN Remove";
    pub const ECN_REMOVE_ALIAS: &str = "ECN Removed";
    pub const ECN_ADD: &str = "ECN Add";
    pub const GROSS_PROCEEDS: &str = "Gross Proceeds";
    pub const NET_PROCEEDS: &str = "Net Proceeds";
    pub const CLEARING_BROKER: &str = "Clr Broker";
    pub const LIQUIDITY: &str = "Liq";
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("No data found in uploaded file")]
    NoData,
    #[error("row {row}: invalid {column}: {reason}")]
    Validation {
        /// 1-based data row number in the file.
        row: usize,
        column: &'static str,
        reason: String,
    },
}

/// Turn raw rows into typed fills, or fail the whole batch.
///
/// Blank rows and rows holding only separators are dropped first; an empty
/// remainder is `NoData`.
pub fn normalize_rows(rows: &[RawRow]) -> Result<Vec<BrokerFill>, NormalizeError> {
    let fills = rows
        .iter()
        .enumerate()
        .filter(|(_, row)| !is_blank_row(row))
        .map(|(index, row)| normalize_row(index + 1, row))
        .collect::<Result<Vec<_>, _>>()?;

    if fills.is_empty() {
        return Err(NormalizeError::NoData);
    }
    Ok(fills)
}

/// True when no cell carries anything but whitespace and separators.
pub fn is_blank_row(row: &RawRow) -> bool {
    row.values().all(|value| {
        value
            .chars()
            .all(|c| c == ',' || c == ';' || c.is_whitespace())
    })
}

/// Convert a spreadsheet serial day count (1899-12-30 epoch) to a date.
/// Any fractional time-of-day part is dropped.
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    // Serial day 0 is 1899-12-30.
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_days(Days::new(serial.floor() as u64))
}

/// Round a decimal to 5 fractional digits only if it carries more.
pub fn round_to_max_price_scale(value: Decimal) -> Decimal {
    value.cap_scale(PRICE_MAX_SCALE)
}

struct Cells<'a> {
    row_number: usize,
    row: &'a RawRow,
}

impl<'a> Cells<'a> {
    fn raw(&self, column: &str) -> Option<&'a str> {
        self.row
            .get(column)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn invalid(&self, column: &'static str, reason: impl Into<String>) -> NormalizeError {
        NormalizeError::Validation {
            row: self.row_number,
            column,
            reason: reason.into(),
        }
    }

    fn required(&self, column: &'static str) -> Result<&'a str, NormalizeError> {
        self.raw(column).ok_or_else(|| self.invalid(column, "missing value"))
    }

    fn text(&self, column: &'static str) -> String {
        self.raw(column).unwrap_or_default().to_string()
    }

    fn decimal_opt(&self, column: &'static str) -> Result<Option<Decimal>, NormalizeError> {
        self.raw(column)
            .map(|raw| {
                let value = Decimal::from_str_canonical(raw)
                    .map_err(|_| self.invalid(column, format!("'{}' is not a number", raw)))?;
                if value.exceeds_abs(MAX_AMOUNT) {
                    return Err(self.invalid(column, format!("'{}' is out of range", raw)));
                }
                Ok(value)
            })
            .transpose()
    }

    /// Money column that defaults to zero when blank.
    fn fee(&self, column: &'static str) -> Result<Decimal, NormalizeError> {
        Ok(self.decimal_opt(column)?.unwrap_or_default())
    }

    fn integer(&self, column: &'static str) -> Result<i64, NormalizeError> {
        let raw = self.required(column)?;
        let value = Decimal::from_str_canonical(raw)
            .map_err(|_| self.invalid(column, format!("'{}' is not a number", raw)))?
            .inner();
        if !value.fract().is_zero() {
            return Err(self.invalid(column, format!("'{}' is not a whole number", raw)));
        }
        value
            .to_i64()
            .ok_or_else(|| self.invalid(column, format!("'{}' is out of range", raw)))
    }

    fn date(&self, column: &'static str) -> Result<Option<NaiveDate>, NormalizeError> {
        let Some(raw) = self.raw(column) else {
            return Ok(None);
        };
        parse_date(raw)
            .map(Some)
            .ok_or_else(|| self.invalid(column, format!("'{}' is not a date", raw)))
    }
}

/// Serial day counts, `YYYY-MM-DD` and `MM/DD/YYYY`.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    if let Ok(serial) = raw.parse::<f64>() {
        return serial_to_date(serial);
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(raw, "%m/%d/%Y"))
        .ok()
}

/// `H:MM:SS`, `HH:MM:SS` or a spreadsheet day fraction; sub-seconds dropped.
fn parse_time(raw: &str) -> Option<NaiveTime> {
    if let Ok(fraction) = raw.parse::<f64>() {
        if !(0.0..1.0).contains(&fraction) {
            return None;
        }
        let seconds = (fraction * 86_400.0).round() as u32;
        return NaiveTime::from_num_seconds_from_midnight_opt(seconds.min(86_399), 0);
    }
    NaiveTime::parse_from_str(raw, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S%.f"))
        .ok()
        .and_then(|t| t.with_nanosecond(0))
}

fn normalize_row(row_number: usize, row: &RawRow) -> Result<BrokerFill, NormalizeError> {
    use columns::*;

    let cells = Cells { row_number, row };

    let trade_date = cells
        .date(TRADE_DATE)?
        .ok_or_else(|| cells.invalid(TRADE_DATE, "missing value"))?;
    let settlement_date = cells.date(SETTLEMENT_DATE)?;

    let currency = cells.required(CURRENCY)?.to_ascii_uppercase();
    let exec_type = i32::try_from(cells.integer(TYPE)?)
        .map_err(|_| cells.invalid(TYPE, "out of range"))?;

    let side_raw = cells.required(SIDE)?;
    let side = Side::from_code(side_raw)
        .ok_or_else(|| cells.invalid(SIDE, format!("unknown side '{}'", side_raw)))?;

    let symbol = Symbol::new(cells.required(SYMBOL)?);

    let quantity = cells.integer(QTY)?;
    if quantity <= 0 {
        return Err(cells.invalid(QTY, "must be positive"));
    }
    if quantity > MAX_QUANTITY {
        return Err(cells.invalid(QTY, format!("must be at most {}", MAX_QUANTITY)));
    }

    let price = cells
        .decimal_opt(PRICE)?
        .ok_or_else(|| cells.invalid(PRICE, "missing value"))
        .map(round_to_max_price_scale)?;

    let exec_time_raw = cells.required(EXEC_TIME)?;
    let execution_time = parse_time(exec_time_raw).ok_or_else(|| {
        cells.invalid(EXEC_TIME, format!("'{}' is not HH:MM:SS", exec_time_raw))
    })?;

    let ecn_remove = match cells.decimal_opt(ECN_REMOVE)? {
        Some(value) => value,
        None => cells.fee(ECN_REMOVE_ALIAS)?,
    };

    let mut fill = BrokerFill {
        account: cells.text(ACCOUNT),
        trade_date,
        settlement_date,
        currency,
        exec_type,
        side,
        symbol,
        quantity,
        price,
        execution_time,
        commission: cells.fee(COMMISSION)?,
        sec: cells.fee(SEC)?,
        taf: cells.fee(TAF)?,
        nscc: cells.fee(NSCC)?,
        nasdaq: round_to_max_price_scale(cells.fee(NASDAQ)?),
        ecn_remove,
        ecn_add: cells.fee(ECN_ADD)?,
        gross_proceeds: round_to_max_price_scale(cells.fee(GROSS_PROCEEDS)?),
        net_proceeds: Decimal::zero(),
        clearing_broker: cells.text(CLEARING_BROKER),
        liquidity: cells.text(LIQUIDITY),
    };

    fill.net_proceeds = match cells.decimal_opt(NET_PROCEEDS)? {
        Some(value) => round_to_max_price_scale(value),
        None => fill.derived_net_proceeds(),
    };

    Ok(fill)
}
