//! Wire representations. Decimals travel as strings to stay lossless.

use crate::domain::execution::{DATE_FORMAT, TIME_FORMAT};
use crate::domain::{Comment, Decimal, Execution, Tag, Trade, User};
use crate::engine::TradeSummary;
use crate::error::AppError;
use serde::{Deserialize, Serialize};

fn money(value: Decimal) -> String {
    format!("{:.2}", value.round_money().inner())
}

/// A decimal supplied either as a JSON string or a JSON number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DecimalInput {
    Text(String),
    Number(serde_json::Number),
}

impl DecimalInput {
    pub fn parse(&self, field: &str) -> Result<Decimal, AppError> {
        let raw = match self {
            DecimalInput::Text(s) => s.clone(),
            DecimalInput::Number(n) => n.to_string(),
        };
        Decimal::from_str_canonical(&raw)
            .map_err(|_| AppError::BadRequest(format!("{} must be a decimal number", field)))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeDto {
    pub id: String,
    pub symbol: String,
    pub status: String,
    pub open_date: String,
    pub open_time: String,
    pub close_date: Option<String>,
    pub close_time: Option<String>,
    pub shares: i64,
    pub profit_loss: String,
    pub open_price: String,
    pub notes: Option<String>,
}

impl From<&Trade> for TradeDto {
    fn from(t: &Trade) -> Self {
        TradeDto {
            id: t.id.to_string(),
            symbol: t.symbol.to_string(),
            status: t.status.to_string(),
            open_date: t.open_date.format(DATE_FORMAT).to_string(),
            open_time: t.open_time.format(TIME_FORMAT).to_string(),
            close_date: t.close_date.map(|d| d.format(DATE_FORMAT).to_string()),
            close_time: t.close_time.map(|d| d.format(TIME_FORMAT).to_string()),
            shares: t.shares,
            profit_loss: money(t.profit_loss),
            open_price: t.open_price.to_canonical_string(),
            notes: t.notes.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionDto {
    pub id: String,
    pub trade_id: String,
    pub account: String,
    pub trade_date: String,
    pub settlement_date: Option<String>,
    pub currency: String,
    #[serde(rename = "type")]
    pub exec_type: i32,
    pub side: String,
    pub symbol: String,
    pub quantity: i64,
    pub price: String,
    pub execution_time: String,
    pub commission: String,
    pub sec: String,
    pub taf: String,
    pub nscc: String,
    pub nasdaq: String,
    pub ecn_remove: String,
    pub ecn_add: String,
    pub gross_proceeds: String,
    pub net_proceeds: String,
    pub clearing_broker: String,
    pub liquidity: String,
    pub notes: Option<String>,
}

impl From<&Execution> for ExecutionDto {
    fn from(e: &Execution) -> Self {
        let f = &e.fill;
        ExecutionDto {
            id: e.id.to_string(),
            trade_id: e.trade_id.to_string(),
            account: f.account.clone(),
            trade_date: f.trade_date.format(DATE_FORMAT).to_string(),
            settlement_date: f.settlement_date.map(|d| d.format(DATE_FORMAT).to_string()),
            currency: f.currency.clone(),
            exec_type: f.exec_type,
            side: f.side.to_string(),
            symbol: f.symbol.to_string(),
            quantity: f.quantity,
            price: f.price.to_canonical_string(),
            execution_time: f.execution_time.format(TIME_FORMAT).to_string(),
            commission: f.commission.to_canonical_string(),
            sec: f.sec.to_canonical_string(),
            taf: f.taf.to_canonical_string(),
            nscc: f.nscc.to_canonical_string(),
            nasdaq: f.nasdaq.to_canonical_string(),
            ecn_remove: f.ecn_remove.to_canonical_string(),
            ecn_add: f.ecn_add.to_canonical_string(),
            gross_proceeds: f.gross_proceeds.to_canonical_string(),
            net_proceeds: f.net_proceeds.to_canonical_string(),
            clearing_broker: f.clearing_broker.clone(),
            liquidity: f.liquidity.clone(),
            notes: e.notes.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryDto {
    pub total_shares_traded: i64,
    pub total_commission: String,
    pub gross_profit_loss: String,
    pub total_fees: String,
}

impl From<&TradeSummary> for SummaryDto {
    fn from(s: &TradeSummary) -> Self {
        SummaryDto {
            total_shares_traded: s.total_shares_traded,
            total_commission: s.total_commission.to_canonical_string(),
            gross_profit_loss: s.gross_profit_loss.to_canonical_string(),
            total_fees: s.total_fees.to_canonical_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagDto {
    pub id: String,
    pub tag_name: String,
}

impl From<&Tag> for TagDto {
    fn from(t: &Tag) -> Self {
        TagDto {
            id: t.id.to_string(),
            tag_name: t.tag_name.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentDto {
    pub id: String,
    pub trade_id: String,
    pub body: String,
    pub created_at_ms: i64,
}

impl From<&Comment> for CommentDto {
    fn from(c: &Comment) -> Self {
        CommentDto {
            id: c.id.to_string(),
            trade_id: c.trade_id.to_string(),
            body: c.body.clone(),
            created_at_ms: c.created_at_ms,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: String,
    pub email: String,
}

impl From<&User> for UserDto {
    fn from(u: &User) -> Self {
        UserDto {
            id: u.id.to_string(),
            email: u.email.clone(),
        }
    }
}
