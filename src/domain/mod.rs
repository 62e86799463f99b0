//! Domain types for the trade journal ledger.
//!
//! This module provides:
//! - Lossless numeric handling via Decimal wrapper
//! - Domain primitives: identifiers, Symbol, Side, TradeStatus
//! - BrokerFill / Execution / Trade types
//! - Tags, comments and users attached to trades
//! - Stable execution ordering for deterministic processing

pub mod annotation;
pub mod decimal;
pub mod execution;
pub mod ordering;
pub mod primitives;
pub mod trade;

pub use annotation::{Comment, Tag, User};
pub use decimal::Decimal;
pub use execution::{BrokerFill, Execution, ExecutionChanges};
pub use primitives::{
    CommentId, ExecutionId, IdParseError, Side, Symbol, TagId, TradeId, TradeStatus, UserId,
};
pub use trade::Trade;
