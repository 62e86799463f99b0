pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod import;
pub mod service;

pub use config::Config;
pub use db::{init_db, Repository, Session};
pub use domain::{
    BrokerFill, Decimal, Execution, ExecutionChanges, ExecutionId, Side, Symbol, Trade, TradeId,
    TradeStatus, UserId,
};
pub use error::AppError;
pub use service::{ImportSummary, JournalError, TradeFilter, TradeJournal};
