//! Journal service: transactional operations over the ledger.

pub mod error;
pub mod journal;

pub use error::JournalError;
pub use journal::{
    apply_delete, apply_edit, apply_import, DeletedExecution, EditedExecution, ImportSummary,
    TradeDetail, TradeFilter, TradeJournal, TradeWithSummary,
};
