//! Pure computation engine(s) for deterministic ledger logic.
//!
//! Nothing here touches storage: the reconciler mutates in-memory trades and
//! the aggregator rolls up execution sets. Persistence and transactions live
//! in `service::journal`.

pub mod aggregator;
pub mod reconciler;

pub use aggregator::{summarize, TradeSummary};
pub use reconciler::{
    reconcile_fill, recompute_after_edit, reverse_execution, FillOutcome, ReversalOutcome,
};
