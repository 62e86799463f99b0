//! Stable execution ordering for deterministic reconciliation.

use crate::domain::execution::CROSS_PRINT_TYPE;
use crate::domain::{BrokerFill, Side};
use std::cmp::Ordering;

/// Compare two fills in processing order.
///
/// Ordering: trade date -> execution time -> Buy before Sell when both are
/// cross prints at the same instant. Everything else ties.
pub fn compare_fills(a: &BrokerFill, b: &BrokerFill) -> Ordering {
    a.trade_date
        .cmp(&b.trade_date)
        .then_with(|| a.execution_time.cmp(&b.execution_time))
        .then_with(|| cross_print_tie_break(a, b))
}

fn cross_print_tie_break(a: &BrokerFill, b: &BrokerFill) -> Ordering {
    if a.exec_type != CROSS_PRINT_TYPE || b.exec_type != CROSS_PRINT_TYPE {
        return Ordering::Equal;
    }
    match (a.side, b.side) {
        (Side::Buy, Side::Sell) => Ordering::Less,
        (Side::Sell, Side::Buy) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

/// Sort into processing order (earliest first). Exact ties keep input order.
pub fn sort_for_processing<T: AsRef<BrokerFill>>(items: &mut [T]) {
    items.sort_by(|a, b| compare_fills(a.as_ref(), b.as_ref()));
}

/// Sort most recent first, the exact reverse of processing order.
pub fn sort_most_recent_first<T: AsRef<BrokerFill>>(items: &mut [T]) {
    items.sort_by(|a, b| compare_fills(b.as_ref(), a.as_ref()));
}
