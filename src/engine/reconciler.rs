use crate::domain::ordering::sort_most_recent_first;
use crate::domain::{
    BrokerFill, Decimal, Execution, ExecutionChanges, Trade, TradeId, TradeStatus, UserId,
};

/// What a reconciled fill did to its trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillOutcome {
    /// No open trade existed; a new one was started.
    Opened,
    /// The open trade absorbed the fill and stays open.
    Adjusted,
    /// The fill brought net shares to zero.
    Closed,
}

/// What removing an execution did to its trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReversalOutcome {
    /// Net shares are non-zero; the trade is (again) open.
    Open,
    /// Net shares are zero with executions remaining; the trade is closed.
    Closed,
    /// No executions remain; the trade itself should be removed.
    Emptied,
}

/// Reconcile one sequenced fill against the user's open trade for its symbol.
///
/// `open` must be the unique open trade for `(user_id, fill.symbol)`, or
/// `None` when the user holds no open position in that symbol.
pub fn reconcile_fill(
    user_id: &UserId,
    open: Option<Trade>,
    fill: &BrokerFill,
) -> (Trade, FillOutcome) {
    match open {
        None => {
            let trade = open_trade(user_id, fill);
            let outcome = if trade.shares == 0 {
                FillOutcome::Closed
            } else {
                FillOutcome::Opened
            };
            (trade, outcome)
        }
        Some(mut trade) => {
            debug_assert!(trade.is_open(), "reconcile_fill requires an open trade");
            let outcome = apply_fill(&mut trade, fill);
            (trade, outcome)
        }
    }
}

/// Start a new trade from its first fill.
fn open_trade(user_id: &UserId, fill: &BrokerFill) -> Trade {
    let mut trade = Trade {
        id: TradeId::generate(),
        user_id: user_id.clone(),
        symbol: fill.symbol.clone(),
        status: TradeStatus::Open,
        open_date: fill.trade_date,
        open_time: fill.execution_time,
        close_date: None,
        close_time: None,
        shares: fill.signed_quantity(),
        profit_loss: fill.cash_effect().round_money(),
        open_price: fill.price,
        notes: None,
        version: 0,
    };
    if trade.shares == 0 {
        trade.close_at(fill.trade_date, fill.execution_time);
    }
    trade
}

/// Fold a fill into an open trade.
fn apply_fill(trade: &mut Trade, fill: &BrokerFill) -> FillOutcome {
    trade.shares += fill.signed_quantity();
    trade.profit_loss = (trade.profit_loss + fill.cash_effect()).round_money();

    if trade.shares == 0 {
        trade.close_at(fill.trade_date, fill.execution_time);
        FillOutcome::Closed
    } else {
        FillOutcome::Adjusted
    }
}

/// Re-derive a trade after one of its executions was edited.
///
/// `linked` holds every execution of the trade with the edit already applied.
/// Profit/loss is recomputed as the sum of net proceeds when net proceeds
/// changed; shares and status are recomputed when quantity changed. Nothing
/// is patched incrementally, and a closed trade may reopen.
pub fn recompute_after_edit(trade: &mut Trade, linked: &[Execution], changes: &ExecutionChanges) {
    let mut by_recency: Vec<&Execution> = linked.iter().collect();
    sort_most_recent_first(&mut by_recency);

    if changes.net_proceeds.is_some() {
        trade.profit_loss = linked
            .iter()
            .map(|e| e.fill.net_proceeds)
            .sum::<Decimal>()
            .round_money();
    }

    if changes.quantity.is_some() {
        let net_shares: i64 = linked.iter().map(|e| e.fill.signed_quantity()).sum();
        trade.shares = net_shares;

        if net_shares != 0 {
            trade.reopen();
        } else if let Some(latest) = by_recency.first() {
            trade.close_at(latest.fill.trade_date, latest.fill.execution_time);
        }
    }
}

/// Undo one execution's contribution to its trade before it is deleted.
///
/// `remaining` holds the trade's other executions. The share delta and the
/// rounded net proceeds are subtracted directly rather than re-derived.
pub fn reverse_execution(
    trade: &mut Trade,
    removed: &Execution,
    remaining: &[Execution],
) -> ReversalOutcome {
    trade.shares -= removed.fill.signed_quantity();
    trade.profit_loss = (trade.profit_loss - removed.fill.net_proceeds.round_money()).round_money();

    if remaining.is_empty() {
        return ReversalOutcome::Emptied;
    }

    if trade.shares != 0 {
        trade.reopen();
        return ReversalOutcome::Open;
    }

    if trade.is_open() {
        let mut by_recency: Vec<&Execution> = remaining.iter().collect();
        sort_most_recent_first(&mut by_recency);
        if let Some(latest) = by_recency.first() {
            trade.close_at(latest.fill.trade_date, latest.fill.execution_time);
        }
    }
    ReversalOutcome::Closed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::execution::test_support::{d, fill};
    use crate::domain::Side;
    use chrono::{NaiveDate, NaiveTime};

    fn with_fees(mut f: BrokerFill, commission: &str, fees: &str) -> BrokerFill {
        f.commission = d(commission);
        f.sec = d(fees);
        f.net_proceeds = f.cash_effect();
        f
    }

    fn user() -> UserId {
        UserId::new("7b0c6a6e-54a4-4b36-9a3e-6c1f1f0a2b11".to_string())
    }

    #[test]
    fn test_first_fill_opens_trade() {
        let buy = with_fees(fill(Side::Buy, 100, "234.10", "2023-08-09", "09:30:00"), "1", "1.02");

        let (trade, outcome) = reconcile_fill(&user(), None, &buy);

        assert_eq!(outcome, FillOutcome::Opened);
        assert_eq!(trade.status, TradeStatus::Open);
        assert_eq!(trade.shares, 100);
        assert_eq!(trade.profit_loss, d("-23412.02"));
        assert_eq!(trade.open_price, d("234.10"));
        assert_eq!(trade.open_date, NaiveDate::from_ymd_opt(2023, 8, 9).unwrap());
        assert_eq!(trade.close_date, None);
        assert!(trade.is_consistent());
    }

    #[test]
    fn test_closing_fill_closes_at_its_instant() {
        let buy = with_fees(fill(Side::Buy, 100, "234.10", "2023-08-09", "09:30:00"), "1", "1.02");
        let sell = with_fees(fill(Side::Sell, 100, "240.00", "2023-08-10", "10:15:00"), "1", "1.02");

        let (trade, _) = reconcile_fill(&user(), None, &buy);
        let (trade, outcome) = reconcile_fill(&user(), Some(trade), &sell);

        assert_eq!(outcome, FillOutcome::Closed);
        assert_eq!(trade.status, TradeStatus::Closed);
        assert_eq!(trade.shares, 0);
        assert_eq!(trade.profit_loss, d("585.96"));
        assert_eq!(trade.close_date, NaiveDate::from_ymd_opt(2023, 8, 10));
        assert_eq!(trade.close_time, NaiveTime::from_hms_opt(10, 15, 0));
        assert!(trade.is_consistent());
    }

    #[test]
    fn test_partial_fill_keeps_trade_open() {
        let buy = fill(Side::Buy, 100, "10", "2023-08-09", "09:30:00");
        let sell = fill(Side::Sell, 40, "11", "2023-08-09", "09:45:00");

        let (trade, _) = reconcile_fill(&user(), None, &buy);
        let (trade, outcome) = reconcile_fill(&user(), Some(trade), &sell);

        assert_eq!(outcome, FillOutcome::Adjusted);
        assert_eq!(trade.shares, 60);
        assert_eq!(trade.profit_loss, d("-560"));
        assert_eq!(trade.open_price, d("10"));
        assert!(trade.is_consistent());
    }

    #[test]
    fn test_profit_loss_is_rounded_each_step() {
        let mut buy = fill(Side::Buy, 3, "1.111", "2023-08-09", "09:30:00");
        buy.commission = d("0.005");

        let (trade, _) = reconcile_fill(&user(), None, &buy);

        // -3.333 - 0.005 = -3.338
        assert_eq!(trade.profit_loss, d("-3.34"));
    }

    fn closed_round_trip() -> (Trade, Vec<Execution>) {
        let buy = with_fees(fill(Side::Buy, 100, "234.10", "2023-08-09", "09:30:00"), "1", "1.02");
        let sell = with_fees(fill(Side::Sell, 100, "240.00", "2023-08-09", "10:00:00"), "1", "1.02");

        let (trade, _) = reconcile_fill(&user(), None, &buy);
        let e1 = Execution::from_fill(buy, trade.id.clone());
        let (trade, _) = reconcile_fill(&user(), Some(trade), &sell);
        let e2 = Execution::from_fill(sell, trade.id.clone());
        (trade, vec![e1, e2])
    }

    #[test]
    fn test_delete_closing_execution_restores_open_trade() {
        let (mut trade, executions) = closed_round_trip();
        assert_eq!(trade.profit_loss, d("585.96"));

        let outcome = reverse_execution(&mut trade, &executions[1], &executions[..1]);

        assert_eq!(outcome, ReversalOutcome::Open);
        assert_eq!(trade.status, TradeStatus::Open);
        assert_eq!(trade.shares, 100);
        assert_eq!(trade.profit_loss, d("-23412.02"));
        assert_eq!(trade.close_date, None);
        assert_eq!(trade.close_time, None);
        assert!(trade.is_consistent());
    }

    #[test]
    fn test_delete_last_execution_empties_trade() {
        let buy = fill(Side::Buy, 100, "10", "2023-08-09", "09:30:00");
        let (mut trade, _) = reconcile_fill(&user(), None, &buy);
        let e1 = Execution::from_fill(buy, trade.id.clone());

        let outcome = reverse_execution(&mut trade, &e1, &[]);

        assert_eq!(outcome, ReversalOutcome::Emptied);
        assert_eq!(trade.shares, 0);
    }

    #[test]
    fn test_delete_that_nets_to_zero_closes_at_latest_remaining() {
        let b1 = fill(Side::Buy, 50, "10", "2023-08-09", "09:30:00");
        let b2 = fill(Side::Buy, 50, "10", "2023-08-09", "09:31:00");
        let s1 = fill(Side::Sell, 50, "11", "2023-08-09", "09:40:00");

        let (trade, _) = reconcile_fill(&user(), None, &b1);
        let (trade, _) = reconcile_fill(&user(), Some(trade), &b2);
        let (mut trade, outcome) = reconcile_fill(&user(), Some(trade), &s1);
        assert_eq!(outcome, FillOutcome::Adjusted);

        let id = trade.id.clone();
        let executions: Vec<Execution> = [b1, b2, s1]
            .into_iter()
            .map(|f| Execution::from_fill(f, id.clone()))
            .collect();
        let remaining = vec![executions[0].clone(), executions[2].clone()];

        let outcome = reverse_execution(&mut trade, &executions[1], &remaining);

        assert_eq!(outcome, ReversalOutcome::Closed);
        assert_eq!(trade.shares, 0);
        assert_eq!(trade.close_time, NaiveTime::from_hms_opt(9, 40, 0));
        assert!(trade.is_consistent());
    }

    #[test]
    fn test_edit_net_proceeds_resums_all_executions() {
        let (mut trade, mut executions) = closed_round_trip();
        let changes = ExecutionChanges {
            net_proceeds: Some(d("-23000.00")),
            ..Default::default()
        };
        changes.apply_to(&mut executions[0]);

        recompute_after_edit(&mut trade, &executions, &changes);

        // -23000.00 + 23997.98
        assert_eq!(trade.profit_loss, d("997.98"));
        assert_eq!(trade.status, TradeStatus::Closed);
        assert_eq!(trade.shares, 0);
    }

    #[test]
    fn test_edit_quantity_reopens_closed_trade() {
        let (mut trade, mut executions) = closed_round_trip();
        let changes = ExecutionChanges {
            quantity: Some(60),
            ..Default::default()
        };
        changes.apply_to(&mut executions[1]);

        recompute_after_edit(&mut trade, &executions, &changes);

        assert_eq!(trade.shares, 40);
        assert_eq!(trade.status, TradeStatus::Open);
        assert_eq!(trade.close_date, None);
        assert_eq!(trade.profit_loss, d("585.96"), "quantity edits leave P/L alone");
        assert!(trade.is_consistent());
    }

    #[test]
    fn test_edit_quantity_closes_at_most_recent_execution() {
        let b1 = fill(Side::Buy, 100, "10", "2023-08-09", "09:30:00");
        let s1 = fill(Side::Sell, 60, "11", "2023-08-09", "09:45:00");
        let (trade, _) = reconcile_fill(&user(), None, &b1);
        let (mut trade, _) = reconcile_fill(&user(), Some(trade), &s1);
        let id = trade.id.clone();
        let mut executions = vec![
            Execution::from_fill(b1, id.clone()),
            Execution::from_fill(s1, id),
        ];

        let changes = ExecutionChanges {
            quantity: Some(60),
            ..Default::default()
        };
        changes.apply_to(&mut executions[0]);
        recompute_after_edit(&mut trade, &executions, &changes);

        assert_eq!(trade.shares, 0);
        assert_eq!(trade.status, TradeStatus::Closed);
        assert_eq!(trade.close_time, NaiveTime::from_hms_opt(9, 45, 0));
        assert!(trade.is_consistent());
    }

    #[test]
    fn test_edit_both_fields_applies_both_recomputations() {
        let (mut trade, mut executions) = closed_round_trip();
        let changes = ExecutionChanges {
            quantity: Some(150),
            net_proceeds: Some(d("-35000")),
            ..Default::default()
        };
        changes.apply_to(&mut executions[0]);

        recompute_after_edit(&mut trade, &executions, &changes);

        assert_eq!(trade.shares, 50);
        assert_eq!(trade.profit_loss, d("-11002.02"));
        assert!(trade.is_open());
    }

    #[test]
    fn test_new_fill_after_close_starts_new_trade() {
        let (closed, _) = closed_round_trip();
        let buy = fill(Side::Buy, 10, "250", "2023-08-11", "09:30:00");

        // The closed trade is never offered back to the reconciler.
        let (trade, outcome) = reconcile_fill(&user(), None, &buy);

        assert_eq!(outcome, FillOutcome::Opened);
        assert_ne!(trade.id, closed.id);
    }
}
