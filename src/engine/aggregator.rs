use crate::domain::{BrokerFill, Decimal};
use serde::Serialize;

/// Read-time rollup over a trade's executions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TradeSummary {
    /// Sum of quantities regardless of side.
    pub total_shares_traded: i64,
    pub total_commission: Decimal,
    /// Sum of gross proceeds.
    pub gross_profit_loss: Decimal,
    /// Sum of sec + taf + nscc + nasdaq.
    pub total_fees: Decimal,
}

/// Roll up a set of executions. An empty set yields zeros.
pub fn summarize<T: AsRef<BrokerFill>>(executions: &[T]) -> TradeSummary {
    executions
        .iter()
        .fold(TradeSummary::default(), |mut acc, execution| {
            let fill: &BrokerFill = execution.as_ref();
            acc.total_shares_traded += fill.quantity;
            acc.total_commission += fill.commission;
            acc.gross_profit_loss += fill.gross_proceeds;
            acc.total_fees += fill.regulatory_fees();
            acc
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::execution::test_support::{d, fill};
    use crate::domain::Side;

    #[test]
    fn test_total_shares_ignores_side() {
        let fills = vec![
            fill(Side::Buy, 50, "10", "2023-08-09", "09:30:00"),
            fill(Side::Buy, 30, "10", "2023-08-09", "09:31:00"),
            fill(Side::Sell, 20, "11", "2023-08-09", "09:32:00"),
        ];

        let summary = summarize(&fills);

        assert_eq!(summary.total_shares_traded, 100);
        assert_eq!(summary.gross_profit_loss, d("-580"));
    }

    #[test]
    fn test_fees_and_commission_are_summed() {
        let mut a = fill(Side::Buy, 100, "10", "2023-08-09", "09:30:00");
        a.commission = d("1.50");
        a.sec = d("0.01");
        a.taf = d("0.02");
        a.nscc = d("0.03");
        a.nasdaq = d("0.04");
        let mut b = fill(Side::Sell, 100, "10.5", "2023-08-09", "09:35:00");
        b.commission = d("1.50");
        b.sec = d("0.10");

        let summary = summarize(&[a, b]);

        assert_eq!(summary.total_commission, d("3"));
        assert_eq!(summary.total_fees, d("0.20"));
        assert_eq!(summary.gross_profit_loss, d("50"));
    }

    #[test]
    fn test_empty_set_is_all_zero() {
        let summary = summarize::<BrokerFill>(&[]);
        assert_eq!(summary, TradeSummary::default());
        assert!(summary.total_fees.is_zero());
    }
}
