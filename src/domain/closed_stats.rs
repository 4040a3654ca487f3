//! Figures derived from the closed records of a position.

use chrono::NaiveDate;

use super::money::Money;
use super::trade::Trade;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosedStats {
    pub average_exit_price: Money,
    pub last_exit_date: Option<NaiveDate>,
    pub total_realized_profit: Money,
    pub closed_count: usize,
}

/// Aggregates over records whose exit price is set and positive.
pub fn compute_closed_stats(trades: &[Trade]) -> ClosedStats {
    let closed: Vec<&Trade> = trades.iter().filter(|t| t.is_closed()).collect();

    let average_exit_price = Money::weighted_mean(
        closed
            .iter()
            .filter_map(|t| t.exit_price.map(|price| (price, t.quantity))),
    )
    .unwrap_or(Money::ZERO);

    ClosedStats {
        average_exit_price,
        last_exit_date: closed.iter().filter_map(|t| t.exit_date).max(),
        total_realized_profit: closed.iter().filter_map(|t| t.result).sum(),
        closed_count: closed.len(),
    }
}
