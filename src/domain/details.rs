//! Everything a presentation layer needs about one position, derived in a
//! single pass from its summary.

use super::closed_stats::{ClosedStats, compute_closed_stats};
use super::events::classify_events;
use super::inconsistency::Inconsistency;
use super::position::{PositionStatus, PositionSummary, quantities};
use super::trade::Trade;

#[derive(Debug, Clone, PartialEq)]
pub struct PositionDetails<'a> {
    pub summary: &'a PositionSummary,
    /// Only reported while the position is open.
    pub open_trade: Option<&'a Trade>,
    pub history_events: Vec<&'a Trade>,
    pub closed_stats: ClosedStats,
    pub partially_editable: bool,
    pub inconsistencies: Vec<Inconsistency>,
}

impl<'a> PositionDetails<'a> {
    /// Derives the views and cross-checks the summary against its records.
    ///
    /// `aggregate` takes the realized profit from the same closed records, so
    /// `RealizedProfitMismatch` only fires for a summary that was stored or
    /// changed after aggregation.
    pub fn build(summary: &'a PositionSummary) -> Self {
        let trades = summary.trades_in_position.as_slice();
        let classification = classify_events(trades);
        let closed_stats = compute_closed_stats(trades);
        let mut inconsistencies = classification.inconsistencies;

        let root_exited = summary.root().is_some_and(Trade::is_exit);
        if root_exited {
            let still_open: Vec<u64> = trades
                .iter()
                .filter(|t| t.is_open_candidate())
                .map(|t| t.id)
                .collect();
            if !still_open.is_empty() {
                inconsistencies.push(Inconsistency::OpenTradeOnClosedPosition {
                    trade_ids: still_open,
                });
            }
        }

        if let Some(root) = summary.root() {
            let early: Vec<u64> = trades
                .iter()
                .filter(|t| t.id != root.id && t.entry_date < root.entry_date)
                .map(|t| t.id)
                .collect();
            if !early.is_empty() {
                inconsistencies.push(Inconsistency::PredatesEntry {
                    root: root.id,
                    trade_ids: early,
                });
            }
        }

        let qty = quantities(trades);
        if !root_exited && qty.exited > qty.initial {
            inconsistencies.push(Inconsistency::Overexited {
                initial: qty.initial,
                exited: qty.exited,
            });
        }

        if summary.total_realized_profit != closed_stats.total_realized_profit {
            inconsistencies.push(Inconsistency::RealizedProfitMismatch {
                summary: summary.total_realized_profit,
                recomputed: closed_stats.total_realized_profit,
            });
        }

        for inconsistency in &inconsistencies {
            inconsistency.log(summary.id);
        }

        let open_trade = match summary.status {
            PositionStatus::Open => classification.open_trade,
            PositionStatus::Closed => None,
        };

        PositionDetails {
            summary,
            open_trade,
            history_events: classification.history_events,
            closed_stats,
            partially_editable: summary.is_partially_editable(),
            inconsistencies,
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.inconsistencies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::Money;
    use crate::domain::position::aggregate;
    use crate::domain::trade::{EventKind, TradeType};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn entry(id: u64, qty: i64) -> Trade {
        Trade {
            id,
            parent_id: None,
            ticker: "B3SA3".into(),
            trade_type: TradeType::Sell,
            kind: EventKind::Entry,
            entry_date: date(2024, 1, 1),
            entry_price: Money::from_cents(1200),
            quantity: qty,
            exit_date: None,
            exit_price: None,
            result: None,
            observations: None,
            setup: None,
        }
    }

    fn partial(id: u64, qty: i64, price: i64, result: i64) -> Trade {
        Trade {
            parent_id: Some(1),
            kind: EventKind::PartialExit,
            exit_date: Some(date(2024, 2, 1)),
            exit_price: Some(Money::from_cents(price)),
            result: Some(Money::from_cents(result)),
            ..entry(id, qty)
        }
    }

    #[test]
    fn open_position_details() {
        let summary = aggregate(vec![entry(1, 100), partial(2, 40, 1000, 8000)]).unwrap();
        let details = PositionDetails::build(&summary);
        assert_eq!(details.open_trade.map(|t| t.id), Some(1));
        assert_eq!(details.history_events.len(), 1);
        assert_eq!(details.closed_stats.average_exit_price, Money::from_cents(1000));
        assert!(details.partially_editable);
        assert!(details.is_consistent());
    }

    #[test]
    fn closed_by_partials_hides_open_trade() {
        let summary = aggregate(vec![entry(1, 40), partial(2, 40, 1000, 8000)]).unwrap();
        let details = PositionDetails::build(&summary);
        assert_eq!(summary.status, PositionStatus::Closed);
        assert!(details.open_trade.is_none());
        assert!(details.is_consistent());
    }

    #[test]
    fn reports_profit_mismatch_without_resolving_it() {
        let mut summary = aggregate(vec![entry(1, 100), partial(2, 40, 1000, 8000)]).unwrap();
        summary.total_realized_profit = Money::from_cents(9000);
        let details = PositionDetails::build(&summary);
        assert_eq!(
            details.inconsistencies,
            vec![Inconsistency::RealizedProfitMismatch {
                summary: Money::from_cents(9000),
                recomputed: Money::from_cents(8000),
            }]
        );
        assert_eq!(details.summary.total_realized_profit, Money::from_cents(9000));
        assert_eq!(
            details.closed_stats.total_realized_profit,
            Money::from_cents(8000)
        );
    }

    #[test]
    fn reports_records_dated_before_entry() {
        let mut root = entry(1, 100);
        root.entry_date = date(2024, 1, 10);
        let mut early = partial(2, 40, 1000, 8000);
        early.entry_date = date(2024, 1, 3);
        let summary = aggregate(vec![early, root]).unwrap();
        let details = PositionDetails::build(&summary);
        assert_eq!(summary.status, PositionStatus::Open);
        assert_eq!(details.open_trade.map(|t| t.id), Some(1));
        assert_eq!(
            details.inconsistencies,
            vec![Inconsistency::PredatesEntry {
                root: 1,
                trade_ids: vec![2],
            }]
        );
    }

    #[test]
    fn reports_overexit() {
        let summary = aggregate(vec![entry(1, 10), partial(2, 15, 1000, 100)]).unwrap();
        let details = PositionDetails::build(&summary);
        assert!(details.inconsistencies.contains(&Inconsistency::Overexited {
            initial: 10,
            exited: 15,
        }));
    }

    #[test]
    fn reports_open_record_on_closed_root() {
        let mut root = entry(1, 10);
        root.kind = EventKind::FullExit;
        root.exit_date = Some(date(2024, 3, 1));
        root.exit_price = Some(Money::from_cents(1000));
        let mut stray = entry(5, 10);
        stray.parent_id = Some(1);
        stray.entry_date = date(2024, 1, 20);

        let summary = aggregate(vec![root, stray]).unwrap();
        let details = PositionDetails::build(&summary);
        assert_eq!(summary.status, PositionStatus::Closed);
        assert!(details.open_trade.is_none());
        assert_eq!(
            details.inconsistencies,
            vec![Inconsistency::OpenTradeOnClosedPosition { trade_ids: vec![5] }]
        );
    }
}
