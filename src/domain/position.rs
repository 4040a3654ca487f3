//! Position aggregation: reduces the trade records of one position to a
//! derived summary.
//!
//! The summary is recomputed from scratch on every call and carries no
//! identity of its own beyond the id of its root entry.

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use super::closed_stats::compute_closed_stats;
use super::error::PositionError;
use super::events::classify_events;
use super::money::Money;
use super::trade::{Trade, TradeType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionStatus {
    Open,
    Closed,
}

impl fmt::Display for PositionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionStatus::Open => f.pad("Open"),
            PositionStatus::Closed => f.pad("Closed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PositionSummary {
    /// Id of the root entry trade.
    pub id: u64,
    pub ticker: String,
    pub trade_type: TradeType,
    pub entry_date: NaiveDate,
    pub entry_price: Money,
    pub setup: Option<String>,
    pub observations: Option<String>,
    pub status: PositionStatus,
    pub initial_quantity: i64,
    pub open_quantity: i64,
    pub total_realized_profit: Money,
    /// Root first, the rest by entry date, then id.
    pub trades_in_position: Vec<Trade>,
}

impl PositionSummary {
    pub fn root(&self) -> Option<&Trade> {
        self.trades_in_position.first()
    }

    pub fn trade(&self, id: u64) -> Option<&Trade> {
        self.trades_in_position.iter().find(|t| t.id == id)
    }

    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }

    pub fn is_partially_editable(&self) -> bool {
        is_partially_editable(self)
    }
}

/// Whether edits to the root trade must leave quantity and entry price alone.
pub fn is_partially_editable(position: &PositionSummary) -> bool {
    position.status == PositionStatus::Closed || position.trades_in_position.len() > 1
}

/// Entered, exited and remaining quantity of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quantities {
    pub initial: i64,
    pub exited: i64,
    pub open: i64,
}

/// The root entry of a position: an `Entry` or `FullExit` record, preferring
/// the one without a parent, then the earliest entry date, then the lowest id.
pub fn find_root(trades: &[Trade]) -> Option<&Trade> {
    trades
        .iter()
        .filter(|t| t.is_entry_record())
        .min_by_key(|t| t.precedence_key())
}

/// Quantities of a position, in any record order.
pub fn quantities(trades: &[Trade]) -> Quantities {
    let Some(root) = find_root(trades) else {
        return Quantities {
            initial: 0,
            exited: 0,
            open: 0,
        };
    };
    let others = || trades.iter().filter(|t| t.id != root.id);

    let increments: i64 = others()
        .filter(|t| t.is_increment())
        .map(|t| t.quantity)
        .sum();
    let initial = root.quantity + increments;
    let exited: i64 = others().filter(|t| t.is_exit()).map(|t| t.quantity).sum();
    let open = if root.is_exit() {
        0
    } else {
        (initial - exited).max(0)
    };

    Quantities {
        initial,
        exited,
        open,
    }
}

/// Derives the summary of one position from all of its trade records.
///
/// The result does not depend on the order of `trades`.
pub fn aggregate(mut trades: Vec<Trade>) -> Result<PositionSummary, PositionError> {
    validate(&trades)?;
    let root_id = find_root(&trades)
        .map(|t| t.id)
        .ok_or_else(|| PositionError::validation("no entry trade in position"))?;
    trades.sort_by_key(|t| (t.id != root_id, t.entry_date, t.id));

    let classification = classify_events(&trades);
    let stats = compute_closed_stats(&trades);
    let qty = quantities(&trades);

    let status = match classification.open_trade {
        Some(_) if qty.open > 0 => PositionStatus::Open,
        _ => PositionStatus::Closed,
    };
    let open_quantity = match status {
        PositionStatus::Open => qty.open,
        PositionStatus::Closed => 0,
    };

    let root = &trades[0];
    tracing::debug!(
        position = root.id,
        ticker = %root.ticker,
        %status,
        initial = qty.initial,
        open = open_quantity,
        trades = trades.len(),
        "aggregated position"
    );

    Ok(PositionSummary {
        id: root.id,
        ticker: root.ticker.clone(),
        trade_type: root.trade_type,
        entry_date: root.entry_date,
        entry_price: root.entry_price,
        setup: root.setup.clone(),
        observations: root.observations.clone(),
        status,
        initial_quantity: qty.initial,
        open_quantity,
        total_realized_profit: stats.total_realized_profit,
        trades_in_position: trades,
    })
}

fn validate(trades: &[Trade]) -> Result<(), PositionError> {
    let Some(first) = trades.first() else {
        return Err(PositionError::validation("empty trade set"));
    };

    let mut ids = HashSet::with_capacity(trades.len());
    for t in trades {
        if !ids.insert(t.id) {
            return Err(PositionError::validation(format!(
                "duplicate trade id {}",
                t.id
            )));
        }
        if t.quantity <= 0 {
            return Err(PositionError::validation(format!(
                "trade {} has non-positive quantity {}",
                t.id, t.quantity
            )));
        }
        if t.entry_price.is_negative() {
            return Err(PositionError::validation(format!(
                "trade {} has negative entry price {}",
                t.id, t.entry_price
            )));
        }
        if t.ticker != first.ticker {
            return Err(PositionError::validation(format!(
                "trade {} is for {} but the position is {}",
                t.id, t.ticker, first.ticker
            )));
        }
        if t.trade_type != first.trade_type {
            return Err(PositionError::validation(format!(
                "trade {} is a {} but the position is a {}",
                t.id, t.trade_type, first.trade_type
            )));
        }
    }
    Ok(())
}

/// Splits a flat journal into positions keyed by root id, ascending.
pub fn group_positions(trades: Vec<Trade>) -> Vec<Vec<Trade>> {
    let mut groups: BTreeMap<u64, Vec<Trade>> = BTreeMap::new();
    for trade in trades {
        groups.entry(trade.position_key()).or_default().push(trade);
    }
    groups.into_values().collect()
}
