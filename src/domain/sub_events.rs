//! New partial exits and increments, recorded against the open trade.
//!
//! Only the current open trade of an open position accepts either. The
//! returned record still needs an id from the journal.

use chrono::NaiveDate;

use super::error::PositionError;
use super::events::classify_events;
use super::money::Money;
use super::position::PositionSummary;
use super::trade::{EventKind, Trade, TradeType};

#[derive(Debug, Clone, PartialEq)]
pub struct PartialExitRequest {
    pub quantity: i64,
    pub exit_date: NaiveDate,
    pub exit_price: Money,
    /// Computed from the average entry price when absent.
    pub result: Option<Money>,
    pub observations: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IncrementRequest {
    pub quantity: i64,
    pub entry_date: NaiveDate,
    pub entry_price: Money,
    pub observations: Option<String>,
}

fn require_open_trade(position: &PositionSummary, trade_id: u64) -> Result<&Trade, PositionError> {
    if position.trade(trade_id).is_none() {
        return Err(PositionError::UnknownTrade { id: trade_id });
    }
    if !position.is_open() {
        return Err(PositionError::NotOpenTrade { trade_id });
    }
    match classify_events(&position.trades_in_position).open_trade {
        Some(open) if open.id == trade_id => Ok(open),
        _ => Err(PositionError::NotOpenTrade { trade_id }),
    }
}

/// Quantity-weighted entry price over the root and its increments.
pub fn average_entry_price(position: &PositionSummary) -> Option<Money> {
    let root_id = position.root()?.id;
    Money::weighted_mean(
        position
            .trades_in_position
            .iter()
            .filter(|t| t.id == root_id || t.is_increment())
            .map(|t| (t.entry_price, t.quantity)),
    )
}

fn realized_result(
    trade_type: TradeType,
    entry: Money,
    exit: Money,
    quantity: i64,
) -> Result<Money, PositionError> {
    let per_unit = match trade_type {
        TradeType::Buy => exit - entry,
        TradeType::Sell => entry - exit,
    };
    per_unit
        .checked_mul_qty(quantity)
        .ok_or_else(|| PositionError::validation("result out of range"))
}

/// Builds the partial exit record for `trade_id`, the position's open trade.
pub fn plan_partial_exit(
    position: &PositionSummary,
    trade_id: u64,
    request: &PartialExitRequest,
) -> Result<Trade, PositionError> {
    let open = require_open_trade(position, trade_id)?;
    if request.quantity <= 0 {
        return Err(PositionError::validation("quantity must be positive"));
    }
    if request.quantity > position.open_quantity {
        return Err(PositionError::ExceedsOpenQuantity {
            requested: request.quantity,
            open: position.open_quantity,
        });
    }
    if !request.exit_price.is_positive() {
        return Err(PositionError::validation("exit price must be positive"));
    }
    if request.exit_date < open.entry_date {
        return Err(PositionError::validation(format!(
            "exit date {} is before entry date {}",
            request.exit_date, open.entry_date
        )));
    }

    let result = match request.result {
        Some(result) => result,
        None => {
            let entry = average_entry_price(position).unwrap_or(open.entry_price);
            realized_result(
                position.trade_type,
                entry,
                request.exit_price,
                request.quantity,
            )?
        }
    };

    Ok(Trade {
        id: 0,
        parent_id: Some(position.id),
        ticker: position.ticker.clone(),
        trade_type: position.trade_type,
        kind: EventKind::PartialExit,
        entry_date: open.entry_date,
        entry_price: open.entry_price,
        quantity: request.quantity,
        exit_date: Some(request.exit_date),
        exit_price: Some(request.exit_price),
        result: Some(result),
        observations: request.observations.clone(),
        setup: None,
    })
}

/// Builds the increment record for `trade_id`, the position's open trade.
pub fn plan_increment(
    position: &PositionSummary,
    trade_id: u64,
    request: &IncrementRequest,
) -> Result<Trade, PositionError> {
    require_open_trade(position, trade_id)?;
    if request.quantity <= 0 {
        return Err(PositionError::validation("quantity must be positive"));
    }
    if !request.entry_price.is_positive() {
        return Err(PositionError::validation("entry price must be positive"));
    }
    if request.entry_date < position.entry_date {
        return Err(PositionError::validation(format!(
            "entry date {} is before entry trade {} on {}",
            request.entry_date, position.id, position.entry_date
        )));
    }

    Ok(Trade {
        id: 0,
        parent_id: Some(position.id),
        ticker: position.ticker.clone(),
        trade_type: position.trade_type,
        kind: EventKind::Increment,
        entry_date: request.entry_date,
        entry_price: request.entry_price,
        quantity: request.quantity,
        exit_date: None,
        exit_price: None,
        result: None,
        observations: request.observations.clone(),
        setup: None,
    })
}
