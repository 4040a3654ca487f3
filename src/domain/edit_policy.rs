//! Which edits a position accepts.
//!
//! Once a position has history or is closed, the root trade's quantity and
//! entry price are locked. Every other field stays editable.

use chrono::NaiveDate;

use super::error::PositionError;
use super::position::PositionSummary;
use super::trade::TradePatch;

pub fn check_patch(
    position: &PositionSummary,
    trade_id: u64,
    patch: &TradePatch,
) -> Result<(), PositionError> {
    let trade = position
        .trade(trade_id)
        .ok_or(PositionError::UnknownTrade { id: trade_id })?;

    if patch.quantity.is_some_and(|q| q <= 0) {
        return Err(PositionError::validation("quantity must be positive"));
    }
    if patch.entry_price.is_some_and(|p| p.is_negative()) {
        return Err(PositionError::validation("entry price must be non-negative"));
    }
    if patch.exit_price.is_some_and(|p| p.is_negative()) {
        return Err(PositionError::validation("exit price must be non-negative"));
    }
    if let Some(exit_date) = patch.exit_date {
        let entry_date = patch.entry_date.unwrap_or(trade.entry_date);
        if exit_date < entry_date {
            return Err(PositionError::validation(format!(
                "exit date {exit_date} is before entry date {entry_date}"
            )));
        }
    }
    let exited = patch.exit_date.or(trade.exit_date).is_some();
    if !exited && (patch.exit_price.is_some() || patch.result.is_some()) {
        return Err(PositionError::validation(format!(
            "trade {trade_id} has no exit date, set one with the exit price or result"
        )));
    }

    let is_root = position.root().is_some_and(|root| root.id == trade_id);
    if let Some(entry_date) = patch.entry_date {
        check_entry_date(position, trade_id, is_root, entry_date)?;
    }
    if is_root && position.is_partially_editable() {
        if patch.quantity.is_some_and(|q| q != trade.quantity) {
            return Err(PositionError::EditLocked {
                trade_id,
                field: "quantity",
            });
        }
        if patch.entry_price.is_some_and(|p| p != trade.entry_price) {
            return Err(PositionError::EditLocked {
                trade_id,
                field: "entry_price",
            });
        }
    }
    Ok(())
}

/// Children may not predate the root entry, and the root may not move past
/// any of its children.
fn check_entry_date(
    position: &PositionSummary,
    trade_id: u64,
    is_root: bool,
    entry_date: NaiveDate,
) -> Result<(), PositionError> {
    let Some(root) = position.root() else {
        return Ok(());
    };
    if !is_root && entry_date < root.entry_date {
        return Err(PositionError::validation(format!(
            "entry date {entry_date} is before entry trade {} on {}",
            root.id, root.entry_date
        )));
    }
    if is_root {
        let earliest_child = position
            .trades_in_position
            .iter()
            .filter(|t| t.id != trade_id)
            .min_by_key(|t| (t.entry_date, t.id));
        if let Some(child) = earliest_child.filter(|c| c.entry_date < entry_date) {
            return Err(PositionError::validation(format!(
                "entry date {entry_date} is after trade {} on {}",
                child.id, child.entry_date
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::Money;
    use crate::domain::position::aggregate;
    use crate::domain::trade::{EventKind, Trade, TradeType};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn entry() -> Trade {
        Trade {
            id: 1,
            parent_id: None,
            ticker: "GGBR4".into(),
            trade_type: TradeType::Buy,
            kind: EventKind::Entry,
            entry_date: date(2024, 1, 1),
            entry_price: Money::from_cents(2000),
            quantity: 50,
            exit_date: None,
            exit_price: None,
            result: None,
            observations: None,
            setup: None,
        }
    }

    fn increment() -> Trade {
        Trade {
            id: 2,
            parent_id: Some(1),
            kind: EventKind::Increment,
            entry_date: date(2024, 1, 10),
            quantity: 10,
            ..entry()
        }
    }

    #[test]
    fn single_open_trade_is_fully_editable() {
        let position = aggregate(vec![entry()]).unwrap();
        let patch = TradePatch {
            quantity: Some(80),
            entry_price: Some(Money::from_cents(2100)),
            ..TradePatch::default()
        };
        assert!(check_patch(&position, 1, &patch).is_ok());
    }

    #[test]
    fn root_quantity_locked_with_history() {
        let position = aggregate(vec![entry(), increment()]).unwrap();
        let patch = TradePatch {
            quantity: Some(80),
            ..TradePatch::default()
        };
        assert_eq!(
            check_patch(&position, 1, &patch),
            Err(PositionError::EditLocked {
                trade_id: 1,
                field: "quantity",
            })
        );
    }

    #[test]
    fn root_entry_price_locked_when_closed() {
        let mut root = entry();
        root.kind = EventKind::FullExit;
        root.exit_date = Some(date(2024, 2, 1));
        root.exit_price = Some(Money::from_cents(2500));
        let position = aggregate(vec![root]).unwrap();
        let patch = TradePatch {
            entry_price: Some(Money::from_cents(1900)),
            ..TradePatch::default()
        };
        assert_eq!(
            check_patch(&position, 1, &patch),
            Err(PositionError::EditLocked {
                trade_id: 1,
                field: "entry_price",
            })
        );
    }

    #[test]
    fn unchanged_locked_values_pass() {
        let position = aggregate(vec![entry(), increment()]).unwrap();
        let patch = TradePatch {
            quantity: Some(50),
            entry_price: Some(Money::from_cents(2000)),
            setup: Some("retest".into()),
            ..TradePatch::default()
        };
        assert!(check_patch(&position, 1, &patch).is_ok());
    }

    #[test]
    fn non_root_trades_stay_editable() {
        let position = aggregate(vec![entry(), increment()]).unwrap();
        let patch = TradePatch {
            quantity: Some(15),
            ..TradePatch::default()
        };
        assert!(check_patch(&position, 2, &patch).is_ok());
    }

    #[test]
    fn unknown_trade() {
        let position = aggregate(vec![entry()]).unwrap();
        assert_eq!(
            check_patch(&position, 42, &TradePatch::default()),
            Err(PositionError::UnknownTrade { id: 42 })
        );
    }

    #[test]
    fn rejects_invalid_values() {
        let position = aggregate(vec![entry()]).unwrap();
        let zero_qty = TradePatch {
            quantity: Some(0),
            ..TradePatch::default()
        };
        assert!(matches!(
            check_patch(&position, 1, &zero_qty),
            Err(PositionError::Validation { .. })
        ));

        let early_exit = TradePatch {
            exit_date: Some(date(2023, 12, 31)),
            ..TradePatch::default()
        };
        assert!(matches!(
            check_patch(&position, 1, &early_exit),
            Err(PositionError::Validation { .. })
        ));
    }

    #[test]
    fn exit_values_need_an_exit_date() {
        let position = aggregate(vec![entry()]).unwrap();
        let patch = TradePatch {
            exit_price: Some(Money::from_cents(2400)),
            result: Some(Money::from_cents(20000)),
            ..TradePatch::default()
        };
        assert!(matches!(
            check_patch(&position, 1, &patch),
            Err(PositionError::Validation { .. })
        ));

        let with_date = TradePatch {
            exit_date: Some(date(2024, 2, 1)),
            ..patch
        };
        assert!(check_patch(&position, 1, &with_date).is_ok());
    }

    #[test]
    fn exited_record_accepts_new_exit_price() {
        let mut exit = increment();
        exit.kind = EventKind::PartialExit;
        exit.exit_date = Some(date(2024, 2, 1));
        exit.exit_price = Some(Money::from_cents(2300));
        let position = aggregate(vec![entry(), exit]).unwrap();
        let patch = TradePatch {
            exit_price: Some(Money::from_cents(2350)),
            ..TradePatch::default()
        };
        assert!(check_patch(&position, 2, &patch).is_ok());
    }

    #[test]
    fn child_cannot_move_before_entry() {
        let position = aggregate(vec![entry(), increment()]).unwrap();
        let patch = TradePatch {
            entry_date: Some(date(2023, 12, 28)),
            ..TradePatch::default()
        };
        assert!(matches!(
            check_patch(&position, 2, &patch),
            Err(PositionError::Validation { .. })
        ));
        let same_day = TradePatch {
            entry_date: Some(date(2024, 1, 1)),
            ..TradePatch::default()
        };
        assert!(check_patch(&position, 2, &same_day).is_ok());
    }

    #[test]
    fn root_cannot_move_past_children() {
        let position = aggregate(vec![entry(), increment()]).unwrap();
        let late = TradePatch {
            entry_date: Some(date(2024, 1, 11)),
            ..TradePatch::default()
        };
        assert!(matches!(
            check_patch(&position, 1, &late),
            Err(PositionError::Validation { .. })
        ));
        let earlier = TradePatch {
            entry_date: Some(date(2023, 12, 1)),
            ..TradePatch::default()
        };
        assert!(check_patch(&position, 1, &earlier).is_ok());
    }
}
