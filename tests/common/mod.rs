#![allow(dead_code)]

use chrono::NaiveDate;
use positionbook::domain::error::JournalError;
pub use positionbook::domain::money::Money;
pub use positionbook::domain::trade::{EventKind, Trade, TradePatch, TradeType};
use positionbook::ports::trade_port::TradePort;
use std::cell::RefCell;

/// In-memory journal. `reject_mutations` makes every update/delete fail.
pub struct MockTradePort {
    pub trades: RefCell<Vec<Trade>>,
    pub reject_mutations: Option<String>,
}

impl MockTradePort {
    pub fn new(trades: Vec<Trade>) -> Self {
        Self {
            trades: RefCell::new(trades),
            reject_mutations: None,
        }
    }

    pub fn rejecting(mut self, reason: &str) -> Self {
        self.reject_mutations = Some(reason.to_string());
        self
    }

    fn check_writable(&self) -> Result<(), JournalError> {
        match &self.reject_mutations {
            Some(reason) => Err(JournalError::Journal {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl TradePort for MockTradePort {
    fn load_trades(&self) -> Result<Vec<Trade>, JournalError> {
        Ok(self.trades.borrow().clone())
    }

    fn update_trade(&self, id: u64, patch: &TradePatch) -> Result<(), JournalError> {
        self.check_writable()?;
        let mut trades = self.trades.borrow_mut();
        let trade = trades
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(JournalError::TradeNotFound { id })?;
        patch.apply(trade);
        Ok(())
    }

    fn delete_trade(&self, id: u64) -> Result<(), JournalError> {
        self.check_writable()?;
        let mut trades = self.trades.borrow_mut();
        let before = trades.len();
        trades.retain(|t| t.id != id);
        if trades.len() == before {
            return Err(JournalError::TradeNotFound { id });
        }
        Ok(())
    }

    fn delete_position(&self, root_id: u64) -> Result<usize, JournalError> {
        self.check_writable()?;
        let mut trades = self.trades.borrow_mut();
        let before = trades.len();
        trades.retain(|t| t.position_key() != root_id);
        match before - trades.len() {
            0 => Err(JournalError::TradeNotFound { id: root_id }),
            removed => Ok(removed),
        }
    }

    fn insert_trade(&self, mut trade: Trade) -> Result<Trade, JournalError> {
        self.check_writable()?;
        let mut trades = self.trades.borrow_mut();
        trade.id = trades.iter().map(|t| t.id).max().unwrap_or(0) + 1;
        trades.push(trade.clone());
        Ok(trade)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn money(s: &str) -> Money {
    s.parse().unwrap()
}

pub fn make_entry(id: u64, ticker: &str, qty: i64, price: &str, on: NaiveDate) -> Trade {
    Trade {
        id,
        parent_id: None,
        ticker: ticker.to_string(),
        trade_type: TradeType::Buy,
        kind: EventKind::Entry,
        entry_date: on,
        entry_price: money(price),
        quantity: qty,
        exit_date: None,
        exit_price: None,
        result: None,
        observations: None,
        setup: Some("breakout".to_string()),
    }
}

pub fn make_increment(id: u64, root: &Trade, qty: i64, price: &str, on: NaiveDate) -> Trade {
    Trade {
        id,
        parent_id: Some(root.id),
        kind: EventKind::Increment,
        entry_date: on,
        entry_price: money(price),
        quantity: qty,
        observations: Some(format!("Increment to trade {}", root.id)),
        setup: None,
        ..root.clone()
    }
}

pub fn make_partial_exit(
    id: u64,
    root: &Trade,
    qty: i64,
    price: &str,
    on: NaiveDate,
    result: &str,
) -> Trade {
    Trade {
        id,
        parent_id: Some(root.id),
        kind: EventKind::PartialExit,
        quantity: qty,
        exit_date: Some(on),
        exit_price: Some(money(price)),
        result: Some(money(result)),
        observations: None,
        setup: None,
        ..root.clone()
    }
}

/// Entry 100 @ 10.00 on 2024-01-01, partial exit 40 @ 12.00 on 2024-02-01
/// (result 80.00), increment 20 @ 11.00 on 2024-01-15.
pub fn scenario_trades() -> Vec<Trade> {
    let root = make_entry(1, "PETR4", 100, "10.00", date(2024, 1, 1));
    let exit = make_partial_exit(2, &root, 40, "12.00", date(2024, 2, 1), "80.00");
    let increment = make_increment(3, &root, 20, "11.00", date(2024, 1, 15));
    vec![root, exit, increment]
}

pub const JOURNAL_HEADER: &str = "id,parent_id,ticker,type,kind,entry_date,entry_price,quantity,exit_date,exit_price,result,observations,setup\n";
