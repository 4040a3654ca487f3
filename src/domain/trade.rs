//! Trade records: the atomic inputs of a position.

use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

use super::money::Money;

/// Direction of the position, shared by every record in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TradeType {
    Buy,
    Sell,
}

impl TradeType {
    pub fn as_str(self) -> &'static str {
        match self {
            TradeType::Buy => "Buy",
            TradeType::Sell => "Sell",
        }
    }
}

impl fmt::Display for TradeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for TradeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "buy" => Ok(TradeType::Buy),
            "sell" => Ok(TradeType::Sell),
            other => Err(format!("unknown trade type: {other}")),
        }
    }
}

/// What a record represents within its position, fixed when it is created.
///
/// An `Entry` record that later receives an exit becomes a `FullExit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Entry,
    Increment,
    PartialExit,
    FullExit,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Entry => "entry",
            EventKind::Increment => "increment",
            EventKind::PartialExit => "partial_exit",
            EventKind::FullExit => "full_exit",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "entry" => Ok(EventKind::Entry),
            "increment" => Ok(EventKind::Increment),
            "partial_exit" => Ok(EventKind::PartialExit),
            "full_exit" => Ok(EventKind::FullExit),
            other => Err(format!("unknown event kind: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub id: u64,
    /// Root entry of the position; `None` on the root itself.
    pub parent_id: Option<u64>,
    pub ticker: String,
    pub trade_type: TradeType,
    pub kind: EventKind,
    pub entry_date: NaiveDate,
    pub entry_price: Money,
    pub quantity: i64,
    pub exit_date: Option<NaiveDate>,
    pub exit_price: Option<Money>,
    pub result: Option<Money>,
    pub observations: Option<String>,
    pub setup: Option<String>,
}

impl Trade {
    /// Identifier of the position this record belongs to.
    pub fn position_key(&self) -> u64 {
        self.parent_id.unwrap_or(self.id)
    }

    /// The opening record of a position, exited or not.
    pub fn is_entry_record(&self) -> bool {
        matches!(self.kind, EventKind::Entry | EventKind::FullExit)
    }

    /// Ordering used to pick the root and the open trade: records without a
    /// parent first, then earliest entry date, then lowest id.
    pub fn precedence_key(&self) -> (bool, NaiveDate, u64) {
        (self.parent_id.is_some(), self.entry_date, self.id)
    }

    /// A partial or closing event.
    pub fn is_exit(&self) -> bool {
        self.exit_date.is_some()
    }

    pub fn is_increment(&self) -> bool {
        self.exit_date.is_none() && self.kind == EventKind::Increment
    }

    /// Candidate for the open trade: unexited and not an increment.
    pub fn is_open_candidate(&self) -> bool {
        self.exit_date.is_none() && self.kind != EventKind::Increment
    }

    pub fn is_history_event(&self) -> bool {
        self.is_exit() || self.is_increment()
    }

    /// Counts toward realized profit and the average exit price.
    pub fn is_closed(&self) -> bool {
        self.exit_price.is_some_and(Money::is_positive)
    }

    pub fn event_date(&self) -> NaiveDate {
        self.exit_date.unwrap_or(self.entry_date)
    }
}

/// Replacement values for an edit of one trade. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradePatch {
    pub entry_date: Option<NaiveDate>,
    pub entry_price: Option<Money>,
    pub quantity: Option<i64>,
    pub exit_date: Option<NaiveDate>,
    pub exit_price: Option<Money>,
    pub result: Option<Money>,
    pub observations: Option<String>,
    pub setup: Option<String>,
}

impl TradePatch {
    pub fn is_empty(&self) -> bool {
        *self == TradePatch::default()
    }

    pub fn apply(&self, trade: &mut Trade) {
        if let Some(date) = self.entry_date {
            trade.entry_date = date;
        }
        if let Some(price) = self.entry_price {
            trade.entry_price = price;
        }
        if let Some(quantity) = self.quantity {
            trade.quantity = quantity;
        }
        if let Some(date) = self.exit_date {
            trade.exit_date = Some(date);
            if trade.kind == EventKind::Entry {
                trade.kind = EventKind::FullExit;
            }
        }
        if let Some(price) = self.exit_price {
            trade.exit_price = Some(price);
        }
        if let Some(result) = self.result {
            trade.result = Some(result);
        }
        if let Some(ref observations) = self.observations {
            trade.observations = Some(observations.clone());
        }
        if let Some(ref setup) = self.setup {
            trade.setup = Some(setup.clone());
        }
    }
}
