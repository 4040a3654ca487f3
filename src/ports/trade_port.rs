//! Trade record access port trait.
//!
//! Implementations load and mutate the raw records; callers re-run
//! aggregation after every successful mutation.

use crate::domain::error::JournalError;
use crate::domain::trade::{Trade, TradePatch};

pub trait TradePort {
    fn load_trades(&self) -> Result<Vec<Trade>, JournalError>;

    /// All records of the position rooted at `root_id`.
    fn load_position(&self, root_id: u64) -> Result<Vec<Trade>, JournalError> {
        let trades: Vec<Trade> = self
            .load_trades()?
            .into_iter()
            .filter(|t| t.position_key() == root_id)
            .collect();
        if trades.is_empty() {
            return Err(JournalError::TradeNotFound { id: root_id });
        }
        Ok(trades)
    }

    fn update_trade(&self, id: u64, patch: &TradePatch) -> Result<(), JournalError>;

    fn delete_trade(&self, id: u64) -> Result<(), JournalError>;

    /// Removes the root and every record of its position. Returns how many
    /// records were removed.
    fn delete_position(&self, root_id: u64) -> Result<usize, JournalError>;

    /// Stores a new record under a fresh id and returns it as stored.
    /// The incoming `id` is ignored.
    fn insert_trade(&self, trade: Trade) -> Result<Trade, JournalError>;
}
