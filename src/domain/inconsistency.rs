//! Recoverable data-integrity findings.
//!
//! These never abort an aggregation. They are returned alongside the derived
//! views and logged at `warn`.

use std::fmt;

use super::money::Money;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inconsistency {
    /// More than one unexited, non-increment record. `chosen` is reported as
    /// the open trade.
    MultipleOpenTrades { chosen: u64, candidates: Vec<u64> },

    /// The root carries an exit but other unexited records remain.
    OpenTradeOnClosedPosition { trade_ids: Vec<u64> },

    /// Records dated before the root entry they belong to.
    PredatesEntry { root: u64, trade_ids: Vec<u64> },
    /// Quantity exited exceeds the quantity ever entered.
    Overexited { initial: i64, exited: i64 },

    /// Stored realized profit diverges from the sum over closed records.
    RealizedProfitMismatch { summary: Money, recomputed: Money },
}

impl Inconsistency {
    pub fn log(&self, position: u64) {
        tracing::warn!(position, "{}", self);
    }
}

impl fmt::Display for Inconsistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Inconsistency::MultipleOpenTrades { chosen, candidates } => write!(
                f,
                "{} open trades {:?}, using trade {}",
                candidates.len(),
                candidates,
                chosen
            ),
            Inconsistency::OpenTradeOnClosedPosition { trade_ids } => write!(
                f,
                "position closed on its entry but trades {:?} are still open",
                trade_ids
            ),
            Inconsistency::PredatesEntry { root, trade_ids } => write!(
                f,
                "trades {:?} are dated before entry trade {}",
                trade_ids, root
            ),
            Inconsistency::Overexited { initial, exited } => write!(
                f,
                "exited quantity {} exceeds entered quantity {}",
                exited, initial
            ),
            Inconsistency::RealizedProfitMismatch {
                summary,
                recomputed,
            } => write!(
                f,
                "realized profit {} differs from sum of closed results {}",
                summary, recomputed
            ),
        }
    }
}
