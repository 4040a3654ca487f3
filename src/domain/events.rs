//! Sub-event classification: the open trade and the chronological history.

use super::inconsistency::Inconsistency;
use super::trade::Trade;

#[derive(Debug, Clone, PartialEq)]
pub struct EventClassification<'a> {
    pub open_trade: Option<&'a Trade>,
    /// Exits and increments, ascending by event date, ties by id.
    pub history_events: Vec<&'a Trade>,
    pub inconsistencies: Vec<Inconsistency>,
}

pub fn classify_events(trades: &[Trade]) -> EventClassification<'_> {
    let mut candidates: Vec<&Trade> = trades.iter().filter(|t| t.is_open_candidate()).collect();
    candidates.sort_by_key(|t| t.precedence_key());

    let mut inconsistencies = Vec::new();
    let open_trade = candidates.first().copied();
    if let (Some(chosen), true) = (open_trade, candidates.len() > 1) {
        inconsistencies.push(Inconsistency::MultipleOpenTrades {
            chosen: chosen.id,
            candidates: candidates.iter().map(|t| t.id).collect(),
        });
    }

    let mut history_events: Vec<&Trade> =
        trades.iter().filter(|t| t.is_history_event()).collect();
    history_events.sort_by_key(|t| (t.event_date(), t.id));

    EventClassification {
        open_trade,
        history_events,
        inconsistencies,
    }
}
