//! CSV journal adapter.
//!
//! One row per trade record. Rows without a `kind` are legacy records and
//! are classified once, here, from their exit date, parent and observations.
//!
//! Every mutation rewrites the whole journal into a temporary file next to it
//! and renames it over the journal.

use crate::domain::error::JournalError;
use crate::domain::money::Money;
use crate::domain::trade::{EventKind, Trade, TradePatch};
use crate::ports::trade_port::TradePort;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Marker written into `observations` by older journals for size increments.
pub const LEGACY_INCREMENT_PREFIX: &str = "Increment to trade";

const DATE_FORMAT: &str = "%Y-%m-%d";

const COLUMNS: [&str; 13] = [
    "id",
    "parent_id",
    "ticker",
    "type",
    "kind",
    "entry_date",
    "entry_price",
    "quantity",
    "exit_date",
    "exit_price",
    "result",
    "observations",
    "setup",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct TradeRow {
    id: u64,
    parent_id: Option<u64>,
    ticker: String,
    #[serde(rename = "type")]
    trade_type: String,
    kind: Option<String>,
    entry_date: String,
    entry_price: String,
    quantity: i64,
    exit_date: Option<String>,
    exit_price: Option<String>,
    result: Option<String>,
    observations: Option<String>,
    setup: Option<String>,
}

pub struct CsvTradeAdapter {
    path: PathBuf,
}

impl CsvTradeAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn journal_error(&self, reason: impl std::fmt::Display) -> JournalError {
        JournalError::Journal {
            reason: format!("{}: {}", self.path.display(), reason),
        }
    }

    fn write_trades(&self, trades: &[Trade]) -> Result<(), JournalError> {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        if trades.is_empty() {
            wtr.write_record(COLUMNS)
                .map_err(|e| self.journal_error(format!("CSV write error: {e}")))?;
        }
        for trade in trades {
            wtr.serialize(to_row(trade))
                .map_err(|e| self.journal_error(format!("CSV write error: {e}")))?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| self.journal_error(format!("CSV write error: {e}")))?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut staged = NamedTempFile::new_in(dir)?;
        staged.write_all(&bytes)?;
        staged.as_file().sync_all()?;
        staged
            .persist(&self.path)
            .map_err(|e| self.journal_error(format!("failed to replace journal: {}", e.error)))?;
        Ok(())
    }
}

impl TradePort for CsvTradeAdapter {
    fn load_trades(&self) -> Result<Vec<Trade>, JournalError> {
        let content = fs::read_to_string(&self.path)
            .map_err(|e| self.journal_error(format!("failed to read: {e}")))?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut trades = Vec::new();
        for (line, result) in rdr.deserialize::<TradeRow>().enumerate() {
            let row = result.map_err(|e| self.journal_error(format!("CSV parse error: {e}")))?;
            let trade = from_row(row)
                .map_err(|reason| self.journal_error(format!("record {}: {}", line + 1, reason)))?;
            trades.push(trade);
        }

        tracing::debug!(path = %self.path.display(), records = trades.len(), "loaded journal");
        Ok(trades)
    }

    fn update_trade(&self, id: u64, patch: &TradePatch) -> Result<(), JournalError> {
        let mut trades = self.load_trades()?;
        let trade = trades
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(JournalError::TradeNotFound { id })?;
        patch.apply(trade);
        self.write_trades(&trades)?;
        tracing::info!(trade = id, "updated trade");
        Ok(())
    }

    fn delete_trade(&self, id: u64) -> Result<(), JournalError> {
        let mut trades = self.load_trades()?;
        let index = trades
            .iter()
            .position(|t| t.id == id)
            .ok_or(JournalError::TradeNotFound { id })?;

        let dependents: Vec<u64> = trades
            .iter()
            .filter(|t| t.parent_id == Some(id))
            .map(|t| t.id)
            .collect();
        if !dependents.is_empty() {
            return Err(self.journal_error(format!(
                "trade {id} is the entry of trades {dependents:?}, delete the whole position instead"
            )));
        }

        trades.remove(index);
        self.write_trades(&trades)?;
        tracing::info!(trade = id, "deleted trade");
        Ok(())
    }

    fn delete_position(&self, root_id: u64) -> Result<usize, JournalError> {
        let mut trades = self.load_trades()?;
        let before = trades.len();
        trades.retain(|t| t.position_key() != root_id);
        let removed = before - trades.len();
        if removed == 0 {
            return Err(JournalError::TradeNotFound { id: root_id });
        }
        self.write_trades(&trades)?;
        tracing::info!(position = root_id, records = removed, "deleted position");
        Ok(removed)
    }

    fn insert_trade(&self, mut trade: Trade) -> Result<Trade, JournalError> {
        let mut trades = self.load_trades()?;
        trade.id = trades.iter().map(|t| t.id).max().unwrap_or(0) + 1;
        trades.push(trade.clone());
        self.write_trades(&trades)?;
        tracing::info!(trade = trade.id, kind = %trade.kind, "inserted trade");
        Ok(trade)
    }
}

/// Kind of a record written before kinds were stored.
pub fn classify_legacy(
    parent_id: Option<u64>,
    exit_date: Option<NaiveDate>,
    observations: Option<&str>,
) -> EventKind {
    match (exit_date, parent_id) {
        (Some(_), Some(_)) => EventKind::PartialExit,
        (Some(_), None) => EventKind::FullExit,
        (None, _) if observations.is_some_and(|o| o.starts_with(LEGACY_INCREMENT_PREFIX)) => {
            EventKind::Increment
        }
        (None, _) => EventKind::Entry,
    }
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|e| format!("invalid {field} {value:?}: {e}"))
}

fn parse_money(field: &str, value: &str) -> Result<Money, String> {
    value
        .parse::<Money>()
        .map_err(|e| format!("invalid {field}: {e}"))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn from_row(row: TradeRow) -> Result<Trade, String> {
    let exit_date = non_blank(row.exit_date)
        .map(|s| parse_date("exit_date", &s))
        .transpose()?;
    let observations = non_blank(row.observations);
    let kind = match non_blank(row.kind) {
        Some(k) => k.parse()?,
        None => classify_legacy(row.parent_id, exit_date, observations.as_deref()),
    };

    Ok(Trade {
        id: row.id,
        parent_id: row.parent_id,
        ticker: row.ticker.trim().to_uppercase(),
        trade_type: row.trade_type.parse()?,
        kind,
        entry_date: parse_date("entry_date", &row.entry_date)?,
        entry_price: parse_money("entry_price", &row.entry_price)?,
        quantity: row.quantity,
        exit_date,
        exit_price: non_blank(row.exit_price)
            .map(|s| parse_money("exit_price", &s))
            .transpose()?,
        result: non_blank(row.result)
            .map(|s| parse_money("result", &s))
            .transpose()?,
        observations,
        setup: non_blank(row.setup),
    })
}

fn to_row(trade: &Trade) -> TradeRow {
    TradeRow {
        id: trade.id,
        parent_id: trade.parent_id,
        ticker: trade.ticker.clone(),
        trade_type: trade.trade_type.to_string(),
        kind: Some(trade.kind.to_string()),
        entry_date: trade.entry_date.format(DATE_FORMAT).to_string(),
        entry_price: trade.entry_price.to_string(),
        quantity: trade.quantity,
        exit_date: trade.exit_date.map(|d| d.format(DATE_FORMAT).to_string()),
        exit_price: trade.exit_price.map(|p| p.to_string()),
        result: trade.result.map(|r| r.to_string()),
        observations: trade.observations.clone(),
        setup: trade.setup.clone(),
    }
}
