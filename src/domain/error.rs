//! Domain error types.

/// Conditions raised by the position engine itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PositionError {
    #[error("invalid position: {reason}")]
    Validation { reason: String },

    #[error("trade {trade_id}: {field} cannot be changed once the position has history")]
    EditLocked { trade_id: u64, field: &'static str },

    #[error("trade {id} is not part of this position")]
    UnknownTrade { id: u64 },

    #[error("trade {trade_id} is not the open trade of its position")]
    NotOpenTrade { trade_id: u64 },

    #[error("cannot exit {requested}, only {open} still open")]
    ExceedsOpenQuantity { requested: i64, open: i64 },
}

impl PositionError {
    pub fn validation(reason: impl Into<String>) -> Self {
        PositionError::Validation {
            reason: reason.into(),
        }
    }
}

/// Top-level error type for positionbook.
#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("journal error: {reason}")]
    Journal { reason: String },

    #[error("trade {id} not found in journal")]
    TradeNotFound { id: u64 },

    #[error(transparent)]
    Position(#[from] PositionError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&JournalError> for std::process::ExitCode {
    fn from(err: &JournalError) -> Self {
        let code: u8 = match err {
            JournalError::Io(_) => 1,
            JournalError::ConfigParse { .. }
            | JournalError::ConfigMissing { .. }
            | JournalError::ConfigInvalid { .. } => 2,
            JournalError::Journal { .. } | JournalError::TradeNotFound { .. } => 3,
            JournalError::Position(_) => 4,
        };
        std::process::ExitCode::from(code)
    }
}
