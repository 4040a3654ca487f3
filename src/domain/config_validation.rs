//! Configuration validation.
//!
//! Validates all config fields before any journal is opened.

use crate::domain::error::JournalError;
use crate::ports::config_port::ConfigPort;

pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
pub const DEFAULT_LOG_LEVEL: &str = "warn";
pub const DEFAULT_CURRENCY: &str = "R$";

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), JournalError> {
    validate_journal_path(config)?;
    validate_log_level(config)?;
    validate_currency(config)?;
    Ok(())
}

fn validate_journal_path(config: &dyn ConfigPort) -> Result<(), JournalError> {
    match config.get_string("journal", "path") {
        Some(s) if !s.trim().is_empty() => Ok(()),
        Some(_) => Err(JournalError::ConfigInvalid {
            section: "journal".to_string(),
            key: "path".to_string(),
            reason: "path must not be empty".to_string(),
        }),
        None => Err(JournalError::ConfigMissing {
            section: "journal".to_string(),
            key: "path".to_string(),
        }),
    }
}

fn validate_log_level(config: &dyn ConfigPort) -> Result<(), JournalError> {
    let Some(level) = config.get_string("log", "level") else {
        return Ok(());
    };
    if LOG_LEVELS.contains(&level.trim().to_lowercase().as_str()) {
        Ok(())
    } else {
        Err(JournalError::ConfigInvalid {
            section: "log".to_string(),
            key: "level".to_string(),
            reason: format!("unknown level {level:?}, expected one of {LOG_LEVELS:?}"),
        })
    }
}

fn validate_currency(config: &dyn ConfigPort) -> Result<(), JournalError> {
    match config.get_string("display", "currency") {
        Some(s) if s.trim().is_empty() => Err(JournalError::ConfigInvalid {
            section: "display".to_string(),
            key: "currency".to_string(),
            reason: "currency must not be empty".to_string(),
        }),
        _ => Ok(()),
    }
}
