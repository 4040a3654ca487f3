//! Core domain types and logic.

pub mod money;
pub mod trade;
pub mod events;
pub mod closed_stats;
pub mod position;
pub mod details;
pub mod edit_policy;
pub mod sub_events;
pub mod inconsistency;
pub mod config_validation;
pub mod error;
