//! Core domain types and logic.

pub mod price;
pub mod returns;
pub mod rebalance;
pub mod metrics;
pub mod universe;
pub mod config_validation;
pub mod error;
