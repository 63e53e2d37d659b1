//! Port traits at the I/O seams; adapters implement them.

pub mod config_port;
pub mod price_port;
pub mod report_port;
