//! Result export port trait.

use crate::domain::error::RebalancerError;
use crate::domain::rebalance::SimulationResult;
use std::path::Path;

/// Port for writing the per-period rebalance table.
pub trait ResultSink {
    fn write(&self, result: &SimulationResult, output_path: &Path) -> Result<(), RebalancerError>;
}
