//! CSV result table adapter implementing ResultSink.
//!
//! One row per rebalance period:
//! `period,portfolio,new_picks,relegated,portfolio_return`. Instrument sets
//! are joined with `;`; an undefined portfolio return is an empty cell.

use crate::domain::error::RebalancerError;
use crate::domain::rebalance::{RebalanceEvent, SimulationResult};
use crate::ports::report_port::ResultSink;
use std::path::Path;

pub const HEADER: [&str; 5] = [
    "period",
    "portfolio",
    "new_picks",
    "relegated",
    "portfolio_return",
];

const SET_SEPARATOR: &str = ";";

#[derive(Debug, Default)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

pub fn format_row(event: &RebalanceEvent) -> [String; 5] {
    [
        event.period.format("%Y-%m-%d").to_string(),
        event.portfolio.join(SET_SEPARATOR),
        event.new_picks.join(SET_SEPARATOR),
        event.relegated.join(SET_SEPARATOR),
        event
            .portfolio_return
            .map(|r| r.to_string())
            .unwrap_or_default(),
    ]
}

impl ResultSink for CsvReportAdapter {
    fn write(&self, result: &SimulationResult, output_path: &Path) -> Result<(), RebalancerError> {
        let mut wtr = csv::Writer::from_path(output_path).map_err(std::io::Error::from)?;
        wtr.write_record(HEADER).map_err(std::io::Error::from)?;
        for event in &result.events {
            wtr.write_record(format_row(event))
                .map_err(std::io::Error::from)?;
        }
        wtr.flush()?;
        Ok(())
    }
}
