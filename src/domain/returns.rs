//! Return matrix: periods x instruments table of fractional returns.
//!
//! Cells are `Option<f64>`; `None` marks a missing return (insufficient
//! history, no price on that date, non-finite input). Missing is never
//! treated as zero here; the simulator decides what it means.

use crate::domain::price::{simple_return, PriceSeries};
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MatrixError {
    #[error("expected {expected} rows, got {actual}")]
    RowCount { expected: usize, actual: usize },

    #[error("row {row} has {actual} cells, expected {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("periods out of order at {date}")]
    UnorderedPeriods { date: NaiveDate },

    #[error("duplicate instrument: {0}")]
    DuplicateInstrument(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnMatrix {
    periods: Vec<NaiveDate>,
    instruments: Vec<String>,
    rows: Vec<Vec<Option<f64>>>,
}

impl ReturnMatrix {
    pub fn new(
        periods: Vec<NaiveDate>,
        instruments: Vec<String>,
        rows: Vec<Vec<Option<f64>>>,
    ) -> Result<Self, MatrixError> {
        if rows.len() != periods.len() {
            return Err(MatrixError::RowCount {
                expected: periods.len(),
                actual: rows.len(),
            });
        }

        for w in periods.windows(2) {
            if w[1] <= w[0] {
                return Err(MatrixError::UnorderedPeriods { date: w[1] });
            }
        }

        {
            let mut seen = HashSet::new();
            for name in &instruments {
                if !seen.insert(name.as_str()) {
                    return Err(MatrixError::DuplicateInstrument(name.clone()));
                }
            }
        }

        let mut normalised: Vec<Vec<Option<f64>>> = Vec::with_capacity(rows.len());
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != instruments.len() {
                return Err(MatrixError::RowWidth {
                    row: i,
                    expected: instruments.len(),
                    actual: row.len(),
                });
            }
            normalised.push(
                row.into_iter()
                    .map(|cell| cell.filter(|v| v.is_finite()))
                    .collect(),
            );
        }

        Ok(Self {
            periods,
            instruments,
            rows: normalised,
        })
    }

    /// Aligns price histories on the union of their dates and computes each
    /// instrument's return between consecutive timeline dates.
    ///
    /// A cell is `None` unless the instrument has a price on both the current
    /// and the previous timeline date. Row 0 is always empty.
    pub fn from_price_series(series: &[PriceSeries]) -> Result<Self, MatrixError> {
        let timeline: Vec<NaiveDate> = series
            .iter()
            .flat_map(|s| s.points.iter().map(|p| p.date))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let price_maps: Vec<HashMap<NaiveDate, f64>> = series
            .iter()
            .map(|s| s.points.iter().map(|p| (p.date, p.adj_close)).collect())
            .collect();

        let rows: Vec<Vec<Option<f64>>> = timeline
            .iter()
            .enumerate()
            .map(|(k, date)| {
                price_maps
                    .iter()
                    .map(|prices| {
                        let prev_date = timeline.get(k.checked_sub(1)?)?;
                        simple_return(*prices.get(prev_date)?, *prices.get(date)?)
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        let instruments = series.iter().map(|s| s.instrument.clone()).collect();
        Self::new(timeline, instruments, rows)
    }

    /// Copy without the final period.
    pub fn without_last_period(&self) -> Self {
        let keep = self.periods.len().saturating_sub(1);
        Self {
            periods: self.periods[..keep].to_vec(),
            instruments: self.instruments.clone(),
            rows: self.rows[..keep].to_vec(),
        }
    }

    pub fn periods(&self) -> &[NaiveDate] {
        &self.periods
    }

    pub fn instruments(&self) -> &[String] {
        &self.instruments
    }

    pub fn period_count(&self) -> usize {
        self.periods.len()
    }

    pub fn instrument_count(&self) -> usize {
        self.instruments.len()
    }

    pub fn row(&self, period: usize) -> &[Option<f64>] {
        &self.rows[period]
    }

    pub fn get(&self, period: usize, instrument: usize) -> Option<f64> {
        self.rows.get(period)?.get(instrument).copied().flatten()
    }

    /// Number of instruments with at least one non-missing return.
    pub fn observed_instruments(&self) -> usize {
        (0..self.instruments.len())
            .filter(|&j| self.rows.iter().any(|row| row[j].is_some()))
            .count()
    }
}
