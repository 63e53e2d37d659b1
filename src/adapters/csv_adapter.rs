//! CSV file adapters for price histories and return matrices.
//!
//! Price files live one per instrument at `<base>/<CODE>.csv` and need a
//! `date` column plus an adjusted close (`adj_close` / `Adj Close`, falling
//! back to `close`). Return matrices are wide: `date,<CODE>,<CODE>...`.

use crate::domain::error::RebalancerError;
use crate::domain::price::{PricePoint, PriceSeries};
use crate::domain::returns::ReturnMatrix;
use crate::ports::price_port::PriceSource;
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};

const DATE_FORMAT: &str = "%Y-%m-%d";
const ADJ_CLOSE_HEADERS: [&str; 3] = ["adj_close", "adj close", "adjclose"];
const CLOSE_HEADERS: [&str; 1] = ["close"];

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, code: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", code))
    }
}

impl PriceSource for CsvAdapter {
    fn fetch_prices(&self, code: &str) -> Result<PriceSeries, RebalancerError> {
        let path = self.csv_path(code);
        let mut rdr = csv::Reader::from_path(&path).map_err(|e| RebalancerError::DataSource {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let headers = rdr
            .headers()
            .map_err(|e| RebalancerError::DataSource {
                reason: format!("CSV parse error in {}: {}", path.display(), e),
            })?
            .clone();

        let date_col = find_column(&headers, &["date"]).ok_or_else(|| {
            RebalancerError::DataSource {
                reason: format!("missing date column in {}", path.display()),
            }
        })?;
        let price_col = find_column(&headers, &ADJ_CLOSE_HEADERS)
            .or_else(|| find_column(&headers, &CLOSE_HEADERS))
            .ok_or_else(|| RebalancerError::DataSource {
                reason: format!("missing adjusted close column in {}", path.display()),
            })?;

        let mut points = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| RebalancerError::DataSource {
                reason: format!("CSV parse error in {}: {}", path.display(), e),
            })?;

            let date = parse_date(record.get(date_col).unwrap_or_default())?;

            // Downloaders write blank or "null" cells for non-trading rows.
            let Some(adj_close) = record
                .get(price_col)
                .and_then(|v| v.trim().parse::<f64>().ok())
                .filter(|v| v.is_finite())
            else {
                continue;
            };

            points.push(PricePoint { date, adj_close });
        }

        Ok(PriceSeries::new(code, points))
    }

    fn list_instruments(&self) -> Result<Vec<String>, RebalancerError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| RebalancerError::DataSource {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut instruments = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| RebalancerError::DataSource {
                reason: format!("directory entry error: {}", e),
            })?;

            let name = entry.file_name();
            let name_str = name.to_string_lossy();

            if let Some(code) = name_str.strip_suffix(".csv") {
                instruments.push(code.to_string());
            }
        }

        instruments.sort();
        Ok(instruments)
    }
}

fn find_column(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
}

fn parse_date(value: &str) -> Result<NaiveDate, RebalancerError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|e| {
        RebalancerError::DataSource {
            reason: format!("invalid date '{}': {}", value, e),
        }
    })
}

fn parse_return_cell(value: &str) -> Result<Option<f64>, RebalancerError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    trimmed
        .parse::<f64>()
        .map(Some)
        .map_err(|e| RebalancerError::DataSource {
            reason: format!("invalid return value '{}': {}", value, e),
        })
}

/// Reads a wide return matrix. Empty and `NaN` cells are missing returns.
pub fn read_return_matrix(path: &Path) -> Result<ReturnMatrix, RebalancerError> {
    let mut rdr = csv::Reader::from_path(path).map_err(|e| RebalancerError::DataSource {
        reason: format!("failed to read {}: {}", path.display(), e),
    })?;

    let headers = rdr
        .headers()
        .map_err(|e| RebalancerError::DataSource {
            reason: format!("CSV parse error in {}: {}", path.display(), e),
        })?
        .clone();

    if headers.len() < 2 {
        return Err(RebalancerError::DataSource {
            reason: format!("{} has no instrument columns", path.display()),
        });
    }
    let instruments: Vec<String> = headers.iter().skip(1).map(|h| h.trim().to_string()).collect();

    let mut periods = Vec::new();
    let mut rows = Vec::new();

    for result in rdr.records() {
        let record = result.map_err(|e| RebalancerError::DataSource {
            reason: format!("CSV parse error in {}: {}", path.display(), e),
        })?;

        periods.push(parse_date(record.get(0).unwrap_or_default())?);
        let row = record
            .iter()
            .skip(1)
            .map(parse_return_cell)
            .collect::<Result<Vec<_>, _>>()?;
        rows.push(row);
    }

    Ok(ReturnMatrix::new(periods, instruments, rows)?)
}

/// Writes a return matrix in the wide format `read_return_matrix` accepts.
pub fn write_return_matrix(matrix: &ReturnMatrix, path: &Path) -> Result<(), RebalancerError> {
    let mut wtr = csv::Writer::from_path(path).map_err(std::io::Error::from)?;

    let mut header = vec!["date".to_string()];
    header.extend(matrix.instruments().iter().cloned());
    wtr.write_record(&header).map_err(std::io::Error::from)?;

    for (i, period) in matrix.periods().iter().enumerate() {
        let mut record = vec![period.format(DATE_FORMAT).to_string()];
        record.extend(
            matrix
                .row(i)
                .iter()
                .map(|cell| cell.map(|v| v.to_string()).unwrap_or_default()),
        );
        wtr.write_record(&record).map_err(std::io::Error::from)?;
    }

    wtr.flush()?;
    Ok(())
}
