#![allow(dead_code)]

use chrono::NaiveDate;
use rebalancer::domain::error::RebalancerError;
use rebalancer::domain::price::{PricePoint, PriceSeries};
use rebalancer::domain::returns::ReturnMatrix;
use rebalancer::ports::price_port::PriceSource;
use std::collections::HashMap;

pub struct MockPriceSource {
    pub data: HashMap<String, Vec<PricePoint>>,
    pub errors: HashMap<String, String>,
}

impl MockPriceSource {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_prices(mut self, code: &str, points: Vec<PricePoint>) -> Self {
        self.data.insert(code.to_string(), points);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }
}

impl PriceSource for MockPriceSource {
    fn fetch_prices(&self, code: &str) -> Result<PriceSeries, RebalancerError> {
        if let Some(reason) = self.errors.get(code) {
            return Err(RebalancerError::DataSource {
                reason: reason.clone(),
            });
        }
        Ok(PriceSeries::new(
            code,
            self.data.get(code).cloned().unwrap_or_default(),
        ))
    }

    fn list_instruments(&self) -> Result<Vec<String>, RebalancerError> {
        let mut codes: Vec<String> = self.data.keys().cloned().collect();
        codes.sort();
        Ok(codes)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Month-start dates beginning January 2022.
pub fn month(i: usize) -> NaiveDate {
    let year = 2022 + (i / 12) as i32;
    date(year, (i % 12) as u32 + 1, 1)
}

/// Monthly closes starting January 2022.
pub fn monthly_prices(closes: &[f64]) -> Vec<PricePoint> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &adj_close)| PricePoint {
            date: month(i),
            adj_close,
        })
        .collect()
}

/// Builds a matrix with monthly periods. Row 0 is typically all `None`.
pub fn matrix(instruments: &[&str], rows: Vec<Vec<Option<f64>>>) -> ReturnMatrix {
    let periods = (0..rows.len()).map(month).collect();
    ReturnMatrix::new(
        periods,
        instruments.iter().map(|s| s.to_string()).collect(),
        rows,
    )
    .unwrap()
}

/// The three-instrument scenario: A, B, C over three periods.
pub fn abc_matrix() -> ReturnMatrix {
    matrix(
        &["A", "B", "C"],
        vec![
            vec![None, None, None],
            vec![Some(0.05), Some(-0.02), Some(0.10)],
            vec![Some(0.01), Some(0.03), Some(0.02)],
        ],
    )
}

pub fn names(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}
