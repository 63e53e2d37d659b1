//! Instrument universe: code list parsing and price-history validation.
//!
//! Codes that fail to load or lack enough history are skipped with a
//! warning instead of aborting the run.

use crate::domain::error::RebalancerError;
use crate::domain::price::PriceSeries;
use crate::ports::price_port::PriceSource;
use std::collections::HashSet;
use tracing::{info, warn};

/// Fewest price points that still yield one return.
pub const MIN_PRICE_POINTS: usize = 2;

#[derive(Debug, Clone, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in code list")]
    EmptyToken,

    #[error("duplicate code: {0}")]
    DuplicateCode(String),
}

pub fn parse_codes(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut codes = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let code = trimmed.to_uppercase();
        if !seen.insert(code.clone()) {
            return Err(UniverseError::DuplicateCode(code));
        }
        codes.push(code);
    }

    Ok(codes)
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    LoadFailed(String),
    NoData,
    InsufficientHistory { points: usize },
}

#[derive(Debug, Clone)]
pub struct SkippedCode {
    pub code: String,
    pub reason: SkipReason,
}

#[derive(Debug)]
pub struct UniverseLoad {
    /// Loaded series, in the order the codes were given.
    pub series: Vec<PriceSeries>,
    pub skipped: Vec<SkippedCode>,
}

impl UniverseLoad {
    pub fn codes(&self) -> Vec<&str> {
        self.series.iter().map(|s| s.instrument.as_str()).collect()
    }
}

pub fn load_universe(
    source: &dyn PriceSource,
    codes: &[String],
) -> Result<UniverseLoad, RebalancerError> {
    let mut series = Vec::new();
    let mut skipped = Vec::new();

    for code in codes {
        let prices = match source.fetch_prices(code) {
            Ok(p) => p,
            Err(e) => {
                warn!(code = %code, error = %e, "skipping instrument");
                skipped.push(SkippedCode {
                    code: code.clone(),
                    reason: SkipReason::LoadFailed(e.to_string()),
                });
                continue;
            }
        };

        if prices.is_empty() {
            warn!(code = %code, "skipping instrument (no data found)");
            skipped.push(SkippedCode {
                code: code.clone(),
                reason: SkipReason::NoData,
            });
            continue;
        }

        if prices.len() < MIN_PRICE_POINTS {
            warn!(
                code = %code,
                points = prices.len(),
                minimum = MIN_PRICE_POINTS,
                "skipping instrument (insufficient history)"
            );
            skipped.push(SkippedCode {
                code: code.clone(),
                reason: SkipReason::InsufficientHistory {
                    points: prices.len(),
                },
            });
            continue;
        }

        info!(
            code = %code,
            points = prices.len(),
            first = ?prices.first_date(),
            last = ?prices.last_date(),
            "loaded price history"
        );
        series.push(prices);
    }

    if series.is_empty() {
        return Err(RebalancerError::InsufficientData {
            reason: format!("none of the {} codes has usable price history", codes.len()),
        });
    }

    if !skipped.is_empty() {
        info!(
            loaded = series.len(),
            requested = codes.len(),
            "universe loaded with skips"
        );
    }

    Ok(UniverseLoad { series, skipped })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_codes_basic() {
        let result = parse_codes("MMM,AXP,AAPL,BA").unwrap();
        assert_eq!(result, vec!["MMM", "AXP", "AAPL", "BA"]);
    }

    #[test]
    fn test_parse_codes_with_whitespace() {
        let result = parse_codes("  MMM , AXP ,AAPL,  BA  ").unwrap();
        assert_eq!(result, vec!["MMM", "AXP", "AAPL", "BA"]);
    }

    #[test]
    fn test_parse_codes_uppercase() {
        let result = parse_codes("ko,jnj,pg").unwrap();
        assert_eq!(result, vec!["KO", "JNJ", "PG"]);
    }

    #[test]
    fn test_parse_codes_empty_token() {
        let result = parse_codes("KO,,PG");
        assert!(matches!(result, Err(UniverseError::EmptyToken)));
    }

    #[test]
    fn test_parse_codes_duplicate() {
        let result = parse_codes("KO,PG,ko");
        assert!(matches!(result, Err(UniverseError::DuplicateCode(s)) if s == "KO"));
    }
}
