//! Configuration validation.
//!
//! Validates every config field before any data is loaded, reporting the
//! first violation.

use crate::domain::error::RebalancerError;
use crate::domain::rebalance::MissingReturnPolicy;
use crate::domain::universe::parse_codes;
use crate::ports::config_port::ConfigPort;

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), RebalancerError> {
    validate_data_source(config)?;
    validate_benchmark(config)?;
    validate_rebalance(config)?;
    validate_periods_per_year(config)?;
    validate_risk_free_rate(config)?;
    Ok(())
}

/// Either a pre-computed returns file, or a price directory plus codes.
fn validate_data_source(config: &dyn ConfigPort) -> Result<(), RebalancerError> {
    if config.get_non_empty("data", "returns_file").is_some() {
        return Ok(());
    }

    if config.get_non_empty("data", "price_dir").is_none() {
        return Err(RebalancerError::ConfigMissing {
            section: "data".to_string(),
            key: "price_dir".to_string(),
        });
    }

    let codes = config
        .get_non_empty("data", "codes")
        .ok_or_else(|| RebalancerError::ConfigMissing {
            section: "data".to_string(),
            key: "codes".to_string(),
        })?;
    parse_codes(&codes).map_err(|e| RebalancerError::ConfigInvalid {
        section: "data".to_string(),
        key: "codes".to_string(),
        reason: e.to_string(),
    })?;
    Ok(())
}

fn validate_benchmark(config: &dyn ConfigPort) -> Result<(), RebalancerError> {
    if config.get_non_empty("data", "benchmark").is_some()
        && config.get_non_empty("data", "price_dir").is_none()
    {
        return Err(RebalancerError::ConfigMissing {
            section: "data".to_string(),
            key: "price_dir".to_string(),
        });
    }
    Ok(())
}

fn validate_rebalance(config: &dyn ConfigPort) -> Result<(), RebalancerError> {
    let portfolio_size = require_int(config, "rebalance", "portfolio_size")?;
    if portfolio_size < 1 {
        return Err(RebalancerError::ConfigInvalid {
            section: "rebalance".to_string(),
            key: "portfolio_size".to_string(),
            reason: "portfolio_size must be at least 1".to_string(),
        });
    }

    let churn_count = require_int(config, "rebalance", "churn_count")?;
    if churn_count < 0 || churn_count >= portfolio_size {
        return Err(RebalancerError::ConfigInvalid {
            section: "rebalance".to_string(),
            key: "churn_count".to_string(),
            reason: "churn_count must be between 0 and portfolio_size - 1".to_string(),
        });
    }

    if let Some(policy) = config.get_non_empty("rebalance", "missing_returns") {
        policy
            .parse::<MissingReturnPolicy>()
            .map_err(|reason| RebalancerError::ConfigInvalid {
                section: "rebalance".to_string(),
                key: "missing_returns".to_string(),
                reason,
            })?;
    }
    Ok(())
}

fn validate_periods_per_year(config: &dyn ConfigPort) -> Result<(), RebalancerError> {
    let value = optional_int(config, "metrics", "periods_per_year")?;
    if matches!(value, Some(v) if v < 1) {
        return Err(RebalancerError::ConfigInvalid {
            section: "metrics".to_string(),
            key: "periods_per_year".to_string(),
            reason: "periods_per_year must be at least 1".to_string(),
        });
    }
    Ok(())
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<(), RebalancerError> {
    let value = optional_double(config, "metrics", "risk_free_rate")?.unwrap_or(0.0);
    if !(0.0..1.0).contains(&value) {
        return Err(RebalancerError::ConfigInvalid {
            section: "metrics".to_string(),
            key: "risk_free_rate".to_string(),
            reason: "risk_free_rate must be between 0 and 1".to_string(),
        });
    }
    Ok(())
}

fn optional_int(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<i64>, RebalancerError> {
    match config.get_non_empty(section, key) {
        None => Ok(None),
        Some(s) => s
            .parse::<i64>()
            .map(Some)
            .map_err(|_| RebalancerError::ConfigInvalid {
                section: section.to_string(),
                key: key.to_string(),
                reason: format!("{} must be an integer", key),
            }),
    }
}

fn optional_double(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<f64>, RebalancerError> {
    match config.get_non_empty(section, key) {
        None => Ok(None),
        Some(s) => match s.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(Some(v)),
            _ => Err(RebalancerError::ConfigInvalid {
                section: section.to_string(),
                key: key.to_string(),
                reason: format!("{} must be a number", key),
            }),
        },
    }
}

fn require_int(config: &dyn ConfigPort, section: &str, key: &str) -> Result<i64, RebalancerError> {
    optional_int(config, section, key)?.ok_or_else(|| RebalancerError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    const DATA: &str = "[data]\nprice_dir = data\ncodes = MMM,AXP,AAPL\n";

    fn with_data(rest: &str) -> FileConfigAdapter {
        make_config(&format!("{DATA}{rest}"))
    }

    #[test]
    fn valid_config_passes() {
        let config = make_config(
            r#"
[data]
price_dir = data
codes = MMM,AXP,AAPL,BA,CAT
benchmark = DIA
drop_last_period = true

[rebalance]
portfolio_size = 3
churn_count = 1
missing_returns = zero

[metrics]
periods_per_year = 12
risk_free_rate = 0.0175
"#,
        );
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn returns_file_replaces_price_dir_and_codes() {
        let config = make_config(
            "[data]\nreturns_file = returns.csv\n[rebalance]\nportfolio_size = 2\nchurn_count = 1\n",
        );
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn missing_price_dir_fails() {
        let config = make_config("[data]\ncodes = KO\n[rebalance]\nportfolio_size = 1\nchurn_count = 0\n");
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, RebalancerError::ConfigMissing { key, .. } if key == "price_dir"));
    }

    #[test]
    fn missing_codes_fails() {
        let config =
            make_config("[data]\nprice_dir = data\n[rebalance]\nportfolio_size = 1\nchurn_count = 0\n");
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, RebalancerError::ConfigMissing { key, .. } if key == "codes"));
    }

    #[test]
    fn duplicate_codes_fail() {
        let config = make_config(
            "[data]\nprice_dir = data\ncodes = KO,PG,KO\n[rebalance]\nportfolio_size = 1\nchurn_count = 0\n",
        );
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, RebalancerError::ConfigInvalid { key, .. } if key == "codes"));
    }

    #[test]
    fn benchmark_requires_price_dir() {
        let config = make_config(
            "[data]\nreturns_file = r.csv\nbenchmark = DIA\n[rebalance]\nportfolio_size = 1\nchurn_count = 0\n",
        );
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, RebalancerError::ConfigMissing { key, .. } if key == "price_dir"));
    }

    #[test]
    fn missing_portfolio_size_fails() {
        let config = with_data("[rebalance]\nchurn_count = 0\n");
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, RebalancerError::ConfigMissing { key, .. } if key == "portfolio_size"));
    }

    #[test]
    fn portfolio_size_zero_fails() {
        let config = with_data("[rebalance]\nportfolio_size = 0\nchurn_count = 0\n");
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, RebalancerError::ConfigInvalid { key, .. } if key == "portfolio_size"));
    }

    #[test]
    fn portfolio_size_non_numeric_fails() {
        let config = with_data("[rebalance]\nportfolio_size = ten\nchurn_count = 0\n");
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, RebalancerError::ConfigInvalid { key, .. } if key == "portfolio_size"));
    }

    #[test]
    fn missing_churn_count_fails() {
        let config = with_data("[rebalance]\nportfolio_size = 3\n");
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, RebalancerError::ConfigMissing { key, .. } if key == "churn_count"));
    }

    #[test]
    fn churn_count_equal_to_portfolio_size_fails() {
        let config = with_data("[rebalance]\nportfolio_size = 3\nchurn_count = 3\n");
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, RebalancerError::ConfigInvalid { key, .. } if key == "churn_count"));
    }

    #[test]
    fn churn_count_negative_fails() {
        let config = with_data("[rebalance]\nportfolio_size = 3\nchurn_count = -1\n");
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, RebalancerError::ConfigInvalid { key, .. } if key == "churn_count"));
    }

    #[test]
    fn unknown_missing_returns_policy_fails() {
        let config =
            with_data("[rebalance]\nportfolio_size = 3\nchurn_count = 1\nmissing_returns = skip\n");
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, RebalancerError::ConfigInvalid { key, .. } if key == "missing_returns"));
    }

    #[test]
    fn periods_per_year_zero_fails() {
        let config = with_data(
            "[rebalance]\nportfolio_size = 3\nchurn_count = 1\n[metrics]\nperiods_per_year = 0\n",
        );
        let err = validate_config(&config).unwrap_err();
        assert!(
            matches!(err, RebalancerError::ConfigInvalid { key, .. } if key == "periods_per_year")
        );
    }

    #[test]
    fn risk_free_rate_out_of_range_fails() {
        let config = with_data(
            "[rebalance]\nportfolio_size = 3\nchurn_count = 1\n[metrics]\nrisk_free_rate = 1.5\n",
        );
        let err = validate_config(&config).unwrap_err();
        assert!(
            matches!(err, RebalancerError::ConfigInvalid { key, .. } if key == "risk_free_rate")
        );
    }

    #[test]
    fn risk_free_rate_negative_fails() {
        let config = with_data(
            "[rebalance]\nportfolio_size = 3\nchurn_count = 1\n[metrics]\nrisk_free_rate = -0.01\n",
        );
        let err = validate_config(&config).unwrap_err();
        assert!(
            matches!(err, RebalancerError::ConfigInvalid { key, .. } if key == "risk_free_rate")
        );
    }

    #[test]
    fn risk_free_rate_not_a_number_fails() {
        let config = with_data(
            "[rebalance]\nportfolio_size = 3\nchurn_count = 1\n[metrics]\nrisk_free_rate = abc\n",
        );
        let err = validate_config(&config).unwrap_err();
        assert!(
            matches!(err, RebalancerError::ConfigInvalid { key, .. } if key == "risk_free_rate")
        );
    }
}
