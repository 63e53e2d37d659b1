//! Performance metrics over a periodic fractional-return series.
//!
//! All functions take returns in period order (0.01 == +1%) and compound
//! them; none of them accept log returns or price levels.

pub const MONTHS_PER_YEAR: u32 = 12;

#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceSummary {
    pub periods: usize,
    pub total_return: f64,
    pub cagr: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
}

impl PerformanceSummary {
    pub fn compute(returns: &[f64], periods_per_year: u32, risk_free_rate: f64) -> Self {
        PerformanceSummary {
            periods: returns.len(),
            total_return: total_return(returns),
            cagr: cagr(returns, periods_per_year),
            volatility: volatility(returns, periods_per_year),
            sharpe_ratio: sharpe(returns, risk_free_rate, periods_per_year),
            max_drawdown: max_drawdown(returns),
        }
    }
}

/// Growth of 1.0 after compounding every return.
pub fn cumulative_growth(returns: &[f64]) -> f64 {
    returns.iter().fold(1.0, |acc, r| acc * (1.0 + r))
}

pub fn total_return(returns: &[f64]) -> f64 {
    cumulative_growth(returns) - 1.0
}

/// Compound annual growth rate.
pub fn cagr(returns: &[f64], periods_per_year: u32) -> f64 {
    if returns.is_empty() || periods_per_year == 0 {
        return 0.0;
    }
    let years = returns.len() as f64 / periods_per_year as f64;
    let growth = cumulative_growth(returns);
    if growth <= 0.0 {
        return -1.0;
    }
    growth.powf(1.0 / years) - 1.0
}

/// Annualized sample standard deviation.
pub fn volatility(returns: &[f64], periods_per_year: u32) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    variance.sqrt() * (periods_per_year as f64).sqrt()
}

/// (CAGR - risk free rate) / annualized volatility.
pub fn sharpe(returns: &[f64], risk_free_rate: f64, periods_per_year: u32) -> f64 {
    let vol = volatility(returns, periods_per_year);
    // Rounding leaves a constant series with a vanishing, non-zero deviation.
    if vol > f64::EPSILON {
        (cagr(returns, periods_per_year) - risk_free_rate) / vol
    } else {
        0.0
    }
}

/// Largest peak-to-trough decline of the compounded path, as a fraction.
pub fn max_drawdown(returns: &[f64]) -> f64 {
    let mut value = 1.0_f64;
    let mut peak = 1.0_f64;
    let mut max_dd = 0.0_f64;

    for r in returns {
        value *= 1.0 + r;
        if value > peak {
            peak = value;
        } else if peak > 0.0 {
            let dd = (peak - value) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }

    max_dd
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn total_return_compounds() {
        assert_relative_eq!(total_return(&[0.1, 0.1]), 0.21, epsilon = 1e-12);
        assert_relative_eq!(total_return(&[]), 0.0);
    }

    #[test]
    fn cagr_of_one_percent_monthly() {
        let returns = vec![0.01; 12];
        assert_relative_eq!(cagr(&returns, MONTHS_PER_YEAR), 1.01_f64.powi(12) - 1.0, epsilon = 1e-12);
    }

    #[test]
    fn cagr_over_two_years() {
        let mut returns = vec![0.0; 24];
        returns[0] = 0.21;
        assert_relative_eq!(cagr(&returns, MONTHS_PER_YEAR), 0.1, epsilon = 1e-12);
    }

    #[test]
    fn cagr_empty_series() {
        assert_relative_eq!(cagr(&[], MONTHS_PER_YEAR), 0.0);
    }

    #[test]
    fn cagr_total_loss() {
        assert_relative_eq!(cagr(&[0.5, -1.0], MONTHS_PER_YEAR), -1.0);
    }

    #[test]
    fn volatility_uses_sample_deviation() {
        // mean 0.02, deviations ±0.01, sample variance 0.0001
        let returns = [0.01, 0.03];
        assert_relative_eq!(
            volatility(&returns, MONTHS_PER_YEAR),
            (0.0002_f64).sqrt() * 12.0_f64.sqrt(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn volatility_needs_two_points() {
        assert_relative_eq!(volatility(&[0.05], MONTHS_PER_YEAR), 0.0);
    }

    #[test]
    fn sharpe_zero_when_flat() {
        assert_relative_eq!(sharpe(&[0.01, 0.01, 0.01], 0.0, MONTHS_PER_YEAR), 0.0);
    }

    #[test]
    fn sharpe_zero_for_constant_series_with_rounding_noise() {
        let returns = [0.1; 7];
        assert!(volatility(&returns, MONTHS_PER_YEAR) < f64::EPSILON);
        assert_relative_eq!(sharpe(&returns, 0.0, MONTHS_PER_YEAR), 0.0);
        assert_relative_eq!(
            PerformanceSummary::compute(&returns, MONTHS_PER_YEAR, 0.0175).sharpe_ratio,
            0.0
        );
    }

    #[test]
    fn sharpe_sign_follows_excess_return() {
        let returns = [0.02, -0.01, 0.03, 0.01, 0.0, 0.02];
        assert!(sharpe(&returns, 0.0175, MONTHS_PER_YEAR) > 0.0);
        assert!(sharpe(&returns, 0.9, MONTHS_PER_YEAR) < 0.0);
    }

    #[test]
    fn max_drawdown_from_compounded_path() {
        // path 1.1, 0.55, 0.66 -> peak 1.1, trough 0.55
        assert_relative_eq!(max_drawdown(&[0.1, -0.5, 0.2]), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn max_drawdown_counts_initial_capital_as_peak() {
        assert_relative_eq!(max_drawdown(&[-0.2, 0.1]), 0.2, epsilon = 1e-12);
    }

    #[test]
    fn max_drawdown_monotonic_rise() {
        assert_relative_eq!(max_drawdown(&[0.01, 0.02, 0.03]), 0.0);
    }

    #[test]
    fn summary_bundles_metrics() {
        let returns = [0.02, -0.01, 0.03];
        let summary = PerformanceSummary::compute(&returns, MONTHS_PER_YEAR, 0.0175);
        assert_eq!(summary.periods, 3);
        assert_relative_eq!(summary.total_return, total_return(&returns));
        assert_relative_eq!(summary.cagr, cagr(&returns, MONTHS_PER_YEAR));
        assert_relative_eq!(summary.max_drawdown, 0.01, epsilon = 1e-12);
    }
}
