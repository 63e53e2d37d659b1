//! Periodic portfolio-rotation simulator.
//!
//! Each period the simulator:
//! 1. realizes the equal-weight return of the holdings carried in from the
//!    previous period,
//! 2. relegates up to `churn_count` of the worst held performers,
//! 3. refills the portfolio to `portfolio_size` with the best performers of
//!    the whole universe that are not already held.
//!
//! Period 0 of the return matrix is never ranked; the first rebalance event
//! is period 1, which only fills the empty portfolio.
//!
//! Ranking uses a stable sort over a candidate list that is already in
//! tie-break order, so equal returns always resolve the same way:
//! - relegation: the instrument held longest ranks lowest,
//! - new picks: the instrument declared first in the matrix ranks highest.
//!
//! Instruments with a missing return in a period are not ranked in that
//! period. A held instrument with a missing return is therefore never
//! relegated for it and simply stays held.

use crate::domain::error::SimulationError;
use crate::domain::returns::ReturnMatrix;
use chrono::NaiveDate;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// How a held instrument with a missing return contributes to the
/// portfolio return of that period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingReturnPolicy {
    /// Leave it out of the equal-weight mean.
    #[default]
    Exclude,
    /// Count it as a 0.0 return.
    Zero,
}

impl FromStr for MissingReturnPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "exclude" => Ok(Self::Exclude),
            "zero" => Ok(Self::Zero),
            other => Err(format!("unknown missing-return policy '{other}' (expected exclude or zero)")),
        }
    }
}

impl fmt::Display for MissingReturnPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exclude => write!(f, "exclude"),
            Self::Zero => write!(f, "zero"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RebalanceParams {
    pub portfolio_size: usize,
    pub churn_count: usize,
    pub missing_returns: MissingReturnPolicy,
}

impl RebalanceParams {
    pub fn new(portfolio_size: usize, churn_count: usize) -> Self {
        Self {
            portfolio_size,
            churn_count,
            missing_returns: MissingReturnPolicy::default(),
        }
    }

    pub fn with_missing_returns(mut self, policy: MissingReturnPolicy) -> Self {
        self.missing_returns = policy;
        self
    }

    /// `portfolio_size >= 1` and `churn_count < portfolio_size`.
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.portfolio_size < 1 {
            return Err(SimulationError::InvalidParameter {
                name: "portfolio_size".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.churn_count >= self.portfolio_size {
            return Err(SimulationError::InvalidParameter {
                name: "churn_count".into(),
                reason: format!(
                    "must be less than portfolio_size ({})",
                    self.portfolio_size
                ),
            });
        }
        Ok(())
    }
}

/// Instruments currently held, as column indices in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortfolioState {
    holdings: Vec<usize>,
}

impl PortfolioState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn holdings(&self) -> &[usize] {
        &self.holdings
    }

    pub fn len(&self) -> usize {
        self.holdings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }
}

/// Outcome of one rebalance period.
#[derive(Debug, Clone, PartialEq)]
pub struct RebalanceEvent {
    pub period: NaiveDate,
    pub relegated: Vec<String>,
    pub new_picks: Vec<String>,
    pub portfolio: Vec<String>,
    /// Equal-weight return of the holdings carried into this period.
    /// `None` when nothing was held or no held return was observed.
    pub portfolio_return: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    pub params: RebalanceParams,
    pub events: Vec<RebalanceEvent>,
}

impl SimulationResult {
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Realized portfolio returns in period order, skipping periods with no
    /// return (the bootstrap period in particular).
    pub fn realized_returns(&self) -> Vec<f64> {
        self.events.iter().filter_map(|e| e.portfolio_return).collect()
    }

    pub fn final_portfolio(&self) -> &[String] {
        self.events
            .last()
            .map(|e| e.portfolio.as_slice())
            .unwrap_or(&[])
    }
}

/// Runs the rotation over every period of `returns`.
///
/// Parameters and input shape are checked before any period is processed;
/// on failure no partial result is produced.
pub fn simulate(
    returns: &ReturnMatrix,
    params: &RebalanceParams,
) -> Result<SimulationResult, SimulationError> {
    params.validate()?;

    if returns.period_count() < 2 {
        return Err(SimulationError::InsufficientData {
            reason: format!(
                "need at least 2 periods, have {}",
                returns.period_count()
            ),
        });
    }

    let observed = returns.observed_instruments();
    if observed < params.portfolio_size {
        return Err(SimulationError::InsufficientData {
            reason: format!(
                "need at least {} instruments with observed returns, have {}",
                params.portfolio_size, observed
            ),
        });
    }

    let mut state = PortfolioState::new();
    let mut events = Vec::with_capacity(returns.period_count() - 1);

    for period in 1..returns.period_count() {
        let (next, event) = step(returns, period, &state, params);
        debug!(
            period = %event.period,
            held = next.len(),
            relegated = ?event.relegated,
            new_picks = ?event.new_picks,
            portfolio_return = ?event.portfolio_return,
            "rebalanced"
        );
        events.push(event);
        state = next;
    }

    info!(
        periods = events.len(),
        portfolio_size = params.portfolio_size,
        churn_count = params.churn_count,
        "simulation complete"
    );

    Ok(SimulationResult {
        params: params.clone(),
        events,
    })
}

/// One rebalance period: `(previous state, period returns) -> (next state, event)`.
///
/// `period` must be a valid row index of `returns`.
pub fn step(
    returns: &ReturnMatrix,
    period: usize,
    state: &PortfolioState,
    params: &RebalanceParams,
) -> (PortfolioState, RebalanceEvent) {
    let row = returns.row(period);

    let portfolio_return = equal_weight_return(row, &state.holdings, params.missing_returns);

    let relegated = select_relegated(row, &state.holdings, params.churn_count);
    let mut holdings: Vec<usize> = state
        .holdings
        .iter()
        .copied()
        .filter(|j| !relegated.contains(j))
        .collect();

    let fill = params.portfolio_size.saturating_sub(holdings.len());
    let new_picks = select_new_picks(row, &holdings, &relegated, fill);
    holdings.extend_from_slice(&new_picks);

    let names = |indices: &[usize]| -> Vec<String> {
        indices
            .iter()
            .map(|&j| returns.instruments()[j].clone())
            .collect()
    };

    let event = RebalanceEvent {
        period: returns.periods()[period],
        relegated: names(&relegated),
        new_picks: names(&new_picks),
        portfolio: names(&holdings),
        portfolio_return,
    };

    (PortfolioState { holdings }, event)
}

fn equal_weight_return(
    row: &[Option<f64>],
    holdings: &[usize],
    policy: MissingReturnPolicy,
) -> Option<f64> {
    if holdings.is_empty() {
        return None;
    }
    let values: Vec<f64> = match policy {
        MissingReturnPolicy::Exclude => holdings.iter().filter_map(|&j| row[j]).collect(),
        MissingReturnPolicy::Zero => holdings.iter().map(|&j| row[j].unwrap_or(0.0)).collect(),
    };
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn select_relegated(row: &[Option<f64>], holdings: &[usize], churn_count: usize) -> Vec<usize> {
    let mut ranked: Vec<(usize, f64)> = holdings
        .iter()
        .filter_map(|&j| row[j].map(|r| (j, r)))
        .collect();
    ranked.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
    ranked.into_iter().take(churn_count).map(|(j, _)| j).collect()
}

fn select_new_picks(
    row: &[Option<f64>],
    holdings: &[usize],
    relegated: &[usize],
    fill: usize,
) -> Vec<usize> {
    if fill == 0 {
        return Vec::new();
    }
    let mut ranked: Vec<(usize, f64)> = row
        .iter()
        .enumerate()
        .filter(|(j, _)| !holdings.contains(j) && !relegated.contains(j))
        .filter_map(|(j, r)| r.map(|r| (j, r)))
        .collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    ranked.into_iter().take(fill).map(|(j, _)| j).collect()
}
