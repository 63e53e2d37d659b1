//! Domain error types.

/// Precondition failures raised by the rebalancing simulator.
///
/// Both variants are fatal and reported before any period is processed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimulationError {
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("insufficient data: {reason}")]
    InsufficientData { reason: String },
}

/// Top-level error type for rebalancer.
#[derive(Debug, thiserror::Error)]
pub enum RebalancerError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error("insufficient data: {reason}")]
    InsufficientData { reason: String },

    #[error("malformed return matrix: {0}")]
    Matrix(#[from] crate::domain::returns::MatrixError),

    #[error(transparent)]
    Simulation(#[from] SimulationError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RebalancerError {
    /// Process exit status for this failure.
    pub fn exit_status(&self) -> u8 {
        match self {
            RebalancerError::Io(_) => 1,
            RebalancerError::ConfigParse { .. }
            | RebalancerError::ConfigMissing { .. }
            | RebalancerError::ConfigInvalid { .. } => 2,
            RebalancerError::DataSource { .. } | RebalancerError::Matrix(_) => 3,
            RebalancerError::InsufficientData { .. }
            | RebalancerError::Simulation(SimulationError::InsufficientData { .. }) => 5,
            RebalancerError::Simulation(SimulationError::InvalidParameter { .. }) => 6,
        }
    }
}

impl From<&RebalancerError> for std::process::ExitCode {
    fn from(err: &RebalancerError) -> Self {
        std::process::ExitCode::from(err.exit_status())
    }
}
