use thiserror::Error;

use crate::profile::Trait;

pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Failures raised by the numerical engine. Orchestration layers wrap these
/// with `anyhow` context instead of matching on them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    #[error(
        "insufficient data: {samples} samples for {dimensions} dimensions \
         (samples must exceed dimensions)"
    )]
    InsufficientData { samples: usize, dimensions: usize },

    #[error("covariance matrix is singular: {0}")]
    SingularCovariance(&'static str),

    #[error("invalid cluster count {requested} for {samples} samples")]
    InvalidClusterCount { requested: usize, samples: usize },

    #[error("trait {0:?} has a non-finite value")]
    NonFiniteTrait(Trait),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

impl AnalysisError {
    pub(crate) fn degenerate(message: impl Into<String>) -> Self {
        AnalysisError::DegenerateInput(message.into())
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        AnalysisError::InvalidParameter(message.into())
    }
}
