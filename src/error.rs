//! Error types for the simulation core.

use thiserror::Error;

use crate::state::State;

/// Result type alias for simulation operations.
pub type SimResult<T> = Result<T, SimError>;

/// Errors raised synchronously by validation or integration.
///
/// There is no partial-result mode: a failing run returns one of these
/// instead of a truncated trajectory.
#[derive(Debug, Clone, Error)]
pub enum SimError {
    /// Rejected before any integration work starts.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The equations of motion produced NaN or infinity.
    #[error("numerical divergence at t = {t}: non-finite derivative for state {state:?}")]
    NumericalDivergence {
        /// Time of the failing evaluation.
        t: f64,
        /// State the model was evaluated at.
        state: State,
    },

    /// The step-size controller gave up.
    #[error("solver did not converge at t = {t}: {reason}")]
    SolverNonConvergence {
        /// Time the solver had reached.
        t: f64,
        /// What budget was exhausted.
        reason: String,
    },
}

impl SimError {
    /// Create an invalid parameter error.
    #[must_use]
    pub fn invalid_parameter(details: impl Into<String>) -> Self {
        Self::InvalidParameter(details.into())
    }

    /// Create a non-convergence error.
    #[must_use]
    pub fn non_convergence(t: f64, reason: impl Into<String>) -> Self {
        Self::SolverNonConvergence {
            t,
            reason: reason.into(),
        }
    }
}
