//! Formulation-wide settings.

/// Magnitude at or above which the engine treats a bound as infinite.
pub const DEFAULT_INFINITY_BOUND: f64 = 1.0e20;

/// Configuration shared by [`LeastSquaresProblem`](super::problem::LeastSquaresProblem)
/// and [`NlpProblem`](super::nlp::NlpProblem).
///
/// # Example
///
/// ```
/// use lsq_bridge::core::config::ProblemConfig;
///
/// let config = ProblemConfig::new()
///     .with_infinity_bound(1.0e30)
///     .with_default_initial_value(0.5);
/// assert_eq!(config.infinity_bound, 1.0e30);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProblemConfig {
    /// Sentinel used for "unbounded"; new bound sets start at (-inf, +inf) with this value.
    pub infinity_bound: f64,
    /// Fill value for entries of an initial point that were never set explicitly.
    pub default_initial_value: f64,
}

impl Default for ProblemConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ProblemConfig {
    pub fn new() -> Self {
        Self {
            infinity_bound: DEFAULT_INFINITY_BOUND,
            default_initial_value: 0.0,
        }
    }

    /// Set the unbounded sentinel. Non-positive or non-finite values are ignored.
    pub fn with_infinity_bound(mut self, infinity_bound: f64) -> Self {
        if infinity_bound.is_finite() && infinity_bound > 0.0 {
            self.infinity_bound = infinity_bound;
        } else {
            tracing::warn!(
                "ignoring infinity bound {}, keeping {}",
                infinity_bound,
                self.infinity_bound
            );
        }
        self
    }

    pub fn with_default_initial_value(mut self, value: f64) -> Self {
        self.default_initial_value = value;
        self
    }
}
