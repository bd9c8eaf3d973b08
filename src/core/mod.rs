//! Problem formulation components for the lsq-bridge library
//!
//! This module contains the building blocks a caller uses to describe a nonlinear
//! least-squares (or general nonlinear) problem to the external engine:
//! - Bound containers and per-entry type tags for variables, residuals and constraints
//! - The objective descriptor
//! - Sparse Jacobian/Hessian structure declaration and validation
//! - Optional initial points
//! - The formulations themselves ([`problem::LeastSquaresProblem`], [`nlp::NlpProblem`])

pub mod bounds;
pub mod config;
pub mod initial_point;
pub mod nlp;
pub mod objective;
pub mod problem;
pub mod residual;
pub mod structure;
pub mod variable;

use thiserror::Error;
use tracing::error;

/// Core module error types for problem formulation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// Indexed access outside the declared size
    #[error("Index {index} out of range for {what} of length {len}")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    /// Length mismatch between sequences that must agree
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Lower bound above upper bound, or either side NaN
    #[error("Invalid bounds at index {index}: lower {lower}, upper {upper}")]
    InvalidBounds { index: usize, lower: f64, upper: f64 },

    /// Sparse structure failed validation or conversion
    #[error("Symbolic structure error: {0}")]
    SymbolicStructure(String),

    /// A value does not fit the engine's integer index type
    #[error("Index value {0} does not fit the engine index type")]
    IndexOverflow(usize),

    /// Invalid input parameter or configuration
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CoreError {
    /// Log the error with tracing::error and return self for chaining
    ///
    /// # Example
    /// ```ignore
    /// operation()
    ///     .map_err(|e| CoreError::from(e).log())?;
    /// ```
    #[must_use]
    pub fn log(self) -> Self {
        error!("{}", self);
        self
    }

    /// Log the error together with the third-party error that caused it
    ///
    /// # Example
    /// ```ignore
    /// SymbolicSparseColMat::try_new_from_indices(nrows, ncols, &indices)
    ///     .map_err(|e| {
    ///         CoreError::SymbolicStructure("Failed to build pattern".to_string())
    ///             .log_with_source(e)
    ///     })?;
    /// ```
    #[must_use]
    pub fn log_with_source<E: std::fmt::Debug>(self, source_error: E) -> Self {
        error!("{} | Source: {:?}", self, source_error);
        self
    }
}

/// Result type for core module operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Checked mutable access into a fixed-size sequence.
pub(crate) fn slot_mut<'a, T>(
    data: &'a mut [T],
    index: usize,
    what: &'static str,
) -> CoreResult<&'a mut T> {
    let len = data.len();
    data.get_mut(index)
        .ok_or_else(|| CoreError::IndexOutOfRange { what, index, len }.log())
}

/// Checked shared access into a fixed-size sequence.
pub(crate) fn slot<'a, T>(data: &'a [T], index: usize, what: &'static str) -> CoreResult<&'a T> {
    let len = data.len();
    data.get(index)
        .ok_or_else(|| CoreError::IndexOutOfRange { what, index, len }.log())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_mut_in_range() -> Result<(), CoreError> {
        let mut data = vec![0.0; 3];
        *slot_mut(&mut data, 2, "data")? = 4.0;
        assert_eq!(data, vec![0.0, 0.0, 4.0]);
        Ok(())
    }

    #[test]
    fn test_slot_out_of_range() {
        let data = [1, 2, 3];
        let err = slot(&data, 3, "data").err();
        assert_eq!(
            err,
            Some(CoreError::IndexOutOfRange {
                what: "data",
                index: 3,
                len: 3
            })
        );
    }

    #[test]
    fn test_error_display() {
        let err = CoreError::InvalidBounds {
            index: 1,
            lower: 2.0,
            upper: 1.0,
        };
        assert!(err.to_string().contains("lower 2, upper 1"));
    }
}
