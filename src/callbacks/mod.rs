//! User-facing callback capabilities.
//!
//! The engine notifies the problem through a handful of hooks. Each hook has a single-method
//! capability trait here, and a formulation holds at most one borrowed handler per hook:
//!
//! ```text
//!            engine hook (wide, fixed signature)
//!                         │
//!                         ▼
//!         ┌───────────────────────────────┐
//!         │ CallbackDispatch (dispatch.rs)│  narrows arguments, or reports
//!         └───────────────┬───────────────┘  StatusCode::CALLBACK_ERR if unset
//!          ┌──────────────┼──────────────┬──────────────┐
//!          ▼              ▼              ▼              ▼
//!     PutString   MsInitPointCallback  MsProcess*    NewPoint*
//! ```
//!
//! Multistart-process and new-point hooks come in two shapes: the full nonlinear-programming
//! variant ([`MsProcessCallback`], [`NewPointCallback`]) receives multipliers and constraint
//! data, the least-squares variant ([`MsProcessCallbackLsq`], [`NewPointCallbackLsq`]) only
//! receives what a least-squares model needs. Implementers pick the shape that matches the
//! formulation they register with; neither is forced to accept the other's arguments.
//!
//! # Ownership
//!
//! Registering a handler never transfers ownership. Slots hold `&'cb dyn Trait` references and
//! the borrow checker enforces that every handler outlives the formulation it is registered
//! with. Handlers take `&self`; use interior mutability (`Cell`, `RefCell`, `Mutex`) to record
//! state.
//!
//! # Example
//!
//! ```
//! use lsq_bridge::callbacks::PutString;
//! use lsq_bridge::core::problem::LeastSquaresProblem;
//! use lsq_bridge::engine::{SolverHandle, StatusCode};
//! use std::cell::RefCell;
//!
//! struct Transcript {
//!     lines: RefCell<Vec<String>>,
//! }
//!
//! impl PutString for Transcript {
//!     fn put_string(&self, text: &str, _solver: SolverHandle) -> StatusCode {
//!         self.lines.borrow_mut().push(text.to_string());
//!         StatusCode(text.len() as i32)
//!     }
//! }
//!
//! let transcript = Transcript { lines: RefCell::new(Vec::new()) };
//! let mut problem = LeastSquaresProblem::new(2, 3).unwrap();
//! problem.set_put_string(Some(&transcript));
//! ```

pub mod dispatch;

use thiserror::Error;
use tracing::error;

use crate::engine::{SolverHandle, StatusCode};

/// Errors raised by user evaluation code.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// The model does not provide this evaluation
    #[error("Evaluation not implemented: {0}")]
    NotImplemented(&'static str),

    /// The model failed to produce values at this point
    #[error("Evaluation failed: {0}")]
    Failed(String),

    /// An output or input buffer has the wrong length
    #[error("Evaluation buffer '{buffer}' has length {actual}, expected {expected}")]
    DimensionMismatch {
        buffer: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The model asks the engine to stop the solve
    #[error("Evaluation requested termination")]
    Terminate,
}

impl EvalError {
    /// Engine status reported for this error.
    ///
    /// An evaluation the model does not implement is reported the same way as a missing
    /// callback; everything else is an evaluation failure.
    pub fn status(&self) -> StatusCode {
        match self {
            EvalError::NotImplemented(_) => StatusCode::CALLBACK_ERR,
            EvalError::Failed(_) | EvalError::DimensionMismatch { .. } => StatusCode::EVAL_ERR,
            EvalError::Terminate => StatusCode::USER_TERMINATION,
        }
    }

    #[must_use]
    pub fn log(self) -> Self {
        error!("{}", self);
        self
    }
}

/// Result type for user evaluations
pub type EvalResult = Result<(), EvalError>;

/// Check an evaluation buffer length.
pub fn expect_len(buffer: &'static str, expected: usize, actual: usize) -> EvalResult {
    if expected == actual {
        Ok(())
    } else {
        Err(EvalError::DimensionMismatch {
            buffer,
            expected,
            actual,
        })
    }
}

/// Receives diagnostic text produced by the engine.
pub trait PutString {
    /// Returns a non-negative status (conventionally the number of bytes consumed) on success.
    fn put_string(&self, text: &str, solver: SolverHandle) -> StatusCode;
}

/// Supplies the starting point of each multistart trial.
pub trait MsInitPointCallback {
    /// Write the trial's initial primal point into `x` and dual point into `lambda`.
    fn initial_point(
        &self,
        trial: usize,
        x_lower: &[f64],
        x_upper: &[f64],
        x: &mut [f64],
        lambda: &mut [f64],
        solver: SolverHandle,
    ) -> StatusCode;
}

/// Notified after each multistart trial of a general formulation.
pub trait MsProcessCallback {
    fn on_trial_complete(
        &self,
        x: &[f64],
        lambda: &[f64],
        obj: f64,
        c: &[f64],
        solver: SolverHandle,
    ) -> StatusCode;
}

/// Notified after each multistart trial of a least-squares formulation.
pub trait MsProcessCallbackLsq {
    fn on_trial_complete(&self, x: &[f64], obj: f64, solver: SolverHandle) -> StatusCode;
}

/// Notified at each accepted iterate of a general formulation.
pub trait NewPointCallback {
    #[allow(clippy::too_many_arguments)]
    fn on_new_point(
        &self,
        x: &[f64],
        lambda: &[f64],
        obj: f64,
        c: &[f64],
        obj_grad: &[f64],
        jac: &[f64],
        solver: SolverHandle,
    ) -> StatusCode;
}

/// Notified at each accepted iterate of a least-squares formulation.
pub trait NewPointCallbackLsq {
    fn on_new_point(
        &self,
        x: &[f64],
        obj: f64,
        obj_grad: &[f64],
        jac: &[f64],
        solver: SolverHandle,
    ) -> StatusCode;
}

/// The four optional, borrowed handler slots of a formulation.
///
/// `P` and `N` select the multistart-process and new-point capability shapes.
pub struct CallbackSlots<'cb, P: ?Sized, N: ?Sized> {
    pub put_string: Option<&'cb dyn PutString>,
    pub ms_init_point: Option<&'cb dyn MsInitPointCallback>,
    pub ms_process: Option<&'cb P>,
    pub new_point: Option<&'cb N>,
}

/// Slots of a least-squares formulation.
pub type LsqCallbackSlots<'cb> =
    CallbackSlots<'cb, dyn MsProcessCallbackLsq + 'cb, dyn NewPointCallbackLsq + 'cb>;

/// Slots of a general formulation.
pub type NlpCallbackSlots<'cb> =
    CallbackSlots<'cb, dyn MsProcessCallback + 'cb, dyn NewPointCallback + 'cb>;

impl<P: ?Sized, N: ?Sized> Default for CallbackSlots<'_, P, N> {
    fn default() -> Self {
        Self {
            put_string: None,
            ms_init_point: None,
            ms_process: None,
            new_point: None,
        }
    }
}

impl<P: ?Sized, N: ?Sized> CallbackSlots<'_, P, N> {
    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        [
            self.put_string.is_some(),
            self.ms_init_point.is_some(),
            self.ms_process.is_some(),
            self.new_point.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<P: ?Sized, N: ?Sized> std::fmt::Debug for CallbackSlots<'_, P, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = |set: bool| if set { "Some" } else { "None" };
        f.debug_struct("CallbackSlots")
            .field("put_string", &state(self.put_string.is_some()))
            .field("ms_init_point", &state(self.ms_init_point.is_some()))
            .field("ms_process", &state(self.ms_process.is_some()))
            .field("new_point", &state(self.new_point.is_some()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Silent;

    impl PutString for Silent {
        fn put_string(&self, _text: &str, _solver: SolverHandle) -> StatusCode {
            StatusCode::SUCCESS
        }
    }

    struct TrialLogger;

    impl MsProcessCallbackLsq for TrialLogger {
        fn on_trial_complete(&self, _x: &[f64], _obj: f64, _solver: SolverHandle) -> StatusCode {
            StatusCode::SUCCESS
        }
    }

    #[test]
    fn test_empty_slots() {
        let slots = LsqCallbackSlots::default();
        assert!(slots.is_empty());
        assert_eq!(slots.len(), 0);
        assert!(format!("{:?}", slots).contains("put_string: \"None\""));
    }

    #[test]
    fn test_slot_count() {
        let silent = Silent;
        let logger = TrialLogger;
        let slots = LsqCallbackSlots {
            put_string: Some(&silent),
            ms_process: Some(&logger),
            ..Default::default()
        };
        assert_eq!(slots.len(), 2);
    }

    #[test]
    fn test_eval_error_status() {
        assert_eq!(
            EvalError::NotImplemented("residual").status(),
            StatusCode::CALLBACK_ERR
        );
        assert_eq!(
            EvalError::Failed("nan".to_string()).status(),
            StatusCode::EVAL_ERR
        );
        assert_eq!(EvalError::Terminate.status(), StatusCode::USER_TERMINATION);
        assert_eq!(
            expect_len("residual", 3, 2),
            Err(EvalError::DimensionMismatch {
                buffer: "residual",
                expected: 3,
                actual: 2
            })
        );
    }
}
