//! Engine-side vocabulary: status codes, request codes and the opaque solver handle.
//!
//! The optimization engine itself is external. This module only names the pieces of its
//! calling convention that the adapter has to produce or pass through.

pub mod ffi;

use std::{ffi::c_void, fmt};

use crate::core::{CoreError, CoreResult};

/// Integer status returned to the engine from every evaluation or callback hook.
///
/// The domain belongs to the engine: zero is success and negative values are failure classes.
/// Only the codes this crate produces are named; any other value passes through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(pub i32);

impl StatusCode {
    pub const SUCCESS: StatusCode = StatusCode(0);
    /// No user callback is registered for the hook, or the hook is not implemented.
    pub const CALLBACK_ERR: StatusCode = StatusCode(-500);
    /// A user evaluation failed.
    pub const EVAL_ERR: StatusCode = StatusCode(-502);
    /// The user asked the engine to stop.
    pub const USER_TERMINATION: StatusCode = StatusCode(-504);

    pub fn code(self) -> i32 {
        self.0
    }

    pub fn is_success(self) -> bool {
        self.0 >= 0
    }
}

impl From<StatusCode> for i32 {
    fn from(status: StatusCode) -> Self {
        status.0
    }
}

impl From<i32> for StatusCode {
    fn from(code: i32) -> Self {
        StatusCode(code)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            StatusCode::SUCCESS => write!(f, "success"),
            StatusCode::CALLBACK_ERR => write!(f, "callback error ({})", self.0),
            StatusCode::EVAL_ERR => write!(f, "evaluation error ({})", self.0),
            StatusCode::USER_TERMINATION => write!(f, "user termination ({})", self.0),
            StatusCode(code) => write!(f, "status {}", code),
        }
    }
}

/// What the engine is asking for in a wide callback invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvalRequest {
    /// Objective and constraints
    EvalFc,
    /// Objective gradient and constraint Jacobian
    EvalGa,
    /// Hessian of the Lagrangian
    EvalH,
    /// New accepted iterate
    NewPoint,
    /// Hessian-vector product
    EvalHv,
    /// Residuals
    EvalR,
    /// Residual Jacobian
    EvalRj,
    /// Any code this crate does not name
    Other(i32),
}

impl EvalRequest {
    pub fn code(self) -> i32 {
        match self {
            EvalRequest::EvalFc => 1,
            EvalRequest::EvalGa => 2,
            EvalRequest::EvalH => 3,
            EvalRequest::NewPoint => 6,
            EvalRequest::EvalHv => 7,
            EvalRequest::EvalR => 8,
            EvalRequest::EvalRj => 9,
            EvalRequest::Other(code) => code,
        }
    }
}

impl From<i32> for EvalRequest {
    fn from(code: i32) -> Self {
        match code {
            1 => EvalRequest::EvalFc,
            2 => EvalRequest::EvalGa,
            3 => EvalRequest::EvalH,
            6 => EvalRequest::NewPoint,
            7 => EvalRequest::EvalHv,
            8 => EvalRequest::EvalR,
            9 => EvalRequest::EvalRj,
            other => EvalRequest::Other(other),
        }
    }
}

/// Identity of one in-progress solve.
///
/// Wraps the engine's opaque context address. The adapter compares and forwards it but never
/// dereferences it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SolverHandle(usize);

impl SolverHandle {
    pub fn from_raw(context: *mut c_void) -> Self {
        SolverHandle(context as usize)
    }

    pub fn as_raw(self) -> *mut c_void {
        self.0 as *mut c_void
    }

    /// Handle not associated with any engine context; useful when dispatching outside a solve.
    pub fn detached() -> Self {
        SolverHandle(0)
    }

    pub fn is_detached(self) -> bool {
        self.0 == 0
    }
}

/// Evaluation entry points the engine calls on a least-squares formulation.
pub trait ResidualEvaluation {
    /// Fill `residual` (length m) at `x` (length n).
    fn evaluate_residual(&mut self, x: &[f64], residual: &mut [f64]) -> StatusCode;

    /// Fill `jacobian` (one value per declared structure entry) at `x`.
    fn evaluate_jacobian(&mut self, x: &[f64], jacobian: &mut [f64]) -> StatusCode;
}

/// Evaluation entry points the engine calls on a general formulation.
pub trait NlpEvaluation {
    /// Objective value and constraint values.
    fn evaluate_fc(&mut self, x: &[f64], obj: &mut f64, c: &mut [f64]) -> StatusCode;

    /// Objective gradient (length n) and constraint Jacobian values.
    fn evaluate_ga(&mut self, x: &[f64], obj_grad: &mut [f64], jac: &mut [f64]) -> StatusCode;

    /// Hessian of the Lagrangian `sigma * ∇²f + Σ lambda_i ∇²c_i`, upper-triangle values.
    fn evaluate_hess(
        &mut self,
        x: &[f64],
        lambda: &[f64],
        sigma: f64,
        hess: &mut [f64],
    ) -> StatusCode;
}

/// Snapshot of everything the engine reads once when a solve starts, in engine integer types.
///
/// For a least-squares formulation `num_residuals` and `residual_types` are filled and the
/// constraint fields are empty; for a general formulation it is the other way around.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProblemDescription {
    pub num_vars: i32,
    pub num_constraints: i32,
    pub num_residuals: i32,
    pub objective_goal: i32,
    pub objective_type: i32,
    pub variable_types: Vec<i32>,
    pub variable_lower_bounds: Vec<f64>,
    pub variable_upper_bounds: Vec<f64>,
    pub constraint_types: Vec<i32>,
    pub constraint_lower_bounds: Vec<f64>,
    pub constraint_upper_bounds: Vec<f64>,
    pub residual_types: Vec<i32>,
    pub jacobian_rows: Vec<i32>,
    pub jacobian_cols: Vec<i32>,
    pub hessian_rows: Vec<i32>,
    pub hessian_cols: Vec<i32>,
    /// Empty when the engine should choose the starting point.
    pub x_initial: Vec<f64>,
    /// Empty when the engine should choose the starting multipliers.
    pub lambda_initial: Vec<f64>,
}

impl ProblemDescription {
    pub fn nnz_jacobian(&self) -> usize {
        self.jacobian_rows.len()
    }

    pub fn nnz_hessian(&self) -> usize {
        self.hessian_rows.len()
    }
}

/// A formulation that can describe itself to the engine.
pub trait EngineProblem {
    /// Validate and export the problem. Fails if the structure or bounds are inconsistent or
    /// an index does not fit the engine's integer type.
    fn describe(&self) -> CoreResult<ProblemDescription>;
}

/// Convert a size or index to the engine's integer type.
pub fn to_index(value: usize) -> CoreResult<i32> {
    i32::try_from(value).map_err(|_| CoreError::IndexOverflow(value).log())
}

/// Convert an index sequence to the engine's integer type.
pub fn index_vec(values: &[usize]) -> CoreResult<Vec<i32>> {
    values.iter().map(|&value| to_index(value)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert!(StatusCode::SUCCESS.is_success());
        assert!(!StatusCode::CALLBACK_ERR.is_success());
        assert_eq!(i32::from(StatusCode::CALLBACK_ERR), -500);
        assert_eq!(StatusCode::from(-42), StatusCode(-42));
        assert_eq!(StatusCode(-42).to_string(), "status -42");
    }

    #[test]
    fn test_eval_request_codes() {
        for code in -2..12 {
            assert_eq!(EvalRequest::from(code).code(), code);
        }
        assert_eq!(EvalRequest::from(8), EvalRequest::EvalR);
    }

    #[test]
    fn test_index_conversion() {
        assert_eq!(index_vec(&[0, 3, 7]), Ok(vec![0, 3, 7]));
        let too_big = i32::MAX as usize + 1;
        assert_eq!(
            index_vec(&[1, too_big]),
            Err(CoreError::IndexOverflow(too_big))
        );
    }

    #[test]
    fn test_solver_handle_identity() {
        let mut context = 17_u8;
        let ptr = &mut context as *mut u8 as *mut c_void;
        let handle = SolverHandle::from_raw(ptr);
        assert_eq!(handle.as_raw(), ptr);
        assert_eq!(handle, SolverHandle::from_raw(ptr));
        assert!(!handle.is_detached());
        assert!(SolverHandle::detached().is_detached());
    }
}
