//! # lsq-bridge
//!
//! Problem formulation and callback dispatch between user least-squares models and an external
//! nonlinear optimization engine reached through a C-style calling convention.
//!
//! ## Features
//!
//! - **Least-squares formulation**: variables with bounds and type tags, residuals, objective
//!   descriptor, sparse Jacobian structure (dense by default), optional initial points
//! - **General formulation**: constraints with bounds, constraint Jacobian, upper-triangle
//!   Hessian structure
//! - **Borrowed callbacks**: put-string, multistart initial point, multistart process and
//!   new-point hooks, each an optional `&dyn` reference the formulation never owns
//! - **Wide-to-narrow dispatch**: engine hooks are routed to the capability shape that matches
//!   the formulation; an unset hook reports a callback error status
//! - **C trampolines**: `extern "C"` entry points and callback tables for the engine
//! - **faer / nalgebra interop**: symbolic sparsity patterns, assembled Jacobians and residual
//!   vectors
//!
//! ## Layers
//!
//! - [`core`]: formulation containers and the two problem types
//! - [`callbacks`]: capability traits, callback slots and dispatch
//! - [`engine`]: status codes, solver handle, evaluation traits and the C calling convention

pub mod callbacks;
pub mod core;
pub mod engine;
pub mod error;
#[cfg(feature = "logging")]
pub mod logger;

pub use callbacks::{
    EvalError, EvalResult, MsInitPointCallback, MsProcessCallback, MsProcessCallbackLsq,
    NewPointCallback, NewPointCallbackLsq, PutString,
    dispatch::{CallbackDispatch, MsProcessArgs, NewPointArgs},
};
pub use core::{
    CoreError, CoreResult,
    config::ProblemConfig,
    nlp::{ConstraintType, NlpModel, NlpProblem},
    objective::{ObjectiveGoal, ObjectiveType},
    problem::{LeastSquaresProblem, ResidualModel, Unmodeled},
    residual::ResidualType,
    structure::{JacobianLayout, SparseStructure},
    variable::VariableType,
};
pub use engine::{
    EngineProblem, EvalRequest, NlpEvaluation, ProblemDescription, ResidualEvaluation,
    SolverHandle, StatusCode,
};
pub use error::{BridgeError, BridgeResult};
#[cfg(feature = "logging")]
pub use logger::{init_logger, init_logger_with_level};
