//! Routing of engine hooks to registered user callbacks.
//!
//! The engine invokes every hook with one fixed, wide argument list. A formulation implements
//! [`CallbackDispatch`] to map that list onto the capability it holds for the hook:
//!
//! ```text
//! hook           engine supplies                          least-squares handler sees
//! ─────────────  ───────────────────────────────────────  ──────────────────────────
//! put_string     text, solver                             text, solver
//! ms_init_point  trial, x_lo, x_up, x*, lambda*, solver   (same)
//! ms_process     request, x, lambda, obj, c, obj_grad,    x, obj, solver
//!                jac, hessian, hess_vector, solver
//! new_point      x, lambda, obj, c, obj_grad, jac, solver x, obj, obj_grad, jac, solver
//! ```
//!
//! The general formulation forwards everything its full-shape handlers accept. When a slot is
//! empty the wrapper returns [`StatusCode::CALLBACK_ERR`] and leaves every buffer untouched;
//! the engine decides whether that matters.

use tracing::{debug, trace};

use crate::{
    callbacks::CallbackSlots,
    core::{
        nlp::{NlpModel, NlpProblem},
        problem::{LeastSquaresProblem, ResidualModel},
    },
    engine::{EvalRequest, SolverHandle, StatusCode},
};

/// Arguments of the engine's wide evaluation-callback signature as delivered to the
/// multistart-process hook.
#[derive(Debug)]
pub struct MsProcessArgs<'a> {
    pub request: EvalRequest,
    pub x: &'a [f64],
    pub lambda: &'a [f64],
    pub obj: f64,
    pub c: &'a mut [f64],
    pub obj_grad: &'a mut [f64],
    pub jac: &'a mut [f64],
    pub hessian: &'a mut [f64],
    pub hess_vector: &'a mut [f64],
}

/// Arguments of the engine's new-point signature.
#[derive(Debug, Clone, Copy)]
pub struct NewPointArgs<'a> {
    pub x: &'a [f64],
    pub lambda: &'a [f64],
    pub obj: f64,
    pub c: &'a [f64],
    pub obj_grad: &'a [f64],
    pub jac: &'a [f64],
}

/// Engine-facing dispatch entry points of a formulation.
pub trait CallbackDispatch {
    fn put_string_wrapper(&self, text: &str, solver: SolverHandle) -> StatusCode;

    fn ms_init_point_wrapper(
        &self,
        trial: usize,
        x_lower: &[f64],
        x_upper: &[f64],
        x: &mut [f64],
        lambda: &mut [f64],
        solver: SolverHandle,
    ) -> StatusCode;

    fn ms_process_wrapper(&self, args: MsProcessArgs<'_>, solver: SolverHandle) -> StatusCode;

    fn new_point_wrapper(&self, args: NewPointArgs<'_>, solver: SolverHandle) -> StatusCode;
}

fn unavailable(hook: &str) -> StatusCode {
    debug!("no {} callback registered", hook);
    StatusCode::CALLBACK_ERR
}

/// Hooks whose shape is the same for every formulation.
impl<P: ?Sized, N: ?Sized> CallbackSlots<'_, P, N> {
    pub(crate) fn route_put_string(&self, text: &str, solver: SolverHandle) -> StatusCode {
        match self.put_string {
            Some(handler) => handler.put_string(text, solver),
            None => unavailable("put_string"),
        }
    }

    pub(crate) fn route_ms_init_point(
        &self,
        trial: usize,
        x_lower: &[f64],
        x_upper: &[f64],
        x: &mut [f64],
        lambda: &mut [f64],
        solver: SolverHandle,
    ) -> StatusCode {
        match self.ms_init_point {
            Some(handler) => {
                trace!("multistart trial {} initial point", trial);
                handler.initial_point(trial, x_lower, x_upper, x, lambda, solver)
            }
            None => unavailable("ms_init_point"),
        }
    }
}

impl<M: ResidualModel> CallbackDispatch for LeastSquaresProblem<'_, M> {
    fn put_string_wrapper(&self, text: &str, solver: SolverHandle) -> StatusCode {
        self.callbacks().route_put_string(text, solver)
    }

    fn ms_init_point_wrapper(
        &self,
        trial: usize,
        x_lower: &[f64],
        x_upper: &[f64],
        x: &mut [f64],
        lambda: &mut [f64],
        solver: SolverHandle,
    ) -> StatusCode {
        self.callbacks()
            .route_ms_init_point(trial, x_lower, x_upper, x, lambda, solver)
    }

    /// Only `x` and the objective value reach a least-squares handler.
    fn ms_process_wrapper(&self, args: MsProcessArgs<'_>, solver: SolverHandle) -> StatusCode {
        match self.callbacks().ms_process {
            Some(handler) => {
                trace!("multistart process ({:?})", args.request);
                handler.on_trial_complete(args.x, args.obj, solver)
            }
            None => unavailable("ms_process"),
        }
    }

    /// Multipliers and constraint values are dropped.
    fn new_point_wrapper(&self, args: NewPointArgs<'_>, solver: SolverHandle) -> StatusCode {
        match self.callbacks().new_point {
            Some(handler) => handler.on_new_point(args.x, args.obj, args.obj_grad, args.jac, solver),
            None => unavailable("new_point"),
        }
    }
}

impl<M: NlpModel> CallbackDispatch for NlpProblem<'_, M> {
    fn put_string_wrapper(&self, text: &str, solver: SolverHandle) -> StatusCode {
        self.callbacks().route_put_string(text, solver)
    }

    fn ms_init_point_wrapper(
        &self,
        trial: usize,
        x_lower: &[f64],
        x_upper: &[f64],
        x: &mut [f64],
        lambda: &mut [f64],
        solver: SolverHandle,
    ) -> StatusCode {
        self.callbacks()
            .route_ms_init_point(trial, x_lower, x_upper, x, lambda, solver)
    }

    fn ms_process_wrapper(&self, args: MsProcessArgs<'_>, solver: SolverHandle) -> StatusCode {
        match self.callbacks().ms_process {
            Some(handler) => {
                trace!("multistart process ({:?})", args.request);
                handler.on_trial_complete(args.x, args.lambda, args.obj, args.c, solver)
            }
            None => unavailable("ms_process"),
        }
    }

    fn new_point_wrapper(&self, args: NewPointArgs<'_>, solver: SolverHandle) -> StatusCode {
        match self.callbacks().new_point {
            Some(handler) => handler.on_new_point(
                args.x,
                args.lambda,
                args.obj,
                args.c,
                args.obj_grad,
                args.jac,
                solver,
            ),
            None => unavailable("new_point"),
        }
    }
}
