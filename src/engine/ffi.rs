//! C calling convention of the engine.
//!
//! The engine stores one `user_data` pointer per solve and passes it back, together with raw
//! buffers and their sizes, on every callback. The trampolines here recover the problem from
//! that pointer, rebuild slices, and hand off to [`ResidualEvaluation`], [`NlpEvaluation`] or
//! [`CallbackDispatch`]:
//!
//! ```text
//! engine ──(n, m, nnz, *x, *out, user_data)──► trampoline::<P>
//!                                                 │ user_data as *mut P
//!                                                 │ slice::from_raw_parts(..)
//!                                                 ▼
//!                                      P::evaluate_* / P::*_wrapper
//!                                                 │
//! engine ◄──────────── StatusCode as c_int ───────┘
//! ```
//!
//! A null buffer, or a non-positive size, becomes an empty slice. A null `user_data` is
//! reported as [`StatusCode::CALLBACK_ERR`].

use std::{
    ffi::{CStr, c_char, c_double, c_int, c_void},
    slice,
};

use tracing::{debug, warn};

use crate::{
    callbacks::dispatch::{CallbackDispatch, MsProcessArgs, NewPointArgs},
    engine::{EvalRequest, NlpEvaluation, ResidualEvaluation, SolverHandle, StatusCode},
};

pub use crate::engine::index_vec;

pub type Index = c_int;
pub type Number = c_double;
pub type UserDataPtr = *mut c_void;
pub type ContextPtr = *mut c_void;

/// Least-squares residual or Jacobian evaluation.
pub type LsqEvalFn = unsafe extern "C" fn(
    n: Index,
    m: Index,
    nnz_j: Index,
    x: *const Number,
    residual: *mut Number,
    jac: *mut Number,
    user_data: UserDataPtr,
) -> c_int;

/// Wide evaluation callback of a general formulation.
pub type EvalFn = unsafe extern "C" fn(
    request: c_int,
    n: Index,
    m: Index,
    nnz_j: Index,
    nnz_h: Index,
    x: *const Number,
    lambda: *const Number,
    obj: *mut Number,
    c: *mut Number,
    obj_grad: *mut Number,
    jac: *mut Number,
    hessian: *mut Number,
    hess_vector: *mut Number,
    user_data: UserDataPtr,
) -> c_int;

pub type PutStringFn =
    unsafe extern "C" fn(context: ContextPtr, text: *const c_char, user_data: UserDataPtr) -> c_int;

pub type MsInitPointFn = unsafe extern "C" fn(
    context: ContextPtr,
    trial: Index,
    n: Index,
    m: Index,
    x_lower: *const Number,
    x_upper: *const Number,
    x: *mut Number,
    lambda: *mut Number,
    user_data: UserDataPtr,
) -> c_int;

/// Same buffers as [`EvalFn`], preceded by the solve context.
pub type MsProcessFn = unsafe extern "C" fn(
    context: ContextPtr,
    request: c_int,
    n: Index,
    m: Index,
    nnz_j: Index,
    nnz_h: Index,
    x: *const Number,
    lambda: *const Number,
    obj: *mut Number,
    c: *mut Number,
    obj_grad: *mut Number,
    jac: *mut Number,
    hessian: *mut Number,
    hess_vector: *mut Number,
    user_data: UserDataPtr,
) -> c_int;

pub type NewPointFn = unsafe extern "C" fn(
    context: ContextPtr,
    n: Index,
    m: Index,
    nnz_j: Index,
    x: *const Number,
    lambda: *const Number,
    obj: Number,
    c: *const Number,
    obj_grad: *const Number,
    jac: *const Number,
    user_data: UserDataPtr,
) -> c_int;

/// Entry points registered with the engine for a least-squares solve.
#[derive(Debug, Clone, Copy, Default)]
pub struct LsqCallbackTable {
    pub residual: Option<LsqEvalFn>,
    pub jacobian: Option<LsqEvalFn>,
    pub put_string: Option<PutStringFn>,
    pub ms_init_point: Option<MsInitPointFn>,
    pub ms_process: Option<MsProcessFn>,
    pub new_point: Option<NewPointFn>,
}

impl LsqCallbackTable {
    pub fn for_problem<P: ResidualEvaluation + CallbackDispatch>() -> Self {
        Self {
            residual: Some(residual_trampoline::<P>),
            jacobian: Some(jacobian_trampoline::<P>),
            put_string: Some(put_string_trampoline::<P>),
            ms_init_point: Some(ms_init_point_trampoline::<P>),
            ms_process: Some(ms_process_trampoline::<P>),
            new_point: Some(new_point_trampoline::<P>),
        }
    }
}

/// Entry points registered with the engine for a general solve.
#[derive(Debug, Clone, Copy, Default)]
pub struct NlpCallbackTable {
    pub evaluate: Option<EvalFn>,
    pub put_string: Option<PutStringFn>,
    pub ms_init_point: Option<MsInitPointFn>,
    pub ms_process: Option<MsProcessFn>,
    pub new_point: Option<NewPointFn>,
}

impl NlpCallbackTable {
    pub fn for_problem<P: NlpEvaluation + CallbackDispatch>() -> Self {
        Self {
            evaluate: Some(nlp_eval_trampoline::<P>),
            put_string: Some(put_string_trampoline::<P>),
            ms_init_point: Some(ms_init_point_trampoline::<P>),
            ms_process: Some(ms_process_trampoline::<P>),
            new_point: Some(new_point_trampoline::<P>),
        }
    }
}

/// The `user_data` pointer to register alongside a callback table.
///
/// The pointer is only valid while `problem` stays in place and is not otherwise borrowed.
pub fn user_data<P>(problem: &mut P) -> UserDataPtr {
    (problem as *mut P).cast()
}

fn count(len: Index) -> usize {
    usize::try_from(len).unwrap_or(0)
}

/// # Safety
/// A non-null `ptr` must be valid for `len` reads for the chosen lifetime.
unsafe fn input<'a>(ptr: *const Number, len: usize) -> &'a [Number] {
    if ptr.is_null() || len == 0 {
        &[]
    } else {
        unsafe { slice::from_raw_parts(ptr, len) }
    }
}

/// # Safety
/// A non-null `ptr` must be valid for `len` writes and not aliased for the chosen lifetime.
unsafe fn output<'a>(ptr: *mut Number, len: usize) -> &'a mut [Number] {
    if ptr.is_null() || len == 0 {
        Default::default()
    } else {
        unsafe { slice::from_raw_parts_mut(ptr, len) }
    }
}

fn no_problem(entry: &str) -> c_int {
    warn!("{} invoked with null user data", entry);
    StatusCode::CALLBACK_ERR.code()
}

/// # Safety
/// `user_data` must be null or point to a live `P` with no other active borrow; `x` must hold
/// `n` values and `residual` `m` values.
pub unsafe extern "C" fn residual_trampoline<P: ResidualEvaluation>(
    n: Index,
    m: Index,
    _nnz_j: Index,
    x: *const Number,
    residual: *mut Number,
    _jac: *mut Number,
    user_data: UserDataPtr,
) -> c_int {
    let Some(problem) = (unsafe { user_data.cast::<P>().as_mut() }) else {
        return no_problem("residual");
    };
    let (x, residual) = unsafe { (input(x, count(n)), output(residual, count(m))) };
    problem.evaluate_residual(x, residual).code()
}

/// # Safety
/// As [`residual_trampoline`], with `jac` holding `nnz_j` values.
pub unsafe extern "C" fn jacobian_trampoline<P: ResidualEvaluation>(
    n: Index,
    _m: Index,
    nnz_j: Index,
    x: *const Number,
    _residual: *mut Number,
    jac: *mut Number,
    user_data: UserDataPtr,
) -> c_int {
    let Some(problem) = (unsafe { user_data.cast::<P>().as_mut() }) else {
        return no_problem("jacobian");
    };
    let (x, jac) = unsafe { (input(x, count(n)), output(jac, count(nnz_j))) };
    problem.evaluate_jacobian(x, jac).code()
}

/// Answers objective/constraint, gradient/Jacobian and Hessian requests. The Hessian is
/// requested with unit objective scaling. Other requests report a callback error.
///
/// # Safety
/// `user_data` must be null or point to a live `P` with no other active borrow. Each buffer
/// must hold the count its request implies: `x` n, `lambda` m + n, `obj` one, `c` m,
/// `obj_grad` n, `jac` nnz_j, `hessian` nnz_h.
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn nlp_eval_trampoline<P: NlpEvaluation>(
    request: c_int,
    n: Index,
    m: Index,
    nnz_j: Index,
    nnz_h: Index,
    x: *const Number,
    lambda: *const Number,
    obj: *mut Number,
    c: *mut Number,
    obj_grad: *mut Number,
    jac: *mut Number,
    hessian: *mut Number,
    _hess_vector: *mut Number,
    user_data: UserDataPtr,
) -> c_int {
    let Some(problem) = (unsafe { user_data.cast::<P>().as_mut() }) else {
        return no_problem("evaluation");
    };
    let (n, m) = (count(n), count(m));
    let x = unsafe { input(x, n) };

    let status = match EvalRequest::from(request) {
        EvalRequest::EvalFc => match unsafe { obj.as_mut() } {
            Some(obj) => problem.evaluate_fc(x, obj, unsafe { output(c, m) }),
            None => {
                warn!("objective requested without an objective buffer");
                StatusCode::EVAL_ERR
            }
        },
        EvalRequest::EvalGa => {
            let (obj_grad, jac) = unsafe { (output(obj_grad, n), output(jac, count(nnz_j))) };
            problem.evaluate_ga(x, obj_grad, jac)
        }
        EvalRequest::EvalH => {
            let (lambda, hessian) =
                unsafe { (input(lambda, m + n), output(hessian, count(nnz_h))) };
            problem.evaluate_hess(x, lambda, 1.0, hessian)
        }
        other => {
            debug!("request {:?} not supported", other);
            StatusCode::CALLBACK_ERR
        }
    };
    status.code()
}

/// # Safety
/// `user_data` must be null or point to a live `P`; `text` must be null or NUL-terminated.
pub unsafe extern "C" fn put_string_trampoline<P: CallbackDispatch>(
    context: ContextPtr,
    text: *const c_char,
    user_data: UserDataPtr,
) -> c_int {
    let Some(problem) = (unsafe { user_data.cast::<P>().as_ref() }) else {
        return no_problem("put_string");
    };
    let text = if text.is_null() {
        Default::default()
    } else {
        unsafe { CStr::from_ptr(text) }.to_string_lossy()
    };
    problem
        .put_string_wrapper(&text, SolverHandle::from_raw(context))
        .code()
}

/// # Safety
/// `user_data` must be null or point to a live `P`; bounds and `x` hold n values, `lambda`
/// m + n values.
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn ms_init_point_trampoline<P: CallbackDispatch>(
    context: ContextPtr,
    trial: Index,
    n: Index,
    m: Index,
    x_lower: *const Number,
    x_upper: *const Number,
    x: *mut Number,
    lambda: *mut Number,
    user_data: UserDataPtr,
) -> c_int {
    let Some(problem) = (unsafe { user_data.cast::<P>().as_ref() }) else {
        return no_problem("ms_init_point");
    };
    let (n, m) = (count(n), count(m));
    let (x_lower, x_upper, x, lambda) = unsafe {
        (
            input(x_lower, n),
            input(x_upper, n),
            output(x, n),
            output(lambda, m + n),
        )
    };
    problem
        .ms_init_point_wrapper(
            count(trial),
            x_lower,
            x_upper,
            x,
            lambda,
            SolverHandle::from_raw(context),
        )
        .code()
}

/// A null `obj` reports an evaluation error without reaching the handler.
///
/// # Safety
/// As [`nlp_eval_trampoline`], with the solve context first. `obj` is read, never written.
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn ms_process_trampoline<P: CallbackDispatch>(
    context: ContextPtr,
    request: c_int,
    n: Index,
    m: Index,
    nnz_j: Index,
    nnz_h: Index,
    x: *const Number,
    lambda: *const Number,
    obj: *mut Number,
    c: *mut Number,
    obj_grad: *mut Number,
    jac: *mut Number,
    hessian: *mut Number,
    hess_vector: *mut Number,
    user_data: UserDataPtr,
) -> c_int {
    let Some(problem) = (unsafe { user_data.cast::<P>().as_ref() }) else {
        return no_problem("ms_process");
    };
    let Some(&obj) = (unsafe { obj.as_ref() }) else {
        warn!("multistart trial reported without an objective value");
        return StatusCode::EVAL_ERR.code();
    };
    let (n, m) = (count(n), count(m));
    let args = unsafe {
        MsProcessArgs {
            request: EvalRequest::from(request),
            x: input(x, n),
            lambda: input(lambda, m + n),
            obj,
            c: output(c, m),
            obj_grad: output(obj_grad, n),
            jac: output(jac, count(nnz_j)),
            hessian: output(hessian, count(nnz_h)),
            hess_vector: output(hess_vector, n),
        }
    };
    problem
        .ms_process_wrapper(args, SolverHandle::from_raw(context))
        .code()
}

/// # Safety
/// `user_data` must be null or point to a live `P`; `x` and `obj_grad` hold n values,
/// `lambda` m + n, `c` m, `jac` nnz_j.
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn new_point_trampoline<P: CallbackDispatch>(
    context: ContextPtr,
    n: Index,
    m: Index,
    nnz_j: Index,
    x: *const Number,
    lambda: *const Number,
    obj: Number,
    c: *const Number,
    obj_grad: *const Number,
    jac: *const Number,
    user_data: UserDataPtr,
) -> c_int {
    let Some(problem) = (unsafe { user_data.cast::<P>().as_ref() }) else {
        return no_problem("new_point");
    };
    let (n, m) = (count(n), count(m));
    let args = unsafe {
        NewPointArgs {
            x: input(x, n),
            lambda: input(lambda, m + n),
            obj,
            c: input(c, m),
            obj_grad: input(obj_grad, n),
            jac: input(jac, count(nnz_j)),
        }
    };
    problem
        .new_point_wrapper(args, SolverHandle::from_raw(context))
        .code()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callbacks::{EvalResult, MsProcessCallbackLsq, NewPointCallbackLsq, PutString};
    use crate::core::nlp::{NlpModel, NlpProblem};
    use crate::core::problem::{LeastSquaresProblem, ResidualModel};
    use std::cell::RefCell;
    use std::ffi::CString;
    use std::ptr;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    /// r(x) = [x0 - 3, 2 * x1]
    struct Shifted;

    impl ResidualModel for Shifted {
        fn evaluate_residual(&mut self, x: &[f64], residual: &mut [f64]) -> EvalResult {
            residual[0] = x[0] - 3.0;
            residual[1] = 2.0 * x[1];
            Ok(())
        }

        fn evaluate_jacobian(&mut self, _x: &[f64], jacobian: &mut [f64]) -> EvalResult {
            jacobian.copy_from_slice(&[1.0, 0.0, 0.0, 2.0]);
            Ok(())
        }
    }

    #[derive(Default)]
    struct Echo {
        lines: RefCell<Vec<(String, SolverHandle)>>,
    }

    impl PutString for Echo {
        fn put_string(&self, text: &str, solver: SolverHandle) -> StatusCode {
            self.lines.borrow_mut().push((text.to_string(), solver));
            StatusCode::SUCCESS
        }
    }

    #[derive(Default)]
    struct Points {
        objectives: RefCell<Vec<f64>>,
    }

    impl NewPointCallbackLsq for Points {
        fn on_new_point(
            &self,
            _x: &[f64],
            obj: f64,
            _obj_grad: &[f64],
            _jac: &[f64],
            _solver: SolverHandle,
        ) -> StatusCode {
            self.objectives.borrow_mut().push(obj);
            StatusCode::SUCCESS
        }
    }

    #[derive(Default)]
    struct Trials {
        objectives: RefCell<Vec<f64>>,
    }

    impl MsProcessCallbackLsq for Trials {
        fn on_trial_complete(&self, _x: &[f64], obj: f64, _solver: SolverHandle) -> StatusCode {
            self.objectives.borrow_mut().push(obj);
            StatusCode::SUCCESS
        }
    }

    #[test]
    fn test_residual_and_jacobian_trampolines() -> TestResult {
        let mut problem = LeastSquaresProblem::from_model(2, 2, Shifted)?;
        let table = LsqCallbackTable::for_problem::<LeastSquaresProblem<'_, Shifted>>();
        let data = user_data(&mut problem);

        let x = [1.0, 4.0];
        let mut residual = [0.0; 2];
        let mut jac = [0.0; 4];
        let residual_fn = table.residual.ok_or("residual entry missing")?;
        let jacobian_fn = table.jacobian.ok_or("jacobian entry missing")?;

        let status = unsafe {
            residual_fn(2, 2, 4, x.as_ptr(), residual.as_mut_ptr(), ptr::null_mut(), data)
        };
        assert_eq!(status, 0);
        assert_eq!(residual, [-2.0, 8.0]);

        let status = unsafe {
            jacobian_fn(2, 2, 4, x.as_ptr(), ptr::null_mut(), jac.as_mut_ptr(), data)
        };
        assert_eq!(status, 0);
        assert_eq!(jac, [1.0, 0.0, 0.0, 2.0]);
        Ok(())
    }

    #[test]
    fn test_size_mismatch_is_eval_error() -> TestResult {
        let mut problem = LeastSquaresProblem::from_model(2, 2, Shifted)?;
        let data = user_data(&mut problem);
        let x = [1.0, 4.0];
        let mut residual = [0.0; 3];
        let status = unsafe {
            residual_trampoline::<LeastSquaresProblem<'_, Shifted>>(
                2,
                3,
                4,
                x.as_ptr(),
                residual.as_mut_ptr(),
                ptr::null_mut(),
                data,
            )
        };
        assert_eq!(status, StatusCode::EVAL_ERR.code());
        Ok(())
    }

    #[test]
    fn test_null_user_data() {
        let status = unsafe {
            residual_trampoline::<LeastSquaresProblem<'_>>(
                0,
                0,
                0,
                ptr::null(),
                ptr::null_mut(),
                ptr::null_mut(),
                ptr::null_mut(),
            )
        };
        assert_eq!(status, StatusCode::CALLBACK_ERR.code());
    }

    #[test]
    fn test_put_string_passes_text_and_context() -> TestResult {
        let echo = Echo::default();
        let mut problem = LeastSquaresProblem::new(1, 1)?;
        problem.set_put_string(Some(&echo));

        let mut context = 0_u32;
        let context_ptr = (&mut context as *mut u32).cast::<c_void>();
        let text = CString::new("iteration 4")?;
        let status = unsafe {
            put_string_trampoline::<LeastSquaresProblem<'_>>(
                context_ptr,
                text.as_ptr(),
                user_data(&mut problem),
            )
        };
        assert_eq!(status, 0);
        assert_eq!(
            echo.lines.borrow().as_slice(),
            &[("iteration 4".to_string(), SolverHandle::from_raw(context_ptr))]
        );
        Ok(())
    }

    #[test]
    fn test_new_point_with_null_buffers() -> TestResult {
        let points = Points::default();
        let mut problem = LeastSquaresProblem::new(2, 1)?;
        problem.set_new_point(Some(&points));

        let x = [0.0, 1.0];
        let status = unsafe {
            new_point_trampoline::<LeastSquaresProblem<'_>>(
                ptr::null_mut(),
                2,
                0,
                0,
                x.as_ptr(),
                ptr::null(),
                0.25,
                ptr::null(),
                ptr::null(),
                ptr::null(),
                user_data(&mut problem),
            )
        };
        assert_eq!(status, 0);
        assert_eq!(points.objectives.borrow().as_slice(), &[0.25]);
        Ok(())
    }

    #[test]
    fn test_ms_process_requires_objective() -> TestResult {
        let trials = Trials::default();
        let mut problem = LeastSquaresProblem::new(2, 1)?;
        problem.set_ms_process(Some(&trials));
        let data = user_data(&mut problem);
        let x = [1.0, 2.0];

        let process = |obj: *mut Number| unsafe {
            ms_process_trampoline::<LeastSquaresProblem<'_>>(
                ptr::null_mut(),
                EvalRequest::Other(0).code(),
                2,
                0,
                2,
                0,
                x.as_ptr(),
                ptr::null(),
                obj,
                ptr::null_mut(),
                ptr::null_mut(),
                ptr::null_mut(),
                ptr::null_mut(),
                ptr::null_mut(),
                data,
            )
        };

        assert_eq!(process(ptr::null_mut()), StatusCode::EVAL_ERR.code());
        assert!(trials.objectives.borrow().is_empty());

        let mut obj = 1.5;
        assert_eq!(process(&mut obj as *mut Number), 0);
        assert_eq!(trials.objectives.borrow().as_slice(), &[1.5]);
        Ok(())
    }

    /// f(x) = x0 * x1, c0 = x0 - x1
    struct Product;

    impl NlpModel for Product {
        fn evaluate_fc(&mut self, x: &[f64], obj: &mut f64, c: &mut [f64]) -> EvalResult {
            *obj = x[0] * x[1];
            c[0] = x[0] - x[1];
            Ok(())
        }

        fn evaluate_ga(&mut self, x: &[f64], obj_grad: &mut [f64], jac: &mut [f64]) -> EvalResult {
            obj_grad.copy_from_slice(&[x[1], x[0]]);
            jac.copy_from_slice(&[1.0, -1.0]);
            Ok(())
        }
    }

    #[test]
    fn test_nlp_requests() -> TestResult {
        let mut problem = NlpProblem::from_model(2, 1, Product)?;
        let table = NlpCallbackTable::for_problem::<NlpProblem<'_, Product>>();
        let evaluate = table.evaluate.ok_or("evaluation entry missing")?;
        let data = user_data(&mut problem);

        let x = [2.0, 5.0];
        let lambda = [0.0; 3];
        let mut obj = 0.0;
        let mut c = [0.0];
        let mut grad = [0.0; 2];
        let mut jac = [0.0; 2];
        let mut hess = [0.0; 3];
        let mut hv = [0.0; 2];

        let mut call = |request: EvalRequest| unsafe {
            evaluate(
                request.code(),
                2,
                1,
                2,
                0,
                x.as_ptr(),
                lambda.as_ptr(),
                &mut obj,
                c.as_mut_ptr(),
                grad.as_mut_ptr(),
                jac.as_mut_ptr(),
                hess.as_mut_ptr(),
                hv.as_mut_ptr(),
                data,
            )
        };

        assert_eq!(call(EvalRequest::EvalFc), 0);
        assert_eq!(call(EvalRequest::EvalGa), 0);
        assert_eq!(call(EvalRequest::EvalH), StatusCode::CALLBACK_ERR.code());
        assert_eq!(call(EvalRequest::EvalHv), StatusCode::CALLBACK_ERR.code());
        assert_eq!(obj, 10.0);
        assert_eq!(c, [-3.0]);
        assert_eq!(grad, [5.0, 2.0]);
        assert_eq!(jac, [1.0, -1.0]);
        Ok(())
    }
}
