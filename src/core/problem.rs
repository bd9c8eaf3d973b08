//! Least-squares problem formulation.
//!
//! [`LeastSquaresProblem`] is what the engine sees when it solves
//!
//! ```text
//! minimize Σ_j r_j(x)²     subject to  x_lo ≤ x ≤ x_up
//! ```
//!
//! It composes a [`VariableSet`] (n variables with type tags and bounds), a [`ResidualSet`]
//! (m residuals with type tags), the [`Objective`] descriptor, the sparse Jacobian structure,
//! optional initial points, and the four borrowed callback slots.
//!
//! The residual math enters through the [`ResidualModel`] seam. The base formulation uses
//! [`Unmodeled`], whose evaluations report "callback error" to the engine; a concrete problem
//! supplies its own model:
//!
//! ```
//! use lsq_bridge::callbacks::{EvalResult, expect_len};
//! use lsq_bridge::core::problem::{LeastSquaresProblem, ResidualModel};
//! use lsq_bridge::engine::{ResidualEvaluation, StatusCode};
//! # use lsq_bridge::error::BridgeResult;
//! # fn example() -> BridgeResult<()> {
//!
//! /// r(x) = [x0 - 1, x1 - 2]
//! struct Offsets;
//!
//! impl ResidualModel for Offsets {
//!     fn evaluate_residual(&mut self, x: &[f64], residual: &mut [f64]) -> EvalResult {
//!         residual[0] = x[0] - 1.0;
//!         residual[1] = x[1] - 2.0;
//!         Ok(())
//!     }
//!
//!     fn evaluate_jacobian(&mut self, _x: &[f64], jacobian: &mut [f64]) -> EvalResult {
//!         expect_len("jacobian", 4, jacobian.len())?;
//!         jacobian.copy_from_slice(&[1.0, 0.0, 0.0, 1.0]);
//!         Ok(())
//!     }
//! }
//!
//! let mut problem = LeastSquaresProblem::from_model(2, 2, Offsets)?;
//! problem.set_x_initial(1, 0.5)?;
//!
//! let mut residual = [0.0; 2];
//! let status = problem.evaluate_residual(&[0.0, 0.0], &mut residual);
//! assert_eq!(status, StatusCode::SUCCESS);
//! assert_eq!(residual, [-1.0, -2.0]);
//! assert_eq!(problem.x_initial(), &[0.0, 0.5]);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

use faer::sparse::SparseColMat;
use nalgebra::DVector;
use tracing::debug;

use crate::{
    callbacks::{
        EvalError, EvalResult, LsqCallbackSlots, MsInitPointCallback, MsProcessCallbackLsq,
        NewPointCallbackLsq, PutString, expect_len,
    },
    core::{
        CoreResult,
        bounds::BoundSet,
        config::ProblemConfig,
        initial_point::InitialPoint,
        objective::{Objective, ObjectiveGoal, ObjectiveType},
        residual::{ResidualSet, ResidualType},
        structure::{JacobianLayout, SparseStructure, SymbolicStructure},
        variable::{VariableSet, VariableType},
    },
    engine::{EngineProblem, ProblemDescription, ResidualEvaluation, StatusCode, index_vec, to_index},
    error::BridgeResult,
};

/// User residual math for a [`LeastSquaresProblem`].
///
/// Both methods default to [`EvalError::NotImplemented`], which the engine receives as a
/// callback error. Buffers are sized by the formulation before the call: `x` has length n,
/// `residual` length m, and `jacobian` one value per declared structure entry, in structure
/// order.
pub trait ResidualModel {
    fn evaluate_residual(&mut self, _x: &[f64], _residual: &mut [f64]) -> EvalResult {
        Err(EvalError::NotImplemented("residual"))
    }

    fn evaluate_jacobian(&mut self, _x: &[f64], _jacobian: &mut [f64]) -> EvalResult {
        Err(EvalError::NotImplemented("jacobian"))
    }
}

/// Placeholder model of the base formulation. Every evaluation reports "not implemented".
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Unmodeled;

impl ResidualModel for Unmodeled {}

/// The least-squares specialization handed to the engine.
///
/// # Lifecycle
///
/// 1. Construct with fixed `(n, m)` and a Jacobian layout
/// 2. Populate bounds, type tags, structure and initial points
/// 3. Register callbacks (borrowed, `'cb` must outlive every solve)
/// 4. Hand the problem to the engine, which calls [`ResidualEvaluation`] and
///    [`CallbackDispatch`](crate::callbacks::dispatch::CallbackDispatch) synchronously
///
/// Nothing here is synchronized: do not mutate a problem while a solve using it is running.
pub struct LeastSquaresProblem<'cb, M = Unmodeled> {
    config: ProblemConfig,
    variables: VariableSet,
    residuals: ResidualSet,
    objective: Objective,
    jacobian: SparseStructure,
    /// Always empty: second-order information is not user-supplied here.
    hessian: SparseStructure,
    x_initial: InitialPoint,
    lambda_initial: InitialPoint,
    callbacks: LsqCallbackSlots<'cb>,
    model: M,
}

impl<'cb> LeastSquaresProblem<'cb, Unmodeled> {
    /// Base formulation with a dense Jacobian of `m * n` entries.
    pub fn new(n: usize, m: usize) -> CoreResult<Self> {
        Self::build(n, m, JacobianLayout::Dense, ProblemConfig::default(), Unmodeled)
    }

    /// Base formulation with a dense Jacobian and caller-supplied configuration.
    pub fn with_config(n: usize, m: usize, config: ProblemConfig) -> CoreResult<Self> {
        Self::build(n, m, JacobianLayout::Dense, config, Unmodeled)
    }

    /// Base formulation with `nnz` Jacobian entries to be declared by position.
    pub fn with_nnz(n: usize, m: usize, nnz: usize) -> Self {
        let config = ProblemConfig::default();
        Self::assemble(n, m, SparseStructure::with_nnz(nnz), config, Unmodeled)
    }
}

impl<'cb, M: ResidualModel> LeastSquaresProblem<'cb, M> {
    /// Formulation around `model` with a dense Jacobian.
    pub fn from_model(n: usize, m: usize, model: M) -> CoreResult<Self> {
        Self::build(n, m, JacobianLayout::Dense, ProblemConfig::default(), model)
    }

    pub fn build(
        n: usize,
        m: usize,
        layout: JacobianLayout,
        config: ProblemConfig,
        model: M,
    ) -> CoreResult<Self> {
        let jacobian = layout.build(m, n)?;
        Ok(Self::assemble(n, m, jacobian, config, model))
    }

    fn assemble(
        n: usize,
        m: usize,
        jacobian: SparseStructure,
        config: ProblemConfig,
        model: M,
    ) -> Self {
        Self {
            config,
            variables: VariableSet::new(n, config.infinity_bound),
            residuals: ResidualSet::new(m),
            objective: Objective::default(),
            jacobian,
            hessian: SparseStructure::default(),
            x_initial: InitialPoint::new(n, config.default_initial_value, "x initial"),
            // One multiplier per constraint (none here) and per variable bound.
            lambda_initial: InitialPoint::new(n, config.default_initial_value, "lambda initial"),
            callbacks: LsqCallbackSlots::default(),
            model,
        }
    }

    pub fn config(&self) -> &ProblemConfig {
        &self.config
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    pub fn into_model(self) -> M {
        self.model
    }

    pub fn num_vars(&self) -> usize {
        self.variables.len()
    }

    pub fn num_residuals(&self) -> usize {
        self.residuals.len()
    }

    /// Least-squares problems carry no constraints.
    pub fn num_constraints(&self) -> usize {
        0
    }

    pub fn nnz_jacobian(&self) -> usize {
        self.jacobian.nnz()
    }

    pub fn nnz_hessian(&self) -> usize {
        self.hessian.nnz()
    }

    pub fn variables(&self) -> &VariableSet {
        &self.variables
    }

    pub fn variable_types(&self) -> &[VariableType] {
        self.variables.types()
    }

    pub fn variable_bounds(&self) -> &BoundSet {
        self.variables.bounds()
    }

    pub fn variable_lower_bounds(&self) -> &[f64] {
        self.variables.bounds().lower()
    }

    pub fn variable_upper_bounds(&self) -> &[f64] {
        self.variables.bounds().upper()
    }

    pub fn residual_types(&self) -> &[ResidualType] {
        self.residuals.types()
    }

    pub fn objective(&self) -> Objective {
        self.objective
    }

    pub fn variable_type_codes(&self) -> Vec<i32> {
        self.variables.type_codes()
    }

    pub fn residual_type_codes(&self) -> Vec<i32> {
        self.residuals.type_codes()
    }

    pub fn objective_goal_code(&self) -> i32 {
        self.objective.goal.code()
    }

    pub fn objective_type_code(&self) -> i32 {
        self.objective.objective_type.code()
    }

    pub fn objective_goal(&self) -> ObjectiveGoal {
        self.objective.goal
    }

    pub fn objective_type(&self) -> ObjectiveType {
        self.objective.objective_type
    }

    pub fn jacobian(&self) -> &SparseStructure {
        &self.jacobian
    }

    /// Residual index of each Jacobian entry.
    pub fn jacobian_rows(&self) -> &[usize] {
        self.jacobian.rows()
    }

    /// Variable index of each Jacobian entry.
    pub fn jacobian_cols(&self) -> &[usize] {
        self.jacobian.cols()
    }

    pub fn hessian(&self) -> &SparseStructure {
        &self.hessian
    }

    pub fn hessian_rows(&self) -> &[usize] {
        self.hessian.rows()
    }

    pub fn hessian_cols(&self) -> &[usize] {
        self.hessian.cols()
    }

    /// Empty when no initial point was supplied.
    pub fn x_initial(&self) -> &[f64] {
        self.x_initial.values()
    }

    /// Empty when no initial multipliers were supplied.
    pub fn lambda_initial(&self) -> &[f64] {
        self.lambda_initial.values()
    }

    pub fn callbacks(&self) -> &LsqCallbackSlots<'cb> {
        &self.callbacks
    }

    pub fn set_objective_type(&mut self, objective_type: ObjectiveType) {
        self.objective.objective_type = objective_type;
    }

    pub fn set_objective_goal(&mut self, goal: ObjectiveGoal) {
        self.objective.goal = goal;
    }

    pub fn set_variable_lower_bound(&mut self, index: usize, value: f64) -> CoreResult<()> {
        self.variables.bounds_mut().set_lower(index, value)
    }

    pub fn set_variable_upper_bound(&mut self, index: usize, value: f64) -> CoreResult<()> {
        self.variables.bounds_mut().set_upper(index, value)
    }

    pub fn set_variable_bounds(&mut self, index: usize, lower: f64, upper: f64) -> CoreResult<()> {
        self.variables.bounds_mut().set(index, lower, upper)
    }

    pub fn set_variable_type(&mut self, index: usize, var_type: VariableType) -> CoreResult<()> {
        self.variables.set_type(index, var_type)
    }

    pub fn set_residual_type(&mut self, index: usize, res_type: ResidualType) -> CoreResult<()> {
        self.residuals.set_type(index, res_type)
    }

    pub fn set_residual_types(&mut self, types: Vec<ResidualType>) -> CoreResult<()> {
        self.residuals.set_types(types)
    }

    /// Set one entry of the initial point. The first call sizes the point to n and fills the
    /// other entries with the configured default.
    pub fn set_x_initial(&mut self, index: usize, value: f64) -> CoreResult<()> {
        self.x_initial.set(index, value)
    }

    pub fn set_x_initial_all(&mut self, values: Vec<f64>) -> CoreResult<()> {
        self.x_initial.set_all(values)
    }

    pub fn set_lambda_initial(&mut self, index: usize, value: f64) -> CoreResult<()> {
        self.lambda_initial.set(index, value)
    }

    pub fn set_jacobian_row(&mut self, position: usize, residual: usize) -> CoreResult<()> {
        self.jacobian.set_row(position, residual)
    }

    pub fn set_jacobian_col(&mut self, position: usize, variable: usize) -> CoreResult<()> {
        self.jacobian.set_col(position, variable)
    }

    /// Replace the residual index sequence; the Jacobian entry count follows its length.
    pub fn set_jacobian_rows(&mut self, rows: Vec<usize>) {
        self.jacobian.set_rows(rows);
    }

    /// Replace the variable index sequence.
    pub fn set_jacobian_cols(&mut self, cols: Vec<usize>) {
        self.jacobian.set_cols(cols);
    }

    pub fn set_jacobian_entries(&mut self, rows: Vec<usize>, cols: Vec<usize>) -> CoreResult<()> {
        self.jacobian.set_entries(rows, cols)
    }

    /// Declare every `(residual, variable)` pair, entry `j * n + i` at `(j, i)`.
    pub fn declare_dense_jacobian(&mut self) -> CoreResult<()> {
        self.jacobian = SparseStructure::dense(self.num_residuals(), self.num_vars())?;
        Ok(())
    }

    pub fn set_put_string(&mut self, handler: Option<&'cb dyn PutString>) {
        self.callbacks.put_string = handler;
    }

    pub fn set_ms_init_point(&mut self, handler: Option<&'cb dyn MsInitPointCallback>) {
        self.callbacks.ms_init_point = handler;
    }

    pub fn set_ms_process(&mut self, handler: Option<&'cb dyn MsProcessCallbackLsq>) {
        self.callbacks.ms_process = handler;
    }

    pub fn set_new_point(&mut self, handler: Option<&'cb dyn NewPointCallbackLsq>) {
        self.callbacks.new_point = handler;
    }

    /// Check bounds ordering and the Jacobian structure before a solve.
    pub fn validate(&self) -> CoreResult<()> {
        self.variables.bounds().validate()?;
        self.jacobian.validate(self.num_residuals(), self.num_vars())
    }

    /// faer symbolic pattern of the declared Jacobian (m x n).
    pub fn jacobian_symbolic(&self) -> CoreResult<SymbolicStructure> {
        self.jacobian
            .to_symbolic(self.num_residuals(), self.num_vars())
    }

    /// Sparse m x n matrix from Jacobian values given in structure order.
    pub fn assemble_jacobian(&self, values: &[f64]) -> CoreResult<SparseColMat<usize, f64>> {
        self.jacobian
            .assemble(self.num_residuals(), self.num_vars(), values)
    }

    /// Evaluate the model's residuals at `x`.
    pub fn residual_vector(&mut self, x: &DVector<f64>) -> BridgeResult<DVector<f64>> {
        let mut residual = DVector::zeros(self.num_residuals());
        self.checked_residual(x.as_slice(), residual.as_mut_slice())?;
        Ok(residual)
    }

    /// Sum of squared residuals at `x`, the objective the engine minimizes.
    pub fn sum_of_squares(&mut self, x: &DVector<f64>) -> BridgeResult<f64> {
        Ok(self.residual_vector(x)?.norm_squared())
    }

    /// Evaluate the model's Jacobian at `x` and assemble it.
    pub fn jacobian_matrix(&mut self, x: &DVector<f64>) -> BridgeResult<SparseColMat<usize, f64>> {
        let mut values = vec![0.0; self.nnz_jacobian()];
        self.checked_jacobian(x.as_slice(), &mut values)?;
        Ok(self.assemble_jacobian(&values)?)
    }

    fn checked_residual(&mut self, x: &[f64], residual: &mut [f64]) -> EvalResult {
        expect_len("x", self.num_vars(), x.len())?;
        expect_len("residual", self.num_residuals(), residual.len())?;
        self.model.evaluate_residual(x, residual)
    }

    fn checked_jacobian(&mut self, x: &[f64], jacobian: &mut [f64]) -> EvalResult {
        expect_len("x", self.num_vars(), x.len())?;
        expect_len("jacobian", self.nnz_jacobian(), jacobian.len())?;
        self.model.evaluate_jacobian(x, jacobian)
    }
}

/// Report an evaluation outcome to the engine.
pub(crate) fn eval_status(what: &str, result: EvalResult) -> StatusCode {
    match result {
        Ok(()) => StatusCode::SUCCESS,
        Err(EvalError::NotImplemented(hook)) => {
            debug!("{} evaluation not implemented ({})", what, hook);
            StatusCode::CALLBACK_ERR
        }
        Err(e) => {
            debug!("{} evaluation failed", what);
            e.log().status()
        }
    }
}

impl<M: ResidualModel> ResidualEvaluation for LeastSquaresProblem<'_, M> {
    fn evaluate_residual(&mut self, x: &[f64], residual: &mut [f64]) -> StatusCode {
        eval_status("residual", self.checked_residual(x, residual))
    }

    fn evaluate_jacobian(&mut self, x: &[f64], jacobian: &mut [f64]) -> StatusCode {
        eval_status("jacobian", self.checked_jacobian(x, jacobian))
    }
}

impl<M: ResidualModel> EngineProblem for LeastSquaresProblem<'_, M> {
    fn describe(&self) -> CoreResult<ProblemDescription> {
        self.validate()?;
        Ok(ProblemDescription {
            num_vars: to_index(self.num_vars())?,
            num_constraints: 0,
            num_residuals: to_index(self.num_residuals())?,
            objective_goal: self.objective_goal_code(),
            objective_type: self.objective_type_code(),
            variable_types: self.variable_type_codes(),
            variable_lower_bounds: self.variable_lower_bounds().to_vec(),
            variable_upper_bounds: self.variable_upper_bounds().to_vec(),
            residual_types: self.residual_type_codes(),
            jacobian_rows: index_vec(self.jacobian_rows())?,
            jacobian_cols: index_vec(self.jacobian_cols())?,
            x_initial: self.x_initial().to_vec(),
            lambda_initial: self.lambda_initial().to_vec(),
            ..ProblemDescription::default()
        })
    }
}
