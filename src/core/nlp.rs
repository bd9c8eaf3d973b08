//! General nonlinear-programming formulation.
//!
//! [`NlpProblem`] is the sibling of the least-squares formulation for problems of the form
//!
//! ```text
//! minimize / maximize  f(x)
//! subject to           c_lo ≤ c(x) ≤ c_up
//!                      x_lo ≤ x ≤ x_up
//! ```
//!
//! It carries constraints with their own type tags and bounds, a constraint Jacobian
//! (m constraints × n variables) and an optional Hessian-of-the-Lagrangian structure. Its
//! multistart-process and new-point slots take the full capability variants, so nothing the
//! engine supplies is dropped on the way to the user.

use std::fmt;

use tracing::debug;

use crate::{
    callbacks::{
        EvalError, EvalResult, MsInitPointCallback, MsProcessCallback, NewPointCallback,
        NlpCallbackSlots, PutString, expect_len,
    },
    core::{
        CoreError, CoreResult, slot_mut,
        bounds::BoundSet,
        config::ProblemConfig,
        initial_point::InitialPoint,
        objective::{Objective, ObjectiveGoal, ObjectiveType},
        problem::{Unmodeled, eval_status},
        structure::{JacobianLayout, SparseStructure},
        variable::{VariableSet, VariableType},
    },
    engine::{EngineProblem, NlpEvaluation, ProblemDescription, StatusCode, index_vec, to_index},
};

/// Constraint type tag as understood by the engine.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintType {
    #[default]
    General,
    Linear,
    Quadratic,
}

impl ConstraintType {
    pub fn code(self) -> i32 {
        match self {
            ConstraintType::General => 0,
            ConstraintType::Linear => 1,
            ConstraintType::Quadratic => 2,
        }
    }
}

impl TryFrom<i32> for ConstraintType {
    type Error = CoreError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(ConstraintType::General),
            1 => Ok(ConstraintType::Linear),
            2 => Ok(ConstraintType::Quadratic),
            other => Err(CoreError::InvalidInput(format!(
                "unknown constraint type code {other}"
            ))),
        }
    }
}

impl fmt::Display for ConstraintType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintType::General => write!(f, "general"),
            ConstraintType::Linear => write!(f, "linear"),
            ConstraintType::Quadratic => write!(f, "quadratic"),
        }
    }
}

/// Ordered set of `m` constraints with type tags and bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintSet {
    types: Vec<ConstraintType>,
    bounds: BoundSet,
}

impl ConstraintSet {
    pub fn new(m: usize, infinity_bound: f64) -> Self {
        Self {
            types: vec![ConstraintType::default(); m],
            bounds: BoundSet::new(m, infinity_bound, "constraint bounds"),
        }
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn types(&self) -> &[ConstraintType] {
        &self.types
    }

    pub fn type_codes(&self) -> Vec<i32> {
        self.types.iter().map(|t| t.code()).collect()
    }

    pub fn set_type(&mut self, index: usize, con_type: ConstraintType) -> CoreResult<()> {
        *slot_mut(&mut self.types, index, "constraint types")? = con_type;
        Ok(())
    }

    pub fn bounds(&self) -> &BoundSet {
        &self.bounds
    }

    pub fn bounds_mut(&mut self) -> &mut BoundSet {
        &mut self.bounds
    }
}

/// User objective and constraint math for an [`NlpProblem`].
///
/// Buffer sizes: `x` n, `c` m, `obj_grad` n, `jac` one value per Jacobian structure entry,
/// `lambda` m + n, `hess` one value per Hessian structure entry.
pub trait NlpModel {
    fn evaluate_fc(&mut self, _x: &[f64], _obj: &mut f64, _c: &mut [f64]) -> EvalResult {
        Err(EvalError::NotImplemented("objective and constraints"))
    }

    fn evaluate_ga(&mut self, _x: &[f64], _obj_grad: &mut [f64], _jac: &mut [f64]) -> EvalResult {
        Err(EvalError::NotImplemented("gradient and jacobian"))
    }

    fn evaluate_hess(
        &mut self,
        _x: &[f64],
        _lambda: &[f64],
        _sigma: f64,
        _hess: &mut [f64],
    ) -> EvalResult {
        Err(EvalError::NotImplemented("hessian"))
    }
}

impl NlpModel for Unmodeled {}

/// General formulation handed to the engine.
///
/// Same lifecycle as [`LeastSquaresProblem`](crate::core::problem::LeastSquaresProblem). An
/// empty Hessian structure tells the engine to approximate second derivatives itself.
pub struct NlpProblem<'cb, M = Unmodeled> {
    config: ProblemConfig,
    variables: VariableSet,
    constraints: ConstraintSet,
    objective: Objective,
    jacobian: SparseStructure,
    hessian: SparseStructure,
    x_initial: InitialPoint,
    lambda_initial: InitialPoint,
    callbacks: NlpCallbackSlots<'cb>,
    model: M,
}

impl<'cb> NlpProblem<'cb, Unmodeled> {
    /// `n` variables, `m` constraints, dense constraint Jacobian.
    pub fn new(n: usize, m: usize) -> CoreResult<Self> {
        Self::build(n, m, JacobianLayout::Dense, ProblemConfig::default(), Unmodeled)
    }

    pub fn with_config(n: usize, m: usize, config: ProblemConfig) -> CoreResult<Self> {
        Self::build(n, m, JacobianLayout::Dense, config, Unmodeled)
    }
}

impl<'cb, M: NlpModel> NlpProblem<'cb, M> {
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
        let multipliers = n.checked_add(m).ok_or_else(|| {
            CoreError::InvalidInput(format!("{n} variables and {m} constraints overflow")).log()
        })?;
        Ok(Self {
            config,
            variables: VariableSet::new(n, config.infinity_bound),
            constraints: ConstraintSet::new(m, config.infinity_bound),
            objective: Objective::default(),
            jacobian: layout.build(m, n)?,
            hessian: SparseStructure::default(),
            x_initial: InitialPoint::new(n, config.default_initial_value, "x initial"),
            lambda_initial: InitialPoint::new(
                multipliers,
                config.default_initial_value,
                "lambda initial",
            ),
            callbacks: NlpCallbackSlots::default(),
            model,
        })
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

    pub fn num_vars(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
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

    pub fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }

    pub fn variable_types(&self) -> &[VariableType] {
        self.variables.types()
    }

    pub fn variable_lower_bounds(&self) -> &[f64] {
        self.variables.bounds().lower()
    }

    pub fn variable_upper_bounds(&self) -> &[f64] {
        self.variables.bounds().upper()
    }

    pub fn constraint_types(&self) -> &[ConstraintType] {
        self.constraints.types()
    }

    pub fn constraint_lower_bounds(&self) -> &[f64] {
        self.constraints.bounds().lower()
    }

    pub fn constraint_upper_bounds(&self) -> &[f64] {
        self.constraints.bounds().upper()
    }

    pub fn objective_goal(&self) -> ObjectiveGoal {
        self.objective.goal
    }

    pub fn objective_type(&self) -> ObjectiveType {
        self.objective.objective_type
    }

    /// Constraint index of each Jacobian entry.
    pub fn jacobian_rows(&self) -> &[usize] {
        self.jacobian.rows()
    }

    /// Variable index of each Jacobian entry.
    pub fn jacobian_cols(&self) -> &[usize] {
        self.jacobian.cols()
    }

    pub fn hessian_rows(&self) -> &[usize] {
        self.hessian.rows()
    }

    pub fn hessian_cols(&self) -> &[usize] {
        self.hessian.cols()
    }

    pub fn x_initial(&self) -> &[f64] {
        self.x_initial.values()
    }

    /// Constraint multipliers first, then variable-bound multipliers. Empty when unset.
    pub fn lambda_initial(&self) -> &[f64] {
        self.lambda_initial.values()
    }

    pub fn callbacks(&self) -> &NlpCallbackSlots<'cb> {
        &self.callbacks
    }

    pub fn set_objective_type(&mut self, objective_type: ObjectiveType) {
        self.objective.objective_type = objective_type;
    }

    pub fn set_objective_goal(&mut self, goal: ObjectiveGoal) {
        self.objective.goal = goal;
    }

    pub fn set_variable_bounds(&mut self, index: usize, lower: f64, upper: f64) -> CoreResult<()> {
        self.variables.bounds_mut().set(index, lower, upper)
    }

    pub fn set_variable_lower_bound(&mut self, index: usize, value: f64) -> CoreResult<()> {
        self.variables.bounds_mut().set_lower(index, value)
    }

    pub fn set_variable_upper_bound(&mut self, index: usize, value: f64) -> CoreResult<()> {
        self.variables.bounds_mut().set_upper(index, value)
    }

    pub fn set_variable_type(&mut self, index: usize, var_type: VariableType) -> CoreResult<()> {
        self.variables.set_type(index, var_type)
    }

    pub fn set_constraint_type(&mut self, index: usize, con_type: ConstraintType) -> CoreResult<()> {
        self.constraints.set_type(index, con_type)
    }

    pub fn set_constraint_bounds(
        &mut self,
        index: usize,
        lower: f64,
        upper: f64,
    ) -> CoreResult<()> {
        self.constraints.bounds_mut().set(index, lower, upper)
    }

    pub fn set_constraint_lower_bound(&mut self, index: usize, value: f64) -> CoreResult<()> {
        self.constraints.bounds_mut().set_lower(index, value)
    }

    pub fn set_constraint_upper_bound(&mut self, index: usize, value: f64) -> CoreResult<()> {
        self.constraints.bounds_mut().set_upper(index, value)
    }

    pub fn set_x_initial(&mut self, index: usize, value: f64) -> CoreResult<()> {
        self.x_initial.set(index, value)
    }

    pub fn set_lambda_initial(&mut self, index: usize, value: f64) -> CoreResult<()> {
        self.lambda_initial.set(index, value)
    }

    pub fn set_jacobian_entries(&mut self, rows: Vec<usize>, cols: Vec<usize>) -> CoreResult<()> {
        self.jacobian.set_entries(rows, cols)
    }

    pub fn declare_dense_jacobian(&mut self) -> CoreResult<()> {
        self.jacobian = SparseStructure::dense(self.num_constraints(), self.num_vars())?;
        Ok(())
    }

    /// Declare Hessian entries; only the upper triangle (`row <= col`) is accepted.
    pub fn set_hessian_entries(&mut self, rows: Vec<usize>, cols: Vec<usize>) -> CoreResult<()> {
        let mut hessian = SparseStructure::default();
        hessian.set_entries(rows, cols)?;
        hessian.validate_upper_triangular(self.num_vars())?;
        self.hessian = hessian;
        Ok(())
    }

    /// Declare every upper-triangle entry, row-major.
    pub fn declare_dense_hessian(&mut self) {
        self.hessian = SparseStructure::dense_upper_triangle(self.num_vars());
    }

    /// Drop the Hessian structure so the engine approximates second derivatives.
    pub fn clear_hessian(&mut self) {
        self.hessian = SparseStructure::default();
    }

    pub fn set_put_string(&mut self, handler: Option<&'cb dyn PutString>) {
        self.callbacks.put_string = handler;
    }

    pub fn set_ms_init_point(&mut self, handler: Option<&'cb dyn MsInitPointCallback>) {
        self.callbacks.ms_init_point = handler;
    }

    pub fn set_ms_process(&mut self, handler: Option<&'cb dyn MsProcessCallback>) {
        self.callbacks.ms_process = handler;
    }

    pub fn set_new_point(&mut self, handler: Option<&'cb dyn NewPointCallback>) {
        self.callbacks.new_point = handler;
    }

    pub fn validate(&self) -> CoreResult<()> {
        self.variables.bounds().validate()?;
        self.constraints.bounds().validate()?;
        self.jacobian
            .validate(self.num_constraints(), self.num_vars())?;
        self.hessian.validate_upper_triangular(self.num_vars())
    }
}

impl<M: NlpModel> NlpEvaluation for NlpProblem<'_, M> {
    fn evaluate_fc(&mut self, x: &[f64], obj: &mut f64, c: &mut [f64]) -> StatusCode {
        let result = expect_len("x", self.num_vars(), x.len())
            .and_then(|_| expect_len("c", self.num_constraints(), c.len()))
            .and_then(|_| self.model.evaluate_fc(x, obj, c));
        eval_status("objective", result)
    }

    fn evaluate_ga(&mut self, x: &[f64], obj_grad: &mut [f64], jac: &mut [f64]) -> StatusCode {
        let result = expect_len("x", self.num_vars(), x.len())
            .and_then(|_| expect_len("obj_grad", self.num_vars(), obj_grad.len()))
            .and_then(|_| expect_len("jac", self.nnz_jacobian(), jac.len()))
            .and_then(|_| self.model.evaluate_ga(x, obj_grad, jac));
        eval_status("gradient", result)
    }

    fn evaluate_hess(
        &mut self,
        x: &[f64],
        lambda: &[f64],
        sigma: f64,
        hess: &mut [f64],
    ) -> StatusCode {
        if self.hessian.is_empty() {
            debug!("hessian requested but no structure declared");
            return StatusCode::CALLBACK_ERR;
        }
        let multipliers = self.num_constraints() + self.num_vars();
        let result = expect_len("x", self.num_vars(), x.len())
            .and_then(|_| expect_len("lambda", multipliers, lambda.len()))
            .and_then(|_| expect_len("hess", self.nnz_hessian(), hess.len()))
            .and_then(|_| self.model.evaluate_hess(x, lambda, sigma, hess));
        eval_status("hessian", result)
    }
}

impl<M: NlpModel> EngineProblem for NlpProblem<'_, M> {
    fn describe(&self) -> CoreResult<ProblemDescription> {
        self.validate()?;
        Ok(ProblemDescription {
            num_vars: to_index(self.num_vars())?,
            num_constraints: to_index(self.num_constraints())?,
            num_residuals: 0,
            objective_goal: self.objective.goal.code(),
            objective_type: self.objective.objective_type.code(),
            variable_types: self.variables.type_codes(),
            variable_lower_bounds: self.variable_lower_bounds().to_vec(),
            variable_upper_bounds: self.variable_upper_bounds().to_vec(),
            constraint_types: self.constraints.type_codes(),
            constraint_lower_bounds: self.constraint_lower_bounds().to_vec(),
            constraint_upper_bounds: self.constraint_upper_bounds().to_vec(),
            jacobian_rows: index_vec(self.jacobian_rows())?,
            jacobian_cols: index_vec(self.jacobian_cols())?,
            hessian_rows: index_vec(self.hessian_rows())?,
            hessian_cols: index_vec(self.hessian_cols())?,
            x_initial: self.x_initial().to_vec(),
            lambda_initial: self.lambda_initial().to_vec(),
            ..ProblemDescription::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    /// f(x) = x0² + x1², c0(x) = x0 + x1
    struct Circle;

    impl NlpModel for Circle {
        fn evaluate_fc(&mut self, x: &[f64], obj: &mut f64, c: &mut [f64]) -> EvalResult {
            *obj = x[0] * x[0] + x[1] * x[1];
            c[0] = x[0] + x[1];
            Ok(())
        }

        fn evaluate_ga(&mut self, x: &[f64], obj_grad: &mut [f64], jac: &mut [f64]) -> EvalResult {
            obj_grad[0] = 2.0 * x[0];
            obj_grad[1] = 2.0 * x[1];
            jac.copy_from_slice(&[1.0, 1.0]);
            Ok(())
        }

        fn evaluate_hess(
            &mut self,
            _x: &[f64],
            _lambda: &[f64],
            sigma: f64,
            hess: &mut [f64],
        ) -> EvalResult {
            // (0,0) (0,1) (1,1)
            hess.copy_from_slice(&[2.0 * sigma, 0.0, 2.0 * sigma]);
            Ok(())
        }
    }

    #[test]
    fn test_constraint_type_codes() -> TestResult {
        for tag in [
            ConstraintType::General,
            ConstraintType::Linear,
            ConstraintType::Quadratic,
        ] {
            assert_eq!(ConstraintType::try_from(tag.code())?, tag);
        }
        assert!(ConstraintType::try_from(3).is_err());
        Ok(())
    }

    #[test]
    fn test_shape_and_defaults() -> TestResult {
        let problem = NlpProblem::new(3, 2)?;
        assert_eq!(problem.num_vars(), 3);
        assert_eq!(problem.num_constraints(), 2);
        assert_eq!(problem.nnz_jacobian(), 6);
        assert_eq!(problem.nnz_hessian(), 0);
        assert_eq!(problem.jacobian_rows(), &[0, 0, 0, 1, 1, 1]);
        assert_eq!(problem.constraint_lower_bounds(), &[-1.0e20, -1.0e20]);
        problem.validate()?;
        Ok(())
    }

    #[test]
    fn test_lambda_covers_constraints_and_bounds() -> TestResult {
        let mut problem = NlpProblem::new(2, 1)?;
        problem.set_lambda_initial(2, 0.5)?;
        assert_eq!(problem.lambda_initial(), &[0.0, 0.0, 0.5]);
        assert!(problem.set_lambda_initial(3, 0.0).is_err());
        Ok(())
    }

    #[test]
    fn test_hessian_structure() -> TestResult {
        let mut problem = NlpProblem::new(3, 0)?;
        problem.declare_dense_hessian();
        assert_eq!(problem.nnz_hessian(), 6);
        assert!(
            problem
                .hessian_rows()
                .iter()
                .zip(problem.hessian_cols())
                .all(|(row, col)| row <= col)
        );

        assert!(matches!(
            problem.set_hessian_entries(vec![1], vec![0]),
            Err(CoreError::SymbolicStructure(_))
        ));
        assert_eq!(problem.nnz_hessian(), 6);

        problem.set_hessian_entries(vec![0, 2], vec![1, 2])?;
        assert_eq!(problem.nnz_hessian(), 2);
        problem.clear_hessian();
        assert_eq!(problem.nnz_hessian(), 0);
        Ok(())
    }

    #[test]
    fn test_constraint_bounds_validation() -> TestResult {
        let mut problem = NlpProblem::new(2, 2)?;
        problem.set_constraint_bounds(0, 0.0, 1.0)?;
        problem.set_constraint_type(1, ConstraintType::Linear)?;
        assert!(problem.set_constraint_bounds(1, 2.0, 1.0).is_err());
        problem.set_constraint_lower_bound(1, 3.0)?;
        problem.set_constraint_upper_bound(1, 2.0)?;
        assert!(matches!(
            problem.validate(),
            Err(CoreError::InvalidBounds { index: 1, .. })
        ));
        Ok(())
    }

    #[test]
    fn test_model_evaluations() -> TestResult {
        let mut problem = NlpProblem::from_model(2, 1, Circle)?;
        let x = [1.0, 2.0];

        let mut obj = 0.0;
        let mut c = [0.0];
        assert_eq!(problem.evaluate_fc(&x, &mut obj, &mut c), StatusCode::SUCCESS);
        assert_eq!(obj, 5.0);
        assert_eq!(c, [3.0]);

        let mut grad = [0.0; 2];
        let mut jac = [0.0; 2];
        assert_eq!(
            problem.evaluate_ga(&x, &mut grad, &mut jac),
            StatusCode::SUCCESS
        );
        assert_eq!(grad, [2.0, 4.0]);

        let mut hess = [0.0; 3];
        assert_eq!(
            problem.evaluate_hess(&x, &[0.0; 3], 1.0, &mut hess),
            StatusCode::CALLBACK_ERR
        );
        problem.declare_dense_hessian();
        assert_eq!(
            problem.evaluate_hess(&x, &[0.0; 3], 0.5, &mut hess),
            StatusCode::SUCCESS
        );
        assert_eq!(hess, [1.0, 0.0, 1.0]);

        assert_eq!(
            problem.evaluate_hess(&x, &[0.0; 2], 0.5, &mut hess),
            StatusCode::EVAL_ERR
        );
        Ok(())
    }

    #[test]
    fn test_unmodeled_reports_callback_error() -> TestResult {
        let mut problem = NlpProblem::new(1, 1)?;
        let mut obj = 9.0;
        let mut c = [9.0];
        assert_eq!(
            problem.evaluate_fc(&[0.0], &mut obj, &mut c),
            StatusCode::CALLBACK_ERR
        );
        assert_eq!(obj, 9.0);
        Ok(())
    }

    #[test]
    fn test_describe() -> TestResult {
        let mut problem = NlpProblem::from_model(2, 1, Circle)?;
        problem.set_constraint_bounds(0, 1.0, 1.0)?;
        problem.set_objective_goal(ObjectiveGoal::Maximize);
        problem.declare_dense_hessian();

        let description = problem.describe()?;
        assert_eq!(description.num_constraints, 1);
        assert_eq!(description.num_residuals, 0);
        assert_eq!(description.objective_goal, 1);
        assert_eq!(description.constraint_lower_bounds, vec![1.0]);
        assert_eq!(description.hessian_rows, vec![0, 0, 1]);
        assert_eq!(description.hessian_cols, vec![0, 1, 1]);
        assert!(description.residual_types.is_empty());
        Ok(())
    }
}
