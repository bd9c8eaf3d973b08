//! Objective descriptor: type tag and optimization goal.

use std::fmt;

use crate::core::CoreError;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectiveType {
    #[default]
    General,
    Linear,
    Quadratic,
    /// Sum of squared residuals
    LeastSquares,
}

impl ObjectiveType {
    pub fn code(self) -> i32 {
        match self {
            ObjectiveType::General => 0,
            ObjectiveType::Linear => 1,
            ObjectiveType::Quadratic => 2,
            ObjectiveType::LeastSquares => 3,
        }
    }
}

impl TryFrom<i32> for ObjectiveType {
    type Error = CoreError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(ObjectiveType::General),
            1 => Ok(ObjectiveType::Linear),
            2 => Ok(ObjectiveType::Quadratic),
            3 => Ok(ObjectiveType::LeastSquares),
            other => Err(CoreError::InvalidInput(format!(
                "unknown objective type code {other}"
            ))),
        }
    }
}

impl fmt::Display for ObjectiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectiveType::General => write!(f, "general"),
            ObjectiveType::Linear => write!(f, "linear"),
            ObjectiveType::Quadratic => write!(f, "quadratic"),
            ObjectiveType::LeastSquares => write!(f, "least-squares"),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectiveGoal {
    #[default]
    Minimize,
    Maximize,
}

impl ObjectiveGoal {
    pub fn code(self) -> i32 {
        match self {
            ObjectiveGoal::Minimize => 0,
            ObjectiveGoal::Maximize => 1,
        }
    }
}

impl TryFrom<i32> for ObjectiveGoal {
    type Error = CoreError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(ObjectiveGoal::Minimize),
            1 => Ok(ObjectiveGoal::Maximize),
            other => Err(CoreError::InvalidInput(format!(
                "unknown objective goal code {other}"
            ))),
        }
    }
}

impl fmt::Display for ObjectiveGoal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectiveGoal::Minimize => write!(f, "minimize"),
            ObjectiveGoal::Maximize => write!(f, "maximize"),
        }
    }
}

/// Objective type and goal. The engine reads both once per solve.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Objective {
    pub objective_type: ObjectiveType,
    pub goal: ObjectiveGoal,
}
