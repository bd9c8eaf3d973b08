//! Variable set: per-variable type tag and bounds.

use std::fmt;

use crate::core::{CoreError, CoreResult, bounds::BoundSet, slot_mut};

/// Variable type tag as understood by the engine.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableType {
    #[default]
    Continuous,
    Integer,
    Binary,
}

impl VariableType {
    /// Engine integer code.
    pub fn code(self) -> i32 {
        match self {
            VariableType::Continuous => 0,
            VariableType::Integer => 1,
            VariableType::Binary => 2,
        }
    }
}

impl TryFrom<i32> for VariableType {
    type Error = CoreError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(VariableType::Continuous),
            1 => Ok(VariableType::Integer),
            2 => Ok(VariableType::Binary),
            other => Err(CoreError::InvalidInput(format!(
                "unknown variable type code {other}"
            ))),
        }
    }
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableType::Continuous => write!(f, "continuous"),
            VariableType::Integer => write!(f, "integer"),
            VariableType::Binary => write!(f, "binary"),
        }
    }
}

/// Ordered set of `n` variables. The size is fixed at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableSet {
    types: Vec<VariableType>,
    bounds: BoundSet,
}

impl VariableSet {
    pub fn new(n: usize, infinity_bound: f64) -> Self {
        Self {
            types: vec![VariableType::Continuous; n],
            bounds: BoundSet::new(n, infinity_bound, "variables"),
        }
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn types(&self) -> &[VariableType] {
        &self.types
    }

    pub fn type_codes(&self) -> Vec<i32> {
        self.types.iter().map(|t| t.code()).collect()
    }

    pub fn set_type(&mut self, index: usize, var_type: VariableType) -> CoreResult<()> {
        *slot_mut(&mut self.types, index, "variable types")? = var_type;
        Ok(())
    }

    pub fn bounds(&self) -> &BoundSet {
        &self.bounds
    }

    pub fn bounds_mut(&mut self) -> &mut BoundSet {
        &mut self.bounds
    }
}
