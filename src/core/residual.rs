//! Residual set for the least-squares formulation. Residuals carry a type tag and no bounds.

use crate::core::{CoreError, CoreResult, slot_mut};

/// Residual type tag as understood by the engine.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResidualType {
    #[default]
    General,
    Linear,
}

impl ResidualType {
    pub fn code(self) -> i32 {
        match self {
            ResidualType::General => 0,
            ResidualType::Linear => 1,
        }
    }
}

impl TryFrom<i32> for ResidualType {
    type Error = CoreError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(ResidualType::General),
            1 => Ok(ResidualType::Linear),
            other => Err(CoreError::InvalidInput(format!(
                "unknown residual type code {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResidualSet {
    types: Vec<ResidualType>,
}

impl ResidualSet {
    pub fn new(m: usize) -> Self {
        Self {
            types: vec![ResidualType::General; m],
        }
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn types(&self) -> &[ResidualType] {
        &self.types
    }

    pub fn type_codes(&self) -> Vec<i32> {
        self.types.iter().map(|t| t.code()).collect()
    }

    pub fn set_type(&mut self, index: usize, res_type: ResidualType) -> CoreResult<()> {
        *slot_mut(&mut self.types, index, "residual types")? = res_type;
        Ok(())
    }

    /// Replace every tag at once. The length must match the residual count.
    pub fn set_types(&mut self, types: Vec<ResidualType>) -> CoreResult<()> {
        if types.len() != self.types.len() {
            return Err(CoreError::DimensionMismatch(format!(
                "expected {} residual types, got {}",
                self.types.len(),
                types.len()
            ))
            .log());
        }
        self.types = types;
        Ok(())
    }
}
