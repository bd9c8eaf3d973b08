//! Optional initial point vectors.
//!
//! An empty vector means "no initial point supplied, let the engine choose", which is distinct
//! from an initial point of zeros. The first indexed set sizes the vector to its full length and
//! fills the untouched entries with the configured default.

use crate::core::{CoreError, CoreResult, slot_mut};

#[derive(Debug, Clone, PartialEq)]
pub struct InitialPoint {
    values: Vec<f64>,
    len: usize,
    default_value: f64,
    what: &'static str,
}

impl InitialPoint {
    pub fn new(len: usize, default_value: f64, what: &'static str) -> Self {
        Self {
            values: Vec::new(),
            len,
            default_value,
            what,
        }
    }

    pub fn is_set(&self) -> bool {
        !self.values.is_empty()
    }

    /// Empty when unset, otherwise full-length.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn set(&mut self, index: usize, value: f64) -> CoreResult<()> {
        if index >= self.len {
            return Err(CoreError::IndexOutOfRange {
                what: self.what,
                index,
                len: self.len,
            }
            .log());
        }
        if self.values.is_empty() {
            self.values = vec![self.default_value; self.len];
        }
        *slot_mut(&mut self.values, index, self.what)? = value;
        Ok(())
    }

    pub fn set_all(&mut self, values: Vec<f64>) -> CoreResult<()> {
        if values.len() != self.len {
            return Err(CoreError::DimensionMismatch(format!(
                "{} expects {} values, got {}",
                self.what,
                self.len,
                values.len()
            ))
            .log());
        }
        self.values = values;
        Ok(())
    }

    /// Back to "engine default".
    pub fn clear(&mut self) {
        self.values.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_unset_is_empty() {
        let point = InitialPoint::new(4, 0.0, "x initial");
        assert!(!point.is_set());
        assert!(point.values().is_empty());
    }

    #[test]
    fn test_partial_set_fills_default() -> TestResult {
        let mut point = InitialPoint::new(4, 0.0, "x initial");
        point.set(1, 2.5)?;
        point.set(3, -1.0)?;
        assert_eq!(point.values(), &[0.0, 2.5, 0.0, -1.0]);

        let mut shifted = InitialPoint::new(3, 7.0, "x initial");
        shifted.set(0, 1.0)?;
        assert_eq!(shifted.values(), &[1.0, 7.0, 7.0]);
        Ok(())
    }

    #[test]
    fn test_out_of_range_leaves_point_unset() {
        let mut point = InitialPoint::new(2, 0.0, "x initial");
        assert!(point.set(2, 1.0).is_err());
        assert!(!point.is_set());
    }

    #[test]
    fn test_set_all_and_clear() -> TestResult {
        let mut point = InitialPoint::new(2, 0.0, "lambda initial");
        assert!(point.set_all(vec![1.0]).is_err());
        point.set_all(vec![1.0, 2.0])?;
        assert_eq!(point.values(), &[1.0, 2.0]);
        point.clear();
        assert!(!point.is_set());
        Ok(())
    }
}
