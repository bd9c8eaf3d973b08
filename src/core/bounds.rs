//! Fixed-size lower/upper bound storage.

use std::cmp::Ordering;

use crate::core::{CoreError, CoreResult, slot, slot_mut};

/// `lower <= upper`, with NaN on either side unordered.
fn ordered(lower: f64, upper: f64) -> bool {
    matches!(
        lower.partial_cmp(&upper),
        Some(Ordering::Less | Ordering::Equal)
    )
}

/// Per-entry (lower, upper) bounds with a size fixed at construction.
///
/// New entries start unbounded: `(-infinity_bound, +infinity_bound)`. Individual setters do not
/// cross-check the opposite bound because callers commonly set the two sides one after the
/// other; [`validate`](Self::validate) checks the ordering before a solve.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundSet {
    lower: Vec<f64>,
    upper: Vec<f64>,
    infinity_bound: f64,
    what: &'static str,
}

impl BoundSet {
    pub fn new(len: usize, infinity_bound: f64, what: &'static str) -> Self {
        Self {
            lower: vec![-infinity_bound; len],
            upper: vec![infinity_bound; len],
            infinity_bound,
            what,
        }
    }

    pub fn len(&self) -> usize {
        self.lower.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    pub fn set_lower(&mut self, index: usize, value: f64) -> CoreResult<()> {
        *slot_mut(&mut self.lower, index, self.what)? = value;
        Ok(())
    }

    pub fn set_upper(&mut self, index: usize, value: f64) -> CoreResult<()> {
        *slot_mut(&mut self.upper, index, self.what)? = value;
        Ok(())
    }

    /// Set both sides at once, rejecting `lower > upper` and NaN.
    pub fn set(&mut self, index: usize, lower: f64, upper: f64) -> CoreResult<()> {
        if !ordered(lower, upper) {
            return Err(CoreError::InvalidBounds {
                index,
                lower,
                upper,
            }
            .log());
        }
        self.set_lower(index, lower)?;
        self.set_upper(index, upper)
    }

    pub fn is_unbounded_below(&self, index: usize) -> CoreResult<bool> {
        Ok(*slot(&self.lower, index, self.what)? <= -self.infinity_bound)
    }

    pub fn is_unbounded_above(&self, index: usize) -> CoreResult<bool> {
        Ok(*slot(&self.upper, index, self.what)? >= self.infinity_bound)
    }

    /// Check `lower <= upper` for every entry. NaN on either side fails.
    pub fn validate(&self) -> CoreResult<()> {
        match self
            .lower
            .iter()
            .zip(&self.upper)
            .position(|(&lo, &up)| !ordered(lo, up))
        {
            Some(index) => Err(CoreError::InvalidBounds {
                index,
                lower: self.lower[index],
                upper: self.upper[index],
            }
            .log()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_starts_unbounded() -> TestResult {
        let bounds = BoundSet::new(2, 1.0e20, "variables");
        assert_eq!(bounds.lower(), &[-1.0e20, -1.0e20]);
        assert_eq!(bounds.upper(), &[1.0e20, 1.0e20]);
        assert!(bounds.is_unbounded_below(0)?);
        assert!(bounds.is_unbounded_above(1)?);
        Ok(())
    }

    #[test]
    fn test_setters_and_validation() -> TestResult {
        let mut bounds = BoundSet::new(3, 1.0e20, "variables");
        bounds.set_lower(0, -1.0)?;
        bounds.set_upper(0, 1.0)?;
        bounds.set(2, 0.0, 0.0)?;
        assert!(!bounds.is_unbounded_below(0)?);
        bounds.validate()?;

        bounds.set_lower(1, 5.0)?;
        bounds.set_upper(1, 4.0)?;
        assert!(matches!(
            bounds.validate(),
            Err(CoreError::InvalidBounds { index: 1, .. })
        ));
        Ok(())
    }

    #[test]
    fn test_out_of_range() {
        let mut bounds = BoundSet::new(1, 1.0e20, "variables");
        assert!(matches!(
            bounds.set_lower(1, 0.0),
            Err(CoreError::IndexOutOfRange { index: 1, len: 1, .. })
        ));
        assert!(bounds.set(0, 2.0, 1.0).is_err());
        assert_eq!(bounds.lower()[0], -1.0e20);
    }

    #[test]
    fn test_nan_bounds_rejected() -> TestResult {
        let mut bounds = BoundSet::new(2, 1.0e20, "variables");
        assert!(matches!(
            bounds.set(0, f64::NAN, 1.0),
            Err(CoreError::InvalidBounds { index: 0, .. })
        ));
        assert!(bounds.set(0, 0.0, f64::NAN).is_err());
        assert_eq!(bounds.lower()[0], -1.0e20);
        bounds.validate()?;

        bounds.set_upper(1, f64::NAN)?;
        assert!(matches!(
            bounds.validate(),
            Err(CoreError::InvalidBounds { index: 1, .. })
        ));
        Ok(())
    }
}
