//! Sparse derivative structure declaration and validation.
//!
//! A [`SparseStructure`] is the pair of equal-length index sequences (`rows`, `cols`) that the
//! engine uses to interpret a flat vector of derivative values: entry `k` of the value vector
//! is the partial derivative at `(rows[k], cols[k])`.
//!
//! For a least-squares Jacobian, rows are residual indices and columns are variable indices.
//! For a general formulation, rows are constraint indices. Hessian structures use variable
//! indices on both axes and only declare the upper triangle.
//!
//! # Dense Ordering
//!
//! The dense default enumerates every `(row, col)` pair with linear position
//! `row * num_cols + col`, i.e. row-major by residual, contiguous by variable. The engine relies
//! on this position contract, so it must not change:
//!
//! ```text
//! n = 3 variables, m = 2 residuals
//!
//! position:  0      1      2      3      4      5
//! (row,col): (0,0)  (0,1)  (0,2)  (1,0)  (1,1)  (1,2)
//! ```
//!
//! # Example
//!
//! ```
//! use lsq_bridge::core::structure::SparseStructure;
//! # use lsq_bridge::core::CoreResult;
//! # fn example() -> CoreResult<()> {
//!
//! let structure = SparseStructure::dense(2, 3)?;
//! assert_eq!(structure.nnz(), 6);
//! assert_eq!(structure.rows(), &[0, 0, 0, 1, 1, 1]);
//! assert_eq!(structure.cols(), &[0, 1, 2, 0, 1, 2]);
//! structure.validate(2, 3)?;
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

use faer::sparse::{Argsort, Pair, SparseColMat, SymbolicSparseColMat, Triplet};
use tracing::warn;

use crate::core::{CoreError, CoreResult, slot_mut};

/// Symbolic pattern of a declared structure, ready to receive numerical values.
///
/// - `pattern`: compressed column pattern (duplicates merged)
/// - `order`: maps the declaration order of entries onto the compressed storage
/// - `entries`: number of declared entries, before merging
pub struct SymbolicStructure {
    pub pattern: SymbolicSparseColMat<usize>,
    pub order: Argsort<usize>,
    pub entries: usize,
}

impl SymbolicStructure {
    /// Fill the pattern with values given in declaration order.
    pub fn fill(&self, values: &[f64]) -> CoreResult<SparseColMat<usize, f64>> {
        if values.len() != self.entries {
            return Err(CoreError::DimensionMismatch(format!(
                "expected {} values, got {}",
                self.entries,
                values.len()
            ))
            .log());
        }
        SparseColMat::new_from_argsort(self.pattern.clone(), &self.order, values).map_err(|e| {
            CoreError::SymbolicStructure("Failed to create sparse matrix from argsort".to_string())
                .log_with_source(e)
        })
    }
}

/// How a formulation declares its Jacobian at construction.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum JacobianLayout {
    /// Every entry, in the dense position order
    #[default]
    Dense,
    /// `nnz` entries to be filled by position or replaced in bulk
    Sparse { nnz: usize },
}

impl JacobianLayout {
    pub fn build(self, num_rows: usize, num_cols: usize) -> CoreResult<SparseStructure> {
        match self {
            JacobianLayout::Dense => SparseStructure::dense(num_rows, num_cols),
            JacobianLayout::Sparse { nnz } => Ok(SparseStructure::with_nnz(nnz)),
        }
    }
}

/// Nonzero positions of a sparse derivative matrix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SparseStructure {
    rows: Vec<usize>,
    cols: Vec<usize>,
}

impl SparseStructure {
    /// Allocate `nnz` entries, all at `(0, 0)`, to be filled by position.
    pub fn with_nnz(nnz: usize) -> Self {
        Self {
            rows: vec![0; nnz],
            cols: vec![0; nnz],
        }
    }

    /// Every `(row, col)` pair at position `row * num_cols + col`.
    pub fn dense(num_rows: usize, num_cols: usize) -> CoreResult<Self> {
        let nnz = num_rows.checked_mul(num_cols).ok_or_else(|| {
            CoreError::InvalidInput(format!(
                "dense structure {num_rows} x {num_cols} overflows"
            ))
            .log()
        })?;
        let mut structure = Self::with_nnz(nnz);
        for col in 0..num_cols {
            for row in 0..num_rows {
                let position = row * num_cols + col;
                structure.rows[position] = row;
                structure.cols[position] = col;
            }
        }
        Ok(structure)
    }

    /// Upper triangle (`row <= col`) of an `n x n` matrix, row-major.
    pub fn dense_upper_triangle(n: usize) -> Self {
        let (rows, cols) = (0..n)
            .flat_map(|row| (row..n).map(move |col| (row, col)))
            .unzip();
        Self { rows, cols }
    }

    /// Number of declared entries. This is the length of the row sequence; a structure whose
    /// sequences disagree in length fails [`validate`](Self::validate).
    pub fn nnz(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    pub fn cols(&self) -> &[usize] {
        &self.cols
    }

    pub fn set_row(&mut self, position: usize, row: usize) -> CoreResult<()> {
        *slot_mut(&mut self.rows, position, "structure rows")? = row;
        Ok(())
    }

    pub fn set_col(&mut self, position: usize, col: usize) -> CoreResult<()> {
        *slot_mut(&mut self.cols, position, "structure cols")? = col;
        Ok(())
    }

    /// Replace the whole row sequence.
    pub fn set_rows(&mut self, rows: Vec<usize>) {
        self.rows = rows;
        self.warn_on_length_mismatch();
    }

    /// Replace the whole column sequence.
    pub fn set_cols(&mut self, cols: Vec<usize>) {
        self.cols = cols;
        self.warn_on_length_mismatch();
    }

    /// Replace both sequences together.
    pub fn set_entries(&mut self, rows: Vec<usize>, cols: Vec<usize>) -> CoreResult<()> {
        if rows.len() != cols.len() {
            return Err(CoreError::DimensionMismatch(format!(
                "{} rows vs {} cols",
                rows.len(),
                cols.len()
            ))
            .log());
        }
        self.rows = rows;
        self.cols = cols;
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.rows.iter().copied().zip(self.cols.iter().copied())
    }

    /// Equal lengths, every row in `[0, num_rows)`, every column in `[0, num_cols)`.
    pub fn validate(&self, num_rows: usize, num_cols: usize) -> CoreResult<()> {
        if self.rows.len() != self.cols.len() {
            return Err(CoreError::DimensionMismatch(format!(
                "structure has {} rows but {} cols",
                self.rows.len(),
                self.cols.len()
            ))
            .log());
        }
        if let Some((k, (row, col))) = self
            .iter()
            .enumerate()
            .find(|(_, (row, col))| *row >= num_rows || *col >= num_cols)
        {
            return Err(CoreError::SymbolicStructure(format!(
                "entry {k} at ({row}, {col}) outside {num_rows} x {num_cols}"
            ))
            .log());
        }
        Ok(())
    }

    /// Hessian structures declare the upper triangle only.
    pub fn validate_upper_triangular(&self, n: usize) -> CoreResult<()> {
        self.validate(n, n)?;
        if let Some((k, (row, col))) = self.iter().enumerate().find(|(_, (row, col))| row > col) {
            return Err(CoreError::SymbolicStructure(format!(
                "entry {k} at ({row}, {col}) lies below the diagonal"
            ))
            .log());
        }
        Ok(())
    }

    /// Build the faer symbolic pattern after validating against the matrix shape.
    pub fn to_symbolic(&self, num_rows: usize, num_cols: usize) -> CoreResult<SymbolicStructure> {
        self.validate(num_rows, num_cols)?;
        let indices: Vec<Pair<usize, usize>> =
            self.iter().map(|(row, col)| Pair::new(row, col)).collect();

        let (pattern, order) =
            SymbolicSparseColMat::try_new_from_indices(num_rows, num_cols, &indices).map_err(
                |e| {
                    CoreError::SymbolicStructure(
                        "Failed to build symbolic sparse matrix structure".to_string(),
                    )
                    .log_with_source(e)
                },
            )?;

        Ok(SymbolicStructure {
            pattern,
            order,
            entries: indices.len(),
        })
    }

    /// Assemble a sparse matrix from values given in declaration order. Duplicate positions
    /// are summed.
    pub fn assemble(
        &self,
        num_rows: usize,
        num_cols: usize,
        values: &[f64],
    ) -> CoreResult<SparseColMat<usize, f64>> {
        self.validate(num_rows, num_cols)?;
        if values.len() != self.nnz() {
            return Err(CoreError::DimensionMismatch(format!(
                "expected {} values, got {}",
                self.nnz(),
                values.len()
            ))
            .log());
        }
        let triplets: Vec<Triplet<usize, usize, f64>> = self
            .iter()
            .zip(values)
            .map(|((row, col), &value)| Triplet::new(row, col, value))
            .collect();

        SparseColMat::try_new_from_triplets(num_rows, num_cols, &triplets).map_err(|e| {
            CoreError::SymbolicStructure("Failed to assemble sparse matrix".to_string())
                .log_with_source(e)
        })
    }

    fn warn_on_length_mismatch(&self) {
        if self.rows.len() != self.cols.len() {
            warn!(
                "structure rows ({}) and cols ({}) differ in length until both are replaced",
                self.rows.len(),
                self.cols.len()
            );
        }
    }
}
