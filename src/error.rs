//! Error types for the lsq-bridge library
//!
//! Each module owns a `thiserror` enum; [`BridgeError`] wraps them for public APIs that can
//! fail in more than one layer.
//!
//! ```text
//! BridgeError
//!   ├── Core(CoreError)   formulation: indices, bounds, sparse structure
//!   └── Eval(EvalError)   user model evaluation
//! ```
//!
//! Engine-facing entry points never return these. They translate failures into a
//! [`StatusCode`](crate::engine::StatusCode) and log the cause.

use std::error::Error as StdError;

use thiserror::Error;

use crate::{callbacks::EvalError, core::CoreError};

/// Main result type used throughout the lsq-bridge library
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Top-level error of the lsq-bridge library
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Problem formulation errors
    #[error(transparent)]
    Core(#[from] CoreError),

    /// User evaluation errors
    #[error(transparent)]
    Eval(#[from] EvalError),
}

impl BridgeError {
    /// Full error chain, one cause per line.
    pub fn chain(&self) -> String {
        let mut chain = vec![self.to_string()];
        let mut source = self.source();

        while let Some(err) = source {
            chain.push(format!("  → {}", err));
            source = err.source();
        }

        chain.join("\n")
    }

    /// Single-line error chain for logging
    pub fn chain_compact(&self) -> String {
        let mut chain = vec![self.to_string()];
        let mut source = self.source();

        while let Some(err) = source {
            chain.push(err.to_string());
            source = err.source();
        }

        chain.join(" → ")
    }
}
