//! The query engine seam.
//!
//! The compiler only produces an [`Expr`] and ordering; running them is the
//! job of a [`QueryEngine`]. [`MemoryEngine`] evaluates plans over JSON rows
//! and [`SoftDelete`] wraps any engine with a deleted-row scope.

mod memory;
mod soft_delete;

use thiserror::Error;

use crate::error::FilterError;
use crate::expr::Expr;
use crate::normalizer::OrderingInstruction;

pub use memory::MemoryEngine;
pub use soft_delete::{DeletedScope, SoftDelete, DEFAULT_DELETED_FLAG};

/// Something that can run a compiled filter.
pub trait QueryEngine {
    type Row;
    type Error;

    /// Returns the rows matching `expression`, sorted by `ordering`.
    fn execute(
        &self,
        expression: &Expr,
        ordering: &[OrderingInstruction],
    ) -> Result<Vec<Self::Row>, Self::Error>;
}

/// Errors from the bundled engines.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Filter(#[from] FilterError),

    /// Row data could not be loaded.
    #[error("invalid rows: {0}")]
    InvalidRows(String),
}
