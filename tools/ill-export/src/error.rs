//! Export error taxonomy
//!
//! Every variant is fatal to the run. Library operations return
//! [`ExportError`]; the file and CLI layers wrap it in `anyhow` with the path
//! being processed.

use ill_common::FormatError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    /// Malformed or truncated file, or data that violates a format invariant
    #[error(transparent)]
    Format(FormatError),

    /// Duplicate bone name, or a bone unknown to a fixed registry
    #[error("bone registry conflict: {0}")]
    RegistryConflict(String),

    /// A count does not fit the field the format stores it in
    #[error("{what} count {count} exceeds the format limit of {max}")]
    CapacityExceeded {
        what: &'static str,
        count: usize,
        max: usize,
    },

    /// Parent chain of a bone never reaches a root
    #[error("parent chain of bone {bone} does not terminate")]
    HierarchyCycle { bone: u16 },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl From<FormatError> for ExportError {
    fn from(err: FormatError) -> Self {
        match err {
            FormatError::TooMany { what, count, max } => {
                ExportError::CapacityExceeded { what, count, max }
            }
            other => ExportError::Format(other),
        }
    }
}

pub type Result<T, E = ExportError> = std::result::Result<T, E>;
