// Error types for table construction, loading and configuration.
//
// The transport kernel itself never fails: numeric edge cases are clamped
// and sampling degeneracies fall back to documented defaults. Errors only
// arise while building, validating or persisting the read-only tables.

use thiserror::Error;

/// Main error type for `emkernel` setup operations.
#[derive(Error, Debug)]
pub enum KernelError {
    /// A particle kind the kernel does not transport
    #[error("Unknown particle: {0}")]
    UnknownParticle(String),

    /// A configuration parameter outside its allowed range
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// A flat table whose length disagrees with its declared size
    #[error("Table size mismatch in {table}: expected {expected} values, found {found}")]
    TableSize {
        table: String,
        expected: usize,
        found: usize,
    },

    /// An energy grid that is not strictly increasing or not log-uniform
    #[error("Invalid grid: {0}")]
    InvalidGrid(String),

    /// Material lookup failures
    #[error("Unknown material: {0}")]
    UnknownMaterial(String),

    /// Element lookup failures
    #[error("Unknown element: {0}")]
    UnknownElement(String),

    /// File system errors
    #[error("File system error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for `emkernel` setup operations.
pub type Result<T> = std::result::Result<T, KernelError>;

impl KernelError {
    /// Creates a new invalid-parameter error.
    #[must_use]
    pub fn invalid_parameter<S: Into<String>>(name: &'static str, reason: S) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    /// Creates a new table-size error.
    #[must_use]
    pub fn table_size<S: Into<String>>(table: S, expected: usize, found: usize) -> Self {
        Self::TableSize {
            table: table.into(),
            expected,
            found,
        }
    }

    /// Creates a new grid error.
    #[must_use]
    pub fn invalid_grid<S: Into<String>>(msg: S) -> Self {
        Self::InvalidGrid(msg.into())
    }
}

/// Checks that a flat buffer holds exactly `expected` values.
pub(crate) fn check_len(table: &str, data: &[f64], expected: usize) -> Result<()> {
    if data.len() != expected {
        return Err(KernelError::table_size(table, expected, data.len()));
    }
    Ok(())
}
