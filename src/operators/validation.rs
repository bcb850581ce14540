//! Input checks shared by the discrete operators.

use thiserror::Error;

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors raised when an operator receives arrays of the wrong shape.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum OperatorInputError {
    /// An input or output slice has the wrong length.
    #[error("{what} has length {actual}, expected {expected}")]
    LengthMismatch {
        /// Name of the offending argument.
        what: &'static str,
        /// Length required by the grid.
        expected: usize,
        /// Length supplied.
        actual: usize,
    },
}

/// Fails unless `actual == expected`.
///
/// # Errors
///
/// Returns [`OperatorInputError::LengthMismatch`] naming `what`.
#[inline]
pub const fn check_length(
    what: &'static str,
    actual: usize,
    expected: usize,
) -> Result<(), OperatorInputError> {
    if actual == expected {
        Ok(())
    } else {
        Err(OperatorInputError::LengthMismatch {
            what,
            expected,
            actual,
        })
    }
}
