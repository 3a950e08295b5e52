//! Inversion engine errors.

use thiserror::Error;

/// Errors that can occur during an inversion.
///
/// Only structural failures are errors: inconsistent input sizes and
/// matrices that cannot be factorised. Convergence-related outcomes are
/// reported through [`RetrievalStatus`](crate::solvers::RetrievalStatus)
/// so batch callers can keep processing the remaining cases.
#[derive(Error, Debug)]
pub enum OemError {
    /// Input sizes inconsistent, detected before any numerical work
    #[error("dimension mismatch for {quantity}: expected {expected}, got {actual}")]
    DimensionMismatch {
        quantity: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A covariance or normal-equations matrix could not be factorised
    #[error("singular matrix encountered while factorising {matrix}")]
    SingularMatrix { matrix: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_mismatch_display() {
        let err = OemError::DimensionMismatch {
            quantity: "rows of K",
            expected: 4,
            actual: 3,
        };
        assert_eq!(
            format!("{}", err),
            "dimension mismatch for rows of K: expected 4, got 3"
        );
    }

    #[test]
    fn test_singular_matrix_display() {
        let err = OemError::SingularMatrix { matrix: "Sa" };
        assert_eq!(
            format!("{}", err),
            "singular matrix encountered while factorising Sa"
        );
    }
}
