//! This module defines the custom error types for the library.
//!
//! Every fatal condition that can arise while solving the augmented-Hessian
//! problem is collected into a single enum, [`AugmentedHessianErrorKind`], and
//! exposed through the [`AugmentedHessianError`] newtype.
//!
//! Using the [`thiserror`] crate keeps the boilerplate minimal. Note that
//! [`faer::linalg::evd::EvdError`] does not implement the standard
//! [`std::error::Error`] trait, so we wrap it manually. The Cholesky and SVD
//! failures are carried as their formatted description.
//!
//! Non-fatal conditions (ambiguous roots, negative-curvature roots, running out
//! of iterations) are *not* errors; they are reported through
//! [`crate::algorithms::Diagnostic`] values and the `converged` flag.
use thiserror::Error;

/// Represents all possible errors that can occur during an augmented-Hessian solve.
#[derive(Error, Debug)]
#[error(transparent)]
pub struct AugmentedHessianError(#[from] AugmentedHessianErrorKind);

impl AugmentedHessianError {
    /// Returns the underlying error kind, e.g. to tell a missing root apart from
    /// a numerical failure.
    pub fn kind(&self) -> &AugmentedHessianErrorKind {
        &self.0
    }

    /// `true` when no eigenvector of the reduced problem looked like the physical root.
    pub fn is_root_not_found(&self) -> bool {
        matches!(self.0, AugmentedHessianErrorKind::RootNotFound { .. })
    }
}

/// The distinct kinds of errors.
#[derive(Error, Debug, PartialEq)]
pub enum AugmentedHessianErrorKind {
    /// No eigenvector of the reduced problem has a border component above the
    /// selection threshold. The caller should retry from a better starting point.
    #[error(
        "Augmented Hessian: could not find the correct root at micro-iteration {iteration} \
         (largest |lambda| = {largest_lambda:.3e}). \
         Try starting the augmented Hessian solver when the wavefunction is more converged."
    )]
    RootNotFound { iteration: usize, largest_lambda: f64 },

    /// The Cholesky factorization of the subspace overlap `S` failed, which means the
    /// trial vectors became linearly dependent beyond what the stabilization can absorb.
    #[error("Cholesky factorization of the subspace overlap failed at micro-iteration {iteration}: {details}")]
    Factorization { iteration: usize, details: String },

    /// Wraps an error originating from [`faer`]'s self-adjoint eigendecomposition.
    #[error("A numerical error occurred during the eigendecomposition of the reduced problem: {0:?}")]
    EvdError(faer::linalg::evd::EvdError),

    /// The singular value decomposition of the scaled Cholesky factor failed.
    #[error("A numerical error occurred during the SVD of the scaled Cholesky factor: {0}")]
    SvdError(String),

    /// The collaborator returned vectors of inconsistent dimensions.
    #[error("Dimension mismatch: expected a vector of dimension {expected}, got {actual}.")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Indicates that an invalid input parameter was provided to a function.
    #[error("Invalid input parameter: {0}")]
    InputError(String),

    /// The subspace arena is full.
    #[error("Subspace capacity of {capacity} trial vectors is exhausted.")]
    SubspaceExhausted { capacity: usize },

    /// Dividing the residual by `preconditioner - eigenvalue` produced NaN or infinity.
    #[error(
        "The preconditioned search direction at micro-iteration {iteration} is not finite; \
         the preconditioner is singular at the current level shift."
    )]
    NonFiniteDirection { iteration: usize },
}

// Manually implement PartialEq for the public error type.
// We compare the inner `AugmentedHessianErrorKind`.
impl PartialEq for AugmentedHessianError {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
