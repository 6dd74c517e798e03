//! Building blocks of the augmented-Hessian Davidson iteration.
//!
//! ** NOTE: We recommend using the high-level method [`crate::solvers::augmented_hessian`]
//! instead. The submodules are public for experiments that need to inspect the
//! reduced problem directly.
//!
//! - [`subspace`]: append-only arena of trial vectors and their Hessian images.
//! - [`bordered`]: the bordered matrices `G` and `S` projected onto the subspace.
//! - [`reduced`]: the stabilized generalized eigensolver and the root-following heuristic.

pub mod bordered;
pub mod reduced;
pub mod subspace;

pub use crate::error::{AugmentedHessianError, AugmentedHessianErrorKind};
pub use bordered::BorderedSystem;
pub use reduced::{select_root, solve_bordered};
pub use subspace::Subspace;

use faer::Mat;

/// All eigenpairs of the reduced bordered problem at one micro-iteration.
#[derive(Debug, Clone)]
pub struct ReducedSpectrum {
    /// Eigenvalues in ascending order.
    pub eigenvalues: Vec<f64>,
    /// Eigenvectors as columns, in the order of `eigenvalues`. Row 0 is the border component.
    pub vectors: Mat<f64>,
    /// Number of directions of the overlap transform that survived clipping.
    pub rank: usize,
}

impl ReducedSpectrum {
    /// Dimension `k + 1` of the reduced problem.
    pub fn dim(&self) -> usize {
        self.eigenvalues.len()
    }

    /// Border ("lambda") component of eigenvector `idx`.
    pub fn border_component(&self, idx: usize) -> f64 {
        self.vectors[(0, idx)]
    }
}

/// The eigenpair chosen to represent the physical root.
#[derive(Debug, Clone, PartialEq)]
pub struct RootSelection {
    /// Column of the selected eigenvector in the [`ReducedSpectrum`].
    pub index: usize,
    /// Level shift `e`.
    pub eigenvalue: f64,
    /// `|v0|` of the selected eigenvector.
    pub lambda: f64,
    /// Subspace coefficients of the eigenvector, oriented so that its border component is `-lambda`.
    pub coefficients: Vec<f64>,
    /// Number of eigenvectors whose border component exceeded the selection threshold.
    pub candidates: usize,
}

/// Non-fatal events raised while following the root.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// Several eigenvectors passed the selection threshold; the one closest to `|v0| = 1` was followed.
    AmbiguousRoot { iteration: usize, candidates: usize },
    /// The followed root is not the lowest and has a clearly negative eigenvalue.
    NegativeCurvatureRoot {
        iteration: usize,
        index: usize,
        eigenvalue: f64,
    },
}

/// Progress of one micro-iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MicroIteration {
    pub iteration: usize,
    pub eigenvalue: f64,
    /// `(e_k - e_{k-1}) / e_k`.
    pub relative_change: f64,
    /// `sqrt(|r|² / |g|²)`.
    pub residual_norm: f64,
    pub lambda: f64,
}

/// Terminal state of a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Eigenvalue change and residual norm both fell below tolerance.
    Converged,
    /// The residual fell below the linear dependence threshold with subspace
    /// completion enabled.
    SubspaceComplete,
    /// The iteration budget ran out; the last step is returned as a best effort.
    Exhausted,
}

impl Termination {
    pub fn is_converged(self) -> bool {
        !matches!(self, Termination::Exhausted)
    }
}
