//! Run-time parameters of the augmented-Hessian iteration.
//!
//! Everything the iteration depends on is passed explicitly through
//! [`AugmentedHessianConfig`]; there is no process-wide numeric state. The
//! magnitude thresholds that steer root selection and the stabilized reduced
//! solve are named constants, exposed as fields so that tests can provoke
//! pathological conditioning on purpose.

use crate::error::{AugmentedHessianError, AugmentedHessianErrorKind};

/// Default convergence tolerance on the eigenvalue change.
pub const DEFAULT_TOLERANCE: f64 = 5e-3;

/// Default micro-iteration budget.
pub const DEFAULT_MAX_ITERATIONS: usize = 15;

/// Default relative squared residual below which the subspace counts as complete,
/// when subspace completion is enabled.
pub const DEFAULT_LINEAR_DEPENDENCE: f64 = 1e-14;

/// Singular values of the scaled Cholesky factor below `max(σ) * RANK_DEFICIENCY_RATIO`
/// are treated as rank-deficient directions.
pub const RANK_DEFICIENCY_RATIO: f64 = 1e-12;

/// Only singular values above this magnitude are inverted.
pub const MIN_INVERTIBLE_SINGULAR_VALUE: f64 = 1e-16;

/// Minimum `|v0|` for an eigenvector to count as a plausible root.
pub const ROOT_SELECTION_THRESHOLD: f64 = 0.3;

/// A selected root that is not the lowest and lies below `-NEGATIVE_CURVATURE_THRESHOLD`
/// triggers a negative-curvature diagnostic.
pub const NEGATIVE_CURVATURE_THRESHOLD: f64 = 5e-6;

/// Clipping thresholds of the stabilized generalized eigensolver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StabilizationParams {
    pub rank_deficiency_ratio: f64,
    pub min_invertible: f64,
}

impl Default for StabilizationParams {
    fn default() -> Self {
        Self {
            rank_deficiency_ratio: RANK_DEFICIENCY_RATIO,
            min_invertible: MIN_INVERTIBLE_SINGULAR_VALUE,
        }
    }
}

/// Thresholds of the root-following heuristic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootSelectionParams {
    pub threshold: f64,
    pub negative_curvature: f64,
}

impl Default for RootSelectionParams {
    fn default() -> Self {
        Self {
            threshold: ROOT_SELECTION_THRESHOLD,
            negative_curvature: NEGATIVE_CURVATURE_THRESHOLD,
        }
    }
}

/// Parameters of one call to [`crate::solvers::augmented_hessian`].
///
/// # Example
///
/// ```rust
/// use augmented_hessian::config::AugmentedHessianConfig;
///
/// let config = AugmentedHessianConfig::default()
///     .with_tolerance(1e-6)
///     .with_max_iterations(10)
///     .with_verbose(true);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AugmentedHessianConfig {
    /// Convergence threshold on the eigenvalue change; the residual threshold is its square root.
    pub tolerance: f64,
    /// Maximum number of micro-iterations (and of subspace vectors).
    pub max_iterations: usize,
    /// Relative squared residual at which the subspace counts as complete. Only
    /// consulted when `subspace_completion` is set.
    pub linear_dependence: f64,
    /// Stop with [`Termination::SubspaceComplete`](crate::algorithms::Termination::SubspaceComplete)
    /// once the residual falls below `linear_dependence`. Off by default, in which
    /// case only the eigenvalue and residual criteria end a converged run.
    pub subspace_completion: bool,
    /// Report every micro-iteration at `info` level instead of `debug`.
    pub verbose: bool,
    pub root_selection: RootSelectionParams,
    pub stabilization: StabilizationParams,
}

impl Default for AugmentedHessianConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            linear_dependence: DEFAULT_LINEAR_DEPENDENCE,
            subspace_completion: false,
            verbose: false,
            root_selection: RootSelectionParams::default(),
            stabilization: StabilizationParams::default(),
        }
    }
}

impl AugmentedHessianConfig {
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_linear_dependence(mut self, linear_dependence: f64) -> Self {
        self.linear_dependence = linear_dependence;
        self
    }

    pub fn with_subspace_completion(mut self, subspace_completion: bool) -> Self {
        self.subspace_completion = subspace_completion;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_root_selection(mut self, root_selection: RootSelectionParams) -> Self {
        self.root_selection = root_selection;
        self
    }

    pub fn with_stabilization(mut self, stabilization: StabilizationParams) -> Self {
        self.stabilization = stabilization;
        self
    }

    /// Checks that every parameter is in its admissible range.
    pub fn validate(&self) -> Result<(), AugmentedHessianError> {
        let invalid = |msg: String| -> Result<(), AugmentedHessianError> {
            Err(AugmentedHessianErrorKind::InputError(msg).into())
        };

        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return invalid(format!(
                "The tolerance must be positive and finite, got {}.",
                self.tolerance
            ));
        }
        if self.max_iterations == 0 {
            return invalid("The iteration budget `max_iterations` must be at least 1.".to_string());
        }
        if !(self.linear_dependence >= 0.0) {
            return invalid(format!(
                "The linear dependence threshold must be non-negative, got {}.",
                self.linear_dependence
            ));
        }
        if !(self.root_selection.threshold >= 0.0 && self.root_selection.threshold < 1.0) {
            return invalid(format!(
                "The root selection threshold must lie in [0, 1), got {}.",
                self.root_selection.threshold
            ));
        }
        if !(self.stabilization.rank_deficiency_ratio >= 0.0
            && self.stabilization.min_invertible >= 0.0)
        {
            return invalid("Stabilization thresholds must be non-negative.".to_string());
        }
        Ok(())
    }
}
