//! Reproducible synthetic orbital problems for the experiment binaries and tests.
//!
//! Real orbital Hessians are dominated by their diagonal (orbital energy
//! differences) with weaker, short-range couplings between rotations. The
//! generators below mimic that structure: a banded symmetric matrix with a
//! growing diagonal, random off-diagonal couplings and a random gradient, all
//! drawn from a seeded [`StdRng`] so that every run is bit-identical.

use faer::{
    Col, Mat,
    sparse::{SparseColMat, SparseColMatRef, Triplet},
};
use rand::{Rng, SeedableRng, rngs::StdRng};
use thiserror::Error;

use crate::{error::AugmentedHessianError, problem::MatrixFreeProblem};

/// Errors raised while generating a synthetic problem.
#[derive(Error, Debug)]
pub enum SyntheticError {
    #[error("Invalid synthetic problem parameter: {0}")]
    InvalidParameter(String),
    /// Occurs if the sparse matrix construction fails internally.
    #[error("Internal error: Failed to construct the sparse Hessian from triplets.")]
    SparseMatrixConstructionError,
}

/// Shape of a synthetic orbital Hessian.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticParams {
    /// Number of orbital rotation parameters.
    pub dimension: usize,
    /// Number of off-diagonals on each side of the main diagonal.
    pub bandwidth: usize,
    /// Smallest diagonal element; the diagonal grows linearly from here.
    pub diagonal_min: f64,
    /// Largest diagonal element.
    pub diagonal_max: f64,
    /// Off-diagonal elements are drawn uniformly from `[-coupling, coupling]`.
    pub coupling: f64,
    /// Gradient elements are drawn uniformly from `[-gradient_scale, gradient_scale]`.
    pub gradient_scale: f64,
    /// The first `negative_modes` diagonal elements are negated.
    pub negative_modes: usize,
    pub seed: u64,
}

impl Default for SyntheticParams {
    fn default() -> Self {
        Self {
            dimension: 200,
            bandwidth: 3,
            diagonal_min: 0.5,
            diagonal_max: 20.0,
            coupling: 0.05,
            gradient_scale: 0.1,
            negative_modes: 0,
            seed: 42,
        }
    }
}

/// A generated orbital Hessian, stored both sparse and dense, with its gradient.
pub struct SyntheticOrbitalSystem {
    pub hessian: SparseColMat<usize, f64>,
    pub dense: Mat<f64>,
    pub gradient: Col<f64>,
    pub diagonal: Col<f64>,
}

impl SyntheticOrbitalSystem {
    /// Wraps the sparse Hessian as a matrix-free problem.
    pub fn problem(
        &self,
    ) -> Result<MatrixFreeProblem<SparseColMatRef<'_, usize, f64>>, AugmentedHessianError> {
        MatrixFreeProblem::new(
            self.hessian.as_ref(),
            self.gradient.clone(),
            self.diagonal.clone(),
        )
    }
}

/// Generates a banded, symmetric, diagonally dominant orbital Hessian and a gradient.
pub fn banded_orbital_system(
    params: &SyntheticParams,
) -> Result<SyntheticOrbitalSystem, SyntheticError> {
    let n = params.dimension;
    if n == 0 {
        return Err(SyntheticError::InvalidParameter(
            "dimension must be positive".to_string(),
        ));
    }
    if params.negative_modes > n {
        return Err(SyntheticError::InvalidParameter(format!(
            "{} negative modes requested for dimension {}",
            params.negative_modes, n
        )));
    }
    if !(params.diagonal_min > 0.0 && params.diagonal_max >= params.diagonal_min) {
        return Err(SyntheticError::InvalidParameter(format!(
            "diagonal range [{}, {}] must be positive and ordered",
            params.diagonal_min, params.diagonal_max
        )));
    }

    let mut rng = StdRng::seed_from_u64(params.seed);
    let span = params.diagonal_max - params.diagonal_min;
    let step = if n > 1 { span / (n - 1) as f64 } else { 0.0 };

    let mut dense = Mat::<f64>::zeros(n, n);
    for i in 0..n {
        let d = params.diagonal_min + step * i as f64;
        dense[(i, i)] = if i < params.negative_modes { -d } else { d };
    }
    for j in 0..n {
        for i in (j + 1)..n.min(j + params.bandwidth + 1) {
            let value = if params.coupling > 0.0 {
                rng.random_range(-params.coupling..params.coupling)
            } else {
                0.0
            };
            dense[(i, j)] = value;
            dense[(j, i)] = value;
        }
    }

    let mut triplets = Vec::new();
    for j in 0..n {
        for i in 0..n {
            if dense[(i, j)] != 0.0 {
                triplets.push(Triplet {
                    row: i,
                    col: j,
                    val: dense[(i, j)],
                });
            }
        }
    }
    let hessian = SparseColMat::try_new_from_triplets(n, n, &triplets)
        .map_err(|_| SyntheticError::SparseMatrixConstructionError)?;

    let gradient = Col::from_fn(n, |_| {
        params.gradient_scale * (2.0 * rng.random::<f64>() - 1.0)
    });
    let diagonal = Col::from_fn(n, |i| dense[(i, i)]);

    Ok(SyntheticOrbitalSystem {
        hessian,
        dense,
        gradient,
        diagonal,
    })
}

/// Two unit-scale vectors whose difference is a random perturbation of size `epsilon`.
///
/// Their Gram matrix has a smallest eigenvalue of order `epsilon²`, which makes
/// them a convenient stress case for the conditioning of the reduced problem.
pub fn nearly_parallel_pair(n: usize, epsilon: f64, seed: u64) -> (Col<f64>, Col<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let base = Col::from_fn(n, |_| rng.random_range(-1.0..1.0));
    let perturbed = Col::from_fn(n, |i| base[i] + epsilon * rng.random_range(-1.0..1.0));
    (base, perturbed)
}
