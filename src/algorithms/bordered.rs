//! The bordered matrices of the augmented-Hessian eigenproblem.
//!
//! Projected onto the subspace spanned by the trial vectors `b_1 … b_k`, the
//! augmented Hessian becomes the pair
//!
//! ```text
//!     G = | 0        g·b_1      …  g·b_k     |      S = | 1  0          …  0          |
//!         | g·b_1    b_1·Hb_1   …  b_1·Hb_k  |          | 0  b_1·b_1    …  b_1·b_k    |
//!         | …        …          …  …         |          | …  …          …  …          |
//!         | g·b_k    b_k·Hb_1   …  b_k·Hb_k  |          | 0  b_k·b_1    …  b_k·b_k    |
//! ```
//!
//! Both are stored at their maximum size `(max_iter + 2)²` up front and only the
//! leading `(k + 1)²` block is meaningful. Each micro-iteration adds one
//! column, computed once and mirrored into the corresponding row, so both blocks
//! are exactly symmetric regardless of round-off in the Hessian images.

use super::Subspace;
use crate::vector::OrbitalVector;
use faer::{Mat, MatRef};

/// Dense storage for `G` and `S`.
#[derive(Debug, Clone)]
pub struct BorderedSystem {
    g: Mat<f64>,
    s: Mat<f64>,
    dim: usize,
}

impl BorderedSystem {
    /// Allocates both matrices for at most `max_iterations` absorbed trial vectors.
    ///
    /// `S` starts as the identity so that the border entry `S[0,0]` is 1.
    pub fn new(max_iterations: usize) -> Self {
        let size = max_iterations + 2;
        Self {
            g: Mat::zeros(size, size),
            s: Mat::from_fn(size, size, |i, j| if i == j { 1.0 } else { 0.0 }),
            dim: 1,
        }
    }

    /// Projects the newest trial vector of `subspace` into column/row `k = subspace.len()`.
    ///
    /// Must be called exactly once after each seed/extension.
    ///
    /// # Panics
    ///
    /// Panics if the subspace did not grow by exactly one pair since the last call, or
    /// if it outgrew the allocated size.
    pub fn absorb<V: OrbitalVector>(&mut self, subspace: &Subspace<V>, gradient: &V) -> usize {
        let k = subspace.len();
        assert_eq!(
            k, self.dim,
            "Bordered system holds {} trial vectors but the subspace has {}.",
            self.dim - 1,
            k,
        );
        assert!(
            k < self.g.nrows(),
            "Bordered system of size {} cannot absorb trial vector {}.",
            self.g.nrows(),
            k,
        );

        let guesses = subspace.guesses();
        let sigmas = subspace.sigmas();
        let latest = &guesses[k - 1];

        self.g[(0, k)] = latest.vector_dot(gradient);
        for i in 0..k {
            self.g[(i + 1, k)] = latest.vector_dot(&sigmas[i]);
            self.s[(i + 1, k)] = latest.vector_dot(&guesses[i]);
        }

        for j in 0..=k {
            self.g[(k, j)] = self.g[(j, k)];
            self.s[(k, j)] = self.s[(j, k)];
        }

        self.dim = k + 1;
        k
    }

    /// Size `k + 1` of the meaningful leading block.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Leading block of `G`.
    pub fn g(&self) -> MatRef<'_, f64> {
        self.g.as_ref().get(0..self.dim, 0..self.dim)
    }

    /// Leading block of `S`.
    pub fn s(&self) -> MatRef<'_, f64> {
        self.s.as_ref().get(0..self.dim, 0..self.dim)
    }
}
