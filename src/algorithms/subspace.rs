//! Append-only storage for the Davidson trial vectors.
//!
//! The subspace holds two parallel sequences, the trial vectors ("guesses") and
//! their images under the orbital Hessian ("sigmas"). The index of a pair is the
//! micro-iteration that produced it. Vectors are never removed or modified once
//! appended, and every image is computed exactly once, at insertion time, because
//! the Hessian-vector product dominates the cost of the whole iteration.

use super::{AugmentedHessianError, AugmentedHessianErrorKind};
use crate::{problem::OrbitalHessian, vector::OrbitalVector};

/// Bounded arena of `(guess, sigma)` pairs.
#[derive(Debug, Clone)]
pub struct Subspace<V> {
    guesses: Vec<V>,
    sigmas: Vec<V>,
    capacity: usize,
}

impl<V: OrbitalVector> Subspace<V> {
    /// Creates an empty subspace able to hold `capacity` pairs without reallocating.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            guesses: Vec::with_capacity(capacity),
            sigmas: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Seeds an empty subspace with `initial_guess` and its Hessian image.
    ///
    /// Seeding is idempotent: on a subspace that already holds vectors this is a
    /// no-op that neither calls the operator nor stores anything, and returns `false`.
    pub fn seed<P>(&mut self, initial_guess: V, problem: &P) -> Result<bool, AugmentedHessianError>
    where
        P: OrbitalHessian<Vector = V>,
    {
        if !self.is_empty() {
            log::debug!("Subspace already seeded; ignoring repeated seed.");
            return Ok(false);
        }
        self.push(initial_guess, problem)?;
        Ok(true)
    }

    /// Appends `guess` and its Hessian image.
    pub fn extend<P>(&mut self, guess: V, problem: &P) -> Result<(), AugmentedHessianError>
    where
        P: OrbitalHessian<Vector = V>,
    {
        if self.is_empty() {
            return Err(AugmentedHessianErrorKind::InputError(
                "The subspace must be seeded before it can be extended.".to_string(),
            )
            .into());
        }
        let expected = self.guesses[0].dimension();
        if guess.dimension() != expected {
            return Err(AugmentedHessianErrorKind::DimensionMismatch {
                expected,
                actual: guess.dimension(),
            }
            .into());
        }
        self.push(guess, problem)
    }

    fn push<P>(&mut self, guess: V, problem: &P) -> Result<(), AugmentedHessianError>
    where
        P: OrbitalHessian<Vector = V>,
    {
        if self.guesses.len() == self.capacity {
            return Err(AugmentedHessianErrorKind::SubspaceExhausted {
                capacity: self.capacity,
            }
            .into());
        }

        let sigma = problem.hessian_vector_product(&guess);
        if sigma.dimension() != guess.dimension() {
            return Err(AugmentedHessianErrorKind::DimensionMismatch {
                expected: guess.dimension(),
                actual: sigma.dimension(),
            }
            .into());
        }

        self.guesses.push(guess);
        self.sigmas.push(sigma);
        Ok(())
    }

    /// Number of stored pairs, i.e. the current iteration count `k`.
    pub fn len(&self) -> usize {
        self.guesses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guesses.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn guesses(&self) -> &[V] {
        &self.guesses
    }

    pub fn sigmas(&self) -> &[V] {
        &self.sigmas
    }

    /// `Σ coefficients[i] * guesses[i]`.
    pub fn combine_guesses(&self, coefficients: &[f64]) -> V {
        combine(&self.guesses, coefficients)
    }

    /// `Σ coefficients[i] * sigmas[i]`.
    pub fn combine_sigmas(&self, coefficients: &[f64]) -> V {
        combine(&self.sigmas, coefficients)
    }
}

fn combine<V: OrbitalVector>(vectors: &[V], coefficients: &[f64]) -> V {
    assert!(
        !vectors.is_empty() && vectors.len() == coefficients.len(),
        "Expected {} coefficients for the subspace combination, got {}.",
        vectors.len(),
        coefficients.len(),
    );
    let mut out = vectors[0].clone();
    out.zero();
    for (c, v) in coefficients.iter().zip(vectors) {
        out.axpy(*c, v);
    }
    out
}
