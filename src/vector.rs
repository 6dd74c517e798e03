//! This module defines the vector abstraction over the orbital-parameter space.
//!
//! The augmented-Hessian iteration never looks at individual orbital rotation
//! parameters. Everything it needs from a vector is a handful of BLAS-1 style
//! primitives: inner products, linear combinations, and an elementwise division
//! for preconditioning. Depending on the [`OrbitalVector`] trait instead of a
//! concrete type lets the same solver run on a flat rotation vector
//! ([`faer::Col`]) or on a matrix-shaped occupied × virtual rotation block
//! ([`faer::Mat`]), which is how MCSCF hosts usually store rotations.

use faer::{Col, Mat, unzip, zip};

/// A vector in orbital-parameter space.
///
/// `Clone` provides the deep copy. All binary operations expect both operands to
/// have the same [`dimension`](OrbitalVector::dimension) and panic otherwise, in
/// the same way a dimension mismatch panics inside a matrix product.
pub trait OrbitalVector: Clone {
    /// Total number of rotation parameters.
    fn dimension(&self) -> usize;

    /// Euclidean inner product with `other`.
    fn vector_dot(&self, other: &Self) -> f64;

    /// `self *= alpha`.
    fn scale(&mut self, alpha: f64);

    /// `self += alpha * x`.
    fn axpy(&mut self, alpha: f64, x: &Self);

    /// Sets every element to zero.
    fn zero(&mut self);

    /// Adds `value` to every element.
    fn shift(&mut self, value: f64);

    /// `self[i] /= denominator[i]` for every element. No guard against small
    /// denominators is applied.
    fn divide_elementwise(&mut self, denominator: &Self);

    /// Squared Euclidean norm.
    fn sum_of_squares(&self) -> f64 {
        self.vector_dot(self)
    }

    /// `true` when no element is NaN or infinite.
    fn is_finite(&self) -> bool;
}

#[inline]
fn assert_same_dimension(lhs: usize, rhs: usize) {
    assert_eq!(
        lhs, rhs,
        "Dimension mismatch: orbital vectors have dimensions {} and {}.",
        lhs, rhs,
    );
}

/// Flat rotation vector.
impl OrbitalVector for Col<f64> {
    #[inline]
    fn dimension(&self) -> usize {
        self.nrows()
    }

    fn vector_dot(&self, other: &Self) -> f64 {
        assert_same_dimension(self.nrows(), other.nrows());
        self.as_ref().transpose() * other.as_ref()
    }

    fn scale(&mut self, alpha: f64) {
        zip!(self.as_mut()).for_each(|unzip!(y)| *y *= alpha);
    }

    fn axpy(&mut self, alpha: f64, x: &Self) {
        assert_same_dimension(self.nrows(), x.nrows());
        zip!(self.as_mut(), x.as_ref()).for_each(|unzip!(y, xi)| *y += alpha * *xi);
    }

    fn zero(&mut self) {
        self.fill(0.0);
    }

    fn shift(&mut self, value: f64) {
        zip!(self.as_mut()).for_each(|unzip!(y)| *y += value);
    }

    fn divide_elementwise(&mut self, denominator: &Self) {
        assert_same_dimension(self.nrows(), denominator.nrows());
        zip!(self.as_mut(), denominator.as_ref()).for_each(|unzip!(y, d)| *y /= *d);
    }

    fn sum_of_squares(&self) -> f64 {
        self.squared_norm_l2()
    }

    fn is_finite(&self) -> bool {
        self.is_all_finite()
    }
}

/// Matrix-shaped rotation block. Operations are elementwise over all entries, so
/// the inner product is the Frobenius inner product.
impl OrbitalVector for Mat<f64> {
    #[inline]
    fn dimension(&self) -> usize {
        self.nrows() * self.ncols()
    }

    fn vector_dot(&self, other: &Self) -> f64 {
        assert_same_shape(self, other);
        let mut acc = 0.0;
        zip!(self.as_ref(), other.as_ref()).for_each(|unzip!(a, b)| acc += *a * *b);
        acc
    }

    fn scale(&mut self, alpha: f64) {
        zip!(self.as_mut()).for_each(|unzip!(y)| *y *= alpha);
    }

    fn axpy(&mut self, alpha: f64, x: &Self) {
        assert_same_shape(self, x);
        zip!(self.as_mut(), x.as_ref()).for_each(|unzip!(y, xi)| *y += alpha * *xi);
    }

    fn zero(&mut self) {
        self.fill(0.0);
    }

    fn shift(&mut self, value: f64) {
        zip!(self.as_mut()).for_each(|unzip!(y)| *y += value);
    }

    fn divide_elementwise(&mut self, denominator: &Self) {
        assert_same_shape(self, denominator);
        zip!(self.as_mut(), denominator.as_ref()).for_each(|unzip!(y, d)| *y /= *d);
    }

    fn sum_of_squares(&self) -> f64 {
        self.squared_norm_l2()
    }

    fn is_finite(&self) -> bool {
        self.is_all_finite()
    }
}

// Two blocks with equal element counts but different shapes are still a mismatch.
fn assert_same_shape(lhs: &Mat<f64>, rhs: &Mat<f64>) {
    assert!(
        lhs.nrows() == rhs.nrows() && lhs.ncols() == rhs.ncols(),
        "Shape mismatch: rotation blocks are {}x{} and {}x{}.",
        lhs.nrows(),
        lhs.ncols(),
        rhs.nrows(),
        rhs.ncols(),
    );
}
