//! The interface the solver consumes from its host optimization object.
//!
//! An MCSCF host owns the orbital gradient and knows how to apply the orbital
//! Hessian to a trial rotation. The solver never forms the Hessian; it only asks
//! for the four quantities of [`OrbitalHessian`]. Two concrete adapters are
//! provided: [`DenseOrbitalProblem`] for an explicit Hessian matrix (small
//! systems, tests) and [`MatrixFreeProblem`] for any
//! [`faer::matrix_free::LinOp`], which covers sparse matrices and user-defined
//! operators.

use crate::{
    error::{AugmentedHessianError, AugmentedHessianErrorKind},
    vector::OrbitalVector,
};
use faer::{
    Col, Mat, MatRef, Par,
    dyn_stack::{MemBuffer, MemStack},
    matrix_free::LinOp,
};

/// Host-side collaborator for the augmented-Hessian iteration.
///
/// `hessian_vector_product` is the expensive call. The solver invokes it exactly
/// once per trial vector and never caches or repeats it.
pub trait OrbitalHessian {
    /// Vector type of the orbital-parameter space.
    type Vector: OrbitalVector;

    /// Current orbital gradient `g`.
    fn gradient(&self) -> Self::Vector;

    /// Approximate diagonal of the orbital Hessian, used to precondition residuals.
    fn diagonal_preconditioner(&self) -> Self::Vector;

    /// Initial guess for the step, typically `g ⊘ diag(H)`.
    fn approximate_step(&self) -> Self::Vector;

    /// Action of the orbital Hessian on `x`.
    fn hessian_vector_product(&self, x: &Self::Vector) -> Self::Vector;
}

fn check_dimension(expected: usize, actual: usize) -> Result<(), AugmentedHessianError> {
    if expected != actual {
        return Err(AugmentedHessianErrorKind::DimensionMismatch { expected, actual }.into());
    }
    Ok(())
}

/// `g ⊘ d`: the diagonal Newton step used as the initial guess.
fn diagonal_step(gradient: &Col<f64>, diagonal: &Col<f64>) -> Col<f64> {
    let mut step = gradient.clone();
    step.divide_elementwise(diagonal);
    step
}

/// An orbital problem with an explicitly stored, dense Hessian.
#[derive(Debug, Clone)]
pub struct DenseOrbitalProblem {
    hessian: Mat<f64>,
    gradient: Col<f64>,
    preconditioner: Col<f64>,
}

impl DenseOrbitalProblem {
    /// Builds the problem; the preconditioner defaults to the Hessian diagonal.
    pub fn new(hessian: Mat<f64>, gradient: Col<f64>) -> Result<Self, AugmentedHessianError> {
        if hessian.nrows() != hessian.ncols() {
            return Err(AugmentedHessianErrorKind::InputError(format!(
                "The orbital Hessian must be square, got {}x{}.",
                hessian.nrows(),
                hessian.ncols()
            ))
            .into());
        }
        check_dimension(hessian.nrows(), gradient.nrows())?;

        let preconditioner = Col::from_fn(hessian.nrows(), |i| hessian[(i, i)]);
        Ok(Self {
            hessian,
            gradient,
            preconditioner,
        })
    }

    /// Replaces the diagonal preconditioner.
    pub fn with_preconditioner(
        mut self,
        preconditioner: Col<f64>,
    ) -> Result<Self, AugmentedHessianError> {
        check_dimension(self.gradient.nrows(), preconditioner.nrows())?;
        self.preconditioner = preconditioner;
        Ok(self)
    }

    pub fn hessian(&self) -> MatRef<'_, f64> {
        self.hessian.as_ref()
    }
}

impl OrbitalHessian for DenseOrbitalProblem {
    type Vector = Col<f64>;

    fn gradient(&self) -> Col<f64> {
        self.gradient.clone()
    }

    fn diagonal_preconditioner(&self) -> Col<f64> {
        self.preconditioner.clone()
    }

    fn approximate_step(&self) -> Col<f64> {
        diagonal_step(&self.gradient, &self.preconditioner)
    }

    fn hessian_vector_product(&self, x: &Col<f64>) -> Col<f64> {
        assert_eq!(
            self.hessian.ncols(),
            x.nrows(),
            "Dimension mismatch: Hessian columns ({}) do not match vector rows ({}).",
            self.hessian.ncols(),
            x.nrows(),
        );
        &self.hessian * x
    }
}

/// An orbital problem whose Hessian is only available as a [`LinOp`].
///
/// The operator may parallelize internally according to `par`; the solver still
/// calls it synchronously.
pub struct MatrixFreeProblem<O> {
    operator: O,
    gradient: Col<f64>,
    diagonal: Col<f64>,
    par: Par,
}

impl<O: LinOp<f64>> MatrixFreeProblem<O> {
    /// Wraps `operator` together with the gradient and an approximate Hessian diagonal.
    pub fn new(
        operator: O,
        gradient: Col<f64>,
        diagonal: Col<f64>,
    ) -> Result<Self, AugmentedHessianError> {
        if operator.nrows() != operator.ncols() {
            return Err(AugmentedHessianErrorKind::InputError(format!(
                "The Hessian operator must be square, got {}x{}.",
                operator.nrows(),
                operator.ncols()
            ))
            .into());
        }
        check_dimension(operator.ncols(), gradient.nrows())?;
        check_dimension(operator.ncols(), diagonal.nrows())?;
        Ok(Self {
            operator,
            gradient,
            diagonal,
            par: Par::Seq,
        })
    }

    /// Sets the parallelism handed to the operator.
    pub fn with_par(mut self, par: Par) -> Self {
        self.par = par;
        self
    }
}

impl<O: LinOp<f64>> OrbitalHessian for MatrixFreeProblem<O> {
    type Vector = Col<f64>;

    fn gradient(&self) -> Col<f64> {
        self.gradient.clone()
    }

    fn diagonal_preconditioner(&self) -> Col<f64> {
        self.diagonal.clone()
    }

    fn approximate_step(&self) -> Col<f64> {
        diagonal_step(&self.gradient, &self.diagonal)
    }

    fn hessian_vector_product(&self, x: &Col<f64>) -> Col<f64> {
        // Each product gets its own scratch; the operator is called once per trial vector.
        let mut mem = MemBuffer::new(self.operator.apply_scratch(1, self.par));
        let stack = MemStack::new(&mut mem);

        let mut out = Col::<f64>::zeros(self.operator.nrows());
        self.operator
            .apply(out.as_mut().as_mat_mut(), x.as_ref().as_mat(), self.par, stack);
        out
    }
}
