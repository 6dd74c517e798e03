//! This module provides the high-level API of the crate: one call that runs the
//! augmented-Hessian Davidson iteration to completion and returns the orbital step.

use crate::{
    algorithms::{
        BorderedSystem, Diagnostic, MicroIteration, Subspace, Termination, select_root,
        solve_bordered,
    },
    config::AugmentedHessianConfig,
    error::{AugmentedHessianError, AugmentedHessianErrorKind},
    problem::OrbitalHessian,
    vector::OrbitalVector,
};
use log::Level;

/// Result of a successful [`augmented_hessian`] call.
#[derive(Debug, Clone)]
pub struct AugmentedHessianOutput<V> {
    /// `true` unless the iteration budget ran out.
    pub converged: bool,
    /// Number of micro-iterations performed (equal to the number of Hessian products).
    pub iterations: usize,
    /// The orbital step `-X`, a level-shifted approximation of `-H⁻¹ g`.
    pub step: V,
    /// Eigenvalue `e` of the followed root.
    pub level_shift: f64,
    pub termination: Termination,
    /// One record per micro-iteration, in order.
    pub history: Vec<MicroIteration>,
    /// Non-fatal events raised during root following.
    pub diagnostics: Vec<Diagnostic>,
}

/// Computes an orbital step with the augmented-Hessian Davidson method.
///
/// Solves the bordered eigenproblem
///
/// ```text
/// | 0  gᵀ | | v0 |       | v0 |
/// | g  H  | | x  |  = e  | x  |
/// ```
///
/// in a subspace grown from `problem.approximate_step()` by preconditioned
/// residuals, following the eigenvector whose border component `|v0|` is closest
/// to 1. The Hessian is only accessed through
/// [`OrbitalHessian::hessian_vector_product`], once per micro-iteration.
///
/// # Arguments
/// * `problem`: Host object providing the gradient, the diagonal preconditioner,
///   the initial guess and the Hessian action.
/// * `config`: Tolerances, iteration budget and thresholds.
///
/// # Returns
/// An [`AugmentedHessianOutput`] whose `step` is `-X`. Running out of iterations is
/// not an error: the last step is returned with `converged = false`.
///
/// # Errors
/// * `InputError` for an invalid configuration, a zero gradient or a zero initial guess.
/// * `DimensionMismatch` if the collaborator's vectors disagree in dimension.
/// * `RootNotFound` if no eigenvector of the reduced problem resembles the physical root.
/// * `Factorization`, `SvdError`, `EvdError` for failures of the small dense decompositions.
/// * `NonFiniteDirection` if the preconditioner is singular at the current level shift.
pub fn augmented_hessian<P>(
    problem: &P,
    config: &AugmentedHessianConfig,
) -> Result<AugmentedHessianOutput<P::Vector>, AugmentedHessianError>
where
    P: OrbitalHessian,
{
    config.validate()?;

    // --- Inputs from the host ---
    let gradient = problem.gradient();
    let preconditioner = problem.diagonal_preconditioner();
    let initial_guess = problem.approximate_step();

    let n = gradient.dimension();
    for actual in [preconditioner.dimension(), initial_guess.dimension()] {
        if actual != n {
            return Err(AugmentedHessianErrorKind::DimensionMismatch {
                expected: n,
                actual,
            }
            .into());
        }
    }

    let gradient_ssq = gradient.sum_of_squares();
    if gradient_ssq == 0.0 {
        return Err(AugmentedHessianErrorKind::InputError(
            "The orbital gradient is zero; there is no step to compute.".to_string(),
        )
        .into());
    }
    if initial_guess.sum_of_squares() == 0.0 {
        return Err(AugmentedHessianErrorKind::InputError(
            "The approximate step used to seed the subspace is zero.".to_string(),
        )
        .into());
    }

    let level = if config.verbose {
        Level::Info
    } else {
        Level::Debug
    };
    let tolerance = config.tolerance;
    let residual_tolerance = tolerance.sqrt();

    log::log!(
        level,
        "Augmented Hessian: dimension {n}, tolerance {tolerance:.1e}, max {} micro-iterations",
        config.max_iterations
    );
    log::log!(level, "AH microiter {:>18} {:>10} {:>10}", "eigenvalue", "rel. diff", "residual");

    // --- Iteration state ---
    let mut subspace = Subspace::with_capacity(config.max_iterations + 1);
    let mut bordered = BorderedSystem::new(config.max_iterations);
    let mut history = Vec::with_capacity(config.max_iterations);
    let mut diagnostics = Vec::new();

    subspace.seed(initial_guess, problem)?;

    let mut old_val = 0.0;
    let mut iteration = 0;
    let (mut step, level_shift, termination) = loop {
        iteration += 1;
        bordered.absorb(&subspace, &gradient);

        // --- Reduced problem and root following ---
        let spectrum = solve_bordered(
            bordered.g(),
            bordered.s(),
            &config.stabilization,
            iteration,
        )?;
        let root = select_root(
            &spectrum,
            &config.root_selection,
            iteration,
            &mut diagnostics,
        )?;
        let eigenvalue = root.eigenvalue;
        let lambda = root.lambda;

        // --- Step and residual ---
        // X = Σ (c_i / λ) b_i
        let step_coefficients: Vec<f64> = root.coefficients.iter().map(|c| c / lambda).collect();
        let step = subspace.combine_guesses(&step_coefficients);

        // r = Σ c_i σ_i - λ g - (e λ) X = λ ((H - e) X - g)
        let mut residual = subspace.combine_sigmas(&root.coefficients);
        residual.axpy(-lambda, &gradient);
        residual.axpy(-eigenvalue * lambda, &step);

        let wlast = old_val;
        let diff = eigenvalue - old_val;
        old_val = eigenvalue;
        let relative_ssq = residual.sum_of_squares() / gradient_ssq;
        let residual_norm = relative_ssq.sqrt();
        let relative_change = if eigenvalue != 0.0 {
            diff / eigenvalue
        } else {
            diff
        };

        log::log!(
            level,
            "AH microiter {iteration:2} {eigenvalue:18.12e} {relative_change:10.4e} {residual_norm:10.4e}"
        );
        history.push(MicroIteration {
            iteration,
            eigenvalue,
            relative_change,
            residual_norm,
            lambda,
        });

        // --- Stopping criteria ---
        if (old_val - wlast).abs() < tolerance && residual_norm < residual_tolerance {
            break (step, eigenvalue, Termination::Converged);
        }
        if config.subspace_completion && relative_ssq < config.linear_dependence {
            log::debug!(
                "Micro-iteration {iteration}: relative residual {relative_ssq:.3e} below the \
                 linear dependence threshold; the subspace is complete."
            );
            break (step, eigenvalue, Termination::SubspaceComplete);
        }
        if iteration == config.max_iterations {
            break (step, eigenvalue, Termination::Exhausted);
        }

        // --- Preconditioned expansion ---
        let mut shifted = preconditioner.clone();
        shifted.shift(-eigenvalue);
        residual.divide_elementwise(&shifted);
        if !residual.is_finite() {
            return Err(AugmentedHessianErrorKind::NonFiniteDirection { iteration }.into());
        }
        subspace.extend(residual, problem)?;
    };

    let converged = termination.is_converged();
    if converged {
        log::log!(
            level,
            "Augmented Hessian converged in {iteration} micro-iterations ({termination:?}), level shift {level_shift:.8e}"
        );
    } else {
        log::warn!(
            "Augmented Hessian did not converge in {iteration} micro-iterations; returning the last step."
        );
    }

    step.scale(-1.0);

    Ok(AugmentedHessianOutput {
        converged,
        iterations: iteration,
        step,
        level_shift,
        termination,
        history,
        diagnostics,
    })
}
