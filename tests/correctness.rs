//! Integration test suite to verify the correctness of the augmented-Hessian solver.
//!
//! # Test Methodology
//!
//! The solver approximates the eigenvector of the bordered matrix
//!
//! ```text
//!     A = | 0  gᵀ |
//!         | g  H  |
//! ```
//!
//! whose border component is closest to 1, and returns `step = x / v0` together with
//! the level shift `e`. For small test problems this eigenvector can be computed
//! directly by a dense eigendecomposition of `A`, which gives a ground truth:
//!
//! 1.  **Construct a Test Problem `(H, g)`:** a seeded, diagonally dominant banded
//!     Hessian and a random gradient, or a diagonal Hessian for which the level shift
//!     is the root of the secular equation `e = -Σ g_i² / (h_i - e)`.
//! 2.  **Compute the Ground Truth:** the lowest eigenpair of the dense bordered matrix.
//! 3.  **Run the Solver** through one of the adapters.
//! 4.  **Verify Accuracy** of the level shift and the step against the ground truth.
//!
//! Behavioural properties (iteration budget, root-following failures, input
//! validation, reproducibility) are tested separately.

use anyhow::{Result, anyhow, ensure};
use augmented_hessian::{
    AugmentedHessianConfig, AugmentedHessianErrorKind, AugmentedHessianOutput,
    DenseOrbitalProblem, MatrixFreeProblem, OrbitalHessian, OrbitalVector, augmented_hessian,
    algorithms::{BorderedSystem, Diagnostic, Subspace, Termination, select_root, solve_bordered},
    config::{RootSelectionParams, StabilizationParams},
    utils::synthetic::{
        SyntheticOrbitalSystem, SyntheticParams, banded_orbital_system, nearly_parallel_pair,
    },
};
use faer::{
    Col, Mat, Side,
    sparse::{SparseColMat, SparseColMatRef, Triplet},
};

/// Tolerance on the level shift against the dense ground truth.
///
/// The Rayleigh-Ritz eigenvalue error is quadratic in the eigenvector error, so a
/// converged run reproduces the level shift to near machine precision.
const LEVEL_SHIFT_TOLERANCE: f64 = 1e-8;

/// Tolerance on the relative step error `|step - step_true| / |step_true|`.
const STEP_TOLERANCE: f64 = 1e-4;

/// Lowest eigenpair of the bordered matrix, returned as `(e, x / v0)`.
fn bordered_ground_truth(hessian: &Mat<f64>, gradient: &Col<f64>) -> Result<(f64, Col<f64>)> {
    let n = gradient.nrows();
    let augmented = Mat::from_fn(n + 1, n + 1, |i, j| match (i, j) {
        (0, 0) => 0.0,
        (0, j) => gradient[j - 1],
        (i, 0) => gradient[i - 1],
        (i, j) => hessian[(i - 1, j - 1)],
    });
    let evd = augmented
        .as_ref()
        .self_adjoint_eigen(Side::Lower)
        .map_err(|e| anyhow!("EVD failed: {:?}", e))?;
    let values = evd.S();
    let vectors = evd.U();

    let mut lowest = 0;
    for k in 1..=n {
        if values[k] < values[lowest] {
            lowest = k;
        }
    }
    let v0 = vectors[(0, lowest)];
    let step = Col::from_fn(n, |i| vectors[(i + 1, lowest)] / v0);
    Ok((values[lowest], step))
}

fn relative_error(actual: &Col<f64>, expected: &Col<f64>) -> f64 {
    let mut diff = actual.clone();
    diff.axpy(-1.0, expected);
    (diff.sum_of_squares() / expected.sum_of_squares()).sqrt()
}

fn diagonal_problem(diagonal: &[f64], gradient: &[f64]) -> Result<DenseOrbitalProblem> {
    let n = diagonal.len();
    let hessian = Mat::from_fn(n, n, |i, j| if i == j { diagonal[i] } else { 0.0 });
    Ok(DenseOrbitalProblem::new(
        hessian,
        Col::from_fn(n, |i| gradient[i]),
    )?)
}

fn tridiagonal_problem(n: usize) -> Result<DenseOrbitalProblem> {
    let hessian = Mat::from_fn(n, n, |i, j| {
        if i == j {
            1.0 + 0.5 * i as f64
        } else if i.abs_diff(j) == 1 {
            -0.3
        } else {
            0.0
        }
    });
    let gradient = Col::from_fn(n, |i| 0.05 * ((i + 1) as f64).cos());
    Ok(DenseOrbitalProblem::new(hessian, gradient)?)
}

fn dense_adapter(system: &SyntheticOrbitalSystem) -> Result<DenseOrbitalProblem> {
    Ok(DenseOrbitalProblem::new(
        system.dense.clone(),
        system.gradient.clone(),
    )?)
}

fn matrix_free_adapter(
    system: &SyntheticOrbitalSystem,
) -> Result<MatrixFreeProblem<SparseColMatRef<'_, usize, f64>>> {
    Ok(system.problem()?)
}

/// A macro to generate the boilerplate for each ground-truth test.
///
/// 1. Build a seeded synthetic orbital system of dimension `n`.
/// 2. Compute the ground truth from its dense Hessian.
/// 3. Run the solver on the problem produced by `$make_problem`.
/// 4. Compare level shift and step.
macro_rules! generate_ground_truth_test {
    ($test_name:ident, $make_problem:expr, $n:expr, $seed:expr) => {
        #[test]
        fn $test_name() -> Result<()> {
            let system = banded_orbital_system(&SyntheticParams {
                dimension: $n,
                seed: $seed,
                ..Default::default()
            })?;
            let (e_true, step_true) = bordered_ground_truth(&system.dense, &system.gradient)?;

            let config = AugmentedHessianConfig::default()
                .with_tolerance(1e-12)
                .with_max_iterations(40);
            let output: AugmentedHessianOutput<Col<f64>> =
                augmented_hessian(&$make_problem(&system)?, &config)?;

            ensure!(output.converged, "no convergence: {:?}", output.termination);
            ensure!(
                (output.level_shift - e_true).abs() < LEVEL_SHIFT_TOLERANCE,
                "level shift {} differs from ground truth {}",
                output.level_shift,
                e_true
            );
            let err = relative_error(&output.step, &step_true);
            ensure!(err < STEP_TOLERANCE, "step error too high: {}", err);
            Ok(())
        }
    };
}

// --- Ground-truth tests ---

generate_ground_truth_test!(
    test_dense_adapter_matches_bordered_eigenvector,
    dense_adapter,
    60,
    7
);

generate_ground_truth_test!(
    test_matrix_free_adapter_matches_bordered_eigenvector,
    matrix_free_adapter,
    80,
    11
);

#[test]
fn test_two_dimensional_diagonal_case() -> Result<()> {
    // H = diag(2, 5), g = (1, 1), initial guess g ⊘ diag(H) = (0.5, 0.2).
    let problem = diagonal_problem(&[2.0, 5.0], &[1.0, 1.0])?;
    let config = AugmentedHessianConfig::default()
        .with_tolerance(1e-6)
        .with_max_iterations(10);
    let output = augmented_hessian(&problem, &config)?;

    ensure!(output.termination == Termination::Converged);
    ensure!(output.iterations == 3, "took {} iterations", output.iterations);

    let e = output.level_shift;
    ensure!((e + 0.568849609531507).abs() < 1e-8, "level shift {}", e);
    ensure!((output.step[0] + 0.389279308640561).abs() < 1e-8);
    ensure!((output.step[1] + 0.179570300890946).abs() < 1e-8);

    // Both eigenvectors of the first reduced problem have |v0| above 0.3.
    ensure!(
        output.diagnostics.contains(&Diagnostic::AmbiguousRoot {
            iteration: 1,
            candidates: 2
        }),
        "diagnostics: {:?}",
        output.diagnostics
    );
    ensure!(output.history.len() == output.iterations);
    ensure!(output.history.iter().all(|h| h.lambda > 0.9 && h.lambda <= 1.0));
    Ok(())
}

#[test]
fn test_block_shaped_rotation_parameters() -> Result<()> {
    /// Diagonal orbital Hessian acting on an occupied × virtual rotation block.
    struct BlockDiagonal {
        diagonal: Mat<f64>,
        gradient: Mat<f64>,
    }

    impl OrbitalHessian for BlockDiagonal {
        type Vector = Mat<f64>;

        fn gradient(&self) -> Mat<f64> {
            self.gradient.clone()
        }

        fn diagonal_preconditioner(&self) -> Mat<f64> {
            self.diagonal.clone()
        }

        fn approximate_step(&self) -> Mat<f64> {
            let mut step = self.gradient.clone();
            step.divide_elementwise(&self.diagonal);
            step
        }

        fn hessian_vector_product(&self, x: &Mat<f64>) -> Mat<f64> {
            Mat::from_fn(x.nrows(), x.ncols(), |i, j| self.diagonal[(i, j)] * x[(i, j)])
        }
    }

    let (nocc, nvir) = (3, 4);
    let problem = BlockDiagonal {
        diagonal: Mat::from_fn(nocc, nvir, |i, a| 1.0 + (4 * i + a) as f64 * 0.75),
        gradient: Mat::from_fn(nocc, nvir, |i, a| 0.1 * (1.0 + i as f64) / (1.0 + a as f64)),
    };
    let config = AugmentedHessianConfig::default()
        .with_tolerance(1e-12)
        .with_max_iterations(20);
    let output = augmented_hessian(&problem, &config)?;
    ensure!(output.converged);

    let e = output.level_shift;
    let mut secular = e;
    for a in 0..nvir {
        for i in 0..nocc {
            let (h, g) = (problem.diagonal[(i, a)], problem.gradient[(i, a)]);
            secular += g * g / (h - e);
            let expected = -g / (h - e);
            ensure!(
                (output.step[(i, a)] - expected).abs() < 1e-6,
                "step[{}, {}] = {}, expected {}",
                i,
                a,
                output.step[(i, a)],
                expected
            );
        }
    }
    ensure!(secular.abs() < 1e-9, "secular equation residual {}", secular);
    Ok(())
}

#[test]
fn test_converged_step_solves_level_shifted_newton_equation() -> Result<()> {
    let n = 30;
    let problem = tridiagonal_problem(n)?;
    let tolerance = 1e-8;
    let config = AugmentedHessianConfig::default()
        .with_tolerance(tolerance)
        .with_max_iterations(30);
    let output = augmented_hessian(&problem, &config)?;
    ensure!(output.converged);

    // (H - e) X = g with X = -step, up to the residual threshold.
    let x = Col::from_fn(n, |i| -output.step[i]);
    let mut residual = problem.hessian_vector_product(&x);
    residual.axpy(-output.level_shift, &x);
    residual.axpy(-1.0, &problem.gradient());
    let relative = (residual.sum_of_squares() / problem.gradient().sum_of_squares()).sqrt();
    ensure!(
        relative <= 2.0 * tolerance.sqrt(),
        "relative residual {} too large",
        relative
    );
    Ok(())
}

#[test]
fn test_runs_are_bit_identical() -> Result<()> {
    // Zero coupling gives a purely diagonal Hessian, D ⊙ x.
    for coupling in [0.0, 0.05] {
        let system = banded_orbital_system(&SyntheticParams {
            dimension: 50,
            coupling,
            seed: 3,
            ..Default::default()
        })?;
        let config = AugmentedHessianConfig::default().with_tolerance(1e-9);

        let first = augmented_hessian(&system.problem()?, &config)?;
        let second = augmented_hessian(&system.problem()?, &config)?;

        ensure!(first.converged == second.converged);
        ensure!(first.iterations == second.iterations);
        ensure!(first.level_shift.to_bits() == second.level_shift.to_bits());
        ensure!(first.history == second.history);
        for i in 0..50 {
            ensure!(
                first.step[i].to_bits() == second.step[i].to_bits(),
                "coupling {}: step[{}] differs",
                coupling,
                i
            );
        }
    }
    Ok(())
}

#[test]
fn test_exhausted_budget_returns_last_step() -> Result<()> {
    let problem = tridiagonal_problem(30)?;
    let config = AugmentedHessianConfig::default()
        .with_tolerance(1e-12)
        .with_max_iterations(1);
    let output = augmented_hessian(&problem, &config)?;

    ensure!(!output.converged);
    ensure!(output.termination == Termination::Exhausted);
    ensure!(output.iterations == 1);
    ensure!(output.history.len() == 1);
    ensure!(output.step.is_finite());
    // One trial vector: the step is a multiple of the initial guess, with the descent sign.
    ensure!(output.step.vector_dot(&problem.approximate_step()) < 0.0);
    Ok(())
}

#[test]
fn test_unreachable_selection_threshold_is_root_not_found() -> Result<()> {
    let problem = diagonal_problem(&[2.0, 5.0], &[1.0, 1.0])?;
    let config = AugmentedHessianConfig::default()
        .with_tolerance(1e-6)
        .with_root_selection(RootSelectionParams {
            threshold: 0.95,
            ..Default::default()
        });

    let error = augmented_hessian(&problem, &config)
        .err()
        .ok_or_else(|| anyhow!("expected a root-following failure"))?;
    ensure!(error.is_root_not_found());
    ensure!(matches!(
        error.kind(),
        AugmentedHessianErrorKind::RootNotFound { iteration: 1, .. }
    ));
    ensure!(error.to_string().contains("more converged"));
    Ok(())
}

#[test]
fn test_zero_gradient_is_an_input_error() -> Result<()> {
    let problem = diagonal_problem(&[2.0, 5.0, 7.0], &[0.0, 0.0, 0.0])?;
    let error = augmented_hessian(&problem, &AugmentedHessianConfig::default())
        .err()
        .ok_or_else(|| anyhow!("expected an input error"))?;
    ensure!(matches!(
        error.kind(),
        AugmentedHessianErrorKind::InputError(_)
    ));
    Ok(())
}

#[test]
fn test_mismatched_preconditioner_is_rejected() -> Result<()> {
    let n = 6;
    let triplets: Vec<_> = (0..n)
        .map(|i| Triplet {
            row: i,
            col: i,
            val: 1.0 + i as f64,
        })
        .collect();
    let hessian = SparseColMat::try_new_from_triplets(n, n, &triplets)
        .map_err(|e| anyhow!("sparse construction failed: {:?}", e))?;
    let result = MatrixFreeProblem::new(
        hessian.as_ref(),
        Col::from_fn(n, |_| 1.0),
        Col::from_fn(n - 1, |_| 1.0),
    );
    let error = result
        .err()
        .ok_or_else(|| anyhow!("expected a dimension mismatch"))?;
    ensure!(
        error.kind()
            == &AugmentedHessianErrorKind::DimensionMismatch {
                expected: n,
                actual: n - 1
            }
    );
    Ok(())
}

#[test]
fn test_nearly_parallel_trial_vectors_are_clipped_and_stay_finite() -> Result<()> {
    let n = 100;
    let system = banded_orbital_system(&SyntheticParams {
        dimension: n,
        ..Default::default()
    })?;
    let problem = DenseOrbitalProblem::new(system.dense.clone(), system.gradient.clone())?;
    let gradient = problem.gradient();

    // Clipping needs `σ_min / σ_max` of the scaled factor below 1e-12. For two trial
    // vectors this ratio is about `(|b1| / |b2|) * sin(angle)`, and the angle cannot
    // be resolved by the Gram matrix much below 1e-7, so the first vector is also
    // shrunk by 1e-7.
    let (mut first, second) = nearly_parallel_pair(n, 1e-7, 5);
    first.scale(1e-7);
    let mut subspace = Subspace::with_capacity(2);
    let mut bordered = BorderedSystem::new(2);
    subspace.seed(first, &problem)?;
    bordered.absorb(&subspace, &gradient);
    subspace.extend(second, &problem)?;
    bordered.absorb(&subspace, &gradient);

    let spectrum = solve_bordered(
        bordered.g(),
        bordered.s(),
        &StabilizationParams::default(),
        2,
    )?;
    ensure!(spectrum.rank == 2, "rank {}", spectrum.rank);
    ensure!(spectrum.eigenvalues.iter().all(|e| e.is_finite()));
    for j in 0..3 {
        for i in 0..3 {
            ensure!(spectrum.vectors[(i, j)].is_finite());
        }
    }

    let mut diagnostics = Vec::new();
    let root = select_root(
        &spectrum,
        &RootSelectionParams::default(),
        2,
        &mut diagnostics,
    )?;
    let coefficients: Vec<f64> = root.coefficients.iter().map(|c| c / root.lambda).collect();
    let step = subspace.combine_guesses(&coefficients);
    ensure!(step.is_finite());
    ensure!(step.sum_of_squares() > 0.0);
    Ok(())
}
