//! Augmented-Hessian Davidson solver for orbital optimization steps.
//!
//! This crate computes the orbital rotation step of a multi-configuration SCF
//! macro-iteration by solving the augmented (bordered) eigenvalue problem
//!
//! ```text
//! | 0  gᵀ | | v0 |       | v0 |
//! | g  H  | | x  |  = e  | x  |
//! ```
//!
//! where `g` is the orbital gradient and `H` the orbital Hessian. The selected
//! eigenvector gives the step `-x / v0` and its eigenvalue `e` acts as a level
//! shift, so that the step approximates `-(H - e)⁻¹ g` and stays bounded even when
//! `H` is not positive definite.
//!
//! The Hessian is never formed. The solver only needs Hessian-vector products,
//! supplied by the host through the [`problem::OrbitalHessian`] trait, and calls
//! them once per micro-iteration.
//!
//! ## Algorithm
//!
//! Each micro-iteration:
//! - projects the newest trial vector into the small bordered matrices `G` and `S`;
//! - solves `G v = e S v` with a stabilized transform (Cholesky factor, rescaled and
//!   pseudo-inverted with clipping) that tolerates nearly dependent trial vectors;
//! - follows the eigenvector whose border component is closest to 1, which is not
//!   necessarily the lowest one;
//! - rebuilds the step and residual, checks convergence, and expands the subspace
//!   with the diagonally preconditioned residual.
//!
//! ## Example Usage
//!
//! ```rust
//! use augmented_hessian::{AugmentedHessianConfig, DenseOrbitalProblem, augmented_hessian};
//! use faer::{Col, mat};
//!
//! let hessian = mat![[2.0, 0.0], [0.0, 5.0]];
//! let gradient = Col::from_fn(2, |_| 1.0);
//! let problem = DenseOrbitalProblem::new(hessian, gradient).unwrap();
//!
//! let config = AugmentedHessianConfig::default()
//!     .with_tolerance(1e-6)
//!     .with_max_iterations(10);
//! let output = augmented_hessian(&problem, &config).unwrap();
//!
//! assert!(output.converged);
//! // The step is a level-shifted Newton step: same signs as -H⁻¹g, shorter.
//! assert!(output.step[0] < 0.0 && output.step[0] > -0.5);
//! assert!(output.step[1] < 0.0 && output.step[1] > -0.2);
//! assert!(output.level_shift < 0.0);
//! ```

pub mod algorithms;
pub mod config;
pub mod error;
pub mod problem;
pub mod solvers;
pub mod utils;
pub mod vector;

pub use config::AugmentedHessianConfig;
pub use error::{AugmentedHessianError, AugmentedHessianErrorKind};
pub use problem::{DenseOrbitalProblem, MatrixFreeProblem, OrbitalHessian};
pub use solvers::{AugmentedHessianOutput, augmented_hessian};
pub use vector::OrbitalVector;
