//! Stabilized solution of the reduced bordered eigenproblem and root following.
//!
//! The reduced problem `G v = e S v` is small (at most `max_iter + 2`) but badly
//! conditioned: `S` is the Gram matrix of the Davidson trial vectors, which drift
//! towards linear dependence as the subspace grows. Inverting `S`, or its
//! Cholesky factor, directly divides by near-zero pivots.
//!
//! [`solve_bordered`] therefore works with a symmetrically rescaled Cholesky
//! factor and a clipped pseudo-inverse:
//!
//! 1. `S = L Lᵀ`;
//! 2. `T = D L D` with `D = diag(L)^(-1/2)`, which has unit diagonal;
//! 3. `T = U Σ Vᵀ`; singular values below `max(σ) * rank_deficiency_ratio` are zeroed
//!    and only those above `min_invertible` are inverted;
//! 4. `L⁺ = D (V Σ⁺ Uᵀ) D`, which equals `L⁻¹` whenever nothing was clipped;
//! 5. the standard symmetric problem `L⁺ G L⁺ᵀ y = e y` is solved and mapped
//!    back with `v = L⁺ᵀ y`.
//!
//! [`select_root`] then picks the eigenvector that represents the physical step:
//! the one whose border component is closest to 1 in magnitude.

use super::{AugmentedHessianError, AugmentedHessianErrorKind, Diagnostic, ReducedSpectrum, RootSelection};
use crate::config::{RootSelectionParams, StabilizationParams};
use faer::{Col, Mat, MatRef, Side};

/// Solves `G v = e S v` on the given (leading) blocks.
///
/// `iteration` is only used to label errors.
///
/// # Returns
/// All `dim` eigenpairs in ascending eigenvalue order, together with the rank
/// retained by the pseudo-inverse.
pub fn solve_bordered(
    g: MatRef<'_, f64>,
    s: MatRef<'_, f64>,
    params: &StabilizationParams,
    iteration: usize,
) -> Result<ReducedSpectrum, AugmentedHessianError> {
    let n = s.nrows();
    assert!(
        n == s.ncols() && g.nrows() == n && g.ncols() == n,
        "Reduced matrices must be square and of equal size, got G {}x{} and S {}x{}.",
        g.nrows(),
        g.ncols(),
        s.nrows(),
        s.ncols(),
    );

    // --- Cholesky factor and its diagonal rescaling ---
    let llt = s
        .llt(Side::Lower)
        .map_err(|e| AugmentedHessianErrorKind::Factorization {
            iteration,
            details: format!("{e:?}"),
        })?;
    let l = llt.L();
    let d = Col::from_fn(n, |i| l[(i, i)].powf(-0.5));
    let t = Mat::from_fn(n, n, |i, j| if i >= j { l[(i, j)] * d[i] * d[j] } else { 0.0 });

    // --- Clipped pseudo-inverse of T ---
    let svd = t
        .svd()
        .map_err(|e| AugmentedHessianErrorKind::SvdError(format!("{e:?}")))?;
    let sigma = svd.S();
    let largest = (0..n).map(|i| sigma[i].abs()).fold(0.0_f64, f64::max);
    let cutoff = largest * params.rank_deficiency_ratio;
    let sigma_inv = Col::from_fn(n, |i| {
        let value = if sigma[i].abs() < cutoff { 0.0 } else { sigma[i] };
        if value.abs() > params.min_invertible {
            1.0 / value
        } else {
            0.0
        }
    });
    let rank = (0..n).filter(|&i| sigma_inv[i] != 0.0).count();
    if rank < n {
        log::debug!(
            "Micro-iteration {iteration}: overlap transform clipped to rank {rank} of {n}."
        );
    }

    let t_pinv = svd.V() * sigma_inv.as_diagonal() * svd.U().transpose();
    let inv_l = d.as_diagonal() * &t_pinv * d.as_diagonal();

    // --- Standard symmetric problem in the orthonormalized basis ---
    let projected = inv_l.as_ref() * g * inv_l.transpose();
    let evd = projected
        .as_ref()
        .self_adjoint_eigen(Side::Lower)
        .map_err(AugmentedHessianErrorKind::EvdError)?;
    let values = evd.S();
    let rotated = inv_l.transpose() * evd.U();

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    let eigenvalues = order.iter().map(|&k| values[k]).collect();
    let vectors = Mat::from_fn(n, n, |i, j| rotated[(i, order[j])]);

    Ok(ReducedSpectrum {
        eigenvalues,
        vectors,
        rank,
    })
}

/// Chooses the eigenpair that follows the physical root.
///
/// An eigenvector is a *candidate* when `|v0| > params.threshold`. With no
/// candidates the call fails with `RootNotFound`. Otherwise the eigenvector
/// minimizing `|1 - |v0||` over the whole spectrum is chosen; ambiguous and
/// negative-curvature situations are appended to `diagnostics` and logged.
///
/// The selected vector is oriented so that its border component is `-|v0|`.
/// With that orientation, `X = Σ (c_i / λ) b_i` solves `(H - e) X = g` within the
/// subspace, independently of the sign returned by the eigensolver.
pub fn select_root(
    spectrum: &ReducedSpectrum,
    params: &RootSelectionParams,
    iteration: usize,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<RootSelection, AugmentedHessianError> {
    let n = spectrum.dim();
    let border: Vec<f64> = (0..n).map(|idx| spectrum.border_component(idx).abs()).collect();

    let candidates = border.iter().filter(|b| **b > params.threshold).count();
    if candidates == 0 {
        let largest_lambda = border.iter().copied().fold(0.0_f64, f64::max);
        return Err(AugmentedHessianErrorKind::RootNotFound {
            iteration,
            largest_lambda,
        }
        .into());
    }
    if candidates > 1 {
        log::warn!(
            "Micro-iteration {iteration}: {candidates} eigenvectors could be followed; \
             following the one closest to lambda = 1."
        );
        diagnostics.push(Diagnostic::AmbiguousRoot {
            iteration,
            candidates,
        });
    }

    let mut index = 0;
    for idx in 1..n {
        if (1.0 - border[idx]).abs() < (1.0 - border[index]).abs() {
            index = idx;
        }
    }

    let eigenvalue = spectrum.eigenvalues[index];
    if index > 0 && eigenvalue < -params.negative_curvature {
        log::warn!(
            "Micro-iteration {iteration}: following root {index} with negative eigenvalue {eigenvalue:.6e}."
        );
        diagnostics.push(Diagnostic::NegativeCurvatureRoot {
            iteration,
            index,
            eigenvalue,
        });
    }

    let lambda = border[index];
    let orientation = if spectrum.border_component(index) > 0.0 {
        -1.0
    } else {
        1.0
    };
    let coefficients = (1..n)
        .map(|i| orientation * spectrum.vectors[(i, index)])
        .collect();

    Ok(RootSelection {
        index,
        eigenvalue,
        lambda,
        coefficients,
        candidates,
    })
}
