//! Long-only mean-variance optimizer.
//!
//! Solves
//!
//! ```text
//! minimize    −μᵀw + λ·wᵀΣw
//! subject to  Σᵢ wᵢ = 1,   0 ≤ wᵢ ≤ max_weight
//! ```
//!
//! where μ and Σ are the mean and sample covariance of simple returns.
//! λ = 0 is pure return maximization; large λ approaches minimum variance.
//!
//! The solver is accelerated projected gradient with adaptive restart. Each
//! step is projected exactly onto the box-and-budget polytope, so every
//! iterate is feasible and the result needs only floating-point clean-up.
//! When the objective is linear (λ = 0, or a zero covariance matrix) the
//! problem is a fractional knapsack and is solved directly.
//!
//! Invalid input and non-convergence are errors, never degenerate weights.

use log::debug;

use crate::error::{Error, Result};
use crate::history::PriceMatrix;
use crate::stats::{
    column_means, covariance_matrix, dot, mat_vec_mul, portfolio_variance, simple_returns,
    spectral_bound,
};
use crate::types::WeightVector;

/// Default risk aversion λ.
pub const DEFAULT_RISK_AVERSION: f64 = 0.5;

/// Accepted deviation of the final weights from a unit sum.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Optimizer settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OptimizerConfig {
    /// λ ≥ 0: weight of the variance penalty against expected return.
    pub risk_aversion: f64,
    /// Upper bound on any single weight, in (0, 1].
    pub max_weight: f64,
    /// Iteration cap for the iterative solver.
    pub max_iterations: usize,
    /// Stationarity tolerance on the projected-gradient step (max norm).
    pub tolerance: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            risk_aversion: DEFAULT_RISK_AVERSION,
            max_weight: 1.0,
            max_iterations: 100_000,
            tolerance: 1e-10,
        }
    }
}

impl OptimizerConfig {
    /// Config with the given λ and defaults elsewhere.
    pub fn with_risk_aversion(risk_aversion: f64) -> Self {
        Self {
            risk_aversion,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.risk_aversion.is_finite() || self.risk_aversion < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "risk_aversion must be a finite number >= 0, got {}",
                self.risk_aversion
            )));
        }
        if !(self.max_weight > 0.0 && self.max_weight <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "max_weight must be in (0.0, 1.0], got {}",
                self.max_weight
            )));
        }
        if self.max_iterations == 0 {
            return Err(Error::InvalidConfig("max_iterations must be > 0".into()));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "tolerance must be > 0, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

/// Optimal weights for a price matrix, with the moments they imply.
#[derive(Clone, Debug, PartialEq)]
pub struct Allocation {
    pub weights: WeightVector,
    /// μᵀw, per period.
    pub expected_return: f64,
    /// wᵀΣw, per period.
    pub variance: f64,
    /// Solver iterations (0 when no iteration was needed).
    pub iterations: usize,
}

/// Raw solver output, in the order of the input moments.
#[derive(Clone, Debug, PartialEq)]
pub struct Solution {
    pub weights: Vec<f64>,
    pub objective: f64,
    pub iterations: usize,
}

/// Compute target weights over exactly the symbols of `matrix`.
///
/// A single-symbol universe gets weight 1.0 without consulting the solver,
/// whatever λ and `max_weight` are.
pub fn optimize(matrix: &PriceMatrix, config: &OptimizerConfig) -> Result<Allocation> {
    config.validate()?;

    let symbols = matrix.symbols();
    if symbols.is_empty() {
        return Err(Error::EmptyUniverse);
    }

    let moments = if matrix.n_rows() >= 2 {
        let returns = simple_returns(&matrix.rows());
        if returns.iter().flatten().any(|r| !r.is_finite()) {
            return Err(Error::Optimization("non-finite returns in price matrix".into()));
        }
        Some((column_means(&returns), covariance_matrix(&returns)))
    } else {
        None
    };

    if let [only] = symbols {
        let (expected_return, variance) = match &moments {
            Some((mu, cov)) => (mu[0], cov[0][0]),
            None => (0.0, 0.0),
        };
        return Ok(Allocation {
            weights: [(*only, 1.0)].into_iter().collect(),
            expected_return,
            variance,
            iterations: 0,
        });
    }

    let Some((mu, cov)) = moments else {
        return Err(Error::InsufficientHistory(matrix.n_rows()));
    };

    let solution = solve_mean_variance(&mu, &cov, config)?;

    Ok(Allocation {
        expected_return: dot(&mu, &solution.weights),
        variance: portfolio_variance(&cov, &solution.weights),
        weights: symbols.iter().copied().zip(solution.weights).collect(),
        iterations: solution.iterations,
    })
}

/// Solve the mean-variance problem for precomputed moments.
///
/// `mu` has one entry per asset and `cov` is the matching square matrix.
pub fn solve_mean_variance(
    mu: &[f64],
    cov: &[Vec<f64>],
    config: &OptimizerConfig,
) -> Result<Solution> {
    config.validate()?;

    let n = mu.len();
    if n == 0 {
        return Err(Error::EmptyUniverse);
    }
    if cov.len() != n || cov.iter().any(|row| row.len() != n) {
        return Err(Error::Optimization(format!(
            "covariance matrix must be {n}x{n}"
        )));
    }
    if mu.iter().chain(cov.iter().flatten()).any(|x| !x.is_finite()) {
        return Err(Error::Optimization("non-finite return moments".into()));
    }

    let upper = config.max_weight;
    if (n as f64) * upper < 1.0 - 1e-12 {
        return Err(Error::Optimization(format!(
            "constraints infeasible: {n} assets capped at {upper} cannot sum to 1"
        )));
    }

    let lambda = config.risk_aversion;
    let curvature = 2.0 * lambda * spectral_bound(cov);

    let (raw, iterations) = if curvature > 0.0 {
        projected_gradient(mu, cov, lambda, curvature, config)?
    } else {
        (linear_allocation(mu, upper), 0)
    };

    let weights = finalize(raw, upper)?;
    let objective = objective(mu, cov, lambda, &weights);
    debug!("mean-variance solve: n={n} lambda={lambda} iterations={iterations} objective={objective:e}");

    Ok(Solution {
        weights,
        objective,
        iterations,
    })
}

fn objective(mu: &[f64], cov: &[Vec<f64>], lambda: f64, w: &[f64]) -> f64 {
    -dot(mu, w) + lambda * portfolio_variance(cov, w)
}

fn gradient(mu: &[f64], cov: &[Vec<f64>], lambda: f64, w: &[f64]) -> Vec<f64> {
    mat_vec_mul(cov, w)
        .into_iter()
        .zip(mu)
        .map(|(sw, m)| 2.0 * lambda * sw - m)
        .collect()
}

fn max_abs_diff(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).fold(0.0, f64::max)
}

/// Accelerated projected gradient (FISTA) with gradient-based restart.
///
/// `curvature` bounds the Lipschitz constant of the gradient, so the fixed
/// step `1 / curvature` never overshoots.
fn projected_gradient(
    mu: &[f64],
    cov: &[Vec<f64>],
    lambda: f64,
    curvature: f64,
    config: &OptimizerConfig,
) -> Result<(Vec<f64>, usize)> {
    let n = mu.len();
    let upper = config.max_weight;
    let step = 1.0 / curvature;

    let take_step = |point: &[f64]| -> Vec<f64> {
        let g = gradient(mu, cov, lambda, point);
        let moved: Vec<f64> = point.iter().zip(&g).map(|(p, gi)| p - step * gi).collect();
        project_capped_simplex(&moved, upper)
    };

    let mut w = vec![1.0 / n as f64; n];
    let mut y = w.clone();
    let mut theta = 1.0_f64;
    let mut last_step = f64::INFINITY;

    for iteration in 1..=config.max_iterations {
        let next = take_step(&y);
        last_step = max_abs_diff(&next, &w);

        // Restart momentum when it points against the descent direction.
        let restart = y
            .iter()
            .zip(&next)
            .zip(&w)
            .map(|((yi, ni), wi)| (yi - ni) * (ni - wi))
            .sum::<f64>()
            > 0.0;

        let theta_next = (1.0 + (1.0 + 4.0 * theta * theta).sqrt()) / 2.0;
        if restart {
            theta = 1.0;
            y = next.clone();
        } else {
            let beta = (theta - 1.0) / theta_next;
            y = next
                .iter()
                .zip(&w)
                .map(|(ni, wi)| ni + beta * (ni - wi))
                .collect();
            theta = theta_next;
        }
        w = next;

        if last_step <= config.tolerance {
            let residual = max_abs_diff(&take_step(&w), &w);
            if residual <= config.tolerance {
                return Ok((w, iteration));
            }
            theta = 1.0;
            y = w.clone();
        }
    }

    Err(Error::Optimization(format!(
        "did not converge after {} iterations (last step {last_step:.3e})",
        config.max_iterations
    )))
}

/// Exact solution of the linear problem: fill the highest-return assets up
/// to `upper`, splitting evenly among exact ties.
fn linear_allocation(mu: &[f64], upper: f64) -> Vec<f64> {
    let mut order: Vec<usize> = (0..mu.len()).collect();
    order.sort_by(|&a, &b| mu[b].total_cmp(&mu[a]).then(a.cmp(&b)));

    let mut w = vec![0.0; mu.len()];
    let mut remaining = 1.0_f64;
    let mut i = 0;
    while i < order.len() && remaining > 0.0 {
        let mut j = i + 1;
        while j < order.len() && mu[order[j]] == mu[order[i]] {
            j += 1;
        }
        let group = &order[i..j];
        let take = remaining.min(upper * group.len() as f64);
        for &k in group {
            w[k] = take / group.len() as f64;
        }
        remaining -= take;
        i = j;
    }
    w
}

/// Clip to bounds and renormalize; reject anything that is not a valid
/// allocation afterwards.
fn finalize(mut w: Vec<f64>, upper: f64) -> Result<Vec<f64>> {
    if w.iter().any(|x| !x.is_finite()) {
        return Err(Error::Optimization("solver produced non-finite weights".into()));
    }
    for x in &mut w {
        *x = x.clamp(0.0, upper);
    }

    let sum: f64 = w.iter().sum();
    if sum <= 0.0 {
        return Err(Error::Optimization("solver produced all-zero weights".into()));
    }
    for x in &mut w {
        *x /= sum;
    }

    let total: f64 = w.iter().sum();
    if (total - 1.0).abs() >= WEIGHT_SUM_TOLERANCE {
        return Err(Error::Optimization(format!(
            "weights sum to {total} after normalization"
        )));
    }
    Ok(w)
}

/// Euclidean projection onto `{x : 0 ≤ xᵢ ≤ upper, Σ xᵢ = 1}`.
///
/// The projection is `xᵢ = clamp(vᵢ − τ, 0, upper)` for the unique τ that
/// makes the sum 1. The sum is piecewise linear in τ with breakpoints at
/// `vᵢ` and `vᵢ − upper`, so τ is found by bisecting over sorted
/// breakpoints and interpolating on the final segment.
///
/// Requires `v.len() as f64 * upper >= 1`.
pub(crate) fn project_capped_simplex(v: &[f64], upper: f64) -> Vec<f64> {
    let mass = |tau: f64| -> f64 { v.iter().map(|x| (x - tau).clamp(0.0, upper)).sum() };

    let mut breakpoints: Vec<f64> = v.iter().flat_map(|&x| [x, x - upper]).collect();
    breakpoints.sort_by(f64::total_cmp);

    // mass(first) = n * upper >= 1 and mass(last) = 0 < 1.
    let (mut lo, mut hi) = (0, breakpoints.len() - 1);
    while hi - lo > 1 {
        let mid = (lo + hi) / 2;
        if mass(breakpoints[mid]) >= 1.0 {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    let (a, b) = (breakpoints[lo], breakpoints[hi]);
    let (ma, mb) = (mass(a), mass(b));
    let tau = if ma > mb {
        a + (ma - 1.0) * (b - a) / (ma - mb)
    } else {
        a
    };

    v.iter().map(|x| (x - tau).clamp(0.0, upper)).collect()
}
