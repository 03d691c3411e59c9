//! Return statistics for the optimizer.
//!
//! Matrices are row-major `&[Vec<f64>]`: one row per period, one column per
//! asset. Callers are expected to pass rectangular, finite input; the
//! optimizer checks this before calling in.

// ---------------------------------------------------------------------------
// Returns
// ---------------------------------------------------------------------------

/// Simple period-over-period returns, `p[t] / p[t-1] - 1`.
///
/// The first row has no predecessor and is dropped, so `n` price rows give
/// `n - 1` return rows.
pub fn simple_returns(prices: &[Vec<f64>]) -> Vec<Vec<f64>> {
    prices
        .windows(2)
        .map(|w| {
            w[1].iter()
                .zip(&w[0])
                .map(|(now, prev)| now / prev - 1.0)
                .collect()
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Moments
// ---------------------------------------------------------------------------

/// Per-column arithmetic mean.
pub fn column_means(matrix: &[Vec<f64>]) -> Vec<f64> {
    let Some(first) = matrix.first() else {
        return Vec::new();
    };
    let rows = matrix.len() as f64;

    let mut sums = vec![0.0; first.len()];
    for row in matrix {
        for (s, v) in sums.iter_mut().zip(row) {
            *s += *v;
        }
    }

    sums.into_iter().map(|s| s / rows).collect()
}

/// Sample covariance matrix (denominator `rows - 1`).
///
/// With a single row the denominator is clamped to 1, which yields an
/// all-zero matrix instead of NaN.
pub fn covariance_matrix(matrix: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let Some(first) = matrix.first() else {
        return Vec::new();
    };
    let cols = first.len();
    let means = column_means(matrix);

    let mut cov = vec![vec![0.0; cols]; cols];

    for row in matrix {
        for i in 0..cols {
            let di = row[i] - means[i];
            for j in i..cols {
                cov[i][j] += di * (row[j] - means[j]);
            }
        }
    }

    let denom = (matrix.len() as f64 - 1.0).max(1.0);
    for i in 0..cols {
        for j in i..cols {
            let v = cov[i][j] / denom;
            cov[i][j] = v;
            cov[j][i] = v;
        }
    }

    cov
}

// ---------------------------------------------------------------------------
// Linear algebra helpers
// ---------------------------------------------------------------------------

pub fn mat_vec_mul(matrix: &[Vec<f64>], v: &[f64]) -> Vec<f64> {
    matrix.iter().map(|row| dot(row, v)).collect()
}

pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Quadratic form `wᵀ Σ w`.
pub fn portfolio_variance(cov: &[Vec<f64>], w: &[f64]) -> f64 {
    dot(w, &mat_vec_mul(cov, w))
}

/// Upper bound on the largest eigenvalue of a symmetric matrix
/// (Gershgorin: max absolute row sum).
pub fn spectral_bound(matrix: &[Vec<f64>]) -> f64 {
    matrix
        .iter()
        .map(|row| row.iter().map(|x| x.abs()).sum::<f64>())
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-12, "{a} != {b}");
    }

    #[test]
    fn returns_drop_first_row() {
        let prices = vec![vec![100.0, 50.0], vec![110.0, 50.0], vec![99.0, 55.0]];
        let r = simple_returns(&prices);
        assert_eq!(r.len(), 2);
        assert_close(r[0][0], 0.10);
        assert_close(r[0][1], 0.0);
        assert_close(r[1][0], -0.10);
        assert_close(r[1][1], 0.10);
    }

    #[test]
    fn returns_of_single_row_are_empty() {
        assert!(simple_returns(&[vec![1.0, 2.0]]).is_empty());
        assert!(simple_returns(&[]).is_empty());
    }

    #[test]
    fn means() {
        let m = column_means(&[vec![1.0, 10.0], vec![3.0, 20.0]]);
        assert_eq!(m, vec![2.0, 15.0]);
        assert!(column_means(&[]).is_empty());
    }

    #[test]
    fn sample_covariance_uses_n_minus_one() {
        // x = [1, 2, 3], y = [2, 4, 6]: var(x) = 1, var(y) = 4, cov = 2
        let m = vec![vec![1.0, 2.0], vec![2.0, 4.0], vec![3.0, 6.0]];
        let c = covariance_matrix(&m);
        assert_close(c[0][0], 1.0);
        assert_close(c[1][1], 4.0);
        assert_close(c[0][1], 2.0);
        assert_close(c[1][0], 2.0);
    }

    #[test]
    fn single_row_covariance_is_zero() {
        let c = covariance_matrix(&[vec![0.01, -0.02]]);
        assert_eq!(c, vec![vec![0.0, 0.0], vec![0.0, 0.0]]);
    }

    #[test]
    fn quadratic_form() {
        let cov = vec![vec![0.04, 0.0], vec![0.0, 0.01]];
        assert_close(portfolio_variance(&cov, &[0.5, 0.5]), 0.0125);
    }

    #[test]
    fn gershgorin_bound() {
        let m = vec![vec![2.0, -1.0], vec![-1.0, 2.0]];
        assert_close(spectral_bound(&m), 3.0);
        assert_close(spectral_bound(&[]), 0.0);
    }
}
