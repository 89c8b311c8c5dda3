//! Ordinary least squares with an intercept.
//!
//! Features are centered before forming the normal equations, which keeps
//! the system well conditioned when feature means are far from zero. The
//! K x K system is solved by Gaussian elimination with partial pivoting.

use thiserror::Error;

/// Relative pivot threshold below which the system is treated as singular.
const SINGULAR_TOLERANCE: f64 = 1e-10;

/// Errors returned by [`fit_ols`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OlsError {
    #[error("feature rows ({rows}) and targets ({targets}) differ in length")]
    DimensionMismatch { rows: usize, targets: usize },

    #[error("{n} observations cannot determine {required} parameters")]
    TooFewObservations { n: usize, required: usize },

    #[error("non-finite value in observation {index}")]
    NonFinite { index: usize },

    #[error("normal equations are singular (collinear or constant features)")]
    Singular,
}

/// A fitted linear model `y = intercept + sum(coefficients[i] * x[i])`.
#[derive(Debug, Clone, PartialEq)]
pub struct OlsFit<const K: usize> {
    pub intercept: f64,
    pub coefficients: [f64; K],
    /// In-sample residuals `y - y_hat`, in observation order.
    pub residuals: Vec<f64>,
    /// Residual sum of squares.
    pub rss: f64,
}

impl<const K: usize> OlsFit<K> {
    /// Evaluate the fitted model at `x`.
    pub fn predict(&self, x: &[f64; K]) -> f64 {
        let mut y = self.intercept;
        for i in 0..K {
            y += self.coefficients[i] * x[i];
        }
        y
    }

    /// Residual standard error `sqrt(rss / (n - K - 1))`. Zero when the fit
    /// has no residual degrees of freedom.
    pub fn residual_std_error(&self) -> f64 {
        let n = self.residuals.len();
        if n <= K + 1 {
            return 0.0;
        }
        (self.rss / (n - K - 1) as f64).sqrt()
    }
}

/// Fit `ys ~ 1 + xs` by least squares.
pub fn fit_ols<const K: usize>(xs: &[[f64; K]], ys: &[f64]) -> Result<OlsFit<K>, OlsError> {
    let n = xs.len();
    if ys.len() != n {
        return Err(OlsError::DimensionMismatch {
            rows: n,
            targets: ys.len(),
        });
    }
    if n < K + 1 {
        return Err(OlsError::TooFewObservations {
            n,
            required: K + 1,
        });
    }
    for (index, (x, y)) in xs.iter().zip(ys).enumerate() {
        if !y.is_finite() || x.iter().any(|v| !v.is_finite()) {
            return Err(OlsError::NonFinite { index });
        }
    }

    let inv_n = 1.0 / n as f64;
    let mut x_mean = [0.0; K];
    for x in xs {
        for i in 0..K {
            x_mean[i] += x[i] * inv_n;
        }
    }
    let y_mean = ys.iter().sum::<f64>() * inv_n;

    // Centered normal equations: (Xc'Xc) beta = Xc'yc
    let mut a = [[0.0; K]; K];
    let mut b = [0.0; K];
    for (x, &y) in xs.iter().zip(ys) {
        let yc = y - y_mean;
        for i in 0..K {
            let xi = x[i] - x_mean[i];
            b[i] += xi * yc;
            for j in i..K {
                a[i][j] += xi * (x[j] - x_mean[j]);
            }
        }
    }
    for i in 0..K {
        for j in 0..i {
            a[i][j] = a[j][i];
        }
    }

    let coefficients = solve(a, b)?;
    let mut intercept = y_mean;
    for i in 0..K {
        intercept -= coefficients[i] * x_mean[i];
    }

    let mut fit = OlsFit {
        intercept,
        coefficients,
        residuals: Vec::with_capacity(n),
        rss: 0.0,
    };
    for (x, &y) in xs.iter().zip(ys) {
        let r = y - fit.predict(x);
        fit.rss += r * r;
        fit.residuals.push(r);
    }
    Ok(fit)
}

/// Solve `a * x = b` in place.
fn solve<const K: usize>(mut a: [[f64; K]; K], mut b: [f64; K]) -> Result<[f64; K], OlsError> {
    let scale = (0..K).map(|i| a[i][i].abs()).fold(0.0, f64::max);
    if scale == 0.0 {
        return Err(OlsError::Singular);
    }
    let tol = scale * SINGULAR_TOLERANCE;

    for col in 0..K {
        let mut pivot = col;
        for row in (col + 1)..K {
            if a[row][col].abs() > a[pivot][col].abs() {
                pivot = row;
            }
        }
        if a[pivot][col].abs() <= tol {
            return Err(OlsError::Singular);
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in (col + 1)..K {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..K {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = [0.0; K];
    for row in (0..K).rev() {
        let mut acc = b[row];
        for k in (row + 1)..K {
            acc -= a[row][k] * x[k];
        }
        x[row] = acc / a[row][row];
    }
    Ok(x)
}
