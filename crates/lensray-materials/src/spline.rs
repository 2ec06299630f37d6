//! Natural cubic spline interpolation for tabulated optical constants.
//!
//! Tabulated media provide $(n, \kappa)$ at discrete wavelengths; a natural
//! cubic spline gives a smooth index with continuous dispersion
//! $dn/d\lambda$ between samples.

use crate::provider::MaterialError;

/// A natural cubic spline through `(x_i, y_i)` with strictly increasing
/// knots.
#[derive(Debug, Clone)]
pub struct CubicSpline {
    xs: Vec<f64>,
    ys: Vec<f64>,
    /// Second derivatives at the knots.
    y2s: Vec<f64>,
}

impl CubicSpline {
    /// Build a spline, validating the table.
    pub fn new(xs: Vec<f64>, ys: Vec<f64>) -> Result<Self, MaterialError> {
        if xs.len() != ys.len() {
            return Err(MaterialError::DataError(format!(
                "spline table has {} knots but {} values",
                xs.len(),
                ys.len()
            )));
        }
        if xs.len() < 2 {
            return Err(MaterialError::DataError(
                "spline table needs at least 2 points".into(),
            ));
        }
        if let Some(i) = xs.windows(2).position(|w| w[1] <= w[0]) {
            return Err(MaterialError::DataError(format!(
                "spline knots must be strictly increasing (index {})",
                i + 1
            )));
        }

        let n = xs.len();
        let mut y2s = vec![0.0; n];
        let mut u = vec![0.0; n];

        // Tridiagonal decomposition with natural end conditions (y'' = 0).
        for i in 1..n - 1 {
            let sig = (xs[i] - xs[i - 1]) / (xs[i + 1] - xs[i - 1]);
            let p = sig * y2s[i - 1] + 2.0;
            y2s[i] = (sig - 1.0) / p;
            let slope_diff = (ys[i + 1] - ys[i]) / (xs[i + 1] - xs[i])
                - (ys[i] - ys[i - 1]) / (xs[i] - xs[i - 1]);
            u[i] = (6.0 * slope_diff / (xs[i + 1] - xs[i - 1]) - sig * u[i - 1]) / p;
        }
        y2s[n - 1] = 0.0;
        for k in (1..n - 1).rev() {
            y2s[k] = y2s[k] * y2s[k + 1] + u[k];
        }

        Ok(Self { xs, ys, y2s })
    }

    /// The knot range `(first, last)`.
    pub fn domain(&self) -> (f64, f64) {
        (self.xs[0], self.xs[self.xs.len() - 1])
    }

    /// Evaluate the spline. Outside the knots the boundary cubic is
    /// extrapolated.
    pub fn evaluate(&self, x: f64) -> f64 {
        let (lo, hi, a, b, h) = self.locate(x);
        a * self.ys[lo]
            + b * self.ys[hi]
            + ((a * a * a - a) * self.y2s[lo] + (b * b * b - b) * self.y2s[hi]) * h * h / 6.0
    }

    /// First derivative of the spline.
    pub fn derivative(&self, x: f64) -> f64 {
        let (lo, hi, a, b, h) = self.locate(x);
        (self.ys[hi] - self.ys[lo]) / h
            - (3.0 * a * a - 1.0) * h * self.y2s[lo] / 6.0
            + (3.0 * b * b - 1.0) * h * self.y2s[hi] / 6.0
    }

    fn locate(&self, x: f64) -> (usize, usize, f64, f64, f64) {
        let n = self.xs.len();
        let hi = self.xs.partition_point(|&k| k <= x).clamp(1, n - 1);
        let lo = hi - 1;
        let h = self.xs[hi] - self.xs[lo];
        let a = (self.xs[hi] - x) / h;
        let b = (x - self.xs[lo]) / h;
        (lo, hi, a, b, h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_spline_passes_through_knots() {
        let xs = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let ys = vec![2.0, 3.0, 5.0, 4.0, 1.0];
        let spline = CubicSpline::new(xs.clone(), ys.clone()).unwrap();
        for (x, y) in xs.iter().zip(ys.iter()) {
            assert_abs_diff_eq!(spline.evaluate(*x), *y, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_spline_reproduces_straight_line() {
        let xs = vec![400.0, 500.0, 650.0, 800.0];
        let ys: Vec<f64> = xs.iter().map(|x| 1.5 - 1e-4 * x).collect();
        let spline = CubicSpline::new(xs, ys).unwrap();
        assert_abs_diff_eq!(spline.evaluate(575.0), 1.5 - 0.0575, epsilon = 1e-12);
        assert_abs_diff_eq!(spline.derivative(575.0), -1e-4, epsilon = 1e-12);
    }

    #[test]
    fn test_spline_rejects_bad_tables() {
        assert!(CubicSpline::new(vec![1.0], vec![1.0]).is_err());
        assert!(CubicSpline::new(vec![1.0, 2.0], vec![1.0]).is_err());
        assert!(CubicSpline::new(vec![1.0, 1.0, 2.0], vec![1.0, 2.0, 3.0]).is_err());
    }
}
