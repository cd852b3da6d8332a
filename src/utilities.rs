// Numeric interpolation substrate: log grids, bin search, cubic splines and
// Gauss-Legendre quadrature. Every table lookup goes through this module.

use crate::error::{KernelError, Result};
use serde::{Deserialize, Serialize};

/// Log-uniform grid with the cached parameters needed for O(1) bin lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogGrid {
    #[serde(with = "crate::io::flat_array")]
    energies: Vec<f64>,
    log_min: f64,
    inv_log_delta: f64,
}

impl LogGrid {
    /// Build `n` log-uniform points between the inclusive bounds `min` and `max`.
    pub fn new(min: f64, max: f64, n: usize) -> Result<Self> {
        if n < 2 {
            return Err(KernelError::invalid_grid(format!(
                "a grid needs at least 2 points, got {n}"
            )));
        }
        if !(min > 0.0 && max > min && max.is_finite()) {
            return Err(KernelError::invalid_grid(format!(
                "bounds must satisfy 0 < min < max, got [{min}, {max}]"
            )));
        }
        let log_min = min.ln();
        let delta = (max.ln() - log_min) / (n - 1) as f64;
        let mut energies: Vec<f64> = (0..n).map(|i| (log_min + i as f64 * delta).exp()).collect();
        // pin the end points so that they are exact
        energies[0] = min;
        energies[n - 1] = max;
        Ok(LogGrid {
            energies,
            log_min,
            inv_log_delta: 1.0 / delta,
        })
    }

    pub fn len(&self) -> usize {
        self.energies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.energies.is_empty()
    }

    pub fn energies(&self) -> &[f64] {
        &self.energies
    }

    pub fn min(&self) -> f64 {
        self.energies[0]
    }

    pub fn max(&self) -> f64 {
        self.energies[self.energies.len() - 1]
    }

    pub fn log_min(&self) -> f64 {
        self.log_min
    }

    pub fn inv_log_delta(&self) -> f64 {
        self.inv_log_delta
    }

    /// Lower bin index `i` with `e[i] <= exp(log_x) < e[i+1]`, clamped to `[0, n-2]`.
    #[inline]
    pub fn lower_bin(&self, log_x: f64) -> usize {
        log_bin_index(log_x, self.log_min, self.inv_log_delta, self.energies.len())
    }

    /// Spline value over this grid with separately stored second derivatives.
    #[inline]
    pub fn spline(&self, ydata: &[f64], secderiv: &[f64], x: f64, log_x: f64) -> f64 {
        get_spline_log(&self.energies, ydata, secderiv, x, log_x, self.log_min, self.inv_log_delta)
    }

    /// Spline value over this grid with interleaved `[y0, y0'', y1, y1'', ...]` storage.
    #[inline]
    pub fn spline_interleaved(&self, ydata: &[f64], x: f64, log_x: f64) -> f64 {
        get_spline_log_interleaved(&self.energies, ydata, x, log_x, self.log_min, self.inv_log_delta)
    }

    /// Check that the grid is strictly increasing and consistent with its cached parameters.
    pub fn validate(&self, name: &str) -> Result<()> {
        if self.energies.len() < 2 {
            return Err(KernelError::invalid_grid(format!(
                "{name}: fewer than 2 points"
            )));
        }
        if self.energies.windows(2).any(|w| w[1] <= w[0]) {
            return Err(KernelError::invalid_grid(format!(
                "{name}: not strictly increasing"
            )));
        }
        let expected = (self.energies.len() - 1) as f64
            / (self.max().ln() - self.energies[0].ln());
        if (expected * self.inv_log_delta.recip() - 1.0).abs() > 1.0e-6
            || (self.log_min - self.energies[0].ln()).abs() > 1.0e-9
        {
            return Err(KernelError::invalid_grid(format!(
                "{name}: cached log parameters do not match the grid"
            )));
        }
        Ok(())
    }
}

/// Fill a log-uniform grid; see [`LogGrid::new`].
pub fn fill_logarithmic_grid(min: f64, max: f64, n: usize) -> Result<LogGrid> {
    LogGrid::new(min, max, n)
}

/// O(1) lower bin index on a log-uniform grid of `n` points.
#[inline]
pub fn log_bin_index(log_x: f64, log_min: f64, inv_log_delta: f64, n: usize) -> usize {
    let upper = (n.max(2) - 2) as f64;
    ((log_x - log_min) * inv_log_delta).clamp(0.0, upper) as usize
}

/// Lower bin index `i` such that `x_data[i*step] <= x < x_data[(i+1)*step]`.
///
/// Binary search usable on any increasing grid; `step` allows the grid to be
/// interleaved with other data. The result is clamped to `[0, n-2]`.
pub fn find_lower_bin_index(x_data: &[f64], x: f64, step: usize) -> usize {
    let num = x_data.len() / step;
    if num < 2 {
        return 0;
    }
    let mut low = 0usize;
    let mut high = num - 1;
    if x < x_data[0] {
        return 0;
    }
    if x >= x_data[high * step] {
        return num - 2;
    }
    while high - low > 1 {
        let mid = (low + high) >> 1;
        if x < x_data[mid * step] {
            high = mid;
        } else {
            low = mid;
        }
    }
    low
}

/// Natural cubic spline second derivatives of `y(x)`.
pub fn prepare_spline(x: &[f64], y: &[f64]) -> Vec<f64> {
    let n = x.len();
    let mut sd = vec![0.0; n];
    if n < 3 {
        return sd;
    }
    let mut u = vec![0.0; n];
    for i in 1..n - 1 {
        let sig = (x[i] - x[i - 1]) / (x[i + 1] - x[i - 1]);
        let p = sig * sd[i - 1] + 2.0;
        sd[i] = (sig - 1.0) / p;
        let slope = (y[i + 1] - y[i]) / (x[i + 1] - x[i]) - (y[i] - y[i - 1]) / (x[i] - x[i - 1]);
        u[i] = (6.0 * slope / (x[i + 1] - x[i - 1]) - sig * u[i - 1]) / p;
    }
    sd[n - 1] = 0.0;
    for k in (0..n - 1).rev() {
        sd[k] = sd[k] * sd[k + 1] + u[k];
    }
    sd
}

/// Natural cubic spline with the values and second derivatives interleaved
/// as `[y0, y0'', y1, y1'', ...]`.
pub fn prepare_spline_interleaved(x: &[f64], y: &[f64]) -> Vec<f64> {
    let sd = prepare_spline(x, y);
    y.iter().zip(sd.iter()).flat_map(|(&v, &d)| [v, d]).collect()
}

/// Cubic spline on a single segment `[x1, x2]`.
///
/// The relative position is clamped to `[0, 1]` so that arguments outside the
/// segment return the segment boundary values.
#[inline]
pub fn spline_segment(x1: f64, x2: f64, y1: f64, y2: f64, sd1: f64, sd2: f64, x: f64) -> f64 {
    let dl = x2 - x1;
    let b = ((x - x1) / dl).clamp(0.0, 1.0);
    let c0 = (2.0 - b) * sd1;
    let c1 = (1.0 + b) * sd2;
    y1 + b * (y2 - y1) + (b * (b - 1.0)) * (c0 + c1) * (dl * dl / 6.0)
}

/// Spline value in bin `idx` (separately stored second derivatives).
#[inline]
pub fn get_spline(x_data: &[f64], y_data: &[f64], secderiv: &[f64], x: f64, idx: usize) -> f64 {
    spline_segment(
        x_data[idx],
        x_data[idx + 1],
        y_data[idx],
        y_data[idx + 1],
        secderiv[idx],
        secderiv[idx + 1],
        x,
    )
}

/// Spline value in bin `idx` with interleaved `(y, y'')` storage.
#[inline]
pub fn get_spline_interleaved(x_data: &[f64], y_data: &[f64], x: f64, idx: usize) -> f64 {
    let i = 2 * idx;
    spline_segment(
        x_data[idx],
        x_data[idx + 1],
        y_data[i],
        y_data[i + 2],
        y_data[i + 1],
        y_data[i + 3],
        x,
    )
}

/// Spline value in bin `idx` with `(x, y, y'')` triplet storage.
#[inline]
pub fn get_spline_xyz(data: &[f64], x: f64, idx: usize) -> f64 {
    let i = 3 * idx;
    spline_segment(
        data[i],
        data[i + 3],
        data[i + 1],
        data[i + 4],
        data[i + 2],
        data[i + 5],
        x,
    )
}

/// Spline over a log-uniform grid with separately stored second derivatives.
#[inline]
pub fn get_spline_log(
    x_data: &[f64],
    y_data: &[f64],
    secderiv: &[f64],
    x: f64,
    log_x: f64,
    log_min: f64,
    inv_log_delta: f64,
) -> f64 {
    let n = x_data.len();
    let xv = x.clamp(x_data[0], x_data[n - 1]);
    let idx = log_bin_index(log_x, log_min, inv_log_delta, n);
    get_spline(x_data, y_data, secderiv, xv, idx)
}

/// Spline over a log-uniform grid with interleaved `(y, y'')` storage.
#[inline]
pub fn get_spline_log_interleaved(
    x_data: &[f64],
    y_data: &[f64],
    x: f64,
    log_x: f64,
    log_min: f64,
    inv_log_delta: f64,
) -> f64 {
    let n = x_data.len();
    let xv = x.clamp(x_data[0], x_data[n - 1]);
    let idx = log_bin_index(log_x, log_min, inv_log_delta, n);
    get_spline_interleaved(x_data, y_data, xv, idx)
}

/// Spline over a log-uniform grid stored as `(x, y, y'')` triplets.
#[inline]
pub fn get_spline_log_xyz(data: &[f64], x: f64, log_x: f64, log_min: f64, inv_log_delta: f64) -> f64 {
    let n = data.len() / 3;
    let xv = x.clamp(data[0], data[3 * (n - 1)]);
    let idx = log_bin_index(log_x, log_min, inv_log_delta, n);
    get_spline_xyz(data, xv, idx)
}

/// Gauss-Legendre abscissas and weights for `n` points on `[min, max]`.
pub fn gl_integral(n: usize, min: f64, max: f64) -> (Vec<f64>, Vec<f64>) {
    const EPS: f64 = 1.0e-15;
    let mut abscissas = vec![0.0; n];
    let mut weights = vec![0.0; n];
    let xm = 0.5 * (max + min);
    let xl = 0.5 * (max - min);
    let m = (n + 1) / 2;
    for i in 0..m {
        // Newton iteration from the Chebyshev-like initial guess
        let mut z = (std::f64::consts::PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
        let mut pp;
        loop {
            let mut p1 = 1.0;
            let mut p2 = 0.0;
            for j in 0..n {
                let p3 = p2;
                p2 = p1;
                p1 = ((2 * j + 1) as f64 * z * p2 - j as f64 * p3) / (j + 1) as f64;
            }
            pp = n as f64 * (z * p1 - p2) / (z * z - 1.0);
            let z1 = z;
            z = z1 - p1 / pp;
            if (z - z1).abs() <= EPS {
                break;
            }
        }
        abscissas[i] = xm - xl * z;
        abscissas[n - 1 - i] = xm + xl * z;
        weights[i] = 2.0 * xl / ((1.0 - z * z) * pp * pp);
        weights[n - 1 - i] = weights[i];
    }
    (abscissas, weights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_log_grid_endpoints_and_spacing() {
        let grid = LogGrid::new(1.0e-3, 1.0e5, 81).unwrap();
        assert_eq!(grid.len(), 81);
        assert_eq!(grid.min(), 1.0e-3);
        assert_eq!(grid.max(), 1.0e5);
        let ratio = grid.energies()[1] / grid.energies()[0];
        for w in grid.energies().windows(2) {
            assert!((w[1] / w[0] / ratio - 1.0).abs() < 1.0e-10);
        }
        assert!(grid.validate("test").is_ok());
    }

    #[test]
    fn test_log_grid_rejects_bad_bounds() {
        assert!(LogGrid::new(0.0, 1.0, 10).is_err());
        assert!(LogGrid::new(2.0, 1.0, 10).is_err());
        assert!(LogGrid::new(1.0, 2.0, 1).is_err());
    }

    #[test]
    fn test_log_grid_bin_round_trip() {
        let grid = LogGrid::new(1.0e-4, 1.0e8, 85).unwrap();
        let e = grid.energies();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..10000 {
            let x = (e[0].ln() + rng.gen::<f64>() * (e[84].ln() - e[0].ln())).exp();
            let i = grid.lower_bin(x.ln());
            // allow the last ulp at the bin edge
            assert!(e[i] <= x * (1.0 + 1.0e-12) && x < e[i + 1] * (1.0 + 1.0e-12));
            let j = find_lower_bin_index(e, x, 1);
            assert!(i == j || (x / e[i.max(j)] - 1.0).abs() < 1.0e-12);
        }
        assert_eq!(grid.lower_bin(e[0].ln()), 0);
        assert_eq!(grid.lower_bin(e[84].ln()), 83);
        assert_eq!(grid.lower_bin(-100.0), 0);
        assert_eq!(grid.lower_bin(100.0), 83);
    }

    #[test]
    fn test_find_lower_bin_index_arbitrary_grid() {
        let x = [0.0, 0.5, 2.0, 3.0, 10.0];
        assert_eq!(find_lower_bin_index(&x, 0.0, 1), 0);
        assert_eq!(find_lower_bin_index(&x, 0.7, 1), 1);
        assert_eq!(find_lower_bin_index(&x, 2.0, 1), 2);
        assert_eq!(find_lower_bin_index(&x, 9.99, 1), 3);
        assert_eq!(find_lower_bin_index(&x, 10.0, 1), 3);
        assert_eq!(find_lower_bin_index(&x, -1.0, 1), 0);
        // interleaved with one extra value per node
        let xy = [0.0, 9.0, 0.5, 9.0, 2.0, 9.0, 3.0, 9.0];
        assert_eq!(find_lower_bin_index(&xy, 2.5, 2), 2);
    }

    #[test]
    fn test_spline_reproduces_nodes() {
        let grid = LogGrid::new(1.0e-2, 1.0e3, 51).unwrap();
        let x = grid.energies();
        let y: Vec<f64> = x.iter().map(|&v| v.sqrt() * (1.0 + 0.1 * v.ln())).collect();
        let sd = prepare_spline(x, &y);
        let yy = prepare_spline_interleaved(x, &y);
        for (i, &xi) in x.iter().enumerate() {
            let a = grid.spline(&y, &sd, xi, xi.ln());
            let b = grid.spline_interleaved(&yy, xi, xi.ln());
            assert!((a / y[i] - 1.0).abs() < 1.0e-12, "node {i}: {a} vs {}", y[i]);
            assert!((b / y[i] - 1.0).abs() < 1.0e-12);
        }
    }

    #[test]
    fn test_spline_first_derivative_continuity() {
        let x: Vec<f64> = (0..21).map(|i| i as f64 * 0.25).collect();
        let y: Vec<f64> = x.iter().map(|v| v.sin()).collect();
        let sd = prepare_spline(&x, &y);
        let h = 1.0e-7;
        for i in 1..x.len() - 1 {
            let left = (get_spline(&x, &y, &sd, x[i], i - 1)
                - get_spline(&x, &y, &sd, x[i] - h, i - 1))
                / h;
            let right = (get_spline(&x, &y, &sd, x[i] + h, i) - get_spline(&x, &y, &sd, x[i], i)) / h;
            assert!((left - right).abs() < 1.0e-5, "node {i}: {left} vs {right}");
        }
    }

    #[test]
    fn test_spline_clamps_outside_grid() {
        let grid = LogGrid::new(1.0, 100.0, 11).unwrap();
        let y: Vec<f64> = grid.energies().iter().map(|v| v * v).collect();
        let sd = prepare_spline(grid.energies(), &y);
        assert_eq!(grid.spline(&y, &sd, 0.1, 0.1f64.ln()), 1.0);
        assert!((grid.spline(&y, &sd, 1.0e3, 1.0e3f64.ln()) - 1.0e4).abs() < 1.0e-9);
    }

    #[test]
    fn test_spline_xyz_triplets() {
        let grid = LogGrid::new(1.0, 1.0e4, 41).unwrap();
        let x = grid.energies();
        let y: Vec<f64> = x.iter().map(|v| v.ln()).collect();
        let sd = prepare_spline(x, &y);
        let data: Vec<f64> = (0..x.len()).flat_map(|i| [x[i], y[i], sd[i]]).collect();
        let e = 37.0f64;
        let v = get_spline_log_xyz(&data, e, e.ln(), grid.log_min(), grid.inv_log_delta());
        assert!((v - e.ln()).abs() < 1.0e-4);
    }

    #[test]
    fn test_gl_integral_exact_for_polynomials() {
        let (x, w) = gl_integral(8, 1.0, 3.0);
        let integral: f64 = x.iter().zip(w.iter()).map(|(xi, wi)| wi * xi.powi(5)).sum();
        // (3^6 - 1) / 6
        assert!((integral - 728.0 / 6.0).abs() < 1.0e-10);
        let sum_w: f64 = w.iter().sum();
        assert!((sum_w - 2.0).abs() < 1.0e-13);
    }
}
