// Element selectors: cumulative per-element probabilities on a log energy grid

use crate::error::{KernelError, Result};
use crate::utilities::{log_bin_index, LogGrid};
use serde::{Deserialize, Serialize};

const HEADER_LEN: usize = 3;

/// Flat store of element selectors, one entry per material-cut (or per
/// material for the conversion selector).
///
/// Each entry starts with `[n_energies, ln E_min, 1/dlnE]` followed, for every
/// energy node, by the cumulative probabilities of the first `n_elem - 1`
/// elements. Single-element materials have no entry (start index -1).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementSelectors {
    #[serde(default, with = "crate::io::flat_array")]
    pub data: Vec<f64>,
    #[serde(default, with = "crate::io::flat_array")]
    pub start_index: Vec<i64>,
}

impl ElementSelectors {
    /// Register an entry without data (single-element material).
    pub fn push_single(&mut self) {
        self.start_index.push(-1);
    }

    /// Register an entry; `cumulative` is row-major `[n_energies][n_elem - 1]`.
    pub fn push(&mut self, grid: &LogGrid, cumulative: &[f64]) {
        self.start_index.push(self.data.len() as i64);
        self.data.push(grid.len() as f64);
        self.data.push(grid.log_min());
        self.data.push(grid.inv_log_delta());
        self.data.extend_from_slice(cumulative);
    }

    pub fn len(&self) -> usize {
        self.start_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.start_index.is_empty()
    }

    /// Position (within its material) of the selected element.
    ///
    /// `u` is a uniform deviate; probabilities are interpolated linearly in
    /// ln E and energies outside the grid use the boundary node.
    #[inline]
    pub fn select(&self, entry: usize, num_elements: usize, log_ekin: f64, u: f64) -> usize {
        let start = self.start_index[entry];
        if start < 0 || num_elements < 2 {
            return 0;
        }
        let d = &self.data[start as usize..];
        let n = d[0] as usize;
        let log_min = d[1];
        let ild = d[2];
        let stride = num_elements - 1;
        let i = log_bin_index(log_ekin, log_min, ild, n);
        let t = ((log_ekin - log_min) * ild - i as f64).clamp(0.0, 1.0);
        let lo = &d[HEADER_LEN + i * stride..HEADER_LEN + (i + 1) * stride];
        let hi = &d[HEADER_LEN + (i + 1) * stride..HEADER_LEN + (i + 2) * stride];
        for k in 0..stride {
            let cum = lo[k] + t * (hi[k] - lo[k]);
            if u < cum {
                return k;
            }
        }
        stride
    }

    /// Check every entry against the element count of its material.
    pub fn validate(&self, name: &str, num_elements: &[usize]) -> Result<()> {
        if self.start_index.len() != num_elements.len() {
            return Err(KernelError::table_size(
                format!("{name} start indices"),
                num_elements.len(),
                self.start_index.len(),
            ));
        }
        for (entry, (&start, &nel)) in self.start_index.iter().zip(num_elements).enumerate() {
            if start < 0 {
                continue;
            }
            let start = start as usize;
            let n = self.data.get(start).copied().unwrap_or(0.0) as usize;
            let expected = start + HEADER_LEN + n * nel.saturating_sub(1);
            if n < 2 || expected > self.data.len() {
                return Err(KernelError::table_size(
                    format!("{name} entry {entry}"),
                    expected,
                    self.data.len(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn two_element_selector() -> (ElementSelectors, LogGrid) {
        let grid = LogGrid::new(1.0, 100.0, 3).unwrap();
        let mut sel = ElementSelectors::default();
        sel.push_single();
        // probability of the first element goes 0.2 -> 0.5 -> 0.8
        sel.push(&grid, &[0.2, 0.5, 0.8]);
        (sel, grid)
    }

    #[test]
    fn test_single_element_always_first() {
        let (sel, _) = two_element_selector();
        assert_eq!(sel.select(0, 1, 1.0, 0.99), 0);
    }

    #[test]
    fn test_selection_frequencies_follow_interpolation() {
        let (sel, _) = two_element_selector();
        let mut rng = StdRng::seed_from_u64(42);
        let n = 100_000;
        let log_e = 10f64.ln();
        let first = (0..n)
            .filter(|_| sel.select(1, 2, log_e, rng.gen::<f64>()) == 0)
            .count();
        assert!((first as f64 / n as f64 - 0.5).abs() < 0.01);
        // clamped outside the grid
        assert_eq!(sel.select(1, 2, 1.0e3f64.ln(), 0.79), 0);
        assert_eq!(sel.select(1, 2, 1.0e3f64.ln(), 0.81), 1);
        assert_eq!(sel.select(1, 2, 0.1f64.ln(), 0.21), 1);
    }

    #[test]
    fn test_validate() {
        let (sel, _) = two_element_selector();
        assert!(sel.validate("test", &[1, 2]).is_ok());
        assert!(sel.validate("test", &[1, 3]).is_err());
        assert!(sel.validate("test", &[1]).is_err());
    }
}
