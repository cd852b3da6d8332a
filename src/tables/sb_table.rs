// Seltzer-Berger photon energy sampling tables, one block per element

use crate::error::{KernelError, Result};
use crate::tables::element::MAX_Z;
use serde::{Deserialize, Serialize};

const HEADER_LEN: usize = 5;

/// Flat store of the per-element sampling tables of the Seltzer-Berger model.
///
/// An element block is laid out as
/// `[nE, nK, nCutRows, ln E_min, 1/dlnE]`, the `nK` values of `ln kappa`
/// (kappa = k / E, last value 0), `nCutRows * nE` pairs
/// `(first bin above the cut, cumulative at the cut)` and finally, per
/// electron energy node, `nK` triplets `(cumulative, chi, chi_next - chi)`.
/// `chi` is the normalised density in `ln kappa`, linear within a bin, so the
/// cumulative is quadratic there. A start bin of -1 marks a node at or below
/// the gamma production cut.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SbTableData {
    #[serde(default, with = "crate::io::flat_array")]
    pub data: Vec<f64>,
    /// Start of each element block, indexed by Z (-1 when absent)
    #[serde(default, with = "crate::io::flat_array")]
    pub elem_start: Vec<i64>,
    /// Per material-cut start into `gamma_cut_indices`
    #[serde(default, with = "crate::io::flat_array")]
    pub gamma_cut_start: Vec<usize>,
    /// Cut row in the element block for every element of every material-cut
    #[serde(default, with = "crate::io::flat_array")]
    pub gamma_cut_indices: Vec<usize>,
}

impl Default for SbTableData {
    fn default() -> Self {
        SbTableData {
            data: Vec::new(),
            elem_start: vec![-1; MAX_Z + 1],
            gamma_cut_start: Vec::new(),
            gamma_cut_indices: Vec::new(),
        }
    }
}

/// Borrowed view of one element block.
#[derive(Debug, Clone, Copy)]
pub struct SbBlock<'a> {
    data: &'a [f64],
    num_energies: usize,
    num_kappas: usize,
    num_cut_rows: usize,
}

impl<'a> SbBlock<'a> {
    #[inline]
    pub fn num_energies(&self) -> usize {
        self.num_energies
    }

    #[inline]
    pub fn num_kappas(&self) -> usize {
        self.num_kappas
    }

    #[inline]
    pub fn num_cut_rows(&self) -> usize {
        self.num_cut_rows
    }

    #[inline]
    pub fn log_min(&self) -> f64 {
        self.data[3]
    }

    #[inline]
    pub fn inv_log_delta(&self) -> f64 {
        self.data[4]
    }

    #[inline]
    pub fn log_kappas(&self) -> &'a [f64] {
        &self.data[HEADER_LEN..HEADER_LEN + self.num_kappas]
    }

    /// `(start bin, cumulative at cut)`; `None` when the node lies below the cut.
    #[inline]
    pub fn cut_entry(&self, row: usize, ie: usize) -> Option<(usize, f64)> {
        let at = HEADER_LEN + self.num_kappas + 2 * (row * self.num_energies + ie);
        let bin = self.data[at];
        if bin < 0.0 {
            None
        } else {
            Some((bin as usize, self.data[at + 1]))
        }
    }

    #[inline]
    fn nodes(&self, ie: usize) -> &'a [f64] {
        let start = HEADER_LEN
            + self.num_kappas
            + 2 * self.num_cut_rows * self.num_energies
            + 3 * self.num_kappas * ie;
        &self.data[start..start + 3 * self.num_kappas]
    }

    /// Sample `ln kappa` at electron energy node `ie` above the cut of `row`.
    ///
    /// Returns `None` if the node lies below the cut.
    pub fn sample_log_kappa(&self, row: usize, ie: usize, u: f64) -> Option<f64> {
        let (start_bin, cum_cut) = self.cut_entry(row, ie)?;
        let nodes = self.nodes(ie);
        let lk = self.log_kappas();
        let target = cum_cut + u * (1.0 - cum_cut);
        let mut j = start_bin.min(self.num_kappas - 2);
        while j + 2 < self.num_kappas && nodes[3 * (j + 1)] <= target {
            j += 1;
        }
        let h = lk[j + 1] - lk[j];
        let dc = (target - nodes[3 * j]).max(0.0);
        let a = 0.5 * h * nodes[3 * j + 2];
        let b = h * nodes[3 * j + 1];
        let denom = b + (b * b + 4.0 * a * dc).max(0.0).sqrt();
        let t = if denom > 0.0 {
            (2.0 * dc / denom).clamp(0.0, 1.0)
        } else {
            0.5
        };
        Some(lk[j] + t * h)
    }
}

impl SbTableData {
    /// Block of element `iz`, if tabulated.
    #[inline]
    pub fn block(&self, iz: usize) -> Option<SbBlock<'_>> {
        let start = usize::try_from(*self.elem_start.get(iz)?).ok()?;
        let d = &self.data[start..];
        Some(SbBlock {
            data: d,
            num_energies: d[0] as usize,
            num_kappas: d[1] as usize,
            num_cut_rows: d[2] as usize,
        })
    }

    /// Cut row of the `elem_pos`-th element of material-cut `imc`.
    #[inline]
    pub fn cut_row(&self, imc: usize, elem_pos: usize) -> usize {
        self.gamma_cut_indices[self.gamma_cut_start[imc] + elem_pos]
    }

    /// Append the block of element `iz`.
    ///
    /// `cut_rows` holds `nCutRows * nE` pairs and `nodes` holds `nE * nK`
    /// triplets, both flattened.
    pub fn push_element(
        &mut self,
        iz: usize,
        log_min: f64,
        inv_log_delta: f64,
        num_energies: usize,
        log_kappas: &[f64],
        cut_rows: &[f64],
        nodes: &[f64],
    ) -> Result<()> {
        if iz == 0 || iz > MAX_Z {
            return Err(KernelError::UnknownElement(format!("Z = {iz}")));
        }
        let nk = log_kappas.len();
        if nodes.len() != 3 * nk * num_energies || cut_rows.len() % (2 * num_energies) != 0 {
            return Err(KernelError::table_size(
                format!("SB block of Z = {iz}"),
                3 * nk * num_energies,
                nodes.len(),
            ));
        }
        if self.elem_start.len() <= MAX_Z {
            self.elem_start.resize(MAX_Z + 1, -1);
        }
        self.elem_start[iz] = self.data.len() as i64;
        self.data.extend([
            num_energies as f64,
            nk as f64,
            (cut_rows.len() / (2 * num_energies)) as f64,
            log_min,
            inv_log_delta,
        ]);
        self.data.extend_from_slice(log_kappas);
        self.data.extend_from_slice(cut_rows);
        self.data.extend_from_slice(nodes);
        Ok(())
    }

    pub fn validate(&self, num_mat_cuts: usize) -> Result<()> {
        if self.elem_start.len() != MAX_Z + 1 {
            return Err(KernelError::table_size(
                "SB element start indices",
                MAX_Z + 1,
                self.elem_start.len(),
            ));
        }
        for iz in 0..=MAX_Z {
            let Ok(start) = usize::try_from(self.elem_start[iz]) else {
                continue;
            };
            let header = self.data.get(start..start + HEADER_LEN).ok_or_else(|| {
                KernelError::table_size(format!("SB header of Z = {iz}"), start + HEADER_LEN, self.data.len())
            })?;
            let (ne, nk, nc) = (header[0] as usize, header[1] as usize, header[2] as usize);
            let end = start + HEADER_LEN + nk + 2 * nc * ne + 3 * nk * ne;
            if ne < 2 || nk < 2 || end > self.data.len() {
                return Err(KernelError::table_size(
                    format!("SB block of Z = {iz}"),
                    end,
                    self.data.len(),
                ));
            }
        }
        if self.gamma_cut_start.len() != num_mat_cuts {
            return Err(KernelError::table_size(
                "SB gamma cut start indices",
                num_mat_cuts,
                self.gamma_cut_start.len(),
            ));
        }
        if let Some(&bad) = self
            .gamma_cut_start
            .iter()
            .find(|&&s| s > self.gamma_cut_indices.len())
        {
            return Err(KernelError::table_size(
                "SB gamma cut indices",
                bad,
                self.gamma_cut_indices.len(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Two energy nodes, flat density in ln kappa on [ln 1e-4, 0]; the cut
    /// row puts the cut at kappa = 1e-2 for the first node and excludes none
    /// of the second.
    fn flat_table() -> SbTableData {
        let lk: Vec<f64> = (0..5).map(|j| (1.0e-4f64).ln() * (1.0 - j as f64 / 4.0)).collect();
        let width = -lk[0];
        let mut nodes = Vec::new();
        for _ in 0..2 {
            for j in 0..5 {
                nodes.extend([(lk[j] - lk[0]) / width, 1.0 / width, 0.0]);
            }
        }
        let cut_rows = [2.0, 0.5, 0.0, 0.0];
        let mut t = SbTableData::default();
        t.push_element(6, 0.0, 1.0, 2, &lk, &cut_rows, &nodes).unwrap();
        t.gamma_cut_start.push(0);
        t.gamma_cut_indices.push(0);
        t
    }

    #[test]
    fn test_block_layout() {
        let t = flat_table();
        assert!(t.block(7).is_none());
        let b = t.block(6).unwrap();
        assert_eq!((b.num_energies(), b.num_kappas(), b.num_cut_rows()), (2, 5, 1));
        assert_eq!(b.cut_entry(0, 0), Some((2, 0.5)));
        assert_eq!(t.cut_row(0, 0), 0);
        assert!(t.validate(1).is_ok());
        assert!(t.validate(2).is_err());
    }

    #[test]
    fn test_sampling_is_uniform_in_log_kappa_above_cut() {
        let t = flat_table();
        let b = t.block(6).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let cut = 1.0e-2f64.ln();
        let n = 50_000;
        let mut sum = 0.0;
        for _ in 0..n {
            let lk = b.sample_log_kappa(0, 0, rng.gen::<f64>()).unwrap();
            assert!(lk >= cut - 1.0e-12 && lk <= 1.0e-12);
            sum += lk;
        }
        // uniform on [ln 1e-2, 0]
        assert!((sum / n as f64 - 0.5 * cut).abs() < 0.02);
    }

    #[test]
    fn test_linear_density_inversion() {
        // density rising linearly over a single bin [0, 1]: C(t) = t^2
        let lk = [-1.0, 0.0];
        let nodes = [0.0, 0.0, 2.0, 1.0, 2.0, 0.0, 0.0, 0.0, 2.0, 1.0, 2.0, 0.0];
        let mut t = SbTableData::default();
        t.push_element(1, 0.0, 1.0, 2, &lk, &[0.0, 0.0, 0.0, 0.0], &nodes).unwrap();
        let b = t.block(1).unwrap();
        for u in [0.04, 0.25, 0.81] {
            let x = b.sample_log_kappa(0, 1, u).unwrap() + 1.0;
            assert!((x - u.sqrt()).abs() < 1.0e-12);
        }
    }

    #[test]
    fn test_below_cut_node() {
        let lk = [-1.0, 0.0];
        let nodes = [0.0; 12];
        let mut t = SbTableData::default();
        t.push_element(2, 0.0, 1.0, 2, &lk, &[-1.0, 0.0, 0.0, 0.0], &nodes).unwrap();
        assert!(t.block(2).unwrap().sample_log_kappa(0, 0, 0.3).is_none());
    }
}
