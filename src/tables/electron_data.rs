// e-/e+ energy loss, macroscopic cross section and transport tables

use crate::error::{check_len, KernelError, Result};
use crate::tables::selector::ElementSelectors;
use crate::utilities::{find_lower_bin_index, get_spline, get_spline_log_xyz, LogGrid};
use serde::{Deserialize, Serialize};

/// Header length of a restricted macroscopic cross section sub-table:
/// `[n, E_of_max, xs_max, ln E_min, 1/dlnE]`
pub const XSEC_HEADER_LEN: usize = 5;

/// Mean free path used when a cross section vanishes [mm]
pub const LARGE_MFP: f64 = 1.0e20;

/// All tables for one charge (one instance for e-, one for e+).
///
/// Energy loss block of material-cut `imc` starts at `5 * N * imc` and holds
/// `[range | range'' | dE/dx | dE/dx'' | E(range)'']`, each on the shared grid
/// of N energies. The inverse range spline uses the range values as abscissa
/// and the grid energies as ordinate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElectronData {
    pub num_mat_cuts: usize,
    pub num_materials: usize,
    pub eloss_grid: LogGrid,
    #[serde(default, with = "crate::io::flat_array")]
    pub eloss_data: Vec<f64>,
    /// Restricted macroscopic cross sections, ionisation then bremsstrahlung
    #[serde(default, with = "crate::io::flat_array")]
    pub res_mac_xsec_data: Vec<f64>,
    /// Start of the ionisation sub-table of each material-cut
    #[serde(default, with = "crate::io::flat_array")]
    pub res_mac_xsec_start: Vec<usize>,
    /// First transport cross section per material, `(xs, xs'')` interleaved on the loss grid
    #[serde(default, with = "crate::io::flat_array")]
    pub tr1_mac_xsec_data: Vec<f64>,
    pub elem_selector_ioni: ElementSelectors,
    pub elem_selector_brem_sb: ElementSelectors,
    pub elem_selector_brem_rb: ElementSelectors,
}

impl ElectronData {
    #[inline]
    fn eloss_block(&self, imc: usize) -> &[f64] {
        let n = self.eloss_grid.len();
        &self.eloss_data[5 * n * imc..5 * n * (imc + 1)]
    }

    /// Restricted range [mm].
    pub fn rest_range(&self, imc: usize, ekin: f64, log_ekin: f64) -> f64 {
        let n = self.eloss_grid.len();
        let block = self.eloss_block(imc);
        let e0 = self.eloss_grid.min();
        if ekin < e0 {
            return block[0] * (ekin / e0).sqrt();
        }
        self.eloss_grid
            .spline(&block[..n], &block[n..2 * n], ekin, log_ekin)
    }

    /// Restricted stopping power [MeV/mm].
    pub fn rest_dedx(&self, imc: usize, ekin: f64, log_ekin: f64) -> f64 {
        let n = self.eloss_grid.len();
        let block = self.eloss_block(imc);
        let e0 = self.eloss_grid.min();
        if ekin < e0 {
            return block[2 * n] * (ekin / e0).sqrt();
        }
        self.eloss_grid
            .spline(&block[2 * n..3 * n], &block[3 * n..4 * n], ekin, log_ekin)
            .max(0.0)
    }

    /// Kinetic energy at which the restricted range equals `range`.
    pub fn inv_range(&self, imc: usize, range: f64) -> f64 {
        let n = self.eloss_grid.len();
        let block = self.eloss_block(imc);
        let ranges = &block[..n];
        let min_range = ranges[0];
        if range < min_range {
            let dum = range / min_range;
            return self.eloss_grid.min() * dum * dum;
        }
        let i = find_lower_bin_index(ranges, range, 1);
        get_spline(ranges, self.eloss_grid.energies(), &block[4 * n..5 * n], range, i)
    }

    /// Start of the ionisation (`is_ioni`) or bremsstrahlung sub-table.
    #[inline]
    fn xsec_start(&self, imc: usize, is_ioni: bool) -> usize {
        let start = self.res_mac_xsec_start[imc];
        if is_ioni {
            start
        } else {
            start + XSEC_HEADER_LEN + 3 * self.res_mac_xsec_data[start] as usize
        }
    }

    /// Restricted macroscopic cross section [1/mm], zero below the table.
    pub fn rest_mac_xsec(&self, imc: usize, ekin: f64, log_ekin: f64, is_ioni: bool) -> f64 {
        let d = &self.res_mac_xsec_data[self.xsec_start(imc, is_ioni)..];
        let n = d[0] as usize;
        if n < 2 || ekin < d[XSEC_HEADER_LEN] {
            return 0.0;
        }
        let body = &d[XSEC_HEADER_LEN..XSEC_HEADER_LEN + 3 * n];
        get_spline_log_xyz(body, ekin, log_ekin, d[3], d[4]).max(0.0)
    }

    /// Maximum of the restricted cross section over `[0.8 E, E]`.
    ///
    /// The cross sections have a single maximum, so the maximum over the
    /// interval is either an end point or the tabulated peak.
    pub fn rest_mac_xsec_for_stepping(
        &self,
        imc: usize,
        ekin: f64,
        log_ekin: f64,
        is_ioni: bool,
    ) -> f64 {
        let d = &self.res_mac_xsec_data[self.xsec_start(imc, is_ioni)..];
        if (d[0] as usize) < 2 {
            return 0.0;
        }
        let e_of_max = d[1];
        if ekin <= e_of_max {
            return self.rest_mac_xsec(imc, ekin, log_ekin, is_ioni);
        }
        let e08 = 0.8 * ekin;
        if e08 >= e_of_max {
            return self.rest_mac_xsec(imc, e08, log_ekin + 0.8f64.ln(), is_ioni);
        }
        d[2]
    }

    /// First transport mean free path [mm] in material `imat`.
    pub fn transport_mfp(&self, imat: usize, ekin: f64, log_ekin: f64) -> f64 {
        let n = self.eloss_grid.len();
        let data = &self.tr1_mac_xsec_data[2 * n * imat..2 * n * (imat + 1)];
        let xs = self.eloss_grid.spline_interleaved(data, ekin, log_ekin);
        if xs > 0.0 {
            1.0 / xs
        } else {
            LARGE_MFP
        }
    }

    pub fn validate(&self, name: &str, mat_elements: &[usize], mc_elements: &[usize]) -> Result<()> {
        self.eloss_grid.validate(&format!("{name} energy loss grid"))?;
        let n = self.eloss_grid.len();
        check_len(&format!("{name} energy loss"), &self.eloss_data, 5 * n * self.num_mat_cuts)?;
        check_len(
            &format!("{name} transport cross sections"),
            &self.tr1_mac_xsec_data,
            2 * n * self.num_materials,
        )?;
        if self.res_mac_xsec_start.len() != self.num_mat_cuts {
            return Err(KernelError::table_size(
                format!("{name} cross section start indices"),
                self.num_mat_cuts,
                self.res_mac_xsec_start.len(),
            ));
        }
        for imc in 0..self.num_mat_cuts {
            for is_ioni in [true, false] {
                let start = self.res_mac_xsec_start[imc];
                let start = if is_ioni || start >= self.res_mac_xsec_data.len() {
                    start
                } else {
                    self.xsec_start(imc, false)
                };
                let count = self.res_mac_xsec_data.get(start).copied().unwrap_or(-1.0);
                let end = start + XSEC_HEADER_LEN + 3 * count.max(0.0) as usize;
                if count < 0.0 || end > self.res_mac_xsec_data.len() {
                    return Err(KernelError::table_size(
                        format!("{name} cross sections of material-cut {imc}"),
                        end,
                        self.res_mac_xsec_data.len(),
                    ));
                }
            }
        }
        self.elem_selector_ioni
            .validate(&format!("{name} ionisation selector"), mc_elements)?;
        self.elem_selector_brem_sb
            .validate(&format!("{name} SB selector"), mc_elements)?;
        self.elem_selector_brem_rb
            .validate(&format!("{name} RB selector"), mc_elements)?;
        if mat_elements.len() != self.num_materials {
            return Err(KernelError::table_size(
                format!("{name} materials"),
                mat_elements.len(),
                self.num_materials,
            ));
        }
        Ok(())
    }
}
