// Gamma macroscopic cross section tables (conversion, Compton) per material

use crate::error::{check_len, Result};
use crate::tables::selector::ElementSelectors;
use crate::utilities::LogGrid;
use serde::{Deserialize, Serialize};

/// Conversion and Compton cross sections of every material on two log
/// grids. Block of material `imat` starts at `2 * (Nconv + Ncomp) * imat` and
/// holds interleaved `(xs, xs'')` for conversion followed by Compton.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GammaData {
    pub num_materials: usize,
    pub conv_grid: LogGrid,
    pub comp_grid: LogGrid,
    #[serde(default, with = "crate::io::flat_array")]
    pub mac_xsec_data: Vec<f64>,
    /// Target element of the conversion, one entry per material
    pub elem_selector_conv: ElementSelectors,
}

impl GammaData {
    #[inline]
    fn block_len(&self) -> usize {
        2 * (self.conv_grid.len() + self.comp_grid.len())
    }

    /// Pair production macroscopic cross section [1/mm]; zero below threshold.
    pub fn conversion_mac_xsec(&self, imat: usize, egamma: f64, log_egamma: f64) -> f64 {
        if egamma <= self.conv_grid.min() {
            return 0.0;
        }
        let start = self.block_len() * imat;
        let n = 2 * self.conv_grid.len();
        self.conv_grid
            .spline_interleaved(&self.mac_xsec_data[start..start + n], egamma, log_egamma)
            .max(0.0)
    }

    /// Compton macroscopic cross section [1/mm]; zero below the grid.
    pub fn compton_mac_xsec(&self, imat: usize, egamma: f64, log_egamma: f64) -> f64 {
        if egamma < self.comp_grid.min() {
            return 0.0;
        }
        let start = self.block_len() * imat + 2 * self.conv_grid.len();
        let n = 2 * self.comp_grid.len();
        self.comp_grid
            .spline_interleaved(&self.mac_xsec_data[start..start + n], egamma, log_egamma)
            .max(0.0)
    }

    pub fn validate(&self, mat_elements: &[usize]) -> Result<()> {
        self.conv_grid.validate("conversion grid")?;
        self.comp_grid.validate("Compton grid")?;
        check_len(
            "gamma cross sections",
            &self.mac_xsec_data,
            self.block_len() * self.num_materials,
        )?;
        self.elem_selector_conv
            .validate("conversion selector", mat_elements)
    }
}
