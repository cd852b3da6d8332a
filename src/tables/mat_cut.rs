// Material-cut couples: a material together with its secondary production thresholds

use crate::error::{KernelError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatCutRecord {
    /// e- production threshold [MeV]
    pub sec_el_prod_cut: f64,
    /// gamma production threshold [MeV]
    pub sec_gam_prod_cut: f64,
    pub log_sec_gam_cut: f64,
    /// Kernel index of the owning material
    pub mat_index: usize,
    /// Index of this couple in the host geometry cut table
    pub host_index: usize,
}

impl MatCutRecord {
    pub fn new(mat_index: usize, el_cut: f64, gam_cut: f64, host_index: usize) -> Self {
        MatCutRecord {
            sec_el_prod_cut: el_cut,
            sec_gam_prod_cut: gam_cut,
            log_sec_gam_cut: gam_cut.ln(),
            mat_index,
            host_index,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatCutData {
    pub mat_cuts: Vec<MatCutRecord>,
    /// Host cut-table index -> kernel material-cut index (-1 if unused)
    #[serde(default, with = "crate::io::flat_array")]
    pub host_to_kernel: Vec<i64>,
}

impl MatCutData {
    #[inline]
    pub fn get(&self, imc: usize) -> &MatCutRecord {
        &self.mat_cuts[imc]
    }

    pub fn len(&self) -> usize {
        self.mat_cuts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mat_cuts.is_empty()
    }

    /// Append a couple and register it in the host map.
    pub fn push(&mut self, record: MatCutRecord) -> usize {
        let imc = self.mat_cuts.len();
        if self.host_to_kernel.len() <= record.host_index {
            self.host_to_kernel.resize(record.host_index + 1, -1);
        }
        self.host_to_kernel[record.host_index] = imc as i64;
        self.mat_cuts.push(record);
        imc
    }

    /// Kernel index of a host material-cut couple.
    pub fn kernel_index(&self, host_index: usize) -> Option<usize> {
        self.host_to_kernel
            .get(host_index)
            .and_then(|&i| usize::try_from(i).ok())
    }

    pub fn validate(&self, num_materials: usize) -> Result<()> {
        for (imc, mc) in self.mat_cuts.iter().enumerate() {
            if mc.mat_index >= num_materials {
                return Err(KernelError::UnknownMaterial(format!(
                    "material-cut {imc} refers to material {}",
                    mc.mat_index
                )));
            }
            if !(mc.sec_el_prod_cut > 0.0 && mc.sec_gam_prod_cut > 0.0) {
                return Err(KernelError::invalid_parameter(
                    "production cut",
                    format!("material-cut {imc} has a non-positive threshold"),
                ));
            }
        }
        Ok(())
    }
}
