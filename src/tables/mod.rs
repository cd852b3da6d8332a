// Read-only lookup tables shared by every worker.
//
// All tables are flat buffers with explicit start offsets. They are filled
// once (by `crate::builder` or `crate::io`) and never mutated afterwards,
// so `&EmData` can be shared freely across threads.

pub mod electron_data;
pub mod element;
pub mod gamma_data;
pub mod mat_cut;
pub mod material;
pub mod sb_table;
pub mod selector;

pub use electron_data::ElectronData;
pub use element::{ElemRecord, ElementData};
pub use gamma_data::GammaData;
pub use mat_cut::{MatCutData, MatCutRecord};
pub use material::{MatRecord, MaterialData};
pub use sb_table::SbTableData;
pub use selector::ElementSelectors;

use crate::error::{KernelError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Every table needed by the transport kernel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmData {
    pub mat_cut_data: MatCutData,
    pub material_data: MaterialData,
    pub element_data: ElementData,
    pub electron_data: ElectronData,
    pub positron_data: ElectronData,
    pub gamma_data: GammaData,
    pub sb_table_data: SbTableData,
}

impl EmData {
    /// Tables of e- (`charge < 0`) or e+.
    #[inline]
    pub fn charged_data(&self, is_electron: bool) -> &ElectronData {
        if is_electron {
            &self.electron_data
        } else {
            &self.positron_data
        }
    }

    /// Material record of a material-cut.
    #[inline]
    pub fn material_of(&self, imc: usize) -> &MatRecord {
        self.material_data.get(self.mat_cut_data.get(imc).mat_index)
    }

    /// Check every explicit size against its buffer and every cross reference.
    pub fn validate(&self) -> Result<()> {
        self.element_data.validate()?;
        self.material_data.validate()?;
        for mat in &self.material_data.materials {
            if let Some(&iz) = mat.element_z.iter().find(|&&iz| !self.element_data.contains(iz)) {
                return Err(KernelError::UnknownElement(format!(
                    "Z = {iz} used by material {}",
                    mat.name
                )));
            }
        }
        self.mat_cut_data.validate(self.material_data.len())?;

        let mat_elements: Vec<usize> = self
            .material_data
            .materials
            .iter()
            .map(MatRecord::num_elements)
            .collect();
        let mc_elements: Vec<usize> = self
            .mat_cut_data
            .mat_cuts
            .iter()
            .map(|mc| mat_elements[mc.mat_index])
            .collect();
        for (name, data) in [("e-", &self.electron_data), ("e+", &self.positron_data)] {
            if data.num_mat_cuts != self.mat_cut_data.len() {
                return Err(KernelError::table_size(
                    format!("{name} material-cuts"),
                    self.mat_cut_data.len(),
                    data.num_mat_cuts,
                ));
            }
            data.validate(name, &mat_elements, &mc_elements)?;
        }
        if self.gamma_data.num_materials != self.material_data.len() {
            return Err(KernelError::table_size(
                "gamma materials",
                self.material_data.len(),
                self.gamma_data.num_materials,
            ));
        }
        self.gamma_data.validate(&mat_elements)?;
        self.sb_table_data.validate(self.mat_cut_data.len())?;
        debug!(
            materials = self.material_data.len(),
            mat_cuts = self.mat_cut_data.len(),
            "EM tables validated"
        );
        Ok(())
    }
}
