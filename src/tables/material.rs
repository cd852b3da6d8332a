// Per-material data used by the run-time kernel

use crate::error::{check_len, KernelError, Result};
use crate::tables::element::sandia_xsec;
use serde::{Deserialize, Serialize};

/// A single material: composition, bulk properties and the Urban MSC
/// parameters derived from its effective Z.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatRecord {
    pub name: String,
    /// Atomic numbers of the constituent elements
    #[serde(default, with = "crate::io::flat_array")]
    pub element_z: Vec<usize>,
    /// Atoms per unit volume of each element [1/mm^3]
    #[serde(default, with = "crate::io::flat_array")]
    pub atom_densities: Vec<f64>,
    /// Mass density [g/cm^3]
    pub density: f64,
    /// Migdal constant times electron density; times E_total^2 it gives k_p^2
    pub density_cor_factor: f64,
    /// Electrons per unit volume [1/mm^3]
    pub electron_density: f64,
    /// Radiation length [mm]
    pub radiation_length: f64,
    /// Mean excitation energy [MeV]
    pub mean_exc_energy: f64,
    /// Lower edges of the macroscopic Sandia intervals [MeV]
    #[serde(default, with = "crate::io::flat_array")]
    pub sandia_energies: Vec<f64>,
    /// Four macroscopic coefficients per interval [1/mm MeV^k]
    #[serde(default, with = "crate::io::flat_array")]
    pub sandia_coefficients: Vec<f64>,
    pub z_eff: f64,
    pub z_eff23: f64,
    pub z_eff_sqrt: f64,
    /// Urban MSC step minimum parameters (a, b)
    pub umsc_step_min_pars: [f64; 2],
    /// Urban MSC tail parameters c1..c4
    pub umsc_tail_coeff: [f64; 4],
    /// Urban MSC theta0 correction coefficients
    pub umsc_theta_coeff: [f64; 2],
}

impl MatRecord {
    #[inline]
    pub fn num_elements(&self) -> usize {
        self.element_z.len()
    }

    /// Macroscopic photo-absorption cross section [1/mm].
    #[inline]
    pub fn photoelectric_mac_xsec(&self, egamma: f64) -> f64 {
        sandia_xsec(&self.sandia_energies, &self.sandia_coefficients, egamma)
    }

    /// Fill the Urban MSC parameters from the effective Z.
    pub fn set_urban_msc_parameters(&mut self) {
        let z = self.z_eff;
        let log_z = z.ln();
        let w = (log_z / 6.0).exp();
        let facz = 0.990395 + w * (-0.168386 + w * 0.093286);
        self.umsc_theta_coeff = [facz * (1.0 - 8.7780e-2 / z), facz * (4.0780e-2 + 1.7315e-4 * z)];
        let z13 = w * w;
        self.umsc_tail_coeff = [
            2.3785 - z13 * (4.1981e-1 - z13 * 6.3100e-2),
            4.7526e-1 + z13 * (1.7694 - z13 * 3.3885e-1),
            2.3683e-1 - z13 * (1.8111 - z13 * 3.2774e-1),
            1.7888e-2 + z13 * (1.9659e-2 - z13 * 2.6664e-3),
        ];
        self.umsc_step_min_pars = [27.725 / (1.0 + 0.203 * z), 6.152 / (1.0 + 0.111 * z)];
        self.z_eff23 = z13 * z13;
        self.z_eff_sqrt = z.sqrt();
    }

    /// Ratio of the maximal straight-line distance to the range for e-/e+.
    #[inline]
    pub fn umsc_d_over_range(&self) -> f64 {
        9.6280e-1 - 8.4848e-2 * self.z_eff_sqrt + 4.3769e-3 * self.z_eff
    }
}

/// All materials plus the host-to-kernel index map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialData {
    pub materials: Vec<MatRecord>,
    /// Host material index -> kernel material index (-1 if unused)
    #[serde(default, with = "crate::io::flat_array")]
    pub host_to_kernel: Vec<i64>,
}

impl MaterialData {
    #[inline]
    pub fn get(&self, imat: usize) -> &MatRecord {
        &self.materials[imat]
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    /// Index of the material with the given name.
    pub fn find(&self, name: &str) -> Result<usize> {
        self.materials
            .iter()
            .position(|m| m.name == name)
            .ok_or_else(|| KernelError::UnknownMaterial(name.to_string()))
    }

    /// Kernel index of a host material.
    pub fn kernel_index(&self, host_index: usize) -> Option<usize> {
        self.host_to_kernel
            .get(host_index)
            .and_then(|&i| usize::try_from(i).ok())
    }

    pub fn validate(&self) -> Result<()> {
        for (imat, mat) in self.materials.iter().enumerate() {
            if mat.atom_densities.len() != mat.element_z.len() {
                return Err(KernelError::table_size(
                    format!("atom densities of material {imat}"),
                    mat.element_z.len(),
                    mat.atom_densities.len(),
                ));
            }
            check_len(
                &format!("sandia coefficients of material {imat}"),
                &mat.sandia_coefficients,
                4 * mat.sandia_energies.len(),
            )?;
        }
        if let Some(&bad) = self
            .host_to_kernel
            .iter()
            .find(|&&i| i >= self.materials.len() as i64)
        {
            return Err(KernelError::UnknownMaterial(format!(
                "host map points to material {bad}"
            )));
        }
        Ok(())
    }
}
