// Per-element data, indexed by atomic number

use crate::constants::FINE_STRUCTURE_CONST;
use crate::error::{KernelError, Result};
use serde::{Deserialize, Serialize};

/// Largest atomic number the element table can hold
pub const MAX_Z: usize = 100;

/// Screening and Coulomb correction constants of a single element together
/// with its photo-absorption (Sandia) parametrisation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElemRecord {
    /// Atomic number (0 marks an unused slot)
    pub z: f64,
    pub z13: f64,
    pub z23: f64,
    /// Coulomb correction f_c(Z)
    pub coulomb: f64,
    pub log_z: f64,
    /// Bremsstrahlung factor (F_el - f_c) + F_inel / Z
    pub z_factor1: f64,
    /// Pair production delta_max below 50 MeV
    pub delta_max_low: f64,
    /// Pair production delta_max above 50 MeV (Coulomb corrected)
    pub delta_max_high: f64,
    /// 1 / ln(s1) with s1 = Z^(2/3) / 184.15^2, LPM suppression
    pub il_var_s1: f64,
    /// 1 / ln(sqrt(2) s1)
    pub il_var_s1_cond: f64,
    /// Lower edges of the Sandia intervals [MeV]
    #[serde(default, with = "crate::io::flat_array")]
    pub sandia_energies: Vec<f64>,
    /// Four coefficients per interval, per atom [mm^2 MeV^k]
    #[serde(default, with = "crate::io::flat_array")]
    pub sandia_coefficients: Vec<f64>,
    /// K-shell binding energy [MeV]
    pub k_shell_binding_energy: f64,
}

/// Coulomb correction function of Davies, Bethe and Maximon.
pub fn coulomb_correction(z: f64) -> f64 {
    const K1: f64 = 0.0083;
    const K2: f64 = 0.20206;
    const K3: f64 = 0.0020;
    const K4: f64 = 0.0369;
    let az2 = (FINE_STRUCTURE_CONST * z).powi(2);
    let az4 = az2 * az2;
    (K1 * az4 + K2 + 1.0 / (1.0 + az2)) * az2 - (K3 * az4 + K4) * az4
}

/// Radiation logarithms (L_rad, L'_rad) with the Tsai values for light elements.
pub fn radiation_logs(iz: usize) -> (f64, f64) {
    const FEL_LIGHT: [f64; 5] = [0.0, 5.31, 4.79, 4.74, 4.71];
    const FINEL_LIGHT: [f64; 5] = [0.0, 6.144, 5.621, 5.805, 5.924];
    if iz < 5 {
        (FEL_LIGHT[iz], FINEL_LIGHT[iz])
    } else {
        let log_z = (iz as f64).ln();
        ((184.15f64).ln() - log_z / 3.0, (1194.0f64).ln() - 2.0 * log_z / 3.0)
    }
}

impl ElemRecord {
    /// Derive every Z-dependent constant for element `iz`.
    pub fn new(
        iz: usize,
        sandia_energies: Vec<f64>,
        sandia_coefficients: Vec<f64>,
        k_shell_binding_energy: f64,
    ) -> Self {
        let z = iz as f64;
        let log_z = z.ln();
        let z13 = (log_z / 3.0).exp();
        let z23 = z13 * z13;
        let coulomb = coulomb_correction(z);
        let (fel, finel) = radiation_logs(iz);
        let z_factor1 = (fel - coulomb) + finel / z;

        let fz_low = 8.0 * log_z / 3.0;
        let fz_high = 8.0 * (log_z / 3.0 + coulomb);
        let delta_max_low = ((42.038 - fz_low) / 8.29).exp() - 0.958;
        let delta_max_high = ((42.038 - fz_high) / 8.29).exp() - 0.958;

        let var_s1 = z23 / (184.15 * 184.15);
        ElemRecord {
            z,
            z13,
            z23,
            coulomb,
            log_z,
            z_factor1,
            delta_max_low,
            delta_max_high,
            il_var_s1: 1.0 / var_s1.ln(),
            il_var_s1_cond: 1.0 / (std::f64::consts::SQRT_2 * var_s1).ln(),
            sandia_energies,
            sandia_coefficients,
            k_shell_binding_energy,
        }
    }

    /// Atomic number as an index
    pub fn iz(&self) -> usize {
        self.z as usize
    }

    /// s1 = Z^(2/3) / 184.15^2
    #[inline]
    pub fn var_s1(&self) -> f64 {
        self.z23 / (184.15 * 184.15)
    }

    /// Per-atom photo-absorption cross section from the Sandia fit [mm^2].
    #[inline]
    pub fn photoelectric_xsec(&self, egamma: f64) -> f64 {
        sandia_xsec(&self.sandia_energies, &self.sandia_coefficients, egamma)
    }
}

/// Evaluate a Sandia parametrisation `a1/E + a2/E^2 + a3/E^3 + a4/E^4` in the
/// interval containing `e`; zero below the first edge.
#[inline]
pub fn sandia_xsec(edges: &[f64], coefficients: &[f64], e: f64) -> f64 {
    if edges.is_empty() || e < edges[0] {
        return 0.0;
    }
    let mut interval = edges.len() - 1;
    while interval > 0 && e < edges[interval] {
        interval -= 1;
    }
    let c = &coefficients[4 * interval..4 * interval + 4];
    let inv = 1.0 / e;
    (inv * (c[0] + inv * (c[1] + inv * (c[2] + inv * c[3])))).max(0.0)
}

/// Element records indexed by atomic number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementData {
    elements: Vec<ElemRecord>,
}

impl Default for ElementData {
    fn default() -> Self {
        ElementData {
            elements: vec![ElemRecord::default(); MAX_Z + 1],
        }
    }
}

impl ElementData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a record in its Z slot.
    pub fn insert(&mut self, record: ElemRecord) -> Result<()> {
        let iz = record.iz();
        if iz == 0 || iz > MAX_Z {
            return Err(KernelError::UnknownElement(format!("Z = {}", record.z)));
        }
        self.elements[iz] = record;
        Ok(())
    }

    #[inline]
    pub fn get(&self, iz: usize) -> &ElemRecord {
        &self.elements[iz]
    }

    pub fn contains(&self, iz: usize) -> bool {
        iz > 0 && iz < self.elements.len() && self.elements[iz].iz() == iz
    }

    pub fn validate(&self) -> Result<()> {
        if self.elements.len() != MAX_Z + 1 {
            return Err(KernelError::table_size(
                "element data",
                MAX_Z + 1,
                self.elements.len(),
            ));
        }
        for (iz, rec) in self.elements.iter().enumerate() {
            if rec.z == 0.0 {
                continue;
            }
            if rec.iz() != iz {
                return Err(KernelError::UnknownElement(format!(
                    "record with Z = {} stored in slot {iz}",
                    rec.z
                )));
            }
            let n = rec.sandia_energies.len();
            crate::error::check_len(
                &format!("sandia coefficients of Z = {iz}"),
                &rec.sandia_coefficients,
                4 * n,
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_coulomb_correction_lead() {
        // f_c(82) is about 0.3326
        assert_relative_eq!(coulomb_correction(82.0), 0.3326, epsilon = 2.0e-3);
    }

    #[test]
    fn test_element_constants() {
        let pb = ElemRecord::new(82, vec![], vec![], 0.088);
        assert_relative_eq!(pb.z13, 82f64.powf(1.0 / 3.0), epsilon = 1.0e-12);
        assert!(pb.delta_max_high < pb.delta_max_low);
        assert!(pb.il_var_s1 < 0.0 && pb.il_var_s1_cond < 0.0);
        // light elements use the tabulated radiation logarithms
        let h = ElemRecord::new(1, vec![], vec![], 13.6e-6);
        assert_relative_eq!(h.z_factor1, (5.31 - h.coulomb) + 6.144, epsilon = 1.0e-12);
    }

    #[test]
    fn test_sandia_xsec_intervals() {
        let edges = [1.0e-5, 1.0e-3];
        let coef = [0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 8.0, 0.0];
        assert_eq!(sandia_xsec(&edges, &coef, 1.0e-6), 0.0);
        assert_relative_eq!(sandia_xsec(&edges, &coef, 1.0e-4), 1.0e12, max_relative = 1.0e-12);
        assert_relative_eq!(sandia_xsec(&edges, &coef, 1.0e-2), 8.0e6, max_relative = 1.0e-12);
    }

    #[test]
    fn test_insert_and_validate() {
        let mut data = ElementData::new();
        data.insert(ElemRecord::new(8, vec![1.0e-5], vec![0.0, 0.0, 1.0, 0.0], 5.0e-4))
            .unwrap();
        assert!(data.contains(8));
        assert!(!data.contains(6));
        assert!(data.validate().is_ok());
        assert!(data.insert(ElemRecord::default()).is_err());
    }
}
