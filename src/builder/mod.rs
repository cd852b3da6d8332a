// Reference table builder.
//
// Fills every `EmData` table from closed-form models so that the kernel
// can run without an external physics library: Berger-Seltzer stopping
// powers, Moller/Bhabha and screened Bethe-Heitler cross sections, the
// screened Rutherford transport cross section, parametrised Klein-Nishina
// and pair production cross sections, and a simple `Z^4 / E^3`
// photo-absorption fit. The resulting tables follow the layouts documented
// in `crate::tables`, so tables produced elsewhere and loaded through
// `crate::io` can be used interchangeably.

pub mod data;
pub mod electron;
pub mod gamma;
pub mod materials;
pub mod sb;

use crate::builder::data::ELEMENT_Z;
use crate::builder::materials::{build_element, build_material};
use crate::error::{KernelError, Result};
use crate::parameters::Parameters;
use crate::tables::{ElementData, EmData, MatCutData, MatCutRecord, MaterialData};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Composition and density of one material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialSpec {
    pub name: String,
    /// Density [g/cm^3]
    pub density: f64,
    /// Mean excitation energy [MeV]; Bragg additivity when absent
    #[serde(default)]
    pub mean_exc_energy: Option<f64>,
    /// `(Z, mass fraction)` pairs
    pub composition: Vec<(usize, f64)>,
}

impl MaterialSpec {
    /// Material made of a single element.
    pub fn element(name: &str, z: usize, density: f64, mean_exc_energy: f64) -> Self {
        MaterialSpec {
            name: name.to_string(),
            density,
            mean_exc_energy: Some(mean_exc_energy),
            composition: vec![(z, 1.0)],
        }
    }

    /// Compound with a known mean excitation energy.
    pub fn compound(name: &str, density: f64, mean_exc_energy: f64, composition: &[(usize, f64)]) -> Self {
        MaterialSpec {
            name: name.to_string(),
            density,
            mean_exc_energy: Some(mean_exc_energy),
            composition: composition.to_vec(),
        }
    }

    /// Mixture whose mean excitation energy follows from its elements.
    pub fn mixture(name: &str, density: f64, composition: &[(usize, f64)]) -> Self {
        MaterialSpec {
            name: name.to_string(),
            density,
            mean_exc_energy: None,
            composition: composition.to_vec(),
        }
    }

    /// Mixture given by element symbols, e.g. `[("Si", 0.467), ("O", 0.533)]`.
    pub fn from_symbols(name: &str, density: f64, composition: &[(&str, f64)]) -> Result<Self> {
        let composition = composition
            .iter()
            .map(|&(symbol, w)| {
                ELEMENT_Z
                    .get(symbol)
                    .map(|&z| (z, w))
                    .ok_or_else(|| KernelError::UnknownElement(symbol.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::mixture(name, density, &composition))
    }
}

/// A material together with its production thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatCutSpec {
    /// Index into the material list
    pub mat_index: usize,
    /// e- production threshold [MeV]
    pub electron_cut: f64,
    /// gamma production threshold [MeV]
    pub gamma_cut: f64,
}

impl MatCutSpec {
    pub fn new(mat_index: usize, electron_cut: f64, gamma_cut: f64) -> Self {
        MatCutSpec {
            mat_index,
            electron_cut,
            gamma_cut,
        }
    }
}

/// Switches of the builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
    /// Include bremsstrahlung in the e-/e+ tables; when off only ionisation
    /// contributes to the energy loss and the bremsstrahlung cross section
    /// is zero.
    pub bremsstrahlung: bool,
    /// Density of the cross section and element selector grids
    pub xsec_bins_per_decade: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            bremsstrahlung: true,
            xsec_bins_per_decade: 7,
        }
    }
}

/// Build and validate every table for the given materials and cuts.
///
/// Material-cut `i` gets host index `i`, material `j` host index `j`.
///
/// # Examples
///
/// ```
/// use emkernel::builder::{build_em_data, BuildOptions, MatCutSpec, MaterialSpec};
/// use emkernel::Parameters;
///
/// let materials = [MaterialSpec::element("G4_Cu", 29, 8.96, 322.0e-6)];
/// let cuts = [MatCutSpec::new(0, 0.7, 0.02)];
/// let data = build_em_data(&Parameters::default(), &materials, &cuts, &BuildOptions::default())?;
/// assert_eq!(data.mat_cut_data.len(), 1);
/// # Ok::<(), emkernel::KernelError>(())
/// ```
pub fn build_em_data(
    params: &Parameters,
    materials: &[MaterialSpec],
    cuts: &[MatCutSpec],
    options: &BuildOptions,
) -> Result<EmData> {
    params.validate()?;
    if options.xsec_bins_per_decade == 0 {
        return Err(KernelError::invalid_parameter(
            "xsec_bins_per_decade",
            "must be at least 1",
        ));
    }

    let mut element_data = ElementData::new();
    let mut zs: Vec<usize> = materials
        .iter()
        .flat_map(|m| m.composition.iter().map(|&(z, _)| z))
        .collect();
    zs.sort_unstable();
    zs.dedup();
    for &iz in &zs {
        element_data.insert(build_element(iz)?)?;
    }

    let mut material_data = MaterialData::default();
    for (imat, spec) in materials.iter().enumerate() {
        material_data
            .materials
            .push(build_material(spec, &element_data)?);
        material_data.host_to_kernel.push(imat as i64);
    }

    let mut mat_cut_data = MatCutData::default();
    for (host_index, cut) in cuts.iter().enumerate() {
        if cut.mat_index >= material_data.len() {
            return Err(KernelError::UnknownMaterial(format!(
                "material-cut {host_index} refers to material {}",
                cut.mat_index
            )));
        }
        for (name, value) in [("electron_cut", cut.electron_cut), ("gamma_cut", cut.gamma_cut)] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(KernelError::invalid_parameter(
                    name,
                    format!("material-cut {host_index}: must be positive, got {value}"),
                ));
            }
        }
        mat_cut_data.push(MatCutRecord::new(
            cut.mat_index,
            cut.electron_cut,
            cut.gamma_cut,
            host_index,
        ));
    }

    let electron_data = electron::build_electron_data(
        params,
        options,
        &element_data,
        &material_data,
        &mat_cut_data,
        true,
    )?;
    let positron_data = electron::build_electron_data(
        params,
        options,
        &element_data,
        &material_data,
        &mat_cut_data,
        false,
    )?;
    let gamma_data = gamma::build_gamma_data(options, &element_data, &material_data)?;
    let sb_table_data = sb::build_sb_tables(
        &element_data,
        &material_data,
        &mat_cut_data,
        params.electron_brem_model_lim,
    )?;

    let data = EmData {
        mat_cut_data,
        material_data,
        element_data,
        electron_data,
        positron_data,
        gamma_data,
        sb_table_data,
    };
    data.validate()?;
    info!(
        materials = data.material_data.len(),
        mat_cuts = data.mat_cut_data.len(),
        elements = zs.len(),
        "built EM tables"
    );
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn water_and_lead() -> Vec<MaterialSpec> {
        vec![
            MaterialSpec::compound("G4_WATER", 1.0, 78.0e-6, &[(1, 0.111894), (8, 0.888106)]),
            MaterialSpec::element("G4_Pb", 82, 11.35, 823.0e-6),
        ]
    }

    #[test]
    fn test_build_two_materials() {
        let cuts = [
            MatCutSpec::new(0, 0.35, 0.0029),
            MatCutSpec::new(1, 1.0, 0.1),
            MatCutSpec::new(0, 1.0, 0.1),
        ];
        let data = build_em_data(&Parameters::default(), &water_and_lead(), &cuts, &BuildOptions::default())
            .unwrap();
        assert_eq!(data.mat_cut_data.len(), 3);
        assert_eq!(data.material_data.len(), 2);
        assert!(data.element_data.contains(82) && data.element_data.contains(1));
        assert!(!data.element_data.contains(6));
        assert_eq!(data.mat_cut_data.kernel_index(2), Some(2));

        // higher cuts keep more of the loss continuous
        let e = 10.0f64;
        let r_low_cut = data.electron_data.rest_range(0, e, e.ln());
        let r_high_cut = data.electron_data.rest_range(2, e, e.ln());
        assert!(r_high_cut < r_low_cut);

        // lead stops electrons far quicker than water
        let r_pb = data.electron_data.rest_range(1, e, e.ln());
        assert!(r_pb < 0.5 * r_high_cut);

        // water has a conversion selector, lead does not
        assert_eq!(data.gamma_data.elem_selector_conv.start_index[1], -1);
        assert!(data.gamma_data.elem_selector_conv.start_index[0] >= 0);
    }

    #[test]
    fn test_ionisation_only_tables() {
        let options = BuildOptions {
            bremsstrahlung: false,
            ..Default::default()
        };
        let cuts = [MatCutSpec::new(0, 0.35, 0.0029)];
        let data = build_em_data(&Parameters::default(), &water_and_lead()[..1], &cuts, &options).unwrap();
        let e = 100.0f64;
        assert_eq!(data.electron_data.rest_mac_xsec(0, e, e.ln(), false), 0.0);
        assert!(data.electron_data.rest_mac_xsec(0, e, e.ln(), true) > 0.0);
    }

    #[test]
    fn test_csda_range_of_water() {
        // unrestricted cuts give the CSDA range; ESTAR: 0.4367 g/cm^2 at 1 MeV
        let cuts = [MatCutSpec::new(0, 1.0e5, 1.0e5)];
        let data = build_em_data(&Parameters::default(), &water_and_lead()[..1], &cuts, &BuildOptions::default())
            .unwrap();
        let e = 1.0f64;
        assert_relative_eq!(data.electron_data.rest_range(0, e, e.ln()), 4.367, max_relative = 5.0e-2);
        let r = data.electron_data.rest_range(0, e, e.ln());
        assert_relative_eq!(data.electron_data.inv_range(0, r), e, max_relative = 1.0e-3);
    }

    #[test]
    fn test_from_symbols() {
        let spec = MaterialSpec::from_symbols("quartz", 2.32, &[("Si", 0.467), ("O", 0.533)]).unwrap();
        assert_eq!(spec.composition, vec![(14, 0.467), (8, 0.533)]);
        assert!(spec.mean_exc_energy.is_none());
        assert!(matches!(
            MaterialSpec::from_symbols("bad", 1.0, &[("Xx", 1.0)]),
            Err(KernelError::UnknownElement(_))
        ));
    }

    #[test]
    fn test_rejects_bad_cuts() {
        let materials = water_and_lead();
        let opts = BuildOptions::default();
        let pars = Parameters::default();
        assert!(matches!(
            build_em_data(&pars, &materials, &[MatCutSpec::new(5, 1.0, 1.0)], &opts),
            Err(KernelError::UnknownMaterial(_))
        ));
        assert!(matches!(
            build_em_data(&pars, &materials, &[MatCutSpec::new(0, -1.0, 1.0)], &opts),
            Err(KernelError::InvalidParameter { .. })
        ));
    }
}
