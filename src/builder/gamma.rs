// Gamma tables: Klein-Nishina and Bethe-Heitler macroscopic cross sections
// and the conversion element selector

use crate::builder::electron::{cumulative_rows, xsec_grid};
use crate::builder::BuildOptions;
use crate::constants::{COMPTON_MIN_ENERGY, ELECTRON_MASS_C2, GAMMA_MAX_ENERGY};
use crate::error::Result;
use crate::tables::{ElementData, GammaData, MaterialData};
use crate::utilities::{prepare_spline_interleaved, LogGrid};
use tracing::info;

/// Points of the conversion cross section grid, from 2 m c^2 to the maximum
pub const CONV_GRID_SIZE: usize = 147;
/// Points of the Compton cross section grid
pub const COMP_GRID_SIZE: usize = 85;

const BARN: f64 = 1.0e-22;
const MICROBARN: f64 = 1.0e-6 * BARN;

/// Below this energy the pair cross section is scaled down to the threshold [MeV]
const PAIR_PARAM_MIN_ENERGY: f64 = 1.5;
/// Above this energy the pair cross section is frozen at its value [MeV]
const PAIR_PARAM_MAX_ENERGY: f64 = 80.0e3;

/// Empirical Klein-Nishina cross section per atom, with the low energy
/// binding suppression below 15 keV (40 keV for hydrogen) [mm^2].
pub fn compton_xsec_per_atom(z: f64, egamma: f64) -> f64 {
    const A: f64 = 20.0;
    const B: f64 = 230.0;
    const C: f64 = 440.0;
    const D: [f64; 4] = [2.7965e-1, -1.8300e-1, 6.7527, -1.9798e1];
    const E: [f64; 4] = [1.9756e-5, -1.0205e-2, -7.3913e-2, 2.7079e-2];
    const F: [f64; 4] = [-3.9178e-7, 6.8241e-5, 6.0480e-5, 3.0274e-4];
    let p: [f64; 4] = std::array::from_fn(|i| BARN * z * (D[i] + E[i] * z + F[i] * z * z));
    let formula = |x: f64| {
        p[0] * (1.0 + 2.0 * x).ln() / x
            + (p[1] + p[2] * x + p[3] * x * x) / (1.0 + A * x + B * x * x + C * x * x * x)
    };
    let t0 = if z < 1.5 { 40.0e-3 } else { 15.0e-3 };
    let xs = formula(egamma.max(t0) / ELECTRON_MASS_C2);
    if egamma >= t0 {
        return xs.max(0.0);
    }
    let dt0 = 1.0e-3;
    let sigma1 = formula((t0 + dt0) / ELECTRON_MASS_C2);
    let c1 = -t0 * (sigma1 - xs) / (xs * dt0);
    let c2 = if z > 1.5 { 0.375 - 0.0556 * z.ln() } else { 0.150 };
    let y = (egamma / t0).ln();
    (xs * (-y * (c1 + c2 * y)).exp()).max(0.0)
}

/// Parametrised Bethe-Heitler pair production cross section per atom [mm^2].
pub fn conversion_xsec_per_atom(z: f64, egamma: f64) -> f64 {
    const A: [f64; 6] = [8.7842e2, -1.9625e3, 1.2949e3, -2.0028e2, 1.2575e1, -2.8333e-1];
    const B: [f64; 6] = [-1.0342e1, 1.7692e1, -8.2381, 1.3063, -9.0815e-2, 2.3586e-3];
    const C: [f64; 6] = [-4.5263e2, 1.1161e3, -8.6749e2, 2.1773e2, -2.0467e1, 6.5372e-1];
    if z < 0.9 || egamma <= 2.0 * ELECTRON_MASS_C2 {
        return 0.0;
    }
    let e = egamma.clamp(PAIR_PARAM_MIN_ENERGY, PAIR_PARAM_MAX_ENERGY);
    let x = (e / ELECTRON_MASS_C2).ln();
    let poly = |c: &[f64; 6]| c.iter().rev().fold(0.0, |acc, &ci| acc * x + ci);
    let mut xs = (z + 1.0) * z * (poly(&A) + poly(&B) * z + poly(&C) / z) * MICROBARN;
    if egamma < PAIR_PARAM_MIN_ENERGY {
        let t = (egamma - 2.0 * ELECTRON_MASS_C2) / (PAIR_PARAM_MIN_ENERGY - 2.0 * ELECTRON_MASS_C2);
        xs *= t * t;
    }
    xs.max(0.0)
}

/// Build the gamma tables for every material.
pub fn build_gamma_data(
    options: &BuildOptions,
    elements: &ElementData,
    materials: &MaterialData,
) -> Result<GammaData> {
    let conv_grid = LogGrid::new(2.0 * ELECTRON_MASS_C2, GAMMA_MAX_ENERGY, CONV_GRID_SIZE)?;
    let comp_grid = LogGrid::new(COMPTON_MIN_ENERGY, GAMMA_MAX_ENERGY, COMP_GRID_SIZE)?;
    let mut data = GammaData {
        num_materials: materials.len(),
        mac_xsec_data: Vec::with_capacity(2 * (CONV_GRID_SIZE + COMP_GRID_SIZE) * materials.len()),
        ..Default::default()
    };
    let selector_grid = xsec_grid(conv_grid.min(), conv_grid.max(), options.xsec_bins_per_decade)?;

    for mat in &materials.materials {
        let atoms: Vec<(f64, f64)> = mat
            .element_z
            .iter()
            .zip(&mat.atom_densities)
            .map(|(&iz, &n)| (elements.get(iz).z, n))
            .collect();
        let conv: Vec<f64> = conv_grid
            .energies()
            .iter()
            .map(|&e| atoms.iter().map(|&(z, n)| n * conversion_xsec_per_atom(z, e)).sum())
            .collect();
        data.mac_xsec_data
            .extend(prepare_spline_interleaved(conv_grid.energies(), &conv));
        let comp: Vec<f64> = comp_grid
            .energies()
            .iter()
            .map(|&e| atoms.iter().map(|&(z, n)| n * compton_xsec_per_atom(z, e)).sum())
            .collect();
        data.mac_xsec_data
            .extend(prepare_spline_interleaved(comp_grid.energies(), &comp));

        match &selector_grid {
            Some(grid) if atoms.len() > 1 => {
                // the relative weights below 1.5 MeV equal those at 1.5 MeV
                let cum = cumulative_rows(grid, atoms.len(), |e, w| {
                    let e = e.max(PAIR_PARAM_MIN_ENERGY);
                    for (wi, &(z, n)) in w.iter_mut().zip(&atoms) {
                        *wi = n * conversion_xsec_per_atom(z, e);
                    }
                });
                data.elem_selector_conv.push(grid, &cum);
            }
            _ => data.elem_selector_conv.push_single(),
        }
    }
    data.conv_grid = conv_grid;
    data.comp_grid = comp_grid;
    info!(materials = data.num_materials, "built gamma tables");
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::CLASSIC_ELECTR_RADIUS;
    use approx::assert_relative_eq;

    #[test]
    fn test_compton_per_electron_limit() {
        // Thomson limit per electron at low energy, before binding suppression
        let thomson = 8.0 / 3.0 * std::f64::consts::PI * CLASSIC_ELECTR_RADIUS * CLASSIC_ELECTR_RADIUS;
        let xs = compton_xsec_per_atom(8.0, 20.0e-3) / 8.0;
        assert!(xs < thomson && xs > 0.7 * thomson);
        // Klein-Nishina at 1 MeV: 0.2112 b per electron
        assert_relative_eq!(compton_xsec_per_atom(1.0, 1.0), 0.2112 * BARN, max_relative = 2.0e-2);
        // suppressed below the binding regime
        assert!(compton_xsec_per_atom(8.0, 1.0e-3) < compton_xsec_per_atom(8.0, 15.0e-3));
    }

    #[test]
    fn test_pair_cross_section() {
        assert_eq!(conversion_xsec_per_atom(82.0, 1.0), 0.0);
        let near = conversion_xsec_per_atom(82.0, 1.1);
        let mid = conversion_xsec_per_atom(82.0, 10.0);
        let high = conversion_xsec_per_atom(82.0, 1.0e4);
        assert!(near > 0.0 && near < mid && mid < high);
        // about 39 b for lead at 1 GeV
        assert_relative_eq!(conversion_xsec_per_atom(82.0, 1.0e3), 39.0 * BARN, max_relative = 5.0e-2);
        assert_eq!(
            conversion_xsec_per_atom(82.0, 1.0e6),
            conversion_xsec_per_atom(82.0, PAIR_PARAM_MAX_ENERGY)
        );
    }
}
