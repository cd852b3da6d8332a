// Element and material records from composition and density

use crate::builder::data::{ElementProperties, ELEMENTS};
use crate::builder::MaterialSpec;
use crate::constants::{
    AVOGADRO, CLASSIC_ELECTR_RADIUS, FINE_STRUCTURE_CONST, MIGDAL_CONSTANT,
};
use crate::error::{KernelError, Result};
use crate::tables::element::{coulomb_correction, radiation_logs, ElemRecord, MAX_Z};
use crate::tables::{ElementData, MatRecord};
use tracing::debug;

/// Lowest edge of the photo-absorption fits [MeV]
pub const SANDIA_MIN_ENERGY: f64 = 10.0e-6;

/// Normalisation of the `Z^4 / E^3` photo-absorption fit above the K edge [mm^2 MeV^3]
const PHOTO_ABSORPTION_NORM: f64 = 3.96e-30;

/// Properties of element `iz` from the static database.
pub fn element_properties(iz: usize) -> Result<&'static ElementProperties> {
    ELEMENTS
        .get(&iz)
        .ok_or_else(|| KernelError::UnknownElement(format!("Z = {iz}")))
}

/// Ratio of the photo-absorption cross sections just above and below the K edge.
#[inline]
fn k_edge_jump(z: f64) -> f64 {
    125.0 / z + 3.5
}

/// Element record with a two interval `a3 / E^3` photo-absorption fit, the
/// interval boundary sitting at the K edge.
pub fn build_element(iz: usize) -> Result<ElemRecord> {
    if iz == 0 || iz > MAX_Z {
        return Err(KernelError::UnknownElement(format!("Z = {iz}")));
    }
    let props = element_properties(iz)?;
    let z = iz as f64;
    let above = PHOTO_ABSORPTION_NORM * z.powi(4);
    let k_edge = props.k_shell_binding_energy.max(SANDIA_MIN_ENERGY * 1.01);
    let edges = vec![SANDIA_MIN_ENERGY, k_edge];
    let coefficients = vec![
        0.0,
        0.0,
        above / k_edge_jump(z),
        0.0,
        0.0,
        0.0,
        above,
        0.0,
    ];
    Ok(ElemRecord::new(iz, edges, coefficients, props.k_shell_binding_energy))
}

/// Index of the interval of `edges` that contains `e`.
fn interval_of(edges: &[f64], e: f64) -> usize {
    edges.iter().rposition(|&edge| edge <= e).unwrap_or(0)
}

/// Material photo-absorption fit: the union of the element edges, with the
/// atom-density weighted sum of the element coefficients in every interval.
fn material_sandia(elements: &[&ElemRecord], atom_densities: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let mut edges: Vec<f64> = elements
        .iter()
        .flat_map(|el| el.sandia_energies.iter().copied())
        .collect();
    edges.sort_by(f64::total_cmp);
    edges.dedup();
    let mut coefficients = vec![0.0; 4 * edges.len()];
    for (j, &edge) in edges.iter().enumerate() {
        for (el, &n) in elements.iter().zip(atom_densities) {
            if el.sandia_energies.is_empty() || edge < el.sandia_energies[0] {
                continue;
            }
            let k = interval_of(&el.sandia_energies, edge);
            for c in 0..4 {
                coefficients[4 * j + c] += n * el.sandia_coefficients[4 * k + c];
            }
        }
    }
    (edges, coefficients)
}

/// Build a material record; the elements must already be in `elements`.
pub fn build_material(spec: &MaterialSpec, elements: &ElementData) -> Result<MatRecord> {
    if spec.composition.is_empty() {
        return Err(KernelError::UnknownMaterial(format!(
            "{} has no elements",
            spec.name
        )));
    }
    if !(spec.density > 0.0) {
        return Err(KernelError::invalid_parameter(
            "density",
            format!("{} has density {}", spec.name, spec.density),
        ));
    }
    let total_fraction: f64 = spec.composition.iter().map(|&(_, w)| w).sum();
    if !(total_fraction > 0.0) {
        return Err(KernelError::invalid_parameter(
            "composition",
            format!("mass fractions of {} do not sum to a positive value", spec.name),
        ));
    }

    let mut element_z = Vec::with_capacity(spec.composition.len());
    let mut atom_densities = Vec::with_capacity(spec.composition.len());
    let mut z_eff = 0.0;
    for &(iz, fraction) in &spec.composition {
        let props = element_properties(iz)?;
        let w = fraction / total_fraction;
        // g/cm^3 -> g/mm^3
        let n = spec.density * 1.0e-3 * AVOGADRO * w / props.atomic_mass;
        element_z.push(iz);
        atom_densities.push(n);
        z_eff += w * iz as f64;
    }

    let electron_density: f64 = element_z
        .iter()
        .zip(&atom_densities)
        .map(|(&iz, &n)| n * iz as f64)
        .sum();

    let mean_exc_energy = match spec.mean_exc_energy {
        Some(i) => i,
        None => {
            // Bragg additivity
            let mut log_i = 0.0;
            for (&iz, &n) in element_z.iter().zip(&atom_densities) {
                log_i += n * iz as f64 * element_properties(iz)?.mean_exc_energy.ln();
            }
            (log_i / electron_density).exp()
        }
    };

    let mut inv_x0 = 0.0;
    for (&iz, &n) in element_z.iter().zip(&atom_densities) {
        let z = iz as f64;
        let (lrad, lprad) = radiation_logs(iz);
        inv_x0 += n * 4.0 * FINE_STRUCTURE_CONST * CLASSIC_ELECTR_RADIUS * CLASSIC_ELECTR_RADIUS
            * (z * z * (lrad - coulomb_correction(z)) + z * lprad);
    }

    let records: Vec<&ElemRecord> = element_z.iter().map(|&iz| elements.get(iz)).collect();
    let (sandia_energies, sandia_coefficients) = material_sandia(&records, &atom_densities);

    let mut mat = MatRecord {
        name: spec.name.clone(),
        element_z,
        atom_densities,
        density: spec.density,
        density_cor_factor: MIGDAL_CONSTANT * electron_density,
        electron_density,
        radiation_length: 1.0 / inv_x0,
        mean_exc_energy,
        sandia_energies,
        sandia_coefficients,
        z_eff,
        ..Default::default()
    };
    mat.set_urban_msc_parameters();
    debug!(
        material = %mat.name,
        radiation_length_mm = mat.radiation_length,
        electron_density = mat.electron_density,
        "built material"
    );
    Ok(mat)
}
