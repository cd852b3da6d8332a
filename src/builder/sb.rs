// Photon energy sampling tables of the low energy bremsstrahlung model,
// tabulated from the screened Bethe-Heitler DCS

use crate::builder::electron::xsec_grid;
use crate::constants::ELECTRON_MASS_C2;
use crate::error::Result;
use crate::interactions::bremsstrahlung::dxsec_per_atom;
use crate::tables::{ElementData, ElemRecord, MatCutData, MaterialData, SbTableData};
use crate::utilities::LogGrid;
use tracing::{debug, info};

/// Lowest electron energy of the tables [MeV]
pub const SB_MIN_ENERGY: f64 = 1.0e-3;
/// Smallest tabulated kappa = k / E
const KAPPA_MIN: f64 = 1.0e-8;
const KAPPA_PER_DECADE: usize = 6;
const ENERGY_BINS_PER_DECADE: usize = 7;

/// `ln kappa` nodes from `ln KAPPA_MIN` to 0.
fn log_kappa_grid() -> Vec<f64> {
    let decades = -KAPPA_MIN.log10();
    let nk = (decades * KAPPA_PER_DECADE as f64).round() as usize + 1;
    let lmin = KAPPA_MIN.ln();
    let mut lk: Vec<f64> = (0..nk)
        .map(|j| lmin * (1.0 - j as f64 / (nk - 1) as f64))
        .collect();
    lk[nk - 1] = 0.0;
    lk
}

/// Normalised density and cumulative in `ln kappa` at one electron energy,
/// as `(cumulative, chi, chi_next - chi)` triplets.
fn energy_node(elem: &ElemRecord, ekin: f64, log_kappas: &[f64]) -> Vec<f64> {
    let etot = ekin + ELECTRON_MASS_C2;
    let chi: Vec<f64> = log_kappas
        .iter()
        .map(|&lk| dxsec_per_atom(elem, etot, lk.exp() * ekin))
        .collect();
    let mut cum = vec![0.0; chi.len()];
    for j in 1..chi.len() {
        let h = log_kappas[j] - log_kappas[j - 1];
        cum[j] = cum[j - 1] + 0.5 * h * (chi[j - 1] + chi[j]);
    }
    let total = cum[chi.len() - 1];
    let norm = if total > 0.0 { 1.0 / total } else { 0.0 };
    let mut nodes = Vec::with_capacity(3 * chi.len());
    for j in 0..chi.len() {
        let next = if j + 1 < chi.len() { chi[j + 1] } else { chi[j] };
        nodes.extend([cum[j] * norm, chi[j] * norm, (next - chi[j]) * norm]);
    }
    nodes
}

/// `(start bin, cumulative at the cut)` of one energy node, or `(-1, 0)`
/// when the cut is at or above the electron energy.
fn cut_entry(log_kappas: &[f64], nodes: &[f64], kappa_cut: f64) -> [f64; 2] {
    if kappa_cut >= 1.0 {
        return [-1.0, 0.0];
    }
    let lkc = kappa_cut.ln();
    if lkc <= log_kappas[0] {
        return [0.0, 0.0];
    }
    let nk = log_kappas.len();
    let j = log_kappas[..nk - 1]
        .iter()
        .rposition(|&lk| lk <= lkc)
        .unwrap_or(0);
    let h = log_kappas[j + 1] - log_kappas[j];
    let t = (lkc - log_kappas[j]) / h;
    let cum = nodes[3 * j] + h * t * (nodes[3 * j + 1] + 0.5 * t * nodes[3 * j + 2]);
    [j as f64, cum.min(1.0)]
}

/// Build the sampling tables of every element used by a material-cut.
pub fn build_sb_tables(
    elements: &ElementData,
    materials: &MaterialData,
    mat_cuts: &MatCutData,
    model_lim: f64,
) -> Result<SbTableData> {
    let mut data = SbTableData::default();

    // distinct gamma cuts per element
    let mut cuts_of: Vec<Vec<f64>> = vec![Vec::new(); data.elem_start.len()];
    for mc in &mat_cuts.mat_cuts {
        for &iz in &materials.get(mc.mat_index).element_z {
            let cuts = &mut cuts_of[iz];
            if !cuts.contains(&mc.sec_gam_prod_cut) {
                cuts.push(mc.sec_gam_prod_cut);
            }
        }
    }
    for mc in &mat_cuts.mat_cuts {
        data.gamma_cut_start.push(data.gamma_cut_indices.len());
        for &iz in &materials.get(mc.mat_index).element_z {
            let row = cuts_of[iz]
                .iter()
                .position(|&c| c == mc.sec_gam_prod_cut)
                .unwrap_or(0);
            data.gamma_cut_indices.push(row);
        }
    }

    let Some(grid) = xsec_grid(SB_MIN_ENERGY, model_lim, ENERGY_BINS_PER_DECADE)? else {
        debug!(model_lim, "bremsstrahlung model limit below the sampling tables");
        return Ok(data);
    };
    let log_kappas = log_kappa_grid();
    for (iz, cuts) in cuts_of.iter().enumerate() {
        if cuts.is_empty() {
            continue;
        }
        push_element(&mut data, elements.get(iz), &grid, &log_kappas, cuts)?;
    }
    info!(
        elements = cuts_of.iter().filter(|c| !c.is_empty()).count(),
        energies = grid.len(),
        kappas = log_kappas.len(),
        "built bremsstrahlung sampling tables"
    );
    Ok(data)
}

fn push_element(
    data: &mut SbTableData,
    elem: &ElemRecord,
    grid: &LogGrid,
    log_kappas: &[f64],
    cuts: &[f64],
) -> Result<()> {
    let nodes: Vec<f64> = grid
        .energies()
        .iter()
        .flat_map(|&e| energy_node(elem, e, log_kappas))
        .collect();
    let stride = 3 * log_kappas.len();
    let mut cut_rows = Vec::with_capacity(2 * cuts.len() * grid.len());
    for &cut in cuts {
        for (ie, &e) in grid.energies().iter().enumerate() {
            let node = &nodes[ie * stride..(ie + 1) * stride];
            cut_rows.extend(cut_entry(log_kappas, node, cut / e));
        }
    }
    data.push_element(
        elem.iz(),
        grid.log_min(),
        grid.inv_log_delta(),
        grid.len(),
        log_kappas,
        &cut_rows,
        &nodes,
    )
}
