// e-/e+ tables: restricted stopping power, range, inverse range, restricted
// macroscopic cross sections, first transport cross section and element
// selectors

use crate::builder::BuildOptions;
use crate::constants::{
    CLASSIC_ELECTR_RADIUS, ELECTRON_MASS_C2, FINE_STRUCTURE_CONST, HBARC, LPM_CONSTANT, TWO_PI,
    TWO_PI_MC2_RCL2,
};
use crate::error::Result;
use crate::interactions::bremsstrahlung::{dxsec_per_atom, rel_dxsec_per_atom};
use crate::interactions::ionisation::max_energy_transfer;
use crate::parameters::Parameters;
use crate::tables::electron_data::XSEC_HEADER_LEN;
use crate::tables::{ElectronData, ElementData, ElementSelectors, ElemRecord, MatCutData, MatRecord, MaterialData};
use crate::utilities::{gl_integral, prepare_spline, prepare_spline_interleaved, LogGrid};
use std::f64::consts::{LN_10, PI};
use tracing::{debug, info};

/// 16 alpha r_e^2 / 3, the bremsstrahlung DCS prefactor [mm^2]
const BREM_FACTOR: f64 =
    16.0 * FINE_STRUCTURE_CONST * CLASSIC_ELECTR_RADIUS * CLASSIC_ELECTR_RADIUS / 3.0;

/// Gauss-Legendre points per decade of photon energy
const NUM_GL_BREM: usize = 8;
/// Gauss-Legendre points per range bin
const NUM_GL_RANGE: usize = 16;

/// Sternheimer density effect parameters derived from the plasma energy.
#[derive(Debug, Clone, Copy)]
pub struct DensityEffect {
    cbar: f64,
    x0: f64,
    x1: f64,
    a: f64,
}

impl DensityEffect {
    const M: i32 = 3;

    pub fn new(mat: &MatRecord) -> Self {
        let plasma_energy = (4.0 * PI * mat.electron_density * CLASSIC_ELECTR_RADIUS).sqrt() * HBARC;
        let cbar = 1.0 + 2.0 * (mat.mean_exc_energy / plasma_energy).ln();
        let is_gas = mat.density < 0.01;
        let (x0, x1) = if is_gas {
            match cbar {
                c if c < 10.0 => (1.6, 4.0),
                c if c < 10.5 => (1.7, 4.0),
                c if c < 11.0 => (1.8, 4.0),
                c if c < 11.5 => (1.9, 4.0),
                c if c < 12.25 => (2.0, 4.0),
                c if c < 13.804 => (2.0, 5.0),
                c => (0.326 * c - 2.5, 5.0),
            }
        } else if mat.mean_exc_energy < 100.0e-6 {
            (if cbar < 3.681 { 0.2 } else { 0.326 * cbar - 1.0 }, 2.0)
        } else {
            (if cbar < 5.215 { 0.2 } else { 0.326 * cbar - 1.5 }, 3.0)
        };
        let a = (cbar - 2.0 * LN_10 * x0) / (x1 - x0).powi(Self::M);
        DensityEffect { cbar, x0, x1, a }
    }

    /// delta(x) with x = log10(beta gamma).
    pub fn delta(&self, x: f64) -> f64 {
        if x < self.x0 {
            0.0
        } else if x < self.x1 {
            (2.0 * LN_10 * x - self.cbar + self.a * (self.x1 - x).powi(Self::M)).max(0.0)
        } else {
            2.0 * LN_10 * x - self.cbar
        }
    }
}

/// Restricted Berger-Seltzer stopping power of Moller (e-) or Bhabha (e+)
/// scattering below the production cut [MeV/mm].
pub fn ionisation_dedx(
    mat: &MatRecord,
    density: &DensityEffect,
    ekin: f64,
    el_cut: f64,
    is_electron: bool,
) -> f64 {
    // below th the low energy extrapolation applies
    let th = 0.25 * mat.z_eff.sqrt() * 1.0e-3;
    let tkin = ekin.max(th);
    let tau = tkin / ELECTRON_MASS_C2;
    let gam = tau + 1.0;
    let gamma2 = gam * gam;
    let bg2 = tau * (tau + 2.0);
    let beta2 = bg2 / gamma2;
    let eexc = mat.mean_exc_energy / ELECTRON_MASS_C2;
    let eexc2 = eexc * eexc;
    let d = el_cut.min(max_energy_transfer(tkin, is_electron)) / ELECTRON_MASS_C2;

    let mut dedx = if is_electron {
        (2.0 * (tau + 2.0) / eexc2).ln() - 1.0 - beta2
            + ((tau - d) * d).ln()
            + tau / (tau - d)
            + (0.5 * d * d + (2.0 * tau + 1.0) * (1.0 - d / tau).ln()) / gamma2
    } else {
        let d2 = 0.5 * d * d;
        let d3 = d2 * d / 1.5;
        let d4 = d3 * d * 0.75;
        let y = 1.0 / (1.0 + gam);
        (2.0 * (tau + 2.0) / eexc2).ln() + (tau * d).ln()
            - beta2 * (tau + 2.0 * d - y * (3.0 * d2 + y * (d - d3 + y * (d2 - tau * d3 + d4))))
                / tau
    };
    dedx -= density.delta(bg2.ln() / (2.0 * LN_10));
    dedx *= TWO_PI_MC2_RCL2 * mat.electron_density / beta2;
    dedx = dedx.max(0.0);
    if ekin < th {
        let x = ekin / th;
        if x > 0.25 {
            dedx /= x.sqrt();
        } else {
            dedx *= 1.4 * x.sqrt() / (0.1 + x);
        }
    }
    dedx
}

/// Moller (e-) or Bhabha (e+) cross section per electron above the cut [mm^2].
pub fn ionisation_xsec_per_electron(ekin: f64, el_cut: f64, is_electron: bool) -> f64 {
    let tmax = max_energy_transfer(ekin, is_electron);
    if el_cut >= tmax {
        return 0.0;
    }
    let xmin = el_cut / ekin;
    let xmax = tmax / ekin;
    let tau = ekin / ELECTRON_MASS_C2;
    let gam = tau + 1.0;
    let gamma2 = gam * gam;
    let beta2 = tau * (tau + 2.0) / gamma2;
    let cross = if is_electron {
        let gg = (2.0 * gam - 1.0) / gamma2;
        ((xmax - xmin)
            * (1.0 - gg + 1.0 / (xmin * xmax) + 1.0 / ((1.0 - xmin) * (1.0 - xmax)))
            - gg * (xmax * (1.0 - xmin) / (xmin * (1.0 - xmax))).ln())
            / beta2
    } else {
        let y = 1.0 / (1.0 + gam);
        let y2 = y * y;
        let y12 = 1.0 - 2.0 * y;
        let b1 = 2.0 - y2;
        let b2 = y12 * (3.0 + y2);
        let y122 = y12 * y12;
        let b4 = y122 * y12;
        let b3 = b4 + y122;
        (xmax - xmin)
            * (1.0 / (beta2 * xmin * xmax) + b2 - 0.5 * b3 * (xmin + xmax)
                + b4 * (xmin * xmin + xmin * xmax + xmax * xmax) / 3.0)
            - b1 * (xmax / xmin).ln()
    };
    (cross * TWO_PI_MC2_RCL2 / ekin).max(0.0)
}

/// `k dsigma/dk` per atom including dielectric suppression [mm^2]; the
/// relativistic (LPM) DCS is used above the model limit.
fn brem_k_dxsec(elem: &ElemRecord, mat: &MatRecord, ekin: f64, egamma: f64, is_rel: bool) -> f64 {
    let etot = ekin + ELECTRON_MASS_C2;
    let density_corr = mat.density_cor_factor * etot * etot;
    let k2 = egamma * egamma;
    let lpm_energy = LPM_CONSTANT * mat.radiation_length;
    let lpm_active = is_rel && etot > mat.density_cor_factor.sqrt() * lpm_energy;
    let dcs = if lpm_active {
        rel_dxsec_per_atom(elem, etot, egamma, lpm_energy, density_corr)
    } else {
        dxsec_per_atom(elem, etot, egamma)
    };
    BREM_FACTOR * elem.z * elem.z * dcs * k2 / (k2 + density_corr)
}

/// Integral of `f(k)` over `ln k` in `[kmin, kmax]`, split into decades.
fn integrate_log_k(kmin: f64, kmax: f64, mut f: impl FnMut(f64) -> f64) -> f64 {
    if kmax <= kmin {
        return 0.0;
    }
    let (lmin, lmax) = (kmin.ln(), kmax.ln());
    let nseg = ((lmax - lmin) / LN_10).ceil().max(1.0) as usize;
    let (x, w) = gl_integral(NUM_GL_BREM, 0.0, 1.0);
    let h = (lmax - lmin) / nseg as f64;
    let mut sum = 0.0;
    for s in 0..nseg {
        let a = lmin + s as f64 * h;
        for (xi, wi) in x.iter().zip(&w) {
            sum += wi * h * f((a + xi * h).exp());
        }
    }
    sum
}

/// Restricted radiative stopping power below the gamma cut [MeV/mm].
pub fn brem_dedx(elements: &ElementData, mat: &MatRecord, ekin: f64, gamma_cut: f64, model_lim: f64) -> f64 {
    let kmax = gamma_cut.min(ekin);
    let is_rel = ekin >= model_lim;
    mat.element_z
        .iter()
        .zip(&mat.atom_densities)
        .map(|(&iz, &n)| {
            let elem = elements.get(iz);
            n * integrate_log_k(1.0e-6 * kmax, kmax, |k| k * brem_k_dxsec(elem, mat, ekin, k, is_rel))
        })
        .sum()
}

/// Bremsstrahlung cross section per atom above the gamma cut [mm^2].
pub fn brem_xsec_per_atom(elem: &ElemRecord, mat: &MatRecord, ekin: f64, gamma_cut: f64, model_lim: f64) -> f64 {
    let is_rel = ekin >= model_lim;
    integrate_log_k(gamma_cut, ekin, |k| brem_k_dxsec(elem, mat, ekin, k, is_rel))
}

/// First transport cross section per atom of the screened Rutherford
/// scattering with the Moliere screening parameter [mm^2].
pub fn transport_xsec_per_atom(elem: &ElemRecord, ekin: f64) -> f64 {
    let pc2 = ekin * (ekin + 2.0 * ELECTRON_MASS_C2);
    let etot = ekin + ELECTRON_MASS_C2;
    let beta2 = pc2 / (etot * etot);
    let chi0 = FINE_STRUCTURE_CONST * ELECTRON_MASS_C2 * elem.z13 / 0.88534;
    let az = FINE_STRUCTURE_CONST * elem.z;
    let screening = 0.25 * chi0 * chi0 / pc2 * (1.13 + 3.76 * az * az / beta2);
    let rutherford = TWO_PI * elem.z * (elem.z + 1.0) * CLASSIC_ELECTR_RADIUS * CLASSIC_ELECTR_RADIUS
        * ELECTRON_MASS_C2 * ELECTRON_MASS_C2
        / (beta2 * pc2);
    rutherford * ((1.0 + 1.0 / screening).ln() - 1.0 / (1.0 + screening))
}

/// Log grid for a cross section table between `emin` and `emax`; `None`
/// when the interval is empty.
pub(crate) fn xsec_grid(emin: f64, emax: f64, bins_per_decade: usize) -> Result<Option<LogGrid>> {
    if emin >= emax * (1.0 - 1.0e-9) {
        return Ok(None);
    }
    let n = ((bins_per_decade as f64 * (emax / emin).log10()).ceil() as usize + 1).max(3);
    LogGrid::new(emin, emax, n).map(Some)
}

/// Row-major normalised cumulative weights, `n_elem - 1` values per row.
///
/// A row with no positive weight selects the first element.
pub(crate) fn cumulative_rows(grid: &LogGrid, num_elements: usize, mut weights: impl FnMut(f64, &mut [f64])) -> Vec<f64> {
    let stride = num_elements - 1;
    let mut out = Vec::with_capacity(grid.len() * stride);
    let mut w = vec![0.0; num_elements];
    for &e in grid.energies() {
        weights(e, &mut w);
        let total: f64 = w.iter().sum();
        let mut cum = 0.0;
        for &wi in &w[..stride] {
            cum += wi;
            out.push(if total > 0.0 { cum / total } else { 1.0 });
        }
    }
    out
}

/// Append one cross section sub-table `[n, E_max, xs_max, lnEmin, ILD, (E, xs, xs'')...]`.
fn push_xsec_table(out: &mut Vec<f64>, grid: Option<&LogGrid>, mut xsec: impl FnMut(f64) -> f64) {
    let Some(grid) = grid else {
        out.extend([0.0; XSEC_HEADER_LEN]);
        return;
    };
    let energies = grid.energies();
    let xs: Vec<f64> = energies.iter().map(|&e| xsec(e).max(0.0)).collect();
    let sd = prepare_spline(energies, &xs);
    let imax = xs
        .iter()
        .enumerate()
        .fold(0, |best, (i, &v)| if v > xs[best] { i } else { best });
    out.extend([
        grid.len() as f64,
        energies[imax],
        xs[imax],
        grid.log_min(),
        grid.inv_log_delta(),
    ]);
    for i in 0..grid.len() {
        out.extend([energies[i], xs[i], sd[i]]);
    }
}

/// Restricted range by Gauss-Legendre integration of `1 / (dE/dx)`.
fn integrate_range(grid: &LogGrid, dedx: &[f64], dedx_sd: &[f64]) -> Vec<f64> {
    let energies = grid.energies();
    let mut range = Vec::with_capacity(energies.len());
    // dE/dx ~ sqrt(E) below the first node
    range.push(2.0 * energies[0] / dedx[0].max(f64::MIN_POSITIVE));
    for i in 1..energies.len() {
        let (x, w) = gl_integral(NUM_GL_RANGE, energies[i - 1], energies[i]);
        let sum: f64 = x
            .iter()
            .zip(&w)
            .map(|(&e, &wi)| wi / grid.spline(dedx, dedx_sd, e, e.ln()).max(f64::MIN_POSITIVE))
            .sum();
        range.push(range[i - 1] + sum);
    }
    range
}

/// Build the tables of e- (`is_electron`) or e+ for every material-cut.
pub fn build_electron_data(
    params: &Parameters,
    options: &BuildOptions,
    elements: &ElementData,
    materials: &MaterialData,
    mat_cuts: &MatCutData,
    is_electron: bool,
) -> Result<ElectronData> {
    let name = if is_electron { "e-" } else { "e+" };
    let grid = LogGrid::new(
        params.min_loss_table_energy,
        params.max_loss_table_energy,
        params.num_loss_table_energies(),
    )?;
    let n = grid.len();
    let emax = grid.max();
    let model_lim = params.electron_brem_model_lim;
    let mut data = ElectronData {
        num_mat_cuts: mat_cuts.len(),
        num_materials: materials.len(),
        eloss_data: Vec::with_capacity(5 * n * mat_cuts.len()),
        ..Default::default()
    };

    for (imc, mc) in mat_cuts.mat_cuts.iter().enumerate() {
        let mat = materials.get(mc.mat_index);
        let density = DensityEffect::new(mat);
        let el_cut = mc.sec_el_prod_cut;
        let gamma_cut = mc.sec_gam_prod_cut;

        // energy loss
        let dedx: Vec<f64> = grid
            .energies()
            .iter()
            .map(|&e| {
                let ioni = ionisation_dedx(mat, &density, e, el_cut, is_electron);
                let brem = if options.bremsstrahlung {
                    brem_dedx(elements, mat, e, gamma_cut, model_lim)
                } else {
                    0.0
                };
                ioni + brem
            })
            .collect();
        let dedx_sd = prepare_spline(grid.energies(), &dedx);
        let range = integrate_range(&grid, &dedx, &dedx_sd);
        let range_sd = prepare_spline(grid.energies(), &range);
        let inv_range_sd = prepare_spline(&range, grid.energies());
        data.eloss_data.extend_from_slice(&range);
        data.eloss_data.extend(range_sd);
        data.eloss_data.extend_from_slice(&dedx);
        data.eloss_data.extend(dedx_sd);
        data.eloss_data.extend(inv_range_sd);

        // restricted cross sections
        data.res_mac_xsec_start.push(data.res_mac_xsec_data.len());
        let ioni_min = if is_electron { 2.0 * el_cut } else { el_cut }.max(grid.min());
        let ioni_grid = xsec_grid(ioni_min, emax, options.xsec_bins_per_decade)?;
        push_xsec_table(&mut data.res_mac_xsec_data, ioni_grid.as_ref(), |e| {
            mat.electron_density * ionisation_xsec_per_electron(e, el_cut, is_electron)
        });
        let brem_grid = if options.bremsstrahlung {
            xsec_grid(gamma_cut.max(grid.min()), emax, options.xsec_bins_per_decade)?
        } else {
            None
        };
        push_xsec_table(&mut data.res_mac_xsec_data, brem_grid.as_ref(), |e| {
            mat.element_z
                .iter()
                .zip(&mat.atom_densities)
                .map(|(&iz, &n)| n * brem_xsec_per_atom(elements.get(iz), mat, e, gamma_cut, model_lim))
                .sum()
        });

        // element selectors
        let nel = mat.num_elements();
        match (&ioni_grid, nel > 1) {
            (Some(g), true) => {
                let cum = cumulative_rows(g, nel, |_, w| {
                    for (wi, (&iz, &n)) in w.iter_mut().zip(mat.element_z.iter().zip(&mat.atom_densities)) {
                        *wi = n * iz as f64;
                    }
                });
                data.elem_selector_ioni.push(g, &cum);
            }
            _ => data.elem_selector_ioni.push_single(),
        }
        let sb_range = (gamma_cut.max(grid.min()), model_lim.min(emax));
        let rb_range = (gamma_cut.max(model_lim), emax);
        for (selector, (lo, hi)) in [
            (&mut data.elem_selector_brem_sb, sb_range),
            (&mut data.elem_selector_brem_rb, rb_range),
        ] {
            let g = if options.bremsstrahlung && nel > 1 {
                xsec_grid(lo, hi, options.xsec_bins_per_decade)?
            } else {
                None
            };
            push_brem_selector(selector, g.as_ref(), elements, mat, gamma_cut, model_lim);
        }
        debug!(particle = name, imc, material = %mat.name, "built energy loss and cross section tables");
    }

    // first transport cross section per material
    for mat in &materials.materials {
        let xs: Vec<f64> = grid
            .energies()
            .iter()
            .map(|&e| {
                mat.element_z
                    .iter()
                    .zip(&mat.atom_densities)
                    .map(|(&iz, &n)| n * transport_xsec_per_atom(elements.get(iz), e))
                    .sum()
            })
            .collect();
        data.tr1_mac_xsec_data
            .extend(prepare_spline_interleaved(grid.energies(), &xs));
    }
    data.eloss_grid = grid;
    info!(particle = name, mat_cuts = data.num_mat_cuts, "built e-/e+ tables");
    Ok(data)
}

fn push_brem_selector(
    selector: &mut ElementSelectors,
    grid: Option<&LogGrid>,
    elements: &ElementData,
    mat: &MatRecord,
    gamma_cut: f64,
    model_lim: f64,
) {
    let Some(grid) = grid else {
        selector.push_single();
        return;
    };
    let cum = cumulative_rows(grid, mat.num_elements(), |e, w| {
        for (wi, (&iz, &n)) in w.iter_mut().zip(mat.element_z.iter().zip(&mat.atom_densities)) {
            *wi = n * brem_xsec_per_atom(elements.get(iz), mat, e, gamma_cut, model_lim);
        }
    });
    selector.push(grid, &cum);
}
