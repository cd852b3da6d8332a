// Bremsstrahlung of e-/e+: Seltzer-Berger tables at low energy, screened
// Bethe-Heitler with LPM suppression (relativistic model) at high energy.

use crate::constants::{ELECTRON_MASS_C2, FINE_STRUCTURE_CONST, LPM_CONSTANT, TWO_PI};
use crate::interactions::rotation::{deflect, momentum_balance, sample_modified_tsai_cost};
use crate::random::RandomEngine;
use crate::tables::{ElectronData, ElemRecord, MatRecord, SbTableData};
use std::f64::consts::{PI, SQRT_2};

/// Final state of a bremsstrahlung interaction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BremOutcome {
    pub gamma_ekin: f64,
    pub gamma_dir: [f64; 3],
    pub primary_ekin: f64,
    pub primary_dir: [f64; 3],
}

/// Position, in its material, of the target element.
pub fn select_element(
    data: &ElectronData,
    mat: &MatRecord,
    imc: usize,
    log_ekin: f64,
    is_sb: bool,
    rng: &mut impl RandomEngine,
) -> usize {
    let selector = if is_sb {
        &data.elem_selector_brem_sb
    } else {
        &data.elem_selector_brem_rb
    };
    selector.select(imc, mat.num_elements(), log_ekin, rng.flat())
}

/// Emitted photon energy from the Seltzer-Berger sampling tables.
///
/// The table node is chosen by statistical interpolation in ln E; the
/// sampled kappa is scaled by the actual energy and rejected below the cut,
/// by dielectric suppression and, for e+, by the positron correction.
#[allow(clippy::too_many_arguments)]
pub fn sample_energy_transfer_sb(
    sb: &SbTableData,
    elem: &ElemRecord,
    cut_row: usize,
    mat: &MatRecord,
    ekin: f64,
    log_ekin: f64,
    gamma_cut: f64,
    is_electron: bool,
    rng: &mut impl RandomEngine,
) -> f64 {
    let etot = ekin + ELECTRON_MASS_C2;
    let density_corr = mat.density_cor_factor * etot * etot;
    let Some(block) = sb.block(elem.iz()) else {
        // untabulated element: plain 1/k spectrum
        return gamma_cut * (ekin / gamma_cut).powf(rng.flat());
    };
    let ne = block.num_energies();
    let pos = ((log_ekin - block.log_min()) * block.inv_log_delta()).clamp(0.0, (ne - 1) as f64);
    let ilow = (pos as usize).min(ne - 2);
    let frac = pos - ilow as f64;
    let mut ie = if rng.flat() < frac { ilow + 1 } else { ilow };
    if block.cut_entry(cut_row, ie).is_none() {
        ie = ilow + 1;
    }
    let inv_beta1 = if is_electron {
        0.0
    } else {
        inverse_beta(ekin - gamma_cut)
    };
    let mut rndm = [0.0; 3];
    loop {
        rng.flat_array(&mut rndm);
        let Some(log_kappa) = block.sample_log_kappa(cut_row, ie, rndm[0]) else {
            return gamma_cut * (ekin / gamma_cut).powf(rndm[0]);
        };
        let egamma = log_kappa.exp() * ekin;
        if egamma < gamma_cut || egamma > ekin {
            continue;
        }
        let k2 = egamma * egamma;
        if rndm[1] > k2 / (k2 + density_corr) {
            continue;
        }
        if !is_electron {
            let dum = TWO_PI * FINE_STRUCTURE_CONST * elem.z * (inv_beta1 - inverse_beta(ekin - egamma));
            if dum < -12.0 || rndm[2] > dum.exp() {
                continue;
            }
        }
        return egamma;
    }
}

#[inline]
fn inverse_beta(ekin: f64) -> f64 {
    (ekin + ELECTRON_MASS_C2) / (ekin * (ekin + 2.0 * ELECTRON_MASS_C2)).sqrt()
}

/// Tsai's screening functions `(phi1, phi1 - phi2, psi1, psi1 - psi2)`.
#[inline]
pub fn screening_functions(gam: f64, eps: f64) -> (f64, f64, f64, f64) {
    let gam2 = gam * gam;
    let phi1 = 16.863 - 2.0 * (1.0 + 0.311877 * gam2).ln()
        + 2.4 * (-0.9 * gam).exp()
        + 1.6 * (-1.5 * gam).exp();
    let phi1m2 = 2.0 / (3.0 * (1.0 + 6.5 * gam + 6.0 * gam2));
    let eps2 = eps * eps;
    let psi1 = 24.34 - 2.0 * (1.0 + 13.111641 * eps2).ln()
        + 2.8 * (-8.0 * eps).exp()
        + 1.2 * (-29.2 * eps).exp();
    let psi1m2 = 2.0 / (3.0 * (1.0 + 40.0 * eps + 400.0 * eps2));
    (phi1, phi1m2, psi1, psi1m2)
}

/// `(1 + 1/Z) / 12`, the electron-electron bremsstrahlung factor.
#[inline]
pub fn z_factor2(z: f64) -> f64 {
    (1.0 + 1.0 / z) / 12.0
}

/// Screened Bethe-Heitler DCS per atom, `k dsigma/dk` up to a constant.
pub fn dxsec_per_atom(elem: &ElemRecord, etot: f64, egamma: f64) -> f64 {
    let y = egamma / etot;
    let onemy = 1.0 - y;
    let dxsec = if elem.iz() < 5 {
        (onemy + 0.75 * y * y) * elem.z_factor1 + onemy * z_factor2(elem.z)
    } else {
        let inv_z = 1.0 / elem.z;
        let fz = elem.log_z / 3.0 + elem.coulomb;
        let dum1 = y / (etot - egamma);
        let gam = dum1 * 100.0 * ELECTRON_MASS_C2 / elem.z13;
        let eps = dum1 * 100.0 * ELECTRON_MASS_C2 / elem.z23;
        let (phi1, phi1m2, psi1, psi1m2) = screening_functions(gam, eps);
        (onemy + 0.75 * y * y) * ((0.25 * phi1 - fz) + (0.25 * psi1 - 2.0 * elem.log_z / 3.0) * inv_z)
            + 0.125 * onemy * (phi1m2 + psi1m2 * inv_z)
    };
    dxsec.max(0.0)
}

/// LPM suppression functions `(G(s), phi(s))` in Stanev's approximation.
pub fn lpm_g_phi(s: f64) -> (f64, f64) {
    if s < 0.01 {
        let phi = 6.0 * s * (1.0 - PI * s);
        return (12.0 * s - 2.0 * phi, phi);
    }
    let s2 = s * s;
    let s3 = s * s2;
    let s4 = s2 * s2;
    let stanev_g = || {
        (-0.160723 + 3.755030 * s - 1.798138 * s2 + 0.672827 * s3 - 0.120772 * s4).tanh()
    };
    let stanev_phi = || {
        1.0 - (-6.0 * s * (1.0 + s * (3.0 - PI)) + s3 / (0.623 + 0.796 * s + 0.658 * s2)).exp()
    };
    if s < 0.415827 {
        let phi = stanev_phi();
        let psi = 1.0
            - (-4.0 * s - 8.0 * s2 / (1.0 + 3.936 * s + 4.97 * s2 - 0.05 * s3 + 7.5 * s4)).exp();
        (3.0 * psi - 2.0 * phi, phi)
    } else if s < 1.55 {
        (stanev_g(), stanev_phi())
    } else {
        let phi = 1.0 - 0.01190476 / s4;
        let g = if s < 1.9156 { stanev_g() } else { 1.0 - 0.0230655 / s4 };
        (g, phi)
    }
}

/// LPM and dielectric suppressed DCS per atom, `k dsigma/dk` up to a constant.
pub fn rel_dxsec_per_atom(
    elem: &ElemRecord,
    etot: f64,
    egamma: f64,
    lpm_energy: f64,
    density_corr: f64,
) -> f64 {
    let y = egamma / etot;
    let onemy = 1.0 - y;
    let dum0 = 0.25 * y * y;

    let var_s_prime = (0.125 * y * lpm_energy / (onemy * etot)).sqrt();
    let var_s1 = elem.var_s1();
    let mut xi_s_prime = 2.0;
    if var_s_prime > 1.0 {
        xi_s_prime = 1.0;
    } else if var_s_prime > SQRT_2 * var_s1 {
        let h = var_s_prime.ln() * elem.il_var_s1_cond;
        xi_s_prime = 1.0 + h - 0.08 * (1.0 - h) * h * (2.0 - h) * elem.il_var_s1_cond;
    }
    let var_s = var_s_prime / xi_s_prime.sqrt();
    // dielectric suppression enters through s
    let var_s_hat = var_s * (1.0 + density_corr / (egamma * egamma));
    let mut xi_s = 2.0;
    if var_s_hat > 1.0 {
        xi_s = 1.0;
    } else if var_s_hat > var_s1 {
        xi_s = 1.0 + var_s_hat.ln() * elem.il_var_s1;
    }
    let (g_s, phi_s) = lpm_g_phi(var_s_hat);
    if xi_s * phi_s > 1.0 || var_s_hat > 0.57 {
        xi_s = 1.0 / phi_s;
    }
    let term1 = xi_s * (dum0 * g_s + (onemy + 2.0 * dum0) * phi_s);
    (term1 * elem.z_factor1 + onemy * z_factor2(elem.z)).max(0.0)
}

/// Emitted photon energy from the relativistic model, sampled in
/// `ln(k^2 + k_p^2)` with rejection against the DCS maximum.
pub fn sample_energy_transfer_rb(
    elem: &ElemRecord,
    mat: &MatRecord,
    ekin: f64,
    gamma_cut: f64,
    rng: &mut impl RandomEngine,
) -> f64 {
    let etot = ekin + ELECTRON_MASS_C2;
    let density_factor = mat.density_cor_factor;
    let density_corr = density_factor * etot * etot;
    let lpm_energy = LPM_CONSTANT * mat.radiation_length;
    let is_lpm_active = etot > density_factor.sqrt() * lpm_energy;
    let func_max = elem.z_factor1 + z_factor2(elem.z);

    let xmin = (gamma_cut * gamma_cut + density_corr).ln();
    let xrange = (ekin * ekin + density_corr).ln() - xmin;
    let mut rndm = [0.0; 2];
    loop {
        rng.flat_array(&mut rndm);
        let egamma = ((xmin + rndm[0] * xrange).exp() - density_corr).max(0.0).sqrt();
        let func = if is_lpm_active {
            rel_dxsec_per_atom(elem, etot, egamma, lpm_energy, density_corr)
        } else {
            dxsec_per_atom(elem, etot, egamma)
        };
        if func >= func_max * rndm[1] {
            return egamma;
        }
    }
}

/// Photon and primary directions; the photon angle follows the modified
/// Tsai distribution, the primary conserves momentum.
pub fn sample_directions(
    ekin: f64,
    egamma: f64,
    primary_dir: &[f64; 3],
    rng: &mut impl RandomEngine,
) -> ([f64; 3], [f64; 3]) {
    let cost = sample_modified_tsai_cost(ekin, rng);
    let gamma_dir = deflect(primary_dir, cost, TWO_PI * rng.flat());
    let p0 = (ekin * (ekin + 2.0 * ELECTRON_MASS_C2)).sqrt();
    let primary_dir = momentum_balance(p0, primary_dir, egamma, &gamma_dir);
    (gamma_dir, primary_dir)
}

/// Assemble the final state for a sampled photon energy.
pub fn final_state(
    ekin: f64,
    egamma: f64,
    primary_dir: &[f64; 3],
    rng: &mut impl RandomEngine,
) -> BremOutcome {
    let (gamma_dir, new_dir) = sample_directions(ekin, egamma, primary_dir, rng);
    BremOutcome {
        gamma_ekin: egamma,
        gamma_dir,
        primary_ekin: ekin - egamma,
        primary_dir: new_dir,
    }
}
