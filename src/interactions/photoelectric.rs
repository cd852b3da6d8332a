// Photoelectric absorption with Sandia cross sections and Sauter-Gavrila
// photoelectron angles

use crate::constants::{ELECTRON_MASS_C2, SECONDARY_MIN_ENERGY, TWO_PI};
use crate::interactions::rotation::deflect;
use crate::random::RandomEngine;
use crate::tables::{ElementData, ElemRecord, MatRecord};

/// Above this photon energy the photoelectron keeps the photon direction [MeV]
const SAUTER_GAVRILA_MAX_ENERGY: f64 = 100.0;

/// Final state of a photo-absorption; the gamma is always absorbed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhotoelectricOutcome {
    pub electron_ekin: f64,
    pub electron_dir: [f64; 3],
    /// Binding energy and sub-threshold electron energy deposited locally
    pub energy_deposit: f64,
}

/// Position of the target element, sampled according to `n_i sigma_i(E)`.
pub fn select_element(
    elements: &ElementData,
    mat: &MatRecord,
    egamma: f64,
    rng: &mut impl RandomEngine,
) -> usize {
    let nel = mat.num_elements();
    if nel < 2 {
        return 0;
    }
    let total = mat.photoelectric_mac_xsec(egamma);
    if total <= 0.0 {
        return 0;
    }
    let target = rng.flat() * total;
    let mut sum = 0.0;
    for (i, (&iz, &n)) in mat.element_z.iter().zip(&mat.atom_densities).enumerate() {
        sum += n * elements.get(iz).photoelectric_xsec(egamma);
        if target < sum {
            return i;
        }
    }
    nel - 1
}

/// Binding energy of the ionised shell: the K shell when open, otherwise the
/// highest absorption edge below the photon energy.
pub fn binding_energy(elem: &ElemRecord, egamma: f64) -> f64 {
    if egamma >= elem.k_shell_binding_energy {
        return elem.k_shell_binding_energy;
    }
    elem.sandia_energies
        .iter()
        .copied()
        .filter(|&edge| edge <= egamma)
        .fold(0.0, f64::max)
}

/// Polar cosine of the photoelectron (Sauter-Gavrila, K-shell).
pub fn sample_sauter_gavrila_cost(ekin: f64, rng: &mut impl RandomEngine) -> f64 {
    let energy = ekin.max(1.0e-6);
    let tau = energy / ELECTRON_MASS_C2;
    let gamma = 1.0 + tau;
    let beta = (tau * (tau + 2.0)).sqrt() / gamma;
    let ac = (1.0 - beta) / beta;
    let a1 = 0.5 * beta * gamma * tau * (gamma - 2.0);
    let a2 = ac + 2.0;
    let gtmax = 2.0 * (a1 + 1.0 / ac);
    loop {
        let r = rng.flat();
        let tsam = 2.0 * ac * (2.0 * r + a2 * r.sqrt()) / (a2 * a2 - 4.0 * r);
        let gtr = (2.0 - tsam) * (a1 + 1.0 / (ac + tsam));
        if rng.flat() * gtmax <= gtr {
            return (1.0 - tsam).clamp(-1.0, 1.0);
        }
    }
}

/// Absorb a photon of energy `egamma` on `elem`.
pub fn sample(
    elem: &ElemRecord,
    egamma: f64,
    dir: &[f64; 3],
    rng: &mut impl RandomEngine,
) -> PhotoelectricOutcome {
    let bind = binding_energy(elem, egamma).min(egamma);
    let ekin = egamma - bind;
    if ekin <= SECONDARY_MIN_ENERGY {
        return PhotoelectricOutcome {
            electron_ekin: 0.0,
            electron_dir: *dir,
            energy_deposit: egamma,
        };
    }
    let electron_dir = if egamma > SAUTER_GAVRILA_MAX_ENERGY {
        *dir
    } else {
        let cost = sample_sauter_gavrila_cost(egamma, rng);
        deflect(dir, cost, TWO_PI * rng.flat())
    };
    PhotoelectricOutcome {
        electron_ekin: ekin,
        electron_dir,
        energy_deposit: bind,
    }
}
