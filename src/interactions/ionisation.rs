// Moller (e-) and Bhabha (e+) delta-ray production above the production cut

use crate::constants::{ELECTRON_MASS_C2, TWO_PI};
use crate::interactions::rotation::{deflect, momentum_balance};
use crate::random::RandomEngine;

/// Final state of an ionisation interaction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IonisationOutcome {
    pub delta_ekin: f64,
    pub delta_dir: [f64; 3],
    pub primary_ekin: f64,
    pub primary_dir: [f64; 3],
}

/// Maximum energy transfer: half of the energy for identical particles.
#[inline]
pub fn max_energy_transfer(ekin: f64, is_electron: bool) -> f64 {
    if is_electron {
        0.5 * ekin
    } else {
        ekin
    }
}

/// Kinetic energy of the delta ray, sampled from the Moller or Bhabha
/// cross section between `el_cut` and the maximum transfer.
pub fn sample_energy_transfer(
    ekin: f64,
    el_cut: f64,
    is_electron: bool,
    rng: &mut impl RandomEngine,
) -> f64 {
    let tmax = max_energy_transfer(ekin, is_electron);
    let xmin = el_cut / ekin;
    let xmax = tmax / ekin;
    let gam = ekin / ELECTRON_MASS_C2 + 1.0;
    let gamma2 = gam * gam;
    let beta2 = 1.0 - 1.0 / gamma2;
    let mut rndm = [0.0; 2];
    let x = if is_electron {
        let gg = (2.0 * gam - 1.0) / gamma2;
        let y = 1.0 - xmax;
        let grej = 1.0 - gg * xmax + xmax * xmax * (1.0 - gg + (1.0 - gg * y) / (y * y));
        loop {
            rng.flat_array(&mut rndm);
            let x = xmin * xmax / (xmin * (1.0 - rndm[0]) + xmax * rndm[0]);
            let y = 1.0 - x;
            let z = 1.0 - gg * x + x * x * (1.0 - gg + (1.0 - gg * y) / (y * y));
            if grej * rndm[1] <= z {
                break x;
            }
        }
    } else {
        let y = 1.0 / (1.0 + gam);
        let y2 = y * y;
        let y12 = 1.0 - 2.0 * y;
        let b1 = 2.0 - y2;
        let b2 = y12 * (3.0 + y2);
        let y122 = y12 * y12;
        let b4 = y122 * y12;
        let b3 = b4 + y122;
        let y = xmax * xmax;
        let grej = 1.0 + (y * y * b4 - xmin * xmin * xmin * b3 + y * b2 - xmin * b1) * beta2;
        loop {
            rng.flat_array(&mut rndm);
            let x = xmin * xmax / (xmin * (1.0 - rndm[0]) + xmax * rndm[0]);
            let y = x * x;
            let z = 1.0 + (y * y * b4 - x * y * b3 + y * b2 - x * b1) * beta2;
            if grej * rndm[1] <= z {
                break x;
            }
        }
    };
    x * ekin
}

/// Directions of the delta ray and of the scattered primary.
pub fn sample_directions(
    ekin: f64,
    delta_ekin: f64,
    primary_dir: &[f64; 3],
    rng: &mut impl RandomEngine,
) -> ([f64; 3], [f64; 3]) {
    let etot = ekin + ELECTRON_MASS_C2;
    let p0 = (ekin * (etot + ELECTRON_MASS_C2)).sqrt();
    let p_delta = (delta_ekin * (delta_ekin + 2.0 * ELECTRON_MASS_C2)).sqrt();
    let cost = (delta_ekin * (etot + ELECTRON_MASS_C2) / (p_delta * p0)).min(1.0);
    let delta_dir = deflect(primary_dir, cost, TWO_PI * rng.flat());
    let new_dir = momentum_balance(p0, primary_dir, p_delta, &delta_dir);
    (delta_dir, new_dir)
}

/// Full ionisation interaction; `None` when the cut leaves no phase space.
pub fn sample(
    ekin: f64,
    el_cut: f64,
    primary_dir: &[f64; 3],
    is_electron: bool,
    rng: &mut impl RandomEngine,
) -> Option<IonisationOutcome> {
    if el_cut >= max_energy_transfer(ekin, is_electron) {
        return None;
    }
    let delta_ekin = sample_energy_transfer(ekin, el_cut, is_electron, rng);
    let (delta_dir, primary_dir) = sample_directions(ekin, delta_ekin, primary_dir, rng);
    Some(IonisationOutcome {
        delta_ekin,
        delta_dir,
        primary_ekin: ekin - delta_ekin,
        primary_dir,
    })
}
