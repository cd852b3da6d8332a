// Klein-Nishina Compton scattering on free electrons

use crate::constants::{ELECTRON_MASS_C2, SECONDARY_MIN_ENERGY, TWO_PI};
use crate::interactions::rotation::polar_direction;
use crate::interactions::rotation::rotate_to_reference_frame;
use crate::random::RandomEngine;
use nalgebra::Vector3;

/// Final state of a Compton scattering.
///
/// Secondaries below the tracking threshold are not produced; their energy
/// is in `energy_deposit`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComptonOutcome {
    pub gamma_ekin: f64,
    pub gamma_dir: [f64; 3],
    pub electron_ekin: f64,
    pub electron_dir: [f64; 3],
    pub energy_deposit: f64,
}

/// Ratio `eps = E'/E` and `1 - cos(theta)` of the scattered photon.
///
/// Returns `None` if the rejection loop does not converge.
pub fn sample_photon_energy_and_angle(
    egamma: f64,
    rng: &mut impl RandomEngine,
) -> Option<(f64, f64)> {
    const MAX_TRIALS: usize = 1000;
    let e0_m = egamma / ELECTRON_MASS_C2;
    let eps0 = 1.0 / (1.0 + 2.0 * e0_m);
    let eps0sq = eps0 * eps0;
    let alpha1 = -eps0.ln();
    let alpha2 = alpha1 + 0.5 * (1.0 - eps0sq);
    let mut rndm = [0.0; 3];
    for _ in 0..MAX_TRIALS {
        rng.flat_array(&mut rndm);
        let (eps, epssq) = if alpha1 > alpha2 * rndm[0] {
            let eps = (-alpha1 * rndm[1]).exp();
            (eps, eps * eps)
        } else {
            let epssq = eps0sq + (1.0 - eps0sq) * rndm[1];
            (epssq.sqrt(), epssq)
        };
        let onecost = (1.0 - eps) / (eps * e0_m);
        let sint2 = onecost * (2.0 - onecost);
        let greject = 1.0 - eps * sint2 / (1.0 + epssq);
        if greject >= rndm[2] {
            return Some((eps, onecost));
        }
    }
    None
}

/// Full Compton interaction of a photon with energy `egamma` and direction `dir`.
pub fn sample(egamma: f64, dir: &[f64; 3], rng: &mut impl RandomEngine) -> ComptonOutcome {
    let Some((eps, onecost)) = sample_photon_energy_and_angle(egamma, rng) else {
        // no interaction
        return ComptonOutcome {
            gamma_ekin: egamma,
            gamma_dir: *dir,
            electron_ekin: 0.0,
            electron_dir: *dir,
            energy_deposit: 0.0,
        };
    };
    let mut gamma_dir = polar_direction(1.0 - onecost, TWO_PI * rng.flat());
    rotate_to_reference_frame(&mut gamma_dir, dir);

    let mut out = ComptonOutcome {
        gamma_ekin: eps * egamma,
        gamma_dir,
        electron_ekin: egamma - eps * egamma,
        electron_dir: *dir,
        energy_deposit: 0.0,
    };
    if out.electron_ekin > SECONDARY_MIN_ENERGY {
        let p = egamma * Vector3::from(*dir) - out.gamma_ekin * Vector3::from(gamma_dir);
        if let Some(d) = p.try_normalize(0.0) {
            out.electron_dir = [d.x, d.y, d.z];
        }
    } else {
        out.energy_deposit += out.electron_ekin;
        out.electron_ekin = 0.0;
    }
    if out.gamma_ekin <= SECONDARY_MIN_ENERGY {
        out.energy_deposit += out.gamma_ekin;
        out.gamma_ekin = 0.0;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interactions::rotation::norm;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_energy_conservation_and_kinematics() {
        let mut rng = StdRng::seed_from_u64(42);
        let dir = [0.0, 1.0, 0.0];
        for egamma in [0.01, 1.0, 100.0] {
            for _ in 0..10_000 {
                let out = sample(egamma, &dir, &mut rng);
                let total = out.gamma_ekin + out.electron_ekin + out.energy_deposit;
                assert_relative_eq!(total, egamma, max_relative = 1.0e-12);
                assert_relative_eq!(norm(&out.gamma_dir), 1.0, epsilon = 1.0e-12);
                assert_relative_eq!(norm(&out.electron_dir), 1.0, epsilon = 1.0e-12);
                // Compton formula
                let cost = out.gamma_dir[1];
                let expected = egamma / (1.0 + egamma / ELECTRON_MASS_C2 * (1.0 - cost));
                if out.gamma_ekin > 0.0 {
                    assert_relative_eq!(out.gamma_ekin, expected, max_relative = 1.0e-9);
                }
            }
        }
    }

    #[test]
    fn test_energy_ratio_limits() {
        let mut rng = StdRng::seed_from_u64(42);
        let egamma = 2.0;
        let eps0 = 1.0 / (1.0 + 2.0 * egamma / ELECTRON_MASS_C2);
        for _ in 0..10_000 {
            let (eps, onecost) = sample_photon_energy_and_angle(egamma, &mut rng).unwrap();
            assert!(eps >= eps0 - 1.0e-12 && eps <= 1.0);
            assert!((0.0..=2.0 + 1.0e-12).contains(&onecost));
        }
    }
}
