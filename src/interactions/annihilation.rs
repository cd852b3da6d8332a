// Positron annihilation into two photons, at rest and in flight (Heitler)

use crate::constants::{CLASSIC_ELECTR_RADIUS, ELECTRON_MASS_C2, TWO_PI};
use crate::interactions::rotation::{deflect, isotropic_direction, momentum_balance};
use crate::random::RandomEngine;
use std::f64::consts::PI;

/// The two annihilation photons.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnihilationOutcome {
    pub gamma1_ekin: f64,
    pub gamma1_dir: [f64; 3],
    pub gamma2_ekin: f64,
    pub gamma2_dir: [f64; 3],
}

/// Heitler cross section per electron [mm^2].
pub fn xsec_per_electron(ekin: f64) -> f64 {
    let tau = ekin.max(1.0e-6) / ELECTRON_MASS_C2;
    let gam = tau + 1.0;
    let gamma2 = gam * gam;
    let bg2 = tau * (tau + 2.0);
    let bg = bg2.sqrt();
    PI * CLASSIC_ELECTR_RADIUS * CLASSIC_ELECTR_RADIUS
        * ((gamma2 + 4.0 * gam + 1.0) * (gam + bg).ln() - (gam + 3.0) * bg)
        / (bg2 * (gam + 1.0))
}

/// Two back-to-back photons of `m c^2` in an isotropic direction.
pub fn sample_at_rest(rng: &mut impl RandomEngine) -> AnnihilationOutcome {
    let dir = isotropic_direction(rng);
    AnnihilationOutcome {
        gamma1_ekin: ELECTRON_MASS_C2,
        gamma1_dir: dir,
        gamma2_ekin: ELECTRON_MASS_C2,
        gamma2_dir: [-dir[0], -dir[1], -dir[2]],
    }
}

/// Annihilation in flight of a positron with kinetic energy `ekin`.
pub fn sample_in_flight(
    ekin: f64,
    dir: &[f64; 3],
    rng: &mut impl RandomEngine,
) -> AnnihilationOutcome {
    let tau = ekin / ELECTRON_MASS_C2;
    let gam = tau + 1.0;
    let tau2 = tau + 2.0;
    let sqgrate = (tau / tau2).sqrt() * 0.5;
    let sqg2m1 = (tau * tau2).sqrt();
    let epsil_min = 0.5 - sqgrate;
    let epsil_max = 0.5 + sqgrate;
    let log_qot = (epsil_max / epsil_min).ln();
    let epsil = loop {
        let epsil = epsil_min * (log_qot * rng.flat()).exp();
        let greject = 1.0 - epsil + (2.0 * gam * epsil - 1.0) / (epsil * tau2 * tau2);
        if greject >= rng.flat() {
            break epsil;
        }
    };
    let cost = ((epsil * tau2 - 1.0) / (epsil * sqg2m1)).clamp(-1.0, 1.0);
    let total = ekin + 2.0 * ELECTRON_MASS_C2;
    let gamma1_ekin = epsil * total;
    let gamma2_ekin = (1.0 - epsil) * total;
    let gamma1_dir = deflect(dir, cost, TWO_PI * rng.flat());
    let p0 = (ekin * (ekin + 2.0 * ELECTRON_MASS_C2)).sqrt();
    let gamma2_dir = momentum_balance(p0, dir, gamma1_ekin, &gamma1_dir);
    AnnihilationOutcome {
        gamma1_ekin,
        gamma1_dir,
        gamma2_ekin,
        gamma2_dir,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interactions::rotation::norm;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_at_rest_back_to_back() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..10_000 {
            let out = sample_at_rest(&mut rng);
            assert_eq!(out.gamma1_ekin, ELECTRON_MASS_C2);
            assert_eq!(out.gamma2_ekin, ELECTRON_MASS_C2);
            for k in 0..3 {
                assert_eq!(out.gamma1_dir[k] + out.gamma2_dir[k], 0.0);
            }
            assert_relative_eq!(norm(&out.gamma1_dir), 1.0, epsilon = 1.0e-12);
        }
    }

    #[test]
    fn test_in_flight_conservation() {
        let mut rng = StdRng::seed_from_u64(42);
        let dir = [0.0, 0.0, 1.0];
        for ekin in [0.01, 1.0, 1.0e3] {
            let p0 = (ekin * (ekin + 2.0 * ELECTRON_MASS_C2)).sqrt();
            for _ in 0..10_000 {
                let out = sample_in_flight(ekin, &dir, &mut rng);
                assert_relative_eq!(
                    out.gamma1_ekin + out.gamma2_ekin,
                    ekin + 2.0 * ELECTRON_MASS_C2,
                    max_relative = 1.0e-12
                );
                assert_relative_eq!(norm(&out.gamma2_dir), 1.0, epsilon = 1.0e-12);
                for k in 0..3 {
                    let pk = out.gamma1_ekin * out.gamma1_dir[k] + out.gamma2_ekin * out.gamma2_dir[k];
                    assert!((pk - p0 * dir[k]).abs() < 1.0e-6 * (p0 + 1.0));
                }
            }
        }
    }

    #[test]
    fn test_cross_section_falls_with_energy() {
        let low = xsec_per_electron(0.01);
        let high = xsec_per_electron(100.0);
        assert!(low > high && high > 0.0);
    }
}
