// Gamma conversion into an e-e+ pair: Bethe-Heitler with screening, Coulomb
// correction and LPM suppression.

use crate::constants::{ELECTRON_MASS_C2, GAMMA_LPM_ENERGY, LPM_CONSTANT, TWO_PI};
use crate::interactions::rotation::{polar_direction, rotate_to_reference_frame, sample_modified_tsai_cost};
use crate::interactions::bremsstrahlung::lpm_g_phi;
use crate::random::RandomEngine;
use crate::tables::{ElemRecord, MatRecord};

/// Below this photon energy the energy sharing is sampled uniformly [MeV]
const EG_SMALL: f64 = 2.0;
/// Above this photon energy the Coulomb correction is applied [MeV]
const MID_ENERGY: f64 = 50.0;

/// Final state of a conversion: the two leptons.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConversionOutcome {
    pub electron_ekin: f64,
    pub electron_dir: [f64; 3],
    pub positron_ekin: f64,
    pub positron_dir: [f64; 3],
}

/// Bethe-Heitler screening functions `(F1, F2)`.
#[inline]
pub fn screen_function12(delta: f64) -> (f64, f64) {
    if delta > 1.4 {
        let f = 42.038 - 8.29 * (delta + 0.958).ln();
        (f, f)
    } else {
        (
            42.184 - delta * (7.444 - 1.623 * delta),
            41.326 - delta * (5.848 - 0.902 * delta),
        )
    }
}

/// Tsai's screening functions `(phi1, phi2)` used with the LPM suppression.
#[inline]
pub fn phi12(delta: f64) -> (f64, f64) {
    if delta > 1.4 {
        let f = 21.0190 - 4.145 * (delta + 0.958).ln();
        (f, f)
    } else {
        (
            20.806 - delta * (3.190 - 0.5710 * delta),
            20.234 - delta * (2.126 - 0.0903 * delta),
        )
    }
}

/// LPM functions `(xi(s), G(s), phi(s))` for energy fraction `eps`.
pub fn lpm_functions(elem: &ElemRecord, eps: f64, egamma: f64, lpm_energy: f64) -> (f64, f64, f64) {
    let var_s_prime = (0.125 * lpm_energy / (eps * egamma * (1.0 - eps))).sqrt();
    let mut xi = 2.0;
    if var_s_prime > 1.0 {
        xi = 1.0;
    } else if var_s_prime > std::f64::consts::SQRT_2 * elem.var_s1() {
        let h = var_s_prime.ln() * elem.il_var_s1_cond;
        xi = 1.0 + h - 0.08 * (1.0 - h) * h * (2.0 - h) * elem.il_var_s1_cond;
    }
    let var_s_hat = var_s_prime / xi.sqrt();
    let (g, phi) = lpm_g_phi(var_s_hat);
    if xi * phi > 1.0 || var_s_hat > 0.57 {
        xi = 1.0 / phi;
    }
    (xi, g, phi)
}

/// Total energy fraction `eps` in `[m c^2 / E, 0.5]` carried by one lepton.
pub fn sample_energy_fraction(
    elem: &ElemRecord,
    mat: &MatRecord,
    egamma: f64,
    rng: &mut impl RandomEngine,
) -> f64 {
    let eps0 = ELECTRON_MASS_C2 / egamma;
    if egamma < EG_SMALL {
        return eps0 + (0.5 - eps0) * rng.flat();
    }
    let delta_factor = 136.0 * eps0 / elem.z13;
    let mut fz = 8.0 * elem.log_z / 3.0;
    let mut delta_max = elem.delta_max_low;
    if egamma > MID_ENERGY {
        fz += 8.0 * elem.coulomb;
        delta_max = elem.delta_max_high;
    }
    let delta_min = 4.0 * delta_factor;
    let epsp = 0.5 - 0.5 * (1.0 - delta_min / delta_max).max(0.0).sqrt();
    let eps_min = eps0.max(epsp);
    let eps_range = 0.5 - eps_min;

    let (mut f10, mut f20) = screen_function12(delta_min);
    f10 -= fz;
    f20 -= fz;
    let norm_f1 = (f10 * eps_range * eps_range).max(0.0);
    let norm_f2 = (1.5 * f20).max(0.0);
    if norm_f1 + norm_f2 <= 0.0 {
        return eps_min + eps_range * rng.flat();
    }
    let norm_cond = norm_f1 / (norm_f1 + norm_f2);
    let is_lpm = egamma > GAMMA_LPM_ENERGY;
    let lpm_energy = LPM_CONSTANT * mat.radiation_length;

    let mut rndm = [0.0; 3];
    loop {
        rng.flat_array(&mut rndm);
        let (eps, greject) = if norm_cond > rndm[0] {
            let eps = 0.5 - eps_range * rndm[1].cbrt();
            let delta = delta_factor / (eps * (1.0 - eps));
            let g = if is_lpm {
                let (phi1, phi2) = phi12(delta);
                let (xi, gs, phis) = lpm_functions(elem, eps, egamma, lpm_energy);
                xi * ((2.0 * phis + gs) * phi1 - gs * phi2 - phis * fz) / f10
            } else {
                (screen_function12(delta).0 - fz) / f10
            };
            (eps, g)
        } else {
            let eps = eps_min + eps_range * rndm[1];
            let delta = delta_factor / (eps * (1.0 - eps));
            let g = if is_lpm {
                let (phi1, phi2) = phi12(delta);
                let (xi, gs, phis) = lpm_functions(elem, eps, egamma, lpm_energy);
                xi * ((phis + 0.5 * gs) * phi1 + 0.5 * gs * phi2 - 0.5 * (gs + phis) * fz) / f20
            } else {
                (screen_function12(delta).1 - fz) / f20
            };
            (eps, g)
        };
        if greject >= rndm[2] {
            return eps;
        }
    }
}

/// Full conversion: energy sharing, random charge assignment and directions
/// from the modified Tsai distribution with opposite azimuths.
pub fn sample(
    elem: &ElemRecord,
    mat: &MatRecord,
    egamma: f64,
    dir: &[f64; 3],
    rng: &mut impl RandomEngine,
) -> ConversionOutcome {
    let eps = sample_energy_fraction(elem, mat, egamma, rng);
    let (e_tot, p_tot) = if rng.flat() > 0.5 {
        ((1.0 - eps) * egamma, eps * egamma)
    } else {
        (eps * egamma, (1.0 - eps) * egamma)
    };
    let electron_ekin = (e_tot - ELECTRON_MASS_C2).max(0.0);
    let positron_ekin = (p_tot - ELECTRON_MASS_C2).max(0.0);

    let phi = TWO_PI * rng.flat();
    let mut electron_dir = polar_direction(sample_modified_tsai_cost(electron_ekin, rng), phi);
    rotate_to_reference_frame(&mut electron_dir, dir);
    let mut positron_dir = polar_direction(
        sample_modified_tsai_cost(positron_ekin, rng),
        phi + std::f64::consts::PI,
    );
    rotate_to_reference_frame(&mut positron_dir, dir);
    ConversionOutcome {
        electron_ekin,
        electron_dir,
        positron_ekin,
        positron_dir,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interactions::rotation::norm;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn lead() -> (ElemRecord, MatRecord) {
        (
            ElemRecord::new(82, vec![], vec![], 88.0e-3),
            MatRecord {
                radiation_length: 5.612,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_energy_conservation() {
        let (elem, mat) = lead();
        let mut rng = StdRng::seed_from_u64(42);
        let dir = [1.0, 0.0, 0.0];
        for egamma in [1.5, 10.0, 1.0e3, 1.0e6] {
            for _ in 0..10_000 {
                let out = sample(&elem, &mat, egamma, &dir, &mut rng);
                let total = out.electron_ekin + out.positron_ekin + 2.0 * ELECTRON_MASS_C2;
                assert_relative_eq!(total, egamma, max_relative = 1.0e-12);
                assert_relative_eq!(norm(&out.electron_dir), 1.0, epsilon = 1.0e-12);
                assert_relative_eq!(norm(&out.positron_dir), 1.0, epsilon = 1.0e-12);
            }
        }
    }

    #[test]
    fn test_energy_fraction_bounds() {
        let (elem, mat) = lead();
        let mut rng = StdRng::seed_from_u64(42);
        for egamma in [3.0, 100.0, 2.0e5] {
            let eps0 = ELECTRON_MASS_C2 / egamma;
            for _ in 0..10_000 {
                let eps = sample_energy_fraction(&elem, &mat, egamma, &mut rng);
                assert!(eps >= eps0 - 1.0e-12 && eps <= 0.5 + 1.0e-12);
            }
        }
    }

    #[test]
    fn test_screening_functions_continuous() {
        let (a, b) = screen_function12(1.4);
        let (c, d) = screen_function12(1.4 + 1.0e-9);
        assert!((a - c).abs() < 0.1 && (b - d).abs() < 0.1);
        let (p1, p2) = phi12(0.0);
        assert!(p1 > p2);
    }
}
