// Urban universal fluctuation model of the sub-threshold energy loss

use crate::constants::{ELECTRON_MASS_C2, TWO_PI_MC2_RCL2};
use crate::random::RandomEngine;
use crate::tables::MatRecord;
use rand_distr::{Distribution, Gamma};

/// Mean losses below this are returned unchanged [MeV]
const MIN_LOSS: f64 = 10.0e-6;
/// Lower edge of the ionisation spectrum [MeV]
const E0: f64 = 10.0e-6;
const MIN_NUMBER_INTERACTIONS_BOHR: f64 = 10.0;
const NMAX_CONT: f64 = 8.0;
const RATE: f64 = 0.56;
const FW: f64 = 4.0;
const A0: f64 = 42.0;

/// Actual energy loss along a step whose mean restricted loss is `mean_loss`.
///
/// `tcut` is the delta-ray production threshold and `tmax` the largest
/// possible energy transfer. Narrow distributions are sampled from a
/// truncated Gaussian (Bohr) or a Gamma distribution, the rest from the
/// excitation plus ionisation compound model.
pub fn sample_loss_fluctuation(
    mat: &MatRecord,
    ekin: f64,
    tcut: f64,
    tmax: f64,
    length: f64,
    mean_loss: f64,
    rng: &mut impl RandomEngine,
) -> f64 {
    if mean_loss < MIN_LOSS {
        return mean_loss;
    }
    let gam = ekin / ELECTRON_MASS_C2 + 1.0;
    let beta2 = 1.0 - 1.0 / (gam * gam);

    if mean_loss >= MIN_NUMBER_INTERACTIONS_BOHR * tcut && tmax <= 2.0 * tcut {
        let siga = ((tmax / beta2 - 0.5 * tcut) * TWO_PI_MC2_RCL2 * length * mat.electron_density)
            .max(0.0)
            .sqrt();
        let sn = mean_loss / siga;
        if sn >= 2.0 {
            let two_mean = 2.0 * mean_loss;
            return loop {
                let loss = rng.gauss(mean_loss, siga);
                if (0.0..=two_mean).contains(&loss) {
                    break loss;
                }
            };
        }
        let neff = sn * sn;
        return match Gamma::new(neff, 1.0) {
            Ok(gamma) => mean_loss * gamma.sample(rng) / neff,
            Err(_) => mean_loss,
        };
    }

    if tcut <= E0 {
        return mean_loss;
    }
    // width correction for small cuts
    let scaling = (1.0 + 0.5e-3 / tcut).min(1.5);
    sample_glandz(mat.mean_exc_energy, tcut, mean_loss / scaling, rng) * scaling
}

fn sample_glandz(
    ipot: f64,
    tcut: f64,
    mean_loss: f64,
    rng: &mut impl RandomEngine,
) -> f64 {
    let mut a1 = 0.0;
    let mut e1 = ipot;
    let mut loss = 0.0;
    if tcut > e1 {
        a1 = mean_loss * (1.0 - RATE) / e1;
        if a1 < A0 {
            let fwnow = 0.1 + (FW - 0.1) * (a1 / A0).sqrt();
            a1 /= fwnow;
            e1 *= fwnow;
        } else {
            a1 /= FW;
            e1 *= FW;
        }
    }
    let w1 = tcut / E0;
    let mut a3 = RATE * mean_loss * (tcut - E0) / (E0 * tcut * w1.ln());
    if a1 <= 0.0 {
        a3 /= RATE;
    }

    let mut emean = 0.0;
    let mut sig2e = 0.0;
    if a1 > 0.0 {
        add_excitation(a1, e1, &mut emean, &mut loss, &mut sig2e, rng);
    }
    if sig2e > 0.0 {
        sample_gauss(emean, sig2e, &mut loss, rng);
    }

    if a3 > 0.0 {
        emean = 0.0;
        sig2e = 0.0;
        let mut p3 = a3;
        let mut alfa = 1.0;
        if a3 > NMAX_CONT {
            alfa = w1 * (NMAX_CONT + a3) / (w1 * NMAX_CONT + a3);
            let alfa1 = alfa * alfa.ln() / (alfa - 1.0);
            let namean = a3 * w1 * (alfa - 1.0) / ((w1 - 1.0) * alfa);
            emean += namean * E0 * alfa1;
            sig2e += E0 * E0 * namean * (alfa - alfa1 * alfa1);
            p3 = a3 - namean;
        }
        let w3 = alfa * E0;
        if tcut > w3 {
            let w = (tcut - w3) / tcut;
            let nnb = rng.poisson(p3) as u64;
            for _ in 0..nnb {
                loss += w3 / (1.0 - w * rng.flat());
            }
        }
        if sig2e > 0.0 {
            sample_gauss(emean, sig2e, &mut loss, rng);
        }
    }
    loss
}

#[inline]
fn add_excitation(
    ax: f64,
    ex: f64,
    eav: &mut f64,
    eloss: &mut f64,
    esig2: &mut f64,
    rng: &mut impl RandomEngine,
) {
    if ax > NMAX_CONT {
        *eav += ax * ex;
        *esig2 += ax * ex * ex;
    } else {
        let p = rng.poisson(ax);
        if p > 0.0 {
            *eloss += (p + 1.0 - 2.0 * rng.flat()) * ex;
        }
    }
}

#[inline]
fn sample_gauss(eav: f64, esig2: f64, eloss: &mut f64, rng: &mut impl RandomEngine) {
    let sig = esig2.sqrt();
    let x = if eav < 0.25 * sig {
        eav + (2.0 * rng.flat() - 1.0) * eav
    } else {
        loop {
            let x = rng.gauss(eav, sig);
            if (0.0..=2.0 * eav).contains(&x) {
                break x;
            }
        }
    };
    *eloss += x;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn water_like() -> MatRecord {
        MatRecord {
            name: "water".into(),
            electron_density: 3.343e20,
            mean_exc_energy: 78.0e-6,
            ..Default::default()
        }
    }

    #[test]
    fn test_small_loss_unchanged() {
        let mut rng = StdRng::seed_from_u64(42);
        let mat = water_like();
        assert_eq!(sample_loss_fluctuation(&mat, 1.0, 0.1, 0.5, 1.0e-4, 5.0e-6, &mut rng), 5.0e-6);
    }

    #[test]
    fn test_compound_model_preserves_mean() {
        let mut rng = StdRng::seed_from_u64(42);
        let mat = water_like();
        let mean_loss = 0.2;
        let n = 20_000;
        let mut sum = 0.0;
        for _ in 0..n {
            let loss = sample_loss_fluctuation(&mat, 10.0, 0.1, 5.0, 1.0, mean_loss, &mut rng);
            assert!(loss >= 0.0);
            sum += loss;
        }
        let mean = sum / n as f64;
        assert!((mean / mean_loss - 1.0).abs() < 0.02, "mean loss {mean}");
    }

    #[test]
    fn test_thin_layer_has_wide_distribution() {
        // few collisions: large relative spread
        let mut rng = StdRng::seed_from_u64(42);
        let mat = water_like();
        let mean_loss = 2.0e-4;
        let n = 20_000;
        let losses: Vec<f64> = (0..n)
            .map(|_| sample_loss_fluctuation(&mat, 10.0, 0.1, 5.0, 1.0e-3, mean_loss, &mut rng))
            .collect();
        let mean = losses.iter().sum::<f64>() / n as f64;
        let var = losses.iter().map(|l| (l - mean).powi(2)).sum::<f64>() / n as f64;
        assert!(var.sqrt() / mean > 0.3);
    }

    #[test]
    fn test_gaussian_regime_is_truncated() {
        let mut rng = StdRng::seed_from_u64(42);
        let mat = water_like();
        let mean_loss = 0.05;
        for _ in 0..10_000 {
            let loss = sample_loss_fluctuation(&mat, 0.01, 1.0e-3, 1.5e-3, 0.1, mean_loss, &mut rng);
            assert!((0.0..=2.0 * mean_loss).contains(&loss));
        }
    }
}
