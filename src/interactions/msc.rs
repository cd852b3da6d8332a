// Urban multiple Coulomb scattering: step limit, angular deflection and
// lateral displacement.

use crate::constants::{ELECTRON_MASS_C2, MSC_TLIMIT_MIN_FIX, TWO_PI};
use crate::interactions::rotation::{polar_direction, rotate_to_reference_frame};
use crate::parameters::Parameters;
use crate::random::RandomEngine;
use crate::tables::MatRecord;
use crate::track::MscTrackData;
use std::f64::consts::PI;

const TAU_SMALL: f64 = 1.0e-16;
const TAU_BIG: f64 = 8.0;
/// Above this transport mean free path the range factor is enlarged [mm]
const LAMBDA_LIMIT: f64 = 1.0;
/// Below this energy the minimal step shrinks linearly [MeV]
const TLOW: f64 = 5.0e-3;

/// True step length limit of the "use safety" stepping algorithm.
///
/// On entry `msc.true_step_length` holds the physics step limit and
/// `msc.lambda_tr1` the first transport mean free path; on exit the former is
/// the (possibly shortened) limit.
#[allow(clippy::too_many_arguments)]
pub fn step_limit(
    mat: &MatRecord,
    params: &Parameters,
    msc: &mut MscTrackData,
    ekin: f64,
    range: f64,
    presafety: f64,
    on_boundary: bool,
    is_electron: bool,
    rng: &mut impl RandomEngine,
) {
    msc.is_no_scattering = false;
    msc.is_displace = true;
    let lambda0 = msc.lambda_tr1;
    let tpath = msc.true_step_length;
    if tpath < MSC_TLIMIT_MIN_FIX {
        msc.is_displace = false;
        return;
    }
    let distance = range * mat.umsc_d_over_range();
    if distance < presafety {
        msc.is_displace = false;
        return;
    }
    if msc.is_first_step || on_boundary {
        let mut fr = params.msc_range_factor;
        msc.initial_range = range.max(lambda0);
        if lambda0 > LAMBDA_LIMIT {
            fr *= 0.75 + 0.25 * lambda0 / LAMBDA_LIMIT;
        }
        msc.dynamic_range_factor = fr;
        let [a, b] = mat.umsc_step_min_pars;
        let rat = ekin;
        let stepmin = lambda0 * 1.0e-3 / (rat * (a + b * rat));
        let mut tlimit_min = if is_electron {
            0.87 * mat.z_eff23 * stepmin
        } else {
            0.7 * mat.z_eff_sqrt * stepmin
        };
        if ekin < TLOW {
            tlimit_min *= 0.5 * ekin / TLOW;
        }
        msc.tlimit_min = tlimit_min.max(MSC_TLIMIT_MIN_FIX);
    }
    let tlimit = (msc.dynamic_range_factor * msc.initial_range)
        .max(params.msc_safety_factor * presafety)
        .max(msc.tlimit_min);
    if tlimit < tpath {
        let randomized = if tlimit > msc.tlimit_min {
            rng.gauss(tlimit, 0.1 * (tlimit - msc.tlimit_min))
                .max(msc.tlimit_min)
        } else {
            msc.tlimit_min
        };
        msc.true_step_length = tpath.min(randomized);
    }
    msc.is_first_step = false;
}

/// Width of the central part of the angular distribution (Highland-like).
pub fn compute_theta0(
    mat: &MatRecord,
    true_step: f64,
    pre_ekin: f64,
    post_ekin: f64,
    is_electron: bool,
) -> f64 {
    let mass = ELECTRON_MASS_C2;
    let mut invbetacp = (post_ekin + mass) / (post_ekin * (post_ekin + 2.0 * mass));
    if pre_ekin != post_ekin {
        invbetacp =
            (invbetacp * (pre_ekin + mass) / (pre_ekin * (pre_ekin + 2.0 * mass))).sqrt();
    }
    let mut y = true_step / mat.radiation_length;
    if !is_electron {
        y *= theta0_positron_correction(mat.z_eff, pre_ekin, post_ekin);
    }
    let theta0 = 13.6 * y.sqrt() * invbetacp;
    theta0 * (mat.umsc_theta_coeff[0] + mat.umsc_theta_coeff[1] * y.ln())
}

/// Multiplicative correction of `t / X0` for positrons.
pub fn theta0_positron_correction(z: f64, pre_ekin: f64, post_ekin: f64) -> f64 {
    const XL: f64 = 0.6;
    const XH: f64 = 0.9;
    const E: f64 = 113.0;
    let a = 0.994 - 4.08e-3 * z;
    let b = 7.16 + (52.6 + 365.0 / z) / z;
    let c = 1.0 - 4.47e-3 * z;
    let d = 1.21e-3 * z;
    let pose = 1.0 + z * (1.84035e-4 * z - 1.86427e-2) + 0.41125;

    let tau = (pre_ekin * post_ekin).sqrt() / ELECTRON_MASS_C2;
    let x = (tau * (tau + 2.0) / ((tau + 1.0) * (tau + 1.0))).sqrt();
    let corr = if x < XL {
        a * (1.0 - (-b * x).exp())
    } else if x > XH {
        c + d * (E * (x - 1.0)).exp()
    } else {
        let yl = a * (1.0 - (-b * XL).exp());
        let yh = c + d * (E * (XH - 1.0)).exp();
        let y0 = (yh - yl) / (XH - XL);
        let y1 = yl - y0 * XL;
        y0 * x + y1
    };
    corr * pose
}

/// Large angle scattering from two model functions with the correct first
/// and second moments.
pub fn simple_scattering(xmeanth: f64, x2meanth: f64, rng: &mut impl RandomEngine) -> f64 {
    let a = (2.0 * xmeanth + 9.0 * x2meanth - 3.0) / (2.0 * xmeanth - 3.0 * x2meanth + 1.0);
    let prob = (a + 2.0) * xmeanth / a;
    let mut rndm = [0.0; 2];
    rng.flat_array(&mut rndm);
    if rndm[0] < prob {
        -1.0 + 2.0 * (rndm[1].ln() / (a + 1.0)).exp()
    } else {
        -1.0 + 2.0 * rndm[1]
    }
}

/// Cosine of the scattering angle after a true step `true_step`.
///
/// `lambda_post` is the transport mean free path at `post_ekin`.
#[allow(clippy::too_many_arguments)]
pub fn sample_cosine_theta(
    mat: &MatRecord,
    msc: &MscTrackData,
    true_step: f64,
    pre_ekin: f64,
    post_ekin: f64,
    lambda_post: f64,
    is_electron: bool,
    rng: &mut impl RandomEngine,
) -> f64 {
    let lambda0 = msc.lambda_tr1;
    let mut tau = true_step / lambda0;
    if post_ekin != pre_ekin
        && (lambda_post - lambda0).abs() > 0.01 * lambda0
        && lambda_post > 0.0
    {
        tau = true_step * (lambda0 / lambda_post).ln() / (lambda0 - lambda_post);
    }
    if tau >= TAU_BIG {
        return -1.0 + 2.0 * rng.flat();
    }
    if tau < TAU_SMALL {
        return 1.0;
    }
    const NUMLIM: f64 = 0.01;
    let (xmeanth, x2meanth) = if tau < NUMLIM {
        (1.0 - tau * (1.0 - 0.5 * tau), 1.0 - tau * (5.0 - 6.25 * tau) / 3.0)
    } else {
        ((-tau).exp(), (1.0 + 2.0 * (-2.5 * tau).exp()) / 3.0)
    };
    // too large step of a low energy particle
    if 1.0 - post_ekin / pre_ekin > 0.5 {
        return simple_scattering(xmeanth, x2meanth, rng);
    }
    let tsmall = msc.tlimit_min.min(LAMBDA_LIMIT);
    let extreme_small_step = true_step <= tsmall;
    let theta0 = if extreme_small_step {
        (true_step / tsmall).sqrt() * compute_theta0(mat, tsmall, pre_ekin, post_ekin, is_electron)
    } else {
        compute_theta0(mat, true_step, pre_ekin, post_ekin, is_electron)
    };
    let theta2 = theta0 * theta0;
    if theta2 < TAU_SMALL {
        return 1.0;
    }
    if theta0 > PI / 6.0 {
        return simple_scattering(xmeanth, x2meanth, rng);
    }
    let x = if theta2 > NUMLIM {
        let sth = 2.0 * (0.5 * theta0).sin();
        sth * sth
    } else {
        theta2 * (1.0 - theta2 / 12.0)
    };

    // tail parameter
    let lambda_eff = true_step / tau;
    let u = if extreme_small_step {
        ((tsmall / lambda0).ln() / 6.0).exp()
    } else {
        (tau.ln() / 6.0).exp()
    };
    let [c1, c2, c3, c4] = mat.umsc_tail_coeff;
    let xsi = (c1 + u * (c2 + c3 * u) + c4 * (lambda_eff / mat.radiation_length).ln()).max(1.9);

    let mut c = xsi;
    if (c - 3.0).abs() < 0.001 {
        c = 3.001;
    } else if (c - 2.0).abs() < 0.001 {
        c = 2.001;
    }
    let cm1 = c - 1.0;
    let ea = (-xsi).exp();
    let eaa = 1.0 - ea;
    let xmean1 = 1.0 - (1.0 - (1.0 + xsi) * ea) * x / eaa;
    let x0 = 1.0 - xsi * x;
    if xmean1 <= 0.999 * xmeanth {
        return simple_scattering(xmeanth, x2meanth, rng);
    }
    // continuity of the derivatives
    let b = 1.0 + (c - xsi) * x;
    let b1 = b + 1.0;
    let bx = c * x;
    let eb1 = (b1.ln() * cm1).exp();
    let ebx = (bx.ln() * cm1).exp();
    let d = ebx / eb1;
    let xmean2 = (x0 + d - (bx - b1 * d) / (c - 2.0)) / (1.0 - d);
    let f1x0 = ea / eaa;
    let f2x0 = cm1 / (c * (1.0 - d));
    let prob = f2x0 / (f1x0 + f2x0);
    let qprob = xmeanth / (prob * xmean1 + (1.0 - prob) * xmean2);

    let mut rndm = [0.0; 2];
    rng.flat_array(&mut rndm);
    if rndm[0] < qprob {
        if rndm[1] < prob {
            1.0 + (ea + rng.flat() * eaa).ln() * x
        } else {
            let mut var = (1.0 - d) * rng.flat();
            if var < NUMLIM * d {
                var /= d * cm1;
                -1.0 + var * (1.0 - 0.5 * var * c) * (2.0 + (c - xsi) * x)
            } else {
                1.0 + x * (c - xsi - c * (-(var + d).ln() / cm1).exp())
            }
        }
    } else {
        -1.0 + 2.0 * rndm[1]
    }
}

/// Lateral displacement in the frame of the pre-step direction, from the
/// true and projected path lengths and the azimuth `phi` of the deflection.
pub fn sample_displacement(
    true_step: f64,
    z_path: f64,
    phi: f64,
    rng: &mut impl RandomEngine,
) -> [f64; 3] {
    let rmax2 = (true_step - z_path) * (true_step + z_path);
    if rmax2 <= 0.0 {
        return [0.0; 3];
    }
    let r = 0.73 * rmax2.sqrt();
    const CBETA: f64 = 2.160;
    let cbeta1 = 1.0 - (-CBETA * PI).exp();
    let mut rndm = [0.0; 2];
    rng.flat_array(&mut rndm);
    let psi = -(1.0 - rndm[0] * cbeta1).ln() / CBETA;
    let big_phi = if rndm[1] < 0.5 { phi + psi } else { phi - psi };
    [r * big_phi.cos(), r * big_phi.sin(), 0.0]
}

/// Deflect the direction `old_dir` after the true step stored in `msc` and
/// sample the displacement; results go to `msc.direction` and
/// `msc.displacement`.
#[allow(clippy::too_many_arguments)]
pub fn sample_scattering(
    mat: &MatRecord,
    msc: &mut MscTrackData,
    pre_ekin: f64,
    post_ekin: f64,
    lambda_post: f64,
    old_dir: &[f64; 3],
    is_electron: bool,
    rng: &mut impl RandomEngine,
) {
    msc.direction = *old_dir;
    msc.displacement = [0.0; 3];
    let tpath = msc.true_step_length;
    if tpath <= MSC_TLIMIT_MIN_FIX || tpath < TAU_SMALL * msc.lambda_tr1 || post_ekin <= 1.0e-6 {
        msc.is_no_scattering = true;
        return;
    }
    let cth = sample_cosine_theta(mat, msc, tpath, pre_ekin, post_ekin, lambda_post, is_electron, rng);
    if cth.abs() >= 1.0 {
        return;
    }
    let phi = TWO_PI * rng.flat();
    let mut dir = polar_direction(cth, phi);
    rotate_to_reference_frame(&mut dir, old_dir);
    msc.direction = dir;
    if msc.is_displace {
        let mut disp = sample_displacement(tpath, msc.z_path_length, phi, rng);
        rotate_to_reference_frame(&mut disp, old_dir);
        msc.displacement = disp;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interactions::rotation::norm;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn water_like() -> MatRecord {
        let mut mat = MatRecord {
            name: "water".into(),
            z_eff: 7.2,
            radiation_length: 360.8,
            ..Default::default()
        };
        mat.set_urban_msc_parameters();
        mat
    }

    #[test]
    fn test_step_limit_far_from_boundary_keeps_step() {
        let mat = water_like();
        let params = Parameters::default();
        let mut rng = StdRng::seed_from_u64(42);
        let mut msc = MscTrackData {
            lambda_tr1: 10.0,
            true_step_length: 2.0,
            ..Default::default()
        };
        step_limit(&mat, &params, &mut msc, 1.0, 4.0, 100.0, false, true, &mut rng);
        assert_eq!(msc.true_step_length, 2.0);
        assert!(!msc.is_displace);
    }

    #[test]
    fn test_step_limit_near_boundary_shortens_step() {
        let mat = water_like();
        let params = Parameters::default();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..1000 {
            let mut msc = MscTrackData {
                lambda_tr1: 0.5,
                true_step_length: 2.0,
                ..Default::default()
            };
            step_limit(&mat, &params, &mut msc, 1.0, 4.0, 0.0, true, true, &mut rng);
            assert!(msc.true_step_length < 2.0);
            assert!(msc.true_step_length >= msc.tlimit_min);
            assert!(msc.tlimit_min >= MSC_TLIMIT_MIN_FIX);
            assert!(!msc.is_first_step);
            assert_relative_eq!(msc.initial_range, 4.0);
        }
    }

    #[test]
    fn test_mean_cosine_follows_transport_mfp() {
        // <cos theta> = exp(-t / lambda1) for a step without energy loss
        let mat = water_like();
        let mut rng = StdRng::seed_from_u64(42);
        let msc = MscTrackData {
            lambda_tr1: 1.0,
            tlimit_min: 1.0e-5,
            ..Default::default()
        };
        for t in [0.05, 0.3, 1.0] {
            let n = 20_000;
            let mut sum = 0.0;
            for _ in 0..n {
                let c = sample_cosine_theta(&mat, &msc, t, 10.0, 10.0, 1.0, true, &mut rng);
                assert!((-1.0..=1.0).contains(&c));
                sum += c;
            }
            let mean = sum / n as f64;
            assert!((mean - (-t).exp()).abs() < 0.03, "t = {t}: {mean}");
        }
    }

    #[test]
    fn test_simple_scattering_moments() {
        let mut rng = StdRng::seed_from_u64(42);
        let tau: f64 = 1.5;
        let xm = (-tau).exp();
        let x2m = (1.0 + 2.0 * (-2.5 * tau).exp()) / 3.0;
        let n = 50_000;
        let mean: f64 = (0..n).map(|_| simple_scattering(xm, x2m, &mut rng)).sum::<f64>() / n as f64;
        assert!((mean - xm).abs() < 0.01);
    }

    #[test]
    fn test_scattering_directions_and_displacement() {
        let mat = water_like();
        let mut rng = StdRng::seed_from_u64(42);
        let old = [0.0, 0.0, 1.0];
        for _ in 0..10_000 {
            let mut msc = MscTrackData {
                lambda_tr1: 2.0,
                true_step_length: 0.5,
                z_path_length: 0.45,
                tlimit_min: 1.0e-5,
                is_displace: true,
                ..Default::default()
            };
            sample_scattering(&mat, &mut msc, 5.0, 4.9, 1.9, &old, false, &mut rng);
            assert_relative_eq!(norm(&msc.direction), 1.0, epsilon = 1.0e-12);
            let r = norm(&msc.displacement);
            let rmax = ((0.5f64 - 0.45) * (0.5 + 0.45)).sqrt();
            assert_relative_eq!(r, 0.73 * rmax, epsilon = 1.0e-12);
            assert!(msc.displacement[2].abs() < 1.0e-12);
        }
    }

    #[test]
    fn test_tiny_step_does_not_scatter() {
        let mat = water_like();
        let mut rng = StdRng::seed_from_u64(42);
        let mut msc = MscTrackData {
            lambda_tr1: 2.0,
            true_step_length: 1.0e-9,
            ..Default::default()
        };
        let old = [0.6, 0.0, 0.8];
        sample_scattering(&mat, &mut msc, 1.0, 1.0, 2.0, &old, true, &mut rng);
        assert!(msc.is_no_scattering);
        assert_eq!(msc.direction, old);
    }

    #[test]
    fn test_positron_correction_is_finite() {
        for z in [1.0, 7.2, 82.0] {
            for e in [1.0e-3, 0.1, 10.0, 1.0e4] {
                let c = theta0_positron_correction(z, e, e);
                assert!(c.is_finite() && c > 0.0, "Z = {z}, E = {e}: {c}");
            }
        }
    }
}
