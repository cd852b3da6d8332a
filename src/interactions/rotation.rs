// Direction helpers shared by the interaction samplers

use crate::constants::{ELECTRON_MASS_C2, TWO_PI};
use crate::random::RandomEngine;
use nalgebra::Vector3;

/// Rotate `dir`, given in the frame whose z axis is `ref_dir`, into the lab frame.
#[inline]
pub fn rotate_to_reference_frame(dir: &mut [f64; 3], ref_dir: &[f64; 3]) {
    let up = ref_dir[0] * ref_dir[0] + ref_dir[1] * ref_dir[1];
    if up > 0.0 {
        let up = up.sqrt();
        let [px, py, pz] = *dir;
        dir[0] = (ref_dir[0] * ref_dir[2] * px - ref_dir[1] * py) / up + ref_dir[0] * pz;
        dir[1] = (ref_dir[1] * ref_dir[2] * px + ref_dir[0] * py) / up + ref_dir[1] * pz;
        dir[2] = -up * px + ref_dir[2] * pz;
    } else if ref_dir[2] < 0.0 {
        dir[0] = -dir[0];
        dir[2] = -dir[2];
    }
}

/// Unit vector with polar cosine `cost` and azimuth `phi` about the z axis.
#[inline]
pub fn polar_direction(cost: f64, phi: f64) -> [f64; 3] {
    let sint = ((1.0 - cost) * (1.0 + cost)).max(0.0).sqrt();
    [sint * phi.cos(), sint * phi.sin(), cost]
}

/// `polar_direction` rotated to the frame of `ref_dir`.
#[inline]
pub fn deflect(ref_dir: &[f64; 3], cost: f64, phi: f64) -> [f64; 3] {
    let mut dir = polar_direction(cost, phi);
    rotate_to_reference_frame(&mut dir, ref_dir);
    dir
}

/// Direction of the primary after emitting a secondary, from momentum
/// conservation: `p0 d0 = p1 d1 + p2 d2`. Falls back to `d0` if the
/// remaining momentum vanishes.
#[inline]
pub fn momentum_balance(p0: f64, dir0: &[f64; 3], p_sec: f64, dir_sec: &[f64; 3]) -> [f64; 3] {
    let rest = p0 * Vector3::from(*dir0) - p_sec * Vector3::from(*dir_sec);
    match rest.try_normalize(0.0) {
        Some(d) => [d.x, d.y, d.z],
        None => *dir0,
    }
}

/// Cosine of the emission angle from the modified Tsai distribution, used
/// for bremsstrahlung photons and pair production leptons.
#[inline]
pub fn sample_modified_tsai_cost(ekin: f64, rng: &mut impl RandomEngine) -> f64 {
    const A1: f64 = 1.6;
    const A2: f64 = A1 / 3.0;
    const BORDER: f64 = 0.25;
    let u_max = 2.0 * (1.0 + ekin / ELECTRON_MASS_C2);
    let u = loop {
        let uu = -(rng.flat() * rng.flat()).max(f64::MIN_POSITIVE).ln();
        let u = if rng.flat() < BORDER { uu * A1 } else { uu * A2 };
        if u <= u_max {
            break u;
        }
    };
    1.0 - 2.0 * u * u / (u_max * u_max)
}

/// Isotropic unit vector.
#[inline]
pub fn isotropic_direction(rng: &mut impl RandomEngine) -> [f64; 3] {
    let cost = 2.0 * rng.flat() - 1.0;
    polar_direction(cost, TWO_PI * rng.flat())
}

#[inline]
pub fn norm(v: &[f64; 3]) -> f64 {
    Vector3::from(*v).norm()
}
