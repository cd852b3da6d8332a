// Host-side tracking loop.
//
// Drives the two-phase kernel for a primary and every secondary it
// produces: `electron_manager::how_far` or `gamma_manager::how_far`
// proposes a step, a `Navigator` limits it by the geometry, the track is
// moved and the matching `perform` finishes the step. The e-/e+ lateral
// multiple scattering displacement is applied afterwards, limited by the
// post-step safety.

use crate::bank::SecondaryBank;
use crate::constants::{ELECTRON_MASS_C2, GEOM_MIN_LENGTH};
use crate::electron_manager;
use crate::error::{KernelError, Result};
use crate::gamma_manager;
use crate::parameters::Parameters;
use crate::random::RandomEngine;
use crate::tables::EmData;
use crate::track::{ElectronTrack, Track};

/// Tracks taking more steps than this are killed in place
pub const MAX_STEPS_PER_TRACK: usize = 1_000_000;

/// Geometric step granted by the navigator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavigatorStep {
    /// Geometric step length [mm], never longer than the proposed one
    pub step: f64,
    /// Whether the step ends on a volume boundary
    pub on_boundary: bool,
}

/// Geometry seen by the tracking loop.
pub trait Navigator {
    /// Limit the proposed geometric step of `track` by the distance to the
    /// next boundary along its direction.
    fn make_step(&mut self, track: &Track, proposed: f64) -> NavigatorStep;

    /// Isotropic distance to the nearest boundary, not looked for beyond
    /// `limit` [mm].
    fn compute_safety(&self, position: &[f64; 3], limit: f64) -> f64;

    /// Material-cut index of the volume entered from `position` along
    /// `direction`, or `None` outside the world.
    fn locate(&self, position: &[f64; 3], direction: &[f64; 3]) -> Option<usize>;
}

/// A single unbounded volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InfiniteMedium {
    pub mat_cut_index: usize,
}

impl InfiniteMedium {
    pub fn new(mat_cut_index: usize) -> Self {
        InfiniteMedium { mat_cut_index }
    }
}

impl Navigator for InfiniteMedium {
    fn make_step(&mut self, _track: &Track, proposed: f64) -> NavigatorStep {
        NavigatorStep {
            step: proposed,
            on_boundary: false,
        }
    }

    fn compute_safety(&self, _position: &[f64; 3], limit: f64) -> f64 {
        limit
    }

    fn locate(&self, _position: &[f64; 3], _direction: &[f64; 3]) -> Option<usize> {
        Some(self.mat_cut_index)
    }
}

/// Stack of layers perpendicular to the z axis, unbounded in x and y.
///
/// Layer `i` spans `[planes[i], planes[i + 1])` and is filled with
/// material-cut `mat_cuts[i]`; everything below the first or above the last
/// plane is outside the world.
#[derive(Debug, Clone, PartialEq)]
pub struct SlabNavigator {
    planes: Vec<f64>,
    mat_cuts: Vec<usize>,
}

impl SlabNavigator {
    /// Layers from strictly increasing plane positions [mm].
    pub fn new(planes: Vec<f64>, mat_cuts: Vec<usize>) -> Result<Self> {
        if planes.len() != mat_cuts.len() + 1 || mat_cuts.is_empty() {
            return Err(KernelError::invalid_parameter(
                "planes",
                format!("{} planes cannot bound {} layers", planes.len(), mat_cuts.len()),
            ));
        }
        if planes.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(KernelError::invalid_parameter(
                "planes",
                "plane positions must be strictly increasing",
            ));
        }
        Ok(SlabNavigator { planes, mat_cuts })
    }

    /// One layer of the given thickness starting at `z = 0`.
    pub fn single(thickness: f64, mat_cut_index: usize) -> Result<Self> {
        Self::new(vec![0.0, thickness], vec![mat_cut_index])
    }

    pub fn num_layers(&self) -> usize {
        self.mat_cuts.len()
    }

    /// Layer containing `z`.
    fn layer_of(&self, z: f64) -> Option<usize> {
        let n = self.mat_cuts.len();
        if z < self.planes[0] || z >= self.planes[n] {
            return None;
        }
        Some(self.planes[1..].partition_point(|&p| p <= z))
    }

    /// `z` nudged along the direction, so that a point on a plane belongs to
    /// the layer it is entering.
    #[inline]
    fn probe_z(position: &[f64; 3], direction: &[f64; 3]) -> f64 {
        position[2] + GEOM_MIN_LENGTH * direction[2]
    }
}

impl Navigator for SlabNavigator {
    fn make_step(&mut self, track: &Track, proposed: f64) -> NavigatorStep {
        let dz = track.direction[2];
        let z = track.position[2];
        let distance = match self.layer_of(Self::probe_z(&track.position, &track.direction)) {
            Some(_) if dz == 0.0 => f64::INFINITY,
            Some(layer) => {
                let plane = if dz > 0.0 {
                    self.planes[layer + 1]
                } else {
                    self.planes[layer]
                };
                ((plane - z) / dz).max(0.0)
            }
            None => 0.0,
        };
        if distance <= proposed {
            NavigatorStep {
                step: distance,
                on_boundary: true,
            }
        } else {
            NavigatorStep {
                step: proposed,
                on_boundary: false,
            }
        }
    }

    fn compute_safety(&self, position: &[f64; 3], limit: f64) -> f64 {
        let z = position[2];
        match self.layer_of(z) {
            Some(layer) => (z - self.planes[layer])
                .min(self.planes[layer + 1] - z)
                .min(limit),
            None => 0.0,
        }
    }

    fn locate(&self, position: &[f64; 3], direction: &[f64; 3]) -> Option<usize> {
        self.layer_of(Self::probe_z(position, direction))
            .map(|layer| self.mat_cuts[layer])
    }
}

/// Energy balance of transported tracks.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrackSummary {
    /// Energy deposited inside the world [MeV]
    pub energy_deposit: f64,
    /// Energy carried out of the world [MeV]; an escaping positron also
    /// carries the `2 m c^2` of its eventual annihilation.
    pub escaped_energy: f64,
    pub num_steps: usize,
    /// Secondaries produced, all generations
    pub num_secondaries: usize,
}

impl TrackSummary {
    fn add(&mut self, other: &TrackSummary) {
        self.energy_deposit += other.energy_deposit;
        self.escaped_energy += other.escaped_energy;
        self.num_steps += other.num_steps;
        self.num_secondaries += other.num_secondaries;
    }
}

/// Energy leaving the world with `track`.
fn escaping_energy(track: &Track) -> f64 {
    if track.charge > 0.0 {
        track.ekin() + 2.0 * ELECTRON_MASS_C2
    } else {
        track.ekin()
    }
}

/// Move the track by the multiple scattering displacement of the last step,
/// shortened so that it stays within `0.99` times the post-step safety.
pub fn apply_msc_displacement(etrack: &mut ElectronTrack, navigator: &impl Navigator) {
    let disp = etrack.msc.displacement;
    let disp_r = disp.iter().map(|d| d * d).sum::<f64>().sqrt();
    if disp_r <= GEOM_MIN_LENGTH {
        return;
    }
    let safety = 0.99 * navigator.compute_safety(&etrack.track.position, disp_r);
    if safety <= GEOM_MIN_LENGTH {
        return;
    }
    let scale = if disp_r > safety { safety / disp_r } else { 1.0 };
    for (p, d) in etrack.track.position.iter_mut().zip(disp) {
        *p += scale * d;
    }
}

/// Transport an e-/e+ until it stops or leaves the world. Secondaries are
/// banked, not transported.
pub fn transport_electron(
    data: &EmData,
    params: &Parameters,
    navigator: &mut impl Navigator,
    etrack: &mut ElectronTrack,
    bank: &mut SecondaryBank,
    rng: &mut impl RandomEngine,
) -> TrackSummary {
    let mut summary = TrackSummary::default();
    let banked = bank.len();
    let Some(imc) = navigator.locate(&etrack.track.position, &etrack.track.direction) else {
        summary.escaped_energy = escaping_energy(&etrack.track);
        return summary;
    };
    etrack.track.mat_cut_index = imc;

    while electron_manager::is_alive(etrack) {
        if summary.num_steps == MAX_STEPS_PER_TRACK {
            summary.energy_deposit += etrack.track.ekin();
            etrack.track.set_ekin(0.0);
            break;
        }
        summary.num_steps += 1;
        etrack.track.safety = navigator.compute_safety(&etrack.track.position, f64::INFINITY);

        let proposed = electron_manager::how_far(data, params, etrack, rng);
        let granted = navigator.make_step(&etrack.track, proposed);
        etrack.track.g_step_length = granted.step;
        etrack.track.on_boundary = granted.on_boundary;
        etrack.track.advance(granted.step);

        electron_manager::perform(data, params, etrack, bank, rng);
        summary.energy_deposit += etrack.track.energy_deposit;
        if !electron_manager::is_alive(etrack) {
            break;
        }
        if etrack.msc.is_active && !granted.on_boundary {
            apply_msc_displacement(etrack, navigator);
        }
        if granted.on_boundary {
            match navigator.locate(&etrack.track.position, &etrack.track.direction) {
                Some(imc) => {
                    etrack.track.mat_cut_index = imc;
                    etrack.reset();
                }
                None => {
                    summary.escaped_energy += escaping_energy(&etrack.track);
                    etrack.track.set_ekin(0.0);
                }
            }
        }
    }
    summary.num_secondaries = bank.len().saturating_sub(banked);
    summary
}

/// Transport a gamma until it is absorbed, converts or leaves the world.
/// Secondaries are banked, not transported.
pub fn transport_gamma(
    data: &EmData,
    navigator: &mut impl Navigator,
    track: &mut Track,
    bank: &mut SecondaryBank,
    rng: &mut impl RandomEngine,
) -> TrackSummary {
    let mut summary = TrackSummary::default();
    let banked = bank.len();
    let Some(imc) = navigator.locate(&track.position, &track.direction) else {
        summary.escaped_energy = track.ekin();
        return summary;
    };
    track.mat_cut_index = imc;

    while gamma_manager::is_alive(track) {
        if summary.num_steps == MAX_STEPS_PER_TRACK {
            summary.energy_deposit += track.ekin();
            track.set_ekin(0.0);
            break;
        }
        summary.num_steps += 1;

        let proposed = gamma_manager::how_far(data, track, rng);
        let granted = navigator.make_step(track, proposed);
        track.g_step_length = granted.step;
        track.on_boundary = granted.on_boundary;
        track.advance(granted.step);

        gamma_manager::perform(data, track, bank, rng);
        summary.energy_deposit += track.energy_deposit;
        if granted.on_boundary && gamma_manager::is_alive(track) {
            match navigator.locate(&track.position, &track.direction) {
                Some(imc) => track.mat_cut_index = imc,
                None => {
                    summary.escaped_energy += track.ekin();
                    track.set_ekin(0.0);
                }
            }
        }
    }
    summary.num_secondaries = bank.len().saturating_sub(banked);
    summary
}

/// Transport a primary and, in production order, every secondary of every
/// generation. Tracks get consecutive ids starting from the primary's.
pub fn transport_history(
    data: &EmData,
    params: &Parameters,
    navigator: &mut impl Navigator,
    primary: Track,
    rng: &mut impl RandomEngine,
) -> TrackSummary {
    let mut summary = TrackSummary::default();
    let mut bank = SecondaryBank::new();
    let mut next_id = primary.id + 1;
    let mut assign_id = |mut track: Track| {
        track.id = next_id;
        next_id += 1;
        track
    };

    let mut pending = Some(primary);
    loop {
        let track = match pending.take() {
            Some(track) => track,
            None => match bank.pop_electron().or_else(|| bank.pop_gamma()) {
                Some(track) => assign_id(track),
                None => break,
            },
        };
        let step_summary = if track.charge == 0.0 {
            let mut track = track;
            transport_gamma(data, navigator, &mut track, &mut bank, rng)
        } else {
            let mut etrack = ElectronTrack::new(track);
            transport_electron(data, params, navigator, &mut etrack, &mut bank, rng)
        };
        summary.add(&step_summary);
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{build_em_data, BuildOptions, MatCutSpec, MaterialSpec};
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn water_data() -> EmData {
        let materials = [
            MaterialSpec::compound("G4_WATER", 1.0, 78.0e-6, &[(1, 0.111894), (8, 0.888106)]),
            MaterialSpec::element("G4_Pb", 82, 11.35, 823.0e-6),
        ];
        let cuts = [MatCutSpec::new(0, 0.35, 0.0029), MatCutSpec::new(1, 0.1, 0.1)];
        build_em_data(&Parameters::default(), &materials, &cuts, &BuildOptions::default()).unwrap()
    }

    fn electron_at_origin(ekin: f64) -> Track {
        Track::new([0.0; 3], [0.0, 0.0, 1.0], ekin, -1.0)
    }

    #[test]
    fn test_slab_navigator_geometry() {
        let mut nav = SlabNavigator::new(vec![0.0, 1.0, 3.0], vec![0, 1]).unwrap();
        assert_eq!(nav.num_layers(), 2);
        let up = [0.0, 0.0, 1.0];
        let down = [0.0, 0.0, -1.0];
        assert_eq!(nav.locate(&[0.0, 0.0, 0.5], &up), Some(0));
        assert_eq!(nav.locate(&[0.0, 0.0, 1.0], &up), Some(1));
        assert_eq!(nav.locate(&[0.0, 0.0, 1.0], &down), Some(0));
        assert_eq!(nav.locate(&[0.0, 0.0, 0.0], &down), None);
        assert_eq!(nav.locate(&[0.0, 0.0, 3.0], &up), None);

        let mut track = Track::new([5.0, 0.0, 0.5], [0.6, 0.0, 0.8], 1.0, 0.0);
        let step = nav.make_step(&track, 10.0);
        assert!(step.on_boundary);
        assert_relative_eq!(step.step, 0.5 / 0.8, epsilon = 1.0e-12);
        assert_eq!(nav.make_step(&track, 0.1), NavigatorStep { step: 0.1, on_boundary: false });
        track.direction = [1.0, 0.0, 0.0];
        assert!(!nav.make_step(&track, 1.0e9).on_boundary);

        assert_relative_eq!(nav.compute_safety(&[0.0, 0.0, 0.3], 10.0), 0.3);
        assert_relative_eq!(nav.compute_safety(&[0.0, 0.0, 2.5], 10.0), 0.5);
        assert_relative_eq!(nav.compute_safety(&[0.0, 0.0, 2.5], 0.1), 0.1);
        assert_eq!(nav.compute_safety(&[0.0, 0.0, -1.0], 10.0), 0.0);

        assert!(SlabNavigator::new(vec![0.0, 1.0], vec![0, 1]).is_err());
        assert!(SlabNavigator::new(vec![1.0, 1.0], vec![0]).is_err());
    }

    #[test]
    fn test_displacement_stays_inside_safety() {
        let nav = SlabNavigator::single(1.0, 0).unwrap();
        let mut etrack = ElectronTrack::new(Track::new([0.0, 0.0, 0.9], [0.0, 0.0, 1.0], 1.0, -1.0));
        etrack.msc.displacement = [0.0, 0.0, 0.5];
        apply_msc_displacement(&mut etrack, &nav);
        assert_relative_eq!(etrack.track.position[2], 0.9 + 0.99 * 0.1, epsilon = 1.0e-12);

        // displacements below the geometric minimum are dropped
        etrack.msc.displacement = [1.0e-9, 0.0, 0.0];
        let before = etrack.track.position;
        apply_msc_displacement(&mut etrack, &nav);
        assert_eq!(etrack.track.position, before);
    }

    #[test]
    fn test_infinite_medium_absorbs_everything() {
        let data = water_data();
        let params = Parameters::default();
        let mut nav = InfiniteMedium::new(0);
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..20 {
            let summary = transport_history(&data, &params, &mut nav, electron_at_origin(10.0), &mut rng);
            assert_eq!(summary.escaped_energy, 0.0);
            assert_relative_eq!(summary.energy_deposit, 10.0, max_relative = 1.0e-6);
            assert!(summary.num_steps > 1);
        }
    }

    #[test]
    fn test_slab_energy_balance() {
        let data = water_data();
        let params = Parameters::default();
        let mut rng = StdRng::seed_from_u64(42);
        let mut nav = SlabNavigator::new(vec![0.0, 2.0, 2.5], vec![0, 1]).unwrap();
        let mut deposit = 0.0;
        let mut escaped = 0.0;
        for _ in 0..50 {
            let summary = transport_history(&data, &params, &mut nav, electron_at_origin(20.0), &mut rng);
            assert_relative_eq!(
                summary.energy_deposit + summary.escaped_energy,
                20.0,
                max_relative = 1.0e-6
            );
            deposit += summary.energy_deposit;
            escaped += summary.escaped_energy;
        }
        // a thin target lets most of the energy through
        assert!(escaped > deposit);
    }

    #[test]
    fn test_gamma_outside_world_escapes() {
        let data = water_data();
        let mut nav = SlabNavigator::single(1.0, 0).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let mut bank = SecondaryBank::new();
        // starts outside, heading away
        let mut track = Track::new([0.0, 0.0, -1.0], [0.0, 0.0, -1.0], 1.0, 0.0);
        let summary = transport_gamma(&data, &mut nav, &mut track, &mut bank, &mut rng);
        assert_eq!(summary.escaped_energy, 1.0);
        assert_eq!(summary.num_steps, 0);
        assert!(bank.is_empty());
    }

    #[test]
    fn test_secondaries_record_parent() {
        let data = water_data();
        let params = Parameters::default();
        let mut nav = InfiniteMedium::new(0);
        let mut rng = StdRng::seed_from_u64(42);
        let mut bank = SecondaryBank::new();
        let mut etrack = ElectronTrack::new(electron_at_origin(50.0));
        etrack.track.id = 7;
        let summary = transport_electron(&data, &params, &mut nav, &mut etrack, &mut bank, &mut rng);
        assert_eq!(summary.num_secondaries, bank.len());
        assert!(bank.electrons().chain(bank.gammas()).all(|t| t.parent_id == 7));
    }
}
