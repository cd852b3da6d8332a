// Per-track mutable state passed to the kernel

use crate::constants::LOG_OF_ZERO;
use crate::error::{KernelError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Particle species transported by the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParticleKind {
    #[serde(rename = "e-")]
    Electron,
    #[serde(rename = "e+")]
    Positron,
    #[serde(rename = "gamma")]
    Gamma,
}

impl ParticleKind {
    pub fn charge(self) -> f64 {
        match self {
            ParticleKind::Electron => -1.0,
            ParticleKind::Positron => 1.0,
            ParticleKind::Gamma => 0.0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ParticleKind::Electron => "e-",
            ParticleKind::Positron => "e+",
            ParticleKind::Gamma => "gamma",
        }
    }
}

impl FromStr for ParticleKind {
    type Err = KernelError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "e-" | "electron" => Ok(ParticleKind::Electron),
            "e+" | "positron" => Ok(ParticleKind::Positron),
            "gamma" | "photon" => Ok(ParticleKind::Gamma),
            other => Err(KernelError::UnknownParticle(other.to_string())),
        }
    }
}

impl fmt::Display for ParticleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Process that limited the current step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WinnerProcess {
    /// Continuous energy loss (or the navigator)
    #[default]
    Continuous,
    /// Multiple scattering step limit
    Msc,
    /// Discrete interaction in the given process slot
    Discrete(usize),
}

impl WinnerProcess {
    /// Integer encoding: -1 continuous, -2 MSC, slot index otherwise.
    pub fn index(self) -> i32 {
        match self {
            WinnerProcess::Continuous => -1,
            WinnerProcess::Msc => -2,
            WinnerProcess::Discrete(i) => i as i32,
        }
    }

    pub fn from_index(index: i32) -> Self {
        match index {
            -2 => WinnerProcess::Msc,
            i if i >= 0 => WinnerProcess::Discrete(i as usize),
            _ => WinnerProcess::Continuous,
        }
    }
}

/// Kinematic and bookkeeping state common to gammas and e-/e+.
///
/// Process slots: for gammas `0` conversion, `1` Compton, `2` photoelectric;
/// for e-/e+ `0` ionisation, `1` bremsstrahlung, `2` annihilation (e+ only).
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub position: [f64; 3],
    pub direction: [f64; 3],
    ekin: f64,
    log_ekin: Option<f64>,
    pub charge: f64,
    /// Energy deposited in the last step [MeV]
    pub energy_deposit: f64,
    /// Geometric step length [mm]
    pub g_step_length: f64,
    pub mfp: [f64; 3],
    /// Number of mean free paths left per process; -1 when not yet sampled
    pub num_ia_left: [f64; 3],
    pub safety: f64,
    pub id: u64,
    pub parent_id: u64,
    pub mat_cut_index: usize,
    pub winner: WinnerProcess,
    pub on_boundary: bool,
}

impl Default for Track {
    fn default() -> Self {
        Track {
            position: [0.0; 3],
            direction: [0.0, 0.0, 1.0],
            ekin: 0.0,
            log_ekin: None,
            charge: 0.0,
            energy_deposit: 0.0,
            g_step_length: 0.0,
            mfp: [0.0; 3],
            num_ia_left: [-1.0; 3],
            safety: 0.0,
            id: 0,
            parent_id: 0,
            mat_cut_index: 0,
            winner: WinnerProcess::Continuous,
            on_boundary: false,
        }
    }
}

impl Track {
    pub fn new(position: [f64; 3], direction: [f64; 3], ekin: f64, charge: f64) -> Self {
        Track {
            position,
            direction,
            ekin,
            charge,
            ..Default::default()
        }
    }

    /// Primary of the given species.
    pub fn primary(kind: ParticleKind, position: [f64; 3], direction: [f64; 3], ekin: f64) -> Self {
        Self::new(position, direction, ekin, kind.charge())
    }

    /// New track created at the position and in the volume of `parent`.
    pub fn secondary_of(parent: &Track, ekin: f64, direction: [f64; 3], charge: f64) -> Self {
        let mut track = Self::new(parent.position, direction, ekin, charge);
        track.parent_id = parent.id;
        track.mat_cut_index = parent.mat_cut_index;
        track
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = id;
        self
    }

    pub fn kind(&self) -> ParticleKind {
        if self.charge < 0.0 {
            ParticleKind::Electron
        } else if self.charge > 0.0 {
            ParticleKind::Positron
        } else {
            ParticleKind::Gamma
        }
    }

    #[inline]
    pub fn ekin(&self) -> f64 {
        self.ekin
    }

    /// Set the kinetic energy and invalidate the cached logarithm.
    #[inline]
    pub fn set_ekin(&mut self, ekin: f64) {
        self.ekin = ekin;
        self.log_ekin = None;
    }

    /// Set the kinetic energy together with its known logarithm.
    #[inline]
    pub fn set_ekin_log(&mut self, ekin: f64, log_ekin: f64) {
        self.ekin = ekin;
        self.log_ekin = Some(log_ekin);
    }

    /// `ln(E)`, computed on first use after every energy change.
    #[inline]
    pub fn log_ekin(&mut self) -> f64 {
        match self.log_ekin {
            Some(l) => l,
            None => {
                let l = if self.ekin > 0.0 {
                    self.ekin.ln()
                } else {
                    LOG_OF_ZERO
                };
                self.log_ekin = Some(l);
                l
            }
        }
    }

    #[inline]
    pub fn is_electron(&self) -> bool {
        self.charge < 0.0
    }

    /// Move the track along its direction.
    #[inline]
    pub fn advance(&mut self, length: f64) {
        for (p, d) in self.position.iter_mut().zip(self.direction) {
            *p += length * d;
        }
    }

    /// Forget every sampled interaction length.
    pub fn reset_interaction_lengths(&mut self) {
        self.num_ia_left = [-1.0; 3];
    }
}

/// Multiple scattering state carried from the step limit to the deflection.
#[derive(Debug, Clone, PartialEq)]
pub struct MscTrackData {
    /// First transport mean free path at the pre-step point [mm]
    pub lambda_tr1: f64,
    pub true_step_length: f64,
    /// Projected (geometric) path length [mm]
    pub z_path_length: f64,
    pub displacement: [f64; 3],
    /// Direction after scattering
    pub direction: [f64; 3],
    pub initial_range: f64,
    pub dynamic_range_factor: f64,
    /// Smallest true step the step limit may propose [mm]
    pub tlimit_min: f64,
    pub par1: f64,
    pub par2: f64,
    pub par3: f64,
    pub is_no_scattering: bool,
    pub is_displace: bool,
    pub is_first_step: bool,
    pub is_active: bool,
}

impl Default for MscTrackData {
    fn default() -> Self {
        MscTrackData {
            lambda_tr1: 0.0,
            true_step_length: 0.0,
            z_path_length: 0.0,
            displacement: [0.0; 3],
            direction: [0.0, 0.0, 1.0],
            initial_range: 1.0e21,
            dynamic_range_factor: 0.04,
            tlimit_min: 1.0e-7,
            par1: -1.0,
            par2: 0.0,
            par3: 0.0,
            is_no_scattering: false,
            is_displace: false,
            is_first_step: true,
            is_active: false,
        }
    }
}

impl MscTrackData {
    /// Restore the defaults; done for new tracks and on entering a volume.
    pub fn reset(&mut self) {
        *self = MscTrackData::default();
    }
}

/// e-/e+ track: the common state plus the charged-particle step bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct ElectronTrack {
    pub track: Track,
    /// Restricted range at the pre-step point [mm]
    pub range: f64,
    /// Physical (true) step length [mm]
    pub p_step_length: f64,
    pub pre_step_ekin: f64,
    pub pre_step_log_ekin: f64,
    pub msc: MscTrackData,
}

impl Default for ElectronTrack {
    fn default() -> Self {
        ElectronTrack {
            track: Track {
                charge: -1.0,
                ..Default::default()
            },
            range: 0.0,
            p_step_length: 0.0,
            pre_step_ekin: 0.0,
            pre_step_log_ekin: 0.0,
            msc: MscTrackData::default(),
        }
    }
}

impl ElectronTrack {
    pub fn new(track: Track) -> Self {
        ElectronTrack {
            track,
            ..Default::default()
        }
    }

    /// Reset the per-volume state (interaction lengths are kept).
    pub fn reset(&mut self) {
        self.range = 0.0;
        self.p_step_length = 0.0;
        self.msc.reset();
    }

    #[inline]
    pub fn is_electron(&self) -> bool {
        self.track.is_electron()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_ekin_cache() {
        let mut t = Track::new([0.0; 3], [0.0, 0.0, 1.0], 2.0, 0.0);
        assert!((t.log_ekin() - 2f64.ln()).abs() < 1.0e-15);
        t.set_ekin(0.0);
        assert_eq!(t.log_ekin(), LOG_OF_ZERO);
        t.set_ekin_log(5.0, 1.0);
        assert_eq!(t.log_ekin(), 1.0);
    }

    #[test]
    fn test_defaults() {
        let e = ElectronTrack::default();
        assert!(e.is_electron());
        assert_eq!(e.track.num_ia_left, [-1.0; 3]);
        assert_eq!(e.msc.par1, -1.0);
        assert!(e.msc.is_first_step);
        assert_eq!(e.msc.tlimit_min, 1.0e-7);
    }

    #[test]
    fn test_winner_encoding() {
        for w in [
            WinnerProcess::Continuous,
            WinnerProcess::Msc,
            WinnerProcess::Discrete(0),
            WinnerProcess::Discrete(2),
        ] {
            assert_eq!(WinnerProcess::from_index(w.index()), w);
        }
        assert_eq!(WinnerProcess::Msc.index(), -2);
    }

    #[test]
    fn test_particle_kind_names() {
        for kind in [ParticleKind::Electron, ParticleKind::Positron, ParticleKind::Gamma] {
            assert_eq!(kind.name().parse::<ParticleKind>().unwrap(), kind);
            let t = Track::primary(kind, [0.0; 3], [0.0, 0.0, 1.0], 1.0);
            assert_eq!(t.kind(), kind);
        }
        assert!(matches!(
            "proton".parse::<ParticleKind>(),
            Err(KernelError::UnknownParticle(_))
        ));
    }

    #[test]
    fn test_secondary_inherits_location() {
        let mut parent = Track::primary(ParticleKind::Gamma, [1.0, 2.0, 3.0], [0.0, 0.0, 1.0], 5.0).with_id(7);
        parent.mat_cut_index = 3;
        let mut sec = Track::secondary_of(&parent, 2.0, [1.0, 0.0, 0.0], -1.0);
        assert_eq!(parent.id, 7);
        assert_eq!(sec.parent_id, 7);
        assert_eq!(sec.mat_cut_index, 3);
        assert_eq!(sec.position, parent.position);
        assert_eq!(sec.kind(), ParticleKind::Electron);
        assert_eq!(sec.ekin(), 2.0);
        assert!((sec.log_ekin() - 2f64.ln()).abs() < 1.0e-15);
        assert_eq!(sec.num_ia_left, [-1.0; 3]);
    }

    #[test]
    fn test_advance() {
        let mut t = Track::new([1.0, 0.0, 0.0], [0.0, 0.6, 0.8], 1.0, 0.0);
        t.advance(10.0);
        assert_eq!(t.position, [1.0, 6.0, 8.0]);
    }
}
