// Secondary particle banking
//
// Holds the e-/e+ and gamma secondaries produced by the kernel until the
// stepping loop transports them.

use crate::track::Track;
use std::collections::VecDeque;

/// Per-worker queue of secondary tracks produced during transport.
///
/// Charged secondaries (e- and e+, told apart by their charge) and gammas are
/// kept in separate queues so that the host can transport them with the
/// matching manager.
#[derive(Debug, Clone, Default)]
pub struct SecondaryBank {
    electrons: VecDeque<Track>,
    gammas: VecDeque<Track>,
}

impl SecondaryBank {
    /// Create a new empty bank
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a bank with an initial capacity per queue
    pub fn with_capacity(capacity: usize) -> Self {
        SecondaryBank {
            electrons: VecDeque::with_capacity(capacity),
            gammas: VecDeque::with_capacity(capacity),
        }
    }

    /// Bank an e- or e+
    pub fn push_electron(&mut self, track: Track) {
        self.electrons.push_back(track);
    }

    /// Bank a gamma
    pub fn push_gamma(&mut self, track: Track) {
        self.gammas.push_back(track);
    }

    /// Next e-/e+ in production order
    pub fn pop_electron(&mut self) -> Option<Track> {
        self.electrons.pop_front()
    }

    /// Next gamma in production order
    pub fn pop_gamma(&mut self) -> Option<Track> {
        self.gammas.pop_front()
    }

    pub fn electrons(&self) -> impl Iterator<Item = &Track> {
        self.electrons.iter()
    }

    pub fn gammas(&self) -> impl Iterator<Item = &Track> {
        self.gammas.iter()
    }

    pub fn num_electrons(&self) -> usize {
        self.electrons.len()
    }

    pub fn num_gammas(&self) -> usize {
        self.gammas.len()
    }

    pub fn len(&self) -> usize {
        self.electrons.len() + self.gammas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.electrons.is_empty() && self.gammas.is_empty()
    }

    /// Total kinetic energy of the banked tracks [MeV]
    pub fn total_energy(&self) -> f64 {
        self.electrons
            .iter()
            .chain(self.gammas.iter())
            .map(Track::ekin)
            .sum()
    }

    /// Total momentum of the banked tracks [MeV/c]
    pub fn total_momentum(&self) -> [f64; 3] {
        let mut p = [0.0; 3];
        for t in self.electrons.iter().chain(self.gammas.iter()) {
            let e = t.ekin();
            let pmag = if t.charge == 0.0 {
                e
            } else {
                (e * (e + 2.0 * crate::constants::ELECTRON_MASS_C2)).sqrt()
            };
            for (pi, di) in p.iter_mut().zip(t.direction) {
                *pi += pmag * di;
            }
        }
        p
    }

    /// Remove all banked tracks
    pub fn clear(&mut self) {
        self.electrons.clear();
        self.gammas.clear();
    }
}
