// Stateless samplers of the final states of every interaction.
//
// Each sampler takes the incoming kinematics, the relevant table records and
// a `RandomEngine`, and returns the sampled outgoing particles. Nothing here keeps state between calls.

pub mod annihilation;
pub mod bremsstrahlung;
pub mod compton;
pub mod conversion;
pub mod fluctuation;
pub mod ionisation;
pub mod msc;
pub mod photoelectric;
pub mod rotation;

/// Discrete e-/e+ processes, in track slot order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElectronInteraction {
    Ionisation,
    Bremsstrahlung,
    /// e+ only
    Annihilation,
}

impl ElectronInteraction {
    pub const ALL: [ElectronInteraction; 3] = [
        ElectronInteraction::Ionisation,
        ElectronInteraction::Bremsstrahlung,
        ElectronInteraction::Annihilation,
    ];

    pub fn from_slot(slot: usize) -> Option<Self> {
        Self::ALL.get(slot).copied()
    }

    #[inline]
    pub fn slot(self) -> usize {
        self as usize
    }
}

/// Discrete gamma processes, in track slot order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GammaInteraction {
    Conversion,
    Compton,
    Photoelectric,
}

impl GammaInteraction {
    pub const ALL: [GammaInteraction; 3] = [
        GammaInteraction::Conversion,
        GammaInteraction::Compton,
        GammaInteraction::Photoelectric,
    ];

    pub fn from_slot(slot: usize) -> Option<Self> {
        Self::ALL.get(slot).copied()
    }

    #[inline]
    pub fn slot(self) -> usize {
        self as usize
    }
}
