// Table-driven electromagnetic shower transport for e-, e+ and gammas.
//
// Physics tables are built once (`builder`) or loaded (`io`) into an
// immutable `EmData`, then shared by every worker. Each step is split in
// two phases around the host geometry: `how_far` proposes a step, the
// navigator limits it, `perform` applies it. Energies are in MeV, lengths
// in mm.

pub mod bank;
pub mod builder;
pub mod constants;
pub mod electron_manager;
pub mod error;
pub mod gamma_manager;
pub mod interactions;
pub mod io;
pub mod parameters;
pub mod random;
pub mod stepping;
pub mod tables;
pub mod track;
pub mod utilities;

pub use bank::SecondaryBank;
pub use error::{KernelError, Result};
pub use io::EmState;
pub use parameters::Parameters;
pub use random::{RandomEngine, TrackRng};
pub use stepping::{InfiniteMedium, Navigator, NavigatorStep, SlabNavigator, TrackSummary};
pub use tables::EmData;
pub use track::{ElectronTrack, ParticleKind, Track};

use tracing_subscriber::EnvFilter;

/// Install a `fmt` subscriber filtered by `RUST_LOG` (default `info`).
///
/// Does nothing when a global subscriber is already set, so tests and
/// binaries may call it more than once.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .ok();
}
