// Physics configuration shared by table construction and the run-time kernel

use crate::error::{KernelError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Physics modelling parameters used at initialization and at run time.
///
/// Energies are in MeV and lengths in mm. A single instance is created
/// before the tables are built and is then shared read-only by every
/// worker together with the tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    /// e-/e+ tracks are stopped below this kinetic energy; the remaining
    /// energy is deposited and a positron annihilates at rest.
    pub electron_tracking_cut: f64,
    /// Lower edge of the energy loss table grid.
    pub min_loss_table_energy: f64,
    /// Upper edge of the energy loss table grid.
    pub max_loss_table_energy: f64,
    /// Number of log-uniform bins of the energy loss table grid.
    pub num_loss_table_bins: usize,
    /// Final range parameter of the continuous loss step limit.
    pub final_range: f64,
    /// Rover range parameter of the continuous loss step limit.
    pub d_rover_range: f64,
    /// Maximum fraction of the kinetic energy that may be lost along a step
    /// under the linear approximation; above it the range table is inverted.
    pub lin_eloss_limit: f64,
    /// Kinetic energy separating the Seltzer-Berger and relativistic
    /// bremsstrahlung models.
    pub electron_brem_model_lim: f64,
    /// Urban MSC range factor.
    pub msc_range_factor: f64,
    /// Urban MSC safety factor.
    pub msc_safety_factor: f64,
    /// Sample fluctuations around the mean sub-threshold energy loss.
    pub loss_fluctuation: bool,
    /// Apply multiple Coulomb scattering (step limit, deflection, displacement).
    pub multiple_scattering: bool,
}

impl Default for Parameters {
    fn default() -> Self {
        Parameters {
            electron_tracking_cut: 1.0e-3,
            min_loss_table_energy: 1.0e-4,
            max_loss_table_energy: 1.0e8,
            num_loss_table_bins: 84,
            final_range: 1.0,
            d_rover_range: 0.2,
            lin_eloss_limit: 0.01,
            electron_brem_model_lim: 1.0e3,
            msc_range_factor: 0.04,
            msc_safety_factor: 0.6,
            loss_fluctuation: true,
            multiple_scattering: true,
        }
    }
}

impl Parameters {
    /// Create parameters with the default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Check every field against its allowed range.
    pub fn validate(&self) -> Result<()> {
        fn positive(name: &'static str, value: f64) -> Result<()> {
            if !(value > 0.0 && value.is_finite()) {
                return Err(KernelError::invalid_parameter(
                    name,
                    format!("must be positive and finite, got {value}"),
                ));
            }
            Ok(())
        }
        fn fraction(name: &'static str, value: f64) -> Result<()> {
            if !(value > 0.0 && value <= 1.0) {
                return Err(KernelError::invalid_parameter(
                    name,
                    format!("must be in (0, 1], got {value}"),
                ));
            }
            Ok(())
        }

        positive("electron_tracking_cut", self.electron_tracking_cut)?;
        positive("min_loss_table_energy", self.min_loss_table_energy)?;
        positive("max_loss_table_energy", self.max_loss_table_energy)?;
        if self.max_loss_table_energy <= self.min_loss_table_energy {
            return Err(KernelError::invalid_parameter(
                "max_loss_table_energy",
                "must be above min_loss_table_energy",
            ));
        }
        if self.num_loss_table_bins < 2 {
            return Err(KernelError::invalid_parameter(
                "num_loss_table_bins",
                format!("needs at least 2 bins, got {}", self.num_loss_table_bins),
            ));
        }
        positive("final_range", self.final_range)?;
        fraction("d_rover_range", self.d_rover_range)?;
        fraction("lin_eloss_limit", self.lin_eloss_limit)?;
        positive("electron_brem_model_lim", self.electron_brem_model_lim)?;
        fraction("msc_range_factor", self.msc_range_factor)?;
        fraction("msc_safety_factor", self.msc_safety_factor)?;
        Ok(())
    }

    /// Number of points of the energy loss grid (bins + 1).
    pub fn num_loss_table_energies(&self) -> usize {
        self.num_loss_table_bins + 1
    }

    /// Read parameters from a JSON document; missing fields take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let pars: Parameters = serde_json::from_str(&text)?;
        pars.validate()?;
        info!(path = %path.as_ref().display(), "loaded physics parameters");
        Ok(pars)
    }

    /// Write parameters as pretty printed JSON.
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }
}
