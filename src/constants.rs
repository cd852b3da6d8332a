// Physical constants in the internal unit system (MeV, mm)

use std::f64::consts::PI;

pub const TWO_PI: f64 = 2.0 * PI;

/// Electron rest mass energy [MeV]
pub const ELECTRON_MASS_C2: f64 = 0.510_998_950;
/// Classical electron radius [mm]
pub const CLASSIC_ELECTR_RADIUS: f64 = 2.817_940_326_2e-12;
/// Fine structure constant
pub const FINE_STRUCTURE_CONST: f64 = 1.0 / 137.035_999_084;
/// hbar * c [MeV mm]
pub const HBARC: f64 = 197.326_980_4e-12;
/// Reduced Compton wavelength of the electron [mm]
pub const REDUCED_COMPTON_WAVELENGTH: f64 = HBARC / ELECTRON_MASS_C2;
/// Avogadro's number [1/mol]
pub const AVOGADRO: f64 = 6.022_140_76e23;

/// 2 pi r_e^2 m_e c^2, the prefactor of the Moller/Bhabha cross sections [MeV mm^2]
pub const TWO_PI_MC2_RCL2: f64 =
    TWO_PI * ELECTRON_MASS_C2 * CLASSIC_ELECTR_RADIUS * CLASSIC_ELECTR_RADIUS;

/// Migdal constant 4 pi r_e lambda_e^2 [mm^3], multiplied by the electron
/// density it gives the dielectric suppression factor k_p^2 / E^2.
pub const MIGDAL_CONSTANT: f64 =
    4.0 * PI * CLASSIC_ELECTR_RADIUS * REDUCED_COMPTON_WAVELENGTH * REDUCED_COMPTON_WAVELENGTH;

/// LPM constant alpha m^2 / (4 pi hbar c) / 2 [MeV/mm], times the radiation
/// length it gives the characteristic LPM energy of the material.
pub const LPM_CONSTANT: f64 =
    0.5 * FINE_STRUCTURE_CONST * ELECTRON_MASS_C2 * ELECTRON_MASS_C2 / (4.0 * PI * HBARC);

/// Photon energy above which LPM suppression is applied in pair production [MeV]
pub const GAMMA_LPM_ENERGY: f64 = 100.0e3;

/// Lower bound of the Compton cross section grid [MeV]
pub const COMPTON_MIN_ENERGY: f64 = 100.0e-6;
/// Upper bound of the gamma cross section grids [MeV]
pub const GAMMA_MAX_ENERGY: f64 = 100.0e6;

/// Smallest geometric displacement worth applying [mm] (0.05 nm)
pub const GEOM_MIN_LENGTH: f64 = 5.0e-8;
/// Minimal true step length considered by MSC [mm] (0.01 nm)
pub const MSC_TLIMIT_MIN_FIX: f64 = 1.0e-8;
/// Minimal true step length with the default dynamic setting [mm]
pub const MSC_TLIMIT_MIN_DEFAULT: f64 = 1.0e-7;
/// Secondary tracking threshold for Compton and photoelectric outgoing particles [MeV]
pub const SECONDARY_MIN_ENERGY: f64 = 100.0e-6;

/// Value returned when the logarithm of a non-positive energy is requested
pub const LOG_OF_ZERO: f64 = -30.0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_constants() {
        // Migdal constant is about 5.28e-30 mm^3
        assert!((MIGDAL_CONSTANT / 5.2804e-30 - 1.0).abs() < 1.0e-3);
        // LPM constant is about 3.84e5 MeV/mm
        assert!((LPM_CONSTANT / 3.8422e5 - 1.0).abs() < 1.0e-3);
        assert!((REDUCED_COMPTON_WAVELENGTH / 3.8616e-10 - 1.0).abs() < 1.0e-3);
    }
}
