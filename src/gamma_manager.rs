// Two-phase gamma stepping. Gammas have no continuous loss and no
// multiple scattering, so the step proposed by `how_far` is already
// geometric.

use crate::bank::SecondaryBank;
use crate::constants::{COMPTON_MIN_ENERGY, ELECTRON_MASS_C2};
use crate::interactions::{compton, conversion, photoelectric, GammaInteraction};
use crate::random::RandomEngine;
use crate::tables::electron_data::LARGE_MFP;
use crate::tables::{EmData, MatRecord};
use crate::track::{Track, WinnerProcess};

/// Pair production macroscopic cross section [1/mm].
#[inline]
pub fn get_mac_xsec_conversion(data: &EmData, imat: usize, egamma: f64, log_egamma: f64) -> f64 {
    data.gamma_data.conversion_mac_xsec(imat, egamma, log_egamma)
}

/// Compton macroscopic cross section [1/mm].
#[inline]
pub fn get_mac_xsec_compton(data: &EmData, imat: usize, egamma: f64, log_egamma: f64) -> f64 {
    data.gamma_data.compton_mac_xsec(imat, egamma, log_egamma)
}

/// Photo-absorption macroscopic cross section from the Sandia table [1/mm].
#[inline]
pub fn get_mac_xsec_photoelectric(mat: &MatRecord, egamma: f64) -> f64 {
    mat.photoelectric_mac_xsec(egamma)
}

/// Sample the missing interaction counts and return the distance to the
/// nearest interaction; the winner and the step are stored on the track.
pub fn how_far(data: &EmData, track: &mut Track, rng: &mut impl RandomEngine) -> f64 {
    let imat = data.mat_cut_data.get(track.mat_cut_index).mat_index;
    let mat = data.material_data.get(imat);
    let egamma = track.ekin();
    let log_egamma = track.log_ekin();

    let mut step = f64::INFINITY;
    track.winner = WinnerProcess::Continuous;
    for process in GammaInteraction::ALL {
        let slot = process.slot();
        let mxsec = match process {
            GammaInteraction::Conversion => get_mac_xsec_conversion(data, imat, egamma, log_egamma),
            GammaInteraction::Compton => get_mac_xsec_compton(data, imat, egamma, log_egamma),
            GammaInteraction::Photoelectric => get_mac_xsec_photoelectric(mat, egamma),
        };
        if track.num_ia_left[slot] <= 0.0 {
            track.num_ia_left[slot] = -(1.0 - rng.flat()).ln();
        }
        let mfp = if mxsec > 0.0 { 1.0 / mxsec } else { LARGE_MFP };
        track.mfp[slot] = mfp;
        let limit = mfp * track.num_ia_left[slot];
        if limit < step {
            step = limit;
            track.winner = WinnerProcess::Discrete(slot);
        }
    }
    track.g_step_length = step;
    step
}

/// Subtract the travelled number of mean free paths from every counter.
pub fn update_num_ia_left(track: &mut Track) {
    let step = track.g_step_length;
    for (left, mfp) in track.num_ia_left.iter_mut().zip(track.mfp) {
        if *left > 0.0 {
            *left = (*left - step / mfp).max(0.0);
        }
    }
}

/// Absorb the gamma, depositing its energy.
fn kill(track: &mut Track) {
    track.energy_deposit += track.ekin();
    track.set_ekin(0.0);
}

/// Second phase of a step: update the counters and, unless the step ended
/// on a boundary, perform the winner interaction.
pub fn perform(
    data: &EmData,
    track: &mut Track,
    bank: &mut SecondaryBank,
    rng: &mut impl RandomEngine,
) {
    track.energy_deposit = 0.0;
    update_num_ia_left(track);
    if track.on_boundary {
        track.winner = WinnerProcess::Continuous;
        return;
    }
    let WinnerProcess::Discrete(slot) = track.winner else {
        return;
    };
    track.num_ia_left[slot] = -1.0;
    let Some(process) = GammaInteraction::from_slot(slot) else {
        return;
    };
    let imat = data.mat_cut_data.get(track.mat_cut_index).mat_index;
    let mat = data.material_data.get(imat);
    let egamma = track.ekin();

    match process {
        GammaInteraction::Conversion => {
            if egamma <= 2.0 * ELECTRON_MASS_C2 {
                return;
            }
            let u = rng.flat();
            let pos = data.gamma_data.elem_selector_conv.select(
                imat,
                mat.num_elements(),
                track.log_ekin(),
                u,
            );
            let elem = data.element_data.get(mat.element_z[pos]);
            let out = conversion::sample(elem, mat, egamma, &track.direction, rng);
            bank.push_electron(Track::secondary_of(track, out.electron_ekin, out.electron_dir, -1.0));
            bank.push_electron(Track::secondary_of(track, out.positron_ekin, out.positron_dir, 1.0));
            track.set_ekin(0.0);
        }
        GammaInteraction::Compton => {
            if egamma < COMPTON_MIN_ENERGY {
                kill(track);
                return;
            }
            let out = compton::sample(egamma, &track.direction, rng);
            if out.electron_ekin > 0.0 {
                bank.push_electron(Track::secondary_of(track, out.electron_ekin, out.electron_dir, -1.0));
            }
            track.energy_deposit += out.energy_deposit;
            track.set_ekin(out.gamma_ekin);
            track.direction = out.gamma_dir;
        }
        GammaInteraction::Photoelectric => {
            let pos = photoelectric::select_element(&data.element_data, mat, egamma, rng);
            let elem = data.element_data.get(mat.element_z[pos]);
            let out = photoelectric::sample(elem, egamma, &track.direction, rng);
            if out.electron_ekin > 0.0 {
                bank.push_electron(Track::secondary_of(track, out.electron_ekin, out.electron_dir, -1.0));
            }
            track.energy_deposit += out.energy_deposit;
            track.set_ekin(0.0);
        }
    }
}

/// Whether the gamma is still alive.
#[inline]
pub fn is_alive(track: &Track) -> bool {
    track.ekin() > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{build_em_data, BuildOptions, MatCutSpec, MaterialSpec};
    use crate::parameters::Parameters;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn lead_data() -> EmData {
        let materials = [MaterialSpec::element("G4_Pb", 82, 11.35, 823.0e-6)];
        let cuts = [MatCutSpec::new(0, 1.0, 0.1)];
        build_em_data(&Parameters::default(), &materials, &cuts, &BuildOptions::default()).unwrap()
    }

    fn gamma(egamma: f64) -> Track {
        Track::new([0.0; 3], [1.0, 0.0, 0.0], egamma, 0.0)
    }

    #[test]
    fn test_how_far_picks_shortest_process() {
        let data = lead_data();
        let mut rng = StdRng::seed_from_u64(42);
        let mut track = gamma(5.0);
        let step = how_far(&data, &mut track, &mut rng);
        let WinnerProcess::Discrete(slot) = track.winner else {
            panic!("no winner");
        };
        for i in 0..3 {
            assert!(step <= track.mfp[i] * track.num_ia_left[i] + 1.0e-12);
        }
        assert_relative_eq!(step, track.mfp[slot] * track.num_ia_left[slot]);
    }

    #[test]
    fn test_boundary_step_only_updates_counters() {
        let data = lead_data();
        let mut rng = StdRng::seed_from_u64(42);
        let mut bank = SecondaryBank::new();
        let mut track = gamma(1.0);
        let step = how_far(&data, &mut track, &mut rng);
        let before = track.num_ia_left;
        track.g_step_length = 0.5 * step;
        track.on_boundary = true;
        perform(&data, &mut track, &mut bank, &mut rng);
        assert_eq!(track.ekin(), 1.0);
        assert!(bank.is_empty());
        for i in 0..3 {
            assert!(track.num_ia_left[i] <= before[i]);
            assert!(track.num_ia_left[i] > 0.0);
        }
        assert!(track.num_ia_left[1] < before[1]);
    }

    #[test]
    fn test_gamma_history_conserves_energy() {
        let data = lead_data();
        let mut rng = StdRng::seed_from_u64(42);
        for egamma in [0.05, 1.0, 20.0] {
            for _ in 0..200 {
                let mut bank = SecondaryBank::new();
                let mut track = gamma(egamma);
                let mut deposit = 0.0;
                while is_alive(&track) {
                    how_far(&data, &mut track, &mut rng);
                    perform(&data, &mut track, &mut bank, &mut rng);
                    deposit += track.energy_deposit;
                    if bank.num_electrons() > 0 {
                        break;
                    }
                }
                let secondaries: f64 = bank
                    .electrons()
                    .map(|e| {
                        e.ekin() + if e.charge > 0.0 { 2.0 * ELECTRON_MASS_C2 } else { 0.0 }
                    })
                    .sum();
                assert_relative_eq!(
                    track.ekin() + deposit + secondaries,
                    egamma,
                    max_relative = 1.0e-9
                );
            }
        }
    }
}
