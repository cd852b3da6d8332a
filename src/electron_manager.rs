// Two-phase e-/e+ stepping: `how_far` proposes the geometric step, the
// host navigator moves the track, then `perform` applies the continuous
// part of the step and the discrete interaction that limited it.
//
// All functions are free functions over explicit arguments; the only
// mutable state is the track and the secondary bank of the caller.

use crate::bank::SecondaryBank;
use crate::constants::ELECTRON_MASS_C2;
use crate::interactions::{
    annihilation, bremsstrahlung, fluctuation, ionisation, msc, ElectronInteraction,
};
use crate::parameters::Parameters;
use crate::random::RandomEngine;
use crate::tables::electron_data::LARGE_MFP;
use crate::tables::{ElectronData, EmData};
use crate::track::{ElectronTrack, MscTrackData, Track, WinnerProcess};

/// Below this true length the projected length equals the true one [mm]
const TLIMIT_MIN_FIX2: f64 = 1.0e-6;
/// Below this `t / lambda` the projected length uses the linear expansion
const TAU_LIM: f64 = 1.0e-6;
const TAU_SMALL: f64 = 1.0e-16;
/// Fraction of the range below which the transport mean free path is constant
const DTRL: f64 = 0.05;

/// Restricted range [mm].
#[inline]
pub fn get_rest_range(data: &ElectronData, imc: usize, ekin: f64, log_ekin: f64) -> f64 {
    data.rest_range(imc, ekin, log_ekin)
}

/// Restricted stopping power [MeV/mm].
#[inline]
pub fn get_rest_dedx(data: &ElectronData, imc: usize, ekin: f64, log_ekin: f64) -> f64 {
    data.rest_dedx(imc, ekin, log_ekin)
}

/// Kinetic energy that corresponds to a restricted range.
#[inline]
pub fn get_inv_range(data: &ElectronData, imc: usize, range: f64) -> f64 {
    data.inv_range(imc, range)
}

/// Restricted macroscopic cross section of ionisation (`is_ioni`) or
/// bremsstrahlung [1/mm].
#[inline]
pub fn get_rest_mac_xsec(
    data: &ElectronData,
    imc: usize,
    ekin: f64,
    log_ekin: f64,
    is_ioni: bool,
) -> f64 {
    data.rest_mac_xsec(imc, ekin, log_ekin, is_ioni)
}

/// Maximum of the restricted cross section over `[0.8 E, E]` [1/mm].
#[inline]
pub fn get_rest_mac_xsec_for_stepping(
    data: &ElectronData,
    imc: usize,
    ekin: f64,
    log_ekin: f64,
    is_ioni: bool,
) -> f64 {
    data.rest_mac_xsec_for_stepping(imc, ekin, log_ekin, is_ioni)
}

/// First transport mean free path in material `imat` [mm].
#[inline]
pub fn get_transport_mfp(data: &ElectronData, imat: usize, ekin: f64, log_ekin: f64) -> f64 {
    data.transport_mfp(imat, ekin, log_ekin)
}

/// Macroscopic in-flight annihilation cross section [1/mm].
#[inline]
pub fn compute_mac_xsec_annihilation(ekin: f64, electron_density: f64) -> f64 {
    electron_density * annihilation::xsec_per_electron(ekin)
}

/// Annihilation cross section used for stepping: the cross section falls
/// monotonically with energy, so its maximum over `[0.8 E, E]` is at `0.8 E`.
#[inline]
pub fn compute_mac_xsec_annihilation_for_stepping(ekin: f64, electron_density: f64) -> f64 {
    compute_mac_xsec_annihilation(0.8 * ekin, electron_density)
}

/// Step length limited by the continuous energy loss.
#[inline]
fn continuous_step_limit(range: f64, params: &Parameters) -> f64 {
    let fr = params.final_range;
    if range > fr {
        let drr = params.d_rover_range;
        range * drr + fr * (1.0 - drr) * (2.0 - fr / range)
    } else {
        range
    }
}

/// Physical step limit from the continuous loss and the discrete processes.
///
/// Samples the missing interaction counts, stores the range, the mean free
/// paths and the winner process on the track and returns the true step.
pub fn how_far_to_discrete_interaction(
    data: &EmData,
    params: &Parameters,
    etrack: &mut ElectronTrack,
    rng: &mut impl RandomEngine,
) -> f64 {
    let is_electron = etrack.is_electron();
    let edata = data.charged_data(is_electron);
    let track = &mut etrack.track;
    let imc = track.mat_cut_index;
    let ekin = track.ekin();
    let log_ekin = track.log_ekin();
    let electron_density = data.material_of(imc).electron_density;

    let range = edata.rest_range(imc, ekin, log_ekin);
    etrack.range = range;
    etrack.pre_step_ekin = ekin;
    etrack.pre_step_log_ekin = log_ekin;

    let mut p_step = continuous_step_limit(range, params);
    track.winner = WinnerProcess::Continuous;
    for process in ElectronInteraction::ALL {
        let slot = process.slot();
        let mxsec = match process {
            ElectronInteraction::Ionisation => {
                edata.rest_mac_xsec_for_stepping(imc, ekin, log_ekin, true)
            }
            ElectronInteraction::Bremsstrahlung => {
                edata.rest_mac_xsec_for_stepping(imc, ekin, log_ekin, false)
            }
            ElectronInteraction::Annihilation if is_electron => {
                track.mfp[slot] = LARGE_MFP;
                continue;
            }
            ElectronInteraction::Annihilation => {
                compute_mac_xsec_annihilation_for_stepping(ekin, electron_density)
            }
        };
        if track.num_ia_left[slot] <= 0.0 {
            track.num_ia_left[slot] = -(1.0 - rng.flat()).ln();
        }
        let mfp = if mxsec > 0.0 { 1.0 / mxsec } else { LARGE_MFP };
        track.mfp[slot] = mfp;
        let limit = mfp * track.num_ia_left[slot];
        if limit < p_step {
            p_step = limit;
            track.winner = WinnerProcess::Discrete(slot);
        }
    }
    etrack.p_step_length = p_step;
    p_step
}

/// Let multiple scattering shorten the true step, then convert it to the
/// geometric step requested from the navigator.
pub fn how_far_to_msc(
    data: &EmData,
    params: &Parameters,
    etrack: &mut ElectronTrack,
    rng: &mut impl RandomEngine,
) -> f64 {
    let is_electron = etrack.is_electron();
    let edata = data.charged_data(is_electron);
    let imc = etrack.track.mat_cut_index;
    let imat = data.mat_cut_data.get(imc).mat_index;
    let mat = data.material_data.get(imat);
    let ekin = etrack.track.ekin();
    let log_ekin = etrack.track.log_ekin();

    let msc = &mut etrack.msc;
    msc.is_active = true;
    msc.lambda_tr1 = edata.transport_mfp(imat, ekin, log_ekin);
    msc.true_step_length = etrack.p_step_length;
    msc::step_limit(
        mat,
        params,
        msc,
        ekin,
        etrack.range,
        etrack.track.safety,
        etrack.track.on_boundary,
        is_electron,
        rng,
    );
    if msc.true_step_length < etrack.p_step_length {
        etrack.p_step_length = msc.true_step_length;
        etrack.track.winner = WinnerProcess::Msc;
    }
    let g_step = convert_true_to_geometric_length(edata, imc, imat, msc, ekin, etrack.range);
    etrack.track.g_step_length = g_step;
    g_step
}

/// First phase of a step: the geometric length to ask the navigator for.
pub fn how_far(
    data: &EmData,
    params: &Parameters,
    etrack: &mut ElectronTrack,
    rng: &mut impl RandomEngine,
) -> f64 {
    how_far_to_discrete_interaction(data, params, etrack, rng);
    if params.multiple_scattering {
        how_far_to_msc(data, params, etrack, rng)
    } else {
        etrack.msc.is_active = false;
        etrack.track.g_step_length = etrack.p_step_length;
        etrack.p_step_length
    }
}

/// Projected length of the true step in `msc`; fills the shape parameters
/// used by the inverse conversion.
pub fn convert_true_to_geometric_length(
    data: &ElectronData,
    imc: usize,
    imat: usize,
    msc: &mut MscTrackData,
    ekin: f64,
    range: f64,
) -> f64 {
    let lambda0 = msc.lambda_tr1;
    msc.par1 = -1.0;
    msc.par2 = 0.0;
    msc.par3 = 0.0;
    let tpath = msc.true_step_length.min(range);
    msc.true_step_length = tpath;
    msc.z_path_length = tpath;
    if tpath < TLIMIT_MIN_FIX2 {
        return tpath;
    }
    let tau = tpath / lambda0;
    let zpath = if tau <= TAU_SMALL {
        tpath.min(lambda0)
    } else if tpath < range * DTRL {
        if tau < TAU_LIM {
            tpath * (1.0 - 0.5 * tau)
        } else {
            lambda0 * (1.0 - (-tau).exp())
        }
    } else if ekin < ELECTRON_MASS_C2 || tpath == range {
        msc.par1 = 1.0 / range;
        msc.par2 = 1.0 / (msc.par1 * lambda0);
        msc.par3 = 1.0 + msc.par2;
        if tpath < range {
            (1.0 - (msc.par3 * (1.0 - tpath / range).ln()).exp()) / (msc.par1 * msc.par3)
        } else {
            1.0 / (msc.par1 * msc.par3)
        }
    } else {
        let rfin = (range - tpath).max(0.01 * range);
        let t1 = data.inv_range(imc, rfin);
        let lambda1 = data.transport_mfp(imat, t1, t1.ln());
        msc.par1 = (lambda0 - lambda1) / (lambda0 * tpath);
        msc.par2 = 1.0 / (msc.par1 * lambda0);
        msc.par3 = 1.0 + msc.par2;
        (1.0 - (msc.par3 * (lambda1 / lambda0).ln()).exp()) / (msc.par1 * msc.par3)
    };
    msc.z_path_length = zpath.min(lambda0);
    msc.z_path_length
}

/// True length of a geometric step, using the shape parameters of the last
/// forward conversion.
pub fn convert_geometric_to_true_length(msc: &mut MscTrackData, g_step: f64, range: f64) -> f64 {
    if g_step == msc.z_path_length {
        return msc.true_step_length;
    }
    msc.z_path_length = g_step;
    let lambda0 = msc.lambda_tr1;
    let mut tlength = g_step;
    if g_step >= TLIMIT_MIN_FIX2 && g_step > lambda0 * TAU_SMALL {
        tlength = if msc.par1 < 0.0 {
            -lambda0 * (1.0 - g_step / lambda0).ln()
        } else if msc.par1 * msc.par3 * g_step < 1.0 {
            (1.0 - ((1.0 - msc.par1 * msc.par3 * g_step).ln() / msc.par3).exp()) / msc.par1
        } else {
            range
        };
        tlength = tlength.clamp(g_step, msc.true_step_length.max(g_step));
    }
    msc.true_step_length = tlength;
    tlength
}

/// Physical step actually travelled, from the navigator's geometric step.
pub fn update_p_step_length(etrack: &mut ElectronTrack) {
    let g_step = etrack.track.g_step_length;
    etrack.p_step_length = if etrack.msc.is_active {
        convert_geometric_to_true_length(&mut etrack.msc, g_step, etrack.range)
    } else {
        g_step
    };
    if etrack.track.on_boundary {
        etrack.track.winner = WinnerProcess::Continuous;
    }
}

/// Subtract the travelled number of mean free paths from every sampled
/// interaction count.
pub fn update_num_ia_left(track: &mut Track, p_step: f64) {
    for (left, mfp) in track.num_ia_left.iter_mut().zip(track.mfp) {
        if *left > 0.0 {
            *left = (*left - p_step / mfp).max(0.0);
        }
    }
}

/// Mean restricted energy loss along a true step [MeV].
///
/// Uses `dE/dx * step` while the loss stays below `lin_loss_limit * E`,
/// otherwise the range table: `E - E(range - step)`.
#[allow(clippy::too_many_arguments)]
pub fn apply_mean_energy_loss(
    data: &ElectronData,
    imc: usize,
    ekin: f64,
    log_ekin: f64,
    step: f64,
    range: f64,
    lin_loss_limit: f64,
) -> f64 {
    if step >= range {
        return ekin;
    }
    let eloss = step * data.rest_dedx(imc, ekin, log_ekin);
    if eloss < ekin * lin_loss_limit {
        return eloss;
    }
    (ekin - data.inv_range(imc, range - step)).clamp(0.0, ekin)
}

/// Deflect the track by multiple scattering over the current true step.
///
/// The lateral displacement is left in `etrack.msc.displacement` for the
/// host, which knows the safety.
pub fn sample_msc(
    data: &EmData,
    etrack: &mut ElectronTrack,
    post_ekin: f64,
    rng: &mut impl RandomEngine,
) {
    let is_electron = etrack.is_electron();
    let imc = etrack.track.mat_cut_index;
    let imat = data.mat_cut_data.get(imc).mat_index;
    let mat = data.material_data.get(imat);
    let lambda_post = data
        .charged_data(is_electron)
        .transport_mfp(imat, post_ekin, post_ekin.ln());
    let msc = &mut etrack.msc;
    msc.true_step_length = etrack.p_step_length;
    msc::sample_scattering(
        mat,
        msc,
        etrack.pre_step_ekin,
        post_ekin,
        lambda_post,
        &etrack.track.direction,
        is_electron,
        rng,
    );
    if !msc.is_no_scattering {
        etrack.track.direction = msc.direction;
    }
}

/// Fluctuated energy loss around `mean_loss` over the current true step.
pub fn sample_loss_fluctuations(
    data: &EmData,
    etrack: &ElectronTrack,
    mean_loss: f64,
    rng: &mut impl RandomEngine,
) -> f64 {
    let imc = etrack.track.mat_cut_index;
    let mat = data.material_of(imc);
    let ekin = etrack.pre_step_ekin;
    let tmax = ionisation::max_energy_transfer(ekin, etrack.is_electron());
    let tcut = data.mat_cut_data.get(imc).sec_el_prod_cut.min(tmax);
    fluctuation::sample_loss_fluctuation(mat, ekin, tcut, tmax, etrack.p_step_length, mean_loss, rng)
}

/// Stop the track: deposit its energy and let a positron annihilate at rest.
fn stop_track(etrack: &mut ElectronTrack, bank: &mut SecondaryBank, rng: &mut impl RandomEngine) {
    let track = &mut etrack.track;
    track.energy_deposit += track.ekin();
    track.set_ekin(0.0);
    if !track.is_electron() {
        let out = annihilation::sample_at_rest(rng);
        bank.push_gamma(Track::secondary_of(track, out.gamma1_ekin, out.gamma1_dir, 0.0));
        bank.push_gamma(Track::secondary_of(track, out.gamma2_ekin, out.gamma2_dir, 0.0));
    }
}

/// Continuous part of the step: mean loss, deflection and fluctuation.
///
/// Returns `true` when the track stopped.
pub fn perform_continuous(
    data: &EmData,
    params: &Parameters,
    etrack: &mut ElectronTrack,
    bank: &mut SecondaryBank,
    rng: &mut impl RandomEngine,
) -> bool {
    let is_electron = etrack.is_electron();
    let imc = etrack.track.mat_cut_index;
    let ekin = etrack.track.ekin();
    let log_ekin = etrack.track.log_ekin();
    let mut eloss = apply_mean_energy_loss(
        data.charged_data(is_electron),
        imc,
        ekin,
        log_ekin,
        etrack.p_step_length,
        etrack.range,
        params.lin_eloss_limit,
    );
    if eloss >= ekin {
        stop_track(etrack, bank, rng);
        return true;
    }
    if etrack.msc.is_active {
        sample_msc(data, etrack, ekin - eloss, rng);
    }
    if params.loss_fluctuation {
        eloss = sample_loss_fluctuations(data, etrack, eloss, rng).min(ekin);
    }
    let post_ekin = ekin - eloss;
    if post_ekin <= params.electron_tracking_cut {
        stop_track(etrack, bank, rng);
        return true;
    }
    etrack.track.energy_deposit += eloss;
    etrack.track.set_ekin(post_ekin);
    false
}

/// Whether the discrete interaction selected with the stepping cross section
/// is rejected (a null event) at the post-step energy.
pub fn check_delta(data: &EmData, track: &mut Track, rng: &mut impl RandomEngine) -> bool {
    let WinnerProcess::Discrete(slot) = track.winner else {
        return false;
    };
    let is_electron = track.is_electron();
    let edata = data.charged_data(is_electron);
    let imc = track.mat_cut_index;
    let ekin = track.ekin();
    let log_ekin = track.log_ekin();
    let mxsec = match ElectronInteraction::from_slot(slot) {
        Some(ElectronInteraction::Ionisation) => edata.rest_mac_xsec(imc, ekin, log_ekin, true),
        Some(ElectronInteraction::Bremsstrahlung) => {
            edata.rest_mac_xsec(imc, ekin, log_ekin, false)
        }
        Some(ElectronInteraction::Annihilation) => {
            compute_mac_xsec_annihilation(ekin, data.material_of(imc).electron_density)
        }
        None => return true,
    };
    mxsec * track.mfp[slot] <= rng.flat()
}

/// Sample the winner discrete interaction and push its secondaries.
pub fn perform_discrete(
    data: &EmData,
    params: &Parameters,
    etrack: &mut ElectronTrack,
    bank: &mut SecondaryBank,
    rng: &mut impl RandomEngine,
) {
    let WinnerProcess::Discrete(slot) = etrack.track.winner else {
        return;
    };
    let Some(process) = ElectronInteraction::from_slot(slot) else {
        return;
    };
    let is_electron = etrack.is_electron();
    let track = &mut etrack.track;
    let imc = track.mat_cut_index;
    let mc = data.mat_cut_data.get(imc);
    let mat = data.material_data.get(mc.mat_index);
    let ekin = track.ekin();
    let log_ekin = track.log_ekin();

    match process {
        ElectronInteraction::Ionisation => {
            let Some(out) =
                ionisation::sample(ekin, mc.sec_el_prod_cut, &track.direction, is_electron, rng)
            else {
                return;
            };
            bank.push_electron(Track::secondary_of(track, out.delta_ekin, out.delta_dir, -1.0));
            track.set_ekin(out.primary_ekin);
            track.direction = out.primary_dir;
        }
        ElectronInteraction::Bremsstrahlung => {
            let gamma_cut = mc.sec_gam_prod_cut;
            if ekin <= gamma_cut {
                return;
            }
            let is_sb = ekin < params.electron_brem_model_lim;
            let edata = data.charged_data(is_electron);
            let pos = bremsstrahlung::select_element(edata, mat, imc, log_ekin, is_sb, rng);
            let elem = data.element_data.get(mat.element_z[pos]);
            let egamma = if is_sb {
                let row = data.sb_table_data.cut_row(imc, pos);
                bremsstrahlung::sample_energy_transfer_sb(
                    &data.sb_table_data,
                    elem,
                    row,
                    mat,
                    ekin,
                    log_ekin,
                    gamma_cut,
                    is_electron,
                    rng,
                )
            } else {
                bremsstrahlung::sample_energy_transfer_rb(elem, mat, ekin, gamma_cut, rng)
            };
            let out = bremsstrahlung::final_state(ekin, egamma, &track.direction, rng);
            bank.push_gamma(Track::secondary_of(track, out.gamma_ekin, out.gamma_dir, 0.0));
            track.set_ekin(out.primary_ekin);
            track.direction = out.primary_dir;
        }
        ElectronInteraction::Annihilation => {
            let out = annihilation::sample_in_flight(ekin, &track.direction, rng);
            bank.push_gamma(Track::secondary_of(track, out.gamma1_ekin, out.gamma1_dir, 0.0));
            bank.push_gamma(Track::secondary_of(track, out.gamma2_ekin, out.gamma2_dir, 0.0));
            track.set_ekin(0.0);
            return;
        }
    }
    if track.ekin() <= params.electron_tracking_cut {
        stop_track(etrack, bank, rng);
    }
}

/// Second phase of a step, after the navigator has set the geometric step
/// length and the boundary flag.
pub fn perform(
    data: &EmData,
    params: &Parameters,
    etrack: &mut ElectronTrack,
    bank: &mut SecondaryBank,
    rng: &mut impl RandomEngine,
) {
    etrack.track.energy_deposit = 0.0;
    update_p_step_length(etrack);
    update_num_ia_left(&mut etrack.track, etrack.p_step_length);
    if perform_continuous(data, params, etrack, bank, rng) {
        return;
    }
    if etrack.track.on_boundary {
        return;
    }
    let WinnerProcess::Discrete(slot) = etrack.track.winner else {
        return;
    };
    etrack.track.num_ia_left[slot] = -1.0;
    if check_delta(data, &mut etrack.track, rng) {
        return;
    }
    perform_discrete(data, params, etrack, bank, rng);
}

/// Whether the track is still alive.
#[inline]
pub fn is_alive(etrack: &ElectronTrack) -> bool {
    etrack.track.ekin() > 0.0
}
