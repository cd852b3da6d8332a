// Physics checks of the full kernel against independent references: the
// range table, the Klein-Nishina angular distribution and annihilation at
// rest.

use approx::assert_relative_eq;
use emkernel::builder::{build_em_data, BuildOptions, MatCutSpec, MaterialSpec};
use emkernel::constants::ELECTRON_MASS_C2;
use emkernel::interactions::{annihilation, compton};
use emkernel::track::WinnerProcess;
use emkernel::{electron_manager, gamma_manager, ElectronTrack, EmData, Parameters, SecondaryBank, Track};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn water() -> MaterialSpec {
    MaterialSpec::compound("G4_WATER", 1.0, 78.0e-6, &[(1, 0.111894), (8, 0.888106)])
}

fn aluminium() -> MaterialSpec {
    MaterialSpec::element("G4_Al", 13, 2.699, 166.0e-6)
}

fn build(material: MaterialSpec, params: &Parameters, options: &BuildOptions, cuts: &[MatCutSpec]) -> EmData {
    build_em_data(params, &[material], cuts, options).unwrap()
}

#[test]
fn test_ionisation_only_path_matches_range() {
    // no deltas, no photons, no fluctuation, no scattering: the summed true
    // path of a 10 MeV electron is its range
    let params = Parameters {
        loss_fluctuation: false,
        multiple_scattering: false,
        ..Default::default()
    };
    let options = BuildOptions {
        bremsstrahlung: false,
        ..Default::default()
    };
    let data = build(aluminium(), &params, &options, &[MatCutSpec::new(0, 1.0e3, 1.0e3)]);
    let e0: f64 = 10.0;
    let range = data.electron_data.rest_range(0, e0, e0.ln());

    let mut rng = StdRng::seed_from_u64(42);
    let mut bank = SecondaryBank::new();
    let mut etrack = ElectronTrack::new(Track::new([0.0; 3], [0.0, 0.0, 1.0], e0, -1.0));
    let mut path = 0.0;
    let mut deposit = 0.0;
    let mut steps = 0;
    while electron_manager::is_alive(&etrack) {
        let step = electron_manager::how_far(&data, &params, &mut etrack, &mut rng);
        etrack.track.on_boundary = false;
        electron_manager::perform(&data, &params, &mut etrack, &mut bank, &mut rng);
        path += step;
        deposit += etrack.track.energy_deposit;
        steps += 1;
    }
    assert!(bank.is_empty());
    assert!(steps > 1);
    assert_relative_eq!(deposit, e0, max_relative = 1.0e-12);
    assert_relative_eq!(path, range, max_relative = 1.0e-2);
}

#[test]
fn test_fluctuating_loss_over_fixed_path_matches_range() {
    // the mean of the fluctuated loss over a path L is E0 - E(R - L)
    let params = Parameters {
        multiple_scattering: false,
        ..Default::default()
    };
    let options = BuildOptions {
        bremsstrahlung: false,
        ..Default::default()
    };
    let data = build(aluminium(), &params, &options, &[MatCutSpec::new(0, 1.0e3, 1.0e3)]);
    let e0: f64 = 10.0;
    let range = data.electron_data.rest_range(0, e0, e0.ln());
    let mut rng = StdRng::seed_from_u64(42);
    let mut bank = SecondaryBank::new();
    let n = 4000;

    for frac in [0.1, 0.5] {
        let length = frac * range;
        let expected = e0 - data.electron_data.inv_range(0, range - length);
        let (mut sum, mut sum2) = (0.0, 0.0);
        for _ in 0..n {
            let mut etrack = ElectronTrack::new(Track::new([0.0; 3], [0.0, 0.0, 1.0], e0, -1.0));
            let mut path = 0.0;
            while path < length && electron_manager::is_alive(&etrack) {
                let step = electron_manager::how_far(&data, &params, &mut etrack, &mut rng);
                let step = step.min(length - path);
                etrack.track.g_step_length = step;
                etrack.track.on_boundary = false;
                electron_manager::perform(&data, &params, &mut etrack, &mut bank, &mut rng);
                path += step;
            }
            let loss = e0 - etrack.track.ekin();
            sum += loss;
            sum2 += loss * loss;
        }
        assert!(bank.is_empty());
        let mean = sum / n as f64;
        let std_err = ((sum2 / n as f64 - mean * mean).max(0.0) / n as f64).sqrt();
        assert!(std_err > 0.0, "losses do not fluctuate");
        assert!(
            (mean - expected).abs() < 4.0 * std_err + 1.0e-2 * expected,
            "frac {frac}: mean loss {mean} vs {expected} (std err {std_err})"
        );
    }
}

/// Klein-Nishina `<cos theta>` by Simpson integration over `cos theta`.
fn klein_nishina_mean_cost(egamma: f64) -> f64 {
    let k = egamma / ELECTRON_MASS_C2;
    let dcs = |c: f64| {
        let p = 1.0 / (1.0 + k * (1.0 - c));
        p * p * (p + 1.0 / p - (1.0 - c * c))
    };
    let n = 2000;
    let h = 2.0 / n as f64;
    let (mut norm, mut first) = (0.0, 0.0);
    for i in 0..=n {
        let c = -1.0 + i as f64 * h;
        let w = if i == 0 || i == n {
            1.0
        } else if i % 2 == 1 {
            4.0
        } else {
            2.0
        };
        norm += w * dcs(c);
        first += w * c * dcs(c);
    }
    first / norm
}

#[test]
fn test_compton_mean_angle_at_1_mev() {
    let mut rng = StdRng::seed_from_u64(42);
    let dir = [0.0, 0.0, 1.0];
    let n = 200_000;
    let mut sum = 0.0;
    for _ in 0..n {
        let out = compton::sample(1.0, &dir, &mut rng);
        sum += out.gamma_dir[2];
    }
    let mean = sum / n as f64;
    let expected = klein_nishina_mean_cost(1.0);
    assert!(expected > 0.3 && expected < 0.5);
    assert!((mean - expected).abs() < 5.0e-3, "{mean} vs {expected}");
}

#[test]
fn test_compton_in_water_follows_klein_nishina() {
    // conversion and photo-absorption pushed out of reach: every step is Compton
    let data = build(water(), &Parameters::default(), &BuildOptions::default(), &[MatCutSpec::new(0, 0.35, 0.0029)]);
    let mut rng = StdRng::seed_from_u64(42);
    let mut bank = SecondaryBank::new();
    let n = 100_000;
    let mut sum = 0.0;
    for _ in 0..n {
        let mut track = Track::new([0.0; 3], [0.0, 0.0, 1.0], 1.0, 0.0);
        track.num_ia_left = [1.0e30, -1.0, 1.0e30];
        gamma_manager::how_far(&data, &mut track, &mut rng);
        assert_eq!(track.winner, WinnerProcess::Discrete(1));
        gamma_manager::perform(&data, &mut track, &mut bank, &mut rng);
        sum += track.direction[2];
        bank.clear();
    }
    let mean = sum / n as f64;
    let expected = klein_nishina_mean_cost(1.0);
    assert!((mean - expected).abs() < 7.0e-3, "{mean} vs {expected}");
}

#[test]
fn test_annihilation_at_rest() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..10_000 {
        let out = annihilation::sample_at_rest(&mut rng);
        assert_eq!(out.gamma1_ekin, ELECTRON_MASS_C2);
        assert_eq!(out.gamma2_ekin, ELECTRON_MASS_C2);
        for i in 0..3 {
            assert!((out.gamma1_dir[i] + out.gamma2_dir[i]).abs() < 1.0e-12);
        }
    }
}

#[test]
fn test_stopping_positron_emits_back_to_back_photons() {
    let params = Parameters::default();
    let data = build(water(), &params, &BuildOptions::default(), &[MatCutSpec::new(0, 0.35, 0.0029)]);
    let mut rng = StdRng::seed_from_u64(42);
    let mut bank = SecondaryBank::new();
    let mut etrack = ElectronTrack::new(Track::new([0.0; 3], [0.0, 0.0, 1.0], 0.5e-3, 1.0));
    while electron_manager::is_alive(&etrack) {
        electron_manager::how_far(&data, &params, &mut etrack, &mut rng);
        electron_manager::perform(&data, &params, &mut etrack, &mut bank, &mut rng);
    }
    assert_eq!(bank.num_gammas(), 2);
    assert_eq!(bank.num_electrons(), 0);
    assert_relative_eq!(bank.total_energy(), 2.0 * ELECTRON_MASS_C2, max_relative = 1.0e-15);
    let p = bank.total_momentum();
    assert!(p.iter().all(|pi| pi.abs() < 1.0e-12));
}
