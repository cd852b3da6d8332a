// Final-state samplers driven by built tables over random energies and
// materials: every sampled transfer stays within its kinematic limits and
// the final states conserve energy.

use approx::assert_relative_eq;
use emkernel::builder::{build_em_data, BuildOptions, MatCutSpec, MaterialSpec};
use emkernel::constants::ELECTRON_MASS_C2;
use emkernel::interactions::rotation::norm;
use emkernel::interactions::{bremsstrahlung, compton, ionisation};
use emkernel::{EmData, Parameters, RandomEngine};
use rand::rngs::StdRng;
use rand::SeedableRng;

const NUM_DRAWS: usize = 10_000;

fn build_tables(params: &Parameters) -> EmData {
    let materials = [
        MaterialSpec::compound("G4_WATER", 1.0, 78.0e-6, &[(1, 0.111894), (8, 0.888106)]),
        MaterialSpec::element("G4_Pb", 82, 11.35, 823.0e-6),
        MaterialSpec::from_symbols("air", 1.205e-3, &[("N", 0.755), ("O", 0.232), ("Ar", 0.013)])
            .unwrap(),
    ];
    let cuts = [
        MatCutSpec::new(0, 0.35, 0.0029),
        MatCutSpec::new(1, 1.0, 0.1),
        MatCutSpec::new(2, 0.01, 0.02),
    ];
    build_em_data(params, &materials, &cuts, &BuildOptions::default()).unwrap()
}

/// Random material-cut and a log-uniform energy between `lo` and `hi`.
fn draw(data: &EmData, lo: f64, hi: f64, rng: &mut StdRng) -> (usize, f64) {
    let num = data.mat_cut_data.len();
    let imc = ((rng.flat() * num as f64) as usize).min(num - 1);
    let ekin = (lo.ln() + rng.flat() * (hi / lo).ln()).exp();
    (imc, ekin)
}

/// Photon energy of one bremsstrahlung interaction, as the kernel samples it.
fn sample_brem(data: &EmData, params: &Parameters, imc: usize, ekin: f64, is_electron: bool, rng: &mut StdRng) -> f64 {
    let mc = data.mat_cut_data.get(imc);
    let mat = data.material_data.get(mc.mat_index);
    let log_ekin = ekin.ln();
    let is_sb = ekin < params.electron_brem_model_lim;
    let edata = data.charged_data(is_electron);
    let pos = bremsstrahlung::select_element(edata, mat, imc, log_ekin, is_sb, rng);
    assert!(pos < mat.num_elements());
    let elem = data.element_data.get(mat.element_z[pos]);
    if is_sb {
        let row = data.sb_table_data.cut_row(imc, pos);
        bremsstrahlung::sample_energy_transfer_sb(
            &data.sb_table_data,
            elem,
            row,
            mat,
            ekin,
            log_ekin,
            mc.sec_gam_prod_cut,
            is_electron,
            rng,
        )
    } else {
        bremsstrahlung::sample_energy_transfer_rb(elem, mat, ekin, mc.sec_gam_prod_cut, rng)
    }
}

#[test]
fn test_bremsstrahlung_photons_between_cut_and_energy() {
    let params = Parameters::default();
    let data = build_tables(&params);
    let mut rng = StdRng::seed_from_u64(42);
    for is_electron in [true, false] {
        for _ in 0..NUM_DRAWS {
            let (imc, u) = draw(&data, 1.0, 1.0e8, &mut rng);
            let cut = data.mat_cut_data.get(imc).sec_gam_prod_cut;
            // energies from just above the cut up to the relativistic model
            let ekin = (1.05 * cut).max(1.0e-3) * u;
            let k = sample_brem(&data, &params, imc, ekin, is_electron, &mut rng);
            assert!(
                k >= cut * (1.0 - 1.0e-9) && k <= ekin * (1.0 + 1.0e-9),
                "k = {k} outside [{cut}, {ekin}] in material-cut {imc}"
            );
            let out = bremsstrahlung::final_state(ekin, k, &[0.0, 0.0, 1.0], &mut rng);
            assert_relative_eq!(out.gamma_ekin + out.primary_ekin, ekin, max_relative = 1.0e-12);
            assert_relative_eq!(norm(&out.gamma_dir), 1.0, epsilon = 1.0e-12);
            assert_relative_eq!(norm(&out.primary_dir), 1.0, epsilon = 1.0e-12);
        }
    }
}

#[test]
fn test_positron_correction_softens_tabulated_spectrum() {
    // lead, 1 MeV: the Coulomb repulsion suppresses hard photons of e+
    let params = Parameters::default();
    let data = build_tables(&params);
    let mut rng = StdRng::seed_from_u64(42);
    let n = 20_000;
    let mean_k = |is_electron: bool, rng: &mut StdRng| {
        (0..n)
            .map(|_| sample_brem(&data, &params, 1, 1.0, is_electron, rng))
            .sum::<f64>()
            / n as f64
    };
    let electron = mean_k(true, &mut rng);
    let positron = mean_k(false, &mut rng);
    assert!(positron < 0.95 * electron, "e+ {positron} vs e- {electron}");
    assert!(positron > 0.1);
}

#[test]
fn test_delta_rays_between_cut_and_maximum_transfer() {
    let data = build_tables(&Parameters::default());
    let mut rng = StdRng::seed_from_u64(42);
    let dir = [0.6, 0.0, 0.8];
    let mut sampled = 0;
    for is_electron in [true, false] {
        for _ in 0..NUM_DRAWS {
            let (imc, ekin) = draw(&data, 1.0e-2, 1.0e5, &mut rng);
            let cut = data.mat_cut_data.get(imc).sec_el_prod_cut;
            let tmax = ionisation::max_energy_transfer(ekin, is_electron);
            let Some(out) = ionisation::sample(ekin, cut, &dir, is_electron, &mut rng) else {
                assert!(cut >= tmax);
                continue;
            };
            sampled += 1;
            assert!(out.delta_ekin >= cut * (1.0 - 1.0e-9) && out.delta_ekin <= tmax * (1.0 + 1.0e-9));
            assert_relative_eq!(out.delta_ekin + out.primary_ekin, ekin, max_relative = 1.0e-12);
            assert_relative_eq!(norm(&out.delta_dir), 1.0, epsilon = 1.0e-12);
            assert_relative_eq!(norm(&out.primary_dir), 1.0, epsilon = 1.0e-12);
        }
    }
    assert!(sampled > NUM_DRAWS);
}

#[test]
fn test_compton_photon_between_backscatter_and_incident_energy() {
    let mut rng = StdRng::seed_from_u64(42);
    let dir = [0.0, 1.0, 0.0];
    for _ in 0..NUM_DRAWS {
        let egamma = (1.0e-4f64.ln() + rng.flat() * (1.0e9f64).ln()).exp();
        let out = compton::sample(egamma, &dir, &mut rng);
        let e_min = egamma / (1.0 + 2.0 * egamma / ELECTRON_MASS_C2);
        if out.gamma_ekin > 0.0 {
            assert!(out.gamma_ekin >= e_min * (1.0 - 1.0e-9) && out.gamma_ekin <= egamma * (1.0 + 1.0e-12));
        }
        assert!(out.electron_ekin >= 0.0 && out.energy_deposit >= 0.0);
        assert_relative_eq!(
            out.gamma_ekin + out.electron_ekin + out.energy_deposit,
            egamma,
            max_relative = 1.0e-12
        );
        assert_relative_eq!(norm(&out.gamma_dir), 1.0, epsilon = 1.0e-12);
        assert_relative_eq!(norm(&out.electron_dir), 1.0, epsilon = 1.0e-12);
    }
}
