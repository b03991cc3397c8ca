//! End-to-end tests of the forward model and Jacobian chain.

use approx::{assert_abs_diff_eq, assert_relative_eq};
use ndarray::Array2;
use tracegas_rtm::{
    build_cross_sections, AtmosphericProfile, ForwardModel, GasColumn, Instrument,
    JacobianEngine, LineList, LineShapeKind, LineShapeModel, LineTransition, ModelError,
    Molecule, SolarSpectrum, StateVector,
};

fn uniform_grid(start: f64, step: f64, n: usize) -> Vec<f64> {
    (0..n).map(|i| start + step * i as f64).collect()
}

fn line(center: f64, intensity: f64) -> LineTransition {
    LineTransition {
        center_wavenumber: center,
        intensity,
        air_hwhm: 0.05,
        lower_state_energy: 0.,
        temperature_exponent: 0.7,
    }
}

fn model_for(kind: LineShapeKind, centers: &[f64]) -> LineShapeModel {
    let list = LineList::new(
        Molecule::new(2, 1, 44.),
        centers.iter().map(|&c| line(c, 1e-23)).collect::<Vec<_>>(),
        (6150., 6250.),
    )
    .unwrap();
    LineShapeModel::new(kind, list, 25.).unwrap()
}

/// Ten identical 1000 Pa layers at 250 K, zero humidity.
fn flat_profile() -> AtmosphericProfile {
    let p_half: Vec<f64> = (0..=10).map(|k| 1000. * k as f64).collect();
    AtmosphericProfile::from_state(0., 0., 10_000., p_half, vec![250.; 10], vec![0.; 10])
        .unwrap()
}

/// A small but humid 3-layer profile for the Jacobian tests.
fn humid_profile() -> AtmosphericProfile {
    AtmosphericProfile::from_state(
        45.,
        10.,
        90_000.,
        vec![0., 30_000., 60_000., 90_000.],
        vec![220., 250., 280.],
        vec![0.0005, 0.002, 0.008],
    )
    .unwrap()
}

/// Equal layers must see equal per-layer optical depth: pointwise for the
/// pressure-independent Doppler shape, spectrally integrated for Voigt.
#[test]
fn flat_profile_gives_equal_layer_optical_depth() {
    let profile = flat_profile();
    let grid = uniform_grid(6198., 0.002, 2001);

    // All layers carry the same dry column.
    for &vcd in profile.vcd_dry() {
        assert_relative_eq!(vcd, profile.vcd_dry()[0], max_relative = 1e-12);
    }

    let doppler = build_cross_sections(&profile, &[model_for(LineShapeKind::Doppler, &[6200.])], &grid)
        .unwrap();
    for layer in 0..10 {
        for w in 0..grid.len() {
            let tau = doppler.values()[[w, layer, 0]] * profile.vcd_dry()[layer];
            let tau0 = doppler.values()[[w, 0, 0]] * profile.vcd_dry()[0];
            assert_relative_eq!(tau, tau0, max_relative = 1e-12);
        }
    }

    let voigt = build_cross_sections(&profile, &[model_for(LineShapeKind::Voigt, &[6200.])], &grid)
        .unwrap();
    let integrated: Vec<f64> = (0..10)
        .map(|layer| {
            let mut sum = 0.;
            for w in 0..grid.len() - 1 {
                sum += 0.5
                    * (voigt.values()[[w, layer, 0]] + voigt.values()[[w + 1, layer, 0]])
                    * (grid[w + 1] - grid[w]);
            }
            sum * profile.vcd_dry()[layer]
        })
        .collect();
    for tau in &integrated {
        assert_relative_eq!(*tau, integrated[0], max_relative = 5e-3);
    }
}

#[test]
fn zero_absorber_reproduces_the_continuum_polynomial() {
    let profile = flat_profile();
    let grid = uniform_grid(6199., 0.002, 1001);
    let tensor =
        build_cross_sections(&profile, &[model_for(LineShapeKind::Voigt, &[6200.])], &grid)
            .unwrap();
    let output_grid = uniform_grid(6199.5, 0.05, 21);
    let instrument = Instrument::gaussian(0.05, 0.002, output_grid.clone()).unwrap();
    let model = ForwardModel::new(&tensor, &profile, &[GasColumn::dry()], None, 2.0, &instrument)
        .unwrap();

    let state = StateVector::new(
        Array2::zeros((10, 1)),
        vec![0.75, 0.1],
    )
    .unwrap();
    let out = model.simulate(&state).unwrap();

    // Transmission is exactly 1, so the output is the polynomial on the
    // rescaled abscissa.
    let mean: f64 = output_grid.iter().sum::<f64>() / output_grid.len() as f64;
    let half_range = 0.5 * (output_grid[output_grid.len() - 1] - output_grid[0]);
    for (v, &nu) in out.iter().zip(&output_grid) {
        let x = (nu - mean) / half_range;
        assert_relative_eq!(*v, 0.75 + 0.1 * x, max_relative = 1e-9);
    }
}

#[test]
fn solar_spectrum_multiplies_into_the_simulation() {
    let profile = flat_profile();
    let grid = uniform_grid(6199., 0.002, 1001);
    let tensor =
        build_cross_sections(&profile, &[model_for(LineShapeKind::Voigt, &[6200.])], &grid)
            .unwrap();
    let output_grid = uniform_grid(6199.5, 0.05, 21);
    let instrument = Instrument::gaussian(0.05, 0.002, output_grid.clone()).unwrap();

    // A linear solar ramp passes through the symmetric kernel unchanged in
    // the grid interior.
    let solar = SolarSpectrum::new(vec![6190., 6210.], vec![0.9, 1.1]).unwrap();
    let model = ForwardModel::new(
        &tensor,
        &profile,
        &[GasColumn::dry()],
        Some(&solar),
        1.0,
        &instrument,
    )
    .unwrap();

    let state = StateVector::new(Array2::zeros((10, 1)), vec![1.0]).unwrap();
    let out = model.simulate(&state).unwrap();
    for (v, &nu) in out.iter().zip(&output_grid) {
        let expected = 0.9 + (1.1 - 0.9) * (nu - 6190.) / 20.;
        assert_relative_eq!(*v, expected, max_relative = 1e-6);
    }
}

#[test]
fn wet_gas_with_dry_atmosphere_absorbs_nothing() {
    let profile = flat_profile(); // zero humidity
    let grid = uniform_grid(6199., 0.002, 1001);
    let tensor =
        build_cross_sections(&profile, &[model_for(LineShapeKind::Voigt, &[6200.])], &grid)
            .unwrap();
    let instrument =
        Instrument::gaussian(0.05, 0.002, uniform_grid(6199.5, 0.05, 21)).unwrap();
    let model = ForwardModel::new(&tensor, &profile, &[GasColumn::wet()], None, 1.0, &instrument)
        .unwrap();

    let state = StateVector::new(Array2::from_elem((10, 1), 1.0), vec![1.0]).unwrap();
    let out = model.simulate(&state).unwrap();
    for v in out.iter() {
        assert_relative_eq!(*v, 1.0, max_relative = 1e-10);
    }
}

#[test]
fn mismatched_state_is_rejected() {
    let profile = flat_profile();
    let grid = uniform_grid(6199., 0.002, 501);
    let tensor =
        build_cross_sections(&profile, &[model_for(LineShapeKind::Voigt, &[6200.])], &grid)
            .unwrap();
    let instrument =
        Instrument::gaussian(0.05, 0.002, uniform_grid(6199.3, 0.05, 9)).unwrap();
    let model = ForwardModel::new(&tensor, &profile, &[GasColumn::dry()], None, 1.0, &instrument)
        .unwrap();

    // 7 layers instead of the tensor's 10.
    let state = StateVector::new(Array2::zeros((7, 1)), vec![1.0]).unwrap();
    match model.simulate(&state) {
        Err(ModelError::StateLength { .. }) => {}
        other => panic!("expected StateLength, got {other:?}"),
    }
}

/// Jacobian setup shared by the gradient-check tests: two gases (one tied
/// to the water column), a strong absorber, and a quadratic continuum.
fn jacobian_scene() -> (AtmosphericProfile, Vec<LineShapeModel>, Vec<f64>) {
    let profile = humid_profile();
    let models = vec![
        model_for(LineShapeKind::Voigt, &[6199.8, 6200.3]),
        model_for(LineShapeKind::Voigt, &[6200.05]),
    ];
    let grid = uniform_grid(6199.4, 0.002, 601);
    (profile, models, grid)
}

#[test]
fn dual_jacobian_matches_finite_differences() {
    let (profile, models, grid) = jacobian_scene();
    let tensor = build_cross_sections(&profile, &models, &grid).unwrap();
    let instrument =
        Instrument::gaussian(0.05, 0.002, uniform_grid(6199.7, 0.05, 13)).unwrap();
    let model = ForwardModel::new(
        &tensor,
        &profile,
        &[GasColumn::dry(), GasColumn::wet()],
        None,
        2.5,
        &instrument,
    )
    .unwrap();

    // Mixing ratios sized to give order-unity optical depth so the
    // exponential nonlinearity is actually exercised.
    let vmr = Array2::from_shape_fn((3, 2), |(l, g)| 1e-4 + 5e-5 * (l + 2 * g) as f64);
    let state = StateVector::new(vmr, vec![1.0, 0.08, -0.03]).unwrap();

    let engine = JacobianEngine::new(&model);
    let dual = engine.jacobian(&state).unwrap();
    assert_eq!(dual.dim(), (13, 9));

    let fd = engine.jacobian_fd(&state, 1e-4).unwrap();
    let scale = dual.iter().fold(0.0f64, |m, v| m.max(v.abs()));
    assert!(scale > 0.);
    for (d, f) in dual.iter().zip(fd.iter()) {
        assert_abs_diff_eq!(*d, *f, epsilon = 1e-5 * scale);
    }
}

#[test]
fn finite_difference_error_tightens_with_step() {
    let (profile, models, grid) = jacobian_scene();
    let tensor = build_cross_sections(&profile, &models, &grid).unwrap();
    let instrument =
        Instrument::gaussian(0.05, 0.002, uniform_grid(6199.7, 0.05, 13)).unwrap();
    let model = ForwardModel::new(
        &tensor,
        &profile,
        &[GasColumn::dry(), GasColumn::wet()],
        None,
        2.5,
        &instrument,
    )
    .unwrap();

    let vmr = Array2::from_elem((3, 2), 2e-4);
    let state = StateVector::new(vmr, vec![1.0, 0.05, 0.02]).unwrap();

    let engine = JacobianEngine::new(&model);
    let dual = engine.jacobian(&state).unwrap();

    // Only the VMR columns are nonlinear; the polynomial columns are exact
    // under finite differences at any step.
    let error_at = |rel_step: f64| -> f64 {
        let fd = engine.jacobian_fd(&state, rel_step).unwrap();
        let mut max_err = 0.0f64;
        for j in 0..6 {
            for i in 0..13 {
                max_err = max_err.max((dual[[i, j]] - fd[[i, j]]).abs());
            }
        }
        max_err
    };

    let coarse = error_at(1e-2);
    let fine = error_at(1e-4);
    assert!(fine <= coarse);

    let scale = dual.iter().fold(0.0f64, |m, v| m.max(v.abs()));
    assert!(fine <= 1e-6 * scale);
}

#[test]
fn polynomial_jacobian_columns_are_exact() {
    let (profile, models, grid) = jacobian_scene();
    let tensor = build_cross_sections(&profile, &models, &grid).unwrap();
    let output_grid = uniform_grid(6199.7, 0.05, 13);
    let instrument = Instrument::gaussian(0.05, 0.002, output_grid.clone()).unwrap();
    let model = ForwardModel::new(
        &tensor,
        &profile,
        &[GasColumn::dry(), GasColumn::wet()],
        None,
        1.0,
        &instrument,
    )
    .unwrap();

    let vmr = Array2::from_elem((3, 2), 1e-4);
    let state = StateVector::new(vmr.clone(), vec![1.0, 0.05, 0.02]).unwrap();
    let engine = JacobianEngine::new(&model);
    let jacobian = engine.jacobian(&state).unwrap();

    // ∂output/∂c_k = convolved_transmission · x̃^k; with the polynomial set
    // to exactly 1 the simulation itself is that convolved transmission.
    let base = model
        .simulate(&StateVector::new(vmr, vec![1.0]).unwrap())
        .unwrap();
    let mean: f64 = output_grid.iter().sum::<f64>() / output_grid.len() as f64;
    let half_range = 0.5 * (output_grid[output_grid.len() - 1] - output_grid[0]);
    for (k, j) in (6..9).enumerate() {
        for i in 0..13 {
            let x = (output_grid[i] - mean) / half_range;
            assert_relative_eq!(
                jacobian[[i, j]],
                base[i] * x.powi(k as i32),
                max_relative = 1e-9,
                epsilon = 1e-12
            );
        }
    }
}
