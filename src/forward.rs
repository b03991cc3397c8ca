//! The radiative-transfer forward model.
//!
//! [`ForwardModel`] maps a [`StateVector`] (per-gas VMR profiles plus a
//! low-order polynomial) to a simulated measurement on the instrument's
//! output grid: Beer-Lambert transmission through the layered atmosphere,
//! an optional solar reference, instrument convolution/resampling, and a
//! polynomial continuum correction. The whole evaluation is generic over
//! [`Scalar`] so the Jacobian engine can push dual numbers through it
//! unmodified.

use ndarray::{Array1, Array2};

use crate::dual::Scalar;
use crate::error::{ModelError, Result};
use crate::instrument::Instrument;
use crate::profile::AtmosphericProfile;
use crate::solar::SolarSpectrum;
use crate::tensor::CrossSectionTensor;

/// How one gas's optical depth scales with the atmospheric columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasColumn {
    /// Scale against the per-layer water column instead of the dry-air
    /// column. Used for water vapor itself, whose state entry then acts as
    /// a dimensionless scaling of the profile's native humidity.
    pub uses_wet_column: bool,
}

impl GasColumn {
    /// A gas retrieved as a VMR relative to dry air.
    pub fn dry() -> Self {
        Self {
            uses_wet_column: false,
        }
    }

    /// A gas driven by the profile's native water column.
    pub fn wet() -> Self {
        Self {
            uses_wet_column: true,
        }
    }
}

/// The retrieval state: per-gas VMR profiles and polynomial coefficients.
///
/// The typed layout makes the flattening contract structural: gas-major VMR
/// entries (all layers of gas 0, then gas 1, …) followed by the polynomial
/// coefficients from degree 0 upward. [`StateVector::flatten`] and
/// [`StateVector::from_flat`] are the only places that define this order.
#[derive(Debug, Clone)]
pub struct StateVector {
    /// VMR per (layer, gas).
    vmr: Array2<f64>,
    /// Polynomial coefficients, constant term first.
    poly: Vec<f64>,
}

impl StateVector {
    /// Create a state from a (layer, gas) VMR array and polynomial
    /// coefficients.
    ///
    /// Negative or non-finite VMR values and empty or non-finite polynomial
    /// coefficient sets are rejected up front, never clamped.
    pub fn new(vmr: Array2<f64>, poly: Vec<f64>) -> Result<Self> {
        if vmr.is_empty() {
            return Err(ModelError::InconsistentInputs(
                "state vector has no VMR entries",
            ));
        }
        if let Some(&bad) = vmr.iter().find(|v| !v.is_finite() || **v < 0.) {
            return Err(ModelError::InvalidInput(format!(
                "volume mixing ratios must be finite and non-negative, got {bad}"
            )));
        }
        if poly.is_empty() || poly.iter().any(|c| !c.is_finite()) {
            return Err(ModelError::InvalidInput(
                "polynomial coefficients must be a non-empty finite set".into(),
            ));
        }
        Ok(Self { vmr, poly })
    }

    /// Number of atmospheric layers.
    pub fn num_layers(&self) -> usize {
        self.vmr.nrows()
    }

    /// Number of gases.
    pub fn num_gases(&self) -> usize {
        self.vmr.ncols()
    }

    /// Degree of the continuum polynomial.
    pub fn polynomial_degree(&self) -> usize {
        self.poly.len() - 1
    }

    /// The VMR block, (layer, gas).
    pub fn vmr(&self) -> &Array2<f64> {
        &self.vmr
    }

    /// The polynomial coefficients, constant term first.
    pub fn poly(&self) -> &[f64] {
        &self.poly
    }

    /// Total flat length.
    pub fn len(&self) -> usize {
        self.vmr.len() + self.poly.len()
    }

    /// Always false; a state has at least one VMR and one coefficient.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Flatten to the contract order: gas-major VMRs, then coefficients.
    pub fn flatten(&self) -> Array1<f64> {
        let mut flat = Vec::with_capacity(self.len());
        for g in 0..self.num_gases() {
            for l in 0..self.num_layers() {
                flat.push(self.vmr[[l, g]]);
            }
        }
        flat.extend_from_slice(&self.poly);
        Array1::from_vec(flat)
    }

    /// Rebuild a state from a flat vector laid out as [`Self::flatten`]
    /// produces.
    pub fn from_flat(
        flat: &[f64],
        layers: usize,
        gases: usize,
        polynomial_degree: usize,
    ) -> Result<Self> {
        let expected = layers * gases + polynomial_degree + 1;
        if flat.len() != expected {
            return Err(ModelError::StateLength {
                expected,
                actual: flat.len(),
            });
        }
        let vmr = Array2::from_shape_fn((layers, gases), |(l, g)| flat[g * layers + l]);
        let poly = flat[layers * gases..].to_vec();
        Self::new(vmr, poly)
    }
}

/// The forward model, bound to one immutable scene setup.
///
/// Everything that doesn't change between retrieval iterations lives here
/// by reference: the cross-section tensor, the profile, the per-gas column
/// scaling, the (pre-sampled) solar spectrum, the instrument, and the air
/// mass factor.
#[derive(Debug)]
pub struct ForwardModel<'a> {
    tensor: &'a CrossSectionTensor,
    profile: &'a AtmosphericProfile,
    gases: Vec<GasColumn>,
    solar_on_grid: Option<Array1<f64>>,
    instrument: &'a Instrument,
    air_mass_factor: f64,
}

impl<'a> ForwardModel<'a> {
    /// Bind a forward model to a scene.
    ///
    /// The solar spectrum, when given, is interpolated onto the tensor grid
    /// once here; it must cover the grid. The tensor's layer count must
    /// match the profile and `gases` must describe every tensor gas.
    pub fn new(
        tensor: &'a CrossSectionTensor,
        profile: &'a AtmosphericProfile,
        gases: &[GasColumn],
        solar: Option<&SolarSpectrum>,
        air_mass_factor: f64,
        instrument: &'a Instrument,
    ) -> Result<Self> {
        if tensor.num_layers() != profile.num_layers() {
            return Err(ModelError::InconsistentInputs(
                "tensor layer count differs from the profile",
            ));
        }
        if gases.len() != tensor.num_gases() {
            return Err(ModelError::InconsistentInputs(
                "one GasColumn per tensor gas is required",
            ));
        }
        if !(air_mass_factor.is_finite() && air_mass_factor > 0.) {
            return Err(ModelError::InvalidInput(format!(
                "air mass factor must be positive, got {air_mass_factor}"
            )));
        }
        let solar_on_grid = solar
            .map(|s| {
                s.sample_onto(
                    tensor
                        .grid()
                        .as_slice()
                        .ok_or(ModelError::InconsistentInputs("grid not contiguous"))?,
                )
            })
            .transpose()?;

        Ok(Self {
            tensor,
            profile,
            gases: gases.to_vec(),
            solar_on_grid,
            instrument,
            air_mass_factor,
        })
    }

    /// The instrument the simulated measurement is reported on.
    pub fn instrument(&self) -> &Instrument {
        self.instrument
    }

    /// Simulate the measurement for `state`.
    ///
    /// The output has the length and order of the instrument output grid.
    pub fn simulate(&self, state: &StateVector) -> Result<Array1<f64>> {
        self.check_state(state)?;
        let out = self.evaluate(state.vmr(), state.poly())?;
        Ok(Array1::from_vec(out))
    }

    /// Check a state against the tensor dimensions.
    pub(crate) fn check_state(&self, state: &StateVector) -> Result<()> {
        let expected =
            self.tensor.num_layers() * self.tensor.num_gases() + state.poly().len();
        if state.len() != expected
            || state.num_layers() != self.tensor.num_layers()
            || state.num_gases() != self.tensor.num_gases()
        {
            return Err(ModelError::StateLength {
                expected,
                actual: state.len(),
            });
        }
        Ok(())
    }

    /// The generic evaluation path shared by simulation and Jacobian runs.
    ///
    /// `vmr` is (layer, gas); `poly` is constant term first. Constants
    /// (cross sections, column densities, solar, kernel weights) stay `f64`
    /// so dual arithmetic only pays for state-dependent terms.
    pub(crate) fn evaluate<S: Scalar>(&self, vmr: &Array2<S>, poly: &[S]) -> Result<Vec<S>> {
        let grid = self.tensor.grid();
        let values = self.tensor.values();
        let num_layers = self.tensor.num_layers();

        // Per-wavenumber total optical depth, then transmission.
        let mut transmission = Vec::with_capacity(grid.len());
        for w in 0..grid.len() {
            let mut tau = S::constant(0.);
            for (g, gas) in self.gases.iter().enumerate() {
                let vcd = if gas.uses_wet_column {
                    self.profile.vcd_h2o()
                } else {
                    self.profile.vcd_dry()
                };
                for l in 0..num_layers {
                    tau = tau + vmr[[l, g]] * (values[[w, l, g]] * vcd[l]);
                }
            }

            let mut t = (-(tau * self.air_mass_factor)).exp();
            if let Some(solar) = &self.solar_on_grid {
                t = t * solar[w];
            }
            transmission.push(t);
        }

        let grid_slice = grid
            .as_slice()
            .ok_or(ModelError::InconsistentInputs("grid not contiguous"))?;
        let convolved = self.instrument.apply(grid_slice, &transmission)?;

        // Continuum polynomial on the output abscissa rescaled to [-1, 1]
        // by grid mean and half-range, so swapping in an orthogonal basis
        // later is a local change.
        let out_grid = self.instrument.output_grid();
        let mean = out_grid.iter().sum::<f64>() / out_grid.len() as f64;
        let half_range = 0.5 * (out_grid[out_grid.len() - 1] - out_grid[0]);
        let scale = if half_range > 0. { half_range } else { 1. };

        Ok(convolved
            .into_iter()
            .zip(out_grid)
            .map(|(value, &nu)| {
                let x = (nu - mean) / scale;
                let mut continuum = poly[poly.len() - 1];
                for &c in poly[..poly.len() - 1].iter().rev() {
                    continuum = continuum * x + c;
                }
                value * continuum
            })
            .collect())
    }
}
