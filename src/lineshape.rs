//! Absorption cross sections from spectroscopic line parameters.
//!
//! A [`LineShapeModel`] owns a windowed [`LineList`] and evaluates the
//! absorption cross section on an arbitrary wavenumber grid for a given
//! pressure and temperature. The three supported shapes are the Doppler
//! (Gaussian), Lorentz (Cauchy) and Voigt profiles; the Voigt profile goes
//! through the complex probability function in [`voigt`].

mod voigt;


use crate::error::{ModelError, Result};
use crate::spectroscopy::LineList;
use ndarray::Array1;

/// Second radiation constant hc/k_B in cm·K.
const C2: f64 = 1.438_776_877_503_933_7;
/// Speed of light in m/s.
const C_LIGHT: f64 = 2.997_924_58e8;
/// Ideal gas constant in J/mol/K.
const R_GAS: f64 = 8.314_462_618;
/// Reference temperature of the HITRAN line parameters in K.
const T_REF: f64 = 296.0;
/// Reference pressure (1 atm) in hPa.
const P_REF: f64 = 1013.25;
/// ln 2.
const LN_2: f64 = std::f64::consts::LN_2;

/// Width ratio below which the Voigt evaluation degenerates to the closed
/// Gaussian or Lorentzian form. Keeping the ratio above this floor also
/// keeps the complex probability function inside its accurate domain.
const DEGENERATE_RATIO: f64 = 1e-8;

/// The supported line-shape functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineShapeKind {
    /// Pure thermal (Gaussian) broadening.
    Doppler,
    /// Pure collisional (Cauchy) broadening.
    Lorentz,
    /// Convolution of the two, the general case.
    Voigt,
}

/// A line-shape model for one gas: a windowed line list, a shape kind and a
/// wing cutoff.
///
/// Built once and reused across many (pressure, temperature, grid)
/// evaluations; it holds no per-evaluation state.
#[derive(Debug, Clone)]
pub struct LineShapeModel {
    kind: LineShapeKind,
    lines: LineList,
    wing_cutoff_cm: f64,
}

/// Per-line widths and temperature-corrected intensity for one (p, T).
#[derive(Debug, Clone, Copy)]
struct BroadenedLine {
    center: f64,
    /// Intensity scaled from 296 K to the requested temperature.
    intensity: f64,
    /// Doppler HWHM in cm⁻¹.
    doppler_hwhm: f64,
    /// Lorentz HWHM in cm⁻¹.
    lorentz_hwhm: f64,
}

impl LineShapeModel {
    /// Create a model from a line list.
    ///
    /// `wing_cutoff_cm` is the distance from a line center, in cm⁻¹, beyond
    /// which that line's contribution is truncated to zero. The truncation is
    /// a hard cutoff: it bounds cost at the price of discarding the (small)
    /// far-wing tail, so integrated intensities are reproduced only to the
    /// level of the neglected wings. The cutoff tests grid distance from the
    /// fixed line centers, never any retrieved quantity.
    pub fn new(kind: LineShapeKind, lines: LineList, wing_cutoff_cm: f64) -> Result<Self> {
        if !wing_cutoff_cm.is_finite() || wing_cutoff_cm <= 0. {
            return Err(ModelError::InvalidInput(format!(
                "wing cutoff must be positive, got {wing_cutoff_cm}"
            )));
        }
        Ok(Self {
            kind,
            lines,
            wing_cutoff_cm,
        })
    }

    /// The shape variant.
    pub fn kind(&self) -> LineShapeKind {
        self.kind
    }

    /// The underlying line list.
    pub fn lines(&self) -> &LineList {
        &self.lines
    }

    /// Evaluate the absorption cross section in cm²/molecule on `grid`.
    ///
    /// `grid` must be strictly increasing (checked). `pressure_hpa` and
    /// `temperature_k` must be positive; anything else is rejected. A line
    /// list that is empty for the window yields an all-zero result.
    pub fn cross_section(
        &self,
        grid: &[f64],
        pressure_hpa: f64,
        temperature_k: f64,
    ) -> Result<Array1<f64>> {
        if !(pressure_hpa.is_finite() && pressure_hpa > 0.) {
            return Err(ModelError::InvalidInput(format!(
                "pressure must be positive, got {pressure_hpa} hPa"
            )));
        }
        if !(temperature_k.is_finite() && temperature_k > 0.) {
            return Err(ModelError::InvalidInput(format!(
                "temperature must be positive, got {temperature_k} K"
            )));
        }
        check_grid(grid)?;

        let molar_mass_g = self.lines.molecule().molar_mass_g();
        let mut out = Array1::zeros(grid.len());
        let values = out
            .as_slice_mut()
            .ok_or(ModelError::InconsistentInputs("output not contiguous"))?;

        for line in self.lines.lines() {
            let broadened = broaden(line, molar_mass_g, pressure_hpa, temperature_k);

            // Only grid points within the wing cutoff of this line see it.
            let lo = grid.partition_point(|&nu| nu < broadened.center - self.wing_cutoff_cm);
            let hi = grid.partition_point(|&nu| nu <= broadened.center + self.wing_cutoff_cm);

            match self.kind {
                LineShapeKind::Doppler => accumulate_doppler(
                    &broadened,
                    &grid[lo..hi],
                    &mut values[lo..hi],
                ),
                LineShapeKind::Lorentz => accumulate_lorentz(
                    &broadened,
                    &grid[lo..hi],
                    &mut values[lo..hi],
                ),
                LineShapeKind::Voigt => accumulate_voigt(
                    &broadened,
                    &grid[lo..hi],
                    &mut values[lo..hi],
                ),
            }
        }

        Ok(out)
    }
}

/// Validate that a wavenumber grid is non-empty and strictly increasing.
pub(crate) fn check_grid(grid: &[f64]) -> Result<()> {
    if grid.is_empty() || grid.windows(2).any(|w| !(w[1] > w[0])) {
        return Err(ModelError::BadGrid);
    }
    Ok(())
}

/// Scale the line parameters from the 296 K reference to (p, T).
fn broaden(
    line: &crate::spectroscopy::LineTransition,
    molar_mass_g: f64,
    pressure_hpa: f64,
    temperature_k: f64,
) -> BroadenedLine {
    let nu0 = line.center_wavenumber;

    // Standard HITRAN intensity scaling: rotational partition-function ratio
    // approximated by (T_ref/T)^1.5, Boltzmann factor of the lower-state
    // energy, and the stimulated-emission correction.
    let q_ratio = (T_REF / temperature_k).powf(1.5);
    let boltzmann =
        f64::exp(-C2 * line.lower_state_energy / temperature_k)
            / f64::exp(-C2 * line.lower_state_energy / T_REF);
    let stimulated = (1. - f64::exp(-C2 * nu0 / temperature_k))
        / (1. - f64::exp(-C2 * nu0 / T_REF));
    let intensity = line.intensity * q_ratio * boltzmann * stimulated;

    // Doppler HWHM: (ν₀/c)·sqrt(2 ln2 R T / M), with M in kg/mol.
    let molar_mass_kg = molar_mass_g * 1e-3;
    let doppler_hwhm =
        nu0 / C_LIGHT * f64::sqrt(2. * LN_2 * R_GAS * temperature_k / molar_mass_kg);

    // Lorentz HWHM: pressure scaling and the (T_ref/T)^n power law.
    let lorentz_hwhm = line.air_hwhm
        * (pressure_hpa / P_REF)
        * (T_REF / temperature_k).powf(line.temperature_exponent);

    BroadenedLine {
        center: nu0,
        intensity,
        doppler_hwhm,
        lorentz_hwhm,
    }
}

/// Add the Gaussian profile of one line onto `out`.
fn accumulate_doppler(line: &BroadenedLine, grid: &[f64], out: &mut [f64]) {
    let alpha = line.doppler_hwhm;
    let peak = line.intensity * f64::sqrt(LN_2 / std::f64::consts::PI) / alpha;
    for (value, &nu) in out.iter_mut().zip(grid) {
        let x = (nu - line.center) / alpha;
        *value += peak * f64::exp(-LN_2 * x * x);
    }
}

/// Add the Lorentzian profile of one line onto `out`.
fn accumulate_lorentz(line: &BroadenedLine, grid: &[f64], out: &mut [f64]) {
    let gamma = line.lorentz_hwhm;
    let scale = line.intensity * gamma / std::f64::consts::PI;
    for (value, &nu) in out.iter_mut().zip(grid) {
        let delta = nu - line.center;
        *value += scale / (gamma * gamma + delta * delta);
    }
}

/// Add the Voigt profile of one line onto `out`.
///
/// The extreme width ratios fall back to the closed Gaussian/Lorentzian
/// forms, which are exact there; the general evaluation takes over for
/// every ratio above [`DEGENERATE_RATIO`].
fn accumulate_voigt(line: &BroadenedLine, grid: &[f64], out: &mut [f64]) {
    let alpha = line.doppler_hwhm;
    let gamma = line.lorentz_hwhm;

    if gamma <= DEGENERATE_RATIO * alpha {
        return accumulate_doppler(line, grid, out);
    }
    if alpha <= DEGENERATE_RATIO * gamma {
        return accumulate_lorentz(line, grid, out);
    }

    let sqrt_ln2 = f64::sqrt(LN_2);
    let peak = line.intensity * f64::sqrt(LN_2 / std::f64::consts::PI) / alpha;
    let y = sqrt_ln2 * gamma / alpha;
    for (value, &nu) in out.iter_mut().zip(grid) {
        let x = sqrt_ln2 * (nu - line.center) / alpha;
        *value += peak * voigt::complex_probability(x, y).re;
    }
}
