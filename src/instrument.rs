//! Instrument response: spectral convolution and resampling.
//!
//! An [`Instrument`] holds a normalized Gaussian convolution kernel built
//! from the instrument resolution and the output wavenumber grid the
//! measurement is reported on. Applying it smooths a monochromatic spectrum
//! to instrument resolution and interpolates it onto the output grid. The
//! apply path is generic over [`Scalar`] so derivatives propagate through
//! it unchanged.

use smallvec::SmallVec;

use crate::dual::Scalar;
use crate::error::{ModelError, Result};
use crate::lineshape::check_grid;

/// FWHM of a Gaussian in units of its standard deviation: 2·√(2 ln 2).
const FWHM_PER_SIGMA: f64 = 2.354_820_045_030_949;

/// Default kernel support in standard deviations on each side.
const DEFAULT_KERNEL_HALFWIDTH_SIGMAS: f64 = 5.0;

/// An instrument response operator: normalized kernel plus output grid.
#[derive(Debug, Clone)]
pub struct Instrument {
    /// Symmetric kernel, odd length, sums to 1.
    kernel: SmallVec<[f64; 64]>,
    /// Input grid spacing the kernel was built for, cm⁻¹.
    grid_spacing: f64,
    /// Output wavenumber grid in cm⁻¹, strictly increasing.
    output_grid: Vec<f64>,
}

impl Instrument {
    /// Build a Gaussian response with the default ±5σ kernel support.
    ///
    /// `fwhm` is the instrument resolution and `grid_spacing` the spacing of
    /// the (uniform) high-resolution grid the kernel will be applied on,
    /// both in cm⁻¹.
    pub fn gaussian(fwhm: f64, grid_spacing: f64, output_grid: Vec<f64>) -> Result<Self> {
        Self::gaussian_with_halfwidth(fwhm, grid_spacing, output_grid, DEFAULT_KERNEL_HALFWIDTH_SIGMAS)
    }

    /// Build a Gaussian response with kernel support ±`halfwidth_sigmas`·σ.
    ///
    /// The truncated kernel is re-normalized so its weights sum to exactly 1
    /// regardless of the truncation point.
    pub fn gaussian_with_halfwidth(
        fwhm: f64,
        grid_spacing: f64,
        output_grid: Vec<f64>,
        halfwidth_sigmas: f64,
    ) -> Result<Self> {
        if !(fwhm.is_finite() && fwhm > 0.) {
            return Err(ModelError::InvalidInput(format!(
                "instrument FWHM must be positive, got {fwhm}"
            )));
        }
        if !(grid_spacing.is_finite() && grid_spacing > 0.) {
            return Err(ModelError::InvalidInput(format!(
                "grid spacing must be positive, got {grid_spacing}"
            )));
        }
        if !(halfwidth_sigmas.is_finite() && halfwidth_sigmas > 0.) {
            return Err(ModelError::InvalidInput(format!(
                "kernel half width must be positive, got {halfwidth_sigmas} σ"
            )));
        }
        check_grid(&output_grid)?;

        let sigma_points = fwhm / grid_spacing / FWHM_PER_SIGMA;
        let half = (halfwidth_sigmas * sigma_points).ceil() as i64;

        let mut kernel: SmallVec<[f64; 64]> = (-half..=half)
            .map(|j| {
                let u = j as f64 / sigma_points;
                f64::exp(-0.5 * u * u)
            })
            .collect();
        let sum: f64 = kernel.iter().sum();
        for w in kernel.iter_mut() {
            *w /= sum;
        }

        Ok(Self {
            kernel,
            grid_spacing,
            output_grid,
        })
    }

    /// The normalized convolution kernel.
    pub fn kernel(&self) -> &[f64] {
        &self.kernel
    }

    /// The output wavenumber grid in cm⁻¹.
    pub fn output_grid(&self) -> &[f64] {
        &self.output_grid
    }

    /// Convolve `spectrum` (sampled on `input_grid`) with the kernel and
    /// resample onto the output grid.
    ///
    /// `input_grid` must be uniform with the spacing the kernel was built
    /// for. The convolution is same-length with zero padding beyond the
    /// edges, so convolved values within the kernel half-width of an edge
    /// are attenuated; the resampling (Catmull-Rom cubic) additionally
    /// needs one support point on each side. Output points whose cubic
    /// support touches the attenuated margin, i.e. outside
    /// `[input_grid[half+1], input_grid[n-2-half]]` for kernel half-width
    /// `half`, are rejected.
    pub fn apply<S: Scalar>(&self, input_grid: &[f64], spectrum: &[S]) -> Result<Vec<S>> {
        check_grid(input_grid)?;
        let n = input_grid.len();
        let half = self.kernel.len() / 2;
        if spectrum.len() != n {
            return Err(ModelError::InconsistentInputs(
                "spectrum length differs from its grid",
            ));
        }
        if n < 2 * half + 4 {
            return Err(ModelError::InconsistentInputs(
                "input grid shorter than the kernel support plus cubic stencil",
            ));
        }
        let h = (input_grid[n - 1] - input_grid[0]) / (n - 1) as f64;
        let uniform = input_grid
            .windows(2)
            .all(|w| ((w[1] - w[0]) - h).abs() <= 1e-6 * h);
        if !uniform || ((h - self.grid_spacing) / self.grid_spacing).abs() > 1e-6 {
            return Err(ModelError::InconsistentInputs(
                "input grid is not uniform with the kernel's spacing",
            ));
        }

        let convolved = self.convolve(spectrum);

        let min = input_grid[half + 1];
        let max = input_grid[n - 2 - half];
        self.output_grid
            .iter()
            .map(|&nu| {
                if nu < min || nu > max {
                    return Err(ModelError::OutOfDomain {
                        value: nu,
                        min,
                        max,
                    });
                }
                let j = (((nu - input_grid[0]) / h).floor() as usize).clamp(1, n - 3);
                let t = (nu - (input_grid[0] + h * j as f64)) / h;
                Ok(catmull_rom(
                    convolved[j - 1],
                    convolved[j],
                    convolved[j + 1],
                    convolved[j + 2],
                    t,
                ))
            })
            .collect()
    }

    /// Same-length convolution with zero padding beyond the edges.
    fn convolve<S: Scalar>(&self, spectrum: &[S]) -> Vec<S> {
        let half = self.kernel.len() / 2;
        let n = spectrum.len();
        (0..n)
            .map(|i| {
                let mut acc = S::constant(0.);
                for (j, &weight) in self.kernel.iter().enumerate() {
                    // index into the spectrum, offset so kernel center lands on i
                    let k = i as i64 + j as i64 - half as i64;
                    if (0..n as i64).contains(&k) {
                        acc = acc + spectrum[k as usize] * weight;
                    }
                }
                acc
            })
            .collect()
    }
}

/// Catmull-Rom cubic through four equally spaced points, evaluated at
/// fractional position `t` ∈ [0, 1] between `p1` and `p2`.
fn catmull_rom<S: Scalar>(p0: S, p1: S, p2: S, p3: S, t: f64) -> S {
    let a = p1 * 2.0;
    let b = p2 - p0;
    let c = p0 * 2.0 - p1 * 5.0 + p2 * 4.0 - p3;
    let d = p1 * 3.0 - p0 - p2 * 3.0 + p3;
    (a + (b + (c + d * t) * t) * t) * 0.5
}
