//! Tabulated solar reference spectrum.
//!
//! The solar transmission enters the forward model as a fixed multiplicative
//! reference. It arrives as a two-column (wavenumber, transmission) table
//! read upstream; here it is only validated and linearly interpolated onto
//! the model grid.

use crate::error::{ModelError, Result};
use ndarray::Array1;

/// A (wavenumber, transmission) lookup table.
#[derive(Debug, Clone)]
pub struct SolarSpectrum {
    wavenumbers: Vec<f64>,
    transmissions: Vec<f64>,
}

impl SolarSpectrum {
    /// Create a table from parallel columns.
    ///
    /// Wavenumbers must be strictly increasing and the columns equally long
    /// with at least two entries; transmissions must be finite and
    /// non-negative.
    pub fn new(wavenumbers: Vec<f64>, transmissions: Vec<f64>) -> Result<Self> {
        if wavenumbers.len() != transmissions.len() {
            return Err(ModelError::InconsistentInputs(
                "solar table columns differ in length",
            ));
        }
        if wavenumbers.len() < 2 {
            return Err(ModelError::InconsistentInputs(
                "solar table needs at least two entries",
            ));
        }
        if wavenumbers.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(ModelError::DataError(
                "solar table wavenumbers are not strictly increasing".into(),
            ));
        }
        if let Some(&t) = transmissions.iter().find(|t| !t.is_finite() || **t < 0.) {
            return Err(ModelError::DataError(format!(
                "solar transmission {t} is not a finite non-negative number"
            )));
        }
        Ok(Self {
            wavenumbers,
            transmissions,
        })
    }

    /// Tabulated wavenumber range in cm⁻¹.
    pub fn domain(&self) -> (f64, f64) {
        (
            self.wavenumbers[0],
            self.wavenumbers[self.wavenumbers.len() - 1],
        )
    }

    /// Linearly interpolate the table onto `grid`.
    ///
    /// Every grid point must lie inside the tabulated domain; extrapolation
    /// is refused.
    pub fn sample_onto(&self, grid: &[f64]) -> Result<Array1<f64>> {
        let (min, max) = self.domain();
        grid.iter()
            .map(|&nu| {
                if nu < min || nu > max {
                    return Err(ModelError::OutOfDomain {
                        value: nu,
                        min,
                        max,
                    });
                }
                let hi = self
                    .wavenumbers
                    .partition_point(|&w| w < nu)
                    .clamp(1, self.wavenumbers.len() - 1);
                let lo = hi - 1;
                let t = (nu - self.wavenumbers[lo])
                    / (self.wavenumbers[hi] - self.wavenumbers[lo]);
                Ok(self.transmissions[lo] * (1. - t) + self.transmissions[hi] * t)
            })
            .collect::<Result<Vec<_>>>()
            .map(Array1::from_vec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn linear_interpolation_between_nodes() {
        let solar =
            SolarSpectrum::new(vec![6195., 6200., 6205.], vec![1.0, 0.8, 0.9]).unwrap();
        let out = solar.sample_onto(&[6195., 6197.5, 6200., 6202.5, 6205.]).unwrap();
        let expected = [1.0, 0.9, 0.8, 0.85, 0.9];
        for (v, e) in out.iter().zip(expected) {
            assert_relative_eq!(*v, e, max_relative = 1e-12);
        }
    }

    #[test]
    fn extrapolation_is_refused() {
        let solar = SolarSpectrum::new(vec![6195., 6205.], vec![1.0, 0.9]).unwrap();
        assert!(solar.sample_onto(&[6194.]).is_err());
        assert!(solar.sample_onto(&[6206.]).is_err());
    }

    #[test]
    fn malformed_tables_are_rejected() {
        assert!(SolarSpectrum::new(vec![6195.], vec![1.0]).is_err());
        assert!(SolarSpectrum::new(vec![6200., 6195.], vec![1.0, 1.0]).is_err());
        assert!(SolarSpectrum::new(vec![6195., 6200.], vec![1.0]).is_err());
        assert!(SolarSpectrum::new(vec![6195., 6200.], vec![1.0, -0.1]).is_err());
    }
}
