//! Spectroscopic line lists.
//!
//! A [`LineList`] is the immutable collection of transitions for one
//! (molecule, isotope) pair, restricted at construction to the wavenumber
//! window of interest. Reading and parsing HITRAN-format files happens
//! upstream; this module only deals with already-typed records.

use crate::error::{ModelError, Result};

/// A single spectroscopic transition.
///
/// Units follow the HITRAN conventions: wavenumbers in cm⁻¹, line intensity
/// in cm⁻¹·cm²/molecule at the 296 K reference temperature, air-broadened
/// half width at half maximum in cm⁻¹/atm at 296 K and 1 atm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineTransition {
    /// Line center ν₀ in cm⁻¹.
    pub center_wavenumber: f64,
    /// Line intensity S at the 296 K reference, cm⁻¹·cm²/molecule.
    pub intensity: f64,
    /// Air-broadened Lorentz HWHM γ_air in cm⁻¹/atm at 296 K, 1 atm.
    pub air_hwhm: f64,
    /// Lower-state energy E″ in cm⁻¹.
    pub lower_state_energy: f64,
    /// Exponent n of the (296/T)ⁿ temperature dependence of γ_air.
    pub temperature_exponent: f64,
}

/// Identity and bulk properties of the absorbing species.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Molecule {
    /// HITRAN molecule number.
    pub id: u8,
    /// HITRAN isotopologue number within the molecule.
    pub isotope: u8,
    /// Molar mass in g/mol, used for the Doppler width.
    pub molar_mass_g: f64,
}

impl Molecule {
    /// Create a molecule descriptor from a molar mass in g/mol.
    pub fn new(id: u8, isotope: u8, molar_mass_g: f64) -> Self {
        Self {
            id,
            isotope,
            molar_mass_g,
        }
    }

    /// Molar mass in g/mol.
    pub fn molar_mass_g(&self) -> f64 {
        self.molar_mass_g
    }
}

/// Ordered, windowed collection of transitions for one molecule/isotope.
///
/// The stored order is the input order of the records that survive the
/// window filter. Summation over lines always follows this order so results
/// are bit-reproducible between runs.
#[derive(Debug, Clone)]
pub struct LineList {
    molecule: Molecule,
    window: (f64, f64),
    lines: Vec<LineTransition>,
}

impl LineList {
    /// Build a line list from typed records, keeping only transitions whose
    /// center falls inside `[window.0, window.1]`.
    ///
    /// Records with a non-finite or non-positive center, or a non-finite or
    /// negative intensity, are rejected as a data error. An empty result is
    /// valid: it simply yields zero absorption everywhere.
    pub fn new<I>(molecule: Molecule, records: I, window: (f64, f64)) -> Result<Self>
    where
        I: IntoIterator<Item = LineTransition>,
    {
        if !(window.0.is_finite() && window.1.is_finite()) || window.0 > window.1 {
            return Err(ModelError::DataError(format!(
                "bad wavenumber window [{}, {}]",
                window.0, window.1
            )));
        }

        let mut lines = Vec::new();
        for record in records {
            if !record.center_wavenumber.is_finite() || record.center_wavenumber <= 0. {
                return Err(ModelError::DataError(format!(
                    "line center {} is not a positive wavenumber",
                    record.center_wavenumber
                )));
            }
            if !record.intensity.is_finite() || record.intensity < 0. {
                return Err(ModelError::DataError(format!(
                    "line intensity {} at ν₀={} is not a non-negative number",
                    record.intensity, record.center_wavenumber
                )));
            }
            if record.air_hwhm < 0. {
                return Err(ModelError::DataError(format!(
                    "air-broadened half width {} at ν₀={} is negative",
                    record.air_hwhm, record.center_wavenumber
                )));
            }
            if (window.0..=window.1).contains(&record.center_wavenumber) {
                lines.push(record);
            }
        }

        Ok(Self {
            molecule,
            window,
            lines,
        })
    }

    /// Map the five per-line HITRAN fields onto [`LineTransition`] records.
    ///
    /// This is the shape of one record of a columnar `.par` file after the
    /// upstream reader has split and parsed it.
    pub fn from_hitran_fields<I>(
        molecule: Molecule,
        fields: I,
        window: (f64, f64),
    ) -> Result<Self>
    where
        I: IntoIterator<Item = (f64, f64, f64, f64, f64)>,
    {
        let records = fields.into_iter().map(
            |(center, intensity, air_hwhm, lower_energy, exponent)| LineTransition {
                center_wavenumber: center,
                intensity,
                air_hwhm,
                lower_state_energy: lower_energy,
                temperature_exponent: exponent,
            },
        );
        Self::new(molecule, records, window)
    }

    /// The absorbing species.
    pub fn molecule(&self) -> Molecule {
        self.molecule
    }

    /// The wavenumber window the list was restricted to, in cm⁻¹.
    pub fn window(&self) -> (f64, f64) {
        self.window
    }

    /// Transitions inside the window, in stable input order.
    pub fn lines(&self) -> &[LineTransition] {
        &self.lines
    }

    /// Number of transitions inside the window.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the window contains no transitions.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
