//! Vertical atmospheric profiles and per-layer column densities.
//!
//! [`AtmosphericProfile`] turns a gridded meteorological state (temperature,
//! specific humidity, surface pressure on hybrid model levels) into the
//! per-layer quantities the forward model consumes: mid-layer pressure and
//! temperature, water-vapor mixing ratio, and dry/wet vertical column
//! densities in molecules/cm². File ingestion of the reanalysis data happens
//! upstream; this module starts from in-memory arrays.

use crate::error::{ModelError, Result};
use ndarray::{Array1, Array3, Array4};

/// Standard gravitational acceleration in m/s².
///
/// A single constant, not the latitude-dependent international gravity
/// formula; the difference is below 0.3% and well under the other
/// approximations in the chain.
const G0: f64 = 9.80665;
/// Avogadro constant in 1/mol.
const N_AVOGADRO: f64 = 6.022_140_76e23;
/// Mean molar mass of dry air in kg/mol.
const M_DRY: f64 = 28.9644e-3;
/// Molar mass of water in kg/mol.
const M_H2O: f64 = 18.015_28e-3;
/// Square centimeters per square meter.
const CM2_PER_M2: f64 = 1e4;

/// A gridded meteorological state, as read from a reanalysis product.
///
/// Axis order for the 4-d fields is (time, level, lat, lon); surface
/// pressure is (time, lat, lon). The hybrid coefficients `a` (Pa) and `b`
/// (dimensionless) have length `levels + 1` and reconstruct half-level
/// pressures as `p_half[k] = a[k] + b[k]·p_surface`, ordered from the top of
/// the atmosphere down to the surface.
#[derive(Debug, Clone)]
pub struct MeteorologicalFields {
    /// Latitude axis in degrees north.
    pub latitudes: Array1<f64>,
    /// Longitude axis in degrees east.
    pub longitudes: Array1<f64>,
    /// Temperature in K, (time, level, lat, lon).
    pub temperature: Array4<f64>,
    /// Specific humidity in kg/kg, (time, level, lat, lon).
    pub specific_humidity: Array4<f64>,
    /// Surface pressure in Pa, (time, lat, lon).
    pub surface_pressure: Array3<f64>,
    /// Hybrid `a` coefficients in Pa, length `levels + 1`.
    pub hybrid_a: Array1<f64>,
    /// Hybrid `b` coefficients, dimensionless, length `levels + 1`.
    pub hybrid_b: Array1<f64>,
}

/// Per-layer atmospheric state at one location and time, immutable once
/// built.
#[derive(Debug, Clone)]
pub struct AtmosphericProfile {
    latitude: f64,
    longitude: f64,
    surface_pressure_pa: f64,
    /// Half-level pressures in Pa, top down, length `layers + 1`.
    pressure_half_pa: Vec<f64>,
    /// Mid-layer pressures in hPa, length `layers`.
    pressure_hpa: Vec<f64>,
    /// Mid-layer temperatures in K.
    temperature_k: Vec<f64>,
    /// Specific humidity in kg/kg.
    specific_humidity: Vec<f64>,
    /// Water-vapor volume mixing ratio relative to dry air.
    h2o_vmr: Vec<f64>,
    /// Dry-air vertical column density per layer, molecules/cm².
    vcd_dry: Vec<f64>,
    /// Water-vapor vertical column density per layer, molecules/cm².
    vcd_h2o: Vec<f64>,
}

impl AtmosphericProfile {
    /// Build a profile from gridded fields at the grid cell nearest to
    /// (`latitude`, `longitude`) and the given time slot.
    ///
    /// Nearest-neighbor selection only; no spatial or temporal
    /// interpolation.
    pub fn build(
        fields: &MeteorologicalFields,
        latitude: f64,
        longitude: f64,
        time_index: usize,
    ) -> Result<Self> {
        let (n_time, n_level, n_lat, n_lon) = fields.temperature.dim();
        if fields.specific_humidity.dim() != (n_time, n_level, n_lat, n_lon) {
            return Err(ModelError::InconsistentInputs(
                "specific humidity shape differs from temperature",
            ));
        }
        if fields.surface_pressure.dim() != (n_time, n_lat, n_lon) {
            return Err(ModelError::InconsistentInputs(
                "surface pressure shape differs from temperature",
            ));
        }
        if fields.latitudes.len() != n_lat || fields.longitudes.len() != n_lon {
            return Err(ModelError::InconsistentInputs(
                "coordinate axes don't match field shapes",
            ));
        }
        if fields.hybrid_a.len() != n_level + 1 || fields.hybrid_b.len() != n_level + 1 {
            return Err(ModelError::InconsistentInputs(
                "hybrid coefficients must have length levels + 1",
            ));
        }
        if time_index >= n_time {
            return Err(ModelError::InconsistentInputs(
                "time index out of range",
            ));
        }
        if !(latitude.is_finite() && longitude.is_finite()) {
            return Err(ModelError::InvalidInput(format!(
                "target coordinates must be finite, got ({latitude}, {longitude})"
            )));
        }

        let lat_index = nearest_index(fields.latitudes.as_slice().ok_or(
            ModelError::InconsistentInputs("latitude axis not contiguous"),
        )?, latitude, false);
        let lon_index = nearest_index(fields.longitudes.as_slice().ok_or(
            ModelError::InconsistentInputs("longitude axis not contiguous"),
        )?, longitude, true);

        let surface_pressure = fields.surface_pressure[[time_index, lat_index, lon_index]];
        let temperature: Vec<f64> = (0..n_level)
            .map(|k| fields.temperature[[time_index, k, lat_index, lon_index]])
            .collect();
        let specific_humidity: Vec<f64> = (0..n_level)
            .map(|k| fields.specific_humidity[[time_index, k, lat_index, lon_index]])
            .collect();
        let pressure_half: Vec<f64> = fields
            .hybrid_a
            .iter()
            .zip(fields.hybrid_b.iter())
            .map(|(&a, &b)| a + b * surface_pressure)
            .collect();

        Self::from_state(
            fields.latitudes[lat_index],
            fields.longitudes[lon_index],
            surface_pressure,
            pressure_half,
            temperature,
            specific_humidity,
        )
    }

    /// Build a profile directly from per-layer state.
    ///
    /// `pressure_half_pa` are the half-level pressures in Pa ordered top
    /// down, one longer than the layer vectors. All derived column densities
    /// must come out finite and non-negative or the state is rejected as a
    /// data error.
    pub fn from_state(
        latitude: f64,
        longitude: f64,
        surface_pressure_pa: f64,
        pressure_half_pa: Vec<f64>,
        temperature_k: Vec<f64>,
        specific_humidity: Vec<f64>,
    ) -> Result<Self> {
        let layers = temperature_k.len();
        if layers == 0 {
            return Err(ModelError::InconsistentInputs("profile has no layers"));
        }
        if pressure_half_pa.len() != layers + 1 || specific_humidity.len() != layers {
            return Err(ModelError::InconsistentInputs(
                "profile vectors must satisfy len(T) + 1 == len(p_half)",
            ));
        }
        if !(surface_pressure_pa.is_finite() && surface_pressure_pa > 0.) {
            return Err(ModelError::InvalidInput(format!(
                "surface pressure must be positive, got {surface_pressure_pa} Pa"
            )));
        }
        if let Some(&t) = temperature_k.iter().find(|t| !(t.is_finite() && **t > 0.)) {
            return Err(ModelError::InvalidInput(format!(
                "layer temperature must be positive, got {t} K"
            )));
        }
        if let Some(&q) = specific_humidity
            .iter()
            .find(|q| !(q.is_finite() && (0. ..1.).contains(*q)))
        {
            return Err(ModelError::DataError(format!(
                "specific humidity must be in [0, 1), got {q}"
            )));
        }
        if pressure_half_pa
            .windows(2)
            .any(|w| !(w[1] > w[0]) || !w[0].is_finite())
        {
            return Err(ModelError::DataError(
                "half-level pressures must increase from the top down".into(),
            ));
        }

        let mut pressure_hpa = Vec::with_capacity(layers);
        let mut h2o_vmr = Vec::with_capacity(layers);
        let mut vcd_dry = Vec::with_capacity(layers);
        let mut vcd_h2o = Vec::with_capacity(layers);

        for k in 0..layers {
            let delta_p = pressure_half_pa[k + 1] - pressure_half_pa[k];
            // Mid-layer pressure is the mean of the bounding half levels,
            // converted from Pa to hPa.
            pressure_hpa.push(0.5 * (pressure_half_pa[k] + pressure_half_pa[k + 1]) / 100.);

            let q = specific_humidity[k];
            // Moles per kg of moist air, split into dry and water parts.
            let dry_moles_per_kg = (1. - q) / M_DRY;
            let wet_moles_per_kg = q / M_H2O;
            h2o_vmr.push(wet_moles_per_kg / dry_moles_per_kg);

            // Column mass per area is Δp/g (kg/m²); scale to molecules/cm².
            let column_mass = delta_p / G0;
            vcd_dry.push(column_mass * dry_moles_per_kg * N_AVOGADRO / CM2_PER_M2);
            vcd_h2o.push(column_mass * wet_moles_per_kg * N_AVOGADRO / CM2_PER_M2);
        }

        if vcd_dry
            .iter()
            .chain(vcd_h2o.iter())
            .any(|v| !v.is_finite() || *v < 0.)
        {
            return Err(ModelError::DataError(
                "computed vertical column densities are not all finite and non-negative".into(),
            ));
        }

        Ok(Self {
            latitude,
            longitude,
            surface_pressure_pa,
            pressure_half_pa,
            pressure_hpa,
            temperature_k,
            specific_humidity,
            h2o_vmr,
            vcd_dry,
            vcd_h2o,
        })
    }

    /// Latitude of the selected grid cell, degrees north.
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude of the selected grid cell, degrees east.
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Surface pressure in Pa.
    pub fn surface_pressure_pa(&self) -> f64 {
        self.surface_pressure_pa
    }

    /// Number of layers.
    pub fn num_layers(&self) -> usize {
        self.temperature_k.len()
    }

    /// Half-level pressures in Pa, top down, length `num_layers() + 1`.
    pub fn pressure_half_pa(&self) -> &[f64] {
        &self.pressure_half_pa
    }

    /// Mid-layer pressures in hPa.
    pub fn pressure_hpa(&self) -> &[f64] {
        &self.pressure_hpa
    }

    /// Mid-layer temperatures in K.
    pub fn temperature_k(&self) -> &[f64] {
        &self.temperature_k
    }

    /// Specific humidity per layer in kg/kg.
    pub fn specific_humidity(&self) -> &[f64] {
        &self.specific_humidity
    }

    /// Water-vapor volume mixing ratio relative to dry air, per layer.
    pub fn h2o_vmr(&self) -> &[f64] {
        &self.h2o_vmr
    }

    /// Dry-air vertical column density per layer, molecules/cm².
    pub fn vcd_dry(&self) -> &[f64] {
        &self.vcd_dry
    }

    /// Water-vapor vertical column density per layer, molecules/cm².
    pub fn vcd_h2o(&self) -> &[f64] {
        &self.vcd_h2o
    }
}

/// Index of the axis value closest to `target`.
///
/// Longitudes compare on the circle so that 359.5° is a neighbor of 0.5°.
fn nearest_index(axis: &[f64], target: f64, periodic: bool) -> usize {
    let distance = |a: f64, b: f64| {
        let d = (a - b).abs();
        if periodic {
            d.min(360. - d)
        } else {
            d
        }
    };
    axis.iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            distance(**a, target)
                .partial_cmp(&distance(**b, target))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, _)| i)
        .unwrap_or(0)
}
