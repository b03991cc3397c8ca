//! The (wavenumber × layer × gas) cross-section tensor.
//!
//! Building the tensor is the expensive step of a retrieval setup: every
//! (layer, gas) pair needs a full line-by-line evaluation at that layer's
//! pressure and temperature. The pairs are independent, so the double loop
//! runs on the rayon thread pool with coarse progress reporting through the
//! `log` facade.

use std::sync::atomic::{AtomicUsize, Ordering};

use log::{debug, info};
use ndarray::{Array1, Array3};
use rayon::prelude::*;

use crate::error::{ModelError, Result};
use crate::lineshape::{check_grid, LineShapeModel};
use crate::profile::AtmosphericProfile;

/// Absorption cross sections on a common wavenumber grid, indexed
/// (wavenumber, layer, gas), in cm²/molecule.
#[derive(Debug, Clone)]
pub struct CrossSectionTensor {
    values: Array3<f64>,
    grid: Array1<f64>,
}

impl CrossSectionTensor {
    /// The tensor values, axes (wavenumber, layer, gas).
    pub fn values(&self) -> &Array3<f64> {
        &self.values
    }

    /// The wavenumber grid in cm⁻¹.
    pub fn grid(&self) -> &Array1<f64> {
        &self.grid
    }

    /// Number of wavenumber grid points.
    pub fn num_wavenumbers(&self) -> usize {
        self.values.shape()[0]
    }

    /// Number of atmospheric layers.
    pub fn num_layers(&self) -> usize {
        self.values.shape()[1]
    }

    /// Number of gases.
    pub fn num_gases(&self) -> usize {
        self.values.shape()[2]
    }
}

/// Build the cross-section tensor for `profile` over `grid`.
///
/// One [`LineShapeModel`] per gas; the gas axis of the result follows the
/// order of `models`. The (layer, gas) evaluations run in parallel on the
/// global rayon pool. Within one cell the per-line summation order is the
/// line-list order, so a cell is reproducible bit for bit; different
/// parallel schedules only change which cells run when, not their contents.
pub fn build_cross_sections(
    profile: &AtmosphericProfile,
    models: &[LineShapeModel],
    grid: &[f64],
) -> Result<CrossSectionTensor> {
    check_grid(grid)?;
    if models.is_empty() {
        return Err(ModelError::InconsistentInputs("no line-shape models given"));
    }

    let num_layers = profile.num_layers();
    let num_gases = models.len();
    let num_cells = num_layers * num_gases;

    info!(
        "building cross sections for {num_layers} layers × {num_gases} gases on {} grid points",
        grid.len()
    );

    // Log roughly every 10% of completed cells.
    let completed = AtomicUsize::new(0);
    let log_every = (num_cells / 10).max(1);

    let cells: Vec<(usize, usize, Array1<f64>)> = (0..num_cells)
        .into_par_iter()
        .map(|cell| -> Result<_> {
            let layer = cell / num_gases;
            let gas = cell % num_gases;
            let xs = models[gas].cross_section(
                grid,
                profile.pressure_hpa()[layer],
                profile.temperature_k()[layer],
            )?;

            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            if done % log_every == 0 {
                let progress = done as f64 / num_cells as f64 * 100.;
                info!("computed {done}/{num_cells} cross-section cells ({progress:0.0}%)");
            }
            Ok((layer, gas, xs))
        })
        .collect::<Result<_>>()?;

    debug!("assembling cross-section tensor");
    let mut values = Array3::zeros((grid.len(), num_layers, num_gases));
    for (layer, gas, xs) in cells {
        for (w, &value) in xs.iter().enumerate() {
            values[[w, layer, gas]] = value;
        }
    }

    Ok(CrossSectionTensor {
        values,
        grid: Array1::from_iter(grid.iter().copied()),
    })
}
