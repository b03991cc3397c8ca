//! Line-by-line absorption cross sections and a differentiable forward
//! model for trace-gas retrievals.
//!
//! The crate covers the computational core of a near-infrared retrieval
//! setup, from spectroscopic line parameters to the sensitivity of the
//! simulated measurement:
//!
//! 1. [`spectroscopy`]: typed, windowed line lists per molecule.
//! 2. [`lineshape`]: Doppler/Lorentz/Voigt cross sections at a given
//!    pressure and temperature.
//! 3. [`profile`]: per-layer atmospheric state and vertical column
//!    densities from gridded meteorological fields.
//! 4. [`tensor`]: the (wavenumber, layer, gas) cross-section tensor,
//!    built in parallel.
//! 5. [`instrument`] and [`solar`]: the measurement operator and the
//!    solar reference.
//! 6. [`forward`]: Beer-Lambert transmission, instrument response and a
//!    polynomial continuum, generic over the [`dual`] scalar.
//! 7. [`jacobian`]: forward-mode derivatives of the whole chain with
//!    respect to the state vector.
//!
//! All computation is deterministic and free of interior I/O; reading
//! line-list, reanalysis and solar files happens upstream and enters as
//! typed values. The layer×gas and per-column loops run on the rayon
//! thread pool; progress is reported through the `log` facade.

pub mod dual;
pub mod error;
pub mod forward;
pub mod instrument;
pub mod jacobian;
pub mod lineshape;
pub mod profile;
pub mod solar;
pub mod spectroscopy;
pub mod tensor;

pub use error::{ModelError, Result};
pub use forward::{ForwardModel, GasColumn, StateVector};
pub use instrument::Instrument;
pub use jacobian::JacobianEngine;
pub use lineshape::{LineShapeKind, LineShapeModel};
pub use profile::{AtmosphericProfile, MeteorologicalFields};
pub use solar::SolarSpectrum;
pub use spectroscopy::{LineList, LineTransition, Molecule};
pub use tensor::{build_cross_sections, CrossSectionTensor};
