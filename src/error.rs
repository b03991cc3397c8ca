//! Crate-wide error type.

use thiserror::Error;

/// Possible errors from the forward model and its building blocks.
#[derive(Error, Debug)]
pub enum ModelError {
    /// An input violates a physical precondition (non-positive pressure or
    /// temperature, negative mixing ratio, non-positive air mass factor).
    #[error("invalid physical input: {0}")]
    InvalidInput(String),

    /// Upstream data produced a value the model refuses to use (non-finite
    /// or negative column density, malformed line record, non-monotonic
    /// reference table). These are never clamped.
    #[error("data error: {0}")]
    DataError(String),

    /// The flat state vector does not match the layers × gases +
    /// polynomial-coefficient layout the tensor implies.
    #[error("state vector length mismatch: expected {expected}, got {actual}")]
    StateLength {
        /// Expected flat length.
        expected: usize,
        /// Length actually supplied.
        actual: usize,
    },

    /// A requested abscissa falls outside the tabulated/convolved domain.
    #[error("requested point {value} outside domain [{min}, {max}]")]
    OutOfDomain {
        /// The point that was requested.
        value: f64,
        /// Lower edge of the valid domain.
        min: f64,
        /// Upper edge of the valid domain.
        max: f64,
    },

    /// The inputs don't have the expected shape(s).
    #[error("inputs have inconsistent shapes: {0}")]
    InconsistentInputs(&'static str),

    /// A wavenumber grid is empty or not strictly increasing.
    #[error("wavenumber grid is empty or not strictly increasing")]
    BadGrid,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ModelError>;
