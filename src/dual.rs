//! Forward-mode dual numbers.
//!
//! The forward model is written once, generically over [`Scalar`], and
//! instantiated with plain `f64` for simulation and with [`Dual`] for the
//! Jacobian. A dual number carries one derivative slot, so one forward pass
//! yields one Jacobian column; the engine seeds one pass per state element.

use std::ops::{Add, Div, Mul, Neg, Sub};

/// The arithmetic the forward model needs from its number type.
///
/// Only the operations the model actually performs are required: field
/// arithmetic among values, mixed arithmetic with constant `f64` factors
/// (cross sections, column densities, kernel weights), and `exp` for the
/// Beer-Lambert transmission.
pub trait Scalar:
    Copy
    + std::fmt::Debug
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + Add<f64, Output = Self>
    + Sub<f64, Output = Self>
    + Mul<f64, Output = Self>
{
    /// Lift a constant; its derivative is zero.
    fn constant(value: f64) -> Self;

    /// The underlying value, discarding any derivative.
    fn value(self) -> f64;

    /// e^self.
    fn exp(self) -> Self;
}

impl Scalar for f64 {
    fn constant(value: f64) -> Self {
        value
    }

    fn value(self) -> f64 {
        self
    }

    fn exp(self) -> Self {
        f64::exp(self)
    }
}

/// A value together with its derivative with respect to one seed variable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dual {
    /// The primal value.
    pub value: f64,
    /// d(value)/d(seed).
    pub deriv: f64,
}

impl Dual {
    /// A constant with zero derivative.
    pub fn constant(value: f64) -> Self {
        Self { value, deriv: 0. }
    }

    /// The seed variable itself: derivative one.
    pub fn variable(value: f64) -> Self {
        Self { value, deriv: 1. }
    }
}

impl Add for Dual {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self {
            value: self.value + rhs.value,
            deriv: self.deriv + rhs.deriv,
        }
    }
}

impl Sub for Dual {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self {
            value: self.value - rhs.value,
            deriv: self.deriv - rhs.deriv,
        }
    }
}

impl Mul for Dual {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        Self {
            value: self.value * rhs.value,
            deriv: self.deriv * rhs.value + self.value * rhs.deriv,
        }
    }
}

impl Div for Dual {
    type Output = Self;
    fn div(self, rhs: Self) -> Self {
        Self {
            value: self.value / rhs.value,
            deriv: (self.deriv * rhs.value - self.value * rhs.deriv) / (rhs.value * rhs.value),
        }
    }
}

impl Neg for Dual {
    type Output = Self;
    fn neg(self) -> Self {
        Self {
            value: -self.value,
            deriv: -self.deriv,
        }
    }
}

impl Add<f64> for Dual {
    type Output = Self;
    fn add(self, rhs: f64) -> Self {
        Self {
            value: self.value + rhs,
            deriv: self.deriv,
        }
    }
}

impl Sub<f64> for Dual {
    type Output = Self;
    fn sub(self, rhs: f64) -> Self {
        Self {
            value: self.value - rhs,
            deriv: self.deriv,
        }
    }
}

impl Mul<f64> for Dual {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self {
            value: self.value * rhs,
            deriv: self.deriv * rhs,
        }
    }
}

impl Scalar for Dual {
    fn constant(value: f64) -> Self {
        Dual::constant(value)
    }

    fn value(self) -> f64 {
        self.value
    }

    fn exp(self) -> Self {
        let e = f64::exp(self.value);
        Self {
            value: e,
            deriv: self.deriv * e,
        }
    }
}
