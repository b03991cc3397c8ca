//! Complex probability function for the Voigt profile.
//!
//! The Voigt profile is evaluated through the real part of the complex
//! probability (Faddeeva) function w(z) = exp(−z²)·erfc(−iz) for
//! z = x + iy, y > 0. Two complementary expansions cover the plane:
//! near the line core, a pole expansion of the Gaussian sampled on a
//! uniform grid with an image-term correction (the family behind
//! Abramowitz & Stegun eq. 7.1.29 and Chiarella & Reichel 1968); in the
//! wings and at large widths, the Laplace continued fraction. Both are
//! accurate to at least nine significant digits for y ≥ 10⁻⁸, which is
//! the smallest width ratio the degenerate-limit dispatch in the caller
//! lets through.

use num_complex::Complex64;
use std::f64::consts::PI;

/// 1/√π.
const FRAC_1_SQRT_PI: f64 = 0.564_189_583_547_756_3;

/// Sampling step of the pole expansion. The aliasing error scales as
/// exp(−π²/H²), below 1e-17. A power of two keeps every node n·H and
/// every node offset exactly representable, which the image-term
/// cancellation near the real axis depends on.
const POLE_STEP: f64 = 0.5;

/// Number of sampling points on each side of zero; the farthest pole sits
/// at 9, where the Gaussian weight is exp(−81).
const POLE_TERMS: i32 = 18;

/// Depth of the Laplace continued fraction.
const FRACTION_DEPTH: u32 = 24;

/// The complex probability function w(x + iy) for y > 0.
///
/// `x` is the scaled distance from line center, `y` the scaled Lorentz to
/// Doppler width ratio (both in √ln2 units of the Doppler HWHM).
pub(crate) fn complex_probability(x: f64, y: f64) -> Complex64 {
    let z = Complex64::new(x, y);
    if y >= 4.4 || x.abs() + y >= 8.0 {
        continued_fraction(z)
    } else {
        pole_sum(z)
    }
}

/// Laplace continued fraction
/// w(z) = (i/√π)/(z − (1/2)/(z − 1/(z − (3/2)/(z − …)))),
/// evaluated backward. At depth 24 the truncation error is below 1e-13
/// everywhere this branch is selected (|z| ≥ 4.4).
fn continued_fraction(z: Complex64) -> Complex64 {
    let mut tail = Complex64::new(0., 0.);
    for k in (1..=FRACTION_DEPTH).rev() {
        tail = (0.5 * f64::from(k)) / (z - tail);
    }
    Complex64::new(0., FRAC_1_SQRT_PI) / (z - tail)
}

/// Pole expansion of the sampled Gaussian with its image correction:
///
/// w(z) = (ih/π) Σₙ exp(−n²h²)/(z − nh) + 2·exp(−z²)/(1 − exp(−2πiz/h))
///
/// exact for 0 < Im z < π/h up to the exp(−π²/h²) aliasing of the
/// Gaussian. Near a real-axis sampling point the nearest pole term and
/// the image term cancel to roughly h/(πy) times the result; with exact
/// nodes and the expm1/half-angle denominator below, both carry full
/// relative precision, so the loss stays at about 1e-16·h/(πy), nine
/// digits at y = 1e-8.
fn pole_sum(z: Complex64) -> Complex64 {
    let mut sum = Complex64::new(0., 0.);
    for n in -POLE_TERMS..=POLE_TERMS {
        let t = f64::from(n) * POLE_STEP;
        sum += f64::exp(-t * t) / (z - t);
    }
    sum *= Complex64::new(0., POLE_STEP / PI);

    // 1 − exp(−2πiz/h), with the phase reduced by the nearest node so the
    // real part can be formed without cancellation: the offset x − n*h is
    // exact, and 1 − e^a·cosφ = −expm1(a) + 2e^a·sin²(φ/2).
    let offset = z.re - (z.re / POLE_STEP).round() * POLE_STEP;
    let phase = 2. * PI * offset / POLE_STEP;
    let growth = 2. * PI * z.im / POLE_STEP;
    let sin_half = (0.5 * phase).sin();
    let denominator = Complex64::new(
        2. * f64::exp(growth) * sin_half * sin_half - f64::exp_m1(growth),
        f64::exp(growth) * phase.sin(),
    );

    sum + 2. * (-z * z).exp() / denominator
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Brute-force quadrature of K(x,y) = (y/π)∫exp(−t²)/((x−t)²+y²)dt.
    ///
    /// The integrand is analytic in a strip of half-width y, so a uniform
    /// step of y/4 makes the quadrature error about exp(−8π); good to
    /// eleven digits, comfortably beyond what the assertions need.
    fn quadrature_reference(x: f64, y: f64) -> f64 {
        let step = (y / 4.).min(0.05);
        let half_span = x.abs() + 9.0;
        let n = (2. * half_span / step).ceil() as usize;
        let mut sum = 0.;
        for k in 0..=n {
            let t = -half_span + step * k as f64;
            sum += f64::exp(-t * t) / ((x - t) * (x - t) + y * y);
        }
        sum * step * y / PI
    }

    /// Six significant digits against the quadrature reference, over the
    /// line core, the near wings, the far wings, and both sides of the
    /// branch seam.
    #[test]
    fn matches_quadrature_reference_to_six_digits() {
        let points = [
            (0.0, 0.01),
            (0.5, 0.1),
            (1.0, 0.1),
            (1.0, 1.0),
            (2.0, 0.5),
            (3.0, 0.01),
            (0.5, 4.0),
            (5.0, 0.5),
            (5.5, 0.02),
            (7.0, 3.0),
            (0.0, 5.5),
            (10.0, 0.1),
            (40.0, 0.2),
        ];
        for &(x, y) in &points {
            let w = complex_probability(x, y);
            let reference = quadrature_reference(x, y);
            assert_relative_eq!(w.re, reference, max_relative = 1e-6);
        }
    }

    /// Real-axis limit: w(x + i0⁺) has real part exp(−x²).
    #[test]
    fn real_axis_limit_is_gaussian() {
        for &x in &[0.0, 0.3, 1.0, 2.0, 3.0] {
            let w = complex_probability(x, 1e-10);
            assert_relative_eq!(w.re, f64::exp(-x * x), max_relative = 1e-6);
        }
    }

    /// Pure imaginary argument: w(iy) = exp(y²)·erfc(y), tabulated values
    /// from Abramowitz & Stegun, table 7.9.
    #[test]
    fn imaginary_axis_matches_tables() {
        // (y, w(iy))
        let table = [
            (0.5, 0.6156903441),
            (1.0, 0.4275835762),
            (2.0, 0.2553956763),
        ];
        for &(y, expected) in &table {
            let w = complex_probability(0.0, y);
            assert_relative_eq!(w.re, expected, max_relative = 1e-9);
            assert!(w.im.abs() < 1e-12);
        }
    }

    /// Far-wing asymptotics: w(z) → i/(√π z) for |z| → ∞, so along the real
    /// axis Re w(x+iy) → y/(√π (x² + y²)).
    #[test]
    fn far_wing_is_lorentzian() {
        let (x, y) = (40.0, 0.2);
        let w = complex_probability(x, y);
        let lorentz = y / (PI.sqrt() * (x * x + y * y));
        assert_relative_eq!(w.re, lorentz, max_relative = 1e-3);
    }

    /// The real part is a positive, even function of x.
    #[test]
    fn symmetric_and_positive() {
        for &y in &[1e-6, 0.01, 0.5, 3.0, 7.0] {
            for &x in &[0.1, 1.0, 4.0, 10.0, 20.0] {
                let plus = complex_probability(x, y);
                let minus = complex_probability(-x, y);
                assert_relative_eq!(plus.re, minus.re, max_relative = 1e-12);
                assert!(plus.re > 0.);
            }
        }
    }
}
