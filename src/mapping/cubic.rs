//! Cubically-interpolated key mapping implementation.

use super::{frexp, ldexp, KeyMapping, MappingBase};
use crate::error::SketchError;

/// Coefficients of the interpolation polynomial.
const A: f64 = 6.0 / 35.0;
const B: f64 = -3.0 / 5.0;
const C: f64 = 10.0 / 7.0;

/// A fast key mapping that cubically interpolates the logarithm between powers of two.
///
/// Like [`LinearlyInterpolatedMapping`](super::LinearlyInterpolatedMapping) this avoids
/// evaluating the logarithm, but the cubic polynomial tracks log2 closely enough to come within
/// a few percent of the memory-optimal bin density. The inverse runs the polynomial backwards
/// through Cardano's formula.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CubicallyInterpolatedMapping {
    base: MappingBase,
}

impl CubicallyInterpolatedMapping {
    /// Creates a cubically-interpolated mapping with the given relative accuracy.
    ///
    /// # Errors
    ///
    /// If the relative accuracy is not between 0 and 1 (exclusive), an error is returned.
    pub fn new(relative_accuracy: f64) -> Result<Self, SketchError> {
        Self::with_offset(relative_accuracy, 0.0)
    }

    /// Creates a cubically-interpolated mapping with the given relative accuracy and key offset.
    ///
    /// # Errors
    ///
    /// If the relative accuracy is not between 0 and 1 (exclusive), an error is returned.
    pub fn with_offset(relative_accuracy: f64, offset: f64) -> Result<Self, SketchError> {
        let mut base = MappingBase::new(relative_accuracy, offset)?;

        // The polynomial overshoots log2 by a factor of C at the far end of each interval.
        base.scale_multiplier(1.0 / C);

        Ok(Self { base })
    }

    /// Approximates log2 with a cubic polynomial in the significand.
    fn log2_approx(value: f64) -> f64 {
        let (mantissa, exponent) = frexp(value);
        let significand = 2.0 * mantissa - 1.0;
        ((A * significand + B) * significand + C) * significand + (exponent - 1) as f64
    }

    /// Inverse of [`Self::log2_approx`], derived from Cardano's formula.
    fn exp2_approx(value: f64) -> f64 {
        let exponent = value.floor();
        let delta_0 = B * B - 3.0 * A * C;
        let delta_1 = 2.0 * B * B * B - 9.0 * A * B * C - 27.0 * A * A * (value - exponent);

        // The radicand of the cube root can go negative; cbrt keeps it on the real line.
        let cardano = ((delta_1 - (delta_1 * delta_1 - 4.0 * delta_0 * delta_0 * delta_0).sqrt()) / 2.0).cbrt();

        let significand_plus_one = -(B + cardano + delta_0 / cardano) / (3.0 * A) + 1.0;
        let mantissa = significand_plus_one / 2.0;
        ldexp(mantissa, exponent as i32 + 1)
    }

    fn log_gamma(&self, value: f64) -> f64 {
        Self::log2_approx(value) * self.base.multiplier()
    }

    fn pow_gamma(&self, exponent: f64) -> f64 {
        Self::exp2_approx(exponent / self.base.multiplier())
    }
}

impl KeyMapping for CubicallyInterpolatedMapping {
    fn key(&self, value: f64) -> i64 {
        self.base.key(self.log_gamma(value))
    }

    fn value(&self, key: i64) -> f64 {
        self.base.value(self.pow_gamma(self.base.exponent(key)))
    }

    fn relative_accuracy(&self) -> f64 {
        self.base.relative_accuracy()
    }

    fn min_possible(&self) -> f64 {
        self.base.min_possible()
    }

    fn max_possible(&self) -> f64 {
        self.base.max_possible()
    }

    fn gamma(&self) -> f64 {
        self.base.gamma()
    }
}
