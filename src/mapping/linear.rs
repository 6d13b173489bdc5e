//! Linearly-interpolated key mapping implementation.

use super::{frexp, ldexp, KeyMapping, MappingBase};
use crate::error::SketchError;

/// A fast key mapping that linearly interpolates the logarithm between powers of two.
///
/// The floor of log2 comes straight out of the binary representation of the value, so no
/// logarithm is evaluated at all. The linear interpolation is coarser than the exact mapping,
/// which costs extra bins for the same accuracy guarantee.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct LinearlyInterpolatedMapping {
    base: MappingBase,
}

impl LinearlyInterpolatedMapping {
    /// Creates a linearly-interpolated mapping with the given relative accuracy.
    ///
    /// # Errors
    ///
    /// If the relative accuracy is not between 0 and 1 (exclusive), an error is returned.
    pub fn new(relative_accuracy: f64) -> Result<Self, SketchError> {
        Self::with_offset(relative_accuracy, 0.0)
    }

    /// Creates a linearly-interpolated mapping with the given relative accuracy and key offset.
    ///
    /// # Errors
    ///
    /// If the relative accuracy is not between 0 and 1 (exclusive), an error is returned.
    pub fn with_offset(relative_accuracy: f64, offset: f64) -> Result<Self, SketchError> {
        let base = MappingBase::new(relative_accuracy, offset)?;
        Ok(Self { base })
    }

    /// Approximates log2 as `significand + (exponent - 1)` where
    /// `value = (significand + 1) / 2 * 2^exponent` with the significand in `[0, 1)`.
    fn log2_approx(value: f64) -> f64 {
        let (mantissa, exponent) = frexp(value);
        let significand = 2.0 * mantissa - 1.0;
        significand + (exponent - 1) as f64
    }

    /// Inverse of [`Self::log2_approx`].
    fn exp2_approx(value: f64) -> f64 {
        let exponent = value.floor() + 1.0;
        let mantissa = (value - exponent + 2.0) / 2.0;
        ldexp(mantissa, exponent as i32)
    }

    fn log_gamma(&self, value: f64) -> f64 {
        Self::log2_approx(value) * self.base.multiplier()
    }

    fn pow_gamma(&self, exponent: f64) -> f64 {
        Self::exp2_approx(exponent / self.base.multiplier())
    }
}

impl KeyMapping for LinearlyInterpolatedMapping {
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
