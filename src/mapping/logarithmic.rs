//! Logarithmic key mapping implementation.

use super::{KeyMapping, MappingBase};
use crate::error::SketchError;

/// The memory-optimal key mapping.
///
/// Maps values to keys with `key = ceil(log_gamma(value))`, evaluating the logarithm exactly.
/// Given a target relative accuracy, this mapping needs the fewest keys to cover a range of
/// values, at the cost of a full `log`/`exp` evaluation per operation.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct LogarithmicMapping {
    base: MappingBase,
}

impl LogarithmicMapping {
    /// Creates a logarithmic mapping with the given relative accuracy.
    ///
    /// # Errors
    ///
    /// If the relative accuracy is not between 0 and 1 (exclusive), an error is returned.
    pub fn new(relative_accuracy: f64) -> Result<Self, SketchError> {
        Self::with_offset(relative_accuracy, 0.0)
    }

    /// Creates a logarithmic mapping with the given relative accuracy and key offset.
    ///
    /// The offset is added to every key, shifting the bin numbering without changing the bin
    /// geometry.
    ///
    /// # Errors
    ///
    /// If the relative accuracy is not between 0 and 1 (exclusive), an error is returned.
    pub fn with_offset(relative_accuracy: f64, offset: f64) -> Result<Self, SketchError> {
        let mut base = MappingBase::new(relative_accuracy, offset)?;

        // Work in base 2 so that `key` costs one log2 instead of a ln pair.
        base.scale_multiplier(std::f64::consts::LN_2);

        Ok(Self { base })
    }

    fn log_gamma(&self, value: f64) -> f64 {
        value.log2() * self.base.multiplier()
    }

    fn pow_gamma(&self, exponent: f64) -> f64 {
        (exponent / self.base.multiplier()).exp2()
    }
}

impl KeyMapping for LogarithmicMapping {
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

impl Default for LogarithmicMapping {
    /// Creates a logarithmic mapping with 1% relative accuracy (the common default).
    fn default() -> Self {
        Self::new(0.01).expect("0.01 is a valid relative accuracy")
    }
}
