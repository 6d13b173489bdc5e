//! Key mappings between values and bin indices.
//!
//! A key mapping defines how floating-point values are assigned to integer bin keys, which is
//! what determines the relative accuracy guarantee of the sketch. All mappings here share the
//! same bin geometry (successive bin midpoints differ by a factor of gamma); they differ only
//! in how the base-gamma logarithm and its inverse are approximated, trading compute cost for
//! bin density:
//!
//! - [`LogarithmicMapping`]: exact log/exp. Memory-optimal, the reference mapping.
//! - [`LinearlyInterpolatedMapping`]: linear interpolation between powers of two. Fastest,
//!   but needs the most bins for a given accuracy.
//! - [`CubicallyInterpolatedMapping`]: cubic interpolation between powers of two. Nearly
//!   memory-optimal while avoiding the logarithm entirely.

mod cubic;
mod linear;
mod logarithmic;

pub use self::cubic::CubicallyInterpolatedMapping;
pub use self::linear::LinearlyInterpolatedMapping;
pub use self::logarithmic::LogarithmicMapping;

use crate::error::SketchError;

/// Maps values to bin keys and vice versa.
///
/// For any value `v` with `min_possible() <= v <= max_possible()`, implementations guarantee
/// that `value(key(v))` is within a relative error of `relative_accuracy()` of `v`.
pub trait KeyMapping: Clone + Send + Sync {
    /// Returns the key of the bin covering the given value.
    ///
    /// The value must be positive; negative values are handled by the sketch, which keys their
    /// absolute value into a separate store.
    fn key(&self, value: f64) -> i64;

    /// Returns the value represented by the bin with the given key.
    ///
    /// This is the midpoint of the bin's geometric interval, so that the relative error against
    /// any value in the bin is at most `relative_accuracy()`.
    fn value(&self, key: i64) -> f64;

    /// The relative accuracy guarantee, referred to as alpha in the DDSketch paper.
    fn relative_accuracy(&self) -> f64;

    /// The smallest positive value the mapping can distinguish from zero.
    fn min_possible(&self) -> f64;

    /// The largest value the mapping can handle.
    fn max_possible(&self) -> f64;

    /// The bin width ratio, `gamma = (1 + alpha) / (1 - alpha)`.
    fn gamma(&self) -> f64;
}

/// Parameters shared by every mapping variant.
///
/// Holds the bin geometry derived from the relative accuracy, plus the multiplier each variant
/// rescales to fold its own log-base conversion into a single multiplication.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub(crate) struct MappingBase {
    relative_accuracy: f64,
    offset: f64,
    gamma: f64,
    multiplier: f64,
    min_possible: f64,
    max_possible: f64,
}

impl MappingBase {
    pub(crate) fn new(relative_accuracy: f64, offset: f64) -> Result<Self, SketchError> {
        if relative_accuracy <= 0.0 || relative_accuracy >= 1.0 {
            return Err(SketchError::InvalidArgument {
                reason: "relative accuracy must be between 0 and 1 (exclusive)",
            });
        }

        let gamma_mantissa = 2.0 * relative_accuracy / (1.0 - relative_accuracy);
        let gamma = 1.0 + gamma_mantissa;

        Ok(Self {
            relative_accuracy,
            offset,
            gamma,
            multiplier: 1.0 / gamma_mantissa.ln_1p(),
            min_possible: f64::MIN_POSITIVE * gamma,
            max_possible: f64::MAX / gamma,
        })
    }

    /// Rescales the multiplier to account for a variant's log base.
    pub(crate) fn scale_multiplier(&mut self, factor: f64) {
        self.multiplier *= factor;
    }

    pub(crate) fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Turns an (approximated) base-gamma logarithm into a bin key.
    pub(crate) fn key(&self, log_gamma: f64) -> i64 {
        (log_gamma.ceil() + self.offset) as i64
    }

    /// The base-gamma exponent a variant must raise gamma to for the given key.
    pub(crate) fn exponent(&self, key: i64) -> f64 {
        key as f64 - self.offset
    }

    /// Turns gamma raised to a key's exponent into the bin midpoint value.
    pub(crate) fn value(&self, pow_gamma: f64) -> f64 {
        pow_gamma * (2.0 / (1.0 + self.gamma))
    }

    pub(crate) fn relative_accuracy(&self) -> f64 {
        self.relative_accuracy
    }

    pub(crate) fn gamma(&self) -> f64 {
        self.gamma
    }

    pub(crate) fn min_possible(&self) -> f64 {
        self.min_possible
    }

    pub(crate) fn max_possible(&self) -> f64 {
        self.max_possible
    }
}

/// Builds the power of two with the given exponent directly from its bit pattern.
///
/// The exponent must be in the normal range `[-1022, 1023]`.
fn pow2(exponent: i32) -> f64 {
    debug_assert!((-1022..=1023).contains(&exponent));
    f64::from_bits(((exponent + 1023) as u64) << 52)
}

/// Decomposes a finite value into `(mantissa, exponent)` with `value = mantissa * 2^exponent`
/// and `mantissa` in `[0.5, 1)`.
///
/// Zero and non-finite values come back unchanged with an exponent of 0.
pub(crate) fn frexp(value: f64) -> (f64, i32) {
    const EXPONENT_MASK: u64 = 0x7ff << 52;

    if value == 0.0 || !value.is_finite() {
        return (value, 0);
    }

    let bits = value.to_bits();
    let biased = ((bits >> 52) & 0x7ff) as i32;
    if biased == 0 {
        // Subnormal: renormalize first, then undo the scaling in the exponent.
        let (mantissa, exponent) = frexp(value * pow2(54));
        return (mantissa, exponent - 54);
    }

    // Replace the exponent field with the one encoding 2^-1, keeping sign and mantissa bits.
    let mantissa = f64::from_bits((bits & !EXPONENT_MASK) | (1022 << 52));
    (mantissa, biased - 1022)
}

/// Computes `mantissa * 2^exponent`, the inverse of [`frexp`].
///
/// The exponent is split so that intermediate products stay finite even when the result sits
/// at either end of the representable range.
pub(crate) fn ldexp(mantissa: f64, exponent: i32) -> f64 {
    let first = (exponent / 2).clamp(-1022, 1023);
    let second = (exponent - first).clamp(-1022, 1023);

    mantissa * pow2(first) * pow2(second)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Relative error of `actual` against `expected`, as the accuracy sweep measures it.
    fn relative_error(expected: f64, actual: f64) -> f64 {
        assert!(
            expected >= 0.0 && actual >= 0.0,
            "arguments should be positive numbers"
        );

        if expected == actual {
            return 0.0;
        }

        (actual - expected).abs() / expected
    }

    /// Walks the full indexable range and checks the round-trip accuracy of every step.
    fn assert_value_accuracy<M: KeyMapping>(mapping: &M) {
        let value_mult = 2.0 - std::f64::consts::SQRT_2 * 1.0e-1;

        let mut value = mapping.min_possible();
        while value < mapping.max_possible() / value_mult {
            value *= value_mult;
            let map_val = mapping.value(mapping.key(value));
            let rel_err = relative_error(value, map_val);
            assert!(
                rel_err < mapping.relative_accuracy(),
                "value {} mapped to {} with relative error {} >= {}",
                value,
                map_val,
                rel_err,
                mapping.relative_accuracy()
            );
        }

        let max_possible = mapping.max_possible();
        let rel_err = relative_error(max_possible, mapping.value(mapping.key(max_possible)));
        assert!(rel_err < mapping.relative_accuracy());
    }

    /// Runs the round-trip sweep over a wide range of relative accuracies.
    fn assert_relative_accuracy<M: KeyMapping>(create: impl Fn(f64) -> M) {
        let rel_acc_mult = 1.0 - std::f64::consts::SQRT_2 * 1.0e-1;
        let min_rel_acc = 1.0e-8;

        let mut rel_acc = 1.0 - 1.0e-3;
        while rel_acc >= min_rel_acc {
            let mapping = create(rel_acc);
            assert_value_accuracy(&mapping);
            rel_acc *= rel_acc_mult;
        }
    }

    /// Key offsets shift the bin numbering of 1.0 to the integer-cast offset.
    fn assert_offset_keys<M: KeyMapping>(create: impl Fn(f64, f64) -> M) {
        for offset in [0.0, 1.0, -12.23, 7768.3] {
            let mapping = create(0.01, offset);
            assert_eq!(mapping.key(1.0), offset as i64);
        }
    }

    #[test]
    fn test_logarithmic_relative_accuracy() {
        assert_relative_accuracy(|rel_acc| LogarithmicMapping::new(rel_acc).unwrap());
    }

    #[test]
    fn test_linearly_interpolated_relative_accuracy() {
        assert_relative_accuracy(|rel_acc| LinearlyInterpolatedMapping::new(rel_acc).unwrap());
    }

    #[test]
    fn test_cubically_interpolated_relative_accuracy() {
        assert_relative_accuracy(|rel_acc| CubicallyInterpolatedMapping::new(rel_acc).unwrap());
    }

    #[test]
    fn test_logarithmic_offsets() {
        assert_offset_keys(|rel_acc, offset| {
            LogarithmicMapping::with_offset(rel_acc, offset).unwrap()
        });
    }

    #[test]
    fn test_linearly_interpolated_offsets() {
        assert_offset_keys(|rel_acc, offset| {
            LinearlyInterpolatedMapping::with_offset(rel_acc, offset).unwrap()
        });
    }

    #[test]
    fn test_cubically_interpolated_offsets() {
        assert_offset_keys(|rel_acc, offset| {
            CubicallyInterpolatedMapping::with_offset(rel_acc, offset).unwrap()
        });
    }

    #[test]
    fn test_frexp_normal_values() {
        for (value, expected_mantissa, expected_exponent) in [
            (1.0, 0.5, 1),
            (0.5, 0.5, 0),
            (8.0, 0.5, 4),
            (3.0, 0.75, 2),
            (0.75, 0.75, 0),
            (std::f64::consts::PI, std::f64::consts::FRAC_PI_4, 2),
        ] {
            let (mantissa, exponent) = frexp(value);
            assert_eq!(mantissa, expected_mantissa, "mantissa of {}", value);
            assert_eq!(exponent, expected_exponent, "exponent of {}", value);
        }
    }

    #[test]
    fn test_frexp_subnormal() {
        let value = f64::MIN_POSITIVE / 1024.0;
        let (mantissa, exponent) = frexp(value);
        assert!((0.5..1.0).contains(&mantissa));
        assert_eq!(ldexp(mantissa, exponent), value);
    }

    #[test]
    fn test_frexp_ldexp_roundtrip() {
        for value in [f64::MIN_POSITIVE, 1.5e-300, 0.1, 1.0, 42.0, 6.02e23, f64::MAX] {
            let (mantissa, exponent) = frexp(value);
            assert!((0.5..1.0).contains(&mantissa), "mantissa of {}", value);
            assert_eq!(ldexp(mantissa, exponent), value);
        }
    }

    #[test]
    fn test_invalid_relative_accuracy() {
        assert!(LogarithmicMapping::new(0.0).is_err());
        assert!(LogarithmicMapping::new(1.0).is_err());
        assert!(LogarithmicMapping::new(-0.1).is_err());
        assert!(LinearlyInterpolatedMapping::new(2.0).is_err());
        assert!(CubicallyInterpolatedMapping::new(-1.0).is_err());
    }
}
