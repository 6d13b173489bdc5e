//! The sketch composing a key mapping with a pair of stores.

use float_cmp::ApproxEqRatio as _;

use crate::error::SketchError;
use crate::mapping::{KeyMapping, LogarithmicMapping};
use crate::store::{CollapsingHighestDenseStore, CollapsingLowestDenseStore, DenseStore, Store};

/// The bin limit used when a caller passes a non-positive one.
const DEFAULT_BIN_LIMIT: i64 = 2048;

fn adjust_bin_limit(bin_limit: i64) -> i64 {
    if bin_limit <= 0 {
        DEFAULT_BIN_LIMIT
    } else {
        bin_limit
    }
}

/// Compares two summary statistics for equality.
///
/// Sketches holding the same values can end up with statistics that differ in the last few bits
/// depending on the order the values were accumulated in, so beyond bitwise equality (which
/// also covers the infinity sentinels of an empty sketch) the smaller statistic may deviate
/// from the larger by up to one part in 10^9. NaN statistics compare equal.
fn stats_eq(left: f64, right: f64) -> bool {
    const MAX_DEVIATION_RATIO: f64 = 1.0e-9;

    left == right
        || (left.is_nan() && right.is_nan())
        || left.approx_eq_ratio(&right, MAX_DEVIATION_RATIO)
}

/// A fast and fully-mergeable quantile sketch with relative-error guarantees.
///
/// The sketch computes quantile values with an approximation error relative to the actual
/// quantile value: with a relative accuracy of 1%, if the expected quantile value is 100, the
/// computed value is guaranteed to be between 99 and 101. It works on negative, zero, and
/// positive input values, which are tracked by a negative store, a dedicated zero counter, and
/// a positive store respectively.
///
/// The memory footprint depends on the range covered by the input values: the wider that range,
/// the more bins are needed. The collapsing constructors put a fail-safe upper bound on the bin
/// count; as shown in <https://www.vldb.org/pvldb/vol12/p2195-masson.pdf>, the likelihood of a
/// store collapsing at the default bound is vanishingly small for most data.
///
/// # Example
///
/// ```
/// use quantile_sketch::DDSketch;
///
/// let mut sketch = DDSketch::new(0.01).unwrap();
/// sketch.add(1.0);
/// sketch.add(2.0);
/// sketch.add(3.0);
///
/// let median = sketch.get_quantile_value(0.5);
/// assert!((median - 2.0).abs() <= 0.01 * 2.0);
/// ```
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct DDSketch<M: KeyMapping = LogarithmicMapping, S: Store = DenseStore> {
    /// Maps values to bin keys and back.
    mapping: M,

    /// Store for positive values.
    store: S,

    /// Store for negative values, keyed by absolute value.
    negative_store: S,

    /// The total weight of values indistinguishable from zero.
    zero_count: f64,

    /// The total weight seen by the sketch.
    count: f64,

    /// The minimum value seen by the sketch.
    min: f64,

    /// The maximum value seen by the sketch.
    max: f64,

    /// The weighted sum of the values seen by the sketch.
    sum: f64,
}

impl DDSketch<LogarithmicMapping, DenseStore> {
    /// Creates a sketch with the given relative accuracy, using the logarithmic mapping and
    /// unbounded dense stores.
    ///
    /// The number of bins will not exceed a reasonable number unless the data is distributed
    /// with tails heavier than any subexponential.
    ///
    /// # Errors
    ///
    /// If the relative accuracy is not between 0 and 1 (exclusive), an error is returned.
    pub fn new(relative_accuracy: f64) -> Result<Self, SketchError> {
        let mapping = LogarithmicMapping::new(relative_accuracy)?;
        Ok(Self::from_parts(mapping, DenseStore::new(), DenseStore::new()))
    }
}

impl DDSketch<LogarithmicMapping, CollapsingLowestDenseStore> {
    /// Creates a sketch with the given relative accuracy whose stores hold at most `bin_limit`
    /// bins, collapsing the lowest bins when the limit is reached.
    ///
    /// Collapsing sacrifices accuracy for the lowest quantiles to keep memory bounded. A
    /// non-positive `bin_limit` is replaced with the default of 2048.
    ///
    /// # Errors
    ///
    /// If the relative accuracy is not between 0 and 1 (exclusive), an error is returned.
    pub fn with_collapsing_lowest(relative_accuracy: f64, bin_limit: i64) -> Result<Self, SketchError> {
        let mapping = LogarithmicMapping::new(relative_accuracy)?;
        let bin_limit = adjust_bin_limit(bin_limit);
        Ok(Self::from_parts(
            mapping,
            CollapsingLowestDenseStore::new(bin_limit),
            CollapsingLowestDenseStore::new(bin_limit),
        ))
    }
}

impl DDSketch<LogarithmicMapping, CollapsingHighestDenseStore> {
    /// Creates a sketch with the given relative accuracy whose stores hold at most `bin_limit`
    /// bins, collapsing the highest bins when the limit is reached.
    ///
    /// Collapsing sacrifices accuracy for the highest quantiles to keep memory bounded. A
    /// non-positive `bin_limit` is replaced with the default of 2048.
    ///
    /// # Errors
    ///
    /// If the relative accuracy is not between 0 and 1 (exclusive), an error is returned.
    pub fn with_collapsing_highest(relative_accuracy: f64, bin_limit: i64) -> Result<Self, SketchError> {
        let mapping = LogarithmicMapping::new(relative_accuracy)?;
        let bin_limit = adjust_bin_limit(bin_limit);
        Ok(Self::from_parts(
            mapping,
            CollapsingHighestDenseStore::new(bin_limit),
            CollapsingHighestDenseStore::new(bin_limit),
        ))
    }
}

impl<M: KeyMapping, S: Store> DDSketch<M, S> {
    /// Creates a sketch from a mapping and a pair of stores.
    ///
    /// This is the escape hatch for combinations the named constructors do not cover, such as
    /// an interpolated mapping over collapsing stores. Both stores must be freshly created.
    pub fn from_parts(mapping: M, store: S, negative_store: S) -> Self {
        Self {
            mapping,
            store,
            negative_store,
            zero_count: 0.0,
            count: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            sum: 0.0,
        }
    }

    /// Adds a value to the sketch with a weight of one.
    pub fn add(&mut self, value: f64) {
        self.insert(value, 1.0);
    }

    /// Adds a value to the sketch with the given weight.
    ///
    /// This is useful for pre-aggregated data, and the weight does not need to be integral.
    ///
    /// # Errors
    ///
    /// If the weight is not positive, an error is returned and the sketch is unchanged.
    pub fn add_weighted(&mut self, value: f64, weight: f64) -> Result<(), SketchError> {
        if weight <= 0.0 {
            return Err(SketchError::InvalidArgument {
                reason: "weight must be positive",
            });
        }

        self.insert(value, weight);

        Ok(())
    }

    fn insert(&mut self, value: f64, weight: f64) {
        if value > self.mapping.min_possible() {
            self.store.add(self.mapping.key(value), weight);
        } else if value < -self.mapping.min_possible() {
            self.negative_store.add(self.mapping.key(-value), weight);
        } else {
            self.zero_count += weight;
        }

        // Keep track of the summary stats.
        self.count += weight;
        self.sum += value * weight;

        if value < self.min {
            self.min = value;
        }

        if value > self.max {
            self.max = value;
        }
    }

    /// The approximate value at the given quantile.
    ///
    /// Returns NaN if the quantile is outside `[0, 1]` or the sketch is empty; this query never
    /// fails otherwise.
    pub fn get_quantile_value(&self, quantile: f64) -> f64 {
        if !(0.0..=1.0).contains(&quantile) || self.count == 0.0 {
            return f64::NAN;
        }

        let rank = quantile * (self.count - 1.0);
        let negative_count = self.negative_store.total_count();

        if rank < negative_count {
            // Negative values are keyed by absolute value, so their rank order is reversed.
            let reversed_rank = negative_count - rank - 1.0;
            let key = self.negative_store.key_at_rank(reversed_rank, false);
            -self.mapping.value(key)
        } else if rank < self.zero_count + negative_count {
            0.0
        } else {
            let key = self.store.key_at_rank(rank - self.zero_count - negative_count, true);
            self.mapping.value(key)
        }
    }

    /// Merges another sketch into this one.
    ///
    /// After this operation, this sketch encodes the values that were added to both sketches.
    /// The other sketch is left unchanged.
    ///
    /// # Errors
    ///
    /// If the two sketches do not have the same gamma, an error is returned and neither sketch
    /// is modified.
    pub fn merge(&mut self, other: &Self) -> Result<(), SketchError> {
        if !self.mergeable(other) {
            return Err(SketchError::UnequalSketchParameters {
                expected: self.mapping.gamma(),
                actual: other.mapping.gamma(),
            });
        }

        if other.count == 0.0 {
            return Ok(());
        }

        if self.count == 0.0 {
            self.copy_from(other);
            return Ok(());
        }

        // Merge the stores.
        self.store.merge(&other.store);
        self.negative_store.merge(&other.negative_store);
        self.zero_count += other.zero_count;

        // Merge the summary stats.
        self.count += other.count;
        self.sum += other.sum;

        if other.min < self.min {
            self.min = other.min;
        }

        if other.max > self.max {
            self.max = other.max;
        }

        Ok(())
    }

    /// `true` if the other sketch can be merged into this one, i.e. their gammas are equal.
    pub fn mergeable(&self, other: &Self) -> bool {
        self.mapping.gamma() == other.mapping.gamma()
    }

    fn copy_from(&mut self, other: &Self) {
        self.clone_from(other);
    }

    /// `true` if no values have been added to the sketch.
    pub fn is_empty(&self) -> bool {
        self.count == 0.0
    }

    /// The total weight of the values seen by the sketch.
    pub fn num_values(&self) -> f64 {
        self.count
    }

    /// The weighted sum of the values seen by the sketch.
    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// The weighted average of the values seen by the sketch.
    ///
    /// NaN when the sketch is empty.
    pub fn avg(&self) -> f64 {
        self.sum / self.count
    }

    /// The minimum value seen by the sketch, or `None` if it is empty.
    pub fn min(&self) -> Option<f64> {
        if self.is_empty() {
            None
        } else {
            Some(self.min)
        }
    }

    /// The maximum value seen by the sketch, or `None` if it is empty.
    pub fn max(&self) -> Option<f64> {
        if self.is_empty() {
            None
        } else {
            Some(self.max)
        }
    }

    /// The total weight of values indistinguishable from zero.
    pub fn zero_count(&self) -> f64 {
        self.zero_count
    }

    /// The relative accuracy guarantee of this sketch.
    pub fn relative_accuracy(&self) -> f64 {
        self.mapping.relative_accuracy()
    }

    /// A reference to the key mapping.
    pub fn mapping(&self) -> &M {
        &self.mapping
    }

    /// A reference to the positive value store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// A reference to the negative value store.
    pub fn negative_store(&self) -> &S {
        &self.negative_store
    }
}

impl<M: KeyMapping + PartialEq, S: Store + PartialEq> PartialEq for DDSketch<M, S> {
    fn eq(&self, other: &Self) -> bool {
        self.mapping == other.mapping
            && self.store == other.store
            && self.negative_store == other.negative_store
            && stats_eq(self.zero_count, other.zero_count)
            && stats_eq(self.count, other.count)
            && stats_eq(self.sum, other.sum)
            && stats_eq(self.min, other.min)
            && stats_eq(self.max, other.max)
    }
}

impl<M: KeyMapping + Default, S: Store + Default> Default for DDSketch<M, S> {
    fn default() -> Self {
        Self::from_parts(M::default(), S::default(), S::default())
    }
}
