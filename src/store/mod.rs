//! Bin stores for mapped observations.
//!
//! A store keeps the weight counted against each bin key. The unbounded [`DenseStore`] keeps
//! every bin between the lowest and highest key it has seen; the collapsing variants put a hard
//! bound on the number of bins by folding out-of-range mass into the surviving extreme bin:
//!
//! - [`CollapsingLowestDenseStore`]: collapses the lowest bins. Best when the high quantiles
//!   (p95, p99) matter most, e.g. latencies.
//! - [`CollapsingHighestDenseStore`]: collapses the highest bins. Best when the low quantiles
//!   matter most.

mod bins;
pub use self::bins::BinList;

mod collapsing_highest;
pub use self::collapsing_highest::CollapsingHighestDenseStore;

mod collapsing_lowest;
pub use self::collapsing_lowest::CollapsingLowestDenseStore;

mod dense;
pub use self::dense::DenseStore;

/// The number of bins stores grow by.
pub(crate) const CHUNK_SIZE: i64 = 128;

/// Storage for weighted observations, bucketed by bin key.
pub trait Store: Clone + Send + Sync {
    /// Adds `weight` to the bin at the given key, growing the store if necessary.
    fn add(&mut self, key: i64, weight: f64);

    /// The total weight across all bins.
    fn total_count(&self) -> f64;

    /// `true` if no weight has been added to the store.
    fn is_empty(&self) -> bool;

    /// Returns the key for the value at the given rank.
    ///
    /// With non-zero bins `[1, 1]` for keys `a`, `b`:
    ///
    /// - `lower == true`: `key_at_rank(r) == a` for r in `[0, 1)` and `b` for r in `[1, 2)`.
    /// - `lower == false`: `key_at_rank(r) == a` for r in `(-1, 0]` and `b` for r in `(0, 1]`.
    ///
    /// If the rank is at or past the total count, the highest tracked key is returned.
    fn key_at_rank(&self, rank: f64, lower: bool) -> i64;

    /// Merges another store into this one.
    ///
    /// This is equivalent to replaying every `add` the other store has seen onto this one. The
    /// other store is left untouched.
    fn merge(&mut self, other: &Self);
}
