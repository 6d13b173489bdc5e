use super::{BinList, Store, CHUNK_SIZE};

/// A dense store that collapses the lowest bins once a bin limit is reached.
///
/// Behaves like [`DenseStore`](super::DenseStore) until the key range would need more than
/// `bin_limit` bins; from then on, mass that falls below the surviving window is folded into
/// the lowest remaining bin. Relative accuracy is lost for the lowest quantiles but preserved
/// for the highest ones, which makes this the right bound for latency-style data where the
/// tail matters most.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CollapsingLowestDenseStore {
    bins: BinList,
    count: f64,
    min_key: i64,
    max_key: i64,
    chunk_size: i64,
    offset: i64,
    bin_limit: i64,
    is_collapsed: bool,
}

impl CollapsingLowestDenseStore {
    /// Creates an empty store with the given maximum number of bins.
    ///
    /// # Panics
    ///
    /// Panics if `bin_limit` is not positive.
    pub fn new(bin_limit: i64) -> Self {
        Self::with_chunk_size(bin_limit, CHUNK_SIZE)
    }

    /// Creates an empty store with the given bin limit and growth granularity.
    ///
    /// # Panics
    ///
    /// Panics if `bin_limit` or `chunk_size` is not positive.
    pub fn with_chunk_size(bin_limit: i64, chunk_size: i64) -> Self {
        assert!(bin_limit > 0, "bin_limit must be positive");
        assert!(chunk_size > 0, "chunk_size must be positive");

        Self {
            bins: BinList::new(),
            count: 0.0,
            min_key: i64::MAX,
            max_key: i64::MIN,
            chunk_size,
            offset: 0,
            bin_limit,
            is_collapsed: false,
        }
    }

    /// The maximum number of bins this store will hold.
    pub fn bin_limit(&self) -> i64 {
        self.bin_limit
    }

    /// `true` once mass has been folded into the lowest bin.
    ///
    /// When set, accuracy guarantees no longer hold for the lowest quantiles.
    pub fn is_collapsed(&self) -> bool {
        self.is_collapsed
    }

    /// The bin counters in storage order.
    pub fn bins(&self) -> &BinList {
        &self.bins
    }

    /// The key corresponding to storage index 0.
    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// The number of allocated bins.
    pub fn length(&self) -> usize {
        self.bins.len()
    }

    /// The lowest key with recorded weight. Meaningless until weight has been added.
    pub fn min_key(&self) -> i64 {
        self.min_key
    }

    /// The highest key with recorded weight. Meaningless until weight has been added.
    pub fn max_key(&self) -> i64 {
        self.max_key
    }

    /// Replaces this store's contents with a copy of `other`.
    fn copy_from(&mut self, other: &Self) {
        self.count = other.count;
        self.min_key = other.min_key;
        self.max_key = other.max_key;
        self.offset = other.offset;
        self.bins = other.bins.clone();
        self.bin_limit = other.bin_limit;
        self.is_collapsed = other.is_collapsed;
    }

    fn get_new_length(&self, new_min_key: i64, new_max_key: i64) -> usize {
        let desired_length = new_max_key - new_min_key + 1;
        (self.chunk_size * ((desired_length + self.chunk_size - 1) / self.chunk_size)).min(self.bin_limit) as usize
    }

    /// Re-fits the window to the given key range, collapsing the lowest bins when the range no
    /// longer fits within the bin limit.
    fn adjust(&mut self, new_min_key: i64, new_max_key: i64) {
        if new_max_key - new_min_key + 1 > self.bins.len() as i64 {
            // The range of keys is too wide, so the lowest bins have to go.
            let new_min_key = new_max_key - self.bins.len() as i64 + 1;

            if new_min_key >= self.max_key {
                // Everything currently tracked sits below the new window.
                self.offset = new_min_key;
                self.min_key = new_min_key;

                self.bins.initialize_with_zeros(self.bins.len());
                *self.bins.first_mut() = self.count;
            } else {
                let shift = self.offset - new_min_key;

                if shift < 0 {
                    let collapse_start_index = (self.min_key - self.offset) as usize;
                    let collapse_end_index = (new_min_key - self.offset) as usize;

                    let collapsed_count = self.bins.collapsed_count(collapse_start_index, collapse_end_index);
                    self.bins.replace_range_with_zeros(
                        collapse_start_index,
                        collapse_end_index,
                        (new_min_key - self.min_key) as usize,
                    );
                    self.bins[collapse_end_index] += collapsed_count;

                    self.min_key = new_min_key;

                    // Shift the bins to make room for new_max_key.
                    self.shift_bins(shift);
                } else {
                    self.min_key = new_min_key;

                    // Shift the bins to make room for new_min_key.
                    self.shift_bins(shift);
                }
            }

            self.max_key = new_max_key;
            self.is_collapsed = true;
        } else {
            self.center_bins(new_min_key, new_max_key);

            self.min_key = new_min_key;
            self.max_key = new_max_key;
        }
    }

    /// Shifts the bins within the allocation; this changes the offset.
    fn shift_bins(&mut self, shift: i64) {
        if shift > 0 {
            self.bins.remove_trailing(shift as usize);
            self.bins.extend_front_with_zeros(shift as usize);
        } else {
            let abs_shift = shift.unsigned_abs() as usize;
            self.bins.remove_leading(abs_shift);
            self.bins.extend_back_with_zeros(abs_shift);
        }

        self.offset -= shift;
    }

    /// Centers the given key range within the allocated bins.
    fn center_bins(&mut self, new_min_key: i64, new_max_key: i64) {
        let middle_key = new_min_key + (new_max_key - new_min_key + 1) / 2;

        self.shift_bins(self.offset + self.bins.len() as i64 / 2 - middle_key);
    }

    /// Grows the bins as necessary to cover both keys, then re-fits the window.
    fn extend_range(&mut self, key: i64, second_key: i64) {
        let new_min_key = key.min(second_key).min(self.min_key);
        let new_max_key = key.max(second_key).max(self.max_key);

        if self.bins.is_empty() {
            let new_length = self.get_new_length(new_min_key, new_max_key);
            self.bins.initialize_with_zeros(new_length);
            self.offset = new_min_key;
            self.adjust(new_min_key, new_max_key);
        } else if new_min_key >= self.min_key && new_max_key < self.offset + self.bins.len() as i64 {
            // The allocation already covers the range; only the tracked extrema move.
            self.min_key = new_min_key;
            self.max_key = new_max_key;
        } else {
            let new_length = self.get_new_length(new_min_key, new_max_key);
            if new_length > self.bins.len() {
                self.bins.extend_back_with_zeros(new_length - self.bins.len());
            }
            self.adjust(new_min_key, new_max_key);
        }
    }

    /// The storage index for the key, extending the range if necessary.
    ///
    /// Once the store has collapsed, keys below the surviving window land in the lowest bin.
    fn get_index(&mut self, key: i64) -> usize {
        if key < self.min_key {
            if self.is_collapsed {
                return 0;
            }

            self.extend_range(key, key);

            if self.is_collapsed {
                return 0;
            }
        } else if key > self.max_key {
            self.extend_range(key, key);
        }

        (key - self.offset) as usize
    }
}

impl Store for CollapsingLowestDenseStore {
    fn add(&mut self, key: i64, weight: f64) {
        let idx = self.get_index(key);

        self.bins[idx] += weight;
        self.count += weight;
    }

    fn total_count(&self) -> f64 {
        self.count
    }

    fn is_empty(&self) -> bool {
        self.count == 0.0
    }

    fn key_at_rank(&self, rank: f64, lower: bool) -> i64 {
        let mut running_count = 0.0;

        for (idx, bin_count) in self.bins.iter().enumerate() {
            running_count += bin_count;
            if (lower && running_count > rank) || (!lower && running_count >= rank + 1.0) {
                return idx as i64 + self.offset;
            }
        }

        self.max_key
    }

    fn merge(&mut self, other: &Self) {
        if other.count == 0.0 {
            return;
        }

        if self.count == 0.0 {
            self.copy_from(other);
            return;
        }

        if other.min_key < self.min_key || other.max_key > self.max_key {
            self.extend_range(other.min_key, other.max_key);
        }

        // Bins of the other store that sit below our surviving window fold into the lowest bin.
        let collapse_start_idx = other.min_key - other.offset;
        let mut collapse_end_idx = self.min_key.min(other.max_key + 1) - other.offset;

        if collapse_end_idx > collapse_start_idx {
            let collapsed_count = other
                .bins
                .collapsed_count(collapse_start_idx as usize, collapse_end_idx as usize);
            *self.bins.first_mut() += collapsed_count;
        } else {
            collapse_end_idx = collapse_start_idx;
        }

        for key in (collapse_end_idx + other.offset)..=other.max_key {
            self.bins[(key - self.offset) as usize] += other.bins[(key - other.offset) as usize];
        }

        self.count += other.count;
    }
}

impl Default for CollapsingLowestDenseStore {
    /// Creates a collapsing lowest dense store with a limit of 2048 bins.
    fn default() -> Self {
        Self::new(2048)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_within_limit_behaves_dense() {
        let mut store = CollapsingLowestDenseStore::new(1000);
        for key in 0..10 {
            store.add(key, 1.0);
        }

        assert_eq!(store.total_count(), 10.0);
        assert_eq!(store.bins().sum(), 10.0);
        assert!(!store.is_collapsed());
        assert_eq!(store.min_key(), 0);
        assert_eq!(store.max_key(), 9);
    }

    #[test]
    fn test_collapse_on_wide_range() {
        let mut store = CollapsingLowestDenseStore::new(20);
        for key in 0..100 {
            store.add(key, 1.0);
        }

        assert!(store.is_collapsed());
        assert_eq!(store.total_count(), 100.0);
        assert_eq!(store.bins().sum(), 100.0);
        assert!(store.length() <= 20);
        assert_eq!(store.max_key(), 99);

        // Keys below the surviving window fold into the lowest bin.
        let lowest_surviving = 99 - store.bin_limit() + 1;
        assert_eq!(store.min_key(), lowest_surviving);
        assert_eq!(store.bins()[0], (lowest_surviving + 1) as f64);
    }

    #[test]
    fn test_single_bin_swallows_everything() {
        let mut store = CollapsingLowestDenseStore::new(1);
        store.add(-10000, 1.0);
        store.add(10000, 1.0);
        store.add(0, 1.0);

        assert_eq!(store.length(), 1);
        assert_eq!(store.bins().sum(), 3.0);
        assert_eq!(store.total_count(), 3.0);
    }

    #[test]
    fn test_low_keys_after_collapse_land_in_lowest_bin() {
        let mut store = CollapsingLowestDenseStore::new(5);
        for key in 0..10 {
            store.add(key, 1.0);
        }
        assert!(store.is_collapsed());

        let before = store.bins()[0];
        store.add(-100, 2.0);

        assert_eq!(store.bins()[0], before + 2.0);
        assert_eq!(store.total_count(), 12.0);
    }

    #[test]
    fn test_merge_collapses_other_low_bins() {
        let mut store = CollapsingLowestDenseStore::new(5);
        for key in 10..15 {
            store.add(key, 1.0);
        }

        let mut other = CollapsingLowestDenseStore::new(5);
        for key in 0..5 {
            other.add(key, 1.0);
        }

        store.merge(&other);

        assert_eq!(store.total_count(), 10.0);
        assert_eq!(store.bins().sum(), 10.0);
        // All of other's mass was below our window.
        assert_eq!(store.bins()[0], 6.0);
        assert_eq!(other.total_count(), 5.0);
    }

    #[test]
    fn test_merge_into_empty_copies() {
        let mut source = CollapsingLowestDenseStore::new(10);
        for key in 0..20 {
            source.add(key, 1.0);
        }

        let mut store = CollapsingLowestDenseStore::new(10);
        store.merge(&source);

        assert!(store.is_collapsed());
        assert_eq!(store.total_count(), 20.0);
        assert_eq!(store.bins().sum(), 20.0);
    }
}
