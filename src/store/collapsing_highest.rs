use super::{BinList, Store, CHUNK_SIZE};

/// A dense store that collapses the highest bins once a bin limit is reached.
///
/// The mirror image of [`CollapsingLowestDenseStore`](super::CollapsingLowestDenseStore): mass
/// that falls above the surviving window is folded into the highest remaining bin. Relative
/// accuracy is lost for the highest quantiles but preserved for the lowest ones.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CollapsingHighestDenseStore {
    bins: BinList,
    count: f64,
    min_key: i64,
    max_key: i64,
    chunk_size: i64,
    offset: i64,
    bin_limit: i64,
    is_collapsed: bool,
}

impl CollapsingHighestDenseStore {
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

    /// `true` once mass has been folded into the highest bin.
    ///
    /// When set, accuracy guarantees no longer hold for the highest quantiles.
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

    /// Re-fits the window to the given key range, collapsing the highest bins when the range no
    /// longer fits within the bin limit.
    fn adjust(&mut self, new_min_key: i64, new_max_key: i64) {
        if new_max_key - new_min_key + 1 > self.bins.len() as i64 {
            // The range of keys is too wide, so the highest bins have to go.
            let new_max_key = new_min_key + self.bins.len() as i64 - 1;

            if new_max_key <= self.min_key {
                // Everything currently tracked sits above the new window.
                self.offset = new_min_key;
                self.max_key = new_max_key;

                self.bins.initialize_with_zeros(self.bins.len());
                *self.bins.last_mut() = self.count;
            } else {
                let shift = self.offset - new_min_key;

                if shift > 0 {
                    let collapse_start_index = (new_max_key - self.offset + 1) as usize;
                    let collapse_end_index = (self.max_key - self.offset + 1) as usize;

                    let collapsed_count = self.bins.collapsed_count(collapse_start_index, collapse_end_index);
                    self.bins.replace_range_with_zeros(
                        collapse_start_index,
                        collapse_end_index,
                        (self.max_key - new_max_key) as usize,
                    );
                    self.bins[collapse_start_index - 1] += collapsed_count;

                    self.max_key = new_max_key;

                    // Shift the bins to make room for new_max_key.
                    self.shift_bins(shift);
                } else {
                    self.max_key = new_max_key;

                    // Shift the bins to make room for new_min_key.
                    self.shift_bins(shift);
                }
            }

            self.min_key = new_min_key;
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
    /// Once the store has collapsed, keys above the surviving window land in the highest bin.
    fn get_index(&mut self, key: i64) -> usize {
        if key > self.max_key {
            if self.is_collapsed {
                return self.bins.len() - 1;
            }

            self.extend_range(key, key);

            if self.is_collapsed {
                return self.bins.len() - 1;
            }
        } else if key < self.min_key {
            self.extend_range(key, key);
        }

        (key - self.offset) as usize
    }
}

impl Store for CollapsingHighestDenseStore {
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

        // Bins of the other store that sit above our surviving window fold into the highest bin.
        let collapse_end_idx = other.max_key - other.offset + 1;
        let mut collapse_start_idx = (self.max_key + 1).max(other.min_key) - other.offset;

        if collapse_end_idx > collapse_start_idx {
            let collapsed_count = other
                .bins
                .collapsed_count(collapse_start_idx as usize, collapse_end_idx as usize);
            *self.bins.last_mut() += collapsed_count;
        } else {
            collapse_start_idx = collapse_end_idx;
        }

        for key in other.min_key..(collapse_start_idx + other.offset) {
            self.bins[(key - self.offset) as usize] += other.bins[(key - other.offset) as usize];
        }

        self.count += other.count;
    }
}

impl Default for CollapsingHighestDenseStore {
    /// Creates a collapsing highest dense store with a limit of 2048 bins.
    fn default() -> Self {
        Self::new(2048)
    }
}
