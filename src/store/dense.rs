use super::{BinList, Store, CHUNK_SIZE};

/// An unbounded dense store.
///
/// Keeps every bin between the bin for the lowest key and the bin for the highest key added so
/// far. Bins are allocated a chunk at a time and the occupied window is kept centered within the
/// allocation, so the store absorbs drift in either direction without reallocating.
///
/// The number of bins stays small unless the data is spread over many orders of magnitude; for
/// heavy-tailed data that must stay bounded, use one of the collapsing stores instead.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct DenseStore {
    bins: BinList,
    count: f64,
    min_key: i64,
    max_key: i64,
    chunk_size: i64,
    offset: i64,
}

impl DenseStore {
    /// Creates an empty `DenseStore`.
    pub fn new() -> Self {
        Self::with_chunk_size(CHUNK_SIZE)
    }

    /// Creates an empty `DenseStore` growing by the given number of bins at a time.
    ///
    /// # Panics
    ///
    /// Panics if `chunk_size` is not positive.
    pub fn with_chunk_size(chunk_size: i64) -> Self {
        assert!(chunk_size > 0, "chunk_size must be positive");

        Self {
            bins: BinList::new(),
            count: 0.0,
            min_key: i64::MAX,
            max_key: i64::MIN,
            chunk_size,
            offset: 0,
        }
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
    }

    fn get_new_length(&self, new_min_key: i64, new_max_key: i64) -> usize {
        let desired_length = new_max_key - new_min_key + 1;
        (self.chunk_size * ((desired_length + self.chunk_size - 1) / self.chunk_size)) as usize
    }

    /// Re-fits the window to the given key range without resizing the bins.
    fn adjust(&mut self, new_min_key: i64, new_max_key: i64) {
        self.center_bins(new_min_key, new_max_key);

        self.min_key = new_min_key;
        self.max_key = new_max_key;
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
    fn get_index(&mut self, key: i64) -> usize {
        if key < self.min_key || key > self.max_key {
            self.extend_range(key, key);
        }

        (key - self.offset) as usize
    }
}

impl Store for DenseStore {
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

        for key in other.min_key..=other.max_key {
            self.bins[(key - self.offset) as usize] += other.bins[(key - other.offset) as usize];
        }

        self.count += other.count;
    }
}

impl Default for DenseStore {
    fn default() -> Self {
        Self::new()
    }
}
