//! The counter sequence backing the dense stores.

use std::collections::VecDeque;
use std::ops::{Index, IndexMut};

/// An ordered sequence of bin counters addressed by a contiguous window.
///
/// Stores lay their bins out in this list and shift the window over it as the key range moves,
/// so the list has to grow and shrink cheaply at both ends. Counters are never negative; that
/// invariant is maintained by the callers, not enforced here.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct BinList {
    data: VecDeque<f64>,
}

impl BinList {
    /// Creates an empty `BinList`.
    pub fn new() -> Self {
        Self { data: VecDeque::new() }
    }

    /// Creates a `BinList` holding the given number of zeroed counters.
    pub fn with_zeros(len: usize) -> Self {
        Self {
            data: VecDeque::from(vec![0.0; len]),
        }
    }

    /// The number of counters.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// `true` if the list holds no counters at all.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The sum of all counters.
    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }

    /// `true` if every counter is zero.
    pub fn has_only_zeros(&self) -> bool {
        self.data.iter().all(|&count| count == 0.0)
    }

    /// The sum of the counters in `[start, end)`.
    ///
    /// # Panics
    ///
    /// Panics if the range is inverted or either endpoint is past the end of the list.
    pub fn collapsed_count(&self, start: usize, end: usize) -> f64 {
        assert!(
            start <= end && end <= self.data.len(),
            "bin range {}..{} out of bounds for length {}",
            start,
            end,
            self.data.len()
        );

        self.data.range(start..end).sum()
    }

    /// A mutable reference to the first counter. The list must be non-empty.
    pub fn first_mut(&mut self) -> &mut f64 {
        self.data.front_mut().expect("bins must not be empty")
    }

    /// A mutable reference to the last counter. The list must be non-empty.
    pub fn last_mut(&mut self) -> &mut f64 {
        self.data.back_mut().expect("bins must not be empty")
    }

    /// Replaces the contents with the given number of zeroed counters.
    pub fn initialize_with_zeros(&mut self, num_zeros: usize) {
        self.data.clear();
        self.data.resize(num_zeros, 0.0);
    }

    /// Prepends the given number of zeroed counters.
    pub fn extend_front_with_zeros(&mut self, count: usize) {
        self.data.reserve(count);
        for _ in 0..count {
            self.data.push_front(0.0);
        }
    }

    /// Appends the given number of zeroed counters.
    pub fn extend_back_with_zeros(&mut self, count: usize) {
        self.data.resize(self.data.len() + count, 0.0);
    }

    /// Drops the given number of counters from the front.
    ///
    /// # Panics
    ///
    /// Panics if `count` exceeds the current length.
    pub fn remove_leading(&mut self, count: usize) {
        assert!(
            count <= self.data.len(),
            "cannot remove {} leading bins from {}",
            count,
            self.data.len()
        );

        self.data.drain(..count);
    }

    /// Drops the given number of counters from the back.
    ///
    /// # Panics
    ///
    /// Panics if `count` exceeds the current length.
    pub fn remove_trailing(&mut self, count: usize) {
        assert!(
            count <= self.data.len(),
            "cannot remove {} trailing bins from {}",
            count,
            self.data.len()
        );

        self.data.truncate(self.data.len() - count);
    }

    /// Erases the counters in `[start, end)` and inserts the given number of zeros at `start`.
    pub fn replace_range_with_zeros(&mut self, start: usize, end: usize, num_zeros: usize) {
        self.data.drain(start..end);
        for _ in 0..num_zeros {
            self.data.insert(start, 0.0);
        }
    }

    /// Iterates over the counters in storage order.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.data.iter().copied()
    }
}

impl Index<usize> for BinList {
    type Output = f64;

    fn index(&self, idx: usize) -> &f64 {
        &self.data[idx]
    }
}

impl IndexMut<usize> for BinList {
    fn index_mut(&mut self, idx: usize) -> &mut f64 {
        &mut self.data[idx]
    }
}
