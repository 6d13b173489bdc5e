//! Quantile sketching with relative-error guarantees.
//!
//! This crate provides [`DDSketch`], a quantile sketch that computes quantile values with an
//! approximation error relative to the actual quantile value, on both negative and non-negative
//! input. Sketches built independently over different parts of a stream can be merged without
//! losing the accuracy guarantee.
//!
//! # Quick Start
//!
//! ```
//! use quantile_sketch::DDSketch;
//!
//! // Create a sketch with 1% relative accuracy.
//! let mut sketch = DDSketch::new(0.01).unwrap();
//!
//! sketch.add(1.5);
//! sketch.add(2.5);
//! sketch.add(3.5);
//!
//! let p50 = sketch.get_quantile_value(0.5);
//! let p99 = sketch.get_quantile_value(0.99);
//! # assert!(p50 <= p99);
//! ```
//!
//! # Store Types
//!
//! The sketch is generic over the store holding the bin counts:
//!
//! - [`DenseStore`]: unbounded dense storage, used by [`DDSketch::new`]. Best when memory is
//!   not a concern.
//! - [`CollapsingLowestDenseStore`]: bounded, collapses the lowest bins when the limit is
//!   reached. Best when higher quantiles (p95, p99) matter most.
//! - [`CollapsingHighestDenseStore`]: bounded, collapses the highest bins. Best when lower
//!   quantiles matter most.
//!
//! # Key Mappings
//!
//! The sketch is also generic over how values are mapped to bins, trading per-insert compute
//! cost against bin density:
//!
//! - [`LogarithmicMapping`]: exact logarithm, memory-optimal. The default.
//! - [`LinearlyInterpolatedMapping`]: no logarithm at all, coarsest bins.
//! - [`CubicallyInterpolatedMapping`]: no logarithm, nearly memory-optimal.
//!
//! Mappings and stores combine through [`DDSketch::from_parts`].
//!
//! # Feature Flags
//!
//! - `serde`: Enables serialization/deserialization of sketches, stores, and mappings.
//!   **Warning**: The serialization format is not guaranteed to be stable.

#![deny(warnings)]
#![deny(missing_docs)]

pub mod mapping;
pub mod store;

mod error;
mod sketch;

pub use self::error::SketchError;
pub use self::mapping::{
    CubicallyInterpolatedMapping, KeyMapping, LinearlyInterpolatedMapping, LogarithmicMapping,
};
pub use self::sketch::DDSketch;
pub use self::store::{
    BinList, CollapsingHighestDenseStore, CollapsingLowestDenseStore, DenseStore, Store,
};
