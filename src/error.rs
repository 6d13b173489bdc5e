//! Error types for sketch construction and mutation.

use std::fmt;

/// Errors produced when constructing, feeding, or merging sketches.
#[derive(Debug, Clone, PartialEq)]
pub enum SketchError {
    /// An argument was outside its valid range.
    InvalidArgument {
        /// What the caller got wrong.
        reason: &'static str,
    },

    /// Two sketches with different mapping parameters cannot be merged.
    UnequalSketchParameters {
        /// The gamma value of the receiving sketch.
        expected: f64,
        /// The gamma value of the sketch passed to `merge`.
        actual: f64,
    },
}

impl fmt::Display for SketchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument { reason } => write!(f, "invalid argument: {}", reason),
            Self::UnequalSketchParameters { expected, actual } => {
                write!(
                    f,
                    "cannot merge sketches with different parameters: gamma {} vs {}",
                    expected, actual
                )
            }
        }
    }
}

impl std::error::Error for SketchError {}
