//! Errors raised while turning user text into an input tensor.

use thiserror::Error;

/// Every variant is terminal for the run that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    #[error("shape entries must be positive integers, e.g. 1,3,224,224 (got `{entry}`)")]
    InvalidShape { entry: String },

    #[error("an input shape is required, e.g. 1,3,224,224")]
    MissingShape,

    #[error("input data must be numbers, comma-separated or a JSON array (bad value at index {index}: `{value}`)")]
    InvalidData { index: usize, value: String },

    #[error("data length ({supplied}) must equal the product of the shape ({expected})")]
    ShapeMismatch { supplied: usize, expected: usize },

    #[error("unsupported dtype `{tag}` (expected float32 or int32)")]
    UnsupportedDType { tag: String },
}
