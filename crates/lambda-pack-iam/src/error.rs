//! Error types for the policy codec.

use serde_json::error::Category;

/// Errors produced while encoding or decoding policy JSON.
#[derive(Debug, thiserror::Error)]
pub enum IamError {
    /// Input was not valid JSON, or the output writer failed.
    #[error("malformed policy JSON: {0}")]
    Malformed(#[source] serde_json::Error),

    /// Input was valid JSON but matched none of the accepted shapes.
    #[error("policy JSON shape mismatch: {0}")]
    Shape(#[source] serde_json::Error),
}

impl IamError {
    /// Returns true when the JSON parsed but had the wrong shape.
    pub fn is_shape_mismatch(&self) -> bool {
        matches!(self, Self::Shape(_))
    }
}

impl From<serde_json::Error> for IamError {
    fn from(err: serde_json::Error) -> Self {
        match err.classify() {
            Category::Data => Self::Shape(err),
            Category::Io | Category::Syntax | Category::Eof => Self::Malformed(err),
        }
    }
}
