//! Error type shared by every denoising operation.

use thiserror::Error;

/// Failure modes of the denoising operations.
///
/// Errors are reported at the offending call and no partial output is
/// returned alongside them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DenoiseError {
    /// A parameter is out of range (non-positive weight, sigma or iteration
    /// count) or names an unsupported mode or color-space conversion.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The image has a zero dimension, an unsupported channel count, or does
    /// not match the shape of a second image.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// NaN or infinity appeared in the input or in an intermediate result.
    #[error("numerical instability: {0}")]
    NumericalInstability(String),
}

pub type Result<T> = std::result::Result<T, DenoiseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_kind_and_detail() {
        let err = DenoiseError::InvalidParameter("weight must be > 0".to_string());
        assert_eq!(err.to_string(), "invalid parameter: weight must be > 0");

        let err = DenoiseError::ShapeMismatch("2 channels".to_string());
        assert!(err.to_string().starts_with("shape mismatch"));
    }
}
