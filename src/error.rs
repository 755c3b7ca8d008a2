use thiserror::Error;

/// Errors raised by the registration core.
///
/// All of them are raised at the point of detection and propagate through
/// the optimization loop unchanged.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistrationError {
    /// Parameter vector length does not match the transform kind, or a
    /// numeric argument is outside its valid domain.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Image with zero intensity variance.
    #[error("Degenerate image: {0}")]
    DegenerateImage(String),

    /// Arrays with incompatible dimensions.
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Unknown task, transform, measure or interpolation name.
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

/// Result type for registration operations.
pub type Result<T> = std::result::Result<T, RegistrationError>;

impl RegistrationError {
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    pub fn degenerate_image(msg: impl Into<String>) -> Self {
        Self::DegenerateImage(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn shape_mismatch(expected: &[usize], actual: &[usize]) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }
}
