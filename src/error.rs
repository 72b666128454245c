//! Error types for G-code processing.

use thiserror::Error;

/// Broad category of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input text. The offending line is dropped.
    Parse,
    /// Geometrically unusable motion. The offending primitive is skipped.
    Geometry,
    /// Missing or invalid settings. Fatal for the command-line tool.
    Configuration,
}

/// Main error type for the library.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GcodeError {
    #[error("Invalid numeric value at column {column}: '{token}'")]
    InvalidNumber { column: usize, token: String },

    #[error("Unexpected character '{found}' at column {column}")]
    UnexpectedCharacter { column: usize, found: char },

    #[error("Unbalanced comment: ')' without '(' at column {column}")]
    UnbalancedComment { column: usize },

    #[error("Degenerate arc from ({x1}, {y1}) to ({x2}, {y2}): no usable centre")]
    DegenerateArc { x1: f64, y1: f64, x2: f64, y2: f64 },

    #[error("Arc start point is unknown: no X/Y position has been established")]
    UnknownStartPoint,

    #[error("Radius-format arc (R{radius}) cannot be corrected")]
    RadiusFormatArc { radius: f64 },

    #[error("No value specified for option '{name}'")]
    MissingOption { name: String },

    #[error("Invalid settings: {message}")]
    InvalidSettings { message: String },

    #[error("Invalid {name}: {value} (must be greater than zero)")]
    InvalidDimension { name: String, value: f64 },
}

impl GcodeError {
    /// Get the category for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            GcodeError::InvalidNumber { .. } => ErrorKind::Parse,
            GcodeError::UnexpectedCharacter { .. } => ErrorKind::Parse,
            GcodeError::UnbalancedComment { .. } => ErrorKind::Parse,
            GcodeError::DegenerateArc { .. } => ErrorKind::Geometry,
            GcodeError::UnknownStartPoint => ErrorKind::Geometry,
            GcodeError::RadiusFormatArc { .. } => ErrorKind::Geometry,
            GcodeError::MissingOption { .. } => ErrorKind::Configuration,
            GcodeError::InvalidSettings { .. } => ErrorKind::Configuration,
            GcodeError::InvalidDimension { .. } => ErrorKind::Configuration,
        }
    }

    /// Whether processing may continue after this error.
    pub fn is_recoverable(&self) -> bool {
        self.kind() != ErrorKind::Configuration
    }
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, GcodeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let err = GcodeError::InvalidNumber {
            column: 4,
            token: "X".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert!(err.is_recoverable());

        assert_eq!(GcodeError::UnknownStartPoint.kind(), ErrorKind::Geometry);

        let err = GcodeError::MissingOption {
            name: "step".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(!err.is_recoverable());
        assert_eq!(err.to_string(), "No value specified for option 'step'");
    }
}
