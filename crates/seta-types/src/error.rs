//! Validation errors for untrusted input.
//!
//! Identifiers double as directory names in the shot store, so anything
//! that could escape or confuse a path is rejected here, before any I/O.

/// Reasons an identifier or shot payload is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A required field was absent or empty.
    #[error("missing required field: {0}")]
    Missing(&'static str),

    /// An identifier contained a path separator.
    #[error("{field} must not contain path separators")]
    Separator {
        /// Name of the offending field.
        field: &'static str,
    },

    /// An identifier contained `..` or started with a dot.
    #[error("{field} must not contain `..` or start with `.`")]
    Traversal {
        /// Name of the offending field.
        field: &'static str,
    },

    /// An identifier contained a control character.
    #[error("{field} must not contain control characters")]
    ControlCharacter {
        /// Name of the offending field.
        field: &'static str,
    },

    /// An identifier exceeded [`crate::ids::MAX_ID_LEN`] bytes.
    #[error("{field} exceeds {max} bytes")]
    TooLong {
        /// Name of the offending field.
        field: &'static str,
        /// The maximum allowed length in bytes.
        max: usize,
    },

    /// A coordinate was NaN or infinite.
    #[error("shot_data.{0} must be a finite number")]
    NonFinite(&'static str),

    /// The request body could not be decoded.
    #[error("malformed request: {0}")]
    Malformed(String),
}
