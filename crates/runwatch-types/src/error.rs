use thiserror::Error;

/// Result type for runwatch-types operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the types layer
#[derive(Debug, Error)]
pub enum Error {
    /// Output line arrived without the ordinal used for ordering and dedup
    #[error("Output line without ordinal: {preview:?}")]
    MissingOrdinal { preview: String },

    /// Instance ID pattern could not be compiled
    #[error("Invalid instance pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}
