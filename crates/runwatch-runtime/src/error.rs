use runwatch_types::InstanceId;
use thiserror::Error;

/// Result type for runwatch-runtime operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the runtime layer
#[derive(Debug, Error)]
pub enum Error {
    /// Initial snapshot or output tail fetch failed; the screen stays up and offers a retry
    #[error("Fetch failed for {instance}: {reason}")]
    TransientFetch { instance: InstanceId, reason: String },

    /// Provider signalled that event delivery stopped
    #[error("Subscription lost for {scope}: {reason}")]
    SubscriptionLost { scope: String, reason: String },

    /// Producer emitted an event that cannot be applied
    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    /// Stop (or other control) request was rejected
    #[error("Control request for {instance} failed: {reason}")]
    ControlRequest { instance: InstanceId, reason: String },

    /// Instance or run does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Provider layer error
    #[error("Provider error: {0}")]
    Provider(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Types layer error
    #[error(transparent)]
    Types(#[from] runwatch_types::Error),
}

impl Error {
    /// Whether the failed operation may succeed if simply repeated.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::TransientFetch { .. })
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Config(err.to_string())
    }
}
