//! Finmemo error types

/// Finmemo error types.
///
/// `Clone` so that one in-flight computation can hand the same outcome to
/// every caller that joined it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FinmemoError {
    // Cache errors
    /// Arguments could not be turned into a cache key. Raised before any
    /// store is touched.
    #[error("cannot derive cache key: {0}")]
    KeySerialization(String),

    /// A backing store could not be reached.
    #[error("{store} store unavailable: {message}")]
    StoreUnavailable {
        store: &'static str,
        message: String,
    },

    /// The durable write of a fresh result failed. Nothing was cached.
    #[error("failed to persist cache entry '{key}': {message}")]
    CachePersist { key: String, message: String },

    // Provider errors
    #[error("not found: {0}")]
    ProviderNotFound(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("empty response from provider")]
    EmptyResponse,

    // Data errors
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl FinmemoError {
    /// Shorthand for [`FinmemoError::StoreUnavailable`].
    pub fn unavailable(store: &'static str, message: impl ToString) -> Self {
        Self::StoreUnavailable {
            store,
            message: message.to_string(),
        }
    }

    /// Whether this error was caused by the caller's input.
    ///
    /// Client errors surface as 4xx at the HTTP boundary; everything else is
    /// reported as a generic server failure.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            FinmemoError::ProviderNotFound(_)
                | FinmemoError::InvalidInput(_)
                | FinmemoError::KeySerialization(_)
        )
    }

    /// Whether retrying the same call later may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            FinmemoError::StoreUnavailable { .. } | FinmemoError::Http(_) => true,
            FinmemoError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for FinmemoError {
    fn from(err: serde_json::Error) -> Self {
        FinmemoError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for FinmemoError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => FinmemoError::Api {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => FinmemoError::Http(err.to_string()),
        }
    }
}

/// Result type alias for Finmemo operations
pub type Result<T> = std::result::Result<T, FinmemoError>;
