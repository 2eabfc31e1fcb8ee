//! Error taxonomy shared by both playback contexts.
//!
//! Every failure a fetch or an audio output can produce maps onto one of
//! these variants.  None of them propagate past a controller: the catalog
//! engine and the live controller absorb them into session state.

/// Result type alias for playback-core operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlaybackError {
    /// A required credential is missing.  Fatal, never retried.
    #[error("configuration error: {0}")]
    Config(String),

    /// The request never produced a response (DNS, TLS, timeout, reset).
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-2xx status.
    #[error("HTTP error {status}")]
    Http { status: u16 },

    /// The query endpoint answered 2xx but reported an error in its body.
    #[error("API error: {0}")]
    Api(String),

    /// The response body did not have the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),

    /// The audio output refused or failed to play the bound source.
    #[error("audio device error: {0}")]
    Device(String),

    /// The platform refused playback without a direct user gesture.
    #[error("playback blocked until the listener interacts")]
    AutoplayBlocked,
}

impl PlaybackError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn device(msg: impl Into<String>) -> Self {
        Self::Device(msg.into())
    }

    /// Only a missing credential is fatal; everything else is recoverable.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

impl From<reqwest::Error> for PlaybackError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            Self::Http {
                status: status.as_u16(),
            }
        } else if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for PlaybackError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_config_is_fatal() {
        assert!(PlaybackError::config("missing client id").is_fatal());
        assert!(!PlaybackError::Http { status: 503 }.is_fatal());
        assert!(!PlaybackError::AutoplayBlocked.is_fatal());
        assert!(!PlaybackError::device("decode").is_fatal());
    }

    #[test]
    fn http_error_message_carries_status() {
        let e = PlaybackError::Http { status: 404 };
        assert_eq!(e.to_string(), "HTTP error 404");
    }
}
