/// Core error type for the relay.
///
/// Adapter crates map their specific errors into this type so the dispatcher
/// can log and report failures consistently.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Why an outbound send or copy was rejected by the transport.
///
/// Transports produce this at their boundary; the relay engine turns it into
/// a [`crate::relay::RelayOutcome`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("chat not found: {0}")]
    ChatNotFound(String),

    #[error("bot is not a member: {0}")]
    NotAMember(String),

    /// Any other rejection reported by the messaging platform.
    #[error("{0}")]
    Api(String),

    /// Network, serialization or other non-platform failures.
    #[error("{0}")]
    Other(String),
}

impl DeliveryError {
    /// Map a platform error description to a delivery failure.
    ///
    /// This is the only place that depends on the platform's error wording.
    /// Matching is case-insensitive but otherwise literal, so unrelated errors
    /// that happen to contain the same phrases will be misclassified.
    pub fn from_api_text(detail: impl Into<String>) -> Self {
        let detail = detail.into();
        let lower = detail.to_lowercase();
        if lower.contains("chat not found") {
            Self::ChatNotFound(detail)
        } else if lower.contains("bot is not a member")
            || lower.contains("bot was kicked")
            || lower.contains("not a member of the")
        {
            Self::NotAMember(detail)
        } else {
            Self::Api(detail)
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            Self::ChatNotFound(d) | Self::NotAMember(d) | Self::Api(d) | Self::Other(d) => d,
        }
    }
}
