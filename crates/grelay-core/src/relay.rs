//! Outbound relay: one-shot text sends and anonymous message copies.

use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    domain::MessageRef, errors::DeliveryError, messaging::port::RelayTransport,
    registry::Destination,
};

/// Result of a single relay attempt. Only used to render operator feedback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RelayOutcome {
    Success,
    DestinationNotFound,
    NotAMember,
    OtherFailure(String),
}

impl RelayOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::DestinationNotFound => "destination_not_found",
            Self::NotAMember => "not_a_member",
            Self::OtherFailure(_) => "other_failure",
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::OtherFailure(d) => Some(d),
            _ => None,
        }
    }
}

impl From<DeliveryError> for RelayOutcome {
    fn from(e: DeliveryError) -> Self {
        match e {
            DeliveryError::ChatNotFound(_) => Self::DestinationNotFound,
            DeliveryError::NotAMember(_) => Self::NotAMember,
            DeliveryError::Api(d) | DeliveryError::Other(d) => Self::OtherFailure(d),
        }
    }
}

/// Performs relay actions against a resolved destination. Never retries.
#[derive(Clone)]
pub struct RelayEngine {
    transport: Arc<dyn RelayTransport>,
}

impl RelayEngine {
    pub fn new(transport: Arc<dyn RelayTransport>) -> Self {
        Self { transport }
    }

    /// Send `text` verbatim. Every failure is reported as `OtherFailure`.
    pub async fn send_text(&self, dest: &Destination, text: &str) -> RelayOutcome {
        match self.transport.send_text(&dest.id, text).await {
            Ok(()) => {
                info!(alias = %dest.alias, destination = %dest.id, "one-shot text sent");
                RelayOutcome::Success
            }
            Err(e) => {
                warn!(alias = %dest.alias, destination = %dest.id, error = %e, "one-shot send failed");
                RelayOutcome::OtherFailure(e.detail().to_string())
            }
        }
    }

    /// Copy `source` to the destination without sender attribution, classifying
    /// any failure.
    pub async fn copy(&self, dest: &Destination, source: MessageRef) -> RelayOutcome {
        match self.transport.copy_message(&dest.id, source).await {
            Ok(()) => {
                info!(alias = %dest.alias, destination = %dest.id, "message copied");
                RelayOutcome::Success
            }
            Err(e) => {
                warn!(alias = %dest.alias, destination = %dest.id, error = %e, "copy relay failed");
                e.into()
            }
        }
    }
}
