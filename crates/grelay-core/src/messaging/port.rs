use async_trait::async_trait;

use crate::{
    domain::{ChatId, DestinationId, MessageRef},
    errors::DeliveryError,
    Result,
};

/// Outbound side of the messaging platform.
///
/// `send_text` and `copy_message` report platform rejections as typed
/// [`DeliveryError`]s; implementations must do any error-text mapping through
/// [`DeliveryError::from_api_text`].
#[async_trait]
pub trait RelayTransport: Send + Sync {
    /// Send plain text to a destination.
    async fn send_text(
        &self,
        dest: &DestinationId,
        text: &str,
    ) -> std::result::Result<(), DeliveryError>;

    /// Copy an existing message (any media) to a destination without a
    /// "forwarded from" header.
    async fn copy_message(
        &self,
        dest: &DestinationId,
        source: MessageRef,
    ) -> std::result::Result<(), DeliveryError>;

    /// Reply to the operator with HTML-formatted text.
    async fn reply_html(&self, chat_id: ChatId, html: &str) -> Result<()>;
}
