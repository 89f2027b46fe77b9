//! Telegram adapter (teloxide).
//!
//! This crate implements the `grelay-core` RelayTransport over the Telegram
//! Bot API and feeds incoming messages into the core dispatcher.

use async_trait::async_trait;

use teloxide::{
    prelude::*,
    types::{ParseMode, Recipient},
    ApiError, RequestError,
};

pub mod handlers;
pub mod router;

use grelay_core::{
    domain::{ChatId, DestinationId, MessageRef},
    errors::{DeliveryError, Error},
    messaging::port::RelayTransport,
    Result,
};

#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn tg_msg_id(message_id: grelay_core::domain::MessageId) -> teloxide::types::MessageId {
        teloxide::types::MessageId(message_id.0)
    }
}

/// Numeric ids address a chat directly; anything else is handed to the Bot
/// API unchanged as a `chat_id` string (normally `@channelusername`).
pub fn recipient(dest: &DestinationId) -> Recipient {
    let raw = dest.as_str().trim();
    match raw.parse::<i64>() {
        Ok(id) => Recipient::Id(teloxide::types::ChatId(id)),
        Err(_) => Recipient::ChannelUsername(raw.to_string()),
    }
}

/// Translate a Bot API failure into the core delivery taxonomy.
pub fn delivery_error(e: RequestError) -> DeliveryError {
    let detail = e.to_string();
    match e {
        RequestError::Api(ApiError::ChatNotFound) => DeliveryError::ChatNotFound(detail),
        RequestError::Api(_) => DeliveryError::from_api_text(detail),
        _ => DeliveryError::Other(detail),
    }
}

#[async_trait]
impl RelayTransport for TelegramTransport {
    async fn send_text(
        &self,
        dest: &DestinationId,
        text: &str,
    ) -> std::result::Result<(), DeliveryError> {
        self.bot
            .send_message(recipient(dest), text.to_string())
            .await
            .map_err(delivery_error)?;
        Ok(())
    }

    async fn copy_message(
        &self,
        dest: &DestinationId,
        source: MessageRef,
    ) -> std::result::Result<(), DeliveryError> {
        self.bot
            .copy_message(
                recipient(dest),
                Self::tg_chat(source.chat_id),
                Self::tg_msg_id(source.message_id),
            )
            .await
            .map_err(delivery_error)?;
        Ok(())
    }

    async fn reply_html(&self, chat_id: ChatId, html: &str) -> Result<()> {
        self.bot
            .send_message(Self::tg_chat(chat_id), html.to_string())
            .parse_mode(ParseMode::Html)
            .await
            .map_err(|e| Error::External(format!("telegram error: {e}")))?;
        Ok(())
    }
}
