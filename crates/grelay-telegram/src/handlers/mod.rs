//! Telegram update handlers.
//!
//! Every message is converted into a core [`InboundEvent`] and handed to the
//! relay dispatcher, which decides between commands, relay and ignore.

use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{Chat, Message},
};

use grelay_core::{
    domain::{ChatId, MessageId, UserId},
    messaging::types::{ChatKind, InboundEvent, Payload},
};

use crate::router::AppState;

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let event = inbound_event(&msg, state.bot_username.as_deref());
    state.dispatcher.dispatch(event).await;
    Ok(())
}

/// Only the message text can carry a command; captions on media are content.
pub fn inbound_event(msg: &Message, bot_username: Option<&str>) -> InboundEvent {
    InboundEvent {
        chat_id: ChatId(msg.chat.id.0),
        chat_kind: chat_kind(&msg.chat),
        sender: msg.from().map(|u| UserId(u.id.0 as i64)),
        message_id: MessageId(msg.id.0),
        payload: Payload::from_text(msg.text(), bot_username),
    }
}

fn chat_kind(chat: &Chat) -> ChatKind {
    if chat.is_private() {
        ChatKind::Private
    } else if chat.is_supergroup() {
        ChatKind::Supergroup
    } else if chat.is_group() {
        ChatKind::Group
    } else {
        ChatKind::Channel
    }
}
