use crate::domain::{ChatId, MessageId, MessageRef, UserId};

/// Kind of chat an event arrived in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
}

impl ChatKind {
    pub fn is_private(self) -> bool {
        matches!(self, Self::Private)
    }

    pub fn is_group(self) -> bool {
        matches!(self, Self::Group | Self::Supergroup)
    }
}

/// Longest command name the Bot API turns into a `bot_command` entity.
const MAX_COMMAND_LEN: usize = 32;

/// A `/command args...` message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Command {
    /// Lower-cased, without the leading `/` or any `@botname` suffix.
    pub name: String,
    /// Lower-cased `botname` from a `/cmd@botname` suffix.
    pub mention: Option<String>,
    /// Everything after the command word, trimmed.
    pub args: String,
}

impl Command {
    /// Parse `/cmd@botname arg1 ...`. Returns `None` for non-command text.
    ///
    /// Only words Telegram itself marks as commands qualify: `cmd` and
    /// `botname` are 1-32 characters of `[A-Za-z0-9_]`. Text such as
    /// `/tmp/build.log` or `/héllo` is ordinary content.
    pub fn parse(text: &str) -> Option<Self> {
        let rest = text.strip_prefix('/')?;
        let (word, args) = match rest.split_once(char::is_whitespace) {
            Some((word, args)) => (word, args.trim()),
            None => (rest, ""),
        };
        let (name, mention) = match word.split_once('@') {
            Some((name, mention)) => (name, Some(mention)),
            None => (word, None),
        };

        if !is_command_word(name) || !mention.map_or(true, is_command_word) {
            return None;
        }
        Some(Self {
            name: name.to_ascii_lowercase(),
            mention: mention.map(str::to_ascii_lowercase),
            args: args.to_string(),
        })
    }

    /// Whitespace-separated arguments.
    pub fn arg_words(&self) -> impl Iterator<Item = &str> {
        self.args.split_whitespace()
    }

    /// `false` only when the command names a different bot. An unknown own
    /// username accepts every mention.
    pub fn is_addressed_to(&self, bot_username: Option<&str>) -> bool {
        match (&self.mention, bot_username) {
            (Some(mention), Some(bot)) => {
                mention.eq_ignore_ascii_case(bot.trim_start_matches('@'))
            }
            _ => true,
        }
    }
}

fn is_command_word(word: &str) -> bool {
    (1..=MAX_COMMAND_LEN).contains(&word.len())
        && word.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload {
    Command(Command),
    /// `/cmd@otherbot`: meant for another bot in the same chat.
    ForeignCommand,
    /// Anything that is not a command: text, photo, document, sticker, ...
    Content,
}

impl Payload {
    /// Classify a message by its text (or caption-less media when `None`).
    /// `bot_username` is our own username, used to drop commands aimed elsewhere.
    pub fn from_text(text: Option<&str>, bot_username: Option<&str>) -> Self {
        match text.and_then(Command::parse) {
            Some(cmd) if cmd.is_addressed_to(bot_username) => Self::Command(cmd),
            Some(_) => Self::ForeignCommand,
            None => Self::Content,
        }
    }
}

/// Transport-independent inbound message.
#[derive(Clone, Debug)]
pub struct InboundEvent {
    pub chat_id: ChatId,
    pub chat_kind: ChatKind,
    pub sender: Option<UserId>,
    pub message_id: MessageId,
    pub payload: Payload,
}

impl InboundEvent {
    pub fn message_ref(&self) -> MessageRef {
        MessageRef {
            chat_id: self.chat_id,
            message_id: self.message_id,
        }
    }
}
