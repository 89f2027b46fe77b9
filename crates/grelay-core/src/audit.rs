//! Append-only audit trail of operator actions.

use std::{
    borrow::Cow,
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
};

use chrono::Utc;
use serde::Serialize;

use crate::{domain::UserId, registry::Destination, relay::RelayOutcome, Result};

/// Failure details longer than this many characters are clipped.
const DETAIL_MAX_CHARS: usize = 500;

#[derive(Clone, Debug, Serialize)]
pub struct AuditEvent {
    pub timestamp: String,
    pub event: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl AuditEvent {
    fn base(event: &str, user_id: Option<UserId>) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            event: event.to_string(),
            user_id: user_id.map(|u| u.0),
            command: None,
            alias: None,
            destination: None,
            outcome: None,
            detail: None,
        }
    }

    /// A copy relay (`"relay"`) or one-shot send (`"send"`) attempt.
    pub fn delivery(
        event: &str,
        user_id: UserId,
        dest: &Destination,
        outcome: &RelayOutcome,
    ) -> Self {
        Self {
            alias: Some(dest.alias.clone()),
            destination: Some(dest.id.0.clone()),
            outcome: Some(outcome.label().to_string()),
            detail: outcome.detail().map(|s| s.to_string()),
            ..Self::base(event, Some(user_id))
        }
    }

    /// Active target changed; `dest == None` means cleared.
    pub fn target_changed(user_id: UserId, dest: Option<&Destination>) -> Self {
        Self {
            alias: dest.map(|d| d.alias.clone()),
            destination: dest.map(|d| d.id.0.clone()),
            ..Self::base("set", Some(user_id))
        }
    }

    pub fn unauthorized(user_id: Option<UserId>, command: &str) -> Self {
        Self {
            command: Some(command.to_string()),
            ..Self::base("unauthorized", user_id)
        }
    }

    /// `<timestamp> <event> key=value ...`, one line, unset fields omitted.
    /// The failure detail is quoted since it is free text.
    fn render_line(&self) -> String {
        let mut line = format!("{} {}", self.timestamp, self.event);
        if let Some(user) = self.user_id {
            line.push_str(&format!(" user_id={user}"));
        }
        for (key, value) in [
            ("command", &self.command),
            ("alias", &self.alias),
            ("destination", &self.destination),
            ("outcome", &self.outcome),
        ] {
            if let Some(value) = value {
                line.push_str(&format!(" {key}={value}"));
            }
        }
        if let Some(detail) = &self.detail {
            line.push_str(&format!(" detail={detail:?}"));
        }
        line
    }
}

pub struct AuditLogger {
    path: PathBuf,
    json: bool,
}

impl AuditLogger {
    pub fn new(path: impl Into<PathBuf>, json: bool) -> Self {
        Self {
            path: path.into(),
            json,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line per event: JSON when configured, `render_line` otherwise.
    pub fn write(&self, mut event: AuditEvent) -> Result<()> {
        if let Some(detail) = event.detail.take() {
            event.detail = Some(clip(&detail, DETAIL_MAX_CHARS).into_owned());
        }
        let line = if self.json {
            serde_json::to_string(&event)?
        } else {
            event.render_line()
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")?;
        Ok(())
    }
}

/// Cut `s` to `max_chars` characters, marking the cut with `…`.
fn clip(s: &str, max_chars: usize) -> Cow<'_, str> {
    match s.char_indices().nth(max_chars) {
        Some((cut, _)) => Cow::Owned(format!("{}…", &s[..cut])),
        None => Cow::Borrowed(s),
    }
}
