//! Routes each inbound event to exactly one handler and drives the relay.
//!
//! | event                  | chat    | non-admin      |
//! |------------------------|---------|----------------|
//! | `/start`               | private | rejection      |
//! | `/set <alias\|none>`   | private | rejection      |
//! | `/who`                 | private | silent ignore  |
//! | `/to <alias> <text>`   | private | silent ignore  |
//! | `/getid`               | group   | allowed        |
//! | anything else          | private | silent ignore  |
//!
//! Every other combination (unknown commands, commands addressed to another
//! bot, group chatter, channel posts) is ignored.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::{
    audit::{AuditEvent, AuditLogger},
    config::Config,
    domain::{ChatId, UserId},
    formatting::{alias_list, code, escape_html},
    messaging::{
        port::RelayTransport,
        types::{ChatKind, InboundEvent, Payload},
    },
    registry::{AliasRegistry, Destination},
    relay::{RelayEngine, RelayOutcome},
    security::AdminGate,
    session::{OperatorLocks, OperatorSession, SessionStore},
};

const CLEAR_KEYWORD: &str = "none";

/// Handler chosen for an inbound event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    Start,
    Set { target: Option<String> },
    Who,
    To { alias: Option<String>, text: String },
    GetId,
    Relay,
    Ignore,
}

impl Route {
    fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Set { .. } => "set",
            Self::Who => "who",
            Self::To { .. } => "to",
            Self::GetId => "getid",
            Self::Relay => "relay",
            Self::Ignore => "ignore",
        }
    }

    /// Non-admins get an explicit refusal for these; everything else is ignored.
    fn rejects_unauthorized(&self) -> bool {
        matches!(self, Self::Start | Self::Set { .. })
    }
}

/// Pick the handler for an event from its shape and chat kind alone.
pub fn route(event: &InboundEvent) -> Route {
    match (&event.payload, event.chat_kind) {
        (Payload::Command(cmd), ChatKind::Private | ChatKind::Group | ChatKind::Supergroup)
            if cmd.name == "getid" =>
        {
            Route::GetId
        }
        (Payload::Command(cmd), ChatKind::Private) => match cmd.name.as_str() {
            "start" => Route::Start,
            "set" => Route::Set {
                target: cmd.arg_words().next().map(str::to_string),
            },
            "who" => Route::Who,
            "to" => {
                let mut parts = cmd.args.splitn(2, char::is_whitespace);
                let alias = parts.next().filter(|s| !s.is_empty()).map(str::to_string);
                let text = parts.next().unwrap_or("").trim().to_string();
                Route::To { alias, text }
            }
            _ => Route::Ignore,
        },
        (Payload::Content, ChatKind::Private) => Route::Relay,
        _ => Route::Ignore,
    }
}

pub struct RelayDispatcher {
    registry: Arc<AliasRegistry>,
    gate: AdminGate,
    sessions: SessionStore,
    locks: OperatorLocks,
    engine: RelayEngine,
    transport: Arc<dyn RelayTransport>,
    audit: Option<AuditLogger>,
}

impl RelayDispatcher {
    pub fn new(
        registry: Arc<AliasRegistry>,
        gate: AdminGate,
        transport: Arc<dyn RelayTransport>,
    ) -> Self {
        Self {
            registry,
            gate,
            sessions: SessionStore::new(),
            locks: OperatorLocks::default(),
            engine: RelayEngine::new(transport.clone()),
            transport,
            audit: None,
        }
    }

    pub fn from_config(cfg: &Config, transport: Arc<dyn RelayTransport>) -> Self {
        let registry = Arc::new(AliasRegistry::build(&cfg.group_map));
        let gate = AdminGate::new(cfg.admin_user_id.clone());
        let mut dispatcher = Self::new(registry, gate, transport);
        if let Some(path) = &cfg.audit_log_path {
            dispatcher = dispatcher.with_audit(AuditLogger::new(path.clone(), cfg.audit_log_json));
        }
        dispatcher
    }

    pub fn with_audit(mut self, audit: AuditLogger) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn registry(&self) -> &AliasRegistry {
        &self.registry
    }

    pub async fn session(&self, user: UserId) -> OperatorSession {
        self.sessions.get(user).await
    }

    /// Handle one inbound event. Failures are logged and reported to the
    /// operator; nothing propagates out of here.
    pub async fn dispatch(&self, event: InboundEvent) {
        let route = route(&event);
        debug!(route = route.name(), chat = %event.chat_id, "dispatching event");

        match route {
            Route::Ignore => {}
            Route::GetId => self.handle_getid(&event).await,
            route => {
                let Some(user) = self.authorize(&event, &route).await else {
                    return;
                };

                // Sequence this operator's events; the session map lock itself is
                // only held inside SessionStore calls.
                let _guard = self.locks.lock_operator(user).await;

                match route {
                    Route::Start => self.handle_start(&event).await,
                    Route::Set { target } => self.handle_set(&event, user, target).await,
                    Route::Who => self.handle_who(&event, user).await,
                    Route::To { alias, text } => self.handle_to(&event, user, alias, text).await,
                    Route::Relay => self.handle_relay(&event, user).await,
                    Route::GetId | Route::Ignore => {}
                }
            }
        }
    }

    async fn authorize(&self, event: &InboundEvent, route: &Route) -> Option<UserId> {
        if self.gate.is_admin(event.sender) {
            return event.sender;
        }

        debug!(
            user = ?event.sender.map(|u| u.0),
            command = route.name(),
            "unauthorized request"
        );
        self.audit(AuditEvent::unauthorized(event.sender, route.name()));

        if route.rejects_unauthorized() {
            self.reply(event.chat_id, "⛔ You are not authorized to use this bot.")
                .await;
        }
        None
    }

    async fn handle_start(&self, event: &InboundEvent) {
        let aliases = self.registry.list_aliases();
        if aliases.is_empty() {
            self.reply(
                event.chat_id,
                "❌ No aliases are available: no valid GROUP_MAP entries were loaded.\n\
Set GROUP_MAP (<code>alias:id,alias:id</code>) and restart the bot.",
            )
            .await;
            return;
        }

        let body = format!(
            "👋 Hello, admin! I relay your messages to preconfigured groups.\n\n\
<b>Auto-relay mode</b>\n\
1. <code>/set &lt;alias&gt;</code> (e.g. <code>/set {first}</code>) chooses the target.\n\
2. Everything you send afterwards (text, photos, files) is copied there anonymously.\n\
3. <code>/set none</code> stops auto-relay.\n\
4. /who shows the current target.\n\n\
<b>One-shot text</b>\n\
• <code>/to &lt;alias&gt; &lt;text&gt;</code> sends text once without changing the /set target.\n\n\
<b>Group command</b>\n\
• Send /getid inside a group to learn its id.\n\n\
<b>Known aliases:</b>\n{list}",
            first = escape_html(aliases[0]),
            list = alias_list(&aliases),
        );
        self.reply(event.chat_id, &body).await;
    }

    async fn handle_set(&self, event: &InboundEvent, user: UserId, target: Option<String>) {
        let Some(target) = target else {
            self.reply(
                event.chat_id,
                "Please provide an alias. Usage: <code>/set &lt;alias&gt;</code> or <code>/set none</code>",
            )
            .await;
            return;
        };

        if target.eq_ignore_ascii_case(CLEAR_KEYWORD) {
            self.sessions.clear_active(user).await;
            self.audit(AuditEvent::target_changed(user, None));
            self.reply(
                event.chat_id,
                "✅ Auto-relay disabled. Your messages will no longer be forwarded.",
            )
            .await;
            return;
        }

        let Some(dest) = self.registry.resolve(&target).cloned() else {
            self.reply(event.chat_id, &not_found(&target)).await;
            return;
        };

        self.sessions.set_active(user, dest.clone()).await;
        self.audit(AuditEvent::target_changed(user, Some(&dest)));
        self.reply(
            event.chat_id,
            &format!(
                "✅ Auto-relay target set. Everything you send now goes anonymously to: {}",
                code(&dest.alias)
            ),
        )
        .await;
    }

    async fn handle_who(&self, event: &InboundEvent, user: UserId) {
        let session = self.sessions.get(user).await;
        let msg = match session.active_alias() {
            Some(alias) => format!("ℹ️ Current auto-relay target: {}", code(alias)),
            None => "ℹ️ No auto-relay target configured. Use <code>/set &lt;alias&gt;</code> to set one."
                .to_string(),
        };
        self.reply(event.chat_id, &msg).await;
    }

    async fn handle_to(
        &self,
        event: &InboundEvent,
        user: UserId,
        alias: Option<String>,
        text: String,
    ) {
        const USAGE: &str = "Usage: <code>/to &lt;alias&gt; &lt;text&gt;</code>";

        let Some(alias) = alias else {
            self.reply(event.chat_id, USAGE).await;
            return;
        };
        if text.is_empty() {
            self.reply(event.chat_id, &format!("You did not enter any text. {USAGE}"))
                .await;
            return;
        }

        let Some(dest) = self.registry.resolve(&alias) else {
            self.reply(event.chat_id, &not_found(&alias)).await;
            return;
        };

        let outcome = self.engine.send_text(dest, &text).await;
        self.audit(AuditEvent::delivery("send", user, dest, &outcome));

        let msg = match &outcome {
            RelayOutcome::Success => format!("✅ Text sent to {}.", code(&dest.alias)),
            failure => render_failure("Sending", dest, failure),
        };
        self.reply(event.chat_id, &msg).await;
    }

    async fn handle_relay(&self, event: &InboundEvent, user: UserId) {
        let session = self.sessions.get(user).await;
        let Some(dest) = session.active else {
            debug!(user = user.0, "no active target; message not relayed");
            return;
        };

        let outcome = self.engine.copy(&dest, event.message_ref()).await;
        self.audit(AuditEvent::delivery("relay", user, &dest, &outcome));

        let msg = match &outcome {
            RelayOutcome::Success => format!("✅ Relayed to {}.", code(&dest.alias)),
            failure => render_failure("Auto-relay", &dest, failure),
        };
        self.reply(event.chat_id, &msg).await;
    }

    async fn handle_getid(&self, event: &InboundEvent) {
        if !event.chat_kind.is_group() {
            self.reply(event.chat_id, "Please run this command inside a group.")
                .await;
            return;
        }

        self.reply(
            event.chat_id,
            &format!(
                "✅ This group's id is:\n\n<code>{}</code>\n\nUse it in GROUP_MAP.",
                event.chat_id
            ),
        )
        .await;
    }

    async fn reply(&self, chat_id: ChatId, html: &str) {
        if let Err(e) = self.transport.reply_html(chat_id, html).await {
            warn!(chat = %chat_id, error = %e, "failed to send reply");
        }
    }

    fn audit(&self, event: AuditEvent) {
        let Some(audit) = &self.audit else {
            return;
        };
        if let Err(e) = audit.write(event) {
            warn!(path = %audit.path().display(), error = %e, "failed to write audit event");
        }
    }
}

fn not_found(alias: &str) -> String {
    format!("❌ Alias {} not found.", code(alias))
}

fn render_failure(action: &str, dest: &Destination, outcome: &RelayOutcome) -> String {
    let alias = code(&dest.alias);
    match outcome {
        RelayOutcome::DestinationNotFound => {
            format!("❌ {action} failed: chat for {alias} not found.")
        }
        RelayOutcome::NotAMember => {
            format!("❌ {action} failed: the bot is not a member of {alias}.")
        }
        RelayOutcome::OtherFailure(detail) => format!(
            "❌ {action} to {alias} failed: {}",
            escape_html(detail)
        ),
        RelayOutcome::Success => format!("✅ {action} to {alias} succeeded."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{DestinationId, MessageId, MessageRef},
        errors::DeliveryError,
        messaging::types::Command,
        Result,
    };
    use async_trait::async_trait;
    use std::sync::Mutex;

    const ADMIN: i64 = 42;
    const STRANGER: i64 = 7;
    const GROUP_CHAT: i64 = -100_555;
    const BOT: &str = "relay_bot";

    #[derive(Default)]
    struct FakeTransport {
        sends: Mutex<Vec<(String, String)>>,
        copies: Mutex<Vec<(String, MessageRef)>>,
        replies: Mutex<Vec<(i64, String)>>,
        send_error: Mutex<Option<DeliveryError>>,
        copy_error: Mutex<Option<DeliveryError>>,
    }

    impl FakeTransport {
        fn sends(&self) -> Vec<(String, String)> {
            self.sends.lock().unwrap().clone()
        }

        fn copies(&self) -> Vec<(String, MessageRef)> {
            self.copies.lock().unwrap().clone()
        }

        fn replies(&self) -> Vec<(i64, String)> {
            self.replies.lock().unwrap().clone()
        }

        fn last_reply(&self) -> String {
            self.replies()
                .last()
                .map(|(_, r)| r.clone())
                .unwrap_or_default()
        }

        fn fail_sends_with(&self, e: DeliveryError) {
            *self.send_error.lock().unwrap() = Some(e);
        }

        fn fail_copies_with(&self, e: DeliveryError) {
            *self.copy_error.lock().unwrap() = Some(e);
        }
    }

    #[async_trait]
    impl RelayTransport for FakeTransport {
        async fn send_text(
            &self,
            dest: &DestinationId,
            text: &str,
        ) -> std::result::Result<(), DeliveryError> {
            if let Some(e) = self.send_error.lock().unwrap().clone() {
                return Err(e);
            }
            self.sends
                .lock()
                .unwrap()
                .push((dest.0.clone(), text.to_string()));
            Ok(())
        }

        async fn copy_message(
            &self,
            dest: &DestinationId,
            source: MessageRef,
        ) -> std::result::Result<(), DeliveryError> {
            if let Some(e) = self.copy_error.lock().unwrap().clone() {
                return Err(e);
            }
            self.copies.lock().unwrap().push((dest.0.clone(), source));
            Ok(())
        }

        async fn reply_html(&self, chat_id: ChatId, html: &str) -> Result<()> {
            self.replies
                .lock()
                .unwrap()
                .push((chat_id.0, html.to_string()));
            Ok(())
        }
    }

    fn setup(map: &str) -> (RelayDispatcher, Arc<FakeTransport>) {
        let transport = Arc::new(FakeTransport::default());
        let dispatcher = RelayDispatcher::new(
            Arc::new(AliasRegistry::build(map)),
            AdminGate::new(Some(ADMIN.to_string())),
            transport.clone(),
        );
        (dispatcher, transport)
    }

    fn private(user: i64, text: Option<&str>, message_id: i32) -> InboundEvent {
        InboundEvent {
            chat_id: ChatId(user),
            chat_kind: ChatKind::Private,
            sender: Some(UserId(user)),
            message_id: MessageId(message_id),
            payload: Payload::from_text(text, Some(BOT)),
        }
    }

    fn group(user: i64, kind: ChatKind, text: &str) -> InboundEvent {
        InboundEvent {
            chat_id: ChatId(GROUP_CHAT),
            chat_kind: kind,
            sender: Some(UserId(user)),
            message_id: MessageId(1),
            payload: Payload::from_text(Some(text), Some(BOT)),
        }
    }

    async fn admin(d: &RelayDispatcher, text: &str) {
        d.dispatch(private(ADMIN, Some(text), 1)).await;
    }

    async fn active_alias(d: &RelayDispatcher) -> Option<String> {
        d.session(UserId(ADMIN))
            .await
            .active_alias()
            .map(str::to_string)
    }

    #[test]
    fn routes_by_shape_and_chat_kind() {
        let r = |e: InboundEvent| route(&e);
        assert_eq!(r(private(ADMIN, Some("/start"), 1)), Route::Start);
        assert_eq!(
            r(private(ADMIN, Some("/set g1 extra"), 1)),
            Route::Set {
                target: Some("g1".to_string())
            }
        );
        assert_eq!(r(private(ADMIN, Some("/set"), 1)), Route::Set { target: None });
        assert_eq!(
            r(private(ADMIN, Some("/to g1 hello  world\nline2"), 1)),
            Route::To {
                alias: Some("g1".to_string()),
                text: "hello  world\nline2".to_string()
            }
        );
        assert_eq!(
            r(private(ADMIN, Some("/to"), 1)),
            Route::To {
                alias: None,
                text: String::new()
            }
        );
        assert_eq!(r(private(ADMIN, Some("/who@relay_bot"), 1)), Route::Who);
        assert_eq!(r(private(ADMIN, Some("/unknown"), 1)), Route::Ignore);
        assert_eq!(r(private(ADMIN, Some("/who@other_bot"), 1)), Route::Ignore);
        assert_eq!(r(private(ADMIN, Some("/你好 everyone"), 1)), Route::Relay);
        assert_eq!(r(private(ADMIN, Some("hello"), 1)), Route::Relay);
        assert_eq!(r(private(ADMIN, None, 1)), Route::Relay);
        assert_eq!(r(private(ADMIN, Some("/getid"), 1)), Route::GetId);

        assert_eq!(r(group(ADMIN, ChatKind::Group, "/getid")), Route::GetId);
        assert_eq!(r(group(ADMIN, ChatKind::Supergroup, "/getid")), Route::GetId);
        assert_eq!(r(group(ADMIN, ChatKind::Channel, "/getid")), Route::Ignore);
        assert_eq!(r(group(ADMIN, ChatKind::Group, "/set g1")), Route::Ignore);
        assert_eq!(r(group(ADMIN, ChatKind::Group, "hello")), Route::Ignore);
    }

    #[tokio::test]
    async fn start_lists_aliases() {
        let (d, t) = setup("g1:1001, g2:1002");
        admin(&d, "/start").await;
        let reply = t.last_reply();
        assert!(reply.contains("<code>g1</code>"));
        assert!(reply.contains("<code>g2</code>"));
    }

    #[tokio::test]
    async fn empty_config_degrades_visibly() {
        let (d, t) = setup("");
        admin(&d, "/start").await;
        assert!(t.last_reply().contains("No aliases are available"));

        admin(&d, "/set g1").await;
        assert!(t.last_reply().contains("not found"));
        assert_eq!(active_alias(&d).await, None);
    }

    #[tokio::test]
    async fn set_then_photo_copies_to_active_destination() {
        let (d, t) = setup("g1:1001, g2:1002");
        admin(&d, "/set g1").await;
        assert_eq!(active_alias(&d).await.as_deref(), Some("g1"));

        // A photo without caption has no text.
        d.dispatch(private(ADMIN, None, 77)).await;

        assert_eq!(
            t.copies(),
            vec![(
                "1001".to_string(),
                MessageRef {
                    chat_id: ChatId(ADMIN),
                    message_id: MessageId(77)
                }
            )]
        );
        let reply = t.last_reply();
        assert!(reply.starts_with("✅"));
        assert!(reply.contains("g1"));
    }

    #[tokio::test]
    async fn set_none_stops_relay_silently() {
        let (d, t) = setup("g1:1001");
        admin(&d, "/set g1").await;
        admin(&d, "/set NONE").await;
        assert_eq!(active_alias(&d).await, None);

        let replies_before = t.replies().len();
        admin(&d, "hello").await;
        assert!(t.copies().is_empty());
        assert_eq!(t.replies().len(), replies_before, "no reply without target");
    }

    #[tokio::test]
    async fn none_keyword_wins_over_alias_named_none() {
        let (d, t) = setup("none:1001");
        admin(&d, "/set none").await;
        assert_eq!(active_alias(&d).await, None);
        admin(&d, "hello").await;
        assert!(t.copies().is_empty());
    }

    #[tokio::test]
    async fn relay_without_target_is_noop() {
        let (d, t) = setup("g1:1001");
        admin(&d, "hello").await;
        assert!(t.copies().is_empty());
        assert!(t.replies().is_empty());
    }

    #[tokio::test]
    async fn set_unknown_alias_keeps_previous_target() {
        let (d, t) = setup("g1:1001");
        admin(&d, "/set g1").await;
        admin(&d, "/set G1").await;
        assert!(t.last_reply().contains("<code>G1</code>"));
        assert_eq!(active_alias(&d).await.as_deref(), Some("g1"));
    }

    #[tokio::test]
    async fn set_without_argument_is_usage_error() {
        let (d, t) = setup("g1:1001");
        admin(&d, "/set g1").await;
        admin(&d, "/set").await;
        assert!(t.last_reply().contains("Usage"));
        assert_eq!(active_alias(&d).await.as_deref(), Some("g1"));
    }

    #[tokio::test]
    async fn who_reports_target() {
        let (d, t) = setup("g1:1001");
        admin(&d, "/who").await;
        assert!(t.last_reply().contains("No auto-relay target"));
        admin(&d, "/set g1").await;
        admin(&d, "/who").await;
        assert!(t.last_reply().contains("<code>g1</code>"));
    }

    #[tokio::test]
    async fn to_sends_once_without_touching_session() {
        let (d, t) = setup("g1:1001, g2:1002");
        admin(&d, "/set g1").await;

        admin(&d, "/to g2 hello there").await;
        assert_eq!(
            t.sends(),
            vec![("1002".to_string(), "hello there".to_string())]
        );
        assert!(t.last_reply().contains("<code>g2</code>"));
        assert_eq!(active_alias(&d).await.as_deref(), Some("g1"));

        admin(&d, "/to nope hello").await;
        assert_eq!(active_alias(&d).await.as_deref(), Some("g1"));
        assert!(t.copies().is_empty());
    }

    #[tokio::test]
    async fn to_unknown_alias_makes_no_transport_call() {
        let (d, t) = setup("g1:1001");
        admin(&d, "/to g2 hello").await;
        assert!(t.sends().is_empty());
        let reply = t.last_reply();
        assert!(reply.contains("<code>g2</code>"));
        assert!(reply.contains("not found"));
        assert_eq!(active_alias(&d).await, None);
    }

    #[tokio::test]
    async fn to_usage_errors() {
        let (d, t) = setup("g1:1001");
        admin(&d, "/to").await;
        assert!(t.last_reply().starts_with("Usage"));
        admin(&d, "/to g1").await;
        assert!(t.last_reply().contains("did not enter any text"));
        admin(&d, "/to g1    ").await;
        assert!(t.last_reply().contains("did not enter any text"));
        assert!(t.sends().is_empty());
    }

    #[tokio::test]
    async fn non_admin_cannot_mutate_or_relay() {
        let (d, t) = setup("g1:1001");
        admin(&d, "/set g1").await;
        let baseline = t.replies().len();

        for text in ["/start", "/set g1", "/set none", "/who", "/to g1 hi", "hello"] {
            d.dispatch(private(STRANGER, Some(text), 5)).await;
        }

        assert!(t.sends().is_empty());
        assert!(t.copies().is_empty());
        assert_eq!(d.session(UserId(STRANGER)).await, OperatorSession::default());
        assert_eq!(active_alias(&d).await.as_deref(), Some("g1"));

        // Only /start and the two /set commands are answered, with a refusal.
        let new_replies: Vec<_> = t.replies()[baseline..].to_vec();
        assert_eq!(new_replies.len(), 3);
        assert!(new_replies
            .iter()
            .all(|(chat, r)| *chat == STRANGER && r.contains("not authorized")));
    }

    #[tokio::test]
    async fn missing_admin_refuses_everyone() {
        let transport = Arc::new(FakeTransport::default());
        let d = RelayDispatcher::new(
            Arc::new(AliasRegistry::build("g1:1001")),
            AdminGate::new(None),
            transport.clone(),
        );
        d.dispatch(private(ADMIN, Some("/set g1"), 1)).await;
        d.dispatch(private(ADMIN, Some("hello"), 2)).await;
        assert!(transport.copies().is_empty());
        assert!(transport.last_reply().contains("not authorized"));
    }

    #[tokio::test]
    async fn getid_only_answers_in_groups() {
        let (d, t) = setup("g1:1001");
        admin(&d, "/set g1").await;

        d.dispatch(private(STRANGER, Some("/getid"), 1)).await;
        assert!(t.last_reply().contains("inside a group"));

        for kind in [ChatKind::Group, ChatKind::Supergroup] {
            d.dispatch(group(STRANGER, kind, "/getid@relay_bot")).await;
            let (chat, reply) = t.replies().last().cloned().unwrap();
            assert_eq!(chat, GROUP_CHAT);
            assert!(reply.contains(&format!("<code>{GROUP_CHAT}</code>")));
        }
        assert!(t.copies().is_empty());
    }

    #[tokio::test]
    async fn getid_for_another_bot_is_ignored() {
        let (d, t) = setup("g1:1001");
        for kind in [ChatKind::Group, ChatKind::Supergroup] {
            d.dispatch(group(STRANGER, kind, "/getid@some_other_bot")).await;
        }
        d.dispatch(private(STRANGER, Some("/getid@some_other_bot"), 1))
            .await;
        assert!(t.replies().is_empty());
    }

    #[tokio::test]
    async fn slash_text_that_is_not_a_command_is_relayed() {
        let (d, t) = setup("g1:1001");
        admin(&d, "/set g1").await;

        for (i, text) in ["/你好 everyone", "/tmp/build.log is ready", "/héllo"]
            .into_iter()
            .enumerate()
        {
            d.dispatch(private(ADMIN, Some(text), 10 + i as i32)).await;
        }

        let copies = t.copies();
        assert_eq!(copies.len(), 3);
        assert!(copies.iter().all(|(dest, _)| dest == "1001"));
        assert_eq!(copies[0].1.message_id, MessageId(10));
        assert!(t.last_reply().contains("Relayed to <code>g1</code>"));
    }

    #[tokio::test]
    async fn to_failure_is_reported_without_classification() {
        let (d, t) = setup("g1:1001");
        t.fail_sends_with(DeliveryError::ChatNotFound(
            "Bad Request: chat not found".into(),
        ));
        admin(&d, "/to g1 hello").await;

        assert!(t.sends().is_empty());
        assert_eq!(
            t.last_reply(),
            "❌ Sending to <code>g1</code> failed: Bad Request: chat not found"
        );
        assert_eq!(active_alias(&d).await, None);
    }

    #[tokio::test]
    async fn copy_failures_are_reported_with_classification() {
        let cases = [
            (
                DeliveryError::ChatNotFound("Bad Request: chat not found".into()),
                "chat for <code>g1</code> not found",
            ),
            (
                DeliveryError::NotAMember("Forbidden: bot is not a member".into()),
                "not a member of <code>g1</code>",
            ),
            (
                DeliveryError::Api("Bad Request: <weird>".into()),
                "failed: Bad Request: &lt;weird&gt;",
            ),
        ];

        for (error, expected) in cases {
            let (d, t) = setup("g1:1001");
            admin(&d, "/set g1").await;
            t.fail_copies_with(error);
            admin(&d, "hello").await;
            let reply = t.last_reply();
            assert!(reply.starts_with("❌"), "{reply}");
            assert!(reply.contains(expected), "{reply}");
            // A failed relay leaves the target in place.
            assert_eq!(active_alias(&d).await.as_deref(), Some("g1"));
        }
    }

    #[tokio::test]
    async fn concurrent_relays_all_reach_destination() {
        let (d, t) = setup("g1:1001");
        let d = Arc::new(d);
        admin(&d, "/set g1").await;

        let mut handles = Vec::new();
        for i in 0..16 {
            let d = d.clone();
            handles.push(tokio::spawn(async move {
                d.dispatch(private(ADMIN, Some("msg"), 100 + i)).await;
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let copies = t.copies();
        assert_eq!(copies.len(), 16);
        assert!(copies.iter().all(|(dest, _)| dest == "1001"));
    }

    #[tokio::test]
    async fn audit_records_relay_and_refusals() {
        let path = std::path::PathBuf::from(format!(
            "/tmp/grelay-dispatch-audit-{}.log",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);

        let (d, _t) = setup("g1:1001");
        let d = d.with_audit(AuditLogger::new(path.clone(), true));
        admin(&d, "/set g1").await;
        admin(&d, "hello").await;
        d.dispatch(private(STRANGER, Some("/who"), 1)).await;

        let written = std::fs::read_to_string(&path).unwrap();
        let events: Vec<serde_json::Value> = written
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        let kinds: Vec<&str> = events.iter().map(|e| e["event"].as_str().unwrap()).collect();
        assert_eq!(kinds, vec!["set", "relay", "unauthorized"]);
        assert_eq!(events[1]["outcome"], "success");
        assert_eq!(events[2]["command"], "who");

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn command_payload_helpers_agree_with_router() {
        let cmd = Command::parse("/to g1 a b").unwrap();
        let ev = InboundEvent {
            chat_id: ChatId(ADMIN),
            chat_kind: ChatKind::Private,
            sender: Some(UserId(ADMIN)),
            message_id: MessageId(1),
            payload: Payload::Command(cmd),
        };
        assert_eq!(
            route(&ev),
            Route::To {
                alias: Some("g1".to_string()),
                text: "a b".to_string()
            }
        );
    }
}
