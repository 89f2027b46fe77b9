use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};
use tracing::{info, warn};

use grelay_core::{config::Config, dispatcher::RelayDispatcher, messaging::port::RelayTransport};

use crate::handlers;
use crate::TelegramTransport;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<RelayDispatcher>,
    /// Our own username; `/cmd@other_bot` is ignored when known.
    pub bot_username: Option<String>,
}

/// Long-poll the Bot API until the process is stopped.
///
/// teloxide already processes updates from one chat sequentially; the core
/// dispatcher adds its own per-operator lock on top.
pub async fn run_polling(cfg: Arc<Config>) -> anyhow::Result<()> {
    let Some(token) = cfg.bot_token.clone() else {
        anyhow::bail!("BOT_TOKEN is not set");
    };
    let bot = Bot::new(token);

    let bot_username = match bot.get_me().await {
        Ok(me) => {
            let username = me.user.username.clone();
            info!(username = username.as_deref().unwrap_or("?"), "grelay started");
            username
        }
        Err(e) => {
            warn!(error = %e, "getMe failed; accepting commands for any bot");
            None
        }
    };

    let transport: Arc<dyn RelayTransport> = Arc::new(TelegramTransport::new(bot.clone()));
    let dispatcher = Arc::new(RelayDispatcher::from_config(&cfg, transport));
    info!(
        aliases = dispatcher.registry().len(),
        "alias registry ready: {}",
        dispatcher.registry().list_aliases().join(", ")
    );

    let state = Arc::new(AppState {
        dispatcher,
        bot_username,
    });

    let handler =
        dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    Ok(())
}
