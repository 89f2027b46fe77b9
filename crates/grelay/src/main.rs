use std::sync::Arc;

use grelay_core::config::Config;

#[tokio::main]
async fn main() -> Result<(), grelay_core::Error> {
    grelay_core::logging::init("grelay")?;

    let cfg = Arc::new(Config::load()?);
    if cfg.bot_token.is_none() {
        tracing::error!("BOT_TOKEN environment variable is not set; nothing to do");
        return Ok(());
    }

    tracing::info!("starting relay bot");
    grelay_telegram::router::run_polling(cfg)
        .await
        .map_err(|e| grelay_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
