use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use subinfo_core::{config::Config, context::RuntimeContext, messaging::port::MessagingPort};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub ctx: Arc<RuntimeContext>,
    pub messenger: Arc<dyn MessagingPort>,
}

/// Long-poll Telegram until Ctrl-C, then cancel any batch still in flight.
pub async fn run_polling(cfg: Arc<Config>, ctx: Arc<RuntimeContext>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    // Basic startup info.
    match bot.get_me().await {
        Ok(me) => tracing::info!(username = %me.username(), "bot started"),
        Err(e) => tracing::warn!(error = %e, "getMe failed; continuing"),
    }
    tracing::info!(
        max_concurrent = ctx.dispatcher().capacity(),
        providers = ctx.providers().len(),
        "accepting subscription batches"
    );

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let state = Arc::new(AppState {
        cfg,
        ctx: ctx.clone(),
        messenger,
    });

    // Abandon pending batches as soon as Ctrl-C arrives, so the dispatcher below
    // does not wait on in-flight fetches while it drains handlers.
    {
        let ctx = ctx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                ctx.shutdown();
            }
        });
    }

    // Batches run concurrently; admission is bounded by the dispatcher, not here.
    let handler = dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .distribution_function(|_| None::<std::convert::Infallible>)
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    tracing::info!("shutting down");
    ctx.shutdown();

    Ok(())
}
