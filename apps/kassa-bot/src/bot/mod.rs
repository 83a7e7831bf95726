use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::{dptree, prelude::*, types::Update};
use tracing::{debug, error, info};

use crate::AppState;

pub mod dialogue;
pub mod filters;
pub mod handlers;
pub mod keyboards;
pub mod notify;
pub mod texts;

/// Guards first, then the regular handlers.
pub fn schema() -> UpdateHandler<teloxide::RequestError> {
    let messages = Update::filter_message()
        .branch(
            dptree::filter_async(filters::message_in_maintenance)
                .endpoint(handlers::guards::maintenance_message),
        )
        .branch(
            dptree::filter_async(filters::message_refill_blocked)
                .endpoint(handlers::guards::refill_disabled_message),
        )
        .branch(dptree::endpoint(handlers::command::message_handler));

    let callbacks = Update::filter_callback_query()
        .branch(
            dptree::filter_async(filters::callback_in_maintenance)
                .endpoint(handlers::guards::maintenance_callback),
        )
        .branch(
            dptree::filter_async(filters::callback_refill_blocked)
                .endpoint(handlers::guards::refill_disabled_callback),
        )
        .branch(dptree::endpoint(handlers::callback::callback_handler));

    dptree::entry().branch(messages).branch(callbacks)
}

pub async fn run_bot(bot: Bot, state: AppState) {
    info!("starting bot dispatcher");

    match bot.get_me().await {
        Ok(me) => {
            let username = me.username.clone().unwrap_or("unknown".into());
            info!(%username, "bot connected");
        }
        Err(e) => {
            error!(error = %e, "bot failed to connect to Telegram");
            return;
        }
    }

    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![state])
        .default_handler(|upd: Arc<Update>| async move {
            debug!(update_id = ?upd.id, "unhandled update");
        })
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("bot dispatcher exited");
}
