use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use tracing::error;

use crate::bot::texts;
use crate::state::AppState;

fn callback_chat(q: &CallbackQuery) -> ChatId {
    q.message
        .as_ref()
        .map(|m| m.chat().id)
        .unwrap_or(ChatId(q.from.id.0 as i64))
}

pub async fn maintenance_message(
    bot: Bot,
    msg: Message,
    state: AppState,
) -> Result<(), teloxide::RequestError> {
    state.dialogues.clear(msg.chat.id.0).await;
    let _ = bot
        .send_message(msg.chat.id, texts::MAINTENANCE)
        .await
        .map_err(|e| error!(error = %e, "failed to send maintenance notice"));
    Ok(())
}

pub async fn maintenance_callback(
    bot: Bot,
    q: CallbackQuery,
    state: AppState,
) -> Result<(), teloxide::RequestError> {
    state.dialogues.clear(callback_chat(&q).0).await;
    let _ = bot
        .answer_callback_query(q.id)
        .text(texts::MAINTENANCE)
        .show_alert(true)
        .await;
    Ok(())
}

pub async fn refill_disabled_message(
    bot: Bot,
    msg: Message,
    state: AppState,
) -> Result<(), teloxide::RequestError> {
    state.dialogues.clear(msg.chat.id.0).await;
    let _ = bot
        .send_message(msg.chat.id, texts::REFILL_DISABLED)
        .await
        .map_err(|e| error!(error = %e, "failed to send refill notice"));
    Ok(())
}

pub async fn refill_disabled_callback(
    bot: Bot,
    q: CallbackQuery,
    state: AppState,
) -> Result<(), teloxide::RequestError> {
    state.dialogues.clear(callback_chat(&q).0).await;
    let _ = bot
        .answer_callback_query(q.id)
        .text(texts::REFILL_DISABLED)
        .show_alert(true)
        .await;
    Ok(())
}
