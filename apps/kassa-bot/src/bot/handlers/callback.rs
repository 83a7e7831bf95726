use kassa_db::models::ProviderKind;
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, ChatId, ParseMode};
use tracing::{error, info, warn};

use crate::bot::handlers::command::{send_provider_choice, send_referrals};
use crate::bot::texts;
use crate::services::pay_service::CheckOutcome;
use crate::AppState;

/// Inline button payloads. Telegram caps them at 64 bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    Refill,
    RefillMethod(ProviderKind),
    Pay {
        provider: ProviderKind,
        receipt: String,
    },
    Referrals,
}

impl CallbackAction {
    pub fn parse(data: &str) -> Option<Self> {
        match data {
            "user_refill" => return Some(Self::Refill),
            "user_referrals" => return Some(Self::Referrals),
            _ => {}
        }
        if let Some(provider) = data.strip_prefix("user_refill_method:") {
            return provider.parse().ok().map(Self::RefillMethod);
        }
        let (provider, receipt) = data.strip_prefix("Pay:")?.split_once(':')?;
        if receipt.is_empty() {
            return None;
        }
        Some(Self::Pay {
            provider: provider.parse().ok()?,
            receipt: receipt.to_string(),
        })
    }

    pub fn to_data(&self) -> String {
        match self {
            Self::Refill => "user_refill".to_string(),
            Self::Referrals => "user_referrals".to_string(),
            Self::RefillMethod(provider) => format!("user_refill_method:{}", provider.label()),
            Self::Pay { provider, receipt } => format!("Pay:{}:{}", provider.label(), receipt),
        }
    }
}

pub async fn callback_handler(
    bot: Bot,
    q: CallbackQuery,
    state: AppState,
) -> Result<(), teloxide::RequestError> {
    info!(data = ?q.data, "received callback");
    let callback_id = q.id.clone();
    let user_id = q.from.id.0 as i64;
    let chat_id = q
        .message
        .as_ref()
        .map(|m| m.chat().id)
        .unwrap_or(ChatId(user_id));

    let Some(action) = q.data.as_deref().and_then(CallbackAction::parse) else {
        let _ = bot.answer_callback_query(callback_id).await;
        return Ok(());
    };

    match action {
        CallbackAction::Refill => {
            let _ = bot.answer_callback_query(callback_id).await;
            send_provider_choice(&bot, &state, chat_id).await;
        }

        CallbackAction::RefillMethod(provider) => {
            let limits = state.pay_service.limits_for(provider);
            let enabled = state.pay_service.enabled_providers().await.contains(&provider);
            let Some(limits) = limits.filter(|_| enabled) else {
                let _ = bot
                    .answer_callback_query(callback_id)
                    .text(format!("❗ Способ пополнения {} временно недоступен.", provider.label()))
                    .show_alert(true)
                    .await;
                return Ok(());
            };

            state.dialogues.await_amount(chat_id.0, provider).await;
            let _ = bot.answer_callback_query(callback_id).await;
            let _ = bot
                .send_message(chat_id, texts::amount_prompt(limits))
                .parse_mode(ParseMode::Html)
                .await
                .map_err(|e| error!(error = %e, "failed to send amount prompt"));
        }

        CallbackAction::Pay { provider, receipt } => {
            match state.pay_service.check_bill(user_id, provider, &receipt).await {
                Ok(outcome @ CheckOutcome::Credited { amount, balance, .. }) => {
                    let _ = bot
                        .answer_callback_query(callback_id)
                        .text(texts::check_alert(&outcome))
                        .await;
                    if let Some(msg) = q.message.as_ref() {
                        let _ = bot.delete_message(msg.chat().id, msg.id()).await;
                    }
                    let _ = bot
                        .send_message(chat_id, texts::credited(amount, balance))
                        .parse_mode(ParseMode::Html)
                        .await
                        .map_err(|e| error!(error = %e, "failed to send refill confirmation"));
                }
                Ok(outcome) => {
                    let _ = bot
                        .answer_callback_query(callback_id)
                        .text(texts::check_alert(&outcome))
                        .show_alert(true)
                        .await;
                }
                Err(e) => {
                    warn!(user_id, receipt = %receipt, error = %e, "bill check rejected");
                    let _ = bot
                        .answer_callback_query(callback_id)
                        .text(texts::payment_error(&e))
                        .show_alert(true)
                        .await;
                }
            }
        }

        CallbackAction::Referrals => {
            let _ = bot.answer_callback_query(callback_id).await;
            send_referrals(&bot, &state, chat_id, user_id).await;
        }
    }

    Ok(())
}
