use kassa_db::models::{Amount, ProviderKind};
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tracing::{error, info, warn};

use crate::bot::keyboards::{self, main_menu, PROFILE_BUTTON, REFILL_BUTTON};
use crate::bot::texts;
use crate::services::pay_service::CheckOutcome;
use crate::services::payment::PaymentError;
use crate::services::referral_service::{decode_referral_code, RegisterOutcome};
use crate::services::settings_service::{way_key, MAINTENANCE, REFILL_ENABLED, SUPPORT};
use crate::AppState;

const TEST_BALANCE: Amount = Amount::rubles(10_000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input<'a> {
    Start(Option<&'a str>),
    Refill,
    Profile,
    Referrals,
    TestBalance,
    Maintenance(Option<bool>),
    RefillSwitch(Option<bool>),
    Way(Option<ProviderKind>, Option<bool>),
    Support(&'a str),
    Text(&'a str),
}

fn parse_switch(arg: &str) -> Option<bool> {
    match arg.trim().to_ascii_lowercase().as_str() {
        "on" | "1" | "true" => Some(true),
        "off" | "0" | "false" => Some(false),
        _ => None,
    }
}

pub fn parse_input(text: &str) -> Input<'_> {
    let trimmed = text.trim();
    if trimmed == REFILL_BUTTON {
        return Input::Refill;
    }
    if trimmed == PROFILE_BUTTON {
        return Input::Profile;
    }
    if !trimmed.starts_with('/') {
        return Input::Text(trimmed);
    }

    let (head, args) = trimmed
        .split_once(char::is_whitespace)
        .map(|(h, a)| (h, a.trim()))
        .unwrap_or((trimmed, ""));
    let command = head.split('@').next().unwrap_or(head);

    match command {
        "/start" => Input::Start((!args.is_empty()).then_some(args)),
        "/refill" if args.is_empty() => Input::Refill,
        "/refill" => Input::RefillSwitch(parse_switch(args)),
        "/profile" => Input::Profile,
        "/my_referrals" | "/referrals" => Input::Referrals,
        "/test_balance" => Input::TestBalance,
        "/maintenance" => Input::Maintenance(parse_switch(args)),
        "/support" => Input::Support(args),
        "/way" => {
            let mut parts = args.split_whitespace();
            let kind = parts.next().and_then(|p| p.parse().ok());
            let on = parts.next().and_then(parse_switch);
            Input::Way(kind, on)
        }
        _ => Input::Text(trimmed),
    }
}

pub async fn message_handler(
    bot: Bot,
    msg: Message,
    state: AppState,
) -> Result<(), teloxide::RequestError> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let chat_id = msg.chat.id;
    let user_id = msg
        .from
        .as_ref()
        .map(|u| u.id.0 as i64)
        .unwrap_or(chat_id.0);

    let input = match parse_input(text) {
        Input::RefillSwitch(_) if !state.is_admin(user_id) => Input::Refill,
        Input::TestBalance | Input::Maintenance(_) | Input::Way(..) | Input::Support(_)
            if !state.is_admin(user_id) =>
        {
            Input::Text(text)
        }
        input => input,
    };

    match input {
        Input::Start(payload) => {
            state.dialogues.clear(chat_id.0).await;
            let username = msg.from.as_ref().and_then(|u| u.username.clone());
            let full_name = msg.from.as_ref().map(|u| u.full_name());
            if let Err(e) = state
                .users
                .upsert(user_id, username.as_deref(), full_name.as_deref())
                .await
            {
                error!(error = ?e, "failed to upsert user on /start");
            }

            if let Some(payload) = payload {
                handle_referral(&bot, &state, chat_id, user_id, payload).await;
            }

            let support = state.settings.get(SUPPORT).await;
            let _ = bot
                .send_message(chat_id, texts::greeting(support.as_deref()))
                .reply_markup(main_menu())
                .await
                .map_err(|e| error!(error = %e, "failed to send greeting"));
        }

        Input::Refill => {
            state.dialogues.clear(chat_id.0).await;
            send_provider_choice(&bot, &state, chat_id).await;
        }

        Input::Profile => {
            state.dialogues.clear(chat_id.0).await;
            let user = match state.users.get_by_tg_id(user_id).await {
                Ok(Some(user)) => Ok(user),
                Ok(None) => state.users.upsert(user_id, None, None).await,
                Err(e) => Err(e),
            };
            match user {
                Ok(user) => {
                    let _ = bot
                        .send_message(chat_id, texts::profile(&user))
                        .parse_mode(ParseMode::Html)
                        .reply_markup(keyboards::profile_keyboard())
                        .await
                        .map_err(|e| error!(error = %e, "failed to send profile"));
                }
                Err(e) => {
                    error!(user_id, error = ?e, "failed to load profile");
                    let _ = bot.send_message(chat_id, "❌ Не удалось загрузить профиль.").await;
                }
            }
        }

        Input::Referrals => send_referrals(&bot, &state, chat_id, user_id).await,

        Input::TestBalance => match state.pay_service.test_credit(user_id, TEST_BALANCE).await {
            Ok(CheckOutcome::Credited { amount, balance, .. }) => {
                info!(user_id, amount = %amount, "admin test refill");
                let _ = bot
                    .send_message(chat_id, texts::credited(amount, balance))
                    .parse_mode(ParseMode::Html)
                    .await;
            }
            Ok(other) => warn!(user_id, outcome = ?other, "test refill not credited"),
            Err(e) => {
                error!(error = %e, "test refill failed");
                let _ = bot
                    .send_message(chat_id, texts::payment_error(&e))
                    .parse_mode(ParseMode::Html)
                    .await;
            }
        },

        Input::Maintenance(on) => {
            toggle(&bot, &state, chat_id, MAINTENANCE, on, "/maintenance on|off").await
        }

        Input::RefillSwitch(on) => {
            toggle(&bot, &state, chat_id, REFILL_ENABLED, on, "/refill on|off").await
        }

        Input::Way(Some(kind), on) => {
            toggle(&bot, &state, chat_id, &way_key(kind), on, "/way <cactuspay|qiwi|yoomoney> on|off").await
        }

        Input::Way(None, _) => {
            let _ = bot
                .send_message(chat_id, "Использование: /way <cactuspay|qiwi|yoomoney> on|off")
                .await;
        }

        Input::Support(contact) => {
            let reply = match state.settings.set(SUPPORT, contact).await {
                Ok(()) if contact.is_empty() => "✅ Контакт поддержки убран".to_string(),
                Ok(()) => format!("✅ Контакт поддержки: {contact}"),
                Err(e) => {
                    error!(error = ?e, "failed to save support contact");
                    "⚠️ Контакт изменён, но не сохранён в БД".to_string()
                }
            };
            let _ = bot.send_message(chat_id, reply).await;
        }

        Input::Text(text) => match state.dialogues.awaiting_amount(chat_id.0).await {
            Some(provider) => handle_amount(&bot, &state, chat_id, user_id, provider, text).await,
            None => {
                let _ = bot
                    .send_message(chat_id, texts::UNKNOWN_INPUT)
                    .reply_markup(main_menu())
                    .await;
            }
        },
    }

    Ok(())
}

async fn handle_referral(bot: &Bot, state: &AppState, chat_id: ChatId, user_id: i64, payload: &str) {
    let Some(referrer_id) = decode_referral_code(payload) else {
        warn!(user_id, payload, "invalid referral code");
        return;
    };
    if referrer_id == user_id {
        warn!(user_id, "self referral ignored");
        return;
    }

    match state.referral_service.register_click(user_id, referrer_id).await {
        Ok(RegisterOutcome::Registered) => {
            if let Err(e) = state
                .users
                .set_referrer(user_id, &referrer_id.to_string())
                .await
            {
                error!(user_id, error = ?e, "failed to store referrer");
            }
            let _ = bot.send_message(chat_id, texts::REFERRAL_REGISTERED).await;
        }
        Ok(RegisterOutcome::AlreadyReferred) => {
            let _ = bot.send_message(chat_id, texts::ALREADY_REFERRED).await;
        }
        Ok(RegisterOutcome::Rejected(reason)) => {
            warn!(user_id, referrer_id, reason = %reason, "referral rejected by backend");
        }
        Err(e) => error!(error = ?e, "referral registration failed"),
    }
}

pub async fn send_provider_choice(bot: &Bot, state: &AppState, chat_id: ChatId) {
    let providers = state.pay_service.enabled_providers().await;
    let request = if providers.is_empty() {
        bot.send_message(chat_id, texts::NO_PROVIDERS)
    } else {
        bot.send_message(chat_id, texts::CHOOSE_PROVIDER)
            .parse_mode(ParseMode::Html)
            .reply_markup(keyboards::providers_keyboard(&providers))
    };
    let _ = request
        .await
        .map_err(|e| error!(error = %e, "failed to send provider choice"));
}

pub async fn send_referrals(bot: &Bot, state: &AppState, chat_id: ChatId, user_id: i64) {
    let text = match state.referral_service.list_referrals(user_id).await {
        Ok(summary) => texts::referrals(&summary),
        Err(e) => {
            warn!(user_id, error = %e, "referral list unavailable");
            "❗ Не удалось загрузить список рефералов. Попробуйте позже.".to_string()
        }
    };
    let _ = bot
        .send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .await
        .map_err(|e| error!(error = %e, "failed to send referrals"));
}

async fn handle_amount(
    bot: &Bot,
    state: &AppState,
    chat_id: ChatId,
    user_id: i64,
    provider: ProviderKind,
    text: &str,
) {
    let Ok(amount) = Amount::parse(text) else {
        let _ = bot.send_message(chat_id, texts::NOT_AN_AMOUNT).await;
        return;
    };

    match state.pay_service.create_bill(user_id, provider, amount).await {
        Ok(bill) => {
            state.dialogues.clear(chat_id.0).await;
            let _ = bot
                .send_message(chat_id, texts::bill_message(&bill))
                .parse_mode(ParseMode::Html)
                .reply_markup(keyboards::bill_keyboard(&bill))
                .await
                .map_err(|e| error!(error = %e, "failed to send bill"));
        }
        Err(e) => {
            if !matches!(e, PaymentError::AmountOutOfRange { .. }) {
                state.dialogues.clear(chat_id.0).await;
                error!(user_id, provider = %provider, error = %e, "bill creation failed");
            }
            let _ = bot
                .send_message(chat_id, texts::payment_error(&e))
                .parse_mode(ParseMode::Html)
                .await;
        }
    }
}

async fn toggle(
    bot: &Bot,
    state: &AppState,
    chat_id: ChatId,
    key: &str,
    on: Option<bool>,
    usage: &str,
) {
    let Some(on) = on else {
        let _ = bot
            .send_message(chat_id, format!("Использование: {usage}"))
            .await;
        return;
    };

    let reply = match state.settings.set_flag(key, on).await {
        Ok(()) => {
            info!(key, on, "setting changed");
            format!("✅ {key} = {}", if on { "on" } else { "off" })
        }
        Err(e) => {
            error!(key, error = ?e, "failed to save setting");
            format!("⚠️ {key} = {} (не сохранено в БД)", if on { "on" } else { "off" })
        }
    };
    let _ = bot.send_message(chat_id, reply).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn menu_buttons_and_commands() {
        assert_eq!(parse_input("💰 Пополнить"), Input::Refill);
        assert_eq!(parse_input("/refill"), Input::Refill);
        assert_eq!(parse_input("👤 Профиль"), Input::Profile);
        assert_eq!(parse_input("/my_referrals"), Input::Referrals);
        assert_eq!(parse_input("/referrals@kassa_bot"), Input::Referrals);
    }

    #[test]
    fn start_payload() {
        assert_eq!(parse_input("/start"), Input::Start(None));
        assert_eq!(parse_input("/start ref_3_ABC"), Input::Start(Some("ref_3_ABC")));
    }

    #[test]
    fn admin_switches() {
        assert_eq!(parse_input("/maintenance on"), Input::Maintenance(Some(true)));
        assert_eq!(parse_input("/refill OFF"), Input::RefillSwitch(Some(false)));
        assert_eq!(parse_input("/refill maybe"), Input::RefillSwitch(None));
        assert_eq!(parse_input("/maintenance"), Input::Maintenance(None));
        assert_eq!(
            parse_input("/way qiwi off"),
            Input::Way(Some(ProviderKind::Qiwi), Some(false))
        );
        assert_eq!(parse_input("/way paypal on"), Input::Way(None, Some(true)));
        assert_eq!(parse_input("/support @helpdesk"), Input::Support("@helpdesk"));
    }

    #[test]
    fn anything_else_is_text() {
        assert_eq!(parse_input(" 150,50 "), Input::Text("150,50"));
        assert_eq!(parse_input("/unknown"), Input::Text("/unknown"));
    }
}
