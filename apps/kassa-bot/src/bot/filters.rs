use teloxide::types::{CallbackQuery, Message};

use crate::bot::handlers::callback::CallbackAction;
use crate::bot::handlers::command::{Input, parse_input};
use crate::state::AppState;

pub fn is_refill_callback(data: &str) -> bool {
    matches!(
        CallbackAction::parse(data),
        Some(CallbackAction::Refill | CallbackAction::RefillMethod(_) | CallbackAction::Pay { .. })
    )
}

fn message_user_id(msg: &Message) -> i64 {
    msg.from
        .as_ref()
        .map(|u| u.id.0 as i64)
        .unwrap_or(msg.chat.id.0)
}

pub async fn blocked_by_maintenance(state: &AppState, user_id: i64) -> bool {
    !state.is_admin(user_id) && state.settings.is_maintenance().await
}

pub async fn message_in_maintenance(msg: Message, state: AppState) -> bool {
    blocked_by_maintenance(&state, message_user_id(&msg)).await
}

pub async fn callback_in_maintenance(q: CallbackQuery, state: AppState) -> bool {
    blocked_by_maintenance(&state, q.from.id.0 as i64).await
}

/// Refill entry points and amount input while refills are switched off.
pub async fn message_refill_blocked(msg: Message, state: AppState) -> bool {
    if state.settings.is_refill_enabled().await {
        return false;
    }
    match msg.text().map(parse_input) {
        Some(Input::Refill) => true,
        Some(Input::RefillSwitch(_)) => !state.is_admin(message_user_id(&msg)),
        Some(Input::Text(_)) => state.dialogues.awaiting_amount(msg.chat.id.0).await.is_some(),
        _ => false,
    }
}

pub async fn callback_refill_blocked(q: CallbackQuery, state: AppState) -> bool {
    let is_refill = q.data.as_deref().is_some_and(is_refill_callback);
    is_refill && !state.settings.is_refill_enabled().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::settings_service::MAINTENANCE;

    fn state() -> AppState {
        AppState::for_tests(vec![1])
    }

    #[test]
    fn refill_callbacks_are_recognized() {
        assert!(is_refill_callback("user_refill"));
        assert!(is_refill_callback("user_refill_method:QIWI"));
        assert!(is_refill_callback("Pay:Yoomoney:1234567890"));
        assert!(!is_refill_callback("user_referrals"));
        assert!(!is_refill_callback("Pay:PayPal:1"));
    }

    #[tokio::test]
    async fn maintenance_spares_admins() {
        let state = state();
        assert!(!blocked_by_maintenance(&state, 2).await);

        state.settings.set_flag(MAINTENANCE, true).await.unwrap();
        assert!(blocked_by_maintenance(&state, 2).await);
        assert!(!blocked_by_maintenance(&state, 1).await);
    }
}
