use kassa_db::models::ProviderKind;
use reqwest::Url;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup};
use tracing::warn;

use crate::bot::handlers::callback::CallbackAction;
use crate::services::pay_service::Bill;

pub const REFILL_BUTTON: &str = "💰 Пополнить";
pub const PROFILE_BUTTON: &str = "👤 Профиль";

pub fn main_menu() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![vec![
        KeyboardButton::new(REFILL_BUTTON),
        KeyboardButton::new(PROFILE_BUTTON),
    ]])
    .resize_keyboard()
}

pub fn providers_keyboard(providers: &[ProviderKind]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(providers.iter().map(|kind| {
        vec![InlineKeyboardButton::callback(
            format!("💳 {}", kind.label()),
            CallbackAction::RefillMethod(*kind).to_data(),
        )]
    }))
}

pub fn bill_keyboard(bill: &Bill) -> InlineKeyboardMarkup {
    let check = InlineKeyboardButton::callback(
        "🔄 Проверить оплату",
        CallbackAction::Pay {
            provider: bill.provider,
            receipt: bill.receipt.clone(),
        }
        .to_data(),
    );

    let mut rows = Vec::new();
    match Url::parse(&bill.url) {
        Ok(url) => rows.push(vec![InlineKeyboardButton::url("🌀 Перейти к оплате", url)]),
        Err(e) => warn!(receipt = %bill.receipt, error = %e, "pay button dropped"),
    }
    rows.push(vec![check]);
    InlineKeyboardMarkup::new(rows)
}

pub fn profile_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback(
            REFILL_BUTTON,
            CallbackAction::Refill.to_data(),
        )],
        vec![InlineKeyboardButton::callback(
            "👥 Мои рефералы",
            CallbackAction::Referrals.to_data(),
        )],
    ])
}
