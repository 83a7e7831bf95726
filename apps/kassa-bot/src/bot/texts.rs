use kassa_db::models::{Amount, User};

use crate::services::pay_service::{Bill, CheckOutcome, CreditEvent, CreditSource, RefillLimits};
use crate::services::payment::{PaymentError, PaymentStatus};
use crate::services::referral_service::ReferralSummary;

pub const MAINTENANCE: &str = "🛠 Бот находится на технических работах. Попробуйте позже.";
pub const REFILL_DISABLED: &str = "⛔ Пополнение временно отключено.";
pub const NO_PROVIDERS: &str = "⛔ Сейчас нет доступных способов пополнения.";
pub const REFERRAL_REGISTERED: &str =
    "🎁 Вы перешли по реферальной ссылке!\nВаш партнёр будет получать 60% от ваших проигрышей.";
pub const ALREADY_REFERRED: &str = "ℹ️ Вы уже зарегистрированы по реферальной ссылке ранее.";
pub const CHOOSE_PROVIDER: &str = "<b>💰 Выберите способ пополнения</b>";
pub const NOT_AN_AMOUNT: &str = "❗ Данные были введены неверно. Введите сумму числом.";
pub const UNKNOWN_INPUT: &str = "🔸 Используйте кнопки меню.\n🔸 Если кнопки не появились, введите /start";

const REFERRALS_SHOWN: usize = 20;

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub fn rub(amount: Amount) -> String {
    format!("{amount}₽")
}

pub fn greeting(support: Option<&str>) -> String {
    let mut text =
        "🔸 Бот готов к использованию.\n🔸 Если не появились вспомогательные кнопки\n🔸 Введите /start"
            .to_string();
    if let Some(support) = support.filter(|s| !s.trim().is_empty()) {
        text.push_str(&format!("\n☎️ Поддержка: {support}"));
    }
    text
}

pub fn amount_prompt(limits: RefillLimits) -> String {
    format!(
        "<b>💰 Введите сумму пополнения</b>\nОт {} до {}",
        rub(limits.min),
        rub(limits.max)
    )
}

pub fn bill_message(bill: &Bill) -> String {
    format!(
        "<b>💰 Пополнение баланса</b>\n\
         ➖➖➖➖➖➖➖➖➖➖\n\
         ▪️ Для пополнения баланса нажмите на кнопку ниже <code>Перейти к оплате</code> и оплатите выставленный вам счёт\n\
         ▪️ Комментарий: <code>{}</code>\n\
         ▪️ Сумма пополнения: <code>{}</code>\n\
         ➖➖➖➖➖➖➖➖➖➖\n\
         ❗️ После оплаты нажмите на <code>Проверить оплату</code>",
        bill.receipt,
        rub(bill.amount)
    )
}

pub fn profile(user: &User) -> String {
    format!(
        "<b>👤 Профиль</b>\n\
         ➖➖➖➖➖➖➖➖➖➖\n\
         ▪️ ID: <code>{}</code>\n\
         ▪️ Логин: {}\n\
         ▪️ Баланс: <code>{}</code>\n\
         ▪️ Всего пополнено: <code>{}</code>",
        user.tg_id,
        escape_html(&user.display_name()),
        rub(user.balance),
        rub(user.total_refill)
    )
}

pub fn credited(amount: Amount, balance: Amount) -> String {
    format!(
        "<b>✅ Вы успешно пополнили баланс на сумму {}</b>\n▪️ Текущий баланс: <code>{}</code>",
        rub(amount),
        rub(balance)
    )
}

/// Sent to every admin after a fresh credit.
pub fn admin_credit_notice(event: &CreditEvent, user: Option<&User>) -> String {
    let login = user
        .and_then(|u| u.username.as_deref())
        .map(|name| format!("@{}", escape_html(name)))
        .unwrap_or_else(|| "без логина".to_string());
    let name = user
        .and_then(|u| u.full_name.as_deref())
        .map(escape_html)
        .unwrap_or_else(|| event.user_id.to_string());
    let way = match event.source {
        CreditSource::Provider(kind) => kind.label(),
        CreditSource::Admin => "тест",
    };
    format!(
        "👤 Пользователь: <b>{login}</b> | <a href='tg://user?id={id}'>{name}</a> | <code>{id}</code>\n\
         💰 Сумма пополнения: <code>{amount}</code> ({way})\n\
         🧾 Чек: <code>#{receipt}</code>",
        id = event.user_id,
        amount = rub(event.amount),
        receipt = escape_html(&event.receipt),
    )
}

/// Callback alert for a check that did not credit anything.
pub fn check_alert(outcome: &CheckOutcome) -> String {
    match outcome {
        CheckOutcome::Credited { amount, .. } => format!("✅ Баланс пополнен на {}", rub(*amount)),
        CheckOutcome::AlreadyCredited => "❗ Ваше пополнение уже было зачислено.".to_string(),
        CheckOutcome::NotPaid(status) => status_alert(status).to_string(),
    }
}

fn status_alert(status: &PaymentStatus) -> &'static str {
    match status {
        PaymentStatus::Success { .. } => "✅ Оплата найдена",
        PaymentStatus::Pending => "❗ Платёж не был найден.\n⌛ Попробуйте чуть позже.",
        PaymentStatus::WrongCurrency => "❗ Оплата была произведена не в рублях.",
        PaymentStatus::Cancelled => "❗ Счёт отменён или просрочен. Создайте новый.",
        PaymentStatus::Error => "❗ Не удалось проверить платёж.\n⌛ Попробуйте чуть позже.",
        PaymentStatus::Unknown(_) => "❗ Неизвестный статус платежа.\n⌛ Попробуйте чуть позже.",
    }
}

pub fn payment_error(err: &PaymentError) -> String {
    match err {
        PaymentError::AmountOutOfRange { min, max, .. } => format!(
            "❌ Неверная сумма пополнения\n▶️ Cумма не должна быть меньше <code>{}</code> и больше <code>{}</code>",
            rub(*min),
            rub(*max)
        ),
        PaymentError::ProviderDisabled(kind) => {
            format!("❗ Способ пополнения {} временно недоступен.", kind.label())
        }
        PaymentError::UnknownReceipt(_) | PaymentError::NotOwner(_) => {
            "❗ Счёт не найден.".to_string()
        }
        PaymentError::Provider { .. } | PaymentError::Http(_) => {
            "❌ Ошибка создания платежа. Попробуйте позже или обратитесь в поддержку.".to_string()
        }
        PaymentError::Storage(_) => "❌ Внутренняя ошибка. Попробуйте позже.".to_string(),
    }
}

pub fn referrals(summary: &ReferralSummary) -> String {
    if summary.referrals.is_empty() {
        return "<b>👥 Мои рефералы</b>\n\nУ вас пока нет рефералов.".to_string();
    }

    let mut text = format!(
        "<b>👥 Мои рефералы</b> ({})\n\n",
        summary.referrals.len()
    );
    for (i, referral) in summary.referrals.iter().take(REFERRALS_SHOWN).enumerate() {
        text.push_str(&format!(
            "{}. {} | депозиты: {:.2}₽ | проигрыши: {:.2}₽\n",
            i + 1,
            escape_html(&referral.display_name()),
            referral.total_deposits,
            referral.total_losses
        ));
    }
    if summary.referrals.len() > REFERRALS_SHOWN {
        text.push_str(&format!(
            "… и ещё {}\n",
            summary.referrals.len() - REFERRALS_SHOWN
        ));
    }
    text.push_str(&format!("\n💰 Заработано: {:.2}₽", summary.stats.earnings));
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::referral_service::{Referral, ReferralStats};
    use kassa_db::models::ProviderKind;
    use serde_json::json;

    fn referral(n: usize) -> Referral {
        Referral {
            user_id: json!(n),
            nickname: None,
            total_deposits: 100.0,
            total_losses: 0.5,
        }
    }

    #[test]
    fn greeting_mentions_support_when_configured() {
        assert!(!greeting(None).contains("Поддержка"));
        assert!(!greeting(Some(" ")).contains("Поддержка"));
        assert!(greeting(Some("@help")).ends_with("Поддержка: @help"));
    }

    #[test]
    fn amounts_render_in_roubles() {
        assert_eq!(rub(Amount::rubles(150)), "150₽");
        assert_eq!(rub(Amount::from_kopecks(15_050).unwrap()), "150.50₽");
    }

    #[test]
    fn bill_message_names_receipt_and_amount() {
        let text = bill_message(&Bill {
            receipt: "1234567890".into(),
            url: "https://pay".into(),
            amount: Amount::rubles(300),
            provider: ProviderKind::Qiwi,
        });
        assert!(text.contains("<code>1234567890</code>"));
        assert!(text.contains("<code>300₽</code>"));
    }

    #[test]
    fn pending_and_error_alerts_differ() {
        let pending = check_alert(&CheckOutcome::NotPaid(PaymentStatus::Pending));
        let error = check_alert(&CheckOutcome::NotPaid(PaymentStatus::Error));
        assert_ne!(pending, error);
        assert!(check_alert(&CheckOutcome::AlreadyCredited).contains("уже"));
    }

    #[test]
    fn out_of_range_error_shows_bounds() {
        let text = payment_error(&PaymentError::AmountOutOfRange {
            amount: Amount::rubles(5),
            min: Amount::rubles(100),
            max: Amount::rubles(100_000),
        });
        assert!(text.contains("100₽"));
        assert!(text.contains("100000₽"));
    }

    #[test]
    fn referral_list_is_capped_and_escaped() {
        let mut list: Vec<Referral> = (1..=25).map(referral).collect();
        list[0].nickname = Some("<b>eve</b>".into());
        let text = referrals(&ReferralSummary {
            referrals: list,
            stats: ReferralStats { earnings: 12.0 },
        });

        assert!(text.contains("&lt;b&gt;eve&lt;/b&gt;"));
        assert!(text.contains("20. 20 |"));
        assert!(!text.contains("21. 21 |"));
        assert!(text.contains("и ещё 5"));
        assert!(text.contains("12.00₽"));
    }

    #[test]
    fn empty_referral_list() {
        assert!(referrals(&ReferralSummary::default()).contains("нет рефералов"));
    }

    fn provider_credit() -> CreditEvent {
        CreditEvent {
            user_id: 42,
            receipt: "1234567890".into(),
            amount: Amount::rubles(150),
            balance: Amount::rubles(250),
            first_deposit: false,
            source: CreditSource::Provider(ProviderKind::Qiwi),
            method: None,
        }
    }

    #[test]
    fn admin_notice_names_user_amount_and_receipt() {
        let mut user = User::new(42);
        user.username = Some("ivan".into());
        user.full_name = Some("Ivan <Petrov>".into());

        let text = admin_credit_notice(&provider_credit(), Some(&user));
        assert!(text.contains("<b>@ivan</b>"));
        assert!(text.contains("<a href='tg://user?id=42'>Ivan &lt;Petrov&gt;</a>"));
        assert!(text.contains("<code>150₽</code> (QIWI)"));
        assert!(text.contains("<code>#1234567890</code>"));
    }

    #[test]
    fn admin_notice_without_stored_user() {
        let text = admin_credit_notice(&provider_credit(), None);
        assert!(text.contains("без логина"));
        assert!(text.contains("<a href='tg://user?id=42'>42</a>"));
    }
}
