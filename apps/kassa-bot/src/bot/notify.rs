use async_trait::async_trait;
use kassa_db::repositories::UserRepository;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tracing::warn;

use crate::bot::texts;
use crate::services::pay_service::{CreditEvent, CreditListener, CreditSource};

/// Tells every admin about each paid bill.
pub struct AdminNotifyListener {
    bot: Bot,
    admins: Vec<i64>,
    users: UserRepository,
}

impl AdminNotifyListener {
    pub fn new(bot: Bot, admins: Vec<i64>, users: UserRepository) -> Self {
        Self { bot, admins, users }
    }
}

#[async_trait]
impl CreditListener for AdminNotifyListener {
    async fn on_credit(&self, event: &CreditEvent) {
        if event.source == CreditSource::Admin || self.admins.is_empty() {
            return;
        }

        let user = match self.users.get_by_tg_id(event.user_id).await {
            Ok(user) => user,
            Err(e) => {
                warn!(user_id = event.user_id, error = %e, "user lookup for admin notice failed");
                None
            }
        };
        let text = texts::admin_credit_notice(event, user.as_ref());

        for &admin in &self.admins {
            if let Err(e) = self
                .bot
                .send_message(ChatId(admin), text.clone())
                .parse_mode(ParseMode::Html)
                .await
            {
                warn!(admin, error = %e, "admin credit notice not delivered");
            }
        }
    }
}
