use kassa_db::repositories::UserRepository;
use std::collections::HashSet;
use std::sync::Arc;

use crate::bot::dialogue::DialogueStore;
use crate::services::pay_service::PayService;
use crate::services::referral_service::ReferralService;
use crate::services::settings_service::SettingsService;

#[derive(Clone)]
pub struct AppState {
    pub pay_service: PayService,
    pub referral_service: ReferralService,
    pub settings: SettingsService,
    pub users: UserRepository,
    pub dialogues: DialogueStore,
    admins: Arc<HashSet<i64>>,
}

impl AppState {
    pub fn new(
        pay_service: PayService,
        referral_service: ReferralService,
        settings: SettingsService,
        users: UserRepository,
        admins: Vec<i64>,
    ) -> Self {
        Self {
            pay_service,
            referral_service,
            settings,
            users,
            dialogues: DialogueStore::default(),
            admins: Arc::new(admins.into_iter().collect()),
        }
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admins.contains(&user_id)
    }
}

#[cfg(test)]
impl AppState {
    /// In-memory ledger and settings; the user repository points at a lazy pool
    /// that is never connected.
    pub fn for_tests(admins: Vec<i64>) -> Self {
        use crate::api_client::ApiClient;
        use crate::services::pay_service::RefillLimits;
        use kassa_db::memory::InMemoryLedger;
        use kassa_db::sqlx::postgres::PgPoolOptions;

        let settings = SettingsService::in_memory();
        let pay = PayService::new(
            Arc::new(InMemoryLedger::new()),
            settings.clone(),
            RefillLimits::default(),
        );
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://kassa@localhost/kassa")
            .unwrap();
        Self::new(
            pay,
            ReferralService::new(ApiClient::new("http://localhost".into(), String::new())),
            settings,
            UserRepository::new(pool),
            admins,
        )
    }
}
