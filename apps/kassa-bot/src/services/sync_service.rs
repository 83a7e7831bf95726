use anyhow::{anyhow, Result};
use async_trait::async_trait;
use kassa_db::models::Amount;
use kassa_db::repositories::UserRepository;
use serde_json::json;
use tracing::{debug, warn};

use crate::api_client::ApiClient;
use crate::services::pay_service::{CreditEvent, CreditListener, CreditSource};
use crate::services::referral_service::ReferralService;

/// Mirrors bot-side balance changes into the web backend.
#[derive(Clone)]
pub struct SyncService {
    api: ApiClient,
}

impl SyncService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub fn is_configured(&self) -> bool {
        self.api.has_secret()
    }

    /// Sets the absolute balance shown in the mini-app.
    pub async fn push_balance(&self, user_id: i64, balance: Amount) -> Result<()> {
        let (status, body) = self
            .api
            .post_raw(
                &format!("/api/balance/{user_id}"),
                &json!({ "rubles": balance.as_rubles(), "chips": 0 }),
            )
            .await?;
        if !status.is_success() {
            return Err(anyhow!("balance sync returned {status}: {body}"));
        }
        Ok(())
    }

    pub async fn record_transaction(&self, user_id: i64, amount: Amount, description: &str) -> Result<()> {
        let (status, body) = self
            .api
            .post_raw(
                &format!("/api/transactions/{user_id}"),
                &json!({
                    "type": "add",
                    "amount": amount.as_rubles(),
                    "source": "bot",
                    "description": description,
                }),
            )
            .await?;
        if !status.is_success() {
            return Err(anyhow!("transaction record returned {status}: {body}"));
        }
        Ok(())
    }
}

/// Pushes every fresh credit to the backend and, for referred users, to the
/// referral program. Failures are logged and dropped.
pub struct BackendCreditListener {
    sync: SyncService,
    referrals: ReferralService,
    users: UserRepository,
}

impl BackendCreditListener {
    pub fn new(sync: SyncService, referrals: ReferralService, users: UserRepository) -> Self {
        Self {
            sync,
            referrals,
            users,
        }
    }
}

pub fn transaction_description(source: CreditSource, method: Option<&str>) -> String {
    match (source, method) {
        (CreditSource::Provider(kind), Some(method)) => {
            format!("Пополнение через {} ({})", kind.label(), method)
        }
        (CreditSource::Provider(kind), None) => format!("Пополнение через {}", kind.label()),
        (CreditSource::Admin, _) => "Тестовое пополнение".to_string(),
    }
}

#[async_trait]
impl CreditListener for BackendCreditListener {
    async fn on_credit(&self, event: &CreditEvent) {
        if !self.sync.is_configured() {
            debug!(user_id = event.user_id, "backend secret not set, skipping sync");
            return;
        }

        if let Err(e) = self.sync.push_balance(event.user_id, event.balance).await {
            warn!(user_id = event.user_id, error = %e, "balance sync failed");
        }

        let description = transaction_description(event.source, event.method.as_deref());
        if let Err(e) = self
            .sync
            .record_transaction(event.user_id, event.amount, &description)
            .await
        {
            warn!(user_id = event.user_id, error = %e, "transaction record failed");
        }

        if event.source == CreditSource::Admin {
            return;
        }
        let referrer = match self.users.get_by_tg_id(event.user_id).await {
            Ok(user) => user.and_then(|u| u.referrer),
            Err(e) => {
                warn!(user_id = event.user_id, error = %e, "referrer lookup failed");
                None
            }
        };
        if let Some(referrer) = referrer {
            if let Err(e) = self
                .referrals
                .register_deposit(event.user_id, &referrer, event.amount, event.first_deposit)
                .await
            {
                warn!(user_id = event.user_id, error = %e, "referral deposit not reported");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kassa_db::models::ProviderKind;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn pushes_absolute_balance() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/balance/7"))
            .and(header("X-API-Secret", "s"))
            .and(body_json(json!({"rubles": 250.5, "chips": 0})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let sync = SyncService::new(ApiClient::new(server.uri(), "s".into()));
        sync.push_balance(7, Amount::from_kopecks(25_050).unwrap())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn records_add_transaction() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/transactions/7"))
            .and(body_json(json!({
                "type": "add",
                "amount": 100.0,
                "source": "bot",
                "description": "Пополнение через QIWI",
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let sync = SyncService::new(ApiClient::new(server.uri(), "s".into()));
        let description = transaction_description(CreditSource::Provider(ProviderKind::Qiwi), None);
        sync.record_transaction(7, Amount::rubles(100), &description)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn backend_errors_surface() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let sync = SyncService::new(ApiClient::new(server.uri(), "wrong".into()));
        assert!(sync.push_balance(7, Amount::rubles(1)).await.is_err());
    }

    #[test]
    fn empty_secret_means_unconfigured() {
        let sync = SyncService::new(ApiClient::new("http://localhost".into(), " ".into()));
        assert!(!sync.is_configured());
    }
}
