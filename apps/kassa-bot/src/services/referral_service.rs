use anyhow::{anyhow, Result};
use kassa_db::models::Amount;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::api_client::ApiClient;

/// Turns a `/start` payload into the inviting user's Telegram id.
///
/// Accepted forms, with an optional `ref_` prefix: `<id>_<anything>` and a
/// bare base36-encoded id (`1OKI95B`).
pub fn decode_referral_code(payload: &str) -> Option<i64> {
    let code = payload.trim();
    let code = code.strip_prefix("ref_").unwrap_or(code);
    if code.is_empty() {
        return None;
    }

    let id = match code.split_once('_') {
        Some((id, _)) if !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()) => {
            id.parse().ok()?
        }
        Some(_) => return None,
        None => i64::from_str_radix(code, 36).ok()?,
    };
    (id > 0).then_some(id)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOutcome {
    Registered,
    AlreadyReferred,
    Rejected(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Referral {
    #[serde(default)]
    pub user_id: Value,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub total_deposits: f64,
    #[serde(default)]
    pub total_losses: f64,
}

impl Referral {
    pub fn display_name(&self) -> String {
        match (&self.nickname, &self.user_id) {
            (Some(nick), _) if !nick.is_empty() => nick.clone(),
            (_, Value::String(id)) => id.clone(),
            (_, Value::Number(id)) => id.to_string(),
            _ => "без имени".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReferralStats {
    #[serde(default)]
    pub earnings: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReferralSummary {
    #[serde(default)]
    pub referrals: Vec<Referral>,
    #[serde(default)]
    pub stats: ReferralStats,
}

/// Thin proxy to the backend's referral program.
#[derive(Clone)]
pub struct ReferralService {
    api: ApiClient,
}

impl ReferralService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn register_click(&self, user_id: i64, referrer_id: i64) -> Result<RegisterOutcome> {
        let (status, body) = self
            .api
            .post_raw(
                "/api/referral/register",
                &json!({
                    "userId": user_id.to_string(),
                    "referrerId": referrer_id.to_string(),
                }),
            )
            .await?;

        let message = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let success = body.get("success").and_then(Value::as_bool).unwrap_or(false);

        let outcome = if status.is_success() && success {
            RegisterOutcome::Registered
        } else if message == "Already referred" {
            RegisterOutcome::AlreadyReferred
        } else {
            RegisterOutcome::Rejected(format!("{status}: {message}"))
        };
        info!(user_id, referrer_id, outcome = ?outcome, "referral click");
        Ok(outcome)
    }

    /// Reports a credited refill of a referred user to the backend.
    pub async fn register_deposit(
        &self,
        user_id: i64,
        referral_code: &str,
        amount: Amount,
        first: bool,
    ) -> Result<()> {
        if referral_code.is_empty() || amount.is_zero() {
            return Ok(());
        }
        let path = if first {
            "/api/referral/register-referral"
        } else {
            "/api/referral/update-deposit"
        };

        let (status, body) = self
            .api
            .post_raw(
                path,
                &json!({
                    "referralCode": referral_code,
                    "referralUserId": user_id.to_string(),
                    "depositAmount": amount.as_rubles(),
                }),
            )
            .await?;

        if !status.is_success() {
            warn!(user_id, path, status = %status, response = %body, "referral deposit rejected");
            return Err(anyhow!("{path} returned {status}"));
        }
        Ok(())
    }

    pub async fn list_referrals(&self, user_id: i64) -> Result<ReferralSummary> {
        self.api.get(&format!("/api/referral/{user_id}")).await
    }
}
