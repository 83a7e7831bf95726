use async_trait::async_trait;
use kassa_db::models::{Amount, ProviderKind};
use kassa_db::DbError;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

pub mod cactuspay;
pub mod qiwi;
pub mod yoomoney;

/// Live state of a bill as reported by its provider. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentStatus {
    Success {
        amount: Amount,
        method: Option<String>,
    },
    Pending,
    WrongCurrency,
    Cancelled,
    /// Transport failure or a response we could not make sense of.
    Error,
    /// Well-formed response with a status string we do not know.
    Unknown(String),
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("amount {amount} is outside of [{min}, {max}]")]
    AmountOutOfRange {
        amount: Amount,
        min: Amount,
        max: Amount,
    },

    #[error("provider {0} is disabled")]
    ProviderDisabled(ProviderKind),

    #[error("{provider}: {message}")]
    Provider {
        provider: ProviderKind,
        message: String,
    },

    #[error("http: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unknown receipt {0}")]
    UnknownReceipt(String),

    #[error("receipt {0} belongs to another user")]
    NotOwner(String),

    #[error("storage: {0}")]
    Storage(#[from] DbError),
}

/// One payment gateway.
///
/// `check_bill` does not fail: whatever goes wrong while asking the gateway is
/// logged and reported as `PaymentStatus::Error`. `Success` always carries a
/// parsed amount.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    fn min_amount(&self) -> Amount;

    /// Returns the URL the user pays at.
    async fn create_bill(&self, amount: Amount, receipt: &str) -> Result<String, PaymentError>;

    async fn check_bill(&self, receipt: &str) -> PaymentStatus;
}

pub(crate) fn http_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(15))
        .build()
        .unwrap_or_default()
}

/// Gateways send amounts as `"150.00"`, `150` or `150.5`.
pub(crate) fn parse_amount(value: &Value) -> Option<Amount> {
    match value {
        Value::String(s) => Amount::parse(s).ok(),
        Value::Number(n) => n.as_f64().and_then(Amount::from_rubles_f64),
        _ => None,
    }
}

pub(crate) fn provider_error(provider: ProviderKind, message: impl Into<String>) -> PaymentError {
    PaymentError::Provider {
        provider,
        message: message.into(),
    }
}
