use async_trait::async_trait;
use kassa_db::models::{Amount, ProviderKind};
use reqwest::Client;
use serde_json::Value;
use tracing::warn;

use super::{http_client, parse_amount, PaymentError, PaymentProvider, PaymentStatus};

/// Yoomoney wallet: quickpay links for paying, operation history for checking.
pub struct YoomoneyProvider {
    client: Client,
    base_url: String,
    token: String,
    wallet: String,
}

impl YoomoneyProvider {
    pub fn new(base_url: String, token: String, wallet: String) -> Self {
        Self {
            client: http_client(),
            base_url,
            token,
            wallet,
        }
    }

    fn quickpay_url(&self, amount: Amount, receipt: &str) -> String {
        let receipt = urlencoding::encode(receipt);
        format!(
            "{}/quickpay/confirm.xml?receiver={}&quickpay-form=button&targets={}&paymentType=AC&sum={}&label={}",
            self.base_url,
            urlencoding::encode(&self.wallet),
            receipt,
            amount.to_decimal_string(),
            receipt,
        )
    }

    async fn fetch_operations(&self, receipt: &str) -> Result<Value, PaymentError> {
        let resp = self
            .client
            .post(format!("{}/api/operation-history", self.base_url))
            .bearer_auth(&self.token)
            .form(&[("type", "deposition"), ("label", receipt), ("records", "1")])
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }
}

fn interpret(body: &Value) -> PaymentStatus {
    let Some(operations) = body.get("operations").and_then(Value::as_array) else {
        return PaymentStatus::Error;
    };
    let Some(operation) = operations.first() else {
        return PaymentStatus::Pending;
    };
    let Some(status) = operation.get("status").and_then(Value::as_str) else {
        return PaymentStatus::Error;
    };

    match status {
        "success" => {
            let currency = operation.get("amount_currency").and_then(Value::as_str);
            if currency.is_some_and(|c| c != "RUB" && c != "643") {
                return PaymentStatus::WrongCurrency;
            }
            match operation.get("amount").and_then(parse_amount) {
                Some(amount) => PaymentStatus::Success {
                    amount,
                    method: None,
                },
                None => PaymentStatus::Error,
            }
        }
        "in_progress" => PaymentStatus::Pending,
        "refused" => PaymentStatus::Cancelled,
        other => PaymentStatus::Unknown(other.to_string()),
    }
}

#[async_trait]
impl PaymentProvider for YoomoneyProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Yoomoney
    }

    fn min_amount(&self) -> Amount {
        Amount::rubles(2)
    }

    async fn create_bill(&self, amount: Amount, receipt: &str) -> Result<String, PaymentError> {
        Ok(self.quickpay_url(amount, receipt))
    }

    async fn check_bill(&self, receipt: &str) -> PaymentStatus {
        let body = match self.fetch_operations(receipt).await {
            Ok(body) => body,
            Err(e) => {
                warn!(provider = "yoomoney", receipt, error = %e, "bill check failed");
                return PaymentStatus::Error;
            }
        };

        let status = interpret(&body);
        if status == PaymentStatus::Error {
            warn!(provider = "yoomoney", receipt, response = %body, "unrecognized bill status");
        }
        status
    }
}
