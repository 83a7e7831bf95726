use async_trait::async_trait;
use chrono::{Duration, SecondsFormat, Utc};
use kassa_db::models::{Amount, ProviderKind};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::warn;

use super::{http_client, parse_amount, provider_error, PaymentError, PaymentProvider, PaymentStatus};

const MAX_LIFETIME_MINUTES: i64 = 45 * 24 * 60;

/// QIWI P2P bills API.
pub struct QiwiProvider {
    client: Client,
    base_url: String,
    secret: String,
    lifetime: Duration,
}

impl QiwiProvider {
    pub fn new(base_url: String, secret: String, lifetime_minutes: i64) -> Self {
        Self {
            client: http_client(),
            base_url,
            secret,
            lifetime: Duration::minutes(lifetime_minutes.clamp(1, MAX_LIFETIME_MINUTES)),
        }
    }

    fn bill_url(&self, receipt: &str) -> String {
        format!("{}{}", self.base_url, urlencoding::encode(receipt))
    }

    async fn fetch_bill(&self, receipt: &str) -> Result<Value, PaymentError> {
        let resp = self
            .client
            .get(self.bill_url(receipt))
            .bearer_auth(&self.secret)
            .header("Accept", "application/json")
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }
}

fn interpret(body: &Value) -> PaymentStatus {
    let Some(status) = body
        .get("status")
        .and_then(|s| s.get("value"))
        .and_then(Value::as_str)
    else {
        return PaymentStatus::Error;
    };
    let Some(amount) = body.get("amount").filter(|a| a.is_object()) else {
        return PaymentStatus::Error;
    };

    match status {
        "PAID" => {
            let currency = amount.get("currency").and_then(Value::as_str);
            if currency != Some("RUB") {
                return PaymentStatus::WrongCurrency;
            }
            match amount.get("value").and_then(parse_amount) {
                Some(amount) => PaymentStatus::Success {
                    amount,
                    method: None,
                },
                None => PaymentStatus::Error,
            }
        }
        "WAITING" => PaymentStatus::Pending,
        "REJECTED" | "EXPIRED" => PaymentStatus::Cancelled,
        other => PaymentStatus::Unknown(other.to_string()),
    }
}

#[async_trait]
impl PaymentProvider for QiwiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Qiwi
    }

    fn min_amount(&self) -> Amount {
        Amount::rubles(1)
    }

    async fn create_bill(&self, amount: Amount, receipt: &str) -> Result<String, PaymentError> {
        let expires = (Utc::now() + self.lifetime).to_rfc3339_opts(SecondsFormat::Secs, false);
        let resp = self
            .client
            .put(self.bill_url(receipt))
            .bearer_auth(&self.secret)
            .header("Accept", "application/json")
            .json(&json!({
                "amount": {
                    "currency": "RUB",
                    "value": amount.to_decimal_string(),
                },
                "comment": receipt,
                "expirationDateTime": expires,
            }))
            .send()
            .await?
            .error_for_status()?;
        let body: Value = resp.json().await?;

        body.get("payUrl")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| provider_error(ProviderKind::Qiwi, format!("no payUrl in {body}")))
    }

    async fn check_bill(&self, receipt: &str) -> PaymentStatus {
        let body = match self.fetch_bill(receipt).await {
            Ok(body) => body,
            Err(e) => {
                warn!(provider = "qiwi", receipt, error = %e, "bill check failed");
                return PaymentStatus::Error;
            }
        };

        let status = interpret(&body);
        if status == PaymentStatus::Error {
            warn!(provider = "qiwi", receipt, response = %body, "unrecognized bill status");
        }
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn bill(status: &str, currency: &str, value: &str) -> Value {
        json!({
            "billId": "1",
            "status": {"value": status},
            "amount": {"currency": currency, "value": value},
        })
    }

    #[test]
    fn paid_in_roubles_is_success() {
        assert_eq!(
            interpret(&bill("PAID", "RUB", "150.00")),
            PaymentStatus::Success {
                amount: Amount::rubles(150),
                method: None,
            }
        );
    }

    #[test]
    fn paid_in_other_currency_is_flagged() {
        assert_eq!(interpret(&bill("PAID", "KZT", "150.00")), PaymentStatus::WrongCurrency);
    }

    #[test]
    fn lifecycle_statuses() {
        assert_eq!(interpret(&bill("WAITING", "RUB", "1.00")), PaymentStatus::Pending);
        assert_eq!(interpret(&bill("EXPIRED", "RUB", "1.00")), PaymentStatus::Cancelled);
        assert_eq!(interpret(&bill("REJECTED", "RUB", "1.00")), PaymentStatus::Cancelled);
        assert_eq!(
            interpret(&bill("PARTIAL", "RUB", "1.00")),
            PaymentStatus::Unknown("PARTIAL".into())
        );
    }

    #[test]
    fn unexpected_shapes_fail_closed() {
        for body in [
            json!({"status": "PAID"}),
            json!({"status": {"value": "PAID"}}),
            json!({"errorCode": "bill.not.found"}),
            bill("PAID", "RUB", "n/a"),
        ] {
            assert_eq!(interpret(&body), PaymentStatus::Error, "{body}");
        }
    }

    #[tokio::test]
    async fn create_puts_bill_with_bearer_auth() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/bills/555"))
            .and(header("Authorization", "Bearer key"))
            .and(body_partial_json(json!({
                "amount": {"currency": "RUB", "value": "150.50"},
                "comment": "555",
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"payUrl": "https://oplata.qiwi.com/x"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let provider = QiwiProvider::new(format!("{}/bills/", server.uri()), "key".into(), 60);
        let url = provider
            .create_bill(Amount::from_kopecks(15_050).unwrap(), "555")
            .await
            .unwrap();
        assert_eq!(url, "https://oplata.qiwi.com/x");
    }

    #[tokio::test]
    async fn check_reads_bill_state() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bills/777"))
            .respond_with(ResponseTemplate::new(200).set_body_json(bill("PAID", "RUB", "300")))
            .mount(&server)
            .await;

        let provider = QiwiProvider::new(format!("{}/bills/", server.uri()), "key".into(), 60);
        assert_eq!(
            provider.check_bill("777").await,
            PaymentStatus::Success {
                amount: Amount::rubles(300),
                method: None,
            }
        );
    }

    #[tokio::test]
    async fn check_maps_unauthorized_to_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let provider = QiwiProvider::new(format!("{}/bills/", server.uri()), "bad".into(), 60);
        assert_eq!(provider.check_bill("1").await, PaymentStatus::Error);
    }
}
