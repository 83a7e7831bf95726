use async_trait::async_trait;
use kassa_db::models::{Amount, ProviderKind};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{http_client, parse_amount, provider_error, PaymentError, PaymentProvider, PaymentStatus};

const METHOD_FIELDS: [&str; 6] = ["bank", "method", "payment_method", "wallet", "card_type", "service"];

pub struct CactusPayProvider {
    client: Client,
    base_url: String,
    token: String,
}

impl CactusPayProvider {
    pub fn new(base_url: String, token: String) -> Self {
        Self {
            client: http_client(),
            base_url,
            token,
        }
    }

    async fn call(&self, method: &str, body: Value) -> Result<Value, PaymentError> {
        let url = format!("{}?method={}", self.base_url, method);
        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }
}

/// Accepts `{"response":{"url"}}`, `{"url"}` and `{"payment_url"}`.
fn extract_url(body: &Value) -> Option<String> {
    body.get("response")
        .filter(|r| r.is_object())
        .and_then(|r| r.get("url"))
        .or_else(|| body.get("url"))
        .or_else(|| body.get("payment_url"))
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
}

fn interpret(body: &Value) -> PaymentStatus {
    let Some(response) = body.get("response").filter(|r| r.is_object()) else {
        return PaymentStatus::Error;
    };
    let Some(status) = response.get("status").and_then(Value::as_str) else {
        return PaymentStatus::Error;
    };

    match status.to_ascii_uppercase().as_str() {
        "ACCEPT" | "PAID" | "SUCCESS" => {
            let Some(amount) = response.get("amount").and_then(parse_amount) else {
                return PaymentStatus::Error;
            };
            let method = METHOD_FIELDS
                .iter()
                .filter_map(|field| response.get(*field).and_then(Value::as_str))
                .find(|m| !m.is_empty())
                .map(str::to_string);
            PaymentStatus::Success { amount, method }
        }
        "WAIT" | "PENDING" => PaymentStatus::Pending,
        "CANCEL" | "CANCELLED" => PaymentStatus::Cancelled,
        _ => PaymentStatus::Unknown(status.to_string()),
    }
}

#[async_trait]
impl PaymentProvider for CactusPayProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::CactusPay
    }

    fn min_amount(&self) -> Amount {
        Amount::rubles(100)
    }

    async fn create_bill(&self, amount: Amount, receipt: &str) -> Result<String, PaymentError> {
        let body = self
            .call(
                "create",
                json!({
                    "token": self.token,
                    "amount": amount.as_rubles(),
                    "order_id": receipt,
                }),
            )
            .await?;
        debug!(receipt, response = %body, "cactuspay create response");

        extract_url(&body).ok_or_else(|| {
            provider_error(ProviderKind::CactusPay, format!("no payment url in {body}"))
        })
    }

    async fn check_bill(&self, receipt: &str) -> PaymentStatus {
        let body = match self
            .call("get", json!({ "token": self.token, "order_id": receipt }))
            .await
        {
            Ok(body) => body,
            Err(e) => {
                warn!(provider = "cactuspay", receipt, error = %e, "bill check failed");
                return PaymentStatus::Error;
            }
        };

        let status = interpret(&body);
        if status == PaymentStatus::Error {
            warn!(provider = "cactuspay", receipt, response = %body, "unrecognized bill status");
        }
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn provider_for(server: &MockServer) -> CactusPayProvider {
        CactusPayProvider::new(format!("{}/api/", server.uri()), "tok".into())
    }

    #[test]
    fn accepted_bill_reports_amount_and_method() {
        let status = interpret(&json!({
            "status": "success",
            "response": {"status": "ACCEPT", "amount": "150.00", "bank": "sber"}
        }));
        assert_eq!(
            status,
            PaymentStatus::Success {
                amount: Amount::rubles(150),
                method: Some("sber".into()),
            }
        );
    }

    #[test]
    fn status_is_case_insensitive() {
        let status = interpret(&json!({"response": {"status": "paid", "amount": 200}}));
        assert!(matches!(status, PaymentStatus::Success { method: None, .. }));
        assert_eq!(interpret(&json!({"response": {"status": "wait"}})), PaymentStatus::Pending);
        assert_eq!(
            interpret(&json!({"response": {"status": "CANCEL"}})),
            PaymentStatus::Cancelled
        );
    }

    #[test]
    fn unfamiliar_status_is_unknown() {
        assert_eq!(
            interpret(&json!({"response": {"status": "REFUND"}})),
            PaymentStatus::Unknown("REFUND".into())
        );
    }

    #[test]
    fn unexpected_shapes_fail_closed() {
        for body in [
            json!({"status": "ACCEPT", "amount": 100}),
            json!({"response": "ACCEPT"}),
            json!({"response": {"amount": 100}}),
            json!({"response": {"status": "ACCEPT"}}),
            json!({"response": {"status": "ACCEPT", "amount": "lots"}}),
            json!([]),
        ] {
            assert_eq!(interpret(&body), PaymentStatus::Error, "{body}");
        }
    }

    #[test]
    fn url_shapes() {
        assert_eq!(
            extract_url(&json!({"response": {"url": "https://a"}})).as_deref(),
            Some("https://a")
        );
        assert_eq!(extract_url(&json!({"url": "https://b"})).as_deref(), Some("https://b"));
        assert_eq!(
            extract_url(&json!({"payment_url": "https://c"})).as_deref(),
            Some("https://c")
        );
        assert_eq!(extract_url(&json!({"status": "error"})), None);
    }

    #[tokio::test]
    async fn create_posts_token_amount_and_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(query_param("method", "create"))
            .and(body_partial_json(json!({"token": "tok", "order_id": "1234567890"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"response": {"url": "https://pay.test/1"}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let url = provider_for(&server)
            .await
            .create_bill(Amount::rubles(150), "1234567890")
            .await
            .unwrap();
        assert_eq!(url, "https://pay.test/1");
    }

    #[tokio::test]
    async fn create_without_url_is_a_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "error"})))
            .mount(&server)
            .await;

        let err = provider_for(&server)
            .await
            .create_bill(Amount::rubles(150), "1")
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::Provider { provider: ProviderKind::CactusPay, .. }));
    }

    #[tokio::test]
    async fn check_maps_transport_failures_to_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(query_param("method", "get"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let status = provider_for(&server).await.check_bill("1").await;
        assert_eq!(status, PaymentStatus::Error);
    }

    #[tokio::test]
    async fn check_maps_garbage_body_to_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        assert_eq!(provider_for(&server).await.check_bill("1").await, PaymentStatus::Error);
    }
}
