use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::time::Duration;

const BACKEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the companion web backend. Every call carries `X-API-Secret`.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    secret: String,
}

impl ApiClient {
    pub fn new(base_url: String, secret: String) -> Self {
        let client = Client::builder()
            .timeout(BACKEND_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url,
            secret,
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .get(&url)
            .header("X-API-Secret", &self.secret)
            .send()
            .await
            .with_context(|| format!("GET {path} failed"))?;

        if !resp.status().is_success() {
            return Err(anyhow::anyhow!("GET {} failed: {}", path, resp.status()));
        }

        resp.json()
            .await
            .with_context(|| format!("GET {path} returned an unexpected body"))
    }

    /// Hands back the status and whatever JSON came with it (`Value::Null` for
    /// an empty or non-JSON body) instead of failing on 4xx.
    pub async fn post_raw<B: Serialize>(&self, path: &str, body: &B) -> Result<(StatusCode, Value)> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .post(&url)
            .header("X-API-Secret", &self.secret)
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {path} failed"))?;

        let status = resp.status();
        let body = resp.json::<Value>().await.unwrap_or(Value::Null);
        Ok((status, body))
    }

    pub fn has_secret(&self) -> bool {
        !self.secret.trim().is_empty()
    }
}
