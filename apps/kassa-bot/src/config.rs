use clap::Parser;
use kassa_db::models::Amount;

use crate::services::pay_service::RefillLimits;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Telegram bot token
    #[arg(long, env = "BOT_TOKEN")]
    pub bot_token: String,

    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Companion web backend (mini-app balance, referral program)
    #[arg(long, env = "BACKEND_URL", default_value = "http://localhost:3000")]
    pub backend_url: String,

    /// Sent as X-API-Secret on every backend call
    #[arg(long, env = "BACKEND_SECRET", default_value = "")]
    pub backend_secret: String,

    /// Comma separated Telegram ids
    #[arg(long, env = "ADMIN_IDS", value_delimiter = ',')]
    pub admin_ids: Vec<i64>,

    #[arg(long, env = "CACTUSPAY_TOKEN")]
    pub cactuspay_token: Option<String>,

    #[arg(long, env = "CACTUSPAY_URL", default_value = "https://lk.cactuspay.pro/api/")]
    pub cactuspay_url: String,

    #[arg(long, env = "QIWI_SECRET")]
    pub qiwi_secret: Option<String>,

    #[arg(long, env = "QIWI_URL", default_value = "https://api.qiwi.com/partner/bill/v1/bills/")]
    pub qiwi_url: String,

    #[arg(long, env = "QIWI_BILL_LIFETIME_MINUTES", default_value_t = 60)]
    pub qiwi_bill_lifetime_minutes: i64,

    #[arg(long, env = "YOOMONEY_TOKEN")]
    pub yoomoney_token: Option<String>,

    /// Receiver wallet number for quickpay links
    #[arg(long, env = "YOOMONEY_WALLET")]
    pub yoomoney_wallet: Option<String>,

    #[arg(long, env = "YOOMONEY_URL", default_value = "https://yoomoney.ru")]
    pub yoomoney_url: String,

    /// Roubles
    #[arg(long, env = "MIN_REFILL", default_value_t = 100)]
    pub min_refill: u32,

    /// Roubles
    #[arg(long, env = "MAX_REFILL", default_value_t = 100_000)]
    pub max_refill: u32,
}

impl Config {
    pub fn load() -> Self {
        Self::parse().normalized()
    }

    fn normalized(mut self) -> Self {
        self.bot_token = self.bot_token.trim().to_string();
        self.backend_secret = self.backend_secret.trim().to_string();
        self.cactuspay_token = non_empty(self.cactuspay_token);
        self.qiwi_secret = non_empty(self.qiwi_secret);
        self.yoomoney_token = non_empty(self.yoomoney_token);
        self.yoomoney_wallet = non_empty(self.yoomoney_wallet);

        self.cactuspay_url = normalize_url(&self.cactuspay_url) + "/";
        self.qiwi_url = normalize_url(&self.qiwi_url) + "/";
        self.yoomoney_url = normalize_url(&self.yoomoney_url);
        self
    }

    pub fn backend_url(&self) -> String {
        normalize_url(&self.backend_url)
    }

    pub fn refill_limits(&self) -> RefillLimits {
        RefillLimits {
            min: Amount::rubles(self.min_refill),
            max: Amount::rubles(self.max_refill.max(self.min_refill)),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Adds a scheme when missing and drops trailing slashes.
pub fn normalize_url(raw: &str) -> String {
    let mut url = raw.trim().to_string();
    if !url.starts_with("http://") && !url.starts_with("https://") {
        url = format!("https://{}", url);
    }
    while url.ends_with('/') {
        url.pop();
    }
    url
}
