use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Amount, ProviderKind};

/// A bill handed to a provider, waiting to be checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReceipt {
    pub id: String,
    pub user_id: i64,
    pub amount: Amount,
    pub provider: ProviderKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub id: String,
    pub user_id: i64,
    pub amount: Amount,
    pub provider: ProviderKind,
    pub created_at: DateTime<Utc>,
}

/// Credit record. Its existence means the receipt has been paid out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRefill {
    pub receipt: String,
    pub user_id: i64,
    pub amount: Amount,
    /// Provider key, or `admin` for manual top-ups.
    pub way: String,
    pub method: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Refill {
    pub receipt: String,
    pub user_id: i64,
    pub amount: Amount,
    pub way: String,
    pub method: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditOutcome {
    Credited {
        balance: Amount,
        /// Lifetime refills before this credit.
        previous_total: Amount,
    },
    AlreadyCredited,
}
