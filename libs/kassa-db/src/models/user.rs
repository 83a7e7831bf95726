use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Amount;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub tg_id: i64,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub balance: Amount,
    pub total_refill: Amount,
    pub referrer: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(tg_id: i64) -> Self {
        Self {
            tg_id,
            username: None,
            full_name: None,
            balance: Amount::ZERO,
            total_refill: Amount::ZERO,
            referrer: None,
            created_at: Utc::now(),
        }
    }

    pub fn display_name(&self) -> String {
        match (&self.username, &self.full_name) {
            (Some(username), _) => format!("@{username}"),
            (None, Some(full_name)) => full_name.clone(),
            (None, None) => self.tg_id.to_string(),
        }
    }
}
