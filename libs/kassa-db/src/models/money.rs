use {
    crate::error::DbError,
    serde::{Deserialize, Serialize},
    std::fmt,
};

/// Rouble amount stored as whole kopecks. Never negative.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub fn from_kopecks(kopecks: i64) -> Result<Self, DbError> {
        if kopecks < 0 {
            return Err(DbError::Validation(format!(
                "Amount cannot be negative, got: {kopecks}"
            )));
        }
        Ok(Self(kopecks))
    }

    pub const fn rubles(rubles: u32) -> Self {
        Self(rubles as i64 * 100)
    }

    pub fn kopecks(&self) -> i64 {
        self.0
    }

    pub fn as_rubles(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Converts a float rouble value as sent by gateways (`99.5`, `100.0`).
    pub fn from_rubles_f64(value: f64) -> Option<Self> {
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        let kopecks = (value * 100.0).round();
        if kopecks >= i64::MAX as f64 {
            return None;
        }
        Some(Self(kopecks as i64))
    }

    /// Parses user or gateway text: `150`, `150.5`, `150,50`.
    /// Digits past the second fractional place are dropped.
    pub fn parse(input: &str) -> Result<Self, DbError> {
        let invalid = || DbError::Validation(format!("not an amount: {input:?}"));

        let normalized = input.trim().replace(',', ".");
        let (whole, frac) = normalized
            .split_once('.')
            .unwrap_or((normalized.as_str(), ""));

        if whole.is_empty() && frac.is_empty() {
            return Err(invalid());
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }

        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };
        let mut cents: String = frac.chars().take(2).collect();
        while cents.len() < 2 {
            cents.push('0');
        }
        let cents: i64 = cents.parse().map_err(|_| invalid())?;

        whole
            .checked_mul(100)
            .and_then(|v| v.checked_add(cents))
            .map(Self)
            .ok_or_else(invalid)
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    /// Always two fractional digits: `150.00`.
    pub fn to_decimal_string(&self) -> String {
        format!("{}.{:02}", self.0 / 100, self.0 % 100)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 % 100 == 0 {
            write!(f, "{}", self.0 / 100)
        } else {
            write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
        }
    }
}
