use {
    crate::error::DbError,
    serde::{Deserialize, Serialize},
    std::{fmt, str::FromStr},
};

/// Payment gateways the bot can bill through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    CactusPay,
    Qiwi,
    Yoomoney,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [Self::CactusPay, Self::Qiwi, Self::Yoomoney];

    /// Storage and settings key form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CactusPay => "cactuspay",
            Self::Qiwi => "qiwi",
            Self::Yoomoney => "yoomoney",
        }
    }

    /// Human-facing name, also used inside callback data.
    pub fn label(&self) -> &'static str {
        match self {
            Self::CactusPay => "CactusPay",
            Self::Qiwi => "QIWI",
            Self::Yoomoney => "Yoomoney",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ProviderKind {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == lowered)
            .ok_or_else(|| DbError::Validation(format!("unknown provider: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_labels_and_keys() {
        assert_eq!("QIWI".parse::<ProviderKind>().unwrap(), ProviderKind::Qiwi);
        assert_eq!("qiwi".parse::<ProviderKind>().unwrap(), ProviderKind::Qiwi);
        assert_eq!(
            " CactusPay ".parse::<ProviderKind>().unwrap(),
            ProviderKind::CactusPay
        );
        assert!("paypal".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn label_survives_parse() {
        for kind in ProviderKind::ALL {
            assert_eq!(kind.label().parse::<ProviderKind>().unwrap(), kind);
        }
    }
}
