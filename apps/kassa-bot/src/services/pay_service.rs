use async_trait::async_trait;
use kassa_db::ledger::Ledger;
use kassa_db::models::{Amount, CreditOutcome, NewReceipt, NewRefill, ProviderKind};
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::services::payment::{PaymentError, PaymentProvider, PaymentStatus};
use crate::services::settings_service::SettingsService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefillLimits {
    pub min: Amount,
    pub max: Amount,
}

impl Default for RefillLimits {
    fn default() -> Self {
        Self {
            min: Amount::rubles(100),
            max: Amount::rubles(100_000),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bill {
    pub receipt: String,
    pub url: String,
    pub amount: Amount,
    pub provider: ProviderKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Credited {
        amount: Amount,
        balance: Amount,
        first_deposit: bool,
    },
    AlreadyCredited,
    NotPaid(PaymentStatus),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditSource {
    Provider(ProviderKind),
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditEvent {
    pub user_id: i64,
    pub receipt: String,
    pub amount: Amount,
    pub balance: Amount,
    pub first_deposit: bool,
    pub source: CreditSource,
    pub method: Option<String>,
}

/// Side effects of a fresh credit. Runs detached from the user's request.
#[async_trait]
pub trait CreditListener: Send + Sync {
    async fn on_credit(&self, event: &CreditEvent);
}

/// Drives a refill from bill creation to the single credit.
#[derive(Clone)]
pub struct PayService {
    ledger: Arc<dyn Ledger>,
    settings: SettingsService,
    limits: RefillLimits,
    providers: HashMap<ProviderKind, Arc<dyn PaymentProvider>>,
    listeners: Vec<Arc<dyn CreditListener>>,
}

impl PayService {
    pub fn new(ledger: Arc<dyn Ledger>, settings: SettingsService, limits: RefillLimits) -> Self {
        Self {
            ledger,
            settings,
            limits,
            providers: HashMap::new(),
            listeners: Vec::new(),
        }
    }

    pub fn with_provider(mut self, provider: Arc<dyn PaymentProvider>) -> Self {
        self.providers.insert(provider.kind(), provider);
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn CreditListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn registered_providers(&self) -> Vec<ProviderKind> {
        ProviderKind::ALL
            .into_iter()
            .filter(|kind| self.providers.contains_key(kind))
            .collect()
    }

    /// Registered and not switched off by an admin.
    pub async fn enabled_providers(&self) -> Vec<ProviderKind> {
        let mut enabled = Vec::new();
        for kind in self.registered_providers() {
            if self.settings.is_way_enabled(kind).await {
                enabled.push(kind);
            }
        }
        enabled
    }

    pub fn limits_for(&self, kind: ProviderKind) -> Option<RefillLimits> {
        let provider = self.providers.get(&kind)?;
        Some(RefillLimits {
            min: self.limits.min.max(provider.min_amount()),
            max: self.limits.max,
        })
    }

    pub async fn create_bill(
        &self,
        user_id: i64,
        kind: ProviderKind,
        amount: Amount,
    ) -> Result<Bill, PaymentError> {
        let (Some(provider), Some(limits)) = (self.providers.get(&kind), self.limits_for(kind))
        else {
            return Err(PaymentError::ProviderDisabled(kind));
        };
        if !self.settings.is_way_enabled(kind).await {
            return Err(PaymentError::ProviderDisabled(kind));
        }
        if amount < limits.min || amount > limits.max {
            return Err(PaymentError::AmountOutOfRange {
                amount,
                min: limits.min,
                max: limits.max,
            });
        }

        let receipt = generate_receipt();
        let url = provider.create_bill(amount, &receipt).await?;
        if let Err(e) = reqwest::Url::parse(&url) {
            return Err(PaymentError::Provider {
                provider: kind,
                message: format!("unusable payment url {url:?}: {e}"),
            });
        }

        self.ledger
            .insert_receipt(&NewReceipt {
                id: receipt.clone(),
                user_id,
                amount,
                provider: kind,
            })
            .await?;

        info!(user_id, receipt = %receipt, provider = %kind, amount = %amount, "bill created");
        Ok(Bill {
            receipt,
            url,
            amount,
            provider: kind,
        })
    }

    pub async fn check_bill(
        &self,
        user_id: i64,
        kind: ProviderKind,
        receipt_id: &str,
    ) -> Result<CheckOutcome, PaymentError> {
        if self.ledger.find_refill(receipt_id).await?.is_some() {
            return Ok(CheckOutcome::AlreadyCredited);
        }

        let receipt = self
            .ledger
            .get_receipt(receipt_id)
            .await?
            .filter(|r| r.provider == kind)
            .ok_or_else(|| PaymentError::UnknownReceipt(receipt_id.to_string()))?;
        if receipt.user_id != user_id {
            warn!(user_id, owner = receipt.user_id, receipt = receipt_id, "foreign receipt checked");
            return Err(PaymentError::NotOwner(receipt_id.to_string()));
        }

        let provider = self
            .providers
            .get(&kind)
            .ok_or(PaymentError::ProviderDisabled(kind))?;

        let (amount, method) = match provider.check_bill(&receipt.id).await {
            PaymentStatus::Success { amount, method } if !amount.is_zero() => (amount, method),
            PaymentStatus::Success { .. } => {
                warn!(receipt = receipt_id, provider = %kind, "zero amount reported as paid");
                return Ok(CheckOutcome::NotPaid(PaymentStatus::Error));
            }
            status => return Ok(CheckOutcome::NotPaid(status)),
        };

        let refill = NewRefill {
            receipt: receipt.id.clone(),
            user_id,
            amount,
            way: kind.as_str().to_string(),
            method,
        };
        self.credit(refill, CreditSource::Provider(kind)).await
    }

    /// Admin-only top-up through the same ledger path as real payments.
    pub async fn test_credit(&self, user_id: i64, amount: Amount) -> Result<CheckOutcome, PaymentError> {
        let refill = NewRefill {
            receipt: format!("admin-{}", generate_receipt()),
            user_id,
            amount,
            way: "admin".to_string(),
            method: None,
        };
        self.credit(refill, CreditSource::Admin).await
    }

    async fn credit(&self, refill: NewRefill, source: CreditSource) -> Result<CheckOutcome, PaymentError> {
        match self.ledger.credit_once(&refill).await? {
            CreditOutcome::AlreadyCredited => Ok(CheckOutcome::AlreadyCredited),
            CreditOutcome::Credited {
                balance,
                previous_total,
            } => {
                let event = CreditEvent {
                    user_id: refill.user_id,
                    receipt: refill.receipt,
                    amount: refill.amount,
                    balance,
                    first_deposit: previous_total.is_zero(),
                    source,
                    method: refill.method,
                };
                self.notify(&event);
                Ok(CheckOutcome::Credited {
                    amount: event.amount,
                    balance,
                    first_deposit: event.first_deposit,
                })
            }
        }
    }

    fn notify(&self, event: &CreditEvent) {
        for listener in &self.listeners {
            let listener = listener.clone();
            let event = event.clone();
            tokio::spawn(async move {
                listener.on_credit(&event).await;
            });
        }
    }
}

/// Ten random digits.
fn generate_receipt() -> String {
    rand::rng()
        .random_range(1_000_000_000u64..10_000_000_000)
        .to_string()
}
