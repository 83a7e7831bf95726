use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::error::{DbError, Result};
use crate::ledger::Ledger;
use crate::models::{Amount, CreditOutcome, NewReceipt, NewRefill, Receipt, Refill};

#[derive(Debug, Default, Clone, Copy)]
struct Account {
    balance: Amount,
    total_refill: Amount,
}

#[derive(Debug, Default)]
struct State {
    receipts: HashMap<String, Receipt>,
    refills: HashMap<String, Refill>,
    accounts: HashMap<i64, Account>,
}

/// Process-local ledger. One lock covers receipts, refills and balances.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    state: Arc<Mutex<State>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn refill_count(&self) -> usize {
        self.state.lock().await.refills.len()
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn insert_receipt(&self, receipt: &NewReceipt) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.receipts.contains_key(&receipt.id) {
            return Err(DbError::Conflict(format!(
                "receipt {} already exists",
                receipt.id
            )));
        }
        state.receipts.insert(
            receipt.id.clone(),
            Receipt {
                id: receipt.id.clone(),
                user_id: receipt.user_id,
                amount: receipt.amount,
                provider: receipt.provider,
                created_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn get_receipt(&self, id: &str) -> Result<Option<Receipt>> {
        Ok(self.state.lock().await.receipts.get(id).cloned())
    }

    async fn find_refill(&self, receipt: &str) -> Result<Option<Refill>> {
        Ok(self.state.lock().await.refills.get(receipt).cloned())
    }

    async fn credit_once(&self, refill: &NewRefill) -> Result<CreditOutcome> {
        let mut state = self.state.lock().await;
        if state.refills.contains_key(&refill.receipt) {
            return Ok(CreditOutcome::AlreadyCredited);
        }

        let account = state.accounts.get(&refill.user_id).copied().unwrap_or_default();
        let overflow = || DbError::Validation(format!("balance overflow for {}", refill.user_id));
        let updated = Account {
            balance: account.balance.checked_add(refill.amount).ok_or_else(overflow)?,
            total_refill: account
                .total_refill
                .checked_add(refill.amount)
                .ok_or_else(overflow)?,
        };

        state.refills.insert(
            refill.receipt.clone(),
            Refill {
                receipt: refill.receipt.clone(),
                user_id: refill.user_id,
                amount: refill.amount,
                way: refill.way.clone(),
                method: refill.method.clone(),
                created_at: Utc::now(),
            },
        );
        state.accounts.insert(refill.user_id, updated);

        Ok(CreditOutcome::Credited {
            balance: updated.balance,
            previous_total: account.total_refill,
        })
    }

    async fn balance(&self, user_id: i64) -> Result<Amount> {
        Ok(self
            .state
            .lock()
            .await
            .accounts
            .get(&user_id)
            .map(|a| a.balance)
            .unwrap_or_default())
    }
}
