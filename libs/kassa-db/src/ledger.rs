use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Amount, CreditOutcome, NewReceipt, NewRefill, Receipt, Refill};

/// Receipt store and balance ledger behind the reconciliation flow.
///
/// `credit_once` is the only way money reaches a balance. Implementations must
/// make "refill exists?" and "insert refill + bump balance" a single atomic
/// step keyed by the receipt id, so any number of concurrent callers observe
/// exactly one `Credited`.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Fails with `DbError::Conflict` when the id is already taken.
    async fn insert_receipt(&self, receipt: &NewReceipt) -> Result<()>;

    async fn get_receipt(&self, id: &str) -> Result<Option<Receipt>>;

    async fn find_refill(&self, receipt: &str) -> Result<Option<Refill>>;

    async fn credit_once(&self, refill: &NewRefill) -> Result<CreditOutcome>;

    /// Zero for users the ledger has never seen.
    async fn balance(&self, user_id: i64) -> Result<Amount>;
}
