use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::error::{DbError, Result};
use crate::ledger::Ledger;
use crate::models::{Amount, CreditOutcome, NewReceipt, NewRefill, Receipt, Refill};

#[derive(Debug, Clone)]
pub struct PgLedger {
    pool: PgPool,
}

impl PgLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_receipt(row: &PgRow) -> Result<Receipt> {
        let provider: String = row.try_get("provider")?;
        Ok(Receipt {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            amount: Amount::from_kopecks(row.try_get("amount")?)?,
            provider: provider.parse()?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        })
    }

    fn row_to_refill(row: &PgRow) -> Result<Refill> {
        Ok(Refill {
            receipt: row.try_get("receipt")?,
            user_id: row.try_get("user_id")?,
            amount: Amount::from_kopecks(row.try_get("amount")?)?,
            way: row.try_get("way")?,
            method: row.try_get("method")?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        })
    }
}

#[async_trait]
impl Ledger for PgLedger {
    async fn insert_receipt(&self, receipt: &NewReceipt) -> Result<()> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO receipts (id, user_id, amount, provider)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&receipt.id)
        .bind(receipt.user_id)
        .bind(receipt.amount.kopecks())
        .bind(receipt.provider.as_str())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if inserted == 0 {
            return Err(DbError::Conflict(format!(
                "receipt {} already exists",
                receipt.id
            )));
        }
        Ok(())
    }

    async fn get_receipt(&self, id: &str) -> Result<Option<Receipt>> {
        let row = sqlx::query(
            "SELECT id, user_id, amount, provider, created_at FROM receipts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::row_to_receipt).transpose()
    }

    async fn find_refill(&self, receipt: &str) -> Result<Option<Refill>> {
        let row = sqlx::query(
            "SELECT receipt, user_id, amount, way, method, created_at FROM refills WHERE receipt = $1",
        )
        .bind(receipt)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::row_to_refill).transpose()
    }

    async fn credit_once(&self, refill: &NewRefill) -> Result<CreditOutcome> {
        let mut tx = self.pool.begin().await?;

        // The primary key on refills.receipt is the guard: a second caller
        // gets no row back and leaves the balance alone.
        let claimed = sqlx::query_scalar::<_, bool>(
            r#"
            INSERT INTO refills (receipt, user_id, amount, way, method)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (receipt) DO NOTHING
            RETURNING true
            "#,
        )
        .bind(&refill.receipt)
        .bind(refill.user_id)
        .bind(refill.amount.kopecks())
        .bind(&refill.way)
        .bind(refill.method.as_deref())
        .fetch_optional(&mut *tx)
        .await?;

        if claimed.is_none() {
            tx.rollback().await?;
            return Ok(CreditOutcome::AlreadyCredited);
        }

        let row = sqlx::query(
            r#"
            INSERT INTO users (tg_id, balance, total_refill)
            VALUES ($1, $2, $2)
            ON CONFLICT (tg_id) DO UPDATE SET
                balance = users.balance + EXCLUDED.balance,
                total_refill = users.total_refill + EXCLUDED.total_refill
            RETURNING balance, total_refill
            "#,
        )
        .bind(refill.user_id)
        .bind(refill.amount.kopecks())
        .fetch_one(&mut *tx)
        .await?;

        let balance: i64 = row.try_get("balance")?;
        let total_refill: i64 = row.try_get("total_refill")?;
        tx.commit().await?;

        tracing::info!(
            receipt = %refill.receipt,
            user_id = refill.user_id,
            amount = %refill.amount,
            way = %refill.way,
            "refill credited"
        );

        Ok(CreditOutcome::Credited {
            balance: Amount::from_kopecks(balance)?,
            previous_total: Amount::from_kopecks(total_refill - refill.amount.kopecks())?,
        })
    }

    async fn balance(&self, user_id: i64) -> Result<Amount> {
        let balance = sqlx::query_scalar::<_, i64>("SELECT balance FROM users WHERE tg_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Amount::from_kopecks(balance.unwrap_or_default())
    }
}

// Run with `DATABASE_URL=postgres://... cargo test -- --ignored`; each test
// gets a fresh database with the migrations applied.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProviderKind;

    fn refill(receipt: &str, user_id: i64, rubles: u32) -> NewRefill {
        NewRefill {
            receipt: receipt.to_string(),
            user_id,
            amount: Amount::rubles(rubles),
            way: ProviderKind::Qiwi.as_str().to_string(),
            method: Some("card".to_string()),
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL"]
    async fn second_credit_of_a_receipt_is_a_no_op(pool: PgPool) {
        let ledger = PgLedger::new(pool);

        let first = ledger.credit_once(&refill("r1", 7, 150)).await.unwrap();
        assert_eq!(
            first,
            CreditOutcome::Credited {
                balance: Amount::rubles(150),
                previous_total: Amount::ZERO,
            }
        );
        assert_eq!(
            ledger.credit_once(&refill("r1", 7, 150)).await.unwrap(),
            CreditOutcome::AlreadyCredited
        );

        let stored = ledger.find_refill("r1").await.unwrap().unwrap();
        assert_eq!(stored.amount, Amount::rubles(150));
        assert_eq!(stored.method.as_deref(), Some("card"));
        assert_eq!(ledger.balance(7).await.unwrap(), Amount::rubles(150));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL"]
    async fn concurrent_credits_apply_once(pool: PgPool) {
        let ledger = PgLedger::new(pool);
        ledger.credit_once(&refill("earlier", 7, 100)).await.unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let ledger = ledger.clone();
                tokio::spawn(async move { ledger.credit_once(&refill("r2", 7, 250)).await })
            })
            .collect();

        let mut credited = Vec::new();
        for handle in handles {
            if let CreditOutcome::Credited {
                balance,
                previous_total,
            } = handle.await.unwrap().unwrap()
            {
                credited.push((balance, previous_total));
            }
        }

        assert_eq!(credited, vec![(Amount::rubles(350), Amount::rubles(100))]);
        assert_eq!(ledger.balance(7).await.unwrap(), Amount::rubles(350));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs DATABASE_URL"]
    async fn receipts_round_trip_and_reject_duplicates(pool: PgPool) {
        let ledger = PgLedger::new(pool);
        let receipt = NewReceipt {
            id: "4242424242".to_string(),
            user_id: 1,
            amount: Amount::rubles(200),
            provider: ProviderKind::Yoomoney,
        };

        ledger.insert_receipt(&receipt).await.unwrap();
        assert!(matches!(
            ledger.insert_receipt(&receipt).await,
            Err(DbError::Conflict(_))
        ));

        let stored = ledger.get_receipt("4242424242").await.unwrap().unwrap();
        assert_eq!(stored.provider, ProviderKind::Yoomoney);
        assert_eq!(stored.amount, Amount::rubles(200));
        assert!(ledger.get_receipt("missing").await.unwrap().is_none());
    }
}
