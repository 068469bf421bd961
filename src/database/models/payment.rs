use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use crate::utils::datetime::to_db_timestamp;

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_FAILED: &str = "failed";

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub user_id: i64,
    pub amount: f64, // major currency units
    pub currency: String,
    pub payment_method: String,
    pub transaction_id: Option<String>,
    pub status: String, // 'pending', 'completed', 'failed'
    pub created_at: String,
    pub completed_at: Option<String>,
}

impl Payment {
    pub fn is_pending(&self) -> bool {
        self.status == STATUS_PENDING
    }

    /// Amount in minor units (cents), as Telegram reports it.
    pub fn amount_minor(&self) -> i64 {
        (self.amount * 100.0).round() as i64
    }

    pub async fn create_pending(
        pool: &sqlx::SqlitePool,
        user_id: i64,
        amount: f64,
        currency: &str,
        payment_method: &str,
    ) -> Result<Self, sqlx::Error> {
        let id = Uuid::new_v4().to_string();
        let created_at = to_db_timestamp(&Utc::now());

        sqlx::query(
            r#"
            INSERT INTO payments (id, user_id, amount, currency, payment_method, status, created_at)
            VALUES (?, ?, ?, ?, ?, 'pending', ?)
            "#
        )
        .bind(&id)
        .bind(user_id)
        .bind(amount)
        .bind(currency)
        .bind(payment_method)
        .bind(&created_at)
        .execute(pool)
        .await?;

        Ok(Payment {
            id,
            user_id,
            amount,
            currency: currency.to_string(),
            payment_method: payment_method.to_string(),
            transaction_id: None,
            status: STATUS_PENDING.to_string(),
            created_at,
            completed_at: None,
        })
    }

    pub async fn find_by_id(
        pool: &sqlx::SqlitePool,
        payment_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Payment>(
            "SELECT id, user_id, amount, currency, payment_method, transaction_id, status, created_at, completed_at \
             FROM payments WHERE id = ?"
        )
        .bind(payment_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_user(
        pool: &sqlx::SqlitePool,
        user_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Payment>(
            "SELECT id, user_id, amount, currency, payment_method, transaction_id, status, created_at, completed_at \
             FROM payments WHERE user_id = ? ORDER BY created_at DESC"
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Marks a pending payment completed. Returns false if it was not pending.
    pub async fn mark_completed<'e, E>(
        executor: E,
        payment_id: &str,
        transaction_id: &str,
        at: &DateTime<Utc>,
    ) -> Result<bool, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        let result = sqlx::query(
            "UPDATE payments SET status = 'completed', transaction_id = ?, completed_at = ? \
             WHERE id = ? AND status = 'pending'"
        )
        .bind(transaction_id)
        .bind(to_db_timestamp(at))
        .bind(payment_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn mark_failed(pool: &sqlx::SqlitePool, payment_id: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE payments SET status = 'failed' WHERE id = ? AND status = 'pending'")
            .bind(payment_id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
