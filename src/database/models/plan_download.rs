use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use crate::utils::datetime::to_db_timestamp;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PlanDownload {
    pub id: i64,
    pub user_id: i64,
    pub plan_type: String,
    pub file_name: String,
    pub downloaded_at: String,
}

impl PlanDownload {
    pub async fn create(
        pool: &sqlx::SqlitePool,
        user_id: i64,
        plan_type: &str,
        file_name: &str,
        at: &DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        let downloaded_at = to_db_timestamp(at);

        let id = sqlx::query(
            "INSERT INTO plan_downloads (user_id, plan_type, file_name, downloaded_at) VALUES (?, ?, ?, ?)"
        )
        .bind(user_id)
        .bind(plan_type)
        .bind(file_name)
        .bind(&downloaded_at)
        .execute(pool)
        .await?
        .last_insert_rowid();

        Ok(PlanDownload {
            id,
            user_id,
            plan_type: plan_type.to_string(),
            file_name: file_name.to_string(),
            downloaded_at,
        })
    }

    pub async fn count_since(
        pool: &sqlx::SqlitePool,
        user_id: i64,
        since: &DateTime<Utc>,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM plan_downloads WHERE user_id = ? AND downloaded_at >= ?"
        )
        .bind(user_id)
        .bind(to_db_timestamp(since))
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_user(
        pool: &sqlx::SqlitePool,
        user_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, PlanDownload>(
            "SELECT id, user_id, plan_type, file_name, downloaded_at FROM plan_downloads \
             WHERE user_id = ? ORDER BY downloaded_at DESC, id DESC"
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }
}
