use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use crate::services::hydration::clamp_consumption;
use crate::utils::datetime::to_db_timestamp;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct WaterLog {
    pub id: i64,
    pub user_id: i64,
    pub amount: f64, // ml
    pub is_daily_reset: bool,
    pub timestamp: String,
}

/// Counter values around one drink.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intake {
    pub before: f64,
    pub after: f64,
    pub added: f64,
    pub goal: f64,
}

impl WaterLog {
    /// Adds `amount` to the user's counter for `water_day`, capped at the goal,
    /// and logs what was actually added.
    ///
    /// Returns `None` without writing when the user has no goal or the stored
    /// counter belongs to another day.
    pub async fn record_consumption(
        pool: &sqlx::SqlitePool,
        user_id: i64,
        amount: f64,
        water_day: &str,
        at: &DateTime<Utc>,
    ) -> Result<Option<Intake>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let row: Option<(f64, Option<f64>, Option<String>)> =
            sqlx::query_as("SELECT current_water, water_goal, water_day FROM users WHERE id = ?")
                .bind(user_id)
                .fetch_optional(&mut tx)
                .await?;

        let (before, goal) = match row {
            Some((current, Some(goal), Some(day))) if day == water_day => (current, goal),
            _ => return Ok(None),
        };
        let (after, added) = clamp_consumption(before, amount, goal);
        let intake = Intake { before, after, added, goal };

        if added > 0.0 {
            sqlx::query(
                "UPDATE users SET current_water = MIN(current_water + ?, water_goal) \
                 WHERE id = ? AND water_day = ?"
            )
            .bind(added)
            .bind(user_id)
            .bind(water_day)
            .execute(&mut tx)
            .await?;

            sqlx::query(
                "INSERT INTO water_logs (user_id, amount, is_daily_reset, timestamp) VALUES (?, ?, 0, ?)"
            )
            .bind(user_id)
            .bind(added)
            .bind(to_db_timestamp(at))
            .execute(&mut tx)
            .await?;
        }

        tx.commit().await?;
        Ok(Some(intake))
    }

    /// Zeroes the user's counter for `new_day`, logging the discarded total
    /// when there was one. Returns the amount that was reset.
    pub async fn reset_day(
        pool: &sqlx::SqlitePool,
        user_id: i64,
        new_day: &str,
        at: &DateTime<Utc>,
    ) -> Result<f64, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let current: f64 = sqlx::query_scalar("SELECT current_water FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_one(&mut tx)
            .await?;

        if current > 0.0 {
            sqlx::query(
                "INSERT INTO water_logs (user_id, amount, is_daily_reset, timestamp) VALUES (?, ?, 1, ?)"
            )
            .bind(user_id)
            .bind(current)
            .bind(to_db_timestamp(at))
            .execute(&mut tx)
            .await?;
        }

        sqlx::query(
            "UPDATE users SET current_water = 0, water_day = ?, last_water_reminder = NULL WHERE id = ?"
        )
        .bind(new_day)
        .bind(user_id)
        .execute(&mut tx)
        .await?;

        tx.commit().await?;
        Ok(current)
    }

    /// Consumption entries (resets excluded) since `since`, oldest first.
    pub async fn find_consumption_since(
        pool: &sqlx::SqlitePool,
        user_id: i64,
        since: &DateTime<Utc>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, WaterLog>(
            "SELECT id, user_id, amount, is_daily_reset, timestamp FROM water_logs \
             WHERE user_id = ? AND is_daily_reset = 0 AND timestamp >= ? ORDER BY timestamp, id"
        )
        .bind(user_id)
        .bind(to_db_timestamp(since))
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_user(
        pool: &sqlx::SqlitePool,
        user_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, WaterLog>(
            "SELECT id, user_id, amount, is_daily_reset, timestamp FROM water_logs WHERE user_id = ? ORDER BY timestamp, id"
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }
}
