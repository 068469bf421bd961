use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use crate::utils::datetime::to_db_timestamp;

const USER_COLUMNS: &str = "id, telegram_id, username, first_name, last_name, weight, water_goal, \
    current_water, water_day, is_premium, premium_expiry, last_water_reminder, registered_at";

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub weight: Option<f64>,    // kg
    pub water_goal: Option<f64>, // ml
    pub current_water: f64,     // ml consumed on `water_day`
    pub water_day: Option<String>,
    pub is_premium: bool,
    pub premium_expiry: Option<String>,
    pub last_water_reminder: Option<String>,
    pub registered_at: String,
}

/// Profile fields Telegram sends with every update.
#[derive(Debug, Clone, Default)]
pub struct TelegramProfile {
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl TelegramProfile {
    pub fn from_user(user: &teloxide::types::User) -> Self {
        Self {
            telegram_id: user.id.0 as i64,
            username: user.username.clone(),
            first_name: Some(user.first_name.clone()),
            last_name: user.last_name.clone(),
        }
    }
}

impl User {
    pub fn display_name(&self) -> &str {
        self.first_name
            .as_deref()
            .or(self.username.as_deref())
            .unwrap_or("there")
    }

    pub async fn find_by_telegram_id(
        pool: &sqlx::SqlitePool,
        telegram_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE telegram_id = ?");
        sqlx::query_as::<_, User>(&query)
            .bind(telegram_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Self>, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn exists(pool: &sqlx::SqlitePool, telegram_id: i64) -> Result<bool, sqlx::Error> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE telegram_id = ?")
            .bind(telegram_id)
            .fetch_one(pool)
            .await?;
        Ok(count > 0)
    }

    /// Registers a new user together with their settings row, or refreshes the
    /// profile fields of an existing one. Returns the user and whether it was created.
    pub async fn get_or_create(
        pool: &sqlx::SqlitePool,
        profile: &TelegramProfile,
        default_timezone: &str,
        default_interval_minutes: i64,
    ) -> Result<(Self, bool), sqlx::Error> {
        if let Some(existing) = Self::find_by_telegram_id(pool, profile.telegram_id).await? {
            let changed = profile.username.is_some() && profile.username != existing.username
                || profile.first_name.is_some() && profile.first_name != existing.first_name
                || profile.last_name.is_some() && profile.last_name != existing.last_name;

            if changed {
                sqlx::query(
                    "UPDATE users SET username = COALESCE(?, username), first_name = COALESCE(?, first_name), \
                     last_name = COALESCE(?, last_name) WHERE id = ?"
                )
                .bind(&profile.username)
                .bind(&profile.first_name)
                .bind(&profile.last_name)
                .bind(existing.id)
                .execute(pool)
                .await?;

                let updated = Self::find_by_id(pool, existing.id)
                    .await?
                    .ok_or(sqlx::Error::RowNotFound)?;
                return Ok((updated, false));
            }

            return Ok((existing, false));
        }

        let now = to_db_timestamp(&Utc::now());
        let mut tx = pool.begin().await?;

        let user_id = sqlx::query(
            r#"
            INSERT INTO users (telegram_id, username, first_name, last_name, current_water, is_premium, registered_at)
            VALUES (?, ?, ?, ?, 0, 0, ?)
            "#
        )
        .bind(profile.telegram_id)
        .bind(&profile.username)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&now)
        .execute(&mut tx)
        .await?
        .last_insert_rowid();

        sqlx::query(
            "INSERT INTO user_settings (user_id, timezone, reminder_interval_minutes) VALUES (?, ?, ?)"
        )
        .bind(user_id)
        .bind(default_timezone)
        .bind(default_interval_minutes)
        .execute(&mut tx)
        .await?;

        tx.commit().await?;

        let created = Self::find_by_id(pool, user_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;
        Ok((created, true))
    }

    /// Stores a new weight and goal and starts the day's counter from zero.
    pub async fn set_weight(
        pool: &sqlx::SqlitePool,
        telegram_id: i64,
        weight: f64,
        water_goal: f64,
        water_day: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET weight = ?, water_goal = ?, current_water = 0, water_day = ? WHERE telegram_id = ?"
        )
        .bind(weight)
        .bind(water_goal)
        .bind(water_day)
        .bind(telegram_id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Self::find_by_telegram_id(pool, telegram_id).await
    }

    pub async fn mark_reminded(
        pool: &sqlx::SqlitePool,
        telegram_id: i64,
        at: &DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET last_water_reminder = ? WHERE telegram_id = ?")
            .bind(to_db_timestamp(at))
            .bind(telegram_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn set_premium<'e, E>(
        executor: E,
        user_id: i64,
        expiry: &DateTime<Utc>,
    ) -> Result<(), sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        sqlx::query("UPDATE users SET is_premium = 1, premium_expiry = ? WHERE id = ?")
            .bind(to_db_timestamp(expiry))
            .bind(user_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Clears the premium flag for every subscription that ended before `now`.
    pub async fn expire_premium(
        pool: &sqlx::SqlitePool,
        now: &DateTime<Utc>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET is_premium = 0 WHERE is_premium = 1 AND premium_expiry IS NOT NULL AND premium_expiry <= ?"
        )
        .bind(to_db_timestamp(now))
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
