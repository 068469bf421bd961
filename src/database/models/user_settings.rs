use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const NOTIFY_SOUND: &str = "sound";

const SETTINGS_COLUMNS: &str = "id, user_id, water_reminders_enabled, reminder_start_time, reminder_end_time, \
    reminder_interval_minutes, notification_preference, timezone";

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserSettings {
    pub id: i64,
    pub user_id: i64,
    pub water_reminders_enabled: bool,
    pub reminder_start_time: String, // HH:MM, local time
    pub reminder_end_time: String,   // HH:MM, local time
    pub reminder_interval_minutes: i64,
    pub notification_preference: String,
    pub timezone: String,
}

impl UserSettings {
    pub fn is_silent(&self) -> bool {
        self.notification_preference != NOTIFY_SOUND
    }

    pub async fn find_by_user_id(
        pool: &sqlx::SqlitePool,
        user_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {SETTINGS_COLUMNS} FROM user_settings WHERE user_id = ?");
        sqlx::query_as::<_, UserSettings>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_telegram_id(
        pool: &sqlx::SqlitePool,
        telegram_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, UserSettings>(
            "SELECT s.id, s.user_id, s.water_reminders_enabled, s.reminder_start_time, s.reminder_end_time, \
             s.reminder_interval_minutes, s.notification_preference, s.timezone \
             FROM user_settings s JOIN users u ON u.id = s.user_id WHERE u.telegram_id = ?"
        )
        .bind(telegram_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn set_reminders_enabled(
        pool: &sqlx::SqlitePool,
        user_id: i64,
        enabled: bool,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE user_settings SET water_reminders_enabled = ? WHERE user_id = ?")
            .bind(enabled)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn set_window(
        pool: &sqlx::SqlitePool,
        user_id: i64,
        start: &str,
        end: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE user_settings SET reminder_start_time = ?, reminder_end_time = ? WHERE user_id = ?")
            .bind(start)
            .bind(end)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn set_interval(
        pool: &sqlx::SqlitePool,
        user_id: i64,
        minutes: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE user_settings SET reminder_interval_minutes = ? WHERE user_id = ?")
            .bind(minutes)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn set_timezone(
        pool: &sqlx::SqlitePool,
        user_id: i64,
        timezone: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE user_settings SET timezone = ? WHERE user_id = ?")
            .bind(timezone)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Flips between silent and audible reminders, returning the new preference.
    pub async fn toggle_notification(
        pool: &sqlx::SqlitePool,
        user_id: i64,
    ) -> Result<String, sqlx::Error> {
        sqlx::query(
            "UPDATE user_settings SET notification_preference = \
             CASE WHEN notification_preference = 'sound' THEN 'silent' ELSE 'sound' END WHERE user_id = ?"
        )
        .bind(user_id)
        .execute(pool)
        .await?;

        sqlx::query_scalar("SELECT notification_preference FROM user_settings WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(pool)
            .await
    }

    /// Users that should have a reminder job: reminders on and a goal set.
    pub async fn find_reminder_targets(
        pool: &sqlx::SqlitePool,
    ) -> Result<Vec<(i64, i64)>, sqlx::Error> {
        sqlx::query_as::<_, (i64, i64)>(
            "SELECT u.telegram_id, s.reminder_interval_minutes FROM users u \
             JOIN user_settings s ON s.user_id = u.id \
             WHERE s.water_reminders_enabled = 1 AND u.water_goal IS NOT NULL AND u.water_goal > 0"
        )
        .fetch_all(pool)
        .await
    }
}
