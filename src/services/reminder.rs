use tokio_cron_scheduler::{JobScheduler, Job};
use chrono::{DateTime, Utc};
use teloxide::{Bot, prelude::*};
use teloxide::types::ParseMode;
use tokio::sync::Mutex;
use uuid::Uuid;
use crate::bot::keyboards;
use crate::database::{connection::DatabaseManager, models::*};
use crate::error::ReminderError;
use crate::services::hydration::{evaluate_reminder, format_progress, needs_daily_reset, ReminderDecision};
use crate::utils::datetime::{local_day, timezone_or_utc};
use crate::utils::logging::{log_reminder_event, log_system_event};
use crate::utils::markdown::escape_markdown;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Rollover and premium expiry run at the top of every hour so each
/// timezone's midnight is picked up within the hour.
const MAINTENANCE_SCHEDULE: &str = "0 0 * * * *";

/// Per-user water reminder jobs on a shared scheduler.
#[derive(Clone)]
pub struct ReminderService {
    bot: Bot,
    db: Arc<DatabaseManager>,
    scheduler: JobScheduler,
    jobs: Arc<Mutex<HashMap<i64, Uuid>>>,
    running: Arc<AtomicBool>,
}

/// What one maintenance pass changed.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MaintenanceReport {
    /// Telegram ids whose counter was reset for a new local day.
    pub reset_users: Vec<i64>,
    pub expired_premium: u64,
}

impl ReminderService {
    pub async fn new(bot: Bot, db: Arc<DatabaseManager>) -> Result<Self, ReminderError> {
        let scheduler = JobScheduler::new().await?;

        Ok(Self {
            bot,
            db,
            scheduler,
            jobs: Arc::new(Mutex::new(HashMap::new())),
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    pub async fn start(&self) -> Result<(), ReminderError> {
        let service = self.clone();

        let maintenance_job = Job::new_async(MAINTENANCE_SCHEDULE, move |_uuid, _l| {
            let service = service.clone();
            Box::pin(async move {
                service.maintenance_tick().await;
            })
        })?;

        self.scheduler.add(maintenance_job).await?;
        self.scheduler.start().await?;
        self.running.store(true, Ordering::SeqCst);

        let restored = self.restore_jobs().await?;
        log_system_event(
            "Reminder service started",
            Some(&format!("{restored} reminder jobs restored, maintenance hourly")),
        );
        Ok(())
    }

    pub async fn stop(&self) -> Result<(), ReminderError> {
        let mut scheduler = self.scheduler.clone();
        scheduler.shutdown().await?;
        self.running.store(false, Ordering::SeqCst);
        self.jobs.lock().await.clear();
        Ok(())
    }

    /// Whether the scheduler has been started and not stopped since.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Recreates jobs for every user with reminders on and a goal set.
    pub async fn restore_jobs(&self) -> Result<usize, ReminderError> {
        let targets = UserSettings::find_reminder_targets(&self.db.pool).await?;
        let mut restored = 0;
        for (telegram_id, interval) in targets {
            match self.schedule_for_user(telegram_id, interval).await {
                Ok(()) => restored += 1,
                Err(e) => tracing::error!("Failed to restore reminders for user {}: {}", telegram_id, e),
            }
        }
        Ok(restored)
    }

    /// Starts a repeating reminder for the user, replacing any existing one.
    /// The first reminder fires one interval from now.
    pub async fn schedule_for_user(&self, telegram_id: i64, interval_minutes: i64) -> Result<(), ReminderError> {
        if interval_minutes <= 0 {
            return Err(ReminderError::InvalidInterval(interval_minutes));
        }

        let mut jobs = self.jobs.lock().await;
        if let Some(old) = jobs.remove(&telegram_id) {
            self.scheduler.remove(&old).await?;
        }

        let bot = self.bot.clone();
        let db = self.db.clone();
        let period = Duration::from_secs(interval_minutes as u64 * 60);

        let job = Job::new_repeated_async(period, move |_uuid, _l| {
            let bot = bot.clone();
            let db = db.clone();
            Box::pin(async move {
                if let Err(e) = send_reminder_tick(&bot, &db.pool, telegram_id, Utc::now()).await {
                    tracing::error!("Reminder tick failed for user {}: {}", telegram_id, e);
                }
            })
        })?;

        let id = self.scheduler.add(job).await?;
        jobs.insert(telegram_id, id);
        tracing::debug!("Scheduled water reminders for user {} every {} minutes", telegram_id, interval_minutes);
        Ok(())
    }

    /// Schedules a reminder only if the user has none yet.
    pub async fn ensure_scheduled(&self, telegram_id: i64, interval_minutes: i64) -> Result<bool, ReminderError> {
        if self.is_scheduled(telegram_id).await {
            return Ok(false);
        }
        self.schedule_for_user(telegram_id, interval_minutes).await?;
        Ok(true)
    }

    /// Removes the user's reminder job. Returns whether one existed.
    pub async fn cancel_for_user(&self, telegram_id: i64) -> Result<bool, ReminderError> {
        let mut jobs = self.jobs.lock().await;
        match jobs.remove(&telegram_id) {
            Some(id) => {
                self.scheduler.remove(&id).await?;
                tracing::debug!("Cancelled water reminders for user {}", telegram_id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn is_scheduled(&self, telegram_id: i64) -> bool {
        self.jobs.lock().await.contains_key(&telegram_id)
    }

    pub async fn active_jobs(&self) -> usize {
        self.jobs.lock().await.len()
    }

    async fn maintenance_tick(&self) {
        let report = match run_maintenance(&self.db.pool, Utc::now()).await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!("Reminder maintenance failed: {}", e);
                return;
            }
        };

        if !report.reset_users.is_empty() || report.expired_premium > 0 {
            log_system_event(
                "Maintenance",
                Some(&format!(
                    "{} counters reset, {} premium subscriptions expired",
                    report.reset_users.len(),
                    report.expired_premium
                )),
            );
        }

        // Jobs cancelled after a goal was reached come back on the new day
        for telegram_id in report.reset_users {
            let settings = match UserSettings::find_by_telegram_id(&self.db.pool, telegram_id).await {
                Ok(Some(settings)) if settings.water_reminders_enabled => settings,
                Ok(_) => continue,
                Err(e) => {
                    tracing::error!("Failed to load settings for user {}: {}", telegram_id, e);
                    continue;
                }
            };
            if let Err(e) = self.ensure_scheduled(telegram_id, settings.reminder_interval_minutes).await {
                tracing::error!("Failed to reschedule reminders for user {}: {}", telegram_id, e);
            }
        }
    }
}

/// Resets the day's counter when the user's local date has moved on.
///
/// Returns the up-to-date user and whether a reset happened.
pub async fn roll_over_if_needed(
    pool: &sqlx::SqlitePool,
    user: User,
    settings: &UserSettings,
    now: &DateTime<Utc>,
) -> Result<(User, bool), sqlx::Error> {
    let today = local_day(now, &timezone_or_utc(&settings.timezone));
    if !needs_daily_reset(user.water_day.as_deref(), &today) {
        return Ok((user, false));
    }

    WaterLog::reset_day(pool, user.id, &today, now).await?;
    let refreshed = User::find_by_id(pool, user.id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;
    Ok((refreshed, true))
}

/// Loads the user, rolls their day over if needed and decides whether to remind.
///
/// Returns `None` for users that no longer exist.
pub async fn prepare_reminder(
    pool: &sqlx::SqlitePool,
    telegram_id: i64,
    now: &DateTime<Utc>,
) -> Result<Option<(User, UserSettings, ReminderDecision)>, sqlx::Error> {
    let Some(user) = User::find_by_telegram_id(pool, telegram_id).await? else {
        return Ok(None);
    };
    let Some(settings) = UserSettings::find_by_user_id(pool, user.id).await? else {
        return Ok(None);
    };

    let (user, _) = roll_over_if_needed(pool, user, &settings, now).await?;
    let decision = evaluate_reminder(&user, &settings, now);
    Ok(Some((user, settings, decision)))
}

pub async fn send_reminder_tick(
    bot: &Bot,
    pool: &sqlx::SqlitePool,
    telegram_id: i64,
    now: DateTime<Utc>,
) -> Result<ReminderDecision, Box<dyn std::error::Error + Send + Sync>> {
    let Some((user, settings, decision)) = prepare_reminder(pool, telegram_id, &now).await? else {
        tracing::warn!("Reminder fired for unknown user {}", telegram_id);
        return Ok(ReminderDecision::SkipDisabled);
    };

    if decision != ReminderDecision::Send {
        log_reminder_event(telegram_id, decision.describe(), false);
        return Ok(decision);
    }

    let goal = user.water_goal.unwrap_or_default();
    let text = format!(
        "{}\n\n{}",
        escape_markdown(&format!("💧 Time to drink water, {}!", user.display_name())),
        format_progress(user.current_water, goal)
    );

    bot.send_message(ChatId(telegram_id), text)
        .parse_mode(ParseMode::MarkdownV2)
        .reply_markup(keyboards::water_reminder_keyboard())
        .disable_notification(settings.is_silent())
        .await?;

    User::mark_reminded(pool, telegram_id, &now).await?;
    log_reminder_event(telegram_id, decision.describe(), true);
    Ok(decision)
}

/// Resets counters for users whose local day changed and expires lapsed premium.
pub async fn run_maintenance(
    pool: &sqlx::SqlitePool,
    now: DateTime<Utc>,
) -> Result<MaintenanceReport, sqlx::Error> {
    let mut report = MaintenanceReport::default();

    for (user_id, telegram_id, water_day, timezone) in get_tracked_days(pool).await? {
        let today = local_day(&now, &timezone_or_utc(&timezone));
        if needs_daily_reset(water_day.as_deref(), &today) {
            WaterLog::reset_day(pool, user_id, &today, &now).await?;
            report.reset_users.push(telegram_id);
        }
    }

    report.expired_premium = User::expire_premium(pool, &now).await?;
    Ok(report)
}

// Users with a running daily counter, with the timezone that decides their day
async fn get_tracked_days(
    pool: &sqlx::SqlitePool,
) -> Result<Vec<(i64, i64, Option<String>, String)>, sqlx::Error> {
    sqlx::query_as::<_, (i64, i64, Option<String>, String)>(
        "SELECT u.id, u.telegram_id, u.water_day, s.timezone FROM users u \
         JOIN user_settings s ON s.user_id = u.id \
         WHERE u.water_goal IS NOT NULL"
    )
    .fetch_all(pool)
    .await
}
