pub mod plans;
pub mod premium;
pub mod reminders;
pub mod start;
pub mod water;

use chrono::{DateTime, Utc};
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use crate::bot::BotContext;
use crate::database::models::{User, UserSettings};
use crate::services::reminder::roll_over_if_needed;
use crate::utils::feedback::CommandFeedback;
use crate::utils::logging::log_database_error;

#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "NutriBot commands:")]
pub enum Command {
    #[command(description = "Register and open the main menu")]
    Start,
    #[command(description = "Display this help message")]
    Help,
    #[command(description = "Open the main menu")]
    Menu,
    #[command(description = "Set your weight in kg, e.g. /weight 70.5")]
    Weight(String),
    #[command(description = "Log water in ml, e.g. /drink 250")]
    Drink(String),
    #[command(description = "Show today's hydration progress")]
    Progress,
    #[command(description = "Show your water intake for the last 7 days")]
    History,
    #[command(description = "Reset today's water counter")]
    Reset,
    #[command(description = "Show and change reminder settings")]
    Reminders,
    #[command(description = "Set the reminder window, e.g. /window 08:00 22:00")]
    Window(String),
    #[command(description = "Set minutes between reminders, e.g. /interval 90")]
    Interval(String),
    #[command(description = "Set your timezone, e.g. /timezone Europe/Madrid")]
    Timezone(String),
    #[command(description = "Browse nutrition plans")]
    Plans,
    #[command(description = "Premium status and upgrade")]
    Premium,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Start => "/start",
            Command::Help => "/help",
            Command::Menu => "/menu",
            Command::Weight(_) => "/weight",
            Command::Drink(_) => "/drink",
            Command::Progress => "/progress",
            Command::History => "/history",
            Command::Reset => "/reset",
            Command::Reminders => "/reminders",
            Command::Window(_) => "/window",
            Command::Interval(_) => "/interval",
            Command::Timezone(_) => "/timezone",
            Command::Plans => "/plans",
            Command::Premium => "/premium",
        }
    }
}

/// A registered user with their settings, rolled over to the current local day.
#[derive(Debug, Clone)]
pub struct Profile {
    pub user: User,
    pub settings: UserSettings,
}

/// Loads a registered user. `None` means they never ran /start.
pub async fn load_profile(
    ctx: &BotContext,
    telegram_id: i64,
    now: &DateTime<Utc>,
) -> Result<Option<Profile>, sqlx::Error> {
    let Some(user) = User::find_by_telegram_id(ctx.pool(), telegram_id).await? else {
        return Ok(None);
    };
    let settings = UserSettings::find_by_user_id(ctx.pool(), user.id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;

    let (user, rolled_over) = roll_over_if_needed(ctx.pool(), user, &settings, now).await?;

    // A job cancelled when yesterday's goal was met comes back with the new day
    if rolled_over && settings.water_reminders_enabled && user.water_goal.is_some() {
        if let Err(e) = ctx.reminders
            .ensure_scheduled(telegram_id, settings.reminder_interval_minutes)
            .await
        {
            tracing::error!("Failed to reschedule reminders for user {}: {}", telegram_id, e);
        }
    }

    Ok(Some(Profile { user, settings }))
}

/// Like [`load_profile`], but answers the chat itself when there is no profile.
pub async fn require_profile(
    ctx: &BotContext,
    feedback: &CommandFeedback,
    telegram_id: i64,
    now: &DateTime<Utc>,
) -> ResponseResult<Option<Profile>> {
    match load_profile(ctx, telegram_id, now).await {
        Ok(Some(profile)) => Ok(Some(profile)),
        Ok(None) => {
            feedback.not_registered().await?;
            Ok(None)
        }
        Err(e) => {
            log_database_error("SELECT", "users", &e.to_string(), Some(&format!("telegram_id={telegram_id}")));
            feedback.apology().await?;
            Ok(None)
        }
    }
}

/// Sender id and display name for logs.
pub fn sender(msg: &Message) -> (i64, String) {
    match msg.from() {
        Some(user) => (
            user.id.0 as i64,
            user.username.clone().unwrap_or_else(|| user.first_name.clone()),
        ),
        None => (msg.chat.id.0, "unknown".to_string()),
    }
}
