use chrono::{DateTime, Duration, Utc};
use teloxide::prelude::*;
use crate::bot::commands::{require_profile, sender, Profile};
use crate::bot::{keyboards, BotContext, HandlerResult, State, WaterDialogue};
use crate::database::models::{User, WaterLog};
use crate::services::hydration::{calculate_water_goal, daily_totals, format_progress, goal_reached};
use crate::services::reminder::roll_over_if_needed;
use crate::utils::datetime::{local_day, start_of_local_day, timezone_or_utc};
use crate::utils::feedback::CommandFeedback;
use crate::utils::logging::{
    log_command_error, log_command_start, log_command_success, log_validation_error,
};
use crate::utils::markdown::escape_markdown;
use crate::utils::validation::{validate_drink_amount, validate_weight};

pub const WEIGHT_PROMPT: &str = "💧 To set up hydration reminders, send your current weight in kilograms \
    (for example 65.5 or 72,3).\n\nSend just the number, without units.";

const HISTORY_DAYS: i64 = 7;

/// Result of logging a drink.
#[derive(Debug, Clone, PartialEq)]
pub struct WaterOutcome {
    pub current: f64,
    pub goal: f64,
    pub added: f64,
    /// This drink is the one that reached the goal.
    pub just_reached: bool,
}

/// Adds a drink to today's counter, clamped to the goal.
///
/// Returns `None` when the user has no goal yet. Reaching the goal pauses
/// the user's reminder job until the next day.
pub async fn log_water(
    ctx: &BotContext,
    profile: &Profile,
    amount: f64,
    now: &DateTime<Utc>,
) -> Result<Option<WaterOutcome>, sqlx::Error> {
    let user = &profile.user;
    if !matches!(user.water_goal, Some(goal) if goal > 0.0) {
        return Ok(None);
    }

    let today = local_day(now, &timezone_or_utc(&profile.settings.timezone));
    let intake = match WaterLog::record_consumption(ctx.pool(), user.id, amount, &today, now).await? {
        Some(intake) => intake,
        None => {
            // Stored counter is from another day; roll it over and retry once
            let stored = User::find_by_id(ctx.pool(), user.id)
                .await?
                .ok_or(sqlx::Error::RowNotFound)?;
            let (_, rolled_over) = roll_over_if_needed(ctx.pool(), stored, &profile.settings, now).await?;
            if rolled_over && profile.settings.water_reminders_enabled {
                if let Err(e) = ctx.reminders
                    .ensure_scheduled(user.telegram_id, profile.settings.reminder_interval_minutes)
                    .await
                {
                    tracing::error!("Failed to reschedule reminders for user {}: {}", user.telegram_id, e);
                }
            }
            match WaterLog::record_consumption(ctx.pool(), user.id, amount, &today, now).await? {
                Some(intake) => intake,
                None => return Ok(None),
            }
        }
    };

    let just_reached =
        !goal_reached(intake.before, Some(intake.goal)) && goal_reached(intake.after, Some(intake.goal));
    if just_reached {
        if let Err(e) = ctx.reminders.cancel_for_user(user.telegram_id).await {
            tracing::error!("Failed to pause reminders for user {}: {}", user.telegram_id, e);
        }
    }

    Ok(Some(WaterOutcome {
        current: intake.after,
        goal: intake.goal,
        added: intake.added,
        just_reached,
    }))
}

/// MarkdownV2 reply for a logged drink.
pub fn outcome_text(outcome: &WaterOutcome) -> String {
    if outcome.just_reached {
        return escape_markdown(&format!(
            "🎉 Congratulations! You reached your daily hydration goal! 🎉\n\
             💧 Total today: {:.0} ml\n\n\
             Reminders are paused until tomorrow.",
            outcome.current
        ));
    }

    let header = if outcome.added > 0.0 {
        format!("✅ Logged {:.0} ml.", outcome.added)
    } else {
        "✅ You already reached today's goal, nothing more to log.".to_string()
    };

    format!("{}\n\n{}", escape_markdown(&header), format_progress(outcome.current, outcome.goal))
}

/// Stores a new weight and goal, restarts today's counter and reschedules reminders.
///
/// The returned flag is false when reminders should run but could not be scheduled.
pub async fn apply_weight(
    ctx: &BotContext,
    profile: &Profile,
    weight: f64,
    now: &DateTime<Utc>,
) -> Result<(User, bool), sqlx::Error> {
    let telegram_id = profile.user.telegram_id;
    let goal = calculate_water_goal(weight);
    let today = local_day(now, &timezone_or_utc(&profile.settings.timezone));

    let user = User::set_weight(ctx.pool(), telegram_id, weight, goal, &today)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;

    let mut scheduled = true;
    if profile.settings.water_reminders_enabled {
        if let Err(e) = ctx.reminders
            .schedule_for_user(telegram_id, profile.settings.reminder_interval_minutes)
            .await
        {
            tracing::error!("Failed to schedule reminders for user {}: {}", telegram_id, e);
            scheduled = false;
        }
    }

    Ok((user, scheduled))
}

pub fn weight_saved_text(user: &User) -> String {
    escape_markdown(&format!(
        "✅ Weight saved: {} kg\n📌 Your daily water goal is {:.0} ml",
        user.weight.unwrap_or_default(),
        user.water_goal.unwrap_or_default()
    ))
}

pub fn no_goal_text() -> String {
    escape_markdown("⚖ Set your weight first so I can work out your daily goal, e.g. /weight 70")
}

pub async fn handle_weight(
    bot: Bot,
    msg: Message,
    input: String,
    dialogue: WaterDialogue,
    ctx: &BotContext,
) -> HandlerResult {
    if input.trim().is_empty() {
        dialogue.update(State::AwaitingWeight).await?;
        CommandFeedback::new(bot, msg.chat.id)
            .send_formatted(escape_markdown(WEIGHT_PROMPT), Some(keyboards::weight_input_keyboard()))
            .await?;
        return Ok(());
    }

    save_weight(bot, msg, &input, dialogue, ctx, "/weight").await
}

/// Plain text received while the dialogue waits for a weight.
pub async fn handle_weight_input(
    bot: Bot,
    msg: Message,
    dialogue: WaterDialogue,
    ctx: &BotContext,
) -> HandlerResult {
    let Some(text) = msg.text().map(str::to_string) else {
        CommandFeedback::new(bot, msg.chat.id)
            .warning("Please send your weight as a number, e.g. 68.5")
            .await?;
        return Ok(());
    };

    save_weight(bot, msg, &text, dialogue, ctx, "weight_input").await
}

async fn save_weight(
    bot: Bot,
    msg: Message,
    input: &str,
    dialogue: WaterDialogue,
    ctx: &BotContext,
    command: &str,
) -> HandlerResult {
    let (telegram_id, username) = sender(&msg);
    log_command_start(command, &username, telegram_id, Some(input));
    let feedback = CommandFeedback::new(bot, msg.chat.id);
    let now = Utc::now();

    let weight = match validate_weight(input) {
        Ok(weight) => weight,
        Err(e) => {
            log_validation_error(command, "weight", input, &e.to_string(), telegram_id);
            feedback
                .validation_error(&e.to_string(), "Send a weight above 0 and up to 300 kg, e.g. 68.5 or 72,3")
                .await?;
            return Ok(());
        }
    };

    let Some(profile) = require_profile(ctx, &feedback, telegram_id, &now).await? else {
        dialogue.exit().await?;
        return Ok(());
    };

    match apply_weight(ctx, &profile, weight, &now).await {
        Ok((user, scheduled)) => {
            dialogue.update(State::Idle).await?;
            let mut text = weight_saved_text(&user);
            if !scheduled {
                text.push_str(&escape_markdown(
                    "\n\n⚠️ Your weight was saved but reminders could not be started. Please try again later.",
                ));
            }
            feedback.send_formatted(text, Some(keyboards::water_progress_keyboard())).await?;
            log_command_success(command, &username, telegram_id, Some(&format!("{weight} kg")));
        }
        Err(e) => {
            log_command_error(command, &username, telegram_id, &e.to_string());
            feedback.apology().await?;
        }
    }
    Ok(())
}

pub async fn handle_drink(bot: Bot, msg: Message, input: String, ctx: &BotContext) -> HandlerResult {
    let (telegram_id, username) = sender(&msg);
    log_command_start("/drink", &username, telegram_id, Some(&input));
    let feedback = CommandFeedback::new(bot, msg.chat.id);
    let now = Utc::now();

    let amount = match validate_drink_amount(&input) {
        Ok(amount) => amount,
        Err(e) => {
            log_validation_error("/drink", "amount", &input, &e.to_string(), telegram_id);
            feedback
                .validation_error(&e.to_string(), "Use /drink <ml>, e.g. /drink 250, or tap a button under /progress")
                .await?;
            return Ok(());
        }
    };

    let Some(profile) = require_profile(ctx, &feedback, telegram_id, &now).await? else {
        return Ok(());
    };

    match log_water(ctx, &profile, amount, &now).await {
        Ok(Some(outcome)) => {
            feedback
                .send_formatted(outcome_text(&outcome), Some(keyboards::water_progress_keyboard()))
                .await?;
            log_command_success("/drink", &username, telegram_id, Some(&format!("+{:.0} ml", outcome.added)));
        }
        Ok(None) => {
            feedback.send_formatted(no_goal_text(), None).await?;
        }
        Err(e) => {
            log_command_error("/drink", &username, telegram_id, &e.to_string());
            feedback.apology().await?;
        }
    }
    Ok(())
}

pub async fn handle_progress(bot: Bot, msg: Message, ctx: &BotContext) -> HandlerResult {
    let (telegram_id, _) = sender(&msg);
    let feedback = CommandFeedback::new(bot, msg.chat.id);
    let now = Utc::now();

    let Some(profile) = require_profile(ctx, &feedback, telegram_id, &now).await? else {
        return Ok(());
    };

    match profile.user.water_goal {
        Some(goal) if goal > 0.0 => {
            feedback
                .send_formatted(
                    format_progress(profile.user.current_water, goal),
                    Some(keyboards::water_progress_keyboard()),
                )
                .await?;
        }
        _ => {
            feedback.send_formatted(no_goal_text(), None).await?;
        }
    }
    Ok(())
}

pub async fn handle_history(bot: Bot, msg: Message, ctx: &BotContext) -> HandlerResult {
    let (telegram_id, username) = sender(&msg);
    let feedback = CommandFeedback::new(bot, msg.chat.id);
    let now = Utc::now();

    let Some(profile) = require_profile(ctx, &feedback, telegram_id, &now).await? else {
        return Ok(());
    };

    let tz = timezone_or_utc(&profile.settings.timezone);
    let since = start_of_local_day(&(now - Duration::days(HISTORY_DAYS - 1)), &tz);

    let logs = match WaterLog::find_consumption_since(ctx.pool(), profile.user.id, &since).await {
        Ok(logs) => logs,
        Err(e) => {
            log_command_error("/history", &username, telegram_id, &e.to_string());
            feedback.apology().await?;
            return Ok(());
        }
    };

    let totals = daily_totals(&logs, &tz);
    if totals.is_empty() {
        feedback.info("No water logged in the last 7 days. Use /drink to log some!").await?;
        return Ok(());
    }

    let goal = profile.user.water_goal.unwrap_or_default();
    let mut text = escape_markdown("📅 Water intake, last 7 days\n\n");
    for (day, total) in &totals {
        let mark = if goal > 0.0 && *total >= goal { " ✅" } else { "" };
        text.push_str(&escape_markdown(&format!("{day}: {total:.0} ml{mark}\n")));
    }
    if goal > 0.0 {
        text.push_str(&escape_markdown(&format!("\n🎯 Daily goal: {goal:.0} ml")));
    }

    feedback.send_formatted(text, None).await?;
    Ok(())
}

pub async fn handle_reset(bot: Bot, msg: Message, ctx: &BotContext) -> HandlerResult {
    let (telegram_id, username) = sender(&msg);
    log_command_start("/reset", &username, telegram_id, None);
    let feedback = CommandFeedback::new(bot, msg.chat.id);
    let now = Utc::now();

    let Some(profile) = require_profile(ctx, &feedback, telegram_id, &now).await? else {
        return Ok(());
    };

    let today = local_day(&now, &timezone_or_utc(&profile.settings.timezone));
    let discarded = match WaterLog::reset_day(ctx.pool(), profile.user.id, &today, &now).await {
        Ok(discarded) => discarded,
        Err(e) => {
            log_command_error("/reset", &username, telegram_id, &e.to_string());
            feedback.apology().await?;
            return Ok(());
        }
    };

    if profile.settings.water_reminders_enabled && profile.user.water_goal.is_some() {
        if let Err(e) = ctx.reminders
            .ensure_scheduled(telegram_id, profile.settings.reminder_interval_minutes)
            .await
        {
            tracing::error!("Failed to resume reminders for user {}: {}", telegram_id, e);
        }
    }

    feedback
        .success(&format!("Today's counter was reset ({discarded:.0} ml cleared)."))
        .await?;
    log_command_success("/reset", &username, telegram_id, Some(&format!("{discarded:.0} ml cleared")));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_text_when_goal_just_reached() {
        let text = outcome_text(&WaterOutcome {
            current: 2450.0,
            goal: 2450.0,
            added: 250.0,
            just_reached: true,
        });
        assert!(text.contains("Congratulations"));
        assert!(text.contains("2450 ml"));
        assert!(text.contains("paused until tomorrow\\."));
    }

    #[test]
    fn test_outcome_text_after_goal() {
        let text = outcome_text(&WaterOutcome {
            current: 2450.0,
            goal: 2450.0,
            added: 0.0,
            just_reached: false,
        });
        assert!(text.contains("already reached"));
    }

    #[test]
    fn test_outcome_text_regular_drink() {
        let text = outcome_text(&WaterOutcome {
            current: 750.0,
            goal: 2450.0,
            added: 500.0,
            just_reached: false,
        });
        assert!(text.starts_with("✅ Logged 500 ml\\."));
        assert!(text.contains("1700 ml to go"));
    }
}
