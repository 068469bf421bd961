use chrono::Utc;
use teloxide::prelude::*;
use crate::bot::commands::{require_profile, sender, Profile};
use crate::bot::{keyboards, BotContext, HandlerResult};
use crate::database::models::UserSettings;
use crate::utils::datetime::parse_timezone;
use crate::utils::feedback::CommandFeedback;
use crate::utils::logging::{
    log_command_error, log_command_start, log_command_success, log_validation_error,
};
use crate::utils::markdown::escape_markdown;
use crate::utils::validation::{validate_reminder_interval, validate_reminder_window};

/// MarkdownV2 summary of a user's reminder settings.
pub fn settings_text(settings: &UserSettings, job_active: bool) -> String {
    let status = match (settings.water_reminders_enabled, job_active) {
        (false, _) => "off",
        (true, true) => "on",
        (true, false) => "on, paused until tomorrow",
    };
    let sound = if settings.is_silent() { "silent" } else { "with sound" };

    escape_markdown(&format!(
        "⏰ Water reminders\n\n\
         Status: {status}\n\
         Window: {} - {}\n\
         Every: {} minutes\n\
         Notifications: {sound}\n\
         Timezone: {}\n\n\
         Change with /window, /interval and /timezone.",
        settings.reminder_start_time,
        settings.reminder_end_time,
        settings.reminder_interval_minutes,
        settings.timezone
    ))
}

/// Turns reminders on or off for the user and starts or stops the job to match.
pub async fn set_reminders_enabled(
    ctx: &BotContext,
    profile: &Profile,
    enabled: bool,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    UserSettings::set_reminders_enabled(ctx.pool(), profile.user.id, enabled).await?;

    let telegram_id = profile.user.telegram_id;
    if !enabled {
        ctx.reminders.cancel_for_user(telegram_id).await?;
    } else if profile.user.water_goal.is_some() {
        ctx.reminders
            .schedule_for_user(telegram_id, profile.settings.reminder_interval_minutes)
            .await?;
    }
    Ok(())
}

pub async fn handle_reminders(bot: Bot, msg: Message, ctx: &BotContext) -> HandlerResult {
    let (telegram_id, _) = sender(&msg);
    let feedback = CommandFeedback::new(bot, msg.chat.id);

    let Some(profile) = require_profile(ctx, &feedback, telegram_id, &Utc::now()).await? else {
        return Ok(());
    };

    let job_active = ctx.reminders.is_scheduled(telegram_id).await;
    feedback
        .send_formatted(
            settings_text(&profile.settings, job_active),
            Some(keyboards::reminder_settings_keyboard(
                profile.settings.water_reminders_enabled,
                profile.settings.is_silent(),
            )),
        )
        .await?;
    Ok(())
}

pub async fn handle_window(bot: Bot, msg: Message, input: String, ctx: &BotContext) -> HandlerResult {
    let (telegram_id, username) = sender(&msg);
    log_command_start("/window", &username, telegram_id, Some(&input));
    let feedback = CommandFeedback::new(bot, msg.chat.id);

    let (start, end) = match validate_reminder_window(&input) {
        Ok(window) => window,
        Err(e) => {
            log_validation_error("/window", "window", &input, &e.to_string(), telegram_id);
            feedback
                .validation_error(&e.to_string(), "Use /window 08:00 22:00, or /window 22:00 06:00 for a night window")
                .await?;
            return Ok(());
        }
    };

    let Some(profile) = require_profile(ctx, &feedback, telegram_id, &Utc::now()).await? else {
        return Ok(());
    };

    if let Err(e) = UserSettings::set_window(ctx.pool(), profile.user.id, &start, &end).await {
        log_command_error("/window", &username, telegram_id, &e.to_string());
        feedback.apology().await?;
        return Ok(());
    }

    let note = if start == end { " (all day)" } else { "" };
    feedback
        .success(&format!("Reminders will be sent between {start} and {end}{note}."))
        .await?;
    log_command_success("/window", &username, telegram_id, Some(&format!("{start}-{end}")));
    Ok(())
}

pub async fn handle_interval(bot: Bot, msg: Message, input: String, ctx: &BotContext) -> HandlerResult {
    let (telegram_id, username) = sender(&msg);
    log_command_start("/interval", &username, telegram_id, Some(&input));
    let feedback = CommandFeedback::new(bot, msg.chat.id);

    let minutes = match validate_reminder_interval(&input) {
        Ok(minutes) => minutes,
        Err(e) => {
            log_validation_error("/interval", "minutes", &input, &e.to_string(), telegram_id);
            feedback.validation_error(&e.to_string(), "Use /interval 60 for hourly reminders").await?;
            return Ok(());
        }
    };

    let Some(profile) = require_profile(ctx, &feedback, telegram_id, &Utc::now()).await? else {
        return Ok(());
    };

    if let Err(e) = UserSettings::set_interval(ctx.pool(), profile.user.id, minutes).await {
        log_command_error("/interval", &username, telegram_id, &e.to_string());
        feedback.apology().await?;
        return Ok(());
    }

    // A paused job stays paused; the new interval applies when it resumes
    if ctx.reminders.is_scheduled(telegram_id).await {
        if let Err(e) = ctx.reminders.schedule_for_user(telegram_id, minutes).await {
            log_command_error("/interval", &username, telegram_id, &e.to_string());
            feedback.apology().await?;
            return Ok(());
        }
    }

    feedback.success(&format!("Reminders will come every {minutes} minutes.")).await?;
    log_command_success("/interval", &username, telegram_id, Some(&format!("{minutes} min")));
    Ok(())
}

pub async fn handle_timezone(bot: Bot, msg: Message, input: String, ctx: &BotContext) -> HandlerResult {
    let (telegram_id, username) = sender(&msg);
    log_command_start("/timezone", &username, telegram_id, Some(&input));
    let feedback = CommandFeedback::new(bot, msg.chat.id);

    let tz = match parse_timezone(&input) {
        Ok(tz) => tz,
        Err(e) => {
            log_validation_error("/timezone", "timezone", &input, &e.to_string(), telegram_id);
            feedback
                .validation_error(&e.to_string(), "Use an IANA name such as Europe/Madrid or America/Mexico_City")
                .await?;
            return Ok(());
        }
    };

    let Some(profile) = require_profile(ctx, &feedback, telegram_id, &Utc::now()).await? else {
        return Ok(());
    };

    if let Err(e) = UserSettings::set_timezone(ctx.pool(), profile.user.id, tz.name()).await {
        log_command_error("/timezone", &username, telegram_id, &e.to_string());
        feedback.apology().await?;
        return Ok(());
    }

    feedback.success(&format!("Timezone set to {}.", tz.name())).await?;
    log_command_success("/timezone", &username, telegram_id, Some(tz.name()));
    Ok(())
}
