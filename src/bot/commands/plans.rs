use chrono::{DateTime, Utc};
use teloxide::prelude::*;
use teloxide::types::InputFile;
use crate::bot::commands::{require_profile, sender, Profile};
use crate::bot::{keyboards, BotContext, HandlerResult};
use crate::database::models::PlanDownload;
use crate::error::PlanError;
use crate::services::plans::{check_download_allowed, remaining_downloads, PlanCategory};
use crate::services::premium::is_premium_active;
use crate::utils::datetime::{start_of_local_day, timezone_or_utc};
use crate::utils::feedback::CommandFeedback;
use crate::utils::logging::{log_command_error, log_command_start, log_command_success};
use crate::utils::markdown::escape_markdown;

pub fn plans_menu_text(profile: &Profile, downloads_today: i64, limit: i64, now: &DateTime<Utc>) -> String {
    let quota = if is_premium_active(&profile.user, now) {
        "🌟 Premium: unlimited downloads.".to_string()
    } else {
        format!(
            "Free plan: {} of {} downloads left today.",
            remaining_downloads(downloads_today, limit),
            limit
        )
    };
    escape_markdown(&format!("🍎 Nutrition plans\n\nPick a goal and I will send you a plan.\n{quota}"))
}

pub async fn downloads_today(
    ctx: &BotContext,
    profile: &Profile,
    now: &DateTime<Utc>,
) -> Result<i64, sqlx::Error> {
    let since = start_of_local_day(now, &timezone_or_utc(&profile.settings.timezone));
    PlanDownload::count_since(ctx.pool(), profile.user.id, &since).await
}

pub async fn handle_plans(bot: Bot, msg: Message, ctx: &BotContext) -> HandlerResult {
    let (telegram_id, username) = sender(&msg);
    let feedback = CommandFeedback::new(bot, msg.chat.id);
    let now = Utc::now();

    let Some(profile) = require_profile(ctx, &feedback, telegram_id, &now).await? else {
        return Ok(());
    };

    let count = match downloads_today(ctx, &profile, &now).await {
        Ok(count) => count,
        Err(e) => {
            log_command_error("/plans", &username, telegram_id, &e.to_string());
            feedback.apology().await?;
            return Ok(());
        }
    };

    feedback
        .send_formatted(
            plans_menu_text(&profile, count, ctx.config.free_daily_plan_limit, &now),
            Some(keyboards::nutrition_plans_keyboard()),
        )
        .await?;
    Ok(())
}

/// Sends a random plan from `category` to `chat_id` if the user's quota allows it.
pub async fn send_plan(
    bot: &Bot,
    chat_id: ChatId,
    ctx: &BotContext,
    profile: &Profile,
    category: PlanCategory,
) -> HandlerResult {
    let telegram_id = profile.user.telegram_id;
    let username = profile.user.display_name().to_string();
    log_command_start("plan", &username, telegram_id, Some(category.slug()));
    let feedback = CommandFeedback::new(bot.clone(), chat_id);
    let now = Utc::now();
    let limit = ctx.config.free_daily_plan_limit;

    let count = match downloads_today(ctx, profile, &now).await {
        Ok(count) => count,
        Err(e) => {
            log_command_error("plan", &username, telegram_id, &e.to_string());
            feedback.apology().await?;
            return Ok(());
        }
    };

    if let Err(e) = check_download_allowed(is_premium_active(&profile.user, &now), count, limit) {
        feedback
            .send_with_keyboard(
                crate::utils::feedback::FeedbackType::Warning,
                &format!("{e}. Upgrade to premium for unlimited plans, or come back tomorrow."),
                keyboards::upgrade_keyboard(),
            )
            .await?;
        log_command_success("plan", &username, telegram_id, Some("daily limit reached"));
        return Ok(());
    }

    let path = match ctx.plans.pick_random(category).await {
        Ok(path) => path,
        Err(PlanError::NoPlansAvailable(_)) => {
            feedback
                .warning(&format!(
                    "There are no {} plans available right now. Please try another category.",
                    category.display_name()
                ))
                .await?;
            return Ok(());
        }
        Err(e) => {
            log_command_error("plan", &username, telegram_id, &e.to_string());
            feedback.apology().await?;
            return Ok(());
        }
    };

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("{}.pdf", category.slug()));

    bot.send_document(chat_id, InputFile::file(path))
        .caption(format!("📄 Your {} nutrition plan", category.display_name()))
        .await?;

    if let Err(e) = PlanDownload::create(ctx.pool(), profile.user.id, category.slug(), &file_name, &now).await {
        tracing::error!("Failed to record plan download for user {}: {}", telegram_id, e);
    }

    log_command_success("plan", &username, telegram_id, Some(&file_name));
    Ok(())
}
