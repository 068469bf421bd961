use chrono::{DateTime, Utc};
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use crate::bot::commands::{load_profile, sender, Command, Profile};
use crate::bot::{keyboards, BotContext, HandlerResult, State, WaterDialogue};
use crate::database::models::{TelegramProfile, User};
use crate::utils::feedback::CommandFeedback;
use crate::utils::logging::{log_command_error, log_command_start, log_command_success};
use crate::utils::markdown::escape_markdown;

pub async fn handle_start(
    bot: Bot,
    msg: Message,
    dialogue: WaterDialogue,
    ctx: &BotContext,
) -> HandlerResult {
    let (telegram_id, username) = sender(&msg);
    log_command_start("/start", &username, telegram_id, None);
    let feedback = CommandFeedback::new(bot, msg.chat.id);

    let profile = match msg.from() {
        Some(user) => TelegramProfile::from_user(user),
        None => {
            feedback.error("Could not identify you, please try again from a private chat").await?;
            return Ok(());
        }
    };

    let (user, created) = match User::get_or_create(
        ctx.pool(),
        &profile,
        &ctx.config.default_timezone,
        ctx.config.default_reminder_interval_minutes,
    )
    .await
    {
        Ok(result) => result,
        Err(e) => {
            log_command_error("/start", &username, telegram_id, &e.to_string());
            feedback.apology().await?;
            return Ok(());
        }
    };

    dialogue.update(State::Idle).await?;

    let greeting = if created {
        format!(
            "Welcome to your personal nutrition assistant, {}! 👋\n\n\
             Set your weight to get a daily water goal and reminders, \
             or grab a nutrition plan.\n\nChoose an option:",
            user.display_name()
        )
    } else {
        format!("Welcome back, {}! 👋\n\nChoose an option:", user.display_name())
    };

    feedback
        .send_formatted(escape_markdown(&greeting), Some(keyboards::main_menu_keyboard()))
        .await?;

    log_command_success("/start", &username, telegram_id, Some(if created { "registered" } else { "returning" }));
    Ok(())
}

pub async fn handle_help(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, Command::descriptions().to_string()).await?;
    Ok(())
}

/// Main menu greeting for a registered user; `None` until they run /start.
pub async fn menu_text(
    ctx: &BotContext,
    telegram_id: i64,
    now: &DateTime<Utc>,
) -> Result<Option<String>, sqlx::Error> {
    Ok(load_profile(ctx, telegram_id, now).await?.as_ref().map(main_menu_text))
}

pub fn main_menu_text(profile: &Profile) -> String {
    escape_markdown(&format!("Main menu, {}:", profile.user.display_name()))
}

pub async fn handle_menu(bot: Bot, msg: Message, dialogue: WaterDialogue, ctx: &BotContext) -> HandlerResult {
    let (telegram_id, username) = sender(&msg);
    let feedback = CommandFeedback::new(bot, msg.chat.id);

    match menu_text(ctx, telegram_id, &Utc::now()).await {
        Ok(Some(text)) => {
            dialogue.update(State::Idle).await?;
            feedback.send_formatted(text, Some(keyboards::main_menu_keyboard())).await?;
        }
        Ok(None) => {
            feedback.not_registered().await?;
        }
        Err(e) => {
            log_command_error("/menu", &username, telegram_id, &e.to_string());
            feedback.apology().await?;
        }
    }
    Ok(())
}
