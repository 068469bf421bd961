use chrono::Utc;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardMarkup, MessageId};
use teloxide::{ApiError, RequestError};
use crate::bot::commands::{load_profile, plans, premium, reminders, start, water, Profile};
use crate::bot::keyboards::{self, CallbackAction};
use crate::bot::{BotContext, HandlerResult, State, WaterDialogue};
use crate::database::models::UserSettings;
use crate::services::hydration::format_progress;
use crate::utils::feedback::{CommandFeedback, APOLOGY, NOT_REGISTERED};
use crate::utils::logging::{log_command_error, log_database_error};
use crate::utils::markdown::escape_markdown;

pub async fn callback_handler(
    bot: Bot,
    q: CallbackQuery,
    dialogue: WaterDialogue,
    ctx: BotContext,
) -> HandlerResult {
    let telegram_id = q.from.id.0 as i64;
    let username = q.from.username.clone().unwrap_or_else(|| q.from.first_name.clone());

    let Some(action) = q.data.as_deref().and_then(CallbackAction::parse) else {
        tracing::warn!("Unknown callback data {:?} from user {}", q.data, telegram_id);
        bot.answer_callback_query(q.id).text("This button is no longer supported").await?;
        return Ok(());
    };

    tracing::info!("Callback received: '{}' from user {} ({})", action.name(), username, telegram_id);

    let chat_id = q.message.as_ref().map(|m| m.chat.id).unwrap_or(ChatId(telegram_id));
    let message_id = q.message.as_ref().map(|m| m.id);
    let feedback = CommandFeedback::new(bot.clone(), chat_id);
    let now = Utc::now();

    let profile = match load_profile(&ctx, telegram_id, &now).await {
        Ok(Some(profile)) => profile,
        Ok(None) => {
            bot.answer_callback_query(q.id)
                .text(format!("⚠️ {NOT_REGISTERED}"))
                .show_alert(true)
                .await?;
            return Ok(());
        }
        Err(e) => {
            log_database_error("SELECT", "users", &e.to_string(), Some(&format!("telegram_id={telegram_id}")));
            bot.answer_callback_query(q.id).text(APOLOGY).show_alert(true).await?;
            return Ok(());
        }
    };

    match action {
        CallbackAction::MainMenu => {
            bot.answer_callback_query(q.id).await?;
            dialogue.update(State::Idle).await?;
            show(&feedback, message_id, start::main_menu_text(&profile), keyboards::main_menu_keyboard()).await?;
        }
        CallbackAction::WaterReminder => {
            bot.answer_callback_query(q.id).await?;
            if profile.user.water_goal.is_none() {
                ask_for_weight(&feedback, message_id, &dialogue).await?;
            } else {
                show_overview(&feedback, message_id, &ctx, &profile).await?;
            }
        }
        CallbackAction::WaterProgress => {
            bot.answer_callback_query(q.id).await?;
            match profile.user.water_goal {
                Some(goal) if goal > 0.0 => {
                    show(
                        &feedback,
                        message_id,
                        format_progress(profile.user.current_water, goal),
                        keyboards::water_progress_keyboard(),
                    )
                    .await?;
                }
                _ => ask_for_weight(&feedback, message_id, &dialogue).await?,
            }
        }
        CallbackAction::WaterAmount(amount) => {
            match water::log_water(&ctx, &profile, f64::from(amount), &now).await {
                Ok(Some(outcome)) => {
                    bot.answer_callback_query(q.id)
                        .text(format!("💧 +{:.0} ml", outcome.added))
                        .await?;
                    show(&feedback, message_id, water::outcome_text(&outcome), keyboards::water_progress_keyboard())
                        .await?;
                }
                Ok(None) => {
                    bot.answer_callback_query(q.id).await?;
                    ask_for_weight(&feedback, message_id, &dialogue).await?;
                }
                Err(e) => {
                    log_command_error("water_amount", &username, telegram_id, &e.to_string());
                    bot.answer_callback_query(q.id).text(APOLOGY).show_alert(true).await?;
                }
            }
        }
        CallbackAction::RegisterWeight => {
            bot.answer_callback_query(q.id).await?;
            ask_for_weight(&feedback, message_id, &dialogue).await?;
        }
        CallbackAction::CancelWaterReminders | CallbackAction::EnableWaterReminders => {
            let enable = action == CallbackAction::EnableWaterReminders;
            if enable && profile.user.water_goal.is_none() {
                bot.answer_callback_query(q.id).await?;
                ask_for_weight(&feedback, message_id, &dialogue).await?;
                return Ok(());
            }

            if let Err(e) = reminders::set_reminders_enabled(&ctx, &profile, enable).await {
                log_command_error(action.name(), &username, telegram_id, &e.to_string());
                bot.answer_callback_query(q.id).text(APOLOGY).show_alert(true).await?;
                return Ok(());
            }

            let notice = if enable { "🔔 Reminders resumed" } else { "🔕 Reminders stopped" };
            bot.answer_callback_query(q.id).text(notice).await?;
            refresh_overview(&feedback, message_id, &ctx, profile).await?;
        }
        CallbackAction::ToggleNotification => {
            match UserSettings::toggle_notification(ctx.pool(), profile.user.id).await {
                Ok(preference) => {
                    bot.answer_callback_query(q.id)
                        .text(format!("Reminders are now {preference}"))
                        .await?;
                    refresh_overview(&feedback, message_id, &ctx, profile).await?;
                }
                Err(e) => {
                    log_command_error("toggle_notification", &username, telegram_id, &e.to_string());
                    bot.answer_callback_query(q.id).text(APOLOGY).show_alert(true).await?;
                }
            }
        }
        CallbackAction::NutritionPlans => {
            bot.answer_callback_query(q.id).await?;
            match plans::downloads_today(&ctx, &profile, &now).await {
                Ok(count) => {
                    let text = plans::plans_menu_text(&profile, count, ctx.config.free_daily_plan_limit, &now);
                    show(&feedback, message_id, text, keyboards::nutrition_plans_keyboard()).await?;
                }
                Err(e) => {
                    log_command_error("nutrition_plans", &username, telegram_id, &e.to_string());
                    feedback.apology().await?;
                }
            }
        }
        CallbackAction::Plan(category) => {
            bot.answer_callback_query(q.id).text("📄 Preparing your plan...").await?;
            plans::send_plan(&bot, chat_id, &ctx, &profile, category).await?;
        }
        CallbackAction::Premium => {
            bot.answer_callback_query(q.id).await?;
            premium::show_premium(bot, chat_id, &ctx, &profile).await?;
        }
        CallbackAction::PremiumBuy => {
            bot.answer_callback_query(q.id).await?;
            premium::send_premium_invoice(&bot, chat_id, &ctx, &profile).await?;
        }
    }

    Ok(())
}

/// Edits the pressed message in place, or sends a new one when there is none.
async fn show(
    feedback: &CommandFeedback,
    message_id: Option<MessageId>,
    text: String,
    keyboard: InlineKeyboardMarkup,
) -> Result<(), RequestError> {
    match message_id {
        Some(id) => match feedback.edit_formatted(id, text, Some(keyboard)).await {
            Ok(_) | Err(RequestError::Api(ApiError::MessageNotModified)) => Ok(()),
            Err(e) => Err(e),
        },
        None => feedback.send_formatted(text, Some(keyboard)).await.map(|_| ()),
    }
}

async fn ask_for_weight(
    feedback: &CommandFeedback,
    message_id: Option<MessageId>,
    dialogue: &WaterDialogue,
) -> HandlerResult {
    dialogue.update(State::AwaitingWeight).await?;
    show(feedback, message_id, escape_markdown(water::WEIGHT_PROMPT), keyboards::weight_input_keyboard()).await?;
    Ok(())
}

/// Today's progress followed by the reminder settings.
async fn show_overview(
    feedback: &CommandFeedback,
    message_id: Option<MessageId>,
    ctx: &BotContext,
    profile: &Profile,
) -> HandlerResult {
    let job_active = ctx.reminders.is_scheduled(profile.user.telegram_id).await;
    let goal = profile.user.water_goal.unwrap_or_default();
    let text = format!(
        "{}\n\n{}",
        format_progress(profile.user.current_water, goal),
        reminders::settings_text(&profile.settings, job_active)
    );

    show(
        feedback,
        message_id,
        text,
        keyboards::reminder_settings_keyboard(
            profile.settings.water_reminders_enabled,
            profile.settings.is_silent(),
        ),
    )
    .await?;
    Ok(())
}

/// Reloads settings after a change and redraws the overview.
async fn refresh_overview(
    feedback: &CommandFeedback,
    message_id: Option<MessageId>,
    ctx: &BotContext,
    profile: Profile,
) -> HandlerResult {
    let settings = UserSettings::find_by_user_id(ctx.pool(), profile.user.id)
        .await?
        .unwrap_or(profile.settings);
    let profile = Profile {
        user: profile.user,
        settings,
    };
    show_overview(feedback, message_id, ctx, &profile).await
}
