use chrono::{DateTime, Utc};
use teloxide::prelude::*;
use teloxide::types::{Currency, LabeledPrice, PreCheckoutQuery, SuccessfulPayment};
use crate::bot::commands::{require_profile, sender, Profile};
use crate::bot::{keyboards, BotContext, HandlerResult};
use crate::database::models::UserSettings;
use crate::services::premium::{
    complete_payment, create_invoice, is_premium_active, validate_checkout, PremiumOffer,
};
use crate::utils::datetime::{format_date, parse_db_timestamp, timezone_or_utc};
use crate::utils::feedback::CommandFeedback;
use crate::utils::logging::{log_command_error, log_payment_event};
use crate::utils::markdown::escape_markdown;

pub fn premium_text(profile: &Profile, offer: &PremiumOffer, payments_enabled: bool, now: &DateTime<Utc>) -> String {
    let mut text = String::from("🌟 NutriBot Premium\n\n");

    if is_premium_active(&profile.user, now) {
        let until = profile
            .user
            .premium_expiry
            .as_deref()
            .and_then(|expiry| parse_db_timestamp(expiry).ok())
            .map(|expiry| format_date(&expiry, &timezone_or_utc(&profile.settings.timezone)));
        match until {
            Some(until) => text.push_str(&format!("✅ Your premium is active until {until}.\n\n")),
            None => text.push_str("✅ Your premium is active.\n\n"),
        }
    }

    text.push_str(
        "Premium includes:\n\
         • Unlimited nutrition plan downloads\n\
         • Exclusive content\n\
         • Priority support\n\n",
    );
    text.push_str(&format!("Price: {} for {} days.", offer.price_label(), offer.duration_days));

    if !payments_enabled {
        text.push_str("\n\nPayments are not available right now, please check back later.");
    }

    escape_markdown(&text)
}

/// Shows the premium status and offer to `chat_id`.
pub async fn show_premium(bot: Bot, chat_id: ChatId, ctx: &BotContext, profile: &Profile) -> HandlerResult {
    let offer = PremiumOffer::from_config(&ctx.config);
    let payments_enabled = ctx.config.payments_enabled();
    let keyboard = if payments_enabled {
        keyboards::premium_keyboard(&offer.price_label())
    } else {
        keyboards::back_to_menu_keyboard()
    };

    CommandFeedback::new(bot, chat_id)
        .send_formatted(premium_text(profile, &offer, payments_enabled, &Utc::now()), Some(keyboard))
        .await?;
    Ok(())
}

pub async fn handle_premium(bot: Bot, msg: Message, ctx: &BotContext) -> HandlerResult {
    let (telegram_id, _) = sender(&msg);
    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id);

    let Some(profile) = require_profile(ctx, &feedback, telegram_id, &Utc::now()).await? else {
        return Ok(());
    };

    show_premium(bot, msg.chat.id, ctx, &profile).await
}

/// Creates a pending payment and sends the matching Telegram invoice.
pub async fn send_premium_invoice(bot: &Bot, chat_id: ChatId, ctx: &BotContext, profile: &Profile) -> HandlerResult {
    let feedback = CommandFeedback::new(bot.clone(), chat_id);
    let telegram_id = profile.user.telegram_id;

    let Some(provider_token) = ctx.config.payment_provider_token.clone() else {
        feedback.warning("Payments are not available right now, please check back later.").await?;
        return Ok(());
    };

    let offer = PremiumOffer::from_config(&ctx.config);
    let payment = match create_invoice(ctx.pool(), &profile.user, &offer).await {
        Ok(payment) => payment,
        Err(e) => {
            log_command_error("premium_buy", profile.user.display_name(), telegram_id, &e.to_string());
            feedback.apology().await?;
            return Ok(());
        }
    };

    let amount = offer.price_minor.try_into()?;
    bot.send_invoice(
        chat_id,
        offer.title.clone(),
        offer.description.clone(),
        payment.id.clone(),
        provider_token,
        offer.currency.clone(),
        vec![LabeledPrice::new(format!("Premium, {} days", offer.duration_days), amount)],
    )
    .await?;

    log_payment_event("invoice sent", telegram_id, &payment.id);
    Ok(())
}

/// ISO 4217 code of a Telegram currency; the enum variants are named after the codes.
pub fn currency_code(currency: &Currency) -> String {
    format!("{currency:?}")
}

/// Telegram asks for a final confirmation before charging; the payload must
/// point at this user's pending payment for the same amount.
pub async fn handle_pre_checkout(bot: Bot, q: PreCheckoutQuery, ctx: &BotContext) -> HandlerResult {
    let telegram_id = q.from.id.0 as i64;
    let currency = currency_code(&q.currency);

    match validate_checkout(
        ctx.pool(),
        telegram_id,
        &q.invoice_payload,
        &currency,
        i64::from(q.total_amount),
    )
    .await
    {
        Ok(payment) => {
            bot.answer_pre_checkout_query(q.id, true).await?;
            log_payment_event("checkout approved", telegram_id, &payment.id);
        }
        Err(e) => {
            tracing::warn!("Rejected checkout {} from user {}: {}", q.invoice_payload, telegram_id, e);
            bot.answer_pre_checkout_query(q.id, false)
                .error_message("This invoice is no longer valid. Please request a new one with /premium.")
                .await?;
        }
    }
    Ok(())
}

pub async fn handle_successful_payment(
    bot: Bot,
    msg: Message,
    payment: SuccessfulPayment,
    ctx: &BotContext,
) -> HandlerResult {
    let (telegram_id, username) = sender(&msg);
    let feedback = CommandFeedback::new(bot, msg.chat.id);
    let now = Utc::now();

    match complete_payment(
        ctx.pool(),
        &payment.invoice_payload,
        &payment.telegram_payment_charge_id,
        ctx.config.premium_duration_days,
        &now,
    )
    .await
    {
        Ok(Some(expiry)) => {
            log_payment_event("payment completed", telegram_id, &payment.invoice_payload);
            let tz = match UserSettings::find_by_telegram_id(ctx.pool(), telegram_id).await {
                Ok(Some(settings)) => timezone_or_utc(&settings.timezone),
                _ => chrono_tz::Tz::UTC,
            };
            feedback
                .success(&format!(
                    "Payment received, thank you! Premium is active until {}.",
                    format_date(&expiry, &tz)
                ))
                .await?;
        }
        Ok(None) => {
            log_payment_event("duplicate payment notice ignored", telegram_id, &payment.invoice_payload);
        }
        Err(e) => {
            log_command_error("successful_payment", &username, telegram_id, &e.to_string());
            feedback
                .error("Your payment went through but I could not activate premium. Please contact support.")
                .await?;
        }
    }
    Ok(())
}
