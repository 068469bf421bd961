use teloxide::prelude::*;
use crate::bot::HandlerResult;
use crate::utils::feedback::CommandFeedback;

/// Anything that is not a command, a payment or an awaited weight.
pub async fn handle_general_message(bot: Bot, msg: Message) -> HandlerResult {
    let feedback = CommandFeedback::new(bot, msg.chat.id);

    if let Some(text) = msg.text() {
        let lower = text.to_lowercase();
        if text.starts_with('/') {
            let command = text.split_whitespace().next().unwrap_or(text);
            let error_msg = format!("Unknown command: {command}");
            let suggestion = "Use /help to see all available commands.";
            feedback.validation_error(&error_msg, suggestion).await?;
        } else if lower.contains("water") || lower.contains("drink") {
            feedback
                .info("Log a drink with /drink 250, or check today's total with /progress.")
                .await?;
        } else if lower.contains("plan") || lower.contains("diet") {
            feedback.info("Browse nutrition plans with /plans.").await?;
        } else if lower.contains("help") {
            feedback.info("Use /help to see all available commands, or /menu for the main menu.").await?;
        }
        // Other chatter gets no reply
    }

    Ok(())
}
