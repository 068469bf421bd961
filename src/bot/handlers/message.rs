use teloxide::prelude::*;
use crate::bot::commands::{plans, premium, reminders, start, water, Command};
use crate::bot::{BotContext, HandlerResult, WaterDialogue};

pub async fn command_handler(
    bot: Bot,
    msg: Message,
    cmd: Command,
    dialogue: WaterDialogue,
    ctx: BotContext,
) -> HandlerResult {
    tracing::debug!("Command {} in chat {}", cmd.name(), msg.chat.id);

    match cmd {
        Command::Start => start::handle_start(bot, msg, dialogue, &ctx).await?,
        Command::Help => start::handle_help(bot, msg).await?,
        Command::Menu => start::handle_menu(bot, msg, dialogue, &ctx).await?,
        Command::Weight(input) => water::handle_weight(bot, msg, input, dialogue, &ctx).await?,
        Command::Drink(input) => water::handle_drink(bot, msg, input, &ctx).await?,
        Command::Progress => water::handle_progress(bot, msg, &ctx).await?,
        Command::History => water::handle_history(bot, msg, &ctx).await?,
        Command::Reset => water::handle_reset(bot, msg, &ctx).await?,
        Command::Reminders => reminders::handle_reminders(bot, msg, &ctx).await?,
        Command::Window(input) => reminders::handle_window(bot, msg, input, &ctx).await?,
        Command::Interval(input) => reminders::handle_interval(bot, msg, input, &ctx).await?,
        Command::Timezone(input) => reminders::handle_timezone(bot, msg, input, &ctx).await?,
        Command::Plans => plans::handle_plans(bot, msg, &ctx).await?,
        Command::Premium => premium::handle_premium(bot, msg, &ctx).await?,
    }
    Ok(())
}
