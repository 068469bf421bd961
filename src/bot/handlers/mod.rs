pub mod callback;
pub mod general_message;
pub mod message;

use teloxide::{
    dispatching::{dialogue, dialogue::InMemStorage, UpdateHandler},
    prelude::*,
    types::{PreCheckoutQuery, SuccessfulPayment},
};
use crate::bot::commands::{premium, water, Command};
use crate::bot::{BotContext, State, WaterDialogue};

pub struct BotHandler {
    pub ctx: BotContext,
}

impl BotHandler {
    pub fn new(ctx: BotContext) -> Self {
        Self { ctx }
    }

    /// Pre-checkout queries carry no chat, so they are routed before the dialogue.
    pub fn schema(&self) -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
        let ctx_checkout = self.ctx.clone();
        let ctx_payment = self.ctx.clone();
        let ctx_command = self.ctx.clone();
        let ctx_weight = self.ctx.clone();
        let ctx_callback = self.ctx.clone();

        let message_handler = Update::filter_message()
            .branch(
                dptree::filter_map(|msg: Message| msg.successful_payment().cloned()).endpoint(
                    move |bot: Bot, msg: Message, payment: SuccessfulPayment| {
                        let ctx = ctx_payment.clone();
                        async move { premium::handle_successful_payment(bot, msg, payment, &ctx).await }
                    },
                ),
            )
            .branch(
                dptree::entry()
                    .filter_command::<Command>()
                    .endpoint(move |bot: Bot, msg: Message, cmd: Command, dialogue: WaterDialogue| {
                        let ctx = ctx_command.clone();
                        async move { message::command_handler(bot, msg, cmd, dialogue, ctx).await }
                    }),
            )
            .branch(
                dptree::case![State::AwaitingWeight].endpoint(
                    move |bot: Bot, msg: Message, dialogue: WaterDialogue| {
                        let ctx = ctx_weight.clone();
                        async move { water::handle_weight_input(bot, msg, dialogue, &ctx).await }
                    },
                ),
            )
            .branch(dptree::endpoint(general_message::handle_general_message));

        let callback_handler = Update::filter_callback_query().endpoint(
            move |bot: Bot, q: CallbackQuery, dialogue: WaterDialogue| {
                let ctx = ctx_callback.clone();
                async move { callback::callback_handler(bot, q, dialogue, ctx).await }
            },
        );

        dptree::entry()
            .branch(Update::filter_pre_checkout_query().endpoint(
                move |bot: Bot, q: PreCheckoutQuery| {
                    let ctx = ctx_checkout.clone();
                    async move { premium::handle_pre_checkout(bot, q, &ctx).await }
                },
            ))
            .branch(
                dialogue::enter::<Update, InMemStorage<State>, State, _>()
                    .branch(message_handler)
                    .branch(callback_handler),
            )
    }
}
