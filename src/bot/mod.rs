pub mod commands;
pub mod handlers;
pub mod keyboards;

use std::sync::Arc;
use teloxide::dispatching::dialogue::{Dialogue, InMemStorage};
use crate::config::Config;
use crate::database::connection::DatabaseManager;
use crate::services::plans::PlanCatalog;
use crate::services::reminder::ReminderService;

pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Per-chat conversation state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum State {
    #[default]
    Idle,
    /// The next plain text message is read as a body weight.
    AwaitingWeight,
}

pub type WaterDialogue = Dialogue<State, InMemStorage<State>>;

/// Everything the handlers share.
#[derive(Clone)]
pub struct BotContext {
    pub db: Arc<DatabaseManager>,
    pub reminders: ReminderService,
    pub plans: PlanCatalog,
    pub config: Arc<Config>,
}

impl BotContext {
    pub fn pool(&self) -> &sqlx::SqlitePool {
        &self.db.pool
    }
}
