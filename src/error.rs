use thiserror::Error;

/// Errors raised while picking and delivering nutrition plans
#[derive(Error, Debug)]
pub enum PlanError {
    #[error("No plans available for category '{0}'")]
    NoPlansAvailable(String),

    #[error("Daily download limit reached ({limit} per day)")]
    DailyLimitReached { limit: i64 },

    #[error("Plan storage error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the premium payment flow
#[derive(Error, Debug)]
pub enum PremiumError {
    #[error("Payment {0} not found")]
    PaymentNotFound(String),

    #[error("Payment {0} belongs to another user")]
    PaymentOwnerMismatch(String),

    #[error("Payment {payment_id} is already {status}")]
    PaymentNotPending { payment_id: String, status: String },

    #[error("Amount mismatch: expected {expected} {currency}, got {actual}")]
    AmountMismatch {
        expected: i64,
        actual: i64,
        currency: String,
    },

    #[error("Currency mismatch: expected {expected}, got {actual}")]
    CurrencyMismatch { expected: String, actual: String },

    #[error("User not registered")]
    UserNotFound,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Errors raised by the reminder scheduler
#[derive(Error, Debug)]
pub enum ReminderError {
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] tokio_cron_scheduler::JobSchedulerError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid reminder interval: {0} minutes")]
    InvalidInterval(i64),
}
