use chrono::{DateTime, Duration, Utc};
use crate::config::Config;
use crate::database::models::{Payment, User};
use crate::error::PremiumError;
use crate::utils::datetime::parse_db_timestamp;

pub const PAYMENT_METHOD_TELEGRAM: &str = "telegram";

/// What a premium purchase costs and grants.
#[derive(Debug, Clone)]
pub struct PremiumOffer {
    pub title: String,
    pub description: String,
    pub price_minor: i32,
    pub currency: String,
    pub duration_days: i64,
}

impl PremiumOffer {
    pub fn from_config(config: &Config) -> Self {
        Self {
            title: "NutriBot Premium".to_string(),
            description: format!(
                "{} days of unlimited nutrition plan downloads, exclusive content and priority support",
                config.premium_duration_days
            ),
            price_minor: config.premium_price_cents,
            currency: config.premium_currency.clone(),
            duration_days: config.premium_duration_days,
        }
    }

    pub fn price_major(&self) -> f64 {
        self.price_minor as f64 / 100.0
    }

    pub fn price_label(&self) -> String {
        format!("{:.2} {}", self.price_major(), self.currency)
    }
}

/// The premium flag only counts while the subscription has not expired.
pub fn is_premium_active(user: &User, now: &DateTime<Utc>) -> bool {
    if !user.is_premium {
        return false;
    }
    match user.premium_expiry.as_deref() {
        None => true,
        Some(expiry) => match parse_db_timestamp(expiry) {
            Ok(expiry) => expiry > *now,
            Err(e) => {
                tracing::warn!("Unreadable premium expiry for user {}: {}", user.telegram_id, e);
                false
            }
        },
    }
}

/// New expiry after buying `days` more: stacks on an unexpired subscription.
pub fn extended_expiry(user: &User, now: &DateTime<Utc>, days: i64) -> DateTime<Utc> {
    let base = user
        .premium_expiry
        .as_deref()
        .and_then(|expiry| parse_db_timestamp(expiry).ok())
        .filter(|expiry| user.is_premium && expiry > now)
        .unwrap_or(*now);
    base + Duration::days(days)
}

/// Records a pending payment; its id becomes the invoice payload.
pub async fn create_invoice(
    pool: &sqlx::SqlitePool,
    user: &User,
    offer: &PremiumOffer,
) -> Result<Payment, PremiumError> {
    let payment = Payment::create_pending(
        pool,
        user.id,
        offer.price_major(),
        &offer.currency,
        PAYMENT_METHOD_TELEGRAM,
    )
    .await?;
    Ok(payment)
}

/// Checks a pre-checkout query against the pending payment it refers to.
///
/// A price or currency mismatch marks the payment failed.
pub async fn validate_checkout(
    pool: &sqlx::SqlitePool,
    telegram_id: i64,
    payload: &str,
    currency: &str,
    total_minor: i64,
) -> Result<Payment, PremiumError> {
    let payment = Payment::find_by_id(pool, payload)
        .await?
        .ok_or_else(|| PremiumError::PaymentNotFound(payload.to_string()))?;

    let user = User::find_by_telegram_id(pool, telegram_id)
        .await?
        .ok_or(PremiumError::UserNotFound)?;

    if payment.user_id != user.id {
        return Err(PremiumError::PaymentOwnerMismatch(payment.id));
    }

    if !payment.is_pending() {
        return Err(PremiumError::PaymentNotPending {
            payment_id: payment.id,
            status: payment.status,
        });
    }

    // A payload reused with a different price was tampered with; retire it
    if !payment.currency.eq_ignore_ascii_case(currency) {
        Payment::mark_failed(pool, &payment.id).await?;
        return Err(PremiumError::CurrencyMismatch {
            expected: payment.currency,
            actual: currency.to_string(),
        });
    }

    if payment.amount_minor() != total_minor {
        Payment::mark_failed(pool, &payment.id).await?;
        return Err(PremiumError::AmountMismatch {
            expected: payment.amount_minor(),
            actual: total_minor,
            currency: payment.currency,
        });
    }

    Ok(payment)
}

/// Completes a payment and extends the buyer's premium in one transaction.
///
/// Returns the new expiry, or `None` if the payment had already been completed.
/// On error nothing is written and the payment stays pending.
pub async fn complete_payment(
    pool: &sqlx::SqlitePool,
    payload: &str,
    charge_id: &str,
    duration_days: i64,
    now: &DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>, PremiumError> {
    let payment = Payment::find_by_id(pool, payload)
        .await?
        .ok_or_else(|| PremiumError::PaymentNotFound(payload.to_string()))?;

    let mut tx = pool.begin().await?;

    if !Payment::mark_completed(&mut tx, &payment.id, charge_id, now).await? {
        tracing::warn!("Payment {} already processed ({}), ignoring", payment.id, payment.status);
        return Ok(None);
    }

    let user = User::find_by_id(&mut tx, payment.user_id)
        .await?
        .ok_or(PremiumError::UserNotFound)?;

    let expiry = extended_expiry(&user, now, duration_days);
    User::set_premium(&mut tx, user.id, &expiry).await?;

    tx.commit().await?;
    Ok(Some(expiry))
}
