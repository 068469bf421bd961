use anyhow::{anyhow, Result};
use chrono_tz::Tz;
use std::env;
use std::path::PathBuf;

const DEFAULT_DATABASE_URL: &str = "sqlite:./data/nutribot.db";
const DEFAULT_PLANS_DIR: &str = "./plans";

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_bot_token: String,
    pub database_url: String,
    pub http_port: u16,
    pub plans_dir: PathBuf,
    pub default_timezone: String,
    pub default_reminder_interval_minutes: i64,
    pub free_daily_plan_limit: i64,
    pub payment_provider_token: Option<String>,
    pub premium_price_cents: i32,
    pub premium_currency: String,
    pub premium_duration_days: i64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let token = env::var("TELEGRAM_BOT_TOKEN")
            .map_err(|_| anyhow!("TELEGRAM_BOT_TOKEN must be set"))?;

        if token.trim().is_empty() {
            return Err(anyhow!("TELEGRAM_BOT_TOKEN must be set"));
        }

        let database_url = database_url_from_env();

        let http_port = parse_var("HTTP_PORT", 3000u16)?;

        let plans_dir = plans_dir_from_env();

        let default_timezone = non_empty_var("DEFAULT_TIMEZONE")
            .map(|tz| tz.trim().to_string())
            .unwrap_or_else(|| "UTC".to_string());
        if default_timezone.parse::<Tz>().is_err() {
            return Err(anyhow!("Invalid DEFAULT_TIMEZONE: {}", default_timezone));
        }

        let default_reminder_interval_minutes = parse_var("DEFAULT_REMINDER_INTERVAL_MINUTES", 60i64)?;
        if default_reminder_interval_minutes <= 0 {
            return Err(anyhow!("Invalid DEFAULT_REMINDER_INTERVAL_MINUTES"));
        }

        let free_daily_plan_limit = parse_var("FREE_DAILY_PLAN_LIMIT", 3i64)?;
        if free_daily_plan_limit < 0 {
            return Err(anyhow!("Invalid FREE_DAILY_PLAN_LIMIT"));
        }

        let payment_provider_token = non_empty_var("PAYMENT_PROVIDER_TOKEN");

        let premium_price_cents = parse_var("PREMIUM_PRICE_CENTS", 999i32)?;
        if premium_price_cents <= 0 {
            return Err(anyhow!("Invalid PREMIUM_PRICE_CENTS"));
        }

        let premium_currency = non_empty_var("PREMIUM_CURRENCY")
            .map(|c| c.trim().to_uppercase())
            .unwrap_or_else(|| "USD".to_string());

        let premium_duration_days = parse_var("PREMIUM_DURATION_DAYS", 30i64)?;
        if premium_duration_days <= 0 {
            return Err(anyhow!("Invalid PREMIUM_DURATION_DAYS"));
        }

        Ok(Config {
            telegram_bot_token: token,
            database_url,
            http_port,
            plans_dir,
            default_timezone,
            default_reminder_interval_minutes,
            free_daily_plan_limit,
            payment_provider_token,
            premium_price_cents,
            premium_currency,
            premium_duration_days,
        })
    }

    /// Payments are only offered when a provider token is configured.
    pub fn payments_enabled(&self) -> bool {
        self.payment_provider_token.is_some()
    }
}

/// `DATABASE_URL` or the default SQLite file; needs no bot token.
pub fn database_url_from_env() -> String {
    non_empty_var("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string())
}

/// `PLANS_DIR` or `./plans`.
pub fn plans_dir_from_env() -> PathBuf {
    non_empty_var("PLANS_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PLANS_DIR))
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match non_empty_var(name) {
        Some(raw) => raw.trim()
            .parse()
            .map_err(|_| anyhow!("Invalid {}", name)),
        None => Ok(default),
    }
}
