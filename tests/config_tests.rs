use nutribot::config::{database_url_from_env, Config};
use std::env;
use std::path::PathBuf;
use std::sync::Mutex;

// Config tests share process environment variables
static CONFIG_TEST_MUTEX: Mutex<()> = Mutex::new(());

const CONFIG_VARS: [&str; 11] = [
    "TELEGRAM_BOT_TOKEN",
    "DATABASE_URL",
    "HTTP_PORT",
    "PLANS_DIR",
    "DEFAULT_TIMEZONE",
    "DEFAULT_REMINDER_INTERVAL_MINUTES",
    "FREE_DAILY_PLAN_LIMIT",
    "PAYMENT_PROVIDER_TOKEN",
    "PREMIUM_PRICE_CENTS",
    "PREMIUM_CURRENCY",
    "PREMIUM_DURATION_DAYS",
];

fn clear_config_vars() {
    for name in CONFIG_VARS {
        env::remove_var(name);
    }
}

#[test]
fn test_config_from_env_with_all_vars() {
    let _guard = CONFIG_TEST_MUTEX.lock().unwrap();
    clear_config_vars();

    env::set_var("TELEGRAM_BOT_TOKEN", "test_token_123");
    env::set_var("DATABASE_URL", "sqlite:test.db");
    env::set_var("HTTP_PORT", "8080");
    env::set_var("PLANS_DIR", "/srv/plans");
    env::set_var("DEFAULT_TIMEZONE", "Europe/Madrid");
    env::set_var("DEFAULT_REMINDER_INTERVAL_MINUTES", "90");
    env::set_var("FREE_DAILY_PLAN_LIMIT", "5");
    env::set_var("PAYMENT_PROVIDER_TOKEN", "provider:123");
    env::set_var("PREMIUM_PRICE_CENTS", "1499");
    env::set_var("PREMIUM_CURRENCY", "eur");
    env::set_var("PREMIUM_DURATION_DAYS", "90");

    let config = Config::from_env().unwrap();

    assert_eq!(config.telegram_bot_token, "test_token_123");
    assert_eq!(config.database_url, "sqlite:test.db");
    assert_eq!(config.http_port, 8080);
    assert_eq!(config.plans_dir, PathBuf::from("/srv/plans"));
    assert_eq!(config.default_timezone, "Europe/Madrid");
    assert_eq!(config.default_reminder_interval_minutes, 90);
    assert_eq!(config.free_daily_plan_limit, 5);
    assert_eq!(config.payment_provider_token.as_deref(), Some("provider:123"));
    assert!(config.payments_enabled());
    assert_eq!(config.premium_price_cents, 1499);
    assert_eq!(config.premium_currency, "EUR");
    assert_eq!(config.premium_duration_days, 90);

    clear_config_vars();
}

#[test]
fn test_config_from_env_with_defaults() {
    let _guard = CONFIG_TEST_MUTEX.lock().unwrap();
    clear_config_vars();

    env::set_var("TELEGRAM_BOT_TOKEN", "required_token");

    let config = Config::from_env().unwrap();

    assert_eq!(config.telegram_bot_token, "required_token");
    assert_eq!(config.database_url, "sqlite:./data/nutribot.db");
    assert_eq!(config.http_port, 3000);
    assert_eq!(config.plans_dir, PathBuf::from("./plans"));
    assert_eq!(config.default_timezone, "UTC");
    assert_eq!(config.default_reminder_interval_minutes, 60);
    assert_eq!(config.free_daily_plan_limit, 3);
    assert!(!config.payments_enabled());
    assert_eq!(config.premium_price_cents, 999);
    assert_eq!(config.premium_currency, "USD");
    assert_eq!(config.premium_duration_days, 30);

    clear_config_vars();
}

#[test]
fn test_config_missing_required_token() {
    let _guard = CONFIG_TEST_MUTEX.lock().unwrap();
    clear_config_vars();

    let error_msg = Config::from_env().unwrap_err().to_string();
    assert!(error_msg.contains("TELEGRAM_BOT_TOKEN must be set"));

    env::set_var("TELEGRAM_BOT_TOKEN", "   ");
    assert!(Config::from_env().is_err());

    clear_config_vars();
}

#[test]
fn test_config_rejects_invalid_values() {
    let _guard = CONFIG_TEST_MUTEX.lock().unwrap();
    clear_config_vars();
    env::set_var("TELEGRAM_BOT_TOKEN", "token");

    env::set_var("HTTP_PORT", "not_a_port");
    let error_msg = Config::from_env().unwrap_err().to_string();
    assert!(error_msg.contains("Invalid HTTP_PORT"));
    env::remove_var("HTTP_PORT");

    env::set_var("DEFAULT_TIMEZONE", "Mars/Olympus");
    let error_msg = Config::from_env().unwrap_err().to_string();
    assert!(error_msg.contains("Invalid DEFAULT_TIMEZONE"));
    env::remove_var("DEFAULT_TIMEZONE");

    env::set_var("PREMIUM_PRICE_CENTS", "0");
    assert!(Config::from_env().is_err());
    env::remove_var("PREMIUM_PRICE_CENTS");

    env::set_var("DEFAULT_REMINDER_INTERVAL_MINUTES", "-5");
    assert!(Config::from_env().is_err());

    clear_config_vars();
}

#[test]
fn test_empty_payment_token_disables_payments() {
    let _guard = CONFIG_TEST_MUTEX.lock().unwrap();
    clear_config_vars();
    env::set_var("TELEGRAM_BOT_TOKEN", "token");
    env::set_var("PAYMENT_PROVIDER_TOKEN", "");

    let config = Config::from_env().unwrap();
    assert!(config.payment_provider_token.is_none());
    assert!(!config.payments_enabled());

    clear_config_vars();
}

#[test]
fn test_database_url_without_token() {
    let _guard = CONFIG_TEST_MUTEX.lock().unwrap();
    clear_config_vars();

    assert_eq!(database_url_from_env(), "sqlite:./data/nutribot.db");
    env::set_var("DATABASE_URL", "sqlite:/tmp/other.db");
    assert_eq!(database_url_from_env(), "sqlite:/tmp/other.db");

    clear_config_vars();
}
