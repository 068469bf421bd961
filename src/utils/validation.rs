use anyhow::{anyhow, Result};
use chrono::NaiveTime;

pub const MIN_WEIGHT_KG: f64 = 0.0;
pub const MAX_WEIGHT_KG: f64 = 300.0;
pub const MAX_DRINK_ML: f64 = 5000.0;
pub const MIN_REMINDER_INTERVAL_MINUTES: i64 = 15;
pub const MAX_REMINDER_INTERVAL_MINUTES: i64 = 720;

/// Parses a body weight in kilograms, accepting `,` as decimal separator.
pub fn validate_weight(input: &str) -> Result<f64> {
    let input = input.trim();

    if input.is_empty() {
        return Err(anyhow!("Weight cannot be empty"));
    }

    let weight: f64 = input
        .replace(',', ".")
        .parse()
        .map_err(|_| anyhow!("'{}' is not a number", input))?;

    if !weight.is_finite() || weight <= MIN_WEIGHT_KG || weight > MAX_WEIGHT_KG {
        return Err(anyhow!("Weight must be more than 0 and at most 300 kg"));
    }

    Ok(weight)
}

/// Parses an amount of water in millilitres.
pub fn validate_drink_amount(input: &str) -> Result<f64> {
    let input = input.trim().trim_end_matches("ml").trim();

    if input.is_empty() {
        return Err(anyhow!("Amount cannot be empty"));
    }

    let amount: f64 = input
        .replace(',', ".")
        .parse()
        .map_err(|_| anyhow!("'{}' is not a number", input))?;

    if !amount.is_finite() || amount <= 0.0 {
        return Err(anyhow!("Amount must be greater than 0 ml"));
    }

    if amount > MAX_DRINK_ML {
        return Err(anyhow!("Amount cannot be more than 5000 ml at once"));
    }

    Ok(amount)
}

/// Validates an `HH:MM` time of day.
pub fn validate_time_of_day(input: &str) -> Result<NaiveTime> {
    let input = input.trim();
    if input.len() != 5 {
        return Err(anyhow!("Time must use the HH:MM format"));
    }
    NaiveTime::parse_from_str(input, "%H:%M")
        .map_err(|_| anyhow!("'{}' is not a valid HH:MM time", input))
}

/// Parses `/window` arguments, e.g. `08:00 22:00` or `08:00-22:00`.
pub fn validate_reminder_window(input: &str) -> Result<(String, String)> {
    let parts: Vec<&str> = input
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|s| !s.is_empty())
        .collect();

    if parts.len() != 2 {
        return Err(anyhow!("Provide a start and an end time, e.g. 08:00 22:00"));
    }

    let start = validate_time_of_day(parts[0])?;
    let end = validate_time_of_day(parts[1])?;

    Ok((start.format("%H:%M").to_string(), end.format("%H:%M").to_string()))
}

pub fn validate_reminder_interval(input: &str) -> Result<i64> {
    let minutes: i64 = input
        .trim()
        .parse()
        .map_err(|_| anyhow!("Interval must be a whole number of minutes"))?;

    if !(MIN_REMINDER_INTERVAL_MINUTES..=MAX_REMINDER_INTERVAL_MINUTES).contains(&minutes) {
        return Err(anyhow!(
            "Interval must be between {} and {} minutes",
            MIN_REMINDER_INTERVAL_MINUTES,
            MAX_REMINDER_INTERVAL_MINUTES
        ));
    }

    Ok(minutes)
}
