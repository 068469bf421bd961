//! Hydration arithmetic and reminder decisions.
//!
//! Everything here is pure so it can be tested without a database or a bot.

use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use std::collections::BTreeMap;
use crate::database::models::{User, UserSettings, WaterLog};
use crate::utils::datetime::{local_day, local_time, parse_db_timestamp, timezone_or_utc};

/// Daily water need per kilogram of body weight.
pub const ML_PER_KG: f64 = 35.0;

/// Quick-log amounts offered on the inline keyboards, in ml.
pub const QUICK_AMOUNTS: [u32; 4] = [250, 500, 750, 1000];

const PROGRESS_CELLS: usize = 10;

pub fn calculate_water_goal(weight_kg: f64) -> f64 {
    weight_kg * ML_PER_KG
}

/// Adds `amount` to `current` without passing `goal`.
///
/// Returns `(new_total, added)`; `added` is what actually counted and is never negative.
pub fn clamp_consumption(current: f64, amount: f64, goal: f64) -> (f64, f64) {
    let current = current.max(0.0);
    let new_total = (current + amount.max(0.0)).min(goal).max(current.min(goal));
    let added = (new_total - current).max(0.0);
    (new_total, added)
}

/// Progress toward the goal in percent, capped at 100.
pub fn progress_percent(current: f64, goal: f64) -> f64 {
    if goal <= 0.0 {
        return 0.0;
    }
    (current / goal * 100.0).clamp(0.0, 100.0)
}

pub fn progress_bar(percent: f64) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 10.0) as usize).min(PROGRESS_CELLS);
    format!("{}{}", "🟩".repeat(filled), "⬜".repeat(PROGRESS_CELLS - filled))
}

pub fn goal_reached(current: f64, goal: Option<f64>) -> bool {
    matches!(goal, Some(goal) if goal > 0.0 && current >= goal)
}

/// Whether `now` falls inside the `[start, end]` window.
///
/// A window whose end is before its start wraps past midnight; equal bounds mean all day.
pub fn is_within_window(now: NaiveTime, start: NaiveTime, end: NaiveTime) -> bool {
    if start == end {
        return true;
    }
    if start < end {
        now >= start && now <= end
    } else {
        now >= start || now <= end
    }
}

pub fn needs_daily_reset(water_day: Option<&str>, today: &str) -> bool {
    water_day != Some(today)
}

/// Outcome of a reminder tick for one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderDecision {
    Send,
    SkipDisabled,
    SkipNoGoal,
    SkipGoalReached,
    SkipOutsideWindow,
}

impl ReminderDecision {
    pub fn describe(&self) -> &'static str {
        match self {
            ReminderDecision::Send => "reminder sent",
            ReminderDecision::SkipDisabled => "skipped, reminders disabled",
            ReminderDecision::SkipNoGoal => "skipped, no water goal",
            ReminderDecision::SkipGoalReached => "skipped, goal reached",
            ReminderDecision::SkipOutsideWindow => "skipped, outside reminder window",
        }
    }
}

/// Decides whether a reminder should go out at `now`.
///
/// Checks run in order: enabled flag, goal presence, goal reached, time window.
/// A counter from a previous local day counts as zero.
pub fn evaluate_reminder(user: &User, settings: &UserSettings, now: &DateTime<Utc>) -> ReminderDecision {
    if !settings.water_reminders_enabled {
        return ReminderDecision::SkipDisabled;
    }

    let goal = match user.water_goal {
        Some(goal) if goal > 0.0 => goal,
        _ => return ReminderDecision::SkipNoGoal,
    };

    let tz = timezone_or_utc(&settings.timezone);
    let today = local_day(now, &tz);
    let current = if needs_daily_reset(user.water_day.as_deref(), &today) {
        0.0
    } else {
        user.current_water
    };

    if current >= goal {
        return ReminderDecision::SkipGoalReached;
    }

    let (start, end) = match (
        NaiveTime::parse_from_str(&settings.reminder_start_time, "%H:%M"),
        NaiveTime::parse_from_str(&settings.reminder_end_time, "%H:%M"),
    ) {
        (Ok(start), Ok(end)) => (start, end),
        _ => {
            tracing::warn!(
                "Invalid reminder window {}-{} for user {}, treating as all day",
                settings.reminder_start_time, settings.reminder_end_time, user.telegram_id
            );
            (NaiveTime::default(), NaiveTime::default())
        }
    };

    if !is_within_window(local_time(now, &tz), start, end) {
        return ReminderDecision::SkipOutsideWindow;
    }

    ReminderDecision::Send
}

/// Text block shown for `/progress` and after logging water (MarkdownV2).
pub fn format_progress(current: f64, goal: f64) -> String {
    use crate::utils::markdown::{bold, code, escape_markdown};

    let percent = progress_percent(current, goal);
    let mut text = format!(
        "💧 {} 💧\n\n🚰 Today: {}\n🎯 Daily goal: {}\n📊 Progress: {}\n\n{}\n",
        bold("Hydration progress"),
        code(&format!("{current:.0} ml")),
        code(&format!("{goal:.0} ml")),
        code(&format!("{percent:.1}%")),
        progress_bar(percent)
    );

    if percent >= 100.0 {
        text.push_str(&format!("\n{}", escape_markdown("✅ Goal reached! Great job!")));
    } else {
        let remaining = (goal - current).max(0.0);
        text.push_str(&escape_markdown(&format!("\n{remaining:.0} ml to go.")));
    }

    text
}

/// Sums consumption entries per local day, oldest day first. Reset entries are ignored.
pub fn daily_totals(logs: &[WaterLog], tz: &Tz) -> Vec<(String, f64)> {
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for log in logs.iter().filter(|log| !log.is_daily_reset) {
        match parse_db_timestamp(&log.timestamp) {
            Ok(at) => *totals.entry(local_day(&at, tz)).or_default() += log.amount,
            Err(e) => tracing::warn!("Skipping water log {}: {}", log.id, e),
        }
    }
    totals.into_iter().collect()
}
