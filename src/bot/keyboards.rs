//! Inline keyboards and the callback data they carry.

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use crate::services::hydration::QUICK_AMOUNTS;
use crate::services::plans::PlanCategory;

/// Every button press the bot understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    MainMenu,
    WaterReminder,
    WaterProgress,
    WaterAmount(u32),
    RegisterWeight,
    CancelWaterReminders,
    EnableWaterReminders,
    ToggleNotification,
    NutritionPlans,
    Plan(PlanCategory),
    Premium,
    PremiumBuy,
}

impl CallbackAction {
    pub fn parse(data: &str) -> Option<Self> {
        let action = match data {
            "main_menu" => CallbackAction::MainMenu,
            "water_reminder" => CallbackAction::WaterReminder,
            "water_progress" => CallbackAction::WaterProgress,
            "register_weight" => CallbackAction::RegisterWeight,
            "cancel_water_reminders" => CallbackAction::CancelWaterReminders,
            "enable_water_reminders" => CallbackAction::EnableWaterReminders,
            "toggle_notification" => CallbackAction::ToggleNotification,
            "nutrition_plans" => CallbackAction::NutritionPlans,
            "premium" => CallbackAction::Premium,
            "premium_buy" => CallbackAction::PremiumBuy,
            _ => {
                if let Some(amount) = data.strip_prefix("water_amount_") {
                    let amount: u32 = amount.parse().ok()?;
                    if amount == 0 {
                        return None;
                    }
                    CallbackAction::WaterAmount(amount)
                } else if let Some(slug) = data.strip_prefix("plan_") {
                    CallbackAction::Plan(PlanCategory::from_slug(slug)?)
                } else {
                    return None;
                }
            }
        };
        Some(action)
    }

    pub fn to_data(&self) -> String {
        match self {
            CallbackAction::MainMenu => "main_menu".to_string(),
            CallbackAction::WaterReminder => "water_reminder".to_string(),
            CallbackAction::WaterProgress => "water_progress".to_string(),
            CallbackAction::WaterAmount(amount) => format!("water_amount_{amount}"),
            CallbackAction::RegisterWeight => "register_weight".to_string(),
            CallbackAction::CancelWaterReminders => "cancel_water_reminders".to_string(),
            CallbackAction::EnableWaterReminders => "enable_water_reminders".to_string(),
            CallbackAction::ToggleNotification => "toggle_notification".to_string(),
            CallbackAction::NutritionPlans => "nutrition_plans".to_string(),
            CallbackAction::Plan(category) => format!("plan_{}", category.slug()),
            CallbackAction::Premium => "premium".to_string(),
            CallbackAction::PremiumBuy => "premium_buy".to_string(),
        }
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            CallbackAction::MainMenu => "main_menu",
            CallbackAction::WaterReminder => "water_reminder",
            CallbackAction::WaterProgress => "water_progress",
            CallbackAction::WaterAmount(_) => "water_amount",
            CallbackAction::RegisterWeight => "register_weight",
            CallbackAction::CancelWaterReminders => "cancel_water_reminders",
            CallbackAction::EnableWaterReminders => "enable_water_reminders",
            CallbackAction::ToggleNotification => "toggle_notification",
            CallbackAction::NutritionPlans => "nutrition_plans",
            CallbackAction::Plan(_) => "plan",
            CallbackAction::Premium => "premium",
            CallbackAction::PremiumBuy => "premium_buy",
        }
    }
}

fn button(label: impl Into<String>, action: CallbackAction) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(label, action.to_data())
}

fn back_to_menu_row() -> Vec<InlineKeyboardButton> {
    vec![button("🔙 Main menu", CallbackAction::MainMenu)]
}

fn amount_label(amount: u32) -> String {
    if amount % 1000 == 0 {
        format!("➕ {}L", amount / 1000)
    } else {
        format!("➕ {amount}ml")
    }
}

fn quick_amount_rows() -> Vec<Vec<InlineKeyboardButton>> {
    QUICK_AMOUNTS
        .chunks(2)
        .map(|pair| {
            pair.iter()
                .map(|&amount| button(amount_label(amount), CallbackAction::WaterAmount(amount)))
                .collect()
        })
        .collect()
}

pub fn main_menu_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![button("💧 Water reminders", CallbackAction::WaterReminder)],
        vec![button("🍎 Nutrition plans", CallbackAction::NutritionPlans)],
        vec![button("🌟 Premium", CallbackAction::Premium)],
    ])
}

/// Quick-log buttons under the hydration progress message.
pub fn water_progress_keyboard() -> InlineKeyboardMarkup {
    let mut rows = quick_amount_rows();
    rows.push(vec![button("⚖ Update weight", CallbackAction::RegisterWeight)]);
    rows.push(vec![button("⏰ Reminder settings", CallbackAction::WaterReminder)]);
    rows.push(back_to_menu_row());
    InlineKeyboardMarkup::new(rows)
}

/// Attached to every reminder message.
pub fn water_reminder_keyboard() -> InlineKeyboardMarkup {
    let mut rows = quick_amount_rows();
    rows.push(vec![button("📊 My progress", CallbackAction::WaterProgress)]);
    rows.push(vec![button("🔕 Stop reminders", CallbackAction::CancelWaterReminders)]);
    InlineKeyboardMarkup::new(rows)
}

pub fn reminder_settings_keyboard(enabled: bool, silent: bool) -> InlineKeyboardMarkup {
    let toggle = if enabled {
        button("🔕 Stop reminders", CallbackAction::CancelWaterReminders)
    } else {
        button("🔔 Resume reminders", CallbackAction::EnableWaterReminders)
    };
    let sound = if silent {
        button("🔊 Use sound", CallbackAction::ToggleNotification)
    } else {
        button("🔇 Make silent", CallbackAction::ToggleNotification)
    };

    InlineKeyboardMarkup::new(vec![
        vec![button("💧 Log water", CallbackAction::WaterProgress)],
        vec![button("⚖ Update weight", CallbackAction::RegisterWeight)],
        vec![toggle, sound],
        back_to_menu_row(),
    ])
}

pub fn nutrition_plans_keyboard() -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = PlanCategory::ALL
        .iter()
        .map(|&category| vec![button(category.button_label(), CallbackAction::Plan(category))])
        .collect();
    rows.push(back_to_menu_row());
    InlineKeyboardMarkup::new(rows)
}

pub fn premium_keyboard(price_label: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![button(format!("💳 Buy premium ({price_label})"), CallbackAction::PremiumBuy)],
        back_to_menu_row(),
    ])
}

/// Offered when a free user hits the daily plan limit.
pub fn upgrade_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![button("🌟 Go premium", CallbackAction::Premium)],
        back_to_menu_row(),
    ])
}

/// Shown while the bot waits for a weight.
pub fn weight_input_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![back_to_menu_row()])
}

pub fn back_to_menu_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![back_to_menu_row()])
}
