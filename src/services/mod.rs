pub mod health;
pub mod hydration;
pub mod plans;
pub mod premium;
pub mod reminder;
