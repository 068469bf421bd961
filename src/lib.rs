//! # NutriBot
//!
//! A Telegram bot for hydration tracking and nutrition plans.
//!
//! ## Features
//! - Daily water goal computed from body weight (35 ml per kg)
//! - Water intake logging clamped to the daily goal
//! - Periodic hydration reminders inside a per-user time window
//! - Automatic counter reset at each user's local midnight
//! - Nutrition plan PDFs with a free daily download limit
//! - Premium subscription sold through Telegram invoices
//! - Persistent storage with SQLite

/// Bot command handlers and message processing
pub mod bot;
/// Configuration management and environment variables
pub mod config;
/// Database models, connections, and migrations
pub mod database;
/// Typed errors raised by the services
pub mod error;
/// Background services like reminders, plans and payments
pub mod services;
/// Utility functions for datetime, validation, and formatting
pub mod utils;
