use chrono::{DateTime, Utc};
use nutribot::database::connection::DatabaseManager;
use nutribot::database::models::{TelegramProfile, User, UserSettings, WaterLog};
use nutribot::error::ReminderError;
use nutribot::services::hydration::ReminderDecision;
use nutribot::services::reminder::{prepare_reminder, roll_over_if_needed, run_maintenance, ReminderService};
use nutribot::utils::datetime::parse_db_timestamp;
use std::sync::Arc;
use teloxide::Bot;
use tempfile::{tempdir, TempDir};

async fn setup_test_db() -> (Arc<DatabaseManager>, TempDir) {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test.db");
    let db_url = format!("sqlite:{}", db_path.to_string_lossy());

    let db = DatabaseManager::new(&db_url).await.unwrap();
    db.run_migrations().await.unwrap();
    (Arc::new(db), dir)
}

fn at(value: &str) -> DateTime<Utc> {
    parse_db_timestamp(value).unwrap()
}

async fn register(db: &DatabaseManager, telegram_id: i64, timezone: &str) -> User {
    let profile = TelegramProfile {
        telegram_id,
        username: None,
        first_name: Some("Ana".to_string()),
        last_name: None,
    };
    let (user, _) = User::get_or_create(&db.pool, &profile, timezone, 60).await.unwrap();
    user
}

async fn decision(db: &DatabaseManager, telegram_id: i64, now: &str) -> ReminderDecision {
    let (_, _, decision) = prepare_reminder(&db.pool, telegram_id, &at(now)).await.unwrap().unwrap();
    decision
}

#[tokio::test]
async fn test_reminder_decisions_follow_settings_and_progress() {
    let (db, _temp_dir) = setup_test_db().await;
    let user = register(&db, 100, "UTC").await;

    assert_eq!(decision(&db, 100, "2024-05-01T12:00:00Z").await, ReminderDecision::SkipNoGoal);

    User::set_weight(&db.pool, 100, 70.0, 2450.0, "2024-05-01").await.unwrap();
    assert_eq!(decision(&db, 100, "2024-05-01T12:00:00Z").await, ReminderDecision::Send);
    assert_eq!(decision(&db, 100, "2024-05-01T23:00:00Z").await, ReminderDecision::SkipOutsideWindow);

    WaterLog::record_consumption(&db.pool, user.id, 2450.0, "2024-05-01", &at("2024-05-01T13:00:00Z"))
        .await
        .unwrap();
    assert_eq!(decision(&db, 100, "2024-05-01T14:00:00Z").await, ReminderDecision::SkipGoalReached);

    UserSettings::set_reminders_enabled(&db.pool, user.id, false).await.unwrap();
    assert_eq!(decision(&db, 100, "2024-05-01T14:00:00Z").await, ReminderDecision::SkipDisabled);
}

#[tokio::test]
async fn test_prepare_reminder_rolls_over_a_stale_day() {
    let (db, _temp_dir) = setup_test_db().await;
    let user = register(&db, 101, "UTC").await;
    User::set_weight(&db.pool, 101, 60.0, 2100.0, "2024-05-01").await.unwrap();
    WaterLog::record_consumption(&db.pool, user.id, 2100.0, "2024-05-01", &at("2024-05-01T18:00:00Z"))
        .await
        .unwrap();

    let (user, _, decision) = prepare_reminder(&db.pool, 101, &at("2024-05-02T09:00:00Z"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(decision, ReminderDecision::Send);
    assert_eq!(user.current_water, 0.0);
    assert_eq!(user.water_day.as_deref(), Some("2024-05-02"));
}

#[tokio::test]
async fn test_prepare_reminder_for_unknown_user() {
    let (db, _temp_dir) = setup_test_db().await;
    assert!(prepare_reminder(&db.pool, 999, &at("2024-05-01T12:00:00Z")).await.unwrap().is_none());
}

#[tokio::test]
async fn test_roll_over_uses_local_midnight() {
    let (db, _temp_dir) = setup_test_db().await;
    let user = register(&db, 102, "Europe/Madrid").await;
    User::set_weight(&db.pool, 102, 70.0, 2450.0, "2024-05-01").await.unwrap();
    let settings = UserSettings::find_by_user_id(&db.pool, user.id).await.unwrap().unwrap();

    // 21:30 UTC is 23:30 in Madrid
    let user = User::find_by_id(&db.pool, user.id).await.unwrap().unwrap();
    let (user, rolled) = roll_over_if_needed(&db.pool, user, &settings, &at("2024-05-01T21:30:00Z"))
        .await
        .unwrap();
    assert!(!rolled);

    // 22:30 UTC is 00:30 the next day in Madrid
    let (user, rolled) = roll_over_if_needed(&db.pool, user, &settings, &at("2024-05-01T22:30:00Z"))
        .await
        .unwrap();
    assert!(rolled);
    assert_eq!(user.water_day.as_deref(), Some("2024-05-02"));
}

#[tokio::test]
async fn test_maintenance_resets_per_timezone_and_expires_premium() {
    let (db, _temp_dir) = setup_test_db().await;
    let madrid = register(&db, 200, "Europe/Madrid").await;
    let mexico = register(&db, 201, "America/Mexico_City").await;
    let no_goal = register(&db, 202, "Europe/Madrid").await;

    for (telegram_id, user_id) in [(200, madrid.id), (201, mexico.id)] {
        User::set_weight(&db.pool, telegram_id, 70.0, 2450.0, "2024-05-01").await.unwrap();
        WaterLog::record_consumption(&db.pool, user_id, 1000.0, "2024-05-01", &at("2024-05-01T12:00:00Z"))
            .await
            .unwrap();
    }
    User::set_premium(&db.pool, no_goal.id, &at("2024-05-01T20:00:00Z")).await.unwrap();

    let report = run_maintenance(&db.pool, at("2024-05-01T22:30:00Z")).await.unwrap();

    assert_eq!(report.reset_users, vec![200]);
    assert_eq!(report.expired_premium, 1);

    let madrid = User::find_by_id(&db.pool, madrid.id).await.unwrap().unwrap();
    assert_eq!(madrid.current_water, 0.0);
    assert_eq!(madrid.water_day.as_deref(), Some("2024-05-02"));

    let mexico = User::find_by_id(&db.pool, mexico.id).await.unwrap().unwrap();
    assert_eq!(mexico.current_water, 1000.0);

    let resets: Vec<_> = WaterLog::find_by_user(&db.pool, madrid.id)
        .await
        .unwrap()
        .into_iter()
        .filter(|log| log.is_daily_reset)
        .collect();
    assert_eq!(resets.len(), 1);
    assert_eq!(resets[0].amount, 1000.0);

    // Running again in the same hour changes nothing
    let report = run_maintenance(&db.pool, at("2024-05-01T22:45:00Z")).await.unwrap();
    assert!(report.reset_users.is_empty());
    assert_eq!(report.expired_premium, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_reminder_jobs_are_replaced_and_cancelled() {
    let (db, _temp_dir) = setup_test_db().await;
    let reminders = ReminderService::new(Bot::new("123456:test_token"), db).await.unwrap();

    reminders.schedule_for_user(300, 60).await.unwrap();
    reminders.schedule_for_user(300, 30).await.unwrap();
    reminders.schedule_for_user(301, 90).await.unwrap();
    assert_eq!(reminders.active_jobs().await, 2);
    assert!(reminders.is_scheduled(300).await);

    assert!(!reminders.ensure_scheduled(300, 45).await.unwrap());
    assert!(reminders.ensure_scheduled(302, 45).await.unwrap());
    assert_eq!(reminders.active_jobs().await, 3);

    assert!(reminders.cancel_for_user(300).await.unwrap());
    assert!(!reminders.cancel_for_user(300).await.unwrap());
    assert!(!reminders.is_scheduled(300).await);
    assert_eq!(reminders.active_jobs().await, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_schedule_rejects_non_positive_interval() {
    let (db, _temp_dir) = setup_test_db().await;
    let reminders = ReminderService::new(Bot::new("123456:test_token"), db).await.unwrap();

    let result = reminders.schedule_for_user(303, 0).await;
    assert!(matches!(result, Err(ReminderError::InvalidInterval(0))));
    assert_eq!(reminders.active_jobs().await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_restore_jobs_only_for_reminder_targets() {
    let (db, _temp_dir) = setup_test_db().await;
    register(&db, 400, "UTC").await;
    let disabled = register(&db, 401, "UTC").await;
    register(&db, 402, "UTC").await;

    User::set_weight(&db.pool, 400, 70.0, 2450.0, "2024-05-01").await.unwrap();
    User::set_weight(&db.pool, 401, 70.0, 2450.0, "2024-05-01").await.unwrap();
    UserSettings::set_reminders_enabled(&db.pool, disabled.id, false).await.unwrap();

    let reminders = ReminderService::new(Bot::new("123456:test_token"), db).await.unwrap();
    assert_eq!(reminders.restore_jobs().await.unwrap(), 1);
    assert!(reminders.is_scheduled(400).await);
    assert!(!reminders.is_scheduled(401).await);
    assert!(!reminders.is_scheduled(402).await);
}
