use nutribot::database::connection::DatabaseManager;
use nutribot::database::models::{
    Payment, PlanDownload, TelegramProfile, User, UserSettings, WaterLog, STATUS_COMPLETED,
};
use nutribot::utils::datetime::parse_db_timestamp;
use tempfile::{tempdir, TempDir};

async fn setup_test_db() -> (DatabaseManager, TempDir) {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test.db");
    let db_url = format!("sqlite:{}", db_path.to_string_lossy());

    let db = DatabaseManager::new(&db_url).await.unwrap();
    db.run_migrations().await.unwrap();
    (db, dir)
}

fn profile(telegram_id: i64, first_name: &str) -> TelegramProfile {
    TelegramProfile {
        telegram_id,
        username: Some(format!("user{telegram_id}")),
        first_name: Some(first_name.to_string()),
        last_name: None,
    }
}

async fn register(db: &DatabaseManager, telegram_id: i64) -> User {
    let (user, _) = User::get_or_create(&db.pool, &profile(telegram_id, "Ana"), "Europe/Madrid", 60)
        .await
        .unwrap();
    user
}

#[tokio::test]
async fn test_get_or_create_registers_user_with_settings() {
    let (db, _temp_dir) = setup_test_db().await;

    let (user, created) = User::get_or_create(&db.pool, &profile(1001, "Ana"), "Europe/Madrid", 45)
        .await
        .unwrap();

    assert!(created);
    assert_eq!(user.telegram_id, 1001);
    assert_eq!(user.first_name.as_deref(), Some("Ana"));
    assert_eq!(user.current_water, 0.0);
    assert!(user.water_goal.is_none());
    assert!(!user.is_premium);

    let settings = UserSettings::find_by_user_id(&db.pool, user.id).await.unwrap().unwrap();
    assert!(settings.water_reminders_enabled);
    assert_eq!(settings.reminder_start_time, "08:00");
    assert_eq!(settings.reminder_end_time, "22:00");
    assert_eq!(settings.reminder_interval_minutes, 45);
    assert_eq!(settings.timezone, "Europe/Madrid");
    assert!(settings.is_silent());
}

#[tokio::test]
async fn test_get_or_create_is_idempotent_and_refreshes_profile() {
    let (db, _temp_dir) = setup_test_db().await;

    let (first, created) = User::get_or_create(&db.pool, &profile(1002, "Ana"), "UTC", 60).await.unwrap();
    assert!(created);

    let (second, created) = User::get_or_create(&db.pool, &profile(1002, "Anita"), "UTC", 60).await.unwrap();
    assert!(!created);
    assert_eq!(first.id, second.id);
    assert_eq!(second.first_name.as_deref(), Some("Anita"));

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_settings WHERE user_id = ?")
        .bind(first.id)
        .fetch_one(&db.pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
    assert!(User::exists(&db.pool, 1002).await.unwrap());
    assert!(!User::exists(&db.pool, 9999).await.unwrap());
}

#[tokio::test]
async fn test_set_weight_stores_goal_and_restarts_counter() {
    let (db, _temp_dir) = setup_test_db().await;
    let user = register(&db, 1003).await;
    let now = parse_db_timestamp("2024-05-01T10:00:00Z").unwrap();

    User::set_weight(&db.pool, 1003, 60.0, 2100.0, "2024-05-01").await.unwrap();
    WaterLog::record_consumption(&db.pool, user.id, 500.0, "2024-05-01", &now).await.unwrap();

    let updated = User::set_weight(&db.pool, 1003, 70.0, 2450.0, "2024-05-01")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.weight, Some(70.0));
    assert_eq!(updated.water_goal, Some(2450.0));
    assert_eq!(updated.current_water, 0.0);
    assert_eq!(updated.water_day.as_deref(), Some("2024-05-01"));

    assert!(User::set_weight(&db.pool, 4242, 70.0, 2450.0, "2024-05-01").await.unwrap().is_none());
}

#[tokio::test]
async fn test_record_consumption_and_reset_day() {
    let (db, _temp_dir) = setup_test_db().await;
    let user = register(&db, 1004).await;
    let morning = parse_db_timestamp("2024-05-01T08:00:00Z").unwrap();
    let evening = parse_db_timestamp("2024-05-01T19:00:00Z").unwrap();
    let next_day = parse_db_timestamp("2024-05-02T00:30:00Z").unwrap();

    User::set_weight(&db.pool, 1004, 70.0, 2450.0, "2024-05-01").await.unwrap();
    let first = WaterLog::record_consumption(&db.pool, user.id, 250.0, "2024-05-01", &morning)
        .await
        .unwrap()
        .unwrap();
    assert_eq!((first.before, first.after, first.added), (0.0, 250.0, 250.0));
    let second = WaterLog::record_consumption(&db.pool, user.id, 500.0, "2024-05-01", &evening)
        .await
        .unwrap()
        .unwrap();
    assert_eq!((second.before, second.after, second.added), (250.0, 750.0, 500.0));

    let user = User::find_by_id(&db.pool, user.id).await.unwrap().unwrap();
    assert_eq!(user.current_water, 750.0);

    let discarded = WaterLog::reset_day(&db.pool, user.id, "2024-05-02", &next_day).await.unwrap();
    assert_eq!(discarded, 750.0);

    let user = User::find_by_id(&db.pool, user.id).await.unwrap().unwrap();
    assert_eq!(user.current_water, 0.0);
    assert_eq!(user.water_day.as_deref(), Some("2024-05-02"));

    let logs = WaterLog::find_by_user(&db.pool, user.id).await.unwrap();
    assert_eq!(logs.len(), 3);
    assert!(logs[2].is_daily_reset);
    assert_eq!(logs[2].amount, 750.0);

    let consumption = WaterLog::find_consumption_since(&db.pool, user.id, &morning).await.unwrap();
    assert_eq!(consumption.len(), 2);
    assert!(consumption.iter().all(|log| !log.is_daily_reset));
}

#[tokio::test]
async fn test_record_consumption_caps_at_goal_and_checks_the_day() {
    let (db, _temp_dir) = setup_test_db().await;
    let user = register(&db, 1007).await;
    let now = parse_db_timestamp("2024-05-01T10:00:00Z").unwrap();

    // No goal yet
    assert!(WaterLog::record_consumption(&db.pool, user.id, 250.0, "2024-05-01", &now)
        .await
        .unwrap()
        .is_none());

    User::set_weight(&db.pool, 1007, 20.0, 700.0, "2024-05-01").await.unwrap();
    let capped = WaterLog::record_consumption(&db.pool, user.id, 1000.0, "2024-05-01", &now)
        .await
        .unwrap()
        .unwrap();
    assert_eq!((capped.after, capped.added, capped.goal), (700.0, 700.0, 700.0));

    let full = WaterLog::record_consumption(&db.pool, user.id, 250.0, "2024-05-01", &now)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(full.added, 0.0);

    // The stored counter is for 2024-05-01, so a drink for another day is not written
    assert!(WaterLog::record_consumption(&db.pool, user.id, 250.0, "2024-05-02", &now)
        .await
        .unwrap()
        .is_none());

    let user = User::find_by_id(&db.pool, user.id).await.unwrap().unwrap();
    assert_eq!(user.current_water, 700.0);
    assert_eq!(WaterLog::find_by_user(&db.pool, user.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_reset_of_empty_day_writes_no_log() {
    let (db, _temp_dir) = setup_test_db().await;
    let user = register(&db, 1005).await;
    let now = parse_db_timestamp("2024-05-01T00:10:00Z").unwrap();

    let discarded = WaterLog::reset_day(&db.pool, user.id, "2024-05-01", &now).await.unwrap();
    assert_eq!(discarded, 0.0);
    assert!(WaterLog::find_by_user(&db.pool, user.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_settings_updates() {
    let (db, _temp_dir) = setup_test_db().await;
    let user = register(&db, 1006).await;

    UserSettings::set_window(&db.pool, user.id, "22:00", "06:00").await.unwrap();
    UserSettings::set_interval(&db.pool, user.id, 90).await.unwrap();
    UserSettings::set_timezone(&db.pool, user.id, "America/Mexico_City").await.unwrap();
    UserSettings::set_reminders_enabled(&db.pool, user.id, false).await.unwrap();

    let settings = UserSettings::find_by_telegram_id(&db.pool, 1006).await.unwrap().unwrap();
    assert_eq!(settings.reminder_start_time, "22:00");
    assert_eq!(settings.reminder_end_time, "06:00");
    assert_eq!(settings.reminder_interval_minutes, 90);
    assert_eq!(settings.timezone, "America/Mexico_City");
    assert!(!settings.water_reminders_enabled);

    assert_eq!(UserSettings::toggle_notification(&db.pool, user.id).await.unwrap(), "sound");
    assert_eq!(UserSettings::toggle_notification(&db.pool, user.id).await.unwrap(), "silent");
}

#[tokio::test]
async fn test_reminder_targets_need_goal_and_enabled_reminders() {
    let (db, _temp_dir) = setup_test_db().await;
    let with_goal = register(&db, 2001).await;
    let disabled = register(&db, 2002).await;
    register(&db, 2003).await;

    User::set_weight(&db.pool, 2001, 70.0, 2450.0, "2024-05-01").await.unwrap();
    User::set_weight(&db.pool, 2002, 80.0, 2800.0, "2024-05-01").await.unwrap();
    UserSettings::set_interval(&db.pool, with_goal.id, 30).await.unwrap();
    UserSettings::set_reminders_enabled(&db.pool, disabled.id, false).await.unwrap();

    let targets = UserSettings::find_reminder_targets(&db.pool).await.unwrap();
    assert_eq!(targets, vec![(2001, 30)]);
}

#[tokio::test]
async fn test_plan_downloads_counted_since_start_of_day() {
    let (db, _temp_dir) = setup_test_db().await;
    let user = register(&db, 3001).await;

    let yesterday = parse_db_timestamp("2024-04-30T21:00:00Z").unwrap();
    let today = parse_db_timestamp("2024-05-01T09:00:00Z").unwrap();
    let start_of_day = parse_db_timestamp("2024-05-01T00:00:00Z").unwrap();

    PlanDownload::create(&db.pool, user.id, "sports", "sports_1.pdf", &yesterday).await.unwrap();
    PlanDownload::create(&db.pool, user.id, "weight_loss", "loss_2.pdf", &today).await.unwrap();
    PlanDownload::create(&db.pool, user.id, "weight_loss", "loss_1.pdf", &today).await.unwrap();

    assert_eq!(PlanDownload::count_since(&db.pool, user.id, &start_of_day).await.unwrap(), 2);
    assert_eq!(PlanDownload::find_by_user(&db.pool, user.id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_payment_completion_happens_once() {
    let (db, _temp_dir) = setup_test_db().await;
    let user = register(&db, 4001).await;
    let now = parse_db_timestamp("2024-05-01T12:00:00Z").unwrap();

    let payment = Payment::create_pending(&db.pool, user.id, 9.99, "USD", "telegram").await.unwrap();
    assert!(payment.is_pending());
    assert_eq!(payment.amount_minor(), 999);

    assert!(Payment::mark_completed(&db.pool, &payment.id, "charge_1", &now).await.unwrap());
    assert!(!Payment::mark_completed(&db.pool, &payment.id, "charge_2", &now).await.unwrap());

    let stored = Payment::find_by_id(&db.pool, &payment.id).await.unwrap().unwrap();
    assert_eq!(stored.status, STATUS_COMPLETED);
    assert_eq!(stored.transaction_id.as_deref(), Some("charge_1"));
    assert_eq!(stored.completed_at.as_deref(), Some("2024-05-01T12:00:00Z"));

    let failed = Payment::create_pending(&db.pool, user.id, 9.99, "USD", "telegram").await.unwrap();
    Payment::mark_failed(&db.pool, &failed.id).await.unwrap();
    assert!(!Payment::mark_completed(&db.pool, &failed.id, "charge_3", &now).await.unwrap());
    assert_eq!(Payment::find_by_user(&db.pool, user.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_expire_premium_clears_lapsed_subscriptions() {
    let (db, _temp_dir) = setup_test_db().await;
    let lapsed = register(&db, 5001).await;
    let active = register(&db, 5002).await;
    let now = parse_db_timestamp("2024-05-01T12:00:00Z").unwrap();

    User::set_premium(&db.pool, lapsed.id, &parse_db_timestamp("2024-04-30T12:00:00Z").unwrap()).await.unwrap();
    User::set_premium(&db.pool, active.id, &parse_db_timestamp("2024-05-30T12:00:00Z").unwrap()).await.unwrap();

    assert_eq!(User::expire_premium(&db.pool, &now).await.unwrap(), 1);

    assert!(!User::find_by_id(&db.pool, lapsed.id).await.unwrap().unwrap().is_premium);
    assert!(User::find_by_id(&db.pool, active.id).await.unwrap().unwrap().is_premium);
}

#[tokio::test]
async fn test_deleting_user_cascades() {
    let (db, _temp_dir) = setup_test_db().await;
    let user = register(&db, 6001).await;
    let now = parse_db_timestamp("2024-05-01T12:00:00Z").unwrap();
    User::set_weight(&db.pool, 6001, 70.0, 2450.0, "2024-05-01").await.unwrap();
    WaterLog::record_consumption(&db.pool, user.id, 250.0, "2024-05-01", &now).await.unwrap();

    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(user.id)
        .execute(&db.pool)
        .await
        .unwrap();

    assert!(UserSettings::find_by_user_id(&db.pool, user.id).await.unwrap().is_none());
    assert!(WaterLog::find_by_user(&db.pool, user.id).await.unwrap().is_empty());
}
