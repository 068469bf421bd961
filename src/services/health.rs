use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use crate::database::connection::DatabaseManager;
use crate::services::reminder::ReminderService;
use chrono::{DateTime, Utc};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub database: DatabaseHealth,
    pub reminders: ReminderHealth,
    pub uptime_seconds: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseHealth {
    pub status: String,
    pub connection_pool_size: u32,
    pub registered_users: i64,
    pub response_time_ms: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReminderHealth {
    pub running: bool,
    pub active_jobs: usize,
}

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseManager>,
    pub reminders: Option<ReminderService>,
    pub start_time: DateTime<Utc>,
}

pub struct HealthService {
    pub router: Router,
}

impl HealthService {
    pub fn new(db: Arc<DatabaseManager>, reminders: Option<ReminderService>) -> Self {
        let state = AppState {
            db,
            reminders,
            start_time: Utc::now(),
        };

        let router = Router::new()
            .route("/health", get(health_check))
            .route("/health/ready", get(readiness_check))
            .route("/health/live", get(liveness_check))
            .layer(TraceLayer::new_for_http())
            .with_state(state);

        Self { router }
    }
}

async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>, StatusCode> {
    let start = std::time::Instant::now();

    let registered_users = match count_users(&state.db).await {
        Ok(count) => Some(count),
        Err(e) => {
            tracing::error!("Health check database query failed: {}", e);
            None
        }
    };
    let response_time_ms = start.elapsed().as_millis() as u64;

    let Some(registered_users) = registered_users else {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };

    let reminders = match &state.reminders {
        Some(service) => ReminderHealth {
            running: service.is_running(),
            active_jobs: service.active_jobs().await,
        },
        None => ReminderHealth {
            running: false,
            active_jobs: 0,
        },
    };

    let uptime = Utc::now()
        .signed_duration_since(state.start_time)
        .num_seconds()
        .max(0) as u64;

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: DatabaseHealth {
            status: "healthy".to_string(),
            connection_pool_size: state.db.pool.size(),
            registered_users,
            response_time_ms,
        },
        reminders,
        uptime_seconds: uptime,
    }))
}

async fn readiness_check(State(state): State<AppState>) -> Result<Json<&'static str>, StatusCode> {
    match count_users(&state.db).await {
        Ok(_) => Ok(Json("ready")),
        Err(_) => Err(StatusCode::SERVICE_UNAVAILABLE),
    }
}

async fn liveness_check() -> Json<&'static str> {
    Json("alive")
}

async fn count_users(db: &DatabaseManager) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(&db.pool)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use tempfile::TempDir;
    use teloxide::Bot;

    async fn create_test_db() -> (Arc<DatabaseManager>, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test.db");
        let db_url = format!("sqlite://{}", db_path.display());

        let db = DatabaseManager::new(&db_url)
            .await
            .expect("Failed to create test database");
        db.run_migrations().await.expect("Failed to run migrations");

        (Arc::new(db), temp_dir)
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (db, _temp_dir) = create_test_db().await;
        let server = TestServer::new(HealthService::new(db, None).router)
            .expect("Failed to create test server");

        let response = server.get("/health").await;

        assert_eq!(response.status_code(), StatusCode::OK);

        let health_response: HealthResponse = response.json();
        assert_eq!(health_response.status, "healthy");
        assert_eq!(health_response.database.status, "healthy");
        assert_eq!(health_response.database.registered_users, 0);
        assert_eq!(health_response.version, env!("CARGO_PKG_VERSION"));
        assert!(!health_response.reminders.running);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_health_reports_reminder_jobs() {
        let (db, _temp_dir) = create_test_db().await;
        let reminders = ReminderService::new(Bot::new("123456:test_token"), db.clone())
            .await
            .expect("Failed to create reminder service");
        reminders.schedule_for_user(42, 60).await.expect("Failed to schedule");

        let server = TestServer::new(HealthService::new(db, Some(reminders)).router)
            .expect("Failed to create test server");

        let health_response: HealthResponse = server.get("/health").await.json();
        assert!(!health_response.reminders.running);
        assert_eq!(health_response.reminders.active_jobs, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_health_follows_scheduler_lifecycle() {
        let (db, _temp_dir) = create_test_db().await;
        let reminders = ReminderService::new(Bot::new("123456:test_token"), db.clone())
            .await
            .expect("Failed to create reminder service");
        let server = TestServer::new(HealthService::new(db, Some(reminders.clone())).router)
            .expect("Failed to create test server");

        reminders.start().await.expect("Failed to start reminders");
        let started: HealthResponse = server.get("/health").await.json();
        assert!(started.reminders.running);

        reminders.stop().await.expect("Failed to stop reminders");
        let stopped: HealthResponse = server.get("/health").await.json();
        assert!(!stopped.reminders.running);
        assert_eq!(stopped.reminders.active_jobs, 0);
    }

    #[tokio::test]
    async fn test_readiness_endpoint() {
        let (db, _temp_dir) = create_test_db().await;
        let server = TestServer::new(HealthService::new(db, None).router)
            .expect("Failed to create test server");

        let response = server.get("/health/ready").await;

        assert_eq!(response.status_code(), StatusCode::OK);

        let ready_response: String = response.json();
        assert_eq!(ready_response, "ready");
    }

    #[tokio::test]
    async fn test_liveness_endpoint() {
        let (db, _temp_dir) = create_test_db().await;
        let server = TestServer::new(HealthService::new(db, None).router)
            .expect("Failed to create test server");

        let response = server.get("/health/live").await;

        assert_eq!(response.status_code(), StatusCode::OK);

        let alive_response: String = response.json();
        assert_eq!(alive_response, "alive");
    }
}
