use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::database::connection::DatabaseManager;
use crate::database::models::StudentRequest;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub database: DatabaseHealth,
    pub workload: WorkloadHealth,
    pub uptime_seconds: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseHealth {
    pub status: String,
    pub connection_pool_size: u32,
    pub response_time_ms: u64,
}

/// Counters that show whether tutors are keeping up with their queue.
#[derive(Debug, Serialize, Deserialize)]
pub struct WorkloadHealth {
    pub registered_users: i64,
    pub pending_requests: i64,
}

#[derive(Clone)]
struct HealthState {
    db: Arc<DatabaseManager>,
    started_at: DateTime<Utc>,
}

/// `/health`, `/health/ready` and `/health/live` for container probes.
pub struct HealthService {
    pub router: Router,
}

impl HealthService {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        let state = HealthState {
            db,
            started_at: Utc::now(),
        };

        let router = Router::new()
            .route("/health", get(health_check))
            .route("/health/ready", get(readiness_check))
            .route("/health/live", get(liveness_check))
            .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
            .with_state(state);

        Self { router }
    }
}

async fn health_check(State(state): State<HealthState>) -> Result<Json<HealthResponse>, StatusCode> {
    let started = Instant::now();
    let workload = match workload(&state.db).await {
        Ok(workload) => workload,
        Err(e) => {
            tracing::error!("Health check query failed: {}", e);
            return Err(StatusCode::SERVICE_UNAVAILABLE);
        }
    };
    let response_time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    let uptime_seconds = u64::try_from(
        Utc::now()
            .signed_duration_since(state.started_at)
            .num_seconds(),
    )
    .unwrap_or(0);

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: DatabaseHealth {
            status: "healthy".to_string(),
            connection_pool_size: state.db.pool.size(),
            response_time_ms,
        },
        workload,
        uptime_seconds,
    }))
}

/// Ready once the schema is in place, not merely when the file opens.
async fn readiness_check(State(state): State<HealthState>) -> Result<Json<&'static str>, StatusCode> {
    match workload(&state.db).await {
        Ok(_) => Ok(Json("ready")),
        Err(_) => Err(StatusCode::SERVICE_UNAVAILABLE),
    }
}

async fn liveness_check() -> Json<&'static str> {
    Json("alive")
}

async fn workload(db: &DatabaseManager) -> Result<WorkloadHealth, sqlx::Error> {
    let registered_users: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role NOT IN ('unregistered', 'archived')")
            .fetch_one(&db.pool)
            .await?;
    let pending_requests = StudentRequest::count_pending(&db.pool, None).await?;
    Ok(WorkloadHealth {
        registered_users,
        pending_requests,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_test::TestServer;
    use tempfile::TempDir;

    async fn create_test_health_service(migrate: bool) -> (HealthService, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test.db");
        let db_url = format!("sqlite:{}", db_path.display());

        let db = DatabaseManager::new(&db_url)
            .await
            .expect("Failed to create test database");
        if migrate {
            db.run_migrations().await.expect("Failed to run migrations");
        }

        (HealthService::new(Arc::new(db)), temp_dir)
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (health_service, _temp_dir) = create_test_health_service(true).await;
        let server = TestServer::new(health_service.router).expect("Failed to create test server");

        let response = server.get("/health").await;
        assert_eq!(response.status_code(), StatusCode::OK);

        let health: HealthResponse = response.json();
        assert_eq!(health.status, "healthy");
        assert_eq!(health.database.status, "healthy");
        assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(health.workload.registered_users, 0);
        assert_eq!(health.workload.pending_requests, 0);
    }

    #[tokio::test]
    async fn test_readiness_requires_schema() {
        let (health_service, _temp_dir) = create_test_health_service(false).await;
        let server = TestServer::new(health_service.router).expect("Failed to create test server");

        let response = server.get("/health/ready").await;
        assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_readiness_endpoint() {
        let (health_service, _temp_dir) = create_test_health_service(true).await;
        let server = TestServer::new(health_service.router).expect("Failed to create test server");

        let response = server.get("/health/ready").await;
        assert_eq!(response.status_code(), StatusCode::OK);

        let ready: String = response.json();
        assert_eq!(ready, "ready");
    }

    #[tokio::test]
    async fn test_liveness_endpoint() {
        let (health_service, _temp_dir) = create_test_health_service(true).await;
        let server = TestServer::new(health_service.router).expect("Failed to create test server");

        let response = server.get("/health/live").await;
        assert_eq!(response.status_code(), StatusCode::OK);

        let alive: String = response.json();
        assert_eq!(alive, "alive");
    }
}
