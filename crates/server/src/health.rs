use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use pricewise_core::search::SearchService;
use pricewise_db::DbPool;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
    service: Arc<SearchService>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: HealthCheck,
    pub index: HealthCheck,
    pub checked_at: String,
}

pub fn router(db_pool: DbPool, service: Arc<SearchService>) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { db_pool, service })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let database = database_check(&state.db_pool).await;
    let index = index_check(&state.service);
    let ready = database.status == "ready" && index.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        database,
        index,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn database_check(pool: &DbPool) -> HealthCheck {
    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool).await {
        Ok(_) => HealthCheck { status: "ready", detail: "database query succeeded".to_string() },
        Err(error) => {
            HealthCheck { status: "degraded", detail: format!("database query failed: {error}") }
        }
    }
}

fn index_check(service: &SearchService) -> HealthCheck {
    let stats = service.stats();
    if !stats.ready {
        return HealthCheck { status: "degraded", detail: "index has not been built".to_string() };
    }

    HealthCheck {
        status: "ready",
        detail: format!(
            "generation {} with {} listings built at {}",
            stats.generation,
            stats.records,
            stats.built_at.to_rfc3339()
        ),
    }
}
