//! HTTP surface
//!
//! Endpoints:
//! - GET  /api/health                      - Liveness plus store reachability
//! - GET  /api/load                        - Row count per table
//! - GET  /api/<dataset>/filters           - Filter options and date bounds
//! - GET  /api/<dataset>/kpis              - KPI set under query filters
//! - GET  /api/<dataset>/data              - Raw rows (`limit` capped)
//! - GET  /api/<dataset>/chart/:dimension  - Grouped series
//! - GET  /api/compras/load                - Row count per purchasing table
//! - GET  /api/compras/filters             - Filter options of all purchasing tables
//! - POST /api/compras/kpis                - Dashboard KPIs under body filters
//! - POST /api/compras/charts/:chart       - Dashboard chart under body filters

pub mod dashboard_routes;
pub mod dataset_routes;

use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use serde::Serialize;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::database::{DatabaseManager, Record};
use crate::datasets;
use crate::query::{AggregationService, DatasetSchema, QueryLimits};

#[derive(Clone)]
pub struct AppState {
    pub service: AggregationService,
    pub db: Arc<DatabaseManager>,
}

impl AppState {
    /// State over a manager's pool with the given request caps
    pub fn new(db: DatabaseManager, limits: QueryLimits) -> Self {
        let service = AggregationService::new(Arc::new(db.gateway())).with_limits(limits);
        Self {
            service,
            db: Arc::new(db),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub pool: String,
}

/// Per-table row counts; a table that cannot be counted reports 0
#[derive(Debug, Serialize)]
pub struct CountsResponse {
    pub success: bool,
    pub counts: Record,
}

pub fn create_router(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/api/health", get(health_check))
        .route("/api/load", get(load_all))
        .merge(dashboard_routes::router())
        .with_state(state.clone());

    for schema in datasets::ALL {
        app = app.nest(
            &format!("/api/{}", schema.route),
            dataset_routes::router(state.service.clone(), schema),
        );
    }

    app.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
    )
}

async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let pool = state.db.connection_stats().to_string();
    match state.db.test_connection().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                database: "connected",
                pool,
            }),
        ),
        Err(e) => {
            warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "degraded",
                    database: "unreachable",
                    pool,
                }),
            )
        }
    }
}

async fn load_all(State(state): State<AppState>) -> Json<CountsResponse> {
    Json(CountsResponse {
        success: true,
        counts: table_counts(&state.service, &datasets::ALL).await,
    })
}

/// Row count of each table, keyed by table name, in the given order
pub(crate) async fn table_counts(
    service: &AggregationService,
    schemas: &[&'static DatasetSchema],
) -> Record {
    let mut counts = Record::new();
    for schema in schemas {
        let count = match service.row_count(schema).await {
            Ok(n) => n,
            Err(e) => {
                warn!(table = schema.table, error = %e, "could not count table");
                0
            }
        };
        counts.insert(schema.table, count.into());
    }
    counts
}
