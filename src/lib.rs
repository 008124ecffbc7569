//! Dashboard API
//!
//! Read-only backend for a BI dashboard over purchasing, cost, fleet and
//! warehouse-error tables. Requests carry optional filters; the service
//! answers with filter options, KPI sets, raw rows and grouped chart series.
//!
//! Layers, bottom up:
//! - [`database`]: connection pool and the [`DataGateway`](database::DataGateway)
//!   that runs parameterized statements
//! - [`query`]: typed predicate building and the schema-driven
//!   [`AggregationService`](query::AggregationService)
//! - [`datasets`]: the static schema of every table served
//! - [`api`]: axum routers exposing it all over HTTP

pub mod api;
pub mod config;
pub mod database;
pub mod datasets;
pub mod error;
pub mod query;

pub use api::{create_router, AppState};
pub use config::ServerConfig;
pub use database::{DataGateway, DatabaseConfig, DatabaseManager, SqliteGateway};
pub use error::{ApiError, GatewayError, QueryError};
pub use query::{AggregationService, QueryLimits};
