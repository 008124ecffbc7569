//! Purchasing dashboard routes
//!
//! Combined views over the three purchasing tables. Body filters
//! (`dateStart`, `dateEnd`, `processes`, `suppliers`, `states`) are mapped
//! onto each table by filter role, and a table that cannot be read degrades
//! to zeros or an empty series without failing the others.

use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use super::dataset_routes::parse_limit;
use super::{table_counts, AppState, CountsResponse};
use crate::database::Record;
use crate::datasets::{self, compras};
use crate::error::{ApiError, ApiResult, QueryResult};
use crate::query::{
    empty_filter_options, recover, zero_metrics, AggregationService, DashboardFilters, Metric,
    Predicate,
};

#[derive(Debug, Serialize)]
pub struct CombinedFiltersResponse {
    pub success: bool,
    /// Filter options keyed by table name
    pub filters: BTreeMap<&'static str, Record>,
}

#[derive(Debug, Serialize)]
pub struct DashboardKpisResponse {
    pub success: bool,
    pub kpis: Record,
}

#[derive(Debug, Serialize)]
pub struct DashboardChartResponse {
    pub success: bool,
    pub data: Vec<Record>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<Record>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/compras/load", get(load_compras))
        .route("/api/compras/filters", get(combined_filters))
        .route("/api/compras/kpis", post(dashboard_kpis))
        .route("/api/compras/charts/:chart", post(dashboard_chart))
}

async fn load_compras(State(state): State<AppState>) -> Json<CountsResponse> {
    Json(CountsResponse {
        success: true,
        counts: table_counts(&state.service, &datasets::COMPRAS).await,
    })
}

async fn combined_filters(
    State(state): State<AppState>,
) -> ApiResult<Json<CombinedFiltersResponse>> {
    let mut filters = BTreeMap::new();
    for schema in datasets::COMPRAS {
        let options = recover(state.service.filter_options(schema).await, || {
            empty_filter_options(schema)
        })?;
        filters.insert(schema.table, options);
    }
    Ok(Json(CombinedFiltersResponse {
        success: true,
        filters,
    }))
}

async fn dashboard_kpis(
    State(state): State<AppState>,
    Json(filters): Json<DashboardFilters>,
) -> ApiResult<Json<DashboardKpisResponse>> {
    let traza = recover(
        state
            .service
            .metrics(
                &datasets::TRAZA,
                compras::TRAZA_DASHBOARD,
                &datasets::TRAZA.dashboard_predicate(&filters),
            )
            .await,
        || zero_metrics(compras::TRAZA_DASHBOARD),
    )?;
    let descuentos = recover(
        state
            .service
            .metrics(
                &datasets::DESCUENTOS,
                compras::DESCUENTOS_DASHBOARD,
                &datasets::DESCUENTOS.dashboard_predicate(&filters),
            )
            .await,
        || zero_metrics(compras::DESCUENTOS_DASHBOARD),
    )?;

    let mut kpis = Record::new();
    for name in compras::DASHBOARD_KPI_ORDER {
        let value = traza
            .get(name)
            .or_else(|| descuentos.get(name))
            .cloned()
            .unwrap_or(Value::from(0));
        kpis.insert(*name, value);
    }

    Ok(Json(DashboardKpisResponse {
        success: true,
        kpis,
    }))
}

async fn dashboard_chart(
    State(state): State<AppState>,
    Path(chart): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    Json(filters): Json<DashboardFilters>,
) -> ApiResult<Json<DashboardChartResponse>> {
    if chart == compras::DAYS_BY_STAGE {
        let predicate = datasets::TRAZA.dashboard_predicate(&filters);
        let data = recover(days_by_stage(&state.service, &predicate).await, || {
            stage_rows(&Record::new())
        })?;
        return Ok(Json(DashboardChartResponse {
            success: true,
            data,
            summary: None,
        }));
    }

    let (schema, def) = compras::dashboard_chart(&chart)
        .ok_or_else(|| ApiError::NotFound(format!("Unknown dashboard chart '{}'", chart)))?;
    let predicate = schema.dashboard_predicate(&filters);
    let data = recover(
        state
            .service
            .chart_series(schema, def, &predicate, parse_limit(&params))
            .await,
        Vec::new,
    )?;
    let summary = recover(
        state.service.chart_summary(schema, def, &predicate).await,
        || Some(zero_metrics(def.summary)),
    )?;

    Ok(Json(DashboardChartResponse {
        success: true,
        data,
        summary,
    }))
}

/// Average days per process stage, one row per stage in pipeline order
async fn days_by_stage(
    service: &AggregationService,
    predicate: &Predicate,
) -> QueryResult<Vec<Record>> {
    let metrics: Vec<Metric> = compras::STAGES.iter().map(|(_, metric)| *metric).collect();
    let averages = service
        .metrics(&datasets::TRAZA, &metrics, predicate)
        .await?;
    Ok(stage_rows(&averages))
}

fn stage_rows(averages: &Record) -> Vec<Record> {
    compras::STAGES
        .iter()
        .map(|(label, metric)| {
            let days = averages
                .get(metric.name)
                .cloned()
                .unwrap_or(Value::from(0.0));
            Record::new()
                .with("stage", Value::from(*label))
                .with("days", days)
        })
        .collect()
}
