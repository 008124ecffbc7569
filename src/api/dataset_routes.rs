//! Generic route group mounted once per dataset
//!
//! Filters arrive as query parameters: `fecha_inicio` / `fecha_fin` plus the
//! dataset's comma-delimited list parameters. Unknown parameters are ignored.

use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::get,
    Router,
};
use std::collections::HashMap;

use crate::database::Record;
use crate::error::ApiResult;
use crate::query::{
    empty_filter_options, recover, zero_metrics, AggregationService, DataPage, DatasetSchema,
    FilterValues,
};

/// Query parameter carrying the row cap for data and chart requests
pub const LIMIT_PARAM: &str = "limit";

#[derive(Clone)]
pub struct DatasetState {
    pub service: AggregationService,
    pub schema: &'static DatasetSchema,
}

pub fn router(service: AggregationService, schema: &'static DatasetSchema) -> Router {
    Router::new()
        .route("/filters", get(get_filters))
        .route("/kpis", get(get_kpis))
        .route("/data", get(get_data))
        .route("/chart/:dimension", get(get_chart))
        .with_state(DatasetState { service, schema })
}

/// `limit` as a positive count; anything unparseable is ignored
pub(crate) fn parse_limit(params: &HashMap<String, String>) -> Option<u32> {
    params
        .get(LIMIT_PARAM)
        .and_then(|raw| raw.trim().parse::<u32>().ok())
}

async fn get_filters(State(state): State<DatasetState>) -> ApiResult<Json<Record>> {
    let options = recover(state.service.filter_options(state.schema).await, || {
        empty_filter_options(state.schema)
    })?;
    Ok(Json(options))
}

async fn get_kpis(
    State(state): State<DatasetState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Record>> {
    let predicate = state.schema.predicate(&FilterValues::from_query(&params));
    let kpis = recover(state.service.kpis(state.schema, &predicate).await, || {
        zero_metrics(state.schema.metrics)
    })?;
    Ok(Json(kpis))
}

async fn get_data(
    State(state): State<DatasetState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<DataPage>> {
    let predicate = state.schema.predicate(&FilterValues::from_query(&params));
    let page = recover(
        state
            .service
            .rows(state.schema, &predicate, parse_limit(&params))
            .await,
        DataPage::default,
    )?;
    Ok(Json(page))
}

async fn get_chart(
    State(state): State<DatasetState>,
    Path(dimension): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Vec<Record>>> {
    let predicate = state.schema.predicate(&FilterValues::from_query(&params));
    let series = recover(
        state
            .service
            .series(state.schema, &dimension, &predicate, parse_limit(&params))
            .await,
        Vec::new,
    )?;
    Ok(Json(series))
}
