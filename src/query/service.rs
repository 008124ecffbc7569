//! Aggregation query service
//!
//! One generic implementation of filter discovery, KPI sets, raw row pages
//! and grouped series, driven by a [`DatasetSchema`]. Every statement goes
//! through the [`DataGateway`]; nothing is held between calls.

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

use super::predicate::Predicate;
use super::schema::{
    ratio, ChartDef, DatasetSchema, DateFilter, Measure, Metric, MetricKind, SeriesOrder,
};
use crate::database::{DataGateway, Record, SqlQuery};
use crate::error::{QueryError, QueryResult};

/// Size caps applied to every request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryLimits {
    /// Upper bound on `limit` for raw rows and series
    pub max_rows: u32,
    /// Distinct values returned per filter column
    pub filter_options: u32,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            max_rows: 150_000,
            filter_options: 500,
        }
    }
}

/// Raw rows for a table view
#[derive(Debug, Clone, Default, Serialize)]
pub struct DataPage {
    pub data: Vec<Record>,
    pub total: usize,
}

#[derive(Clone)]
pub struct AggregationService {
    gateway: Arc<dyn DataGateway>,
    limits: QueryLimits,
}

impl AggregationService {
    pub fn new(gateway: Arc<dyn DataGateway>) -> Self {
        Self {
            gateway,
            limits: QueryLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: QueryLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn limits(&self) -> QueryLimits {
        self.limits
    }

    async fn fetch(&self, dataset: &str, query: &SqlQuery) -> QueryResult<Vec<Record>> {
        self.gateway
            .fetch_records(query)
            .await
            .map_err(|e| QueryError::from_gateway(dataset, e))
    }

    /// Distinct non-null values of each filter column (capped), plus the
    /// bounds of the primary date column.
    pub async fn filter_options(&self, schema: &DatasetSchema) -> QueryResult<Record> {
        let mut options = Record::new();

        for filter in schema.filters {
            let mut query = SqlQuery::new(format!(
                "SELECT DISTINCT {col} AS value FROM {table} WHERE {col} IS NOT NULL ORDER BY {col} LIMIT ",
                col = filter.column,
                table = schema.table,
            ));
            query.push_bind(i64::from(self.limits.filter_options));

            let values = self
                .fetch(schema.route, &query)
                .await?
                .into_iter()
                .filter_map(|row| row.get("value").cloned())
                .collect();
            options.insert(filter.param, Value::Array(values));
        }

        let (date_min, date_max) = match schema.date_filter {
            Some(DateFilter::Range(column)) => {
                let query = SqlQuery::new(format!(
                    "SELECT MIN({col}) AS date_min, MAX({col}) AS date_max FROM {table}",
                    col = column,
                    table = schema.table,
                ));
                let row = self
                    .fetch(schema.route, &query)
                    .await?
                    .into_iter()
                    .next()
                    .unwrap_or_default();
                (
                    row.get("date_min").cloned().unwrap_or(Value::Null),
                    row.get("date_max").cloned().unwrap_or(Value::Null),
                )
            }
            _ => (Value::Null, Value::Null),
        };
        options.insert("date_min", date_min);
        options.insert("date_max", date_max);

        Ok(options)
    }

    /// The dataset's declared KPI set
    pub async fn kpis(&self, schema: &DatasetSchema, predicate: &Predicate) -> QueryResult<Record> {
        self.metrics(schema, schema.metrics, predicate).await
    }

    /// Compute an arbitrary metric list over the filtered rows in one statement
    pub async fn metrics(
        &self,
        schema: &DatasetSchema,
        metrics: &[Metric],
        predicate: &Predicate,
    ) -> QueryResult<Record> {
        let aggregates: Vec<&Measure> = metrics
            .iter()
            .filter_map(|m| match &m.kind {
                MetricKind::Aggregate(measure) => Some(measure),
                MetricKind::Ratio { .. } => None,
            })
            .collect();

        let raw = if aggregates.is_empty() {
            Record::new()
        } else {
            let mut query = SqlQuery::new("SELECT ");
            for (idx, measure) in aggregates.iter().enumerate() {
                if idx > 0 {
                    query.push(", ");
                }
                measure.render(&mut query);
                query.push(&format!(" AS {}", alias(idx)));
            }
            query.push(&format!(" FROM {} WHERE ", schema.table));
            let (sql, params) = predicate.render();
            query.push_fragment(&sql, params);

            self.fetch(schema.route, &query)
                .await?
                .into_iter()
                .next()
                .unwrap_or_default()
        };

        let mut out = Record::new();
        shape_metrics(metrics, &raw, &mut out);
        Ok(out)
    }

    /// Raw rows, newest first where the schema says so, capped at `max_rows`
    pub async fn rows(
        &self,
        schema: &DatasetSchema,
        predicate: &Predicate,
        limit: Option<u32>,
    ) -> QueryResult<DataPage> {
        let limit = limit
            .unwrap_or(schema.default_data_limit)
            .min(self.limits.max_rows);

        let mut query = SqlQuery::new(format!("SELECT * FROM {} WHERE ", schema.table));
        let (sql, params) = predicate.render();
        query.push_fragment(&sql, params);
        if let Some(order) = schema.data_order {
            query.push(" ORDER BY ").push(order);
        }
        query.push(" LIMIT ").push_bind(i64::from(limit));

        let data = self.fetch(schema.route, &query).await?;
        Ok(DataPage {
            total: data.len(),
            data,
        })
    }

    /// Grouped series for a named chart dimension
    pub async fn series(
        &self,
        schema: &DatasetSchema,
        dimension: &str,
        predicate: &Predicate,
        limit: Option<u32>,
    ) -> QueryResult<Vec<Record>> {
        let chart = schema
            .chart(dimension)
            .ok_or_else(|| QueryError::UnknownDimension {
                dataset: schema.route.to_string(),
                dimension: dimension.to_string(),
            })?;
        self.chart_series(schema, chart, predicate, limit).await
    }

    pub async fn chart_series(
        &self,
        schema: &DatasetSchema,
        chart: &ChartDef,
        predicate: &Predicate,
        limit: Option<u32>,
    ) -> QueryResult<Vec<Record>> {
        let predicate = predicate.and(chart.conditions.iter().map(|c| c.to_clause()));
        let key_expr = chart.key.expression();

        let mut query = SqlQuery::new(format!("SELECT {} AS group_key", key_expr));
        for (idx, measure) in chart.aggregates() {
            query.push(", ");
            measure.render(&mut query);
            query.push(&format!(" AS {}", alias(idx)));
        }
        query.push(&format!(" FROM {} WHERE ", schema.table));
        let (sql, params) = predicate.render();
        query.push_fragment(&sql, params);
        query.push(" GROUP BY ").push(&key_expr);

        if chart.positive_only {
            if let Some((_, measure)) = chart.aggregates().next() {
                query.push(" HAVING ");
                measure.render(&mut query);
                query.push(" > 0");
            }
        }

        match chart.order {
            SeriesOrder::MeasureDesc(idx) => {
                query.push(&format!(" ORDER BY {} DESC, group_key ASC", alias(idx)));
            }
            SeriesOrder::KeyAsc => {
                query.push(" ORDER BY group_key ASC");
            }
            SeriesOrder::LatestKeys => {
                query.push(" ORDER BY group_key DESC");
            }
        }

        if let Some(limit) = limit.or(chart.default_limit) {
            query
                .push(" LIMIT ")
                .push_bind(i64::from(limit.min(self.limits.max_rows)));
        }

        let rows = self.fetch(schema.route, &query).await?;
        let mut series: Vec<Record> = rows
            .iter()
            .map(|raw| {
                let key = raw.get("group_key").cloned().unwrap_or(Value::Null);
                let mut out = Record::new().with(chart.key_label, key);
                shape_metrics(chart.measures, raw, &mut out);
                out
            })
            .collect();

        if chart.order == SeriesOrder::LatestKeys {
            series.reverse();
        }

        if let Some((measure_name, label)) = chart.share_of_total {
            let total = self
                .grand_total(schema, chart, measure_name, &predicate)
                .await?;
            for row in &mut series {
                let share = ratio(row.number(measure_name), total, 100.0, 2);
                row.insert(label, Value::from(share));
            }
        }

        Ok(series)
    }

    /// The chart's summary scalars, or `None` when it declares none
    pub async fn chart_summary(
        &self,
        schema: &DatasetSchema,
        chart: &ChartDef,
        predicate: &Predicate,
    ) -> QueryResult<Option<Record>> {
        if chart.summary.is_empty() {
            return Ok(None);
        }
        self.metrics(schema, chart.summary, predicate).await.map(Some)
    }

    async fn grand_total(
        &self,
        schema: &DatasetSchema,
        chart: &ChartDef,
        measure_name: &str,
        predicate: &Predicate,
    ) -> QueryResult<f64> {
        let measure = chart.measures.iter().find_map(|m| match m.kind {
            MetricKind::Aggregate(measure) if m.name == measure_name => Some(measure),
            _ => None,
        });
        let Some(measure) = measure else {
            return Ok(0.0);
        };

        let mut query = SqlQuery::new("SELECT ");
        measure.render(&mut query);
        query.push(&format!(" AS total FROM {} WHERE ", schema.table));
        let (sql, params) = predicate.render();
        query.push_fragment(&sql, params);

        Ok(self
            .fetch(schema.route, &query)
            .await?
            .first()
            .map(|row| row.number("total"))
            .unwrap_or(0.0))
    }

    /// Row count of a table, for load checks
    pub async fn row_count(&self, schema: &DatasetSchema) -> QueryResult<i64> {
        let query = SqlQuery::new(format!("SELECT COUNT(*) AS n FROM {}", schema.table));
        Ok(self
            .fetch(schema.route, &query)
            .await?
            .first()
            .and_then(|row| row.get("n"))
            .and_then(Value::as_i64)
            .unwrap_or(0))
    }
}

fn alias(idx: usize) -> String {
    format!("m{}", idx)
}

/// Turn aliased aggregates (`m0`, `m1`, ...) into named metric values,
/// computing ratios from the values already placed in `out`.
fn shape_metrics(metrics: &[Metric], raw: &Record, out: &mut Record) {
    let mut next_aggregate = 0;
    for metric in metrics {
        match metric.kind {
            MetricKind::Aggregate(measure) => {
                let value = measure.finish(raw.get(&alias(next_aggregate)));
                next_aggregate += 1;
                out.insert(metric.name, value);
            }
            MetricKind::Ratio {
                numerator,
                denominator,
                scale,
                precision,
            } => {
                let value = ratio(
                    out.number(numerator),
                    out.number(denominator),
                    scale,
                    precision,
                );
                out.insert(metric.name, Value::from(value));
            }
        }
    }
}

/// The all-zero KPI set served when a dataset is unavailable
pub fn zero_metrics(metrics: &[Metric]) -> Record {
    let mut out = Record::new();
    shape_metrics(metrics, &Record::new(), &mut out);
    out
}

/// Empty filter discovery output for an unavailable dataset
pub fn empty_filter_options(schema: &DatasetSchema) -> Record {
    let mut options = Record::new();
    for filter in schema.filters {
        options.insert(filter.param, Value::Array(Vec::new()));
    }
    options.insert("date_min", Value::Null);
    options.insert("date_max", Value::Null);
    options
}

/// Degrade a recoverable failure to `fallback` (logged); connection
/// failures and unknown dimensions pass through.
pub fn recover<T>(result: QueryResult<T>, fallback: impl FnOnce() -> T) -> QueryResult<T> {
    match result {
        Err(e) if e.is_recoverable() => {
            warn!(error = %e, "data unavailable, serving empty result");
            Ok(fallback())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_support::{exec, memory_pool};
    use crate::database::SqliteGateway;
    use crate::query::filters::FilterValues;
    use crate::query::schema::{Condition, FilterColumn, GroupKey};
    use serde_json::json;

    const METRICS: &[Metric] = &[
        Metric::aggregate("registros", Measure::Count),
        Metric::aggregate("total", Measure::Sum("monto")),
        Metric::aggregate(
            "promedio",
            Measure::Avg {
                column: "monto",
                precision: 1,
            },
        ),
        Metric::aggregate("operativos", Measure::Sum("operativos")),
        Metric::percent("pct", "operativos", "total", 1),
    ];

    const CHARTS: &[ChartDef] = &[
        ChartDef {
            dimension: "sede",
            key: GroupKey::Column("sede"),
            key_label: "sede",
            measures: &[Metric::aggregate("total", Measure::Sum("monto"))],
            ..ChartDef::BASE
        },
        ChartDef {
            dimension: "mensual",
            key: GroupKey::Month("fecha"),
            key_label: "mes",
            measures: &[Metric::aggregate("cantidad", Measure::Count)],
            order: SeriesOrder::LatestKeys,
            default_limit: Some(2),
            ..ChartDef::BASE
        },
        ChartDef {
            dimension: "participacion",
            key: GroupKey::Column("sede"),
            key_label: "sede",
            measures: &[Metric::aggregate("total", Measure::Sum("monto"))],
            conditions: &[Condition::NotNull("sede")],
            default_limit: Some(1),
            share_of_total: Some(("total", "pct")),
            ..ChartDef::BASE
        },
        ChartDef {
            dimension: "positivos",
            key: GroupKey::Column("sede"),
            key_label: "sede",
            measures: &[Metric::aggregate("total", Measure::Sum("monto"))],
            positive_only: true,
            ..ChartDef::BASE
        },
    ];

    const SCHEMA: DatasetSchema = DatasetSchema {
        route: "prueba",
        table: "prueba",
        date_filter: Some(DateFilter::Range("fecha")),
        filters: &[FilterColumn::new("sedes", "sede")],
        data_order: Some("fecha DESC"),
        default_data_limit: 2,
        metrics: METRICS,
        charts: CHARTS,
    };

    async fn service(seed: &str) -> AggregationService {
        let pool = memory_pool().await;
        exec(
            &pool,
            "CREATE TABLE prueba (fecha TEXT, sede TEXT, monto REAL, operativos INTEGER);",
        )
        .await;
        if !seed.is_empty() {
            exec(&pool, seed).await;
        }
        AggregationService::new(Arc::new(SqliteGateway::new(pool)))
    }

    #[tokio::test]
    async fn test_avg_excludes_nulls_sum_treats_null_as_zero() {
        let svc = service(
            "INSERT INTO prueba VALUES
                ('2025-01-05', 'A', 10, NULL),
                ('2025-01-06', 'A', NULL, NULL),
                ('2025-01-07', 'B', 20, NULL);",
        )
        .await;

        let kpis = svc.kpis(&SCHEMA, &Predicate::new()).await.unwrap();
        assert_eq!(kpis.get("registros"), Some(&json!(3)));
        assert_eq!(kpis.number("total"), 30.0);
        assert_eq!(kpis.get("promedio"), Some(&json!(15.0)));
        assert_eq!(kpis.get("operativos"), Some(&json!(0)));
    }

    #[tokio::test]
    async fn test_ratio_with_zero_denominator_is_zero() {
        let svc = service("").await;
        let kpis = svc.kpis(&SCHEMA, &Predicate::new()).await.unwrap();
        assert_eq!(kpis.get("pct"), Some(&json!(0.0)));
        assert_eq!(kpis.get("total"), Some(&json!(0)));
        assert_eq!(kpis.get("promedio"), Some(&json!(0.0)));
    }

    #[tokio::test]
    async fn test_kpis_respect_month_range() {
        let svc = service(
            "INSERT INTO prueba VALUES
                ('2024-12-31', 'A', 1, 0),
                ('2025-01-01', 'A', 2, 0),
                ('2025-02-28', 'B', 4, 0),
                ('2025-03-01', 'B', 8, 0);",
        )
        .await;

        let values = FilterValues::default().with_dates(Some("2025-01"), Some("2025-02"));
        let kpis = svc
            .kpis(&SCHEMA, &SCHEMA.predicate(&values))
            .await
            .unwrap();
        assert_eq!(kpis.get("registros"), Some(&json!(2)));
        assert_eq!(kpis.number("total"), 6.0);
    }

    #[tokio::test]
    async fn test_month_range_keeps_timestamps_on_last_day() {
        let svc = service(
            "INSERT INTO prueba VALUES
                ('2025-01-01 00:00:00', 'A', 1, 0),
                ('2025-02-28 00:00:00', 'A', 2, 0),
                ('2025-02-28 23:59:59', 'B', 4, 0),
                ('2025-03-01 00:00:00', 'B', 8, 0);",
        )
        .await;

        let values = FilterValues::default().with_dates(Some("2025-01"), Some("2025-02"));
        let kpis = svc
            .kpis(&SCHEMA, &SCHEMA.predicate(&values))
            .await
            .unwrap();
        assert_eq!(kpis.get("registros"), Some(&json!(3)));
        assert_eq!(kpis.number("total"), 7.0);
    }

    #[tokio::test]
    async fn test_top_n_orders_desc_with_key_tiebreak() {
        let svc = service(
            "INSERT INTO prueba VALUES
                ('2025-01-01', 'D', 1, 0),
                ('2025-01-01', 'C', 3, 0),
                ('2025-01-01', 'A', 5, 0),
                ('2025-01-01', 'B', 3, 0);",
        )
        .await;

        let series = svc
            .series(&SCHEMA, "sede", &Predicate::new(), Some(3))
            .await
            .unwrap();
        let keys: Vec<_> = series.iter().map(|r| r.get("sede").cloned()).collect();
        assert_eq!(
            keys,
            vec![Some(json!("A")), Some(json!("B")), Some(json!("C"))]
        );
        assert_eq!(series[0].number("total"), 5.0);
    }

    #[tokio::test]
    async fn test_latest_keys_returned_oldest_first() {
        let svc = service(
            "INSERT INTO prueba VALUES
                ('2025-01-10', 'A', 1, 0),
                ('2025-02-10', 'A', 1, 0),
                ('2025-03-10', 'A', 1, 0),
                ('2025-03-11', 'A', 1, 0);",
        )
        .await;

        let series = svc
            .series(&SCHEMA, "mensual", &Predicate::new(), None)
            .await
            .unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].get("mes"), Some(&json!("2025-02")));
        assert_eq!(series[1].get("mes"), Some(&json!("2025-03")));
        assert_eq!(series[1].get("cantidad"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn test_share_of_total_uses_all_groups() {
        let svc = service(
            "INSERT INTO prueba VALUES
                ('2025-01-01', 'A', 30, 0),
                ('2025-01-01', 'B', 10, 0),
                ('2025-01-01', NULL, 99, 0);",
        )
        .await;

        let series = svc
            .series(&SCHEMA, "participacion", &Predicate::new(), None)
            .await
            .unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].get("pct"), Some(&json!(75.0)));
    }

    #[tokio::test]
    async fn test_positive_only_drops_empty_groups() {
        let svc = service(
            "INSERT INTO prueba VALUES
                ('2025-01-01', 'A', 0, 0),
                ('2025-01-01', 'B', 4, 0);",
        )
        .await;

        let series = svc
            .series(&SCHEMA, "positivos", &Predicate::new(), None)
            .await
            .unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].get("sede"), Some(&json!("B")));
    }

    #[tokio::test]
    async fn test_rows_respect_limit_and_order() {
        let svc = service(
            "INSERT INTO prueba VALUES
                ('2025-01-01', 'A', 1, 0),
                ('2025-01-03', 'A', 1, 0),
                ('2025-01-02', 'A', 1, 0);",
        )
        .await;

        let page = svc.rows(&SCHEMA, &Predicate::new(), None).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.data[0].get("fecha"), Some(&json!("2025-01-03")));

        let svc = svc.with_limits(QueryLimits {
            max_rows: 1,
            filter_options: 500,
        });
        let page = svc.rows(&SCHEMA, &Predicate::new(), Some(50)).await.unwrap();
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn test_filter_options_distinct_sorted_capped() {
        let svc = service(
            "INSERT INTO prueba VALUES
                ('2025-01-09', 'B', 1, 0),
                ('2025-01-02', NULL, 1, 0),
                ('2025-03-01', 'A', 1, 0),
                ('2025-01-04', 'B', 1, 0),
                (NULL, 'C', 1, 0);",
        )
        .await
        .with_limits(QueryLimits {
            max_rows: 10,
            filter_options: 2,
        });

        let options = svc.filter_options(&SCHEMA).await.unwrap();
        assert_eq!(options.get("sedes"), Some(&json!(["A", "B"])));
        assert_eq!(options.get("date_min"), Some(&json!("2025-01-02")));
        assert_eq!(options.get("date_max"), Some(&json!("2025-03-01")));
    }

    #[tokio::test]
    async fn test_unknown_dimension() {
        let svc = service("").await;
        let err = svc
            .series(&SCHEMA, "planeta", &Predicate::new(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::UnknownDimension { .. }));
        assert!(!err.is_recoverable());
    }

    #[tokio::test]
    async fn test_missing_table_recovers_to_fallback() {
        let svc = AggregationService::new(Arc::new(SqliteGateway::new(memory_pool().await)));

        let err = svc.kpis(&SCHEMA, &Predicate::new()).await.unwrap_err();
        assert!(err.is_recoverable());

        let kpis = recover(svc.kpis(&SCHEMA, &Predicate::new()).await, || {
            zero_metrics(SCHEMA.metrics)
        })
        .unwrap();
        assert_eq!(kpis.get("registros"), Some(&json!(0)));
        assert_eq!(kpis.len(), METRICS.len());

        let options = recover(svc.filter_options(&SCHEMA).await, || {
            empty_filter_options(&SCHEMA)
        })
        .unwrap();
        assert_eq!(options.get("sedes"), Some(&json!([])));
        assert_eq!(options.get("date_min"), Some(&Value::Null));
    }
}
