//! Declarative dataset schemas
//!
//! A [`DatasetSchema`] says everything the aggregation service needs to know
//! about one table: which columns filter, which metrics make up its KPI set
//! and which grouped series it can chart. All names are `&'static str`, so
//! nothing that reaches SQL text comes from a request.

use serde_json::Value;

use super::filters::{format_date, month_names_between, FilterValues, DashboardFilters};
use super::predicate::{Clause, Predicate};
use crate::database::SqlQuery;

/// How the request's date range applies to a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFilter {
    /// Range comparison on an ISO date column
    Range(&'static str),
    /// Column holding Spanish month names; the range becomes a set of names
    MonthName(&'static str),
}

/// Which dashboard-wide filter a column answers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterRole {
    Supplier,
    State,
    Process,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterColumn {
    /// Query parameter name, also the key in filter discovery output
    pub param: &'static str,
    pub column: &'static str,
    pub role: Option<FilterRole>,
}

impl FilterColumn {
    pub const fn new(param: &'static str, column: &'static str) -> Self {
        Self {
            param,
            column,
            role: None,
        }
    }

    pub const fn with_role(param: &'static str, column: &'static str, role: FilterRole) -> Self {
        Self {
            param,
            column,
            role: Some(role),
        }
    }
}

/// A SQL aggregate over the filtered rows
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Measure {
    Count,
    /// Rows where `column` is not NULL
    CountPresent(&'static str),
    CountDistinct(&'static str),
    /// Rows where `column = equals`
    CountWhere {
        column: &'static str,
        equals: &'static str,
    },
    /// Rows where `column LIKE pattern`
    CountLike {
        column: &'static str,
        pattern: &'static str,
    },
    /// Sum with NULL read as zero
    Sum(&'static str),
    /// Mean over non-NULL rows, rounded
    Avg {
        column: &'static str,
        precision: u32,
    },
    /// Number of distinct year-months in a date column
    DistinctMonths(&'static str),
}

impl Measure {
    /// Append this aggregate's SQL expression to `query`
    pub(crate) fn render(&self, query: &mut SqlQuery) {
        match *self {
            Measure::Count => {
                query.push("COUNT(*)");
            }
            Measure::CountPresent(column) => {
                query.push(&format!("COUNT({})", column));
            }
            Measure::CountDistinct(column) => {
                query.push(&format!("COUNT(DISTINCT {})", column));
            }
            Measure::CountWhere { column, equals } => {
                query.push(&format!("COALESCE(SUM(CASE WHEN {} = ", column));
                query.push_bind(equals).push(" THEN 1 ELSE 0 END), 0)");
            }
            Measure::CountLike { column, pattern } => {
                query.push(&format!("COALESCE(SUM(CASE WHEN {} LIKE ", column));
                query.push_bind(pattern).push(" THEN 1 ELSE 0 END), 0)");
            }
            Measure::Sum(column) => {
                query.push(&format!("COALESCE(SUM({}), 0)", column));
            }
            Measure::Avg { column, .. } => {
                query.push(&format!("AVG({})", column));
            }
            Measure::DistinctMonths(column) => {
                query.push(&format!("COUNT(DISTINCT strftime('%Y-%m', {}))", column));
            }
        }
    }

    /// Shape a raw aggregate into its response value: NULL becomes 0,
    /// averages are rounded.
    pub(crate) fn finish(&self, raw: Option<&Value>) -> Value {
        match (self, raw) {
            (Measure::Avg { precision, .. }, Some(v)) => {
                Value::from(round_to(v.as_f64().unwrap_or(0.0), *precision))
            }
            (Measure::Avg { .. }, None) => Value::from(0.0),
            (_, Some(Value::Null)) | (_, None) => Value::from(0),
            (_, Some(v)) => v.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricKind {
    Aggregate(Measure),
    /// `numerator / denominator * scale`, both naming earlier metrics of the
    /// same set; a zero denominator yields 0.
    Ratio {
        numerator: &'static str,
        denominator: &'static str,
        scale: f64,
        precision: u32,
    },
}

/// A named scalar in a KPI set or a series row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metric {
    pub name: &'static str,
    pub kind: MetricKind,
}

impl Metric {
    pub const fn aggregate(name: &'static str, measure: Measure) -> Self {
        Self {
            name,
            kind: MetricKind::Aggregate(measure),
        }
    }

    pub const fn percent(
        name: &'static str,
        numerator: &'static str,
        denominator: &'static str,
        precision: u32,
    ) -> Self {
        Self {
            name,
            kind: MetricKind::Ratio {
                numerator,
                denominator,
                scale: 100.0,
                precision,
            },
        }
    }

    pub const fn ratio(
        name: &'static str,
        numerator: &'static str,
        denominator: &'static str,
        precision: u32,
    ) -> Self {
        Self {
            name,
            kind: MetricKind::Ratio {
                numerator,
                denominator,
                scale: 1.0,
                precision,
            },
        }
    }
}

/// Fixed condition attached to a chart definition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    NotNull(&'static str),
    Like(&'static str, &'static str),
    Equals(&'static str, &'static str),
}

impl Condition {
    pub fn to_clause(self) -> Clause {
        match self {
            Condition::NotNull(column) => Clause::NotNull { column },
            Condition::Like(column, pattern) => Clause::Like { column, pattern },
            Condition::Equals(column, value) => Clause::Equals { column, value },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKey {
    Column(&'static str),
    /// `YYYY-MM` truncation of a date column
    Month(&'static str),
}

impl GroupKey {
    pub(crate) fn expression(&self) -> String {
        match self {
            GroupKey::Column(column) => column.to_string(),
            GroupKey::Month(column) => format!("strftime('%Y-%m', {})", column),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesOrder {
    /// Aggregate at this measure index, descending; key ascending breaks ties
    MeasureDesc(usize),
    KeyAsc,
    /// The newest `limit` keys, returned oldest first
    LatestKeys,
}

/// A grouped series over one dimension
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartDef {
    /// Path segment under `/chart/`
    pub dimension: &'static str,
    pub key: GroupKey,
    /// Field name of the group key in each output row
    pub key_label: &'static str,
    pub measures: &'static [Metric],
    pub conditions: &'static [Condition],
    pub order: SeriesOrder,
    pub default_limit: Option<u32>,
    /// Drop groups whose first measure is not positive
    pub positive_only: bool,
    /// Add `<label>` = share of the grand total of the named measure, in percent
    pub share_of_total: Option<(&'static str, &'static str)>,
    /// Scalars reported beside the series, over the request predicate
    /// without this chart's conditions
    pub summary: &'static [Metric],
}

impl ChartDef {
    pub const BASE: ChartDef = ChartDef {
        dimension: "",
        key: GroupKey::Column(""),
        key_label: "",
        measures: &[],
        conditions: &[],
        order: SeriesOrder::MeasureDesc(0),
        default_limit: None,
        positive_only: false,
        share_of_total: None,
        summary: &[],
    };

    /// SQL aggregates of this chart with their select-list index; ratios are
    /// skipped. `MeasureDesc` and `positive_only` refer to these indexes.
    pub(crate) fn aggregates(&self) -> impl Iterator<Item = (usize, &Measure)> {
        self.measures
            .iter()
            .filter_map(|m| match &m.kind {
                MetricKind::Aggregate(measure) => Some(measure),
                MetricKind::Ratio { .. } => None,
            })
            .enumerate()
    }
}

/// Everything the aggregation service knows about one table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DatasetSchema {
    /// Route key under `/api/`, e.g. `costos` or `compras/traza`
    pub route: &'static str,
    pub table: &'static str,
    pub date_filter: Option<DateFilter>,
    pub filters: &'static [FilterColumn],
    /// `ORDER BY` text for raw rows
    pub data_order: Option<&'static str>,
    pub default_data_limit: u32,
    pub metrics: &'static [Metric],
    pub charts: &'static [ChartDef],
}

impl DatasetSchema {
    pub fn chart(&self, dimension: &str) -> Option<&ChartDef> {
        self.charts.iter().find(|c| c.dimension == dimension)
    }

    /// Predicate for query-string filters: date first, then each filter
    /// column in declaration order.
    pub fn predicate(&self, values: &FilterValues) -> Predicate {
        let mut predicate = Predicate::new();
        if let Some(clause) = self.date_clause(values) {
            predicate.push(clause);
        }
        for filter in self.filters {
            predicate.push(Clause::Set {
                column: filter.column,
                values: values.list(filter.param).to_vec(),
            });
        }
        predicate
    }

    /// Predicate for the dashboard-wide body filters, mapped onto this
    /// dataset's columns by role.
    pub fn dashboard_predicate(&self, filters: &DashboardFilters) -> Predicate {
        let mut values = FilterValues::default()
            .with_dates(filters.date_start.as_deref(), filters.date_end.as_deref());
        for filter in self.filters {
            let items = match filter.role {
                Some(FilterRole::Supplier) => filters.suppliers.as_deref(),
                Some(FilterRole::State) => filters.states.as_deref(),
                Some(FilterRole::Process) => filters.processes.as_deref(),
                None => None,
            };
            if let Some(items) = items {
                values = values.with_items(filter.param, items);
            }
        }
        self.predicate(&values)
    }

    fn date_clause(&self, values: &FilterValues) -> Option<Clause> {
        match self.date_filter? {
            // Stored values may be `YYYY-MM-DD HH:MM:SS`; bounding by the
            // following day keeps every row of the last day.
            DateFilter::Range(column) => Some(Clause::Range {
                column,
                start: values.start_date().map(format_date),
                end: values
                    .end_date()
                    .and_then(|end| end.succ_opt())
                    .map(format_date),
            }),
            DateFilter::MonthName(column) => Some(Clause::Set {
                column,
                values: month_names_between(values.start_date(), values.end_date()),
            }),
        }
    }
}

pub fn round_to(value: f64, precision: u32) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let factor = 10f64.powi(precision as i32);
    (value * factor).round() / factor
}

/// Guarded ratio: 0 when the denominator is 0 (or the result is not finite)
pub fn ratio(numerator: f64, denominator: f64, scale: f64, precision: u32) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    round_to(numerator / denominator * scale, precision)
}
