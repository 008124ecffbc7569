//! Filter predicate building and schema-driven aggregation
//!
//! Request filters flow through [`filters`] (normalization), become a typed
//! [`Predicate`](predicate::Predicate), and the [`AggregationService`]
//! composes the dataset's queries around it.

pub mod filters;
pub mod predicate;
pub mod schema;
pub mod service;

pub use filters::{split_list, DashboardFilters, FilterValues};
pub use predicate::{Clause, Predicate};
pub use schema::{
    ChartDef, Condition, DatasetSchema, DateFilter, FilterColumn, FilterRole, GroupKey, Measure,
    Metric, MetricKind, SeriesOrder,
};
pub use service::{
    empty_filter_options, recover, zero_metrics, AggregationService, DataPage, QueryLimits,
};
