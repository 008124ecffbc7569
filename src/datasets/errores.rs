//! Warehouse movement error log (`errores`)
//!
//! Rows carry a Spanish month name instead of a date, so the date range
//! filter compiles to a set of month names.

use crate::query::{
    ChartDef, DatasetSchema, DateFilter, FilterColumn, GroupKey, Measure, Metric, SeriesOrder,
};

pub static ERRORES: DatasetSchema = DatasetSchema {
    route: "errores",
    table: "errores",
    date_filter: Some(DateFilter::MonthName("mes")),
    filters: &[
        FilterColumn::new("sedes", "sede"),
        FilterColumn::new("errores", "error"),
    ],
    data_order: None,
    default_data_limit: 100_000,
    metrics: &[
        Metric::aggregate("total_registros", Measure::Count),
        Metric::aggregate(
            "total_errores_si",
            Measure::CountWhere {
                column: "error",
                equals: "Si",
            },
        ),
        Metric::aggregate(
            "total_revisar",
            Measure::CountWhere {
                column: "error",
                equals: "Revisar",
            },
        ),
        Metric::aggregate(
            "total_sin_error",
            Measure::CountWhere {
                column: "error",
                equals: "No",
            },
        ),
        Metric::aggregate("valor_total", Measure::Sum("total")),
    ],
    charts: &[
        ChartDef {
            dimension: "por-error",
            key: GroupKey::Column("error"),
            key_label: "error",
            measures: &[Metric::aggregate("cantidad", Measure::Count)],
            ..ChartDef::BASE
        },
        ChartDef {
            dimension: "por-sede",
            key: GroupKey::Column("sede"),
            key_label: "sede",
            measures: &[
                Metric::aggregate(
                    "sin_error",
                    Measure::CountWhere {
                        column: "error",
                        equals: "No",
                    },
                ),
                Metric::aggregate(
                    "revisar",
                    Measure::CountWhere {
                        column: "error",
                        equals: "Revisar",
                    },
                ),
                Metric::aggregate(
                    "con_error",
                    Measure::CountWhere {
                        column: "error",
                        equals: "Si",
                    },
                ),
            ],
            order: SeriesOrder::KeyAsc,
            ..ChartDef::BASE
        },
    ],
};
