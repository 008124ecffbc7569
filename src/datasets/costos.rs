//! Monthly costs (`costos_mensuales`)

use crate::query::{
    ChartDef, DatasetSchema, DateFilter, FilterColumn, GroupKey, Measure, Metric, SeriesOrder,
};

const TOTAL_NETO: &[Metric] = &[Metric::aggregate("total", Measure::Sum("neto"))];

pub static COSTOS: DatasetSchema = DatasetSchema {
    route: "costos",
    table: "costos_mensuales",
    date_filter: Some(DateFilter::Range("fecha")),
    filters: &[
        FilterColumn::new("catalogos", "catalogo"),
        FilterColumn::new("ciudades", "ciudad"),
        FilterColumn::new("terceros", "tercero"),
    ],
    data_order: Some("fecha DESC"),
    default_data_limit: 50_000,
    metrics: &[
        Metric::aggregate("costo_total", Measure::Sum("neto")),
        Metric::aggregate("registros", Measure::Count),
        Metric::aggregate("terceros_unicos", Measure::CountDistinct("tercero")),
        Metric::aggregate("catalogos_unicos", Measure::CountDistinct("catalogo")),
        Metric::aggregate("meses", Measure::DistinctMonths("fecha")),
        Metric::ratio("promedio_mensual", "costo_total", "meses", 2),
    ],
    charts: &[
        ChartDef {
            dimension: "mensual",
            key: GroupKey::Month("fecha"),
            key_label: "mes",
            measures: TOTAL_NETO,
            order: SeriesOrder::KeyAsc,
            ..ChartDef::BASE
        },
        ChartDef {
            dimension: "catalogo",
            key: GroupKey::Column("catalogo"),
            key_label: "catalogo",
            measures: TOTAL_NETO,
            ..ChartDef::BASE
        },
        ChartDef {
            dimension: "ciudad",
            key: GroupKey::Column("ciudad"),
            key_label: "ciudad",
            measures: TOTAL_NETO,
            default_limit: Some(10),
            ..ChartDef::BASE
        },
        ChartDef {
            dimension: "tercero",
            key: GroupKey::Column("tercero"),
            key_label: "tercero",
            measures: TOTAL_NETO,
            default_limit: Some(10),
            ..ChartDef::BASE
        },
    ],
};
