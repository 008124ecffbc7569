//! Vehicle fleet operability (`operatividad_vehiculos`)

use crate::query::{
    ChartDef, DatasetSchema, DateFilter, FilterColumn, GroupKey, Measure, Metric, SeriesOrder,
};

/// Scheduled vs operative vehicles with the operating percentage per group
const OPERACION: &[Metric] = &[
    Metric::aggregate("programados", Measure::Sum("vehiculos_programados")),
    Metric::aggregate("operativos", Measure::Sum("vehiculos_operativos")),
    Metric::percent("pct_operacion", "operativos", "programados", 1),
];

pub static OPERATIVIDAD: DatasetSchema = DatasetSchema {
    route: "operatividad",
    table: "operatividad_vehiculos",
    date_filter: Some(DateFilter::Range("fecha_ejecucion")),
    filters: &[
        FilterColumn::new("sedes", "sede"),
        FilterColumn::new("estados", "estado_vehiculo"),
        FilterColumn::new("placas", "placa"),
    ],
    data_order: Some("fecha_ejecucion DESC"),
    default_data_limit: 100_000,
    metrics: &[
        Metric::aggregate("vehiculos_programados", Measure::Sum("vehiculos_programados")),
        Metric::aggregate("vehiculos_operativos", Measure::Sum("vehiculos_operativos")),
        Metric::percent(
            "pct_operacion",
            "vehiculos_operativos",
            "vehiculos_programados",
            1,
        ),
        Metric::aggregate("dias_taller", Measure::Sum("dias_en_taller")),
        Metric::aggregate("placas_unicas", Measure::CountDistinct("placa")),
        Metric::aggregate("estados", Measure::CountDistinct("estado_vehiculo")),
    ],
    charts: &[
        ChartDef {
            dimension: "diario",
            key: GroupKey::Column("fecha_ejecucion"),
            key_label: "fecha",
            measures: OPERACION,
            order: SeriesOrder::KeyAsc,
            ..ChartDef::BASE
        },
        ChartDef {
            dimension: "sede",
            key: GroupKey::Column("sede"),
            key_label: "sede",
            measures: OPERACION,
            order: SeriesOrder::MeasureDesc(1),
            ..ChartDef::BASE
        },
        ChartDef {
            dimension: "estado",
            key: GroupKey::Column("estado_vehiculo"),
            key_label: "estado",
            measures: &[Metric::aggregate("cantidad", Measure::Count)],
            ..ChartDef::BASE
        },
        ChartDef {
            dimension: "taller",
            key: GroupKey::Column("placa"),
            key_label: "placa",
            measures: &[Metric::aggregate("dias", Measure::Sum("dias_en_taller"))],
            default_limit: Some(10),
            positive_only: true,
            ..ChartDef::BASE
        },
    ],
};
