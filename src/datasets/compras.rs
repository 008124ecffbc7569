//! Procurement tables: requisition-to-order trace, order discounts and
//! generated purchase orders, plus the dashboard-wide metric sets that
//! combine them.

use crate::query::{
    ChartDef, Condition, DatasetSchema, DateFilter, FilterColumn, FilterRole, GroupKey, Measure,
    Metric, SeriesOrder,
};

const fn avg(name: &'static str, column: &'static str, precision: u32) -> Metric {
    Metric::aggregate(name, Measure::Avg { column, precision })
}

const CANTIDAD: &[Metric] = &[Metric::aggregate("cantidad", Measure::Count)];

pub static TRAZA: DatasetSchema = DatasetSchema {
    route: "compras/traza",
    table: "traza_req_oc",
    date_filter: Some(DateFilter::Range("req_fecha")),
    filters: &[
        FilterColumn::new("estados_req", "req_estado"),
        FilterColumn::with_role("estados_oc", "oc_estado", FilterRole::State),
        FilterColumn::with_role("terceros", "oc_tercero_nombre", FilterRole::Supplier),
    ],
    data_order: Some("req_fecha DESC"),
    default_data_limit: 100_000,
    metrics: &[
        Metric::aggregate("total_registros", Measure::Count),
        Metric::aggregate("requisiciones", Measure::CountDistinct("req_numero")),
        Metric::aggregate("ordenes_compra", Measure::CountDistinct("oc_numero")),
        avg("dias_promedio_aprobar", "dias_aprobar_rq", 1),
        avg("dias_promedio_generar_oc", "dias_generar_oc", 1),
    ],
    charts: &[
        ChartDef {
            dimension: "avg-approval-days",
            key: GroupKey::Column("req_usuario_autorizador"),
            key_label: "aprobador",
            measures: &[avg("promedio", "dias_aprobar_rq", 1)],
            conditions: &[
                Condition::NotNull("req_usuario_autorizador"),
                Condition::NotNull("dias_aprobar_rq"),
            ],
            default_limit: Some(10),
            ..ChartDef::BASE
        },
        ChartDef {
            dimension: "avg-generation-days",
            key: GroupKey::Column("oc_usuario"),
            key_label: "usuario",
            measures: &[avg("promedio", "dias_generar_oc", 1)],
            conditions: &[
                Condition::NotNull("oc_usuario"),
                Condition::NotNull("dias_generar_oc"),
            ],
            default_limit: Some(10),
            ..ChartDef::BASE
        },
        ChartDef {
            dimension: "avg-approval-management-days",
            key: GroupKey::Column("oc_usuario_autorizacion"),
            key_label: "gestor",
            measures: &[avg("promedio", "dias_aprobacion_oc", 1)],
            conditions: &[
                Condition::NotNull("oc_usuario_autorizacion"),
                Condition::NotNull("dias_aprobacion_oc"),
            ],
            default_limit: Some(10),
            ..ChartDef::BASE
        },
        ChartDef {
            dimension: "avg-reception-service-days",
            key: GroupKey::Column("entrega_servicio_usuario"),
            key_label: "usuario",
            measures: &[avg("promedio", "dias_recepcion_servicio", 1)],
            conditions: &[
                Condition::NotNull("entrega_servicio_usuario"),
                Condition::NotNull("dias_recepcion_servicio"),
            ],
            default_limit: Some(10),
            ..ChartDef::BASE
        },
        ChartDef {
            dimension: "avg-warehouse-entry-days",
            key: GroupKey::Column("entrega_almacen_usuario"),
            key_label: "usuario",
            measures: &[avg("promedio", "dias_entrada_almacen", 1)],
            conditions: &[
                Condition::NotNull("entrega_almacen_usuario"),
                Condition::NotNull("dias_entrada_almacen"),
            ],
            default_limit: Some(10),
            ..ChartDef::BASE
        },
        ChartDef {
            dimension: "pending-approve-rq",
            key: GroupKey::Column("req_usuario_autorizador"),
            key_label: "aprobador",
            measures: CANTIDAD,
            conditions: &[
                Condition::Like("req_estado", "%PEND%"),
                Condition::NotNull("req_usuario_autorizador"),
            ],
            default_limit: Some(10),
            ..ChartDef::BASE
        },
        ChartDef {
            dimension: "pending-approve-oc",
            key: GroupKey::Column("oc_usuario_autorizacion"),
            key_label: "gestor",
            measures: CANTIDAD,
            conditions: &[
                Condition::Like("oc_estado", "%PEND%"),
                Condition::NotNull("oc_usuario_autorizacion"),
            ],
            default_limit: Some(10),
            ..ChartDef::BASE
        },
        ChartDef {
            dimension: "oc-by-state",
            key: GroupKey::Column("oc_estado"),
            key_label: "estado",
            measures: CANTIDAD,
            conditions: &[Condition::NotNull("oc_estado")],
            ..ChartDef::BASE
        },
        ChartDef {
            dimension: "trend-oc",
            key: GroupKey::Month("oc_fecha"),
            key_label: "mes",
            measures: &[Metric::aggregate(
                "cantidad",
                Measure::CountDistinct("oc_numero"),
            )],
            conditions: &[Condition::NotNull("oc_fecha")],
            order: SeriesOrder::LatestKeys,
            default_limit: Some(12),
            ..ChartDef::BASE
        },
    ],
};

pub static DESCUENTOS: DatasetSchema = DatasetSchema {
    route: "compras/descuentos",
    table: "oc_descuentos",
    date_filter: Some(DateFilter::Range("fecha")),
    filters: &[
        FilterColumn::with_role("terceros", "tercero_nombre", FilterRole::Supplier),
        FilterColumn::with_role("estados", "estado", FilterRole::State),
        FilterColumn::with_role("procesos", "proceso", FilterRole::Process),
    ],
    data_order: Some("fecha DESC"),
    default_data_limit: 100_000,
    metrics: &[
        Metric::aggregate("total_registros", Measure::Count),
        Metric::aggregate("total_descuentos", Measure::Sum("total_dcto")),
        Metric::aggregate("total_compras", Measure::Sum("total")),
        Metric::aggregate("ordenes_compra", Measure::CountDistinct("documento_num")),
        Metric::aggregate("proveedores", Measure::CountDistinct("tercero_nombre")),
        avg("pct_descuento_promedio", "porcentaje_descuento", 2),
    ],
    charts: &[
        ChartDef {
            dimension: "por-tercero",
            key: GroupKey::Column("tercero_nombre"),
            key_label: "tercero",
            measures: &[
                Metric::aggregate("descuento", Measure::Sum("total_dcto")),
                Metric::aggregate("cantidad", Measure::Count),
            ],
            conditions: &[Condition::NotNull("tercero_nombre")],
            default_limit: Some(15),
            ..ChartDef::BASE
        },
        ChartDef {
            dimension: "oc-vs-items-by-process",
            key: GroupKey::Column("proceso"),
            key_label: "proceso",
            measures: &[
                Metric::aggregate("total_oc", Measure::CountDistinct("documento_num")),
                Metric::aggregate("total_items", Measure::Count),
            ],
            conditions: &[Condition::NotNull("proceso")],
            order: SeriesOrder::MeasureDesc(1),
            default_limit: Some(10),
            summary: &[Metric::aggregate("total", Measure::CountPresent("proceso"))],
            ..ChartDef::BASE
        },
        ChartDef {
            dimension: "percent-discounts-by-process",
            key: GroupKey::Column("proceso"),
            key_label: "proceso",
            measures: &[avg("promedio", "porcentaje_descuento", 2)],
            conditions: &[Condition::NotNull("proceso")],
            default_limit: Some(10),
            summary: &[avg("average", "porcentaje_descuento", 2)],
            ..ChartDef::BASE
        },
        ChartDef {
            dimension: "top-suppliers-discounts",
            key: GroupKey::Column("tercero_nombre"),
            key_label: "proveedor",
            measures: &[Metric::aggregate("monto", Measure::Sum("total_dcto"))],
            conditions: &[Condition::NotNull("tercero_nombre")],
            default_limit: Some(10),
            share_of_total: Some(("monto", "porcentaje")),
            ..ChartDef::BASE
        },
        ChartDef {
            dimension: "discounts-by-process",
            key: GroupKey::Column("proceso"),
            key_label: "proceso",
            measures: &[Metric::aggregate("monto", Measure::Sum("total_dcto"))],
            conditions: &[Condition::NotNull("proceso")],
            default_limit: Some(10),
            ..ChartDef::BASE
        },
        ChartDef {
            dimension: "top-suppliers",
            key: GroupKey::Column("tercero_nombre"),
            key_label: "proveedor",
            measures: &[Metric::aggregate("monto", Measure::Sum("total"))],
            conditions: &[Condition::NotNull("tercero_nombre")],
            default_limit: Some(10),
            ..ChartDef::BASE
        },
        ChartDef {
            dimension: "spend-by-process",
            key: GroupKey::Column("proceso"),
            key_label: "proceso",
            measures: &[Metric::aggregate("monto", Measure::Sum("total"))],
            conditions: &[Condition::NotNull("proceso")],
            default_limit: Some(10),
            ..ChartDef::BASE
        },
    ],
};

pub static BASE_OC: DatasetSchema = DatasetSchema {
    route: "compras/base",
    table: "base_oc_generadas",
    date_filter: Some(DateFilter::Range("fecha")),
    filters: &[
        FilterColumn::with_role("terceros", "tercero_nombre", FilterRole::Supplier),
        FilterColumn::new("tipos", "documento_tipo"),
        FilterColumn::with_role("estados", "estado", FilterRole::State),
    ],
    data_order: Some("fecha DESC"),
    default_data_limit: 100_000,
    metrics: &[
        Metric::aggregate("total_registros", Measure::Count),
        Metric::aggregate("ordenes_compra", Measure::CountDistinct("documento_num")),
        Metric::aggregate("valor_total", Measure::Sum("total")),
        Metric::aggregate("proveedores", Measure::CountDistinct("tercero_nombre")),
        Metric::aggregate("tipos_doc", Measure::CountDistinct("documento_tipo")),
    ],
    charts: &[
        ChartDef {
            dimension: "por-mes",
            key: GroupKey::Month("fecha"),
            key_label: "mes",
            measures: &[
                Metric::aggregate("cantidad", Measure::Count),
                Metric::aggregate("valor", Measure::Sum("total")),
            ],
            conditions: &[Condition::NotNull("fecha")],
            order: SeriesOrder::KeyAsc,
            ..ChartDef::BASE
        },
        ChartDef {
            dimension: "por-tercero",
            key: GroupKey::Column("tercero_nombre"),
            key_label: "tercero",
            measures: &[
                Metric::aggregate("cantidad", Measure::Count),
                Metric::aggregate("valor", Measure::Sum("total")),
            ],
            conditions: &[Condition::NotNull("tercero_nombre")],
            order: SeriesOrder::MeasureDesc(1),
            default_limit: Some(15),
            ..ChartDef::BASE
        },
        ChartDef {
            dimension: "por-tipo",
            key: GroupKey::Column("documento_tipo"),
            key_label: "tipo",
            measures: CANTIDAD,
            ..ChartDef::BASE
        },
        ChartDef {
            dimension: "por-estado",
            key: GroupKey::Column("estado"),
            key_label: "estado",
            measures: CANTIDAD,
            ..ChartDef::BASE
        },
    ],
};

/// Dashboard KPIs computed over the trace table
pub const TRAZA_DASHBOARD: &[Metric] = &[
    Metric::aggregate("totalRQ", Measure::CountDistinct("req_numero")),
    Metric::aggregate("totalOC", Measure::CountDistinct("oc_numero")),
    Metric::aggregate("totalItems", Measure::Count),
    avg("diasPromedioAprobarRQ", "dias_aprobar_rq", 1),
    avg("diasPromedioGenerarOC", "dias_generar_oc", 1),
    avg("diasPromedioAprobacionOC", "dias_aprobacion_oc", 1),
    avg("diasPromedioRecepcionServicio", "dias_recepcion_servicio", 1),
    avg("diasPromedioEntradaAlmacen", "dias_entrada_almacen", 1),
    Metric::aggregate(
        "pendientesAprobarRQ",
        Measure::CountLike {
            column: "req_estado",
            pattern: "%PEND%",
        },
    ),
    Metric::aggregate(
        "pendientesAprobarOC",
        Measure::CountLike {
            column: "oc_estado",
            pattern: "%PEND%",
        },
    ),
];

/// Dashboard KPIs computed over the discounts table
pub const DESCUENTOS_DASHBOARD: &[Metric] = &[
    Metric::aggregate("totalSpend", Measure::Sum("total")),
    Metric::aggregate("totalDescuentos", Measure::Sum("total_dcto")),
    // Stand-in until "dispatched" gets a business definition: average
    // discount percentage.
    avg("percentDispatched", "porcentaje_descuento", 2),
];

/// Order of the fields in the dashboard KPI response
pub const DASHBOARD_KPI_ORDER: &[&str] = &[
    "totalRQ",
    "totalOC",
    "totalItems",
    "totalSpend",
    "percentDispatched",
    "diasPromedioAprobarRQ",
    "diasPromedioGenerarOC",
    "diasPromedioAprobacionOC",
    "diasPromedioRecepcionServicio",
    "diasPromedioEntradaAlmacen",
    "totalDescuentos",
    "pendientesAprobarRQ",
    "pendientesAprobarOC",
];

/// Chart name of the per-stage average days series
pub const DAYS_BY_STAGE: &str = "days-by-stage";

/// Process stages in pipeline order: display label and the average-days
/// metric over the trace table
pub const STAGES: &[(&str, Metric)] = &[
    ("Aprobar RQ", avg("aprobar_rq", "dias_aprobar_rq", 1)),
    ("Generar OC", avg("generar_oc", "dias_generar_oc", 1)),
    ("Aprobación OC", avg("aprobacion_oc", "dias_aprobacion_oc", 1)),
    (
        "Recepción Servicio",
        avg("recepcion_servicio", "dias_recepcion_servicio", 1),
    ),
    ("Entrada Almacén", avg("entrada_almacen", "dias_entrada_almacen", 1)),
];

/// Charts served by `POST /api/compras/charts/:chart`, besides
/// [`DAYS_BY_STAGE`]
pub const DASHBOARD_CHARTS: &[&str] = &[
    "avg-approval-days",
    "avg-generation-days",
    "avg-approval-management-days",
    "avg-reception-service-days",
    "avg-warehouse-entry-days",
    "pending-approve-rq",
    "pending-approve-oc",
    "oc-by-state",
    "trend-oc",
    "oc-vs-items-by-process",
    "percent-discounts-by-process",
    "top-suppliers-discounts",
    "discounts-by-process",
    "top-suppliers",
    "spend-by-process",
];

/// Dashboard charts live on whichever table carries their columns
pub fn dashboard_chart(name: &str) -> Option<(&'static DatasetSchema, &'static ChartDef)> {
    if !DASHBOARD_CHARTS.contains(&name) {
        return None;
    }
    [&TRAZA, &DESCUENTOS]
        .into_iter()
        .find_map(|schema| schema.chart(name).map(|chart| (schema, chart)))
}
