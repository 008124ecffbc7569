//! Shared fixtures for router-level tests: an in-memory store seeded with
//! every dashboard table, and request helpers.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tower::ServiceExt;

use dashboard_api::{create_router, AppState, DatabaseManager, QueryLimits};

pub const SCHEMA: &str = "
CREATE TABLE costos_mensuales (
    fecha TEXT, catalogo TEXT, ciudad TEXT, tercero TEXT, neto REAL
);
CREATE TABLE operatividad_vehiculos (
    fecha_ejecucion TEXT, sede TEXT, estado_vehiculo TEXT, placa TEXT,
    vehiculos_programados INTEGER, vehiculos_operativos INTEGER, dias_en_taller INTEGER
);
CREATE TABLE errores (
    mes TEXT, sede TEXT, error TEXT, total REAL
);
CREATE TABLE traza_req_oc (
    req_numero TEXT, req_fecha TEXT, req_estado TEXT, req_usuario_autorizador TEXT,
    oc_numero TEXT, oc_fecha TEXT, oc_estado TEXT, oc_tercero_nombre TEXT,
    oc_usuario TEXT, oc_usuario_autorizacion TEXT,
    entrega_servicio_usuario TEXT, entrega_almacen_usuario TEXT,
    dias_aprobar_rq INTEGER, dias_generar_oc INTEGER, dias_aprobacion_oc INTEGER,
    dias_recepcion_servicio INTEGER, dias_entrada_almacen INTEGER
);
CREATE TABLE oc_descuentos (
    documento_num TEXT, fecha TEXT, estado TEXT, tercero_nombre TEXT, proceso TEXT,
    total REAL, total_dcto REAL, porcentaje_descuento REAL
);
CREATE TABLE base_oc_generadas (
    documento_num TEXT, fecha TEXT, estado TEXT, tercero_nombre TEXT,
    documento_tipo TEXT, total REAL
);
";

pub const SEED: &str = "
INSERT INTO costos_mensuales VALUES
    ('2024-12-15', 'REPUESTOS', 'Cali', 'ACME', 100),
    ('2025-01-10', 'REPUESTOS', 'Cali', 'ACME', 200),
    ('2025-01-20', 'LLANTAS', 'Bogota', 'Globex', 300),
    ('2025-02-05', 'LLANTAS', 'Cali', 'ACME', 400),
    ('2025-03-01', 'REPUESTOS', 'Bogota', 'Initech', 500);

INSERT INTO operatividad_vehiculos VALUES
    ('2025-01-01', 'Norte', 'OPERATIVO', 'ABC123', 10, 8, 0),
    ('2025-01-01', 'Sur', 'TALLER', 'XYZ789', 5, 2, 3),
    ('2025-01-02', 'Norte', 'OPERATIVO', 'ABC123', 10, 9, 0);

INSERT INTO errores VALUES
    ('ENERO', 'A', 'Si', 10),
    ('ENERO', 'A', 'No', 5),
    ('FEBRERO', 'B', 'Si', 7),
    ('MARZO', 'B', 'Revisar', 1);

INSERT INTO traza_req_oc VALUES
    ('RQ1', '2025-01-05', 'APROBADA', 'ana', 'OC1', '2025-01-10', 'PENDIENTE APROBACION',
     'ACME', 'luis', 'marta', 'pedro', 'sofia', 2, 4, 1, 3, 5),
    ('RQ1', '2025-01-05', 'APROBADA', 'ana', 'OC2', '2025-02-12', 'APROBADA',
     'Globex', 'luis', 'marta', NULL, NULL, 4, NULL, 2, NULL, NULL),
    ('RQ2', '2025-02-01', 'PENDIENTE', 'juan', NULL, NULL, NULL,
     NULL, NULL, NULL, NULL, NULL, NULL, NULL, NULL, NULL, NULL);

INSERT INTO oc_descuentos VALUES
    ('D1', '2025-01-10', 'APROBADA', 'ACME', 'Mantenimiento', 1000, 100, 10),
    ('D1', '2025-01-10', 'APROBADA', 'ACME', 'Mantenimiento', 500, 25, 5),
    ('D2', '2025-02-10', 'APROBADA', 'Globex', 'Operaciones', 2000, 100, 5);

INSERT INTO base_oc_generadas VALUES
    ('B1', '2025-01-03', 'APROBADA', 'ACME', 'OC', 100),
    ('B2', '2025-01-04', 'ANULADA', 'Globex', 'OS', 50);
";

/// Single-connection in-memory pool; a second connection would see a
/// different, empty database.
pub async fn memory_pool() -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory database")
}

fn app_over(pool: SqlitePool) -> Router {
    create_router(AppState::new(
        DatabaseManager::from_pool(pool),
        QueryLimits::default(),
    ))
}

/// Router over a store holding every table with the fixture rows
pub async fn seeded_app() -> Router {
    seeded_app_without(&[]).await
}

/// Router over the seeded store with some tables dropped
pub async fn seeded_app_without(tables: &[&str]) -> Router {
    let pool = memory_pool().await;
    sqlx::raw_sql(SCHEMA)
        .execute(&pool)
        .await
        .expect("Failed to create tables");
    sqlx::raw_sql(SEED)
        .execute(&pool)
        .await
        .expect("Failed to seed tables");
    for table in tables {
        sqlx::raw_sql(&format!("DROP TABLE {}", table))
            .execute(&pool)
            .await
            .expect("Failed to drop table");
    }
    app_over(pool)
}

/// Router over a store with no tables at all
pub async fn empty_app() -> Router {
    app_over(memory_pool().await)
}

/// Router over a pool that has already been closed
pub async fn closed_app() -> Router {
    let pool = memory_pool().await;
    pool.close().await;
    app_over(pool)
}

/// Parse response body as JSON.
pub async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), 1_000_000)
        .await
        .expect("Failed to read response body");
    serde_json::from_slice(&bytes).expect("Failed to parse JSON")
}

pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    (status, body_json(resp).await)
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    (status, body_json(resp).await)
}

/// Numeric field of a JSON object; panics when absent or not a number
pub fn num(value: &Value, key: &str) -> f64 {
    value
        .get(key)
        .and_then(Value::as_f64)
        .unwrap_or_else(|| panic!("missing numeric field '{}' in {}", key, value))
}
