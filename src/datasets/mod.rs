//! Dataset registry
//!
//! Each dataset is a static [`DatasetSchema`]; the HTTP layer mounts one
//! router per entry of [`ALL`].

pub mod compras;
pub mod costos;
pub mod errores;
pub mod operatividad;

use crate::query::DatasetSchema;

pub use compras::{BASE_OC, DESCUENTOS, TRAZA};
pub use costos::COSTOS;
pub use errores::ERRORES;
pub use operatividad::OPERATIVIDAD;

/// Every dataset served, in load-report order
pub static ALL: [&DatasetSchema; 6] = [
    &COSTOS,
    &OPERATIVIDAD,
    &ERRORES,
    &TRAZA,
    &DESCUENTOS,
    &BASE_OC,
];

/// The procurement datasets, reported together by the procurement load
pub static COMPRAS: [&DatasetSchema; 3] = [&TRAZA, &DESCUENTOS, &BASE_OC];

pub fn find(route: &str) -> Option<&'static DatasetSchema> {
    ALL.iter().copied().find(|schema| schema.route == route)
}
