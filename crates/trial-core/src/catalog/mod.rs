//! Catálogo de workflow: los seis departamentos en orden y los campos que
//! recolecta cada uno.
//!
//! Es configuración inmutable: vive en un `static` y ningún componente lo
//! modifica en tiempo de ejecución. Las migraciones de Postgres siembran la
//! tabla `workflow_steps` con los mismos códigos/nombres/órdenes.

mod definition;
mod departments;

pub use definition::{FieldDefinition, FieldType, StepDefinition};

use crate::model::StepCode;

/// Los seis departamentos ordenados por `order_index`.
pub fn catalog() -> &'static [StepDefinition] {
    &departments::DEPARTMENTS
}

/// Entrada del catálogo para `code` (siempre existe).
pub fn step(code: StepCode) -> &'static StepDefinition {
    &departments::DEPARTMENTS[code.order_index() - 1]
}
