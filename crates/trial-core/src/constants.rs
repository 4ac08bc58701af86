//! Constantes del dominio de trials.
//!
//! El número de departamentos es una constante de negocio, no configurable en
//! tiempo de ejecución: un trial se completa sólo cuando los seis pasos del
//! catálogo fueron aprobados individualmente.

/// Cantidad fija de departamentos (steps) del workflow.
pub const STEP_COUNT: usize = 6;

/// Título impreso en la cabecera del reporte.
pub const REPORT_TITLE: &str = "NPD Trial Report";

/// Texto mostrado para campos sin valor en el reporte.
pub const NOT_SPECIFIED: &str = "Not specified";
