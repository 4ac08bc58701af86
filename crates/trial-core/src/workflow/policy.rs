/// Política de admisión de submissions.
///
/// Por defecto el servidor no impone el orden de los departamentos: esa
/// compuerta vive en el wizard (cliente). `enforce_step_order` la mueve al
/// servidor de forma explícita.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkflowPolicy {
    /// Rechaza un step si algún step de menor orden no está `ok`.
    pub enforce_step_order: bool,
    /// Valida el payload contra los campos del catálogo (veredictos decididos).
    pub validate_fields: bool,
}

impl WorkflowPolicy {
    /// Política estricta: orden y campos validados en el servidor.
    pub fn strict() -> Self {
        Self { enforce_step_order: true,
               validate_fields: true }
    }
}
