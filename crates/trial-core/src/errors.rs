//! Errores del core de trials.
//!
//! Taxonomía:
//! - validación (campos faltantes, step code o veredicto inválido): el cliente
//!   puede corregir y reenviar, nunca se reintenta automáticamente.
//! - conflicto (trial number duplicado, submission fuera de secuencia).
//! - not found (trial inexistente).
//! - storage: fallas de transporte/almacenamiento, se reportan de forma genérica.

use thiserror::Error;

use crate::model::StepCode;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum TrialError {
    #[error("{0}")] Validation(String),
    #[error("unknown step code '{0}'")] InvalidStepCode(String),
    #[error("valid validation status is required (got '{0}')")] InvalidVerdict(String),
    #[error("{0} not found")] NotFound(String),
    #[error("{0}")] Conflict(String),
    #[error("step {step} cannot be submitted before {blocking} is validated as ok")]
    OutOfSequence { step: StepCode, blocking: StepCode },
    #[error("storage error: {0}")] Storage(String),
}

/// Clasificación gruesa usada por las capas externas (HTTP, CLI) para decidir
/// código de respuesta / exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Validation,
    Conflict,
    NotFound,
    Storage,
}

impl TrialError {
    pub fn class(&self) -> ErrorClass {
        match self {
            TrialError::Validation(_) | TrialError::InvalidStepCode(_) | TrialError::InvalidVerdict(_) => {
                ErrorClass::Validation
            }
            TrialError::Conflict(_) | TrialError::OutOfSequence { .. } => ErrorClass::Conflict,
            TrialError::NotFound(_) => ErrorClass::NotFound,
            TrialError::Storage(_) => ErrorClass::Storage,
        }
    }

    /// `true` si el error es corregible por el cliente (no es falla de storage).
    pub fn is_client_error(&self) -> bool {
        !matches!(self.class(), ErrorClass::Storage)
    }

    pub fn trial_not_found(key: impl std::fmt::Display) -> Self {
        TrialError::NotFound(format!("trial {key}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes_follow_taxonomy() {
        assert_eq!(TrialError::InvalidStepCode("X".into()).class(), ErrorClass::Validation);
        assert_eq!(TrialError::InvalidVerdict("maybe".into()).class(), ErrorClass::Validation);
        assert_eq!(TrialError::Conflict("dup".into()).class(), ErrorClass::Conflict);
        assert_eq!(TrialError::OutOfSequence { step: StepCode::Dpt3,
                                               blocking: StepCode::Dpt1 }.class(),
                   ErrorClass::Conflict);
        assert_eq!(TrialError::trial_not_found("T-1").class(), ErrorClass::NotFound);
        assert!(!TrialError::Storage("pool".into()).is_client_error());
    }

    #[test]
    fn messages_are_readable() {
        assert_eq!(TrialError::trial_not_found("T-9").to_string(), "trial T-9 not found");
        assert_eq!(TrialError::OutOfSequence { step: StepCode::Dpt4,
                                               blocking: StepCode::Dpt2 }.to_string(),
                   "step DPT4 cannot be submitted before DPT2 is validated as ok");
    }
}
