//! Errores de persistencia.
//! Mapea errores de Diesel / pool a variantes semánticas y éstas a
//! `TrialError` en el borde del store.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;
use trial_core::TrialError;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("unique violation: {0}")]
    UniqueViolation(String),
    #[error("check violation: {0}")]
    CheckViolation(String),
    #[error("foreign key violation: {0}")]
    ForeignKeyViolation(String),
    #[error("not found")]
    NotFound,
    #[error("serialization conflict (retryable)")]
    SerializationConflict,
    #[error("transient IO / connection pool error: {0}")]
    TransientIo(String),
    #[error("invalid row: {0}")]
    InvalidRow(String),
    #[error("configuration error: {0}")]
    Config(String),
    /// Rechazo de dominio producido dentro de una transacción (admit, trial
    /// inexistente); aborta el commit.
    #[error(transparent)]
    Domain(TrialError),
    #[error("unknown database error: {0}")]
    Unknown(String),
}

impl From<DieselError> for PersistenceError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => Self::NotFound,
            DieselError::DatabaseError(kind, info) => match kind {
                DatabaseErrorKind::UniqueViolation => Self::UniqueViolation(info.message().to_string()),
                DatabaseErrorKind::CheckViolation => Self::CheckViolation(info.message().to_string()),
                DatabaseErrorKind::ForeignKeyViolation => Self::ForeignKeyViolation(info.message().to_string()),
                DatabaseErrorKind::SerializationFailure => Self::SerializationConflict,
                DatabaseErrorKind::ClosedConnection => Self::TransientIo(info.message().to_string()),
                other => Self::Unknown(format!("db error kind {:?}: {}", other, info.message())),
            },
            DieselError::DeserializationError(e) => Self::InvalidRow(format!("deser: {e}")),
            DieselError::SerializationError(e) => Self::Unknown(format!("ser: {e}")),
            DieselError::BrokenTransactionManager => Self::TransientIo("broken transaction manager".into()),
            other => Self::Unknown(format!("unhandled diesel error: {other:?}")),
        }
    }
}

impl From<TrialError> for PersistenceError {
    fn from(err: TrialError) -> Self {
        Self::Domain(err)
    }
}

impl From<PersistenceError> for TrialError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::Domain(e) => e,
            PersistenceError::UniqueViolation(msg) => TrialError::Conflict(msg),
            PersistenceError::NotFound => TrialError::NotFound("record".into()),
            other => TrialError::Storage(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trial_core::StepCode;

    #[test]
    fn domain_errors_pass_through_unchanged() {
        let inner = TrialError::OutOfSequence { step: StepCode::Dpt3,
                                                blocking: StepCode::Dpt1 };
        let back: TrialError = PersistenceError::from(inner.clone()).into();
        assert_eq!(back, inner);
    }

    #[test]
    fn infrastructure_errors_become_storage() {
        let e: TrialError = PersistenceError::TransientIo("pool timeout".into()).into();
        assert!(matches!(e, TrialError::Storage(m) if m.contains("pool timeout")));
        let e: TrialError = PersistenceError::UniqueViolation("trials_trial_no_key".into()).into();
        assert!(matches!(e, TrialError::Conflict(_)));
        let e: TrialError = PersistenceError::Config("DATABASE_URL is not set".into()).into();
        assert!(!e.is_client_error());
    }
}
