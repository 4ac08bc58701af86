//! Contrato de almacenamiento de trials y registros de steps.
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::errors::TrialError;
use crate::model::{NewTrial, StepCode, StepRecord, StepSubmission, Trial, TrialDetail, TrialStatus, TrialSummary};
use crate::workflow::WorkflowMachine;

/// Resultado de una submission ya confirmada.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionOutcome {
    pub trial: Trial,
    pub record: StepRecord,
}

impl SubmissionOutcome {
    pub fn status(&self) -> TrialStatus {
        self.trial.status()
    }

    pub fn halted_step(&self) -> Option<StepCode> {
        self.trial.halted_step()
    }
}

/// Store autoritativo de trials (Trial Record Store + Step Record Store).
///
/// Contrato:
/// - `create_trial` falla con `TrialError::Conflict` si el número ya existe,
///   sin modificar el trial existente.
/// - `trial` / `trial_by_number` devuelven `Ok(None)` si no existe.
/// - `list_trials` ordena por `updated_at` descendente.
/// - `submit_step` es atómico: bajo un lock/transacción por trial ejecuta
///   `machine.admit`, el upsert del registro, `machine.next_state` y la
///   escritura del estado. Si cualquier paso falla no queda nada escrito.
pub trait TrialStore: Send + Sync {
    fn create_trial(&self, new: NewTrial) -> Result<Trial, TrialError>;

    fn trial(&self, id: Uuid) -> Result<Option<TrialDetail>, TrialError>;

    fn trial_by_number(&self, trial_no: &str) -> Result<Option<TrialDetail>, TrialError>;

    fn list_trials(&self) -> Result<Vec<TrialSummary>, TrialError>;

    fn submit_step(&self,
                   trial_id: Uuid,
                   submission: StepSubmission,
                   machine: &WorkflowMachine)
                   -> Result<SubmissionOutcome, TrialError>;
}

impl<T: TrialStore + ?Sized> TrialStore for Box<T> {
    fn create_trial(&self, new: NewTrial) -> Result<Trial, TrialError> {
        (**self).create_trial(new)
    }
    fn trial(&self, id: Uuid) -> Result<Option<TrialDetail>, TrialError> {
        (**self).trial(id)
    }
    fn trial_by_number(&self, trial_no: &str) -> Result<Option<TrialDetail>, TrialError> {
        (**self).trial_by_number(trial_no)
    }
    fn list_trials(&self) -> Result<Vec<TrialSummary>, TrialError> {
        (**self).list_trials()
    }
    fn submit_step(&self, trial_id: Uuid, submission: StepSubmission, machine: &WorkflowMachine) -> Result<SubmissionOutcome, TrialError> {
        (**self).submit_step(trial_id, submission, machine)
    }
}

impl<T: TrialStore + ?Sized> TrialStore for Arc<T> {
    fn create_trial(&self, new: NewTrial) -> Result<Trial, TrialError> {
        (**self).create_trial(new)
    }
    fn trial(&self, id: Uuid) -> Result<Option<TrialDetail>, TrialError> {
        (**self).trial(id)
    }
    fn trial_by_number(&self, trial_no: &str) -> Result<Option<TrialDetail>, TrialError> {
        (**self).trial_by_number(trial_no)
    }
    fn list_trials(&self) -> Result<Vec<TrialSummary>, TrialError> {
        (**self).list_trials()
    }
    fn submit_step(&self, trial_id: Uuid, submission: StepSubmission, machine: &WorkflowMachine) -> Result<SubmissionOutcome, TrialError> {
        (**self).submit_step(trial_id, submission, machine)
    }
}
