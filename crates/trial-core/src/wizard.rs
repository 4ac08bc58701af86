//! Controlador del wizard de seis pasos.
//!
//! El wizard mantiene un índice (0-based) sobre el catálogo y la última vista
//! del trial devuelta por la autoridad. Nunca calcula el status: entrega la
//! submission a un `StepSubmitter` y reacciona a lo que éste devuelve.
use thiserror::Error;
use uuid::Uuid;

use crate::catalog::{self, StepDefinition};
use crate::constants::STEP_COUNT;
use crate::errors::TrialError;
use crate::model::{StepCode, StepPayload, StepRecord, StepSubmission, TrialDetail, TrialStatus, Verdict};
use crate::store::SubmissionOutcome;

/// Autoridad que recibe las submissions del wizard.
pub trait StepSubmitter {
    fn submit(&self, trial_id: Uuid, submission: StepSubmission) -> Result<SubmissionOutcome, TrialError>;
}

#[derive(Debug, Error, PartialEq)]
pub enum WizardError {
    #[error("select a validation status (ok or not ok) before continuing")]
    VerdictRequired,
    #[error("{blocking} must be validated as ok before this step can be submitted")]
    Blocked { blocking: StepCode },
    #[error("step index {0} is outside the workflow")]
    OutOfRange(usize),
    #[error(transparent)]
    Trial(#[from] TrialError),
}

/// Reacción del wizard al resultado devuelto por la autoridad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardOutcome {
    /// `ok` en un step que no es el último: el wizard avanza.
    Advanced { to: StepCode },
    /// La autoridad reporta el trial como completo.
    Completed,
    /// `not_ok`: la autoridad detuvo el trial en `step`.
    Halted { step: StepCode },
    /// Submission aceptada sin cambio de paso.
    Stayed,
}

/// Valores guardados del step activo, para precargar el formulario.
#[derive(Debug, Clone, PartialEq)]
pub struct Prefill {
    pub payload: StepPayload,
    pub verdict: Verdict,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TrialWizard {
    view: TrialDetail,
    index: usize,
}

impl TrialWizard {
    /// Wizard posicionado en el primer departamento.
    pub fn new(view: TrialDetail) -> Self {
        Self { view, index: 0 }
    }

    /// Wizard posicionado donde el trial quedó: el step detenido, o el primer
    /// step sin `ok`, o el último si todos están aprobados.
    pub fn resume(view: TrialDetail) -> Self {
        let index = match view.trial.halted_step() {
            Some(step) => step.order_index() - 1,
            None => StepCode::ALL.iter()
                                 .position(|c| !view.record(*c).map(StepRecord::is_ok).unwrap_or(false))
                                 .unwrap_or(STEP_COUNT - 1),
        };
        Self { view, index }
    }

    pub fn trial(&self) -> &TrialDetail {
        &self.view
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current_step(&self) -> &'static StepDefinition {
        &catalog::catalog()[self.index]
    }

    pub fn is_last(&self) -> bool {
        self.index == STEP_COUNT - 1
    }

    /// El paso 0 siempre puede enviarse; los demás sólo si el step anterior
    /// (el de `order_index == index`) tiene veredicto `ok`.
    pub fn can_proceed(&self) -> bool {
        self.index == 0 || self.blocking_step().is_none()
    }

    fn blocking_step(&self) -> Option<StepCode> {
        let previous = StepCode::from_order_index(self.index)?;
        match self.view.steps.iter().find(|r| r.order_index() == self.index) {
            Some(record) if record.is_ok() => None,
            _ => Some(previous),
        }
    }

    /// Veredicto registrado del paso `index`; `None` = no iniciado.
    pub fn status_of(&self, index: usize) -> Option<Verdict> {
        let code = StepCode::from_order_index(index + 1)?;
        self.view.record(code).map(|r| r.verdict)
    }

    pub fn prefill(&self) -> Option<Prefill> {
        self.view.record(self.current_step().code).map(|r| Prefill { payload: r.payload.clone(),
                                                                     verdict: r.verdict,
                                                                     remarks: r.remarks.clone() })
    }

    pub fn previous(&mut self) {
        self.index = self.index.saturating_sub(1);
    }

    /// Salto directo a cualquier paso del catálogo.
    pub fn go_to(&mut self, index: usize) -> Result<(), WizardError> {
        if index >= STEP_COUNT {
            return Err(WizardError::OutOfRange(index));
        }
        self.index = index;
        Ok(())
    }

    /// Envía el paso activo a la autoridad y actualiza la vista con el trial
    /// devuelto.
    pub fn submit<A>(&mut self,
                     authority: &A,
                     payload: StepPayload,
                     verdict: Verdict,
                     remarks: Option<String>)
                     -> Result<WizardOutcome, WizardError>
        where A: StepSubmitter + ?Sized
    {
        if !verdict.is_decided() {
            return Err(WizardError::VerdictRequired);
        }
        if let Some(blocking) = self.blocking_step() {
            return Err(WizardError::Blocked { blocking });
        }
        let step = self.current_step().code;
        let outcome = authority.submit(self.view.trial.id, StepSubmission::new(step, payload, verdict, remarks))?;
        self.absorb(outcome.clone());

        if outcome.status() == TrialStatus::Completed {
            return Ok(WizardOutcome::Completed);
        }
        if verdict == Verdict::NotOk {
            return Ok(WizardOutcome::Halted { step: outcome.halted_step().unwrap_or(step) });
        }
        match StepCode::from_order_index(step.order_index() + 1) {
            Some(next) => {
                self.index += 1;
                Ok(WizardOutcome::Advanced { to: next })
            }
            None => Ok(WizardOutcome::Stayed),
        }
    }

    fn absorb(&mut self, outcome: SubmissionOutcome) {
        let SubmissionOutcome { trial, record } = outcome;
        self.view.steps.retain(|r| r.step_code != record.step_code);
        self.view.steps.push(record);
        self.view = TrialDetail::new(trial, std::mem::take(&mut self.view.steps));
    }
}
