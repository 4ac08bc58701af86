//! trial-core: modelo y reglas del seguimiento de trials de manufactura.
//!
//! Un trial recorre seis departamentos en orden (`DPT1`..`DPT6`). Cada uno
//! registra datos de formulario y un veredicto (`ok`, `not_ok`, `pending`).
//! Un `not_ok` detiene el trial; sólo un `ok` sobre el step detenido lo
//! reanuda; seis registros `ok` lo completan.
//!
//! Módulos:
//! - `catalog`: departamentos y campos (estático).
//! - `model`: trial, registros, códigos y veredictos.
//! - `workflow`: máquina de estados pura (`WorkflowMachine`).
//! - `store`: contrato `TrialStore` + `InMemoryTrialStore`.
//! - `service`: fachada usada por API y CLI.
//! - `wizard`: controlador del recorrido paso a paso.
//! - `report`: proyección imprimible.

pub mod catalog;
pub mod constants;
pub mod errors;
pub mod model;
pub mod report;
pub mod service;
pub mod store;
pub mod wizard;
pub mod workflow;

pub use errors::{ErrorClass, TrialError};
pub use model::{NewTrial, StepCode, StepPayload, StepRecord, StepSubmission, Trial, TrialDetail, TrialFilter, TrialState,
                TrialStats, TrialStatus, TrialSummary, Verdict};
pub use report::TrialReport;
pub use service::TrialService;
pub use store::{InMemoryTrialStore, SubmissionOutcome, TrialStore};
pub use wizard::{StepSubmitter, TrialWizard, WizardError, WizardOutcome};
pub use workflow::{WorkflowMachine, WorkflowPolicy};
