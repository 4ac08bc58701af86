//! Fachada de operaciones sobre trials.
//!
//! `TrialService` valida la entrada cruda (campos del trial, step code,
//! veredicto, forma del payload) y delega en el store, que es la única
//! autoridad sobre el estado. API y CLI usan este tipo; el wizard lo ve a
//! través de `StepSubmitter`.
use log::{debug, info, warn};
use serde_json::Value;
use uuid::Uuid;

use crate::catalog::{self, StepDefinition};
use crate::errors::TrialError;
use crate::model::{NewTrial, StepSubmission, Trial, TrialDetail, TrialFilter, TrialStats, TrialSummary};
use crate::report::TrialReport;
use crate::store::{SubmissionOutcome, TrialStore};
use crate::wizard::StepSubmitter;
use crate::workflow::{WorkflowMachine, WorkflowPolicy};

pub struct TrialService<S>
    where S: TrialStore
{
    store: S,
    machine: WorkflowMachine,
}

impl<S> TrialService<S> where S: TrialStore
{
    pub fn new(store: S, policy: WorkflowPolicy) -> Self {
        Self { store,
               machine: WorkflowMachine::new(policy) }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn policy(&self) -> WorkflowPolicy {
        self.machine.policy()
    }

    pub fn catalog(&self) -> &'static [StepDefinition] {
        catalog::catalog()
    }

    pub fn create_trial(&self, trial_no: &str, part_name: &str) -> Result<Trial, TrialError> {
        let new = NewTrial::new(trial_no, part_name)?;
        let trial = self.store.create_trial(new).map_err(|e| {
                                                   if matches!(e, TrialError::Conflict(_)) {
                                                       warn!("create_trial: duplicate trial number '{}'", trial_no.trim());
                                                   }
                                                   e
                                               })?;
        info!("trial created id={} trial_no={}", trial.id, trial.trial_no);
        Ok(trial)
    }

    pub fn trial(&self, id: Uuid) -> Result<TrialDetail, TrialError> {
        self.store.trial(id)?.ok_or_else(|| TrialError::trial_not_found(id))
    }

    pub fn trial_by_number(&self, trial_no: &str) -> Result<TrialDetail, TrialError> {
        self.store
            .trial_by_number(trial_no.trim())?
            .ok_or_else(|| TrialError::trial_not_found(trial_no.trim()))
    }

    /// Resúmenes por `updated_at` descendente, filtrados.
    pub fn list_trials(&self, filter: &TrialFilter) -> Result<Vec<TrialSummary>, TrialError> {
        let all = self.store.list_trials()?;
        Ok(all.into_iter().filter(|s| filter.matches(s)).collect())
    }

    pub fn stats(&self) -> Result<TrialStats, TrialError> {
        let all = self.store.list_trials()?;
        Ok(TrialStats::tally(all.iter().map(|s| &s.trial)))
    }

    /// Submission ya tipada. El store ejecuta admit + upsert + recálculo en
    /// una sola unidad atómica.
    pub fn submit(&self, trial_id: Uuid, submission: StepSubmission) -> Result<SubmissionOutcome, TrialError> {
        let step = submission.step;
        let verdict = submission.verdict;
        match self.store.submit_step(trial_id, submission, &self.machine) {
            Ok(outcome) => {
                info!("step submitted trial={} step={} verdict={} -> {}",
                      trial_id, step, verdict, outcome.trial.state);
                Ok(outcome)
            }
            Err(e) => {
                debug!("submit rejected trial={trial_id} step={step}: {e}");
                Err(e)
            }
        }
    }

    /// Submission desde entrada cruda (API/CLI). Step code, veredicto y payload
    /// se validan antes de tocar el store.
    pub fn submit_step(&self,
                       trial_id: Uuid,
                       step_code: &str,
                       payload: Value,
                       verdict: Option<&str>,
                       remarks: Option<String>)
                       -> Result<SubmissionOutcome, TrialError> {
        let submission = StepSubmission::parse(step_code, payload, verdict, remarks)?;
        self.submit(trial_id, submission)
    }

    pub fn report(&self, trial_id: Uuid) -> Result<TrialReport, TrialError> {
        Ok(TrialReport::build(&self.trial(trial_id)?))
    }
}

impl<S> StepSubmitter for TrialService<S> where S: TrialStore
{
    fn submit(&self, trial_id: Uuid, submission: StepSubmission) -> Result<SubmissionOutcome, TrialError> {
        TrialService::submit(self, trial_id, submission)
    }
}
