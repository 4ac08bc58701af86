//! Store en memoria.
//!
//! Cada trial vive en una entrada de `DashMap`; `submit_step` toma el lock de
//! escritura de esa entrada durante toda la unidad (admit, upsert, recálculo),
//! por lo que las submissions de un mismo trial quedan serializadas.
use std::collections::BTreeMap;

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::debug;
use uuid::Uuid;

use super::{SubmissionOutcome, TrialStore};
use crate::errors::TrialError;
use crate::model::{NewTrial, StepCode, StepRecord, StepSubmission, Trial, TrialDetail, TrialSummary};
use crate::workflow::WorkflowMachine;

struct TrialEntry {
    trial: Trial,
    steps: BTreeMap<StepCode, StepRecord>,
}

impl TrialEntry {
    fn detail(&self) -> TrialDetail {
        TrialDetail::new(self.trial.clone(), self.steps.values().cloned().collect())
    }
}

#[derive(Default)]
pub struct InMemoryTrialStore {
    trials: DashMap<Uuid, TrialEntry>,
    numbers: DashMap<String, Uuid>,
}

impl InMemoryTrialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }
}

impl TrialStore for InMemoryTrialStore {
    fn create_trial(&self, new: NewTrial) -> Result<Trial, TrialError> {
        // El entry sobre `numbers` mantiene el lock del shard mientras se
        // inserta el trial: dos creaciones con el mismo número no compiten.
        match self.numbers.entry(new.trial_no.clone()) {
            Entry::Occupied(_) => Err(TrialError::Conflict("Trial number already exists".to_string())),
            Entry::Vacant(slot) => {
                let trial = Trial::create(new, Utc::now());
                self.trials.insert(trial.id,
                                   TrialEntry { trial: trial.clone(),
                                                steps: BTreeMap::new() });
                slot.insert(trial.id);
                debug!("memory:create_trial id={} trial_no={}", trial.id, trial.trial_no);
                Ok(trial)
            }
        }
    }

    fn trial(&self, id: Uuid) -> Result<Option<TrialDetail>, TrialError> {
        Ok(self.trials.get(&id).map(|e| e.detail()))
    }

    fn trial_by_number(&self, trial_no: &str) -> Result<Option<TrialDetail>, TrialError> {
        let id = match self.numbers.get(trial_no) {
            Some(id) => *id,
            None => return Ok(None),
        };
        self.trial(id)
    }

    fn list_trials(&self) -> Result<Vec<TrialSummary>, TrialError> {
        let mut out: Vec<TrialSummary> = self.trials
                                             .iter()
                                             .map(|e| {
                                                 let records: Vec<StepRecord> = e.steps.values().cloned().collect();
                                                 TrialSummary::from_records(e.trial.clone(), &records)
                                             })
                                             .collect();
        out.sort_by(|a, b| {
               b.trial
                .updated_at
                .cmp(&a.trial.updated_at)
                .then_with(|| a.trial.trial_no.cmp(&b.trial.trial_no))
           });
        Ok(out)
    }

    fn submit_step(&self, trial_id: Uuid, submission: StepSubmission, machine: &WorkflowMachine) -> Result<SubmissionOutcome, TrialError> {
        let mut entry = self.trials
                            .get_mut(&trial_id)
                            .ok_or_else(|| TrialError::trial_not_found(trial_id))?;
        let before: Vec<StepRecord> = entry.steps.values().cloned().collect();
        machine.admit(&before, &submission)?;

        let now = Utc::now();
        let record = StepRecord::from_submission(trial_id, &submission, entry.steps.get(&submission.step), now);
        entry.steps.insert(submission.step, record.clone());

        let after: Vec<StepRecord> = entry.steps.values().cloned().collect();
        let next = machine.next_state(entry.trial.state, submission.step, submission.verdict, &after);
        entry.trial.state = next;
        entry.trial.updated_at = now;
        debug!("memory:submit_step trial={trial_id} step={} verdict={} -> {next}",
               submission.step,
               submission.verdict);
        Ok(SubmissionOutcome { trial: entry.trial.clone(),
                               record })
    }
}
