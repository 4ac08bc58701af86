//! Trial, vistas derivadas (detalle, resumen) y filtros de listado.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{StepCode, StepRecord, TrialState, TrialStatus};
use crate::constants::STEP_COUNT;
use crate::errors::TrialError;

/// Identidad y estado de un trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trial {
    pub id: Uuid,
    pub trial_no: String,
    pub part_name: String,
    #[serde(flatten)]
    pub state: TrialState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Trial {
    /// Trial recién creado: `in_progress`, sin registros de steps.
    pub fn create(new: NewTrial, now: DateTime<Utc>) -> Trial {
        Trial { id: Uuid::new_v4(),
                trial_no: new.trial_no,
                part_name: new.part_name,
                state: TrialState::InProgress,
                created_at: now,
                updated_at: now }
    }

    pub fn status(&self) -> TrialStatus {
        self.state.status()
    }

    pub fn halted_step(&self) -> Option<StepCode> {
        self.state.halted_step()
    }
}

/// Datos de creación validados (trim + no vacíos).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTrial {
    pub trial_no: String,
    pub part_name: String,
}

impl NewTrial {
    pub fn new(trial_no: &str, part_name: &str) -> Result<Self, TrialError> {
        let trial_no = trial_no.trim();
        let part_name = part_name.trim();
        if trial_no.is_empty() || part_name.is_empty() {
            return Err(TrialError::Validation("Trial number and part name are required".to_string()));
        }
        Ok(NewTrial { trial_no: trial_no.to_string(),
                      part_name: part_name.to_string() })
    }
}

/// Trial con todos sus registros, ordenados por orden de catálogo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialDetail {
    #[serde(flatten)]
    pub trial: Trial,
    pub steps: Vec<StepRecord>,
}

impl TrialDetail {
    pub fn new(trial: Trial, mut steps: Vec<StepRecord>) -> Self {
        steps.sort_by_key(|s| s.step_code);
        Self { trial, steps }
    }

    pub fn record(&self, code: StepCode) -> Option<&StepRecord> {
        self.steps.iter().find(|s| s.step_code == code)
    }

    pub fn summary(&self) -> TrialSummary {
        TrialSummary::from_records(self.trial.clone(), &self.steps)
    }
}

/// Fila del dashboard: trial + conteos de steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialSummary {
    #[serde(flatten)]
    pub trial: Trial,
    pub steps_count: usize,
    pub completed_steps: usize,
}

impl TrialSummary {
    pub fn from_records(trial: Trial, records: &[StepRecord]) -> Self {
        Self { trial,
               steps_count: records.len(),
               completed_steps: records.iter().filter(|r| r.is_ok()).count() }
    }

    /// Porcentaje de departamentos aprobados (0..=100).
    pub fn progress_percent(&self) -> u8 {
        ((self.completed_steps.min(STEP_COUNT) * 100) / STEP_COUNT) as u8
    }
}

/// Filtro de listado: status exacto y búsqueda (case-insensitive) por número
/// de trial o nombre de pieza.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrialFilter {
    pub status: Option<TrialStatus>,
    pub search: Option<String>,
}

impl TrialFilter {
    pub fn matches(&self, summary: &TrialSummary) -> bool {
        if let Some(status) = self.status {
            if summary.trial.status() != status {
                return false;
            }
        }
        match self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            None => true,
            Some(term) => {
                let term = term.to_lowercase();
                summary.trial.trial_no.to_lowercase().contains(&term) || summary.trial.part_name.to_lowercase().contains(&term)
            }
        }
    }
}

/// Conteos por status para el dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialStats {
    pub total: usize,
    pub in_progress: usize,
    pub halted: usize,
    pub completed: usize,
}

impl TrialStats {
    pub fn tally<'a>(trials: impl IntoIterator<Item = &'a Trial>) -> Self {
        trials.into_iter().fold(TrialStats::default(), |mut acc, t| {
                              acc.total += 1;
                              match t.status() {
                                  TrialStatus::InProgress => acc.in_progress += 1,
                                  TrialStatus::Halted => acc.halted += 1,
                                  TrialStatus::Completed => acc.completed += 1,
                              }
                              acc
                          })
    }
}
