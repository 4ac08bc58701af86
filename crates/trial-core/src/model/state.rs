//! Estado de un trial.
//!
//! `TrialState` lleva el puntero de halt dentro de la variante `Halted`, por lo
//! que la invariante "halted_step_code presente sii status = halted" se cumple
//! por construcción. Las columnas planas (`status`, `halted_step_code`) sólo
//! existen en los bordes (JSON, filas SQL) y se validan al reconstruir.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::StepCode;
use crate::errors::TrialError;

/// Status plano tal como se expone hacia afuera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialStatus {
    InProgress,
    Halted,
    Completed,
}

impl TrialStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TrialStatus::InProgress => "in_progress",
            TrialStatus::Halted => "halted",
            TrialStatus::Completed => "completed",
        }
    }

    /// `in_progress` -> `IN PROGRESS` (cabecera de reportes).
    pub fn label(self) -> String {
        self.as_str().to_ascii_uppercase().replace('_', " ")
    }
}

impl FromStr for TrialStatus {
    type Err = TrialError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "in_progress" => Ok(TrialStatus::InProgress),
            "halted" => Ok(TrialStatus::Halted),
            "completed" => Ok(TrialStatus::Completed),
            other => Err(TrialError::Validation(format!("unknown trial status '{other}'"))),
        }
    }
}

impl fmt::Display for TrialStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Estado de negocio del trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StateColumns", into = "StateColumns")]
pub enum TrialState {
    InProgress,
    Halted { step: StepCode },
    Completed,
}

impl TrialState {
    pub fn status(&self) -> TrialStatus {
        match self {
            TrialState::InProgress => TrialStatus::InProgress,
            TrialState::Halted { .. } => TrialStatus::Halted,
            TrialState::Completed => TrialStatus::Completed,
        }
    }

    pub fn halted_step(&self) -> Option<StepCode> {
        match self {
            TrialState::Halted { step } => Some(*step),
            _ => None,
        }
    }

    /// Reconstruye el estado desde columnas de almacenamiento, rechazando filas
    /// que violen la invariante del puntero de halt.
    pub fn from_columns(status: &str, halted_step_code: Option<&str>) -> Result<Self, TrialError> {
        let status: TrialStatus = status.parse()?;
        let halted = halted_step_code.map(str::parse::<StepCode>).transpose()?;
        StateColumns { status, halted_step_code: halted }.try_into()
    }
}

impl Default for TrialState {
    fn default() -> Self {
        TrialState::InProgress
    }
}

/// Representación plana (`status` + `haltedStepCode`) usada por serde.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StateColumns {
    status: TrialStatus,
    #[serde(default)]
    halted_step_code: Option<StepCode>,
}

impl TryFrom<StateColumns> for TrialState {
    type Error = TrialError;

    fn try_from(cols: StateColumns) -> Result<Self, Self::Error> {
        match (cols.status, cols.halted_step_code) {
            (TrialStatus::Halted, Some(step)) => Ok(TrialState::Halted { step }),
            (TrialStatus::InProgress, None) => Ok(TrialState::InProgress),
            (TrialStatus::Completed, None) => Ok(TrialState::Completed),
            (status, halted) => Err(TrialError::Validation(format!("inconsistent trial state: status={status} halted_step_code={halted:?}"))),
        }
    }
}

impl From<TrialState> for StateColumns {
    fn from(state: TrialState) -> Self {
        StateColumns { status: state.status(),
                       halted_step_code: state.halted_step() }
    }
}

impl fmt::Display for TrialState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrialState::Halted { step } => write!(f, "halted@{step}"),
            other => f.write_str(other.status().as_str()),
        }
    }
}
