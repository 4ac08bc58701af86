//! Códigos de step y veredictos.
//!
//! `StepCode` sólo puede representar los seis códigos del catálogo; cualquier
//! otro texto se rechaza en el borde con `TrialError::InvalidStepCode`.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::STEP_COUNT;
use crate::errors::TrialError;

/// Código de departamento (`DPT1`..`DPT6`), ordenado por `order_index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StepCode {
    #[serde(rename = "DPT1")] Dpt1,
    #[serde(rename = "DPT2")] Dpt2,
    #[serde(rename = "DPT3")] Dpt3,
    #[serde(rename = "DPT4")] Dpt4,
    #[serde(rename = "DPT5")] Dpt5,
    #[serde(rename = "DPT6")] Dpt6,
}

impl StepCode {
    /// Todos los códigos en orden de catálogo.
    pub const ALL: [StepCode; STEP_COUNT] =
        [StepCode::Dpt1, StepCode::Dpt2, StepCode::Dpt3, StepCode::Dpt4, StepCode::Dpt5, StepCode::Dpt6];

    pub fn as_str(self) -> &'static str {
        match self {
            StepCode::Dpt1 => "DPT1",
            StepCode::Dpt2 => "DPT2",
            StepCode::Dpt3 => "DPT3",
            StepCode::Dpt4 => "DPT4",
            StepCode::Dpt5 => "DPT5",
            StepCode::Dpt6 => "DPT6",
        }
    }

    /// Índice de orden 1-based dentro del catálogo.
    pub fn order_index(self) -> usize {
        self as usize + 1
    }

    /// Inversa de `order_index` (1-based). `None` fuera de 1..=6.
    pub fn from_order_index(order_index: usize) -> Option<StepCode> {
        order_index.checked_sub(1).and_then(|i| Self::ALL.get(i).copied())
    }

    /// Steps con `order_index` estrictamente menor.
    pub fn predecessors(self) -> &'static [StepCode] {
        &Self::ALL[..self as usize]
    }

    pub fn is_last(self) -> bool {
        self.order_index() == STEP_COUNT
    }
}

impl FromStr for StepCode {
    type Err = TrialError;

    /// Acepta mayúsculas/minúsculas y espacios alrededor (`" dpt3 "`).
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_uppercase();
        Self::ALL.iter()
                 .copied()
                 .find(|c| c.as_str() == normalized)
                 .ok_or_else(|| TrialError::InvalidStepCode(raw.to_string()))
    }
}

impl fmt::Display for StepCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Veredicto de un departamento.
///
/// - `Ok`: permite avanzar.
/// - `NotOk`: detiene (halt) el trial.
/// - `Pending`: aún sin decidir; no fija `completed_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Ok,
    NotOk,
    Pending,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Ok => "ok",
            Verdict::NotOk => "not_ok",
            Verdict::Pending => "pending",
        }
    }

    /// Etiqueta para reportes (`OK`, `NOT OK`, `PENDING`).
    pub fn badge(self) -> &'static str {
        match self {
            Verdict::Ok => "OK",
            Verdict::NotOk => "NOT OK",
            Verdict::Pending => "PENDING",
        }
    }

    pub fn is_decided(self) -> bool {
        !matches!(self, Verdict::Pending)
    }

    /// Parseo desde entrada opcional: ausencia o valor fuera del conjunto
    /// produce `TrialError::InvalidVerdict`.
    pub fn parse(raw: Option<&str>) -> Result<Verdict, TrialError> {
        match raw {
            None => Err(TrialError::InvalidVerdict(String::new())),
            Some(v) => v.parse(),
        }
    }
}

impl FromStr for Verdict {
    type Err = TrialError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "ok" => Ok(Verdict::Ok),
            "not_ok" => Ok(Verdict::NotOk),
            "pending" => Ok(Verdict::Pending),
            _ => Err(TrialError::InvalidVerdict(raw.to_string())),
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
