//! Registro de validación por (trial, step) y la submission que lo produce.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::{StepCode, Verdict};
use crate::errors::TrialError;

/// Payload de un step: nombre de campo -> valor. La forma la define el
/// catálogo para cada `StepCode`.
pub type StepPayload = Map<String, Value>;

/// Registro persistido de un departamento para un trial. A lo sumo uno por
/// (`trial_id`, `step_code`); las submissions posteriores lo sobrescriben.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
    pub id: Uuid,
    pub trial_id: Uuid,
    pub step_code: StepCode,
    #[serde(rename = "data")]
    pub payload: StepPayload,
    #[serde(rename = "validationStatus")]
    pub verdict: Verdict,
    pub remarks: Option<String>,
    /// Presente sii `verdict != pending`.
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StepRecord {
    /// Construye el registro resultante de aplicar `submission`.
    ///
    /// Si ya existía un registro para el mismo step se conserva su `id` y
    /// `created_at` (overwrite, nunca duplicado).
    pub fn from_submission(trial_id: Uuid,
                           submission: &StepSubmission,
                           existing: Option<&StepRecord>,
                           now: DateTime<Utc>)
                           -> StepRecord {
        let (id, created_at) = existing.map(|r| (r.id, r.created_at)).unwrap_or_else(|| (Uuid::new_v4(), now));
        StepRecord { id,
                     trial_id,
                     step_code: submission.step,
                     payload: submission.payload.clone(),
                     verdict: submission.verdict,
                     remarks: submission.remarks.clone(),
                     completed_at: submission.verdict.is_decided().then_some(now),
                     created_at,
                     updated_at: now }
    }

    pub fn is_ok(&self) -> bool {
        self.verdict == Verdict::Ok
    }

    pub fn order_index(&self) -> usize {
        self.step_code.order_index()
    }
}

/// Submission ya validada de un step (código y veredicto tipados).
#[derive(Debug, Clone, PartialEq)]
pub struct StepSubmission {
    pub step: StepCode,
    pub payload: StepPayload,
    pub verdict: Verdict,
    pub remarks: Option<String>,
}

impl StepSubmission {
    pub fn new(step: StepCode, payload: StepPayload, verdict: Verdict, remarks: Option<String>) -> Self {
        Self { step,
               payload,
               verdict,
               remarks: remarks.map(|r| r.trim().to_string()).filter(|r| !r.is_empty()) }
    }

    /// Parseo desde entrada cruda (API/CLI). El orden de validación es fijo:
    /// step code, veredicto, payload. Ningún error deja escrituras parciales
    /// porque todo ocurre antes de tocar el store.
    pub fn parse(step_code: &str, payload: Value, verdict: Option<&str>, remarks: Option<String>) -> Result<Self, TrialError> {
        let step: StepCode = step_code.parse()?;
        let verdict = Verdict::parse(verdict)?;
        let payload = payload_from_value(payload)?;
        Ok(Self::new(step, payload, verdict, remarks))
    }
}

/// `null` se interpreta como payload vacío; cualquier otro no-objeto se rechaza.
pub fn payload_from_value(value: Value) -> Result<StepPayload, TrialError> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(TrialError::Validation(format!("step data must be a JSON object, got {}", json_kind(&other)))),
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
