//! Máquina de estados del trial.
//!
//! Es pura y determinista: no toca almacenamiento. El store la invoca dentro
//! de la misma unidad atómica en la que escribe el registro del step, en dos
//! momentos:
//! 1. `admit` antes de escribir (precondiciones de la política).
//! 2. `next_state` después de escribir, con el conjunto de registros ya
//!    actualizado.
use crate::catalog;
use crate::constants::STEP_COUNT;
use crate::errors::TrialError;
use crate::model::{StepCode, StepRecord, StepSubmission, TrialState, Verdict};

use super::WorkflowPolicy;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkflowMachine {
    policy: WorkflowPolicy,
}

impl WorkflowMachine {
    pub fn new(policy: WorkflowPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> WorkflowPolicy {
        self.policy
    }

    /// Precondiciones de una submission.
    ///
    /// - `validate_fields`: el payload debe cumplir el catálogo cuando el
    ///   veredicto está decidido (`ok` / `not_ok`).
    /// - `enforce_step_order`: todos los steps de menor orden deben tener
    ///   veredicto `ok`. Cualquier step puede reenviarse mientras eso se cumpla.
    ///
    /// Con ambas desactivadas (default) toda submission bien formada se acepta.
    pub fn admit(&self, records: &[StepRecord], submission: &StepSubmission) -> Result<(), TrialError> {
        if self.policy.validate_fields && submission.verdict.is_decided() {
            catalog::step(submission.step).validate_payload(&submission.payload)?;
        }
        if self.policy.enforce_step_order {
            let blocking = submission.step.predecessors().iter().copied().find(|code| {
                                                                           !records.iter().any(|r| r.step_code == *code && r.is_ok())
                                                                       });
            if let Some(blocking) = blocking {
                return Err(TrialError::OutOfSequence { step: submission.step,
                                                       blocking });
            }
        }
        Ok(())
    }

    /// Calcula el estado siguiente del trial.
    ///
    /// Reglas, en orden:
    /// 1. `not_ok` en `step` -> `Halted { step }` sin importar el estado previo.
    /// 2. Si el trial está detenido en otro step, o el step detenido recibe
    ///    algo distinto de `ok`, el halt se mantiene.
    /// 3. En otro caso (no detenido, o `ok` sobre el step detenido) el estado
    ///    se deriva de los registros: `Completed` sii hay exactamente seis
    ///    registros y todos son `ok`; si no, `InProgress`.
    pub fn next_state(&self, current: TrialState, step: StepCode, verdict: Verdict, records: &[StepRecord]) -> TrialState {
        if verdict == Verdict::NotOk {
            return TrialState::Halted { step };
        }
        if let TrialState::Halted { step: halted } = current {
            if halted != step || verdict != Verdict::Ok {
                return current;
            }
        }
        if all_steps_approved(records) {
            TrialState::Completed
        } else {
            TrialState::InProgress
        }
    }
}

/// `true` sii los seis códigos del catálogo tienen un registro `ok`.
pub fn all_steps_approved(records: &[StepRecord]) -> bool {
    records.len() == STEP_COUNT
    && StepCode::ALL.iter()
                    .all(|code| records.iter().any(|r| r.step_code == *code && r.is_ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::{json, Map};
    use uuid::Uuid;

    fn rec(code: StepCode, verdict: Verdict) -> StepRecord {
        let sub = StepSubmission::new(code, Map::new(), verdict, None);
        StepRecord::from_submission(Uuid::nil(), &sub, None, Utc::now())
    }

    fn all_ok() -> Vec<StepRecord> {
        StepCode::ALL.iter().map(|c| rec(*c, Verdict::Ok)).collect()
    }

    #[test]
    fn not_ok_always_halts_at_submitted_step() {
        let m = WorkflowMachine::default();
        for current in [TrialState::InProgress,
                        TrialState::Completed,
                        TrialState::Halted { step: StepCode::Dpt2 }]
        {
            let next = m.next_state(current, StepCode::Dpt5, Verdict::NotOk, &[rec(StepCode::Dpt5, Verdict::NotOk)]);
            assert_eq!(next, TrialState::Halted { step: StepCode::Dpt5 });
        }
    }

    #[test]
    fn only_ok_on_the_halted_step_clears_the_halt() {
        let m = WorkflowMachine::default();
        let halted = TrialState::Halted { step: StepCode::Dpt3 };
        let records = vec![rec(StepCode::Dpt1, Verdict::Ok), rec(StepCode::Dpt2, Verdict::Ok), rec(StepCode::Dpt3, Verdict::Ok)];
        // ok en otro step ya aprobado: sigue detenido
        assert_eq!(m.next_state(halted, StepCode::Dpt1, Verdict::Ok, &records), halted);
        // pending en el step detenido: sigue detenido
        assert_eq!(m.next_state(halted, StepCode::Dpt3, Verdict::Pending, &records), halted);
        // ok en el step detenido: reanuda
        assert_eq!(m.next_state(halted, StepCode::Dpt3, Verdict::Ok, &records), TrialState::InProgress);
    }

    #[test]
    fn clearing_the_last_halt_can_complete_the_trial() {
        let m = WorkflowMachine::default();
        let next = m.next_state(TrialState::Halted { step: StepCode::Dpt6 }, StepCode::Dpt6, Verdict::Ok, &all_ok());
        assert_eq!(next, TrialState::Completed);
    }

    #[test]
    fn completion_requires_six_ok_records() {
        let m = WorkflowMachine::default();
        let five: Vec<StepRecord> = all_ok().into_iter().take(5).collect();
        assert_eq!(m.next_state(TrialState::InProgress, StepCode::Dpt5, Verdict::Ok, &five), TrialState::InProgress);

        let mut six = all_ok();
        assert_eq!(m.next_state(TrialState::InProgress, StepCode::Dpt6, Verdict::Ok, &six), TrialState::Completed);

        six[2] = rec(StepCode::Dpt3, Verdict::Pending);
        assert_eq!(m.next_state(TrialState::Completed, StepCode::Dpt3, Verdict::Pending, &six),
                   TrialState::InProgress,
                   "a pending record takes the trial out of completed");
    }

    #[test]
    fn admit_is_permissive_by_default() {
        let m = WorkflowMachine::default();
        let sub = StepSubmission::new(StepCode::Dpt4, Map::new(), Verdict::Ok, None);
        assert!(m.admit(&[], &sub).is_ok());
    }

    #[test]
    fn admit_enforces_order_when_configured() {
        let m = WorkflowMachine::new(WorkflowPolicy { enforce_step_order: true,
                                                      validate_fields: false });
        let sub = StepSubmission::new(StepCode::Dpt3, Map::new(), Verdict::Ok, None);
        let records = vec![rec(StepCode::Dpt1, Verdict::Ok), rec(StepCode::Dpt2, Verdict::NotOk)];
        assert_eq!(m.admit(&records, &sub),
                   Err(TrialError::OutOfSequence { step: StepCode::Dpt3,
                                                   blocking: StepCode::Dpt2 }));
        let records = vec![rec(StepCode::Dpt1, Verdict::Ok), rec(StepCode::Dpt2, Verdict::Ok)];
        assert!(m.admit(&records, &sub).is_ok());
        // reenviar un step anterior siempre es posible
        let first = StepSubmission::new(StepCode::Dpt1, Map::new(), Verdict::NotOk, None);
        assert!(m.admit(&records, &first).is_ok());
    }

    #[test]
    fn admit_validates_fields_only_for_decided_verdicts() {
        let m = WorkflowMachine::new(WorkflowPolicy { enforce_step_order: false,
                                                      validate_fields: true });
        let empty_pending = StepSubmission::new(StepCode::Dpt4, Map::new(), Verdict::Pending, None);
        assert!(m.admit(&[], &empty_pending).is_ok());
        let empty_ok = StepSubmission::new(StepCode::Dpt4, Map::new(), Verdict::Ok, None);
        assert!(matches!(m.admit(&[], &empty_ok), Err(TrialError::Validation(_))));
        let full = json!({"mouldThickness": 30, "compressability": 38, "squeezePressure": 10.5, "mouldHardness": 85, "hod": "MK"});
        let full_ok = StepSubmission::new(StepCode::Dpt4, full.as_object().cloned().unwrap(), Verdict::Ok, None);
        assert!(m.admit(&[], &full_ok).is_ok());
    }
}
