use serde_json::{json, Value};
use trial_core::{InMemoryTrialStore, StepCode, TrialError, TrialService, TrialState, TrialStatus, Verdict, WorkflowPolicy};
use uuid::Uuid;

fn service() -> TrialService<InMemoryTrialStore> {
    TrialService::new(InMemoryTrialStore::new(), WorkflowPolicy::default())
}

fn submit(svc: &TrialService<InMemoryTrialStore>, id: Uuid, code: &str, verdict: &str) -> TrialState {
    svc.submit_step(id, code, json!({"hod": "QA"}), Some(verdict), None).unwrap().trial.state
}

/// El halt pointer existe sii el status es halted, también en la forma
/// serializada que ven los clientes.
fn assert_halt_invariant(svc: &TrialService<InMemoryTrialStore>, id: Uuid) {
    let detail = svc.trial(id).unwrap();
    let v = serde_json::to_value(&detail).unwrap();
    let halted = v["status"] == json!("halted");
    assert_eq!(halted, !v["haltedStepCode"].is_null(), "status/haltedStepCode mismatch: {v}");
}

#[test]
fn scenario_t100_halt_on_last_step_then_complete() {
    let svc = service();
    let t = svc.create_trial("T-100", "PartX").unwrap();
    for code in ["DPT1", "DPT2", "DPT3", "DPT4", "DPT5"] {
        assert_eq!(submit(&svc, t.id, code, "ok"), TrialState::InProgress);
        assert_halt_invariant(&svc, t.id);
    }
    assert_eq!(submit(&svc, t.id, "DPT6", "not_ok"), TrialState::Halted { step: StepCode::Dpt6 });
    assert_halt_invariant(&svc, t.id);
    assert_eq!(submit(&svc, t.id, "DPT6", "ok"), TrialState::Completed);
    assert_halt_invariant(&svc, t.id);

    let detail = svc.trial(t.id).unwrap();
    assert_eq!(detail.steps.len(), 6);
    assert!(detail.steps.iter().all(|r| r.verdict == Verdict::Ok));
}

#[test]
fn scenario_t200_single_ok_stays_in_progress() {
    let svc = service();
    let t = svc.create_trial("T-200", "Bracket").unwrap();
    assert_eq!(submit(&svc, t.id, "DPT1", "ok"), TrialState::InProgress);
    let summary = svc.trial(t.id).unwrap().summary();
    assert_eq!((summary.steps_count, summary.completed_steps, summary.progress_percent()), (1, 1, 16));
}

#[test]
fn duplicate_trial_number_conflicts_and_keeps_the_original() {
    let svc = service();
    let original = svc.create_trial("T-100", "PartX").unwrap();
    submit(&svc, original.id, "DPT1", "ok");

    let err = svc.create_trial("T-100", "Other").unwrap_err();
    assert!(matches!(err, TrialError::Conflict(_)));

    let kept = svc.trial_by_number("T-100").unwrap();
    assert_eq!(kept.trial.id, original.id);
    assert_eq!(kept.trial.part_name, "PartX");
    assert_eq!(kept.steps.len(), 1);
    assert_eq!(svc.store().len(), 1);
}

#[test]
fn not_ok_halts_regardless_of_prior_status() {
    let svc = service();
    let t = svc.create_trial("T-300", "Hub").unwrap();
    for code in StepCode::ALL {
        submit(&svc, t.id, code.as_str(), "ok");
    }
    assert_eq!(svc.trial(t.id).unwrap().trial.status(), TrialStatus::Completed);

    // completed -> halted
    assert_eq!(submit(&svc, t.id, "DPT3", "not_ok"), TrialState::Halted { step: StepCode::Dpt3 });
    // halted en otro step -> el puntero se mueve
    assert_eq!(submit(&svc, t.id, "DPT5", "not_ok"), TrialState::Halted { step: StepCode::Dpt5 });
    assert_halt_invariant(&svc, t.id);
}

#[test]
fn only_ok_on_the_halted_step_resumes() {
    let svc = service();
    let t = svc.create_trial("T-400", "Hub").unwrap();
    submit(&svc, t.id, "DPT1", "ok");
    submit(&svc, t.id, "DPT2", "not_ok");

    assert_eq!(submit(&svc, t.id, "DPT1", "ok"), TrialState::Halted { step: StepCode::Dpt2 });
    assert_eq!(submit(&svc, t.id, "DPT3", "ok"), TrialState::Halted { step: StepCode::Dpt2 });
    assert_eq!(submit(&svc, t.id, "DPT2", "pending"), TrialState::Halted { step: StepCode::Dpt2 });
    assert_eq!(submit(&svc, t.id, "DPT2", "ok"), TrialState::InProgress);
    assert_halt_invariant(&svc, t.id);
}

#[test]
fn completed_requires_six_ok_records_in_both_directions() {
    let svc = service();
    let t = svc.create_trial("T-500", "Hub").unwrap();
    for code in ["DPT1", "DPT2", "DPT3", "DPT4", "DPT5"] {
        submit(&svc, t.id, code, "ok");
    }
    assert_eq!(submit(&svc, t.id, "DPT6", "pending"), TrialState::InProgress, "six records, one pending");
    assert_eq!(submit(&svc, t.id, "DPT6", "ok"), TrialState::Completed);
    assert_eq!(submit(&svc, t.id, "DPT4", "pending"), TrialState::InProgress, "pending leaves completed");
    assert_eq!(submit(&svc, t.id, "DPT4", "ok"), TrialState::Completed);
}

#[test]
fn out_of_order_submissions_are_accepted_by_default() {
    let svc = service();
    let t = svc.create_trial("T-600", "Hub").unwrap();
    for code in ["DPT6", "DPT4", "DPT2", "DPT5", "DPT3"] {
        assert_eq!(submit(&svc, t.id, code, "ok"), TrialState::InProgress);
    }
    assert_eq!(submit(&svc, t.id, "DPT1", "ok"), TrialState::Completed);
}

#[test]
fn repeated_submission_is_idempotent() {
    let svc = service();
    let t = svc.create_trial("T-700", "Hub").unwrap();
    let first = svc.submit_step(t.id, "DPT2", json!({"carbon": 3.4}), Some("not_ok"), Some("slag".into()))
                   .unwrap();
    let second = svc.submit_step(t.id, "DPT2", json!({"carbon": 3.4}), Some("not_ok"), Some("slag".into()))
                    .unwrap();
    assert_eq!(first.trial.state, second.trial.state);
    assert_eq!(first.record.id, second.record.id);
    assert_eq!(second.record.payload, first.record.payload);

    let detail = svc.trial(t.id).unwrap();
    assert_eq!(detail.steps.len(), 1);
    assert_eq!(detail.steps[0].remarks.as_deref(), Some("slag"));
}

#[test]
fn invalid_step_code_or_verdict_writes_nothing() {
    let svc = service();
    let t = svc.create_trial("T-800", "Hub").unwrap();
    let before = svc.trial(t.id).unwrap();

    let err = svc.submit_step(t.id, "DPT7", json!({}), Some("ok"), None).unwrap_err();
    assert_eq!(err, TrialError::InvalidStepCode("DPT7".into()));
    let err = svc.submit_step(t.id, "DPT1", json!({}), None, None).unwrap_err();
    assert!(matches!(err, TrialError::InvalidVerdict(_)));
    let err = svc.submit_step(t.id, "DPT1", Value::Bool(true), Some("ok"), None).unwrap_err();
    assert!(matches!(err, TrialError::Validation(_)));

    assert_eq!(svc.trial(t.id).unwrap(), before);
}

#[test]
fn strict_policy_rejects_out_of_sequence_and_bad_fields() {
    let svc = TrialService::new(InMemoryTrialStore::new(), WorkflowPolicy::strict());
    let t = svc.create_trial("T-900", "Hub").unwrap();

    let err = svc.submit_step(t.id, "DPT2", json!({}), Some("pending"), None).unwrap_err();
    assert_eq!(err,
               TrialError::OutOfSequence { step: StepCode::Dpt2,
                                           blocking: StepCode::Dpt1 });

    let err = svc.submit_step(t.id, "DPT1", json!({"trialNo": "T-900"}), Some("ok"), None).unwrap_err();
    assert!(matches!(err, TrialError::Validation(ref m) if m.contains("Part Name is required")), "{err}");

    // pending no valida campos
    svc.submit_step(t.id, "DPT1", json!({}), Some("pending"), None).unwrap();
    assert!(svc.trial(t.id).unwrap().record(StepCode::Dpt1).is_some());
}
