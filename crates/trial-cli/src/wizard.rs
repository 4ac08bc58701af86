//! Recorrido interactivo del wizard por stdin/stdout.
//!
//! Comandos por paso: `e` (o Enter) carga y envía el paso, `b` vuelve, `g N`
//! salta al paso N, `q` sale. Fin de entrada equivale a `q`.
use std::io::{BufRead, Write};

use anyhow::Result;
use serde_json::{Number, Value};
use trial_core::catalog::{FieldDefinition, FieldType};
use trial_core::constants::STEP_COUNT;
use trial_core::{StepSubmitter, TrialStatus, TrialWizard, Verdict, WizardError, WizardOutcome};

enum Action {
    Enter,
    Back,
    GoTo(usize),
    Quit,
    Unknown,
}

fn parse_action(line: &str) -> Action {
    let mut parts = line.split_whitespace();
    match parts.next() {
        None | Some("e") => Action::Enter,
        Some("b") => Action::Back,
        Some("q") => Action::Quit,
        Some("g") => match parts.next().and_then(|n| n.parse::<usize>().ok()) {
            Some(n) if n >= 1 => Action::GoTo(n - 1),
            _ => Action::Unknown,
        },
        Some(_) => Action::Unknown,
    }
}

/// Convierte la entrada del operador según el tipo declarado. `None` = sin
/// cambios (se conserva el valor precargado, si lo hay).
pub fn parse_field_input(field: &FieldDefinition, raw: &str) -> Option<Value> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let value = match field.field_type {
        FieldType::Number => raw.parse::<i64>()
                                .map(Value::from)
                                .ok()
                                .or_else(|| raw.parse::<f64>().ok().and_then(Number::from_f64).map(Value::Number))
                                .unwrap_or_else(|| Value::String(raw.to_string())),
        FieldType::Checkbox => Value::Bool(matches!(raw.to_ascii_lowercase().as_str(), "y" | "yes" | "true" | "1")),
        _ => Value::String(raw.to_string()),
    };
    Some(value)
}

fn read_line<R: BufRead>(input: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

fn print_progress<W: Write>(wizard: &TrialWizard, out: &mut W) -> Result<()> {
    let line: Vec<String> = (0..STEP_COUNT).map(|i| {
                                                let badge = wizard.status_of(i).map(Verdict::badge).unwrap_or("-");
                                                let marker = if i == wizard.index() { ">" } else { " " };
                                                format!("{marker}DPT{}:{badge}", i + 1)
                                            })
                                            .collect();
    writeln!(out, "{}", line.join("  "))?;
    Ok(())
}

/// Ejecuta el wizard hasta completar el trial o hasta `q`/fin de entrada.
/// Devuelve el status que reporta la autoridad al terminar.
pub fn run<A, R, W>(wizard: &mut TrialWizard, authority: &A, mut input: R, mut out: W) -> Result<TrialStatus>
    where A: StepSubmitter + ?Sized,
          R: BufRead,
          W: Write
{
    loop {
        let step = wizard.current_step();
        writeln!(out)?;
        writeln!(out, "Step {} of {}: {}", wizard.index() + 1, STEP_COUNT, step.name)?;
        print_progress(wizard, &mut out)?;
        if !wizard.can_proceed() {
            writeln!(out, "Complete the previous step with OK status to access this step.")?;
        }
        write!(out, "[e]nter / [b]ack / [g]o N / [q]uit > ")?;
        out.flush()?;
        let Some(line) = read_line(&mut input)? else { break };
        match parse_action(&line) {
            Action::Quit => break,
            Action::Back => wizard.previous(),
            Action::GoTo(i) => {
                if let Err(e) = wizard.go_to(i) {
                    writeln!(out, "{e}")?;
                }
            }
            Action::Unknown => writeln!(out, "unknown command '{line}'")?,
            Action::Enter => {
                if !wizard.can_proceed() {
                    continue;
                }
                let prefill = wizard.prefill();
                let mut payload = prefill.as_ref().map(|p| p.payload.clone()).unwrap_or_default();
                for field in step.fields {
                    let current = payload.get(field.name).map(Value::to_string).unwrap_or_default();
                    let req = if field.required { "*" } else { "" };
                    write!(out, "  {}{req} [{}] {current}: ", field.label, field.field_type.as_str())?;
                    out.flush()?;
                    let Some(raw) = read_line(&mut input)? else { return Ok(wizard.trial().trial.status()) };
                    if let Some(value) = parse_field_input(field, &raw) {
                        payload.insert(field.name.to_string(), value);
                    }
                }
                write!(out, "  Validation status (ok / not_ok): ")?;
                out.flush()?;
                let Some(raw_verdict) = read_line(&mut input)? else { return Ok(wizard.trial().trial.status()) };
                write!(out, "  Remarks: ")?;
                out.flush()?;
                let remarks = read_line(&mut input)?.filter(|r| !r.trim().is_empty())
                                                   .or_else(|| prefill.and_then(|p| p.remarks));
                let verdict = match raw_verdict.trim() {
                    "" => Verdict::Pending,
                    other => match other.parse::<Verdict>() {
                        Ok(v) => v,
                        Err(e) => {
                            writeln!(out, "  {e}")?;
                            continue;
                        }
                    },
                };
                match wizard.submit(authority, payload, verdict, remarks) {
                    Ok(WizardOutcome::Completed) => {
                        writeln!(out, "All departments approved: trial completed.")?;
                        break;
                    }
                    Ok(WizardOutcome::Halted { step }) => writeln!(out, "Trial halted at {step}.")?,
                    Ok(WizardOutcome::Advanced { to }) => writeln!(out, "Saved. Moving to {to}.")?,
                    Ok(WizardOutcome::Stayed) => writeln!(out, "Saved.")?,
                    Err(WizardError::Trial(e)) if !e.is_client_error() => return Err(e.into()),
                    Err(e) => writeln!(out, "  {e}")?,
                }
            }
        }
    }
    Ok(wizard.trial().trial.status())
}
