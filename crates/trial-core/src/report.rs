//! Proyección de sólo lectura de un trial a un reporte imprimible.
//!
//! El reporte respeta el orden del catálogo y muestra, por departamento, el
//! badge de veredicto, los campos declarados, remarks y fecha de cierre. Los
//! bytes del PDF y la imagen QR quedan fuera: aquí sólo se producen el texto,
//! el nombre de archivo y la URL compartible que codifica el QR.
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::catalog::{self, FieldDefinition, FieldType};
use crate::constants::{NOT_SPECIFIED, REPORT_TITLE};
use crate::model::{StepCode, TrialDetail, TrialStatus, Verdict};

/// Badge de un departamento en el reporte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SectionBadge {
    #[serde(rename = "OK")] Ok,
    #[serde(rename = "NOT OK")] NotOk,
    #[serde(rename = "PENDING")] Pending,
    #[serde(rename = "NOT STARTED")] NotStarted,
}

impl SectionBadge {
    pub fn label(self) -> &'static str {
        match self {
            SectionBadge::Ok => Verdict::Ok.badge(),
            SectionBadge::NotOk => Verdict::NotOk.badge(),
            SectionBadge::Pending => Verdict::Pending.badge(),
            SectionBadge::NotStarted => "NOT STARTED",
        }
    }
}

impl From<Option<Verdict>> for SectionBadge {
    fn from(verdict: Option<Verdict>) -> Self {
        match verdict {
            Some(Verdict::Ok) => SectionBadge::Ok,
            Some(Verdict::NotOk) => SectionBadge::NotOk,
            Some(Verdict::Pending) => SectionBadge::Pending,
            None => SectionBadge::NotStarted,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportField {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSection {
    pub code: StepCode,
    pub name: &'static str,
    pub badge: SectionBadge,
    /// Vacío cuando el departamento no tiene registro.
    pub fields: Vec<ReportField>,
    pub remarks: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialReport {
    pub trial_id: Uuid,
    pub trial_no: String,
    pub part_name: String,
    pub status: TrialStatus,
    pub halted_step_code: Option<StepCode>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub sections: Vec<ReportSection>,
}

impl TrialReport {
    pub fn build(detail: &TrialDetail) -> Self {
        let sections = catalog::catalog().iter()
                                         .map(|def| {
                                             let record = detail.record(def.code);
                                             let fields = match record {
                                                 Some(r) => def.fields
                                                               .iter()
                                                               .map(|f| ReportField { label: f.label,
                                                                                      value: display_value(f, r.payload.get(f.name)) })
                                                               .collect(),
                                                 None => Vec::new(),
                                             };
                                             ReportSection { code: def.code,
                                                             name: def.name,
                                                             badge: record.map(|r| r.verdict).into(),
                                                             fields,
                                                             remarks: record.and_then(|r| r.remarks.clone()),
                                                             completed_at: record.and_then(|r| r.completed_at) }
                                         })
                                         .collect();
        let trial = &detail.trial;
        TrialReport { trial_id: trial.id,
                      trial_no: trial.trial_no.clone(),
                      part_name: trial.part_name.clone(),
                      status: trial.status(),
                      halted_step_code: trial.halted_step(),
                      created_at: trial.created_at,
                      updated_at: trial.updated_at,
                      sections }
    }

    pub fn section(&self, code: StepCode) -> Option<&ReportSection> {
        self.sections.iter().find(|s| s.code == code)
    }

    /// `Trial_<trial_no>_Report.pdf`
    pub fn pdf_file_name(&self) -> String {
        format!("Trial_{}_Report.pdf", self.trial_no)
    }

    /// URL que codifica el QR: `<base>/trial/<id>/report`.
    pub fn share_url(&self, base: &str) -> String {
        format!("{}/trial/{}/report", base.trim_end_matches('/'), self.trial_id)
    }

    /// Documento imprimible en texto plano.
    pub fn render_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TrialReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{REPORT_TITLE}")?;
        writeln!(f, "Trial No: {}", self.trial_no)?;
        writeln!(f, "Part Name: {}", self.part_name)?;
        match self.halted_step_code {
            Some(step) => writeln!(f, "Status: {} ({step})", self.status.label())?,
            None => writeln!(f, "Status: {}", self.status.label())?,
        }
        writeln!(f, "Created: {}", self.created_at.format("%Y-%m-%d"))?;
        writeln!(f, "Updated: {}", self.updated_at.format("%Y-%m-%d"))?;

        for section in &self.sections {
            writeln!(f)?;
            writeln!(f, "{}", section.name)?;
            if section.badge == SectionBadge::NotStarted {
                writeln!(f, "  Not started")?;
                continue;
            }
            writeln!(f, "  Status: {}", section.badge.label())?;
            for field in &section.fields {
                writeln!(f, "  {}: {}", field.label, field.value)?;
            }
            if let Some(remarks) = &section.remarks {
                writeln!(f, "  Remarks: {remarks}")?;
            }
            if let Some(at) = section.completed_at {
                writeln!(f, "  Completed: {}", at.format("%Y-%m-%d %H:%M:%S UTC"))?;
            }
        }
        Ok(())
    }
}

/// Valor de un campo según su tipo declarado. Checkbox: `Yes` si el valor es
/// "verdadero" (bool true, número distinto de cero, texto no vacío).
fn display_value(field: &FieldDefinition, value: Option<&Value>) -> String {
    if field.field_type == FieldType::Checkbox {
        let checked = match value {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Array(_)) | Some(Value::Object(_)) => true,
            Some(Value::Null) | None => false,
        };
        return if checked { "Yes" } else { "No" }.to_string();
    }
    match value {
        None | Some(Value::Null) => NOT_SPECIFIED.to_string(),
        Some(Value::String(s)) if s.is_empty() => NOT_SPECIFIED.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewTrial, StepRecord, StepSubmission, Trial, TrialState};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn detail(state: TrialState, records: &[(StepCode, Verdict, Value)]) -> TrialDetail {
        let mut trial = Trial::create(NewTrial::new("T-100", "PartX").unwrap(), Utc::now());
        trial.state = state;
        let steps = records.iter()
                           .map(|(code, verdict, data)| {
                               let sub = StepSubmission::new(*code,
                                                             data.as_object().cloned().unwrap_or_default(),
                                                             *verdict,
                                                             None);
                               StepRecord::from_submission(trial.id, &sub, None, Utc::now())
                           })
                           .collect();
        TrialDetail::new(trial, steps)
    }

    #[test]
    fn sections_follow_catalog_order_with_badges() {
        let d = detail(TrialState::Halted { step: StepCode::Dpt3 },
                       &[(StepCode::Dpt3, Verdict::NotOk, json!({})),
                         (StepCode::Dpt1, Verdict::Ok, json!({})),
                         (StepCode::Dpt2, Verdict::Pending, json!({}))]);
        let report = TrialReport::build(&d);
        let badges: Vec<&str> = report.sections.iter().map(|s| s.badge.label()).collect();
        assert_eq!(badges, vec!["OK", "PENDING", "NOT OK", "NOT STARTED", "NOT STARTED", "NOT STARTED"]);
        assert!(report.section(StepCode::Dpt4).unwrap().fields.is_empty());
        assert_eq!(report.halted_step_code, Some(StepCode::Dpt3));
    }

    #[test]
    fn field_values_render_by_type() {
        let def = FieldDefinition { name: "flag",
                                    label: "Flag",
                                    field_type: FieldType::Checkbox,
                                    required: false,
                                    options: &[] };
        assert_eq!(display_value(&def, Some(&json!(true))), "Yes");
        assert_eq!(display_value(&def, Some(&json!(false))), "No");
        assert_eq!(display_value(&def, None), "No");

        let d = detail(TrialState::InProgress,
                       &[(StepCode::Dpt4, Verdict::Ok, json!({"mouldThickness": 30, "hod": "", "compressability": null}))]);
        let section = TrialReport::build(&d).section(StepCode::Dpt4).cloned().unwrap();
        let value_of = |label: &str| section.fields.iter().find(|f| f.label == label).map(|f| f.value.clone()).unwrap();
        assert_eq!(value_of("Mould Thickness"), "30");
        assert_eq!(value_of("HOD"), NOT_SPECIFIED);
        assert_eq!(value_of("Compressability"), NOT_SPECIFIED);
        assert_eq!(value_of("Squeeze Pressure"), NOT_SPECIFIED);
    }

    #[test]
    fn text_file_name_and_share_url() {
        let d = detail(TrialState::InProgress, &[(StepCode::Dpt1, Verdict::Ok, json!({"partName": "PartX"}))]);
        let report = TrialReport::build(&d);
        let text = report.render_text();
        assert!(text.starts_with("NPD Trial Report\n"));
        assert!(text.contains("Trial No: T-100"));
        assert!(text.contains("Status: IN PROGRESS"));
        assert!(text.contains("Part Name: PartX"));
        assert!(text.contains("Not started"));
        assert_eq!(report.pdf_file_name(), "Trial_T-100_Report.pdf");
        assert_eq!(report.share_url("http://localhost:5173/"),
                   format!("http://localhost:5173/trial/{}/report", d.trial.id));
    }

    #[test]
    fn halted_section_text_lists_every_field() {
        let d = detail(TrialState::Halted { step: StepCode::Dpt1 },
                       &[(StepCode::Dpt1, Verdict::NotOk, json!({"trialNo": "T-100"}))]);
        let report = TrialReport::build(&d);
        let text = report.render_text();
        assert_eq!(text, format!("{report}"));
        assert!(text.contains("Status: HALTED (DPT1)\n"));
        assert!(text.contains("Department 1 - General Details\n  Status: NOT OK\n  Trial No: T-100\n"));
        assert!(text.contains("  Part Name: Not specified\n"));
        assert!(text.contains("  Completed: "));
        assert_eq!(text.matches("  Not started\n").count(), 5);
    }
}
