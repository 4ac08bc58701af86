//! Cuerpos JSON de la API (camelCase).
use serde::{Deserialize, Serialize};
use serde_json::Value;
use trial_core::{StepCode, TrialReport, TrialStatus};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTrialRequest {
    #[serde(default)]
    pub trial_no: Option<String>,
    #[serde(default)]
    pub part_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitStepRequest {
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub validation_status: Option<String>,
    #[serde(default)]
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitStepResponse {
    pub success: bool,
    pub status: TrialStatus,
    pub halted_step_code: Option<StepCode>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    #[serde(flatten)]
    pub report: TrialReport,
    pub file_name: String,
    pub share_url: String,
    pub text: String,
}

impl ReportResponse {
    pub fn new(report: TrialReport, public_url: &str) -> Self {
        Self { file_name: report.pdf_file_name(),
               share_url: report.share_url(public_url),
               text: report.render_text(),
               report }
    }
}
