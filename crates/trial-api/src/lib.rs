//! trial-api: superficie REST sobre `TrialService`.
//!
//! Las operaciones del store son síncronas (Diesel), así que cada handler las
//! corre en `spawn_blocking`. Los errores salen como `{ "error": mensaje }`.

pub mod dto;
pub mod error;

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use trial_core::catalog::StepDefinition;
use trial_core::{Trial, TrialDetail, TrialError, TrialFilter, TrialService, TrialStats, TrialStatus, TrialStore,
                 TrialSummary, WorkflowPolicy};
use uuid::Uuid;

use dto::{CreateTrialRequest, HealthResponse, ListQuery, ReportResponse, SubmitStepRequest, SubmitStepResponse};
pub use error::ApiError;

pub type SharedStore = Arc<dyn TrialStore>;

#[derive(Clone)]
pub struct ApiState {
    pub service: Arc<TrialService<SharedStore>>,
    /// Base de las URLs compartibles del reporte (QR).
    pub public_url: Arc<str>,
}

impl ApiState {
    pub fn new(store: SharedStore, policy: WorkflowPolicy, public_url: impl Into<String>) -> Self {
        let public_url: String = public_url.into();
        Self { service: Arc::new(TrialService::new(store, policy)),
               public_url: Arc::from(public_url.trim_end_matches('/')) }
    }

    /// Corre una operación del servicio en el pool bloqueante de tokio.
    async fn run<F, T>(&self, f: F) -> Result<T, ApiError>
        where F: FnOnce(&TrialService<SharedStore>) -> Result<T, TrialError> + Send + 'static,
              T: Send + 'static
    {
        let service = self.service.clone();
        tokio::task::spawn_blocking(move || f(service.as_ref())).await
                                                        .map_err(|e| ApiError::Internal(format!("worker task failed: {e}")))?
                                                        .map_err(ApiError::from)
    }
}

pub fn build_router(state: ApiState) -> Router {
    Router::new().route("/api/health", get(health))
                 .route("/api/workflow-steps", get(workflow_steps))
                 .route("/api/trials", get(list_trials).post(create_trial))
                 .route("/api/trials/stats", get(trial_stats))
                 .route("/api/trials/by-number/:trial_no", get(trial_by_number))
                 .route("/api/trials/:id", get(get_trial))
                 .route("/api/trials/:id/steps/:step_code", post(submit_step))
                 .route("/api/trials/:id/report", get(trial_report))
                 .fallback(route_not_found)
                 .layer(TraceLayer::new_for_http())
                 .layer(CorsLayer::permissive())
                 .with_state(state)
}

/// Un id que no es UUID no puede existir: se responde como trial inexistente.
fn parse_trial_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::not_found(format!("trial {raw} not found")))
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "OK",
                          timestamp: Utc::now().to_rfc3339() })
}

async fn workflow_steps() -> Json<&'static [StepDefinition]> {
    Json(trial_core::catalog::catalog())
}

async fn list_trials(State(state): State<ApiState>, Query(query): Query<ListQuery>) -> Result<Json<Vec<TrialSummary>>, ApiError> {
    let status = match query.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => Some(raw.parse::<TrialStatus>()?),
        None => None,
    };
    let filter = TrialFilter { status,
                               search: query.search };
    Ok(Json(state.run(move |svc| svc.list_trials(&filter)).await?))
}

async fn trial_stats(State(state): State<ApiState>) -> Result<Json<TrialStats>, ApiError> {
    Ok(Json(state.run(|svc| svc.stats()).await?))
}

async fn create_trial(State(state): State<ApiState>,
                      payload: Result<Json<CreateTrialRequest>, JsonRejection>)
                      -> Result<(StatusCode, Json<TrialDetail>), ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let trial_no = request.trial_no.unwrap_or_default();
    let part_name = request.part_name.unwrap_or_default();
    let trial: Trial = state.run(move |svc| svc.create_trial(&trial_no, &part_name)).await?;
    Ok((StatusCode::CREATED, Json(TrialDetail::new(trial, Vec::new()))))
}

async fn get_trial(State(state): State<ApiState>, Path(id): Path<String>) -> Result<Json<TrialDetail>, ApiError> {
    let id = parse_trial_id(&id)?;
    Ok(Json(state.run(move |svc| svc.trial(id)).await?))
}

async fn trial_by_number(State(state): State<ApiState>, Path(trial_no): Path<String>) -> Result<Json<TrialDetail>, ApiError> {
    Ok(Json(state.run(move |svc| svc.trial_by_number(&trial_no)).await?))
}

async fn submit_step(State(state): State<ApiState>,
                     Path((id, step_code)): Path<(String, String)>,
                     payload: Result<Json<SubmitStepRequest>, JsonRejection>)
                     -> Result<Json<SubmitStepResponse>, ApiError> {
    let id = parse_trial_id(&id)?;
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let outcome = state.run(move |svc| {
                           svc.submit_step(id,
                                           &step_code,
                                           request.data,
                                           request.validation_status.as_deref(),
                                           request.remarks)
                       })
                       .await?;
    Ok(Json(SubmitStepResponse { success: true,
                                 status: outcome.status(),
                                 halted_step_code: outcome.halted_step() }))
}

async fn trial_report(State(state): State<ApiState>, Path(id): Path<String>) -> Result<Json<ReportResponse>, ApiError> {
    let id = parse_trial_id(&id)?;
    let report = state.run(move |svc| svc.report(id)).await?;
    Ok(Json(ReportResponse::new(report, &state.public_url)))
}

async fn route_not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(serde_json::json!({ "error": "Route not found" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use trial_core::InMemoryTrialStore;

    fn app_with(policy: WorkflowPolicy) -> Router {
        build_router(ApiState::new(Arc::new(InMemoryTrialStore::new()), policy, "http://qr.local/"))
    }

    fn app() -> Router {
        app_with(WorkflowPolicy::default())
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method)
                                        .uri(uri)
                                        .header("content-type", "application/json")
                                        .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
                                        .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, value)
    }

    async fn create(app: &Router, trial_no: &str) -> String {
        let (status, body) = call(app, "POST", "/api/trials", Some(json!({"trialNo": trial_no, "partName": "PartX"}))).await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health_and_catalog() {
        let app = app();
        let (status, body) = call(&app, "GET", "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], json!("OK"));
        assert!(body["timestamp"].is_string());

        let (_, steps) = call(&app, "GET", "/api/workflow-steps", None).await;
        assert_eq!(steps.as_array().unwrap().len(), 6);
        assert_eq!(steps[0]["code"], json!("DPT1"));
        assert_eq!(steps[5]["name"], json!("Department 6 - Fettling & Inspection"));
    }

    #[tokio::test]
    async fn create_validates_and_rejects_duplicates() {
        let app = app();
        let (status, body) = call(&app, "POST", "/api/trials", Some(json!({"trialNo": "T-1"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("Trial number and part name are required"));

        let id = create(&app, "T-1").await;
        let (status, body) = call(&app, "POST", "/api/trials", Some(json!({"trialNo": "T-1", "partName": "B"}))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], json!("Trial number already exists"));

        let (status, body) = call(&app, "GET", &format!("/api/trials/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["partName"], json!("PartX"));
        assert_eq!(body["status"], json!("in_progress"));
        assert_eq!(body["steps"], json!([]));
    }

    #[tokio::test]
    async fn step_submission_drives_the_trial_status() {
        let app = app();
        let id = create(&app, "T-100").await;
        for code in ["DPT1", "DPT2", "DPT3", "DPT4", "DPT5"] {
            let (status, body) = call(&app,
                                      "POST",
                                      &format!("/api/trials/{id}/steps/{code}"),
                                      Some(json!({"data": {"hod": "QA"}, "validationStatus": "ok"})))
                                 .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, json!({"success": true, "status": "in_progress", "haltedStepCode": null}));
        }
        let uri = format!("/api/trials/{id}/steps/DPT6");
        let (_, body) = call(&app, "POST", &uri, Some(json!({"data": {}, "validationStatus": "not_ok"}))).await;
        assert_eq!(body, json!({"success": true, "status": "halted", "haltedStepCode": "DPT6"}));
        let (_, body) = call(&app, "POST", &uri, Some(json!({"data": {}, "validationStatus": "ok"}))).await;
        assert_eq!(body, json!({"success": true, "status": "completed", "haltedStepCode": null}));

        let (_, detail) = call(&app, "GET", "/api/trials/by-number/T-100", None).await;
        assert_eq!(detail["steps"].as_array().unwrap().len(), 6);
        assert_eq!(detail["steps"][0]["data"], json!({"hod": "QA"}));
        assert_eq!(detail["steps"][0]["validationStatus"], json!("ok"));
    }

    #[tokio::test]
    async fn bad_submissions_map_to_client_errors() {
        let app = app();
        let id = create(&app, "T-2").await;
        let (status, _) = call(&app,
                               "POST",
                               &format!("/api/trials/{id}/steps/DPT9"),
                               Some(json!({"validationStatus": "ok"})))
                          .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, body) = call(&app, "POST", &format!("/api/trials/{id}/steps/DPT1"), Some(json!({"data": {}}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("validation status"));
        let (status, _) = call(&app,
                               "POST",
                               &format!("/api/trials/{}/steps/DPT1", Uuid::new_v4()),
                               Some(json!({"validationStatus": "ok"})))
                          .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = call(&app, "GET", "/api/trials/not-a-uuid", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, detail) = call(&app, "GET", &format!("/api/trials/{id}"), None).await;
        assert_eq!(detail["steps"], json!([]), "rejected submissions write nothing");
    }

    #[tokio::test]
    async fn strict_policy_reports_out_of_sequence_as_conflict() {
        let app = app_with(WorkflowPolicy { enforce_step_order: true,
                                            validate_fields: false });
        let id = create(&app, "T-3").await;
        let (status, body) = call(&app,
                                  "POST",
                                  &format!("/api/trials/{id}/steps/DPT4"),
                                  Some(json!({"validationStatus": "ok"})))
                             .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].as_str().unwrap().contains("DPT1"));
    }

    #[tokio::test]
    async fn list_filters_and_stats() {
        let app = app();
        let a = create(&app, "A-1").await;
        create(&app, "B-1").await;
        call(&app,
             "POST",
             &format!("/api/trials/{a}/steps/DPT3"),
             Some(json!({"validationStatus": "not_ok", "remarks": "sand"})))
        .await;

        let (_, all) = call(&app, "GET", "/api/trials", None).await;
        assert_eq!(all.as_array().unwrap().len(), 2);
        assert_eq!(all[0]["trialNo"], json!("A-1"));
        assert_eq!(all[0]["stepsCount"], json!(1));
        assert_eq!(all[0]["completedSteps"], json!(0));

        let (_, halted) = call(&app, "GET", "/api/trials?status=halted", None).await;
        assert_eq!(halted.as_array().unwrap().len(), 1);
        let (_, found) = call(&app, "GET", "/api/trials?search=b-", None).await;
        assert_eq!(found[0]["trialNo"], json!("B-1"));
        let (status, _) = call(&app, "GET", "/api/trials?status=paused", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, stats) = call(&app, "GET", "/api/trials/stats", None).await;
        assert_eq!(stats, json!({"total": 2, "inProgress": 1, "halted": 1, "completed": 0}));
    }

    #[tokio::test]
    async fn report_and_fallback() {
        let app = app();
        let id = create(&app, "T-9").await;
        let (status, body) = call(&app, "GET", &format!("/api/trials/{id}/report"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["fileName"], json!("Trial_T-9_Report.pdf"));
        assert_eq!(body["shareUrl"], json!(format!("http://qr.local/trial/{id}/report")));
        assert_eq!(body["sections"][0]["badge"], json!("NOT STARTED"));
        assert!(body["text"].as_str().unwrap().starts_with("NPD Trial Report"));

        let (status, body) = call(&app, "GET", "/api/unknown", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "Route not found"}));
    }
}
