// src/web/handlers/job_handlers.rs
use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::{Responder, State};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::error::ReasonCode;
use crate::job_acquisition::{ExtractionOutcome, OcrError, SuggestedAction};
use crate::web::types::{
    DataResponse, ErrorResponse, JobDescriptionData, ManualFallbackResponse, OcrRequest,
    ScrapeJobRequest,
};
use crate::Services;

#[derive(Responder)]
pub enum ScrapeResponse {
    Extracted(Json<DataResponse<JobDescriptionData>>),
    Fallback(Json<ManualFallbackResponse>),
    Failed(status::Custom<Json<ErrorResponse>>),
}

pub type ApiError = status::Custom<Json<ErrorResponse>>;

fn api_error(reason: ReasonCode, body: ErrorResponse) -> ApiError {
    let status = Status::from_code(reason.http_status()).unwrap_or(Status::InternalServerError);
    status::Custom(status, Json(body))
}

pub async fn scrape_job_handler(
    request: Json<ScrapeJobRequest>,
    auth: AuthenticatedUser,
    services: &State<Services>,
) -> ScrapeResponse {
    let request_id = Uuid::new_v4().to_string();
    let url = request.url.trim().to_string();
    info!(
        "User {} requested job extraction for {} (request {})",
        auth.user_id, url, request_id
    );

    let outcome = services
        .orchestrator
        .acquire_tracked(&url, &request_id)
        .await;

    match outcome {
        ExtractionOutcome::Success {
            text,
            source_strategy,
        } => {
            info!(
                "Extracted {} chars for user {} via {:?}",
                text.chars().count(),
                auth.user_id,
                source_strategy
            );
            ScrapeResponse::Extracted(Json(DataResponse::success(
                JobDescriptionData {
                    job_description: text,
                    source_strategy: Some(source_strategy),
                },
                Some(request_id),
            )))
        }
        ExtractionOutcome::NeedsManualFallback {
            reason_code,
            suggested_action,
            partial_identifier,
            message,
        } => {
            warn!(
                "Server-side extraction exhausted for {} ({:?}), suggesting {:?}",
                url, reason_code, suggested_action
            );
            let frontend_fetch = suggested_action == SuggestedAction::ClientSideFetch;
            if !frontend_fetch && reason_code.http_status() != 200 {
                return ScrapeResponse::Failed(api_error(
                    reason_code,
                    ErrorResponse::for_reason(reason_code, message)
                        .with_suggested_action(suggested_action),
                ));
            }
            ScrapeResponse::Fallback(Json(ManualFallbackResponse {
                success: false,
                needs_frontend_fetch: frontend_fetch,
                job_id: partial_identifier,
                original_url: url,
                message,
                suggested_action,
                reason_code,
                request_id,
            }))
        }
        ExtractionOutcome::Failure {
            reason_code,
            message,
        } => {
            error!("Job extraction failed for {}: {}", url, message);
            let mut body = ErrorResponse::for_reason(reason_code, message);
            if reason_code == ReasonCode::UnsupportedSource {
                body = body.with_supported_sites(services.orchestrator.rules().site_names());
            }
            ScrapeResponse::Failed(api_error(reason_code, body))
        }
    }
}

pub async fn ocr_job_handler(
    request: Json<OcrRequest>,
    auth: AuthenticatedUser,
    services: &State<Services>,
) -> Result<Json<DataResponse<JobDescriptionData>>, ApiError> {
    info!(
        "User {} uploaded a screenshot ({} bytes encoded)",
        auth.user_id,
        request.image_data.len()
    );

    match services
        .ocr
        .extract_text_from_payload(request.image_data.as_bytes())
        .await
    {
        Ok(text) => Ok(Json(DataResponse::success(
            JobDescriptionData {
                job_description: text,
                source_strategy: None,
            },
            None,
        ))),
        Err(e) => {
            warn!("OCR failed for user {}: {}", auth.user_id, e);
            let reason = e.reason_code();
            let mut body = ErrorResponse::for_reason(reason, e.user_message());
            if matches!(e, OcrError::Insufficient { .. }) {
                body = body.with_suggested_action(SuggestedAction::ManualPaste);
            }
            Err(api_error(reason, body))
        }
    }
}
