// src/web/handlers/system_handlers.rs
use rocket::serde::json::Json;
use rocket::State;

use crate::web::types::{HealthResponse, SupportedSitesResponse};
use crate::Services;

pub async fn supported_sites_handler(services: &State<Services>) -> Json<SupportedSitesResponse> {
    Json(SupportedSitesResponse {
        success: true,
        sites: services.orchestrator.rules().supported_sites(),
    })
}

pub async fn health_handler(services: &State<Services>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        llm_configured: services.llm_configured,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}
