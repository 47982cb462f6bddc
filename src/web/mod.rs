// src/web/mod.rs
pub mod handlers;
pub mod types;

pub use handlers::*;
pub use types::*;

use anyhow::Result;
use rocket::data::{Limits, ToByteUnit};
use rocket::fairing::{Fairing, Info, Kind};
use rocket::figment::Figment;
use rocket::http::{Header, Status};
use rocket::serde::json::Json;
use rocket::{catchers, get, options, post, routes, Build, Request, Response, Rocket, State};
use tracing::info;

use crate::auth::{AuthConfig, AuthenticatedUser};
use crate::config::AppConfig;
use crate::Services;

// CORS Fairing
pub struct Cors;

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "Add CORS headers to responses",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
        response.set_header(Header::new("Access-Control-Allow-Origin", "*"));
        response.set_header(Header::new("Access-Control-Allow-Methods", "POST, GET, OPTIONS"));
        response.set_header(Header::new("Access-Control-Allow-Headers", "*"));
        response.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
    }
}

#[post("/job/scrape", data = "<request>")]
pub async fn scrape_job(
    request: Json<ScrapeJobRequest>,
    auth: AuthenticatedUser,
    services: &State<Services>,
) -> ScrapeResponse {
    handlers::scrape_job_handler(request, auth, services).await
}

#[post("/job/ocr", data = "<request>")]
pub async fn ocr_job(
    request: Json<OcrRequest>,
    auth: AuthenticatedUser,
    services: &State<Services>,
) -> Result<Json<DataResponse<JobDescriptionData>>, ApiError> {
    handlers::ocr_job_handler(request, auth, services).await
}

#[get("/job/supported-sites")]
pub async fn supported_sites(services: &State<Services>) -> Json<SupportedSitesResponse> {
    handlers::supported_sites_handler(services).await
}

#[get("/health")]
pub async fn health(services: &State<Services>) -> Json<HealthResponse> {
    handlers::health_handler(services).await
}

#[options("/<_..>")]
pub async fn options() -> Status {
    Status::Ok
}

// Error catchers
#[rocket::catch(400)]
pub fn bad_request() -> Json<ErrorResponse> {
    Json(ErrorResponse::new(
        "Invalid request format".to_string(),
        "BAD_REQUEST",
        vec![
            "Check your request JSON format".to_string(),
            "Verify all required fields are present".to_string(),
        ],
    ))
}

#[rocket::catch(401)]
pub fn unauthorized() -> Json<ErrorResponse> {
    Json(ErrorResponse::new(
        "Authentication required".to_string(),
        "UNAUTHORIZED",
        vec!["Send a valid bearer token in the Authorization header".to_string()],
    ))
}

#[rocket::catch(404)]
pub fn not_found(req: &Request) -> Json<ErrorResponse> {
    Json(ErrorResponse::new(
        format!("No route for {} {}", req.method(), req.uri().path()),
        "NOT_FOUND",
        vec!["Check the endpoint path".to_string()],
    ))
}

#[rocket::catch(422)]
pub fn unprocessable() -> Json<ErrorResponse> {
    Json(ErrorResponse::new(
        "Request body could not be parsed".to_string(),
        "UNPROCESSABLE_ENTITY",
        vec!["Send JSON with the documented field names".to_string()],
    ))
}

#[rocket::catch(500)]
pub fn internal_error() -> Json<ErrorResponse> {
    Json(ErrorResponse::new(
        "Internal server error".to_string(),
        "INTERNAL_ERROR",
        vec![
            "Try again in a few moments".to_string(),
            "Contact support if the problem persists".to_string(),
        ],
    ))
}

/// Assemble the API on top of an already-built pipeline.
pub fn build_rocket(figment: Figment, services: Services, auth: AuthConfig) -> Rocket<Build> {
    rocket::custom(figment)
        .attach(Cors)
        .manage(services)
        .manage(auth)
        .register(
            "/api",
            catchers![bad_request, unauthorized, not_found, unprocessable, internal_error],
        )
        .mount(
            "/api",
            routes![scrape_job, ocr_job, supported_sites, health, options],
        )
}

// Main server start function
pub async fn start_web_server(config: AppConfig) -> Result<()> {
    let auth = AuthConfig::from_settings(&config.auth)
        .ok_or_else(|| anyhow::anyhow!("JWT_SECRET must be set to serve the API"))?;
    let services = Services::from_config(&config)?;

    // Base64 inflates screenshots by a third; leave room for the JSON envelope.
    let json_limit = (config.ocr.max_image_bytes / 3 * 4 + 64 * 1024).bytes();
    let figment = rocket::Config::figment()
        .merge(("address", config.server.address.clone()))
        .merge(("port", config.server.port))
        .merge(("limits", Limits::default().limit("json", json_limit)));

    info!(
        "Starting job intake API on {}:{}",
        config.server.address, config.server.port
    );
    info!(
        "Language model: {}",
        if services.llm_configured {
            config.llm.model.as_str()
        } else {
            "not configured"
        }
    );

    let _rocket = build_rocket(figment, services, auth)
        .launch()
        .await
        .map_err(|e| anyhow::anyhow!("Rocket server failed: {}", e))?;
    Ok(())
}
