use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header as JwtHeader};
use rocket::http::{ContentType, Header, Status};
use rocket::local::asynchronous::Client;
use serde_json::{json, Value};
use std::sync::Arc;

use job_intake::auth::{AuthConfig, Claims};
use job_intake::config::OcrSettings;
use job_intake::error::AcquisitionError;
use job_intake::job_acquisition::orchestrator::{Accepted, AttemptContext};
use job_intake::job_acquisition::{
    AcquisitionStrategy, OcrEngine, OcrError, OcrExtractor, OcrWorker, Orchestrator, SiteRules,
    SourceStrategy,
};
use job_intake::web::build_rocket;
use job_intake::Services;

const SECRET: &str = "test-secret";

enum Behavior {
    Succeed(String),
    Pass,
    Unreachable,
}

struct FixedStrategy(Behavior);

#[async_trait]
impl AcquisitionStrategy for FixedStrategy {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn attempt(&self, ctx: &mut AttemptContext) -> Option<Result<Accepted, AcquisitionError>> {
        match &self.0 {
            Behavior::Succeed(text) => Some(Ok(Accepted {
                text: text.clone(),
                source: SourceStrategy::StructuredSite,
            })),
            Behavior::Pass => None,
            Behavior::Unreachable => {
                ctx.navigation_failed = true;
                None
            }
        }
    }
}

struct FixedOcr(String);

struct FixedWorker(String);

#[async_trait]
impl OcrEngine for FixedOcr {
    async fn create(&self, _languages: &str) -> Result<Box<dyn OcrWorker>, OcrError> {
        Ok(Box::new(FixedWorker(self.0.clone())))
    }
}

#[async_trait]
impl OcrWorker for FixedWorker {
    async fn recognize(&mut self, _image: &[u8]) -> Result<String, OcrError> {
        Ok(self.0.clone())
    }

    async fn terminate(self: Box<Self>) {}
}

async fn client(behavior: Behavior, ocr_text: &str) -> Client {
    let rules = Arc::new(SiteRules::embedded().expect("embedded rules"));
    let orchestrator = Orchestrator::new(rules, vec![Box::new(FixedStrategy(behavior))], 100);
    let ocr = OcrExtractor::new(Arc::new(FixedOcr(ocr_text.to_string())), &OcrSettings::default());
    let services = Services::new(orchestrator, ocr, false);

    let figment = rocket::Config::figment().merge(("log_level", "off"));
    let rocket = build_rocket(figment, services, AuthConfig::new(SECRET, None));
    Client::tracked(rocket).await.expect("valid rocket instance")
}

fn bearer() -> Header<'static> {
    let claims = Claims {
        sub: "user-1".to_string(),
        email: Some("user@example.com".to_string()),
        exp: (chrono::Utc::now().timestamp() + 600) as usize,
        iat: None,
        iss: None,
    };
    let token = encode(
        &JwtHeader::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .expect("token");
    Header::new("Authorization", format!("Bearer {}", token))
}

async fn scrape(client: &Client, url: &str) -> (Status, Value) {
    let response = client
        .post("/api/job/scrape")
        .header(ContentType::JSON)
        .header(bearer())
        .body(json!({ "url": url }).to_string())
        .dispatch()
        .await;
    let status = response.status();
    (status, response.into_json().await.expect("json body"))
}

#[rocket::async_test]
async fn health_reports_model_state() {
    let client = client(Behavior::Pass, "").await;
    let response = client.get("/api/health").dispatch().await;

    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["llmConfigured"], false);
}

#[rocket::async_test]
async fn supported_sites_are_listed() {
    let client = client(Behavior::Pass, "").await;
    let response = client.get("/api/job/supported-sites").dispatch().await;

    let body: Value = response.into_json().await.unwrap();
    let names: Vec<&str> = body["sites"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|s| s["name"].as_str())
        .collect();
    assert!(names.contains(&"LinkedIn"));
    assert!(names.contains(&"Indeed"));
}

#[rocket::async_test]
async fn scrape_requires_token() {
    let client = client(Behavior::Pass, "").await;
    let response = client
        .post("/api/job/scrape")
        .header(ContentType::JSON)
        .body(r#"{"url":"https://www.linkedin.com/jobs/view/123456789"}"#)
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Unauthorized);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["errorCode"], "UNAUTHORIZED");
}

#[rocket::async_test]
async fn scrape_success_envelope() {
    let text = "Senior Rust engineer building data pipelines. ".repeat(5);
    let client = client(Behavior::Succeed(text.clone()), "").await;

    let (status, body) = scrape(&client, "https://www.linkedin.com/jobs/view/123456789").await;

    assert_eq!(status, Status::Ok);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["jobDescription"], text.trim());
    assert_eq!(body["data"]["sourceStrategy"], "structuredSite");
    assert!(body["requestId"].is_string());
}

#[rocket::async_test]
async fn unsupported_site_is_bad_request() {
    let client = client(Behavior::Pass, "").await;

    let (status, body) = scrape(&client, "https://example.com/job/1").await;

    assert_eq!(status, Status::BadRequest);
    assert_eq!(body["success"], false);
    assert_eq!(body["errorCode"], "UNSUPPORTED_SOURCE");
    let sites = body["supportedSites"].as_array().unwrap();
    assert!(sites.iter().any(|s| s == "LinkedIn"));
}

#[rocket::async_test]
async fn exhausted_pipeline_asks_frontend_to_fetch() {
    let client = client(Behavior::Pass, "").await;

    let (status, body) = scrape(&client, "https://www.linkedin.com/jobs/view/123456789").await;

    assert_eq!(status, Status::Ok);
    assert_eq!(body["success"], false);
    assert_eq!(body["needsFrontendFetch"], true);
    assert_eq!(body["jobId"], "123456789");
    assert_eq!(
        body["originalUrl"],
        "https://www.linkedin.com/jobs/view/123456789"
    );
    assert_eq!(body["suggestedAction"], "client_side_fetch");
}

#[rocket::async_test]
async fn unreachable_page_without_id_times_out() {
    let client = client(Behavior::Unreachable, "").await;

    let (status, body) = scrape(
        &client,
        "https://www.welcometothejungle.com/fr/companies/acme/jobs/rust-dev",
    )
    .await;

    assert_eq!(status, Status::RequestTimeout);
    assert_eq!(body["success"], false);
    assert_eq!(body["suggestedAction"], "manual_paste");
    assert_eq!(body["errorCode"], "PAGE_UNREACHABLE");
}

#[rocket::async_test]
async fn ocr_returns_recognized_text() {
    let recognized = "Data Engineer - Lyon\nMissions: build and run our ingestion platform";
    let client = client(Behavior::Pass, recognized).await;

    let response = client
        .post("/api/job/ocr")
        .header(ContentType::JSON)
        .header(bearer())
        .body(json!({ "imageData": "data:image/png;base64,iVBORw0KGgo=" }).to_string())
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["data"]["jobDescription"], recognized);
}

#[rocket::async_test]
async fn ocr_with_too_little_text_is_rejected() {
    let client = client(Behavior::Pass, "blurry").await;

    let response = client
        .post("/api/job/ocr")
        .header(ContentType::JSON)
        .header(bearer())
        .body(json!({ "imageData": "iVBORw0KGgo=" }).to_string())
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::BadRequest);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["errorCode"], "OCR_INSUFFICIENT_TEXT");
    assert_eq!(body["suggestedAction"], "manual_paste");
}
