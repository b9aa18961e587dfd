//! Integration tests for appraisal-web HTTP endpoints
//!
//! The router is exercised in-process with `oneshot`; the upstream model is
//! replaced by a stub that records how often it was called.

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use appraisal_common::config::{
    AnthropicConfig, LoggingConfig, RateLimitConfig, ServiceConfig, UploadLimits,
};
use appraisal_web::services::{ModelError, VisionModel, VisionRequest};
use appraisal_web::{build_router, AppState};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use http_body_util::BodyExt;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use serde_json::{json, Value};
use tower::util::ServiceExt;

const PASSWORD: &str = "Heslo-2024";
const SESSION: &str = "session=authenticated";

/// Stub model returning a fixed reply
struct StubModel {
    reply: Result<String, fn() -> ModelError>,
    calls: AtomicUsize,
    last_request: tokio::sync::Mutex<Option<(usize, usize, String)>>,
}

impl StubModel {
    fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
            last_request: tokio::sync::Mutex::new(None),
        })
    }

    fn failing(error: fn() -> ModelError) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(error),
            calls: AtomicUsize::new(0),
            last_request: tokio::sync::Mutex::new(None),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VisionModel for StubModel {
    async fn complete(&self, request: VisionRequest) -> Result<String, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().await = Some((
            request.documents.len(),
            request.images.len(),
            request.prompt.clone(),
        ));
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(make) => Err(make()),
        }
    }
}

fn test_config() -> ServiceConfig {
    ServiceConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        production: false,
        access_password: PASSWORD.to_string(),
        anthropic: AnthropicConfig {
            api_key: "sk-test".to_string(),
            base_url: "http://127.0.0.1:1".to_string(),
            model: ServiceConfig::DEFAULT_MODEL.to_string(),
            max_tokens: 1024,
            timeout_secs: 5,
        },
        rate_limit: RateLimitConfig::default(),
        uploads: UploadLimits::default(),
        logging: LoggingConfig::default(),
    }
}

fn create_test_app(model: Arc<StubModel>) -> Router {
    build_router(AppState::new(test_config(), model))
}

fn create_test_app_with(config: ServiceConfig, model: Arc<StubModel>) -> Router {
    build_router(AppState::new(config, model))
}

/// Send a request, optionally signed in, with an optional JSON body
async fn test_request(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    signed_in: bool,
) -> axum::response::Response {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-forwarded-for", "203.0.113.7");
    if signed_in {
        builder = builder.header(header::COOKIE, SESSION);
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(request).await.unwrap()
}

async fn extract_json(response: axum::response::Response) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

/// Text of every page of a PDF, as a viewer would copy it
fn pdf_text(bytes: &[u8]) -> String {
    let doc = lopdf::Document::load_mem(bytes).unwrap();
    let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
    doc.extract_text(&pages).unwrap()
}

async fn extract_bytes(response: axum::response::Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

/// Base64 data URL of a small PNG
fn photo() -> String {
    let img = RgbImage::from_pixel(64, 48, Rgb([180, 140, 90]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    format!("data:image/png;base64,{}", STANDARD.encode(out.into_inner()))
}

fn pdf_document() -> String {
    let pdf = b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog >>\nendobj\ntrailer\n<< /Root 1 0 R >>\n%%EOF\n";
    format!("data:application/pdf;base64,{}", STANDARD.encode(pdf))
}

fn form_data() -> Value {
    json!({
        "address": {
            "street": "Polní",
            "houseNumber": "12",
            "city": "Brno",
            "zipCode": "60200"
        },
        "cadastral": {
            "region": "Jihomoravský",
            "district": "Brno-město",
            "municipality": "Brno",
            "cadastralArea": "Žabovřesky",
            "landRegistryNumber": "1234"
        },
        "propertyCondition": "dobře udržovaný",
        "layout": "4+1",
        "numberOfFloors": 2,
        "hasAttic": true,
        "atticHabitable": false,
        "hasBasement": true,
        "roofType": "valbová",
        "landArea": 850,
        "builtUpArea": 120.5,
        "totalFloorArea": 180,
        "constructionYear": 1998,
        "constructionType": "zděná",
        "garageCount": 1,
        "utilities": {
            "water": "síť",
            "electricity": "síť",
            "sewage": "ČOV (čistička odpadních vod)",
            "gas": false,
            "heating": "plynový kotel"
        }
    })
}

fn form_request(exterior: usize, interior: usize) -> Value {
    json!({
        "formData": form_data(),
        "photos": {
            "exterior": vec![photo(); exterior],
            "interior": vec![photo(); interior],
            "additional": []
        }
    })
}

fn pdf_request(photos: usize) -> Value {
    json!({
        "pdfBase64": pdf_document(),
        "photos": vec![photo(); photos],
    })
}

fn analysis_result() -> Value {
    json!({
        "validation": {
            "propertyCondition": {
                "matches": true,
                "confidence": "high",
                "note": "Fasáda i interiér odpovídají deklarovanému stavu.",
                "color": "green"
            },
            "roofType": {
                "matches": false,
                "confidence": "medium",
                "note": "Na fotografiích je sedlová střecha.",
                "color": "red"
            }
        },
        "floorAreaEstimate": {
            "calculated": 175.0,
            "confidence": 80,
            "method": "interiorPhotos",
            "details": "2 podlaží × 120,5 m² × 0,72",
            "matchesClientData": true,
            "difference": 2.8
        },
        "issues": {
            "underConstruction": false,
            "severelyDamaged": false,
            "visibleCracks": true,
            "facadeDamagePercent": 5,
            "missingPhotos": [],
            "photosOutdated": false
        },
        "recommendation": "manualReview",
        "summary": "Nemovitost odpovídá popisu, typ střechy je nutné ověřit."
    })
}

// ---------------------------------------------------------------------------
// Login and session gate
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_login_with_correct_password_sets_cookie() {
    let app = create_test_app(StubModel::replying("{}"));

    let response = test_request(
        &app,
        "POST",
        "/api/auth/login",
        Some(json!({ "password": PASSWORD })),
        false,
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("session cookie")
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("session=authenticated"));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Max-Age=86400"));

    let json = extract_json(response).await;
    assert_eq!(json, json!({ "success": true }));
}

#[tokio::test]
async fn test_login_rejects_wrong_case_and_empty_password() {
    let app = create_test_app(StubModel::replying("{}"));

    for password in ["heslo-2024", "", "Heslo-2024 "] {
        let response = test_request(
            &app,
            "POST",
            "/api/auth/login",
            Some(json!({ "password": password })),
            false,
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        let json = extract_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Nesprávné heslo");
    }
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let app = create_test_app(StubModel::replying("{}"));

    let response = test_request(&app, "POST", "/api/auth/logout", None, true).await;

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response.headers().get(header::SET_COOKIE).unwrap();
    assert!(cookie.to_str().unwrap().contains("Max-Age=0"));
}

#[tokio::test]
async fn test_pages_redirect_by_session() {
    let app = create_test_app(StubModel::replying("{}"));

    let response = test_request(&app, "GET", "/", None, false).await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.headers()[header::LOCATION], "/login");

    let response = test_request(&app, "GET", "/login", None, true).await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.headers()[header::LOCATION], "/");

    let response = test_request(&app, "GET", "/login", None, false).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = test_request(&app, "GET", "/", None, true).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_api_requires_session() {
    let model = StubModel::replying("{}");
    let app = create_test_app(model.clone());

    let response = test_request(
        &app,
        "POST",
        "/api/analyze-property",
        Some(form_request(5, 3)),
        false,
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = extract_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_static_assets_are_public() {
    let app = create_test_app(StubModel::replying("{}"));

    let response = test_request(&app, "GET", "/static/login.js", None, false).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("application/javascript"));
}

#[tokio::test]
async fn test_review_ui_shows_floor_area_difference_in_square_meters() {
    let app = create_test_app(StubModel::replying("{}"));

    let response = test_request(&app, "GET", "/static/app.js", None, false).await;
    assert_eq!(response.status(), StatusCode::OK);
    let script = String::from_utf8(extract_bytes(response).await).unwrap();
    assert!(script.contains("rozdíl ${formatValue(estimate.difference)} m²"));
    assert!(!script.contains("rozdíl ${formatValue(estimate.difference)} %"));
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_form_flow_rejects_too_few_exterior_photos() {
    let model = StubModel::replying("{}");
    let app = create_test_app(model.clone());

    let response = test_request(
        &app,
        "POST",
        "/api/analyze-property",
        Some(form_request(4, 3)),
        true,
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = extract_json(response).await;
    assert_eq!(
        json["error"],
        "Musí být nahrány minimálně 4 fotografie exteriéru + číslo popisné (celkem 5 fotek)"
    );
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_form_flow_rejects_too_few_interior_photos() {
    let model = StubModel::replying("{}");
    let app = create_test_app(model.clone());

    let response = test_request(
        &app,
        "POST",
        "/api/analyze-property",
        Some(form_request(5, 2)),
        true,
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = extract_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(
        json["error"],
        "Musí být nahrány minimálně 3 fotografie interiéru (kuchyň, koupelna, chodba)"
    );
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_form_flow_rejects_fractional_construction_year() {
    let model = StubModel::replying("{}");
    let app = create_test_app(model.clone());

    let mut body = form_request(5, 3);
    body["formData"]["constructionYear"] = json!(1998.5);

    let response = test_request(&app, "POST", "/api/analyze-property", Some(body), true).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = extract_json(response).await;
    assert_eq!(
        json["error"],
        "Neplatná data formuláře: Rok musí být celé číslo"
    );
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_form_flow_rejects_invalid_form_data() {
    let model = StubModel::replying("{}");
    let app = create_test_app(model.clone());

    let mut body = form_request(5, 3);
    body["formData"]["address"]["zipCode"] = json!("602");

    let response = test_request(&app, "POST", "/api/analyze-property", Some(body), true).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = extract_json(response).await;
    assert!(json["error"]
        .as_str()
        .unwrap()
        .starts_with("Neplatná data formuláře"));
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_form_flow_success_returns_model_json() {
    let reply = format!("Zde je výsledek:\n```json\n{}\n```", analysis_result());
    let model = StubModel::replying(&reply);
    let app = create_test_app(model.clone());

    let response = test_request(
        &app,
        "POST",
        "/api/analyze-property",
        Some(form_request(5, 3)),
        true,
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = extract_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["data"], analysis_result());
    assert_eq!(model.calls(), 1);

    let (documents, images, prompt) = model.last_request.lock().await.clone().unwrap();
    assert_eq!(documents, 0);
    assert_eq!(images, 8);
    assert!(prompt.contains("valbová"));
    assert!(prompt.contains("\"4+1\""));
}

#[tokio::test]
async fn test_pdf_flow_rejects_seven_photos() {
    let model = StubModel::replying("{}");
    let app = create_test_app(model.clone());

    let response = test_request(
        &app,
        "POST",
        "/api/analyze-property-pdf",
        Some(pdf_request(7)),
        true,
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = extract_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Musí být nahráno minimálně 8 fotografií");
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_pdf_flow_rejects_more_than_thirty_photos() {
    let model = StubModel::replying("{}");
    let app = create_test_app(model.clone());

    let response = test_request(
        &app,
        "POST",
        "/api/analyze-property-pdf",
        Some(pdf_request(31)),
        true,
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = extract_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Maximálně 30 fotografií");
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_oversized_body_is_json_413() {
    let model = StubModel::replying("{}");
    let mut config = test_config();
    config.uploads.max_body_bytes = 1024;
    let app = create_test_app_with(config, model.clone());

    let response = test_request(
        &app,
        "POST",
        "/api/analyze-property-pdf",
        Some(pdf_request(20)),
        true,
    )
    .await;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let json = extract_json(response).await;
    assert_eq!(
        json,
        json!({ "success": false, "error": "Požadavek je příliš velký." })
    );
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_pdf_flow_requires_pdf() {
    let model = StubModel::replying("{}");
    let app = create_test_app(model.clone());

    let response = test_request(
        &app,
        "POST",
        "/api/analyze-property-pdf",
        Some(json!({ "photos": vec![photo(); 8] })),
        true,
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = extract_json(response).await;
    assert_eq!(json["error"], "PDF formulář je povinný");
}

#[tokio::test]
async fn test_pdf_flow_rejects_non_image_photo() {
    let model = StubModel::replying("{}");
    let app = create_test_app(model.clone());

    let mut body = pdf_request(8);
    body["photos"][3] = json!(pdf_document());

    let response = test_request(&app, "POST", "/api/analyze-property-pdf", Some(body), true).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = extract_json(response).await;
    assert_eq!(json["error"], "Pouze JPG a PNG formáty jsou povoleny");
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_pdf_flow_sends_documents_and_images() {
    let model = StubModel::replying(&analysis_result().to_string());
    let app = create_test_app(model.clone());

    let mut body = pdf_request(8);
    body["cadastralMap"] = json!(photo());
    body["technicalDoc"] = json!(pdf_document());

    let response = test_request(&app, "POST", "/api/analyze-property-pdf", Some(body), true).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = extract_json(response).await;
    assert_eq!(json["success"], true);

    let (documents, images, _) = model.last_request.lock().await.clone().unwrap();
    assert_eq!(documents, 2);
    assert_eq!(images, 9);
}

#[tokio::test]
async fn test_sixth_request_in_window_is_rate_limited() {
    let model = StubModel::replying("{}");
    let app = create_test_app(model.clone());

    for _ in 0..5 {
        let response = test_request(
            &app,
            "POST",
            "/api/analyze-property-pdf",
            Some(pdf_request(7)),
            true,
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    let response = test_request(
        &app,
        "POST",
        "/api/analyze-property-pdf",
        Some(pdf_request(8)),
        true,
    )
    .await;

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let json = extract_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_reply_without_json_is_server_error() {
    let model = StubModel::replying("Omlouvám se, fotografie nelze posoudit.");
    let app = create_test_app(model.clone());

    let response = test_request(
        &app,
        "POST",
        "/api/analyze-property-pdf",
        Some(pdf_request(8)),
        true,
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = extract_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Odpověď AI neobsahuje JSON objekt.");
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn test_upstream_failure_is_server_error() {
    let model = StubModel::failing(|| ModelError::InvalidApiKey);
    let app = create_test_app(model.clone());

    let response = test_request(
        &app,
        "POST",
        "/api/analyze-property-pdf",
        Some(pdf_request(8)),
        true,
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = extract_json(response).await;
    assert_eq!(json["success"], false);
    assert!(!json["error"].as_str().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Report generation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_generate_pdf_returns_attachment() {
    let app = create_test_app(StubModel::replying("{}"));

    let body = json!({
        "validationResults": analysis_result(),
        "formData": form_data(),
        "manualEdits": { "recommendation": "approved" },
        "bankOfficerNote": "Střechu ověřit při místním šetření."
    });
    let response = test_request(&app, "POST", "/api/generate-pdf", Some(body), true).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"vysledek-kontroly-"));
    assert!(disposition.ends_with(".pdf\""));

    let bytes = extract_bytes(response).await;
    assert!(bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn test_generated_pdf_text_matches_declared_values() {
    let app = create_test_app(StubModel::replying("{}"));

    let mut form = form_data();
    form["roofType"] = json!("věžová");
    let body = json!({
        "validationResults": analysis_result(),
        "formData": form,
        "bankOfficerNote": "Střechu ověřit při místním šetření."
    });
    let response = test_request(&app, "POST", "/api/generate-pdf", Some(body), true).await;
    assert_eq!(response.status(), StatusCode::OK);

    let text = pdf_text(&extract_bytes(response).await);
    for expected in [
        "Typ střechy: věžová",
        "Stav nemovitosti: dobře udržovaný",
        "Střechu ověřit při místním šetření.",
        "AI vypočítala: 175 m²",
    ] {
        assert!(text.contains(expected), "missing {:?} in {}", expected, text);
    }
}

#[tokio::test]
async fn test_generate_pdf_from_analysis_uses_embedded_extracted_data() {
    let app = create_test_app(StubModel::replying("{}"));

    let mut results = analysis_result();
    results["extractedData"] = json!({
        "address": { "street": "Polní", "houseNumber": "12", "city": "Brno", "zipCode": "60200" },
        "propertyCondition": "dobře udržovaný",
        "totalFloorArea": 180
    });
    let body = json!({ "validationResults": results });

    let response = test_request(
        &app,
        "POST",
        "/api/generate-pdf-from-analysis",
        Some(body),
        true,
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = extract_bytes(response).await;
    assert!(bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn test_generate_pdf_rejects_malformed_results() {
    let app = create_test_app(StubModel::replying("{}"));

    let body = json!({
        "validationResults": { "summary": ["not", "text"] },
        "formData": form_data()
    });
    let response = test_request(&app, "POST", "/api/generate-pdf", Some(body), true).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = extract_json(response).await;
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app(StubModel::replying("{}"));

    let response = test_request(&app, "GET", "/health", None, false).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = extract_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["module"], "appraisal-web");
}
