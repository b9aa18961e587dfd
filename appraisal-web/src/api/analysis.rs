//! Analysis endpoints
//!
//! Order of checks for both flows: rate limit, request shape, photo counts,
//! attachment guards. The model is called only when all of them pass, and
//! exactly once.

use std::net::SocketAddr;

use appraisal_common::config::UploadLimits;
use appraisal_common::validation::parse_property_form;
use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::services::attachments::{self, Attachment};
use crate::services::{self, caller_key, prompt, VisionRequest};
use crate::AppState;

pub const MIN_EXTERIOR_PHOTOS: usize = 5;
pub const MIN_INTERIOR_PHOTOS: usize = 3;
pub const MIN_PDF_FLOW_PHOTOS: usize = 8;

#[derive(Debug, Default, Deserialize)]
pub struct PhotoSet {
    #[serde(default)]
    pub exterior: Vec<String>,
    #[serde(default)]
    pub interior: Vec<String>,
    #[serde(default)]
    pub additional: Vec<String>,
}

/// Form flow body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzePropertyRequest {
    /// Parsed and validated separately for a localized message
    pub form_data: Value,
    #[serde(default)]
    pub photos: PhotoSet,
    #[serde(default)]
    pub cadastral_map: Option<String>,
    #[serde(default)]
    pub project_doc: Option<String>,
}

/// PDF flow body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzePdfRequest {
    #[serde(default)]
    pub pdf_base64: Option<String>,
    #[serde(default)]
    pub photos: Vec<String>,
    #[serde(default)]
    pub cadastral_map: Option<String>,
    #[serde(default)]
    pub technical_doc: Option<String>,
}

/// Reject the caller once it used up its window
async fn enforce_rate_limit(
    state: &AppState,
    headers: &HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
) -> ApiResult<()> {
    let key = caller_key(headers, peer.map(|ConnectInfo(addr)| addr));
    let limit = state.config.rate_limit.max_requests;
    if state.rate_limiter.check_and_increment(&key, limit).await {
        Ok(())
    } else {
        warn!(caller = %key, limit, "Rate limit exceeded");
        Err(ApiError::TooManyRequests)
    }
}

/// Empty strings count as absent
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Decode the optional documentation attachment into the request
fn add_document(
    input: Option<&str>,
    limits: &UploadLimits,
    documents: &mut Vec<Vec<u8>>,
    images: &mut Vec<Vec<u8>>,
) -> ApiResult<bool> {
    let Some(input) = input else {
        return Ok(false);
    };
    match attachments::decode_document(input, limits)? {
        Attachment::Document(pdf) => documents.push(pdf),
        Attachment::Image(img) => images.push(img),
    }
    Ok(true)
}

fn success(data: Value) -> Json<Value> {
    Json(json!({ "success": true, "data": data }))
}

/// POST /api/analyze-property
///
/// Form flow: the client's declared values come from the intake form.
pub async fn analyze_property(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    payload: Result<Json<AnalyzePropertyRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    enforce_rate_limit(&state, &headers, peer).await?;
    let Json(request) = payload?;

    let form = parse_property_form(&request.form_data)?;

    if request.photos.exterior.len() < MIN_EXTERIOR_PHOTOS {
        return Err(ApiError::BadRequest(
            "Musí být nahrány minimálně 4 fotografie exteriéru + číslo popisné (celkem 5 fotek)"
                .to_string(),
        ));
    }
    if request.photos.interior.len() < MIN_INTERIOR_PHOTOS {
        return Err(ApiError::BadRequest(
            "Musí být nahrány minimálně 3 fotografie interiéru (kuchyň, koupelna, chodba)"
                .to_string(),
        ));
    }

    let limits = &state.config.uploads;
    let mut images = request
        .photos
        .exterior
        .iter()
        .chain(&request.photos.interior)
        .chain(&request.photos.additional)
        .map(|photo| attachments::decode_photo(photo, limits))
        .collect::<Result<Vec<_>, _>>()?;

    let cadastral_map = present(&request.cadastral_map);
    if let Some(map) = cadastral_map {
        images.push(attachments::decode_photo(map, limits)?);
    }

    let mut documents = Vec::new();
    let has_project_doc = add_document(
        present(&request.project_doc),
        limits,
        &mut documents,
        &mut images,
    )?;

    let request_id = Uuid::new_v4();
    let span = info_span!("analysis", %request_id, flow = "form");
    async {
        info!(
            exterior = request.photos.exterior.len(),
            interior = request.photos.interior.len(),
            additional = request.photos.additional.len(),
            project_doc = has_project_doc,
            "Analyzing property from form"
        );

        let images = attachments::normalize_images(images, limits).await?;
        let vision = VisionRequest {
            documents,
            images,
            prompt: prompt::form_analysis_prompt(
                &form,
                appraisal_common::time::today(),
                has_project_doc,
                cadastral_map.is_some(),
            ),
        };

        let data = services::analyze(state.model.as_ref(), vision).await?;
        info!("Analysis finished");
        Ok::<_, ApiError>(success(data))
    }
    .instrument(span)
    .await
}

/// POST /api/analyze-property-pdf
///
/// PDF flow: the model reads the declared values from the uploaded form.
pub async fn analyze_property_pdf(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    payload: Result<Json<AnalyzePdfRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    enforce_rate_limit(&state, &headers, peer).await?;
    let Json(request) = payload?;

    let Some(pdf) = present(&request.pdf_base64) else {
        return Err(ApiError::BadRequest("PDF formulář je povinný".to_string()));
    };
    if request.photos.len() < MIN_PDF_FLOW_PHOTOS {
        return Err(ApiError::BadRequest(
            "Musí být nahráno minimálně 8 fotografií".to_string(),
        ));
    }

    let limits = &state.config.uploads;
    if request.photos.len() > limits.max_photos {
        return Err(ApiError::BadRequest(format!(
            "Maximálně {} fotografií",
            limits.max_photos
        )));
    }

    let mut documents = vec![attachments::decode_pdf(pdf, limits)?];
    let mut images = request
        .photos
        .iter()
        .map(|photo| attachments::decode_photo(photo, limits))
        .collect::<Result<Vec<_>, _>>()?;

    let cadastral_map = present(&request.cadastral_map);
    if let Some(map) = cadastral_map {
        images.push(attachments::decode_photo(map, limits)?);
    }
    let has_technical_doc = add_document(
        present(&request.technical_doc),
        limits,
        &mut documents,
        &mut images,
    )?;

    let request_id = Uuid::new_v4();
    let span = info_span!("analysis", %request_id, flow = "pdf");
    async {
        info!(
            photos = request.photos.len(),
            cadastral_map = cadastral_map.is_some(),
            technical_doc = has_technical_doc,
            "Analyzing property from PDF form"
        );

        let images = attachments::normalize_images(images, limits).await?;
        let vision = VisionRequest {
            documents,
            images,
            prompt: prompt::pdf_analysis_prompt(
                appraisal_common::time::today(),
                has_technical_doc,
                cadastral_map.is_some(),
            ),
        };

        let data = services::analyze(state.model.as_ref(), vision).await?;
        info!("Analysis finished");
        Ok::<_, ApiError>(success(data))
    }
    .instrument(span)
    .await
}
