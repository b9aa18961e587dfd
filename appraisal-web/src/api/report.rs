//! Report download endpoints

use appraisal_common::analysis::{merge_manual_edits, AiResponse};
use appraisal_common::property::{DeclaredProperty, ExtractedPropertyData};
use appraisal_common::PropertyFormData;
use axum::{
    extract::rejection::JsonRejection,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Local;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::report::{render_report, report_filename, ReportError};

/// Form flow body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePdfRequest {
    pub validation_results: Value,
    pub form_data: Value,
    #[serde(default)]
    pub manual_edits: Option<Value>,
    #[serde(default)]
    pub bank_officer_note: Option<String>,
}

/// PDF flow body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePdfFromAnalysisRequest {
    pub validation_results: Value,
    /// Falls back to `validationResults.extractedData`
    #[serde(default)]
    pub extracted_data: Option<Value>,
    #[serde(default)]
    pub manual_edits: Option<Value>,
    #[serde(default)]
    pub bank_officer_note: Option<String>,
}

/// Apply reviewer edits and coerce into the typed result
fn final_results(validation_results: &Value, manual_edits: Option<&Value>) -> ApiResult<AiResponse> {
    let merged = merge_manual_edits(validation_results, manual_edits);
    serde_json::from_value(merged)
        .map_err(|e| ReportError::InvalidResults(e.to_string()).into())
}

fn pdf_response(
    property: &dyn DeclaredProperty,
    results: &AiResponse,
    bank_officer_note: Option<&str>,
) -> ApiResult<Response> {
    let now = Local::now();
    let bytes = render_report(property, results, bank_officer_note, now)?;
    let filename = report_filename(now);
    info!(
        filename = %filename,
        bytes = bytes.len(),
        recommendation = ?results.recommendation,
        "Report generated"
    );

    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

/// POST /api/generate-pdf
pub async fn generate_pdf(
    payload: Result<Json<GeneratePdfRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = payload?;

    let form: PropertyFormData = serde_json::from_value(request.form_data)
        .map_err(|e| ReportError::InvalidResults(format!("formData: {}", e)))?;
    let results = final_results(&request.validation_results, request.manual_edits.as_ref())?;

    pdf_response(&form, &results, request.bank_officer_note.as_deref())
}

/// POST /api/generate-pdf-from-analysis
pub async fn generate_pdf_from_analysis(
    payload: Result<Json<GeneratePdfFromAnalysisRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = payload?;

    let results = final_results(&request.validation_results, request.manual_edits.as_ref())?;
    let extracted = match request.extracted_data {
        Some(value) if !value.is_null() => serde_json::from_value(value)
            .map_err(|e| ReportError::InvalidResults(format!("extractedData: {}", e)))?,
        _ => results.extracted_data.clone().unwrap_or_default(),
    };
    let extracted: ExtractedPropertyData = extracted;

    pdf_response(&extracted, &results, request.bank_officer_note.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_manual_edits_override_recommendation() {
        let base = json!({"recommendation": "rejected", "summary": "Praskliny na fasádě."});
        let edits = json!({"recommendation": "approved"});
        let results = final_results(&base, Some(&edits)).unwrap();
        assert_eq!(results.recommendation, appraisal_common::Recommendation::Approved);
        assert_eq!(results.summary, "Praskliny na fasádě.");
    }

    #[test]
    fn test_wrongly_typed_results_are_report_errors() {
        let base = json!({"summary": 42});
        let err = final_results(&base, None).unwrap_err();
        assert!(matches!(err, ApiError::Report(ReportError::InvalidResults(_))));
    }
}
