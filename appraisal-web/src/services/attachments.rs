//! Attachment decoding and guards
//!
//! Uploads arrive as base64 strings, optionally wrapped in a `data:` URL.
//! Every attachment is decoded, size checked and content sniffed before
//! anything is sent upstream. Images are re-encoded to bounded JPEG so the
//! media type declared to the model is always truthful.

use std::io::Cursor;

use appraisal_common::config::UploadLimits;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{codecs::jpeg::JpegEncoder, imageops::FilterType, DynamicImage};
use thiserror::Error;

use crate::error::ApiError;

pub const MIME_JPEG: &str = "image/jpeg";
pub const MIME_PNG: &str = "image/png";
pub const MIME_PDF: &str = "application/pdf";

#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("Soubor není platně zakódován (base64)")]
    InvalidEncoding,

    #[error("Soubor je příliš velký (max {max_mb}MB)")]
    TooLarge { max_mb: usize },

    #[error("Pouze JPG a PNG formáty jsou povoleny")]
    NotImage,

    #[error("Pouze PDF formát je povolen")]
    NotPdf,

    #[error("Technická dokumentace musí být PDF, JPG nebo PNG")]
    UnsupportedDocument,

    #[error("Obrázek se nepodařilo zpracovat")]
    ImageProcessing(String),
}

impl From<AttachmentError> for ApiError {
    fn from(err: AttachmentError) -> Self {
        if let AttachmentError::ImageProcessing(detail) = &err {
            tracing::warn!(detail = %detail, "Image normalization failed");
        }
        ApiError::BadRequest(err.to_string())
    }
}

/// A decoded, verified upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attachment {
    /// PDF bytes
    Document(Vec<u8>),
    /// JPEG or PNG bytes, not yet normalized
    Image(Vec<u8>),
}

/// Strip an optional `data:<mime>;base64,` prefix and decode
pub fn decode_base64(input: &str, max_bytes: usize) -> Result<Vec<u8>, AttachmentError> {
    let payload = match input.strip_prefix("data:") {
        Some(rest) => rest
            .split_once(',')
            .map(|(_, data)| data)
            .ok_or(AttachmentError::InvalidEncoding)?,
        None => input,
    };
    let payload = payload.trim();

    // Reject oversized payloads before allocating for them
    if payload.len() / 4 * 3 > max_bytes + 3 {
        return Err(too_large(max_bytes));
    }

    let bytes = STANDARD
        .decode(payload)
        .map_err(|_| AttachmentError::InvalidEncoding)?;
    if bytes.len() > max_bytes {
        return Err(too_large(max_bytes));
    }
    Ok(bytes)
}

/// MIME type detected from magic bytes
pub fn sniff(bytes: &[u8]) -> Option<&'static str> {
    infer::get(bytes).map(|kind| kind.mime_type())
}

pub fn is_image(bytes: &[u8]) -> bool {
    matches!(sniff(bytes), Some(MIME_JPEG) | Some(MIME_PNG))
}

pub fn is_pdf(bytes: &[u8]) -> bool {
    sniff(bytes) == Some(MIME_PDF)
}

/// Photograph or cadastral map: JPEG/PNG only
pub fn decode_photo(input: &str, limits: &UploadLimits) -> Result<Vec<u8>, AttachmentError> {
    let bytes = decode_base64(input, limits.max_file_bytes)?;
    if !is_image(&bytes) {
        return Err(AttachmentError::NotImage);
    }
    Ok(bytes)
}

/// Appraisal form: PDF only
pub fn decode_pdf(input: &str, limits: &UploadLimits) -> Result<Vec<u8>, AttachmentError> {
    let bytes = decode_base64(input, limits.max_file_bytes)?;
    if !is_pdf(&bytes) {
        return Err(AttachmentError::NotPdf);
    }
    Ok(bytes)
}

/// Technical or project documentation: PDF or image
pub fn decode_document(input: &str, limits: &UploadLimits) -> Result<Attachment, AttachmentError> {
    let bytes = decode_base64(input, limits.max_file_bytes)?;
    if is_pdf(&bytes) {
        Ok(Attachment::Document(bytes))
    } else if is_image(&bytes) {
        Ok(Attachment::Image(bytes))
    } else {
        Err(AttachmentError::UnsupportedDocument)
    }
}

/// Downscale to `max_dimension` on the long side and re-encode as JPEG
pub fn normalize_image(
    bytes: &[u8],
    max_dimension: u32,
    quality: u8,
) -> Result<Vec<u8>, AttachmentError> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| AttachmentError::ImageProcessing(e.to_string()))?;

    let img = if img.width() > max_dimension || img.height() > max_dimension {
        img.resize(max_dimension, max_dimension, FilterType::Triangle)
    } else {
        img
    };

    // JPEG carries no alpha channel
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut out = Cursor::new(Vec::new());
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, quality))
        .map_err(|e| AttachmentError::ImageProcessing(e.to_string()))?;
    Ok(out.into_inner())
}

/// Normalize a batch of images on the blocking pool
pub async fn normalize_images(
    images: Vec<Vec<u8>>,
    limits: &UploadLimits,
) -> Result<Vec<Vec<u8>>, AttachmentError> {
    let max_dimension = limits.max_image_dimension;
    let quality = limits.jpeg_quality;

    tokio::task::spawn_blocking(move || {
        images
            .iter()
            .map(|bytes| normalize_image(bytes, max_dimension, quality))
            .collect::<Result<Vec<_>, _>>()
    })
    .await
    .map_err(|e| AttachmentError::ImageProcessing(e.to_string()))?
}

fn too_large(max_bytes: usize) -> AttachmentError {
    AttachmentError::TooLarge {
        max_mb: max_bytes / (1024 * 1024),
    }
}
