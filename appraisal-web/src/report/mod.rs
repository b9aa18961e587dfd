//! PDF report of a finished check
//!
//! Two stages: [`layout::build_layout`] positions everything on A4 pages,
//! [`pdf_writer::write_pdf`] serializes the pages.

pub mod fonts;
pub mod layout;
pub mod pdf_writer;
pub mod text;

use appraisal_common::analysis::AiResponse;
use appraisal_common::property::DeclaredProperty;
use chrono::{DateTime, Local};
use thiserror::Error;

pub use layout::{build_layout, ReportContent, ReportLayout};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Chyba při generování PDF: {0}")]
    Render(String),

    #[error("Výsledky analýzy mají neplatný formát: {0}")]
    InvalidResults(String),
}

/// Lay out and render a report
pub fn render_report(
    property: &dyn DeclaredProperty,
    results: &AiResponse,
    bank_officer_note: Option<&str>,
    checked_at: DateTime<Local>,
) -> Result<Vec<u8>, ReportError> {
    let layout = build_layout(&ReportContent {
        property,
        results,
        bank_officer_note,
        checked_at: appraisal_common::time::czech_timestamp(&checked_at),
    });
    tracing::debug!(pages = layout.pages.len(), "Report laid out");
    pdf_writer::write_pdf(&layout)
}

/// Download name, e.g. `vysledek-kontroly-1741334701000.pdf`
pub fn report_filename(at: DateTime<Local>) -> String {
    format!("vysledek-kontroly-{}.pdf", at.timestamp_millis())
}
