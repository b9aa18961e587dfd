//! Report layout
//!
//! Produces a list of pages with positioned drawing operations. Nothing here
//! knows about PDF syntax; [`super::pdf_writer`] serializes the result.
//!
//! Coordinates are PDF points with the origin at the bottom-left corner.
//! The cursor moves downwards; once it falls below [`PAGE_BREAK_Y`] the next
//! line starts a fresh page. Content already placed is never reflowed.

use appraisal_common::analysis::{
    AiResponse, CheckedField, CoverageSeverity, FieldColor, FloorAreaEstimate,
};
use appraisal_common::property::{format_number, DeclaredProperty};

use super::text::wrap;

pub const PAGE_WIDTH: f32 = 595.0;
pub const PAGE_HEIGHT: f32 = 842.0;
pub const MARGIN: f32 = 50.0;
pub const FONT_SIZE: f32 = 10.0;
pub const LINE_HEIGHT: f32 = 15.0;
pub const PAGE_BREAK_Y: f32 = 100.0;

const TOP_Y: f32 = PAGE_HEIGHT - MARGIN;
const NOTE_COLUMN_X: f32 = MARGIN + 215.0;
const LABEL_COLUMN_CHARS: usize = 34;
const NOTE_COLUMN_CHARS: usize = 50;
const BODY_CHARS: usize = 85;

/// RGB in 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb(pub f32, pub f32, pub f32);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0.0, 0.0, 0.0);
    pub const RED: Rgb = Rgb(1.0, 0.0, 0.0);
    pub const ORANGE: Rgb = Rgb(1.0, 0.5, 0.0);
    pub const GRAY: Rgb = Rgb(0.4, 0.4, 0.4);

    /// Pale variant used as box fill
    pub fn tint(self) -> Rgb {
        let lighten = |c: f32| c + (1.0 - c) * 0.7;
        Rgb(lighten(self.0), lighten(self.1), lighten(self.2))
    }
}

impl From<FieldColor> for Rgb {
    fn from(color: FieldColor) -> Self {
        let (r, g, b) = color.rgb();
        Rgb(r, g, b)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Text {
        x: f32,
        y: f32,
        text: String,
        font: Font,
        color: Rgb,
    },
    /// Filled rectangle with a colored border
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        stroke: Rgb,
        fill: Rgb,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub ops: Vec<DrawOp>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportLayout {
    pub pages: Vec<Page>,
}

impl ReportLayout {
    /// All text runs in drawing order
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.pages.iter().flat_map(|p| p.ops.iter()).filter_map(|op| match op {
            DrawOp::Text { text, .. } => Some(text.as_str()),
            DrawOp::Rect { .. } => None,
        })
    }
}

/// Everything that goes into one report
pub struct ReportContent<'a> {
    pub property: &'a dyn DeclaredProperty,
    pub results: &'a AiResponse,
    pub bank_officer_note: Option<&'a str>,
    /// Preformatted check timestamp for the footer
    pub checked_at: String,
}

struct PageCursor {
    pages: Vec<Page>,
    y: f32,
}

impl PageCursor {
    fn new() -> Self {
        Self {
            pages: vec![Page::default()],
            y: TOP_Y,
        }
    }

    fn page(&mut self) -> &mut Page {
        if self.pages.is_empty() {
            self.pages.push(Page::default());
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    /// Start a new page unless `lines` more lines fit above the break line
    fn ensure_room(&mut self, lines: usize) {
        let lowest = self.y - lines.saturating_sub(1) as f32 * LINE_HEIGHT;
        if lowest < PAGE_BREAK_Y {
            self.pages.push(Page::default());
            self.y = TOP_Y;
        }
    }

    fn text_at(&mut self, x: f32, y: f32, text: impl Into<String>, font: Font, color: Rgb) {
        self.page().ops.push(DrawOp::Text {
            x,
            y,
            text: text.into(),
            font,
            color,
        });
    }

    fn rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgb) {
        self.page().ops.push(DrawOp::Rect {
            x,
            y,
            width,
            height,
            stroke: color,
            fill: color.tint(),
        });
    }

    /// One line at the cursor, then advance
    fn line(&mut self, x: f32, text: impl Into<String>, font: Font, color: Rgb) {
        self.ensure_room(1);
        let y = self.y;
        self.text_at(x, y, text, font, color);
        self.y -= LINE_HEIGHT;
    }

    fn plain(&mut self, text: impl Into<String>) {
        self.line(MARGIN, text, Font::Regular, Rgb::BLACK);
    }

    fn heading(&mut self, text: &str) {
        self.line(MARGIN, text, Font::Bold, Rgb::BLACK);
    }

    fn paragraph(&mut self, text: &str) {
        for line in wrap(text, BODY_CHARS) {
            self.plain(line);
        }
    }

    fn gap(&mut self) {
        self.y -= LINE_HEIGHT;
    }
}

/// Lay out the full report
pub fn build_layout(content: &ReportContent<'_>) -> ReportLayout {
    let results = content.results;
    let mut cursor = PageCursor::new();

    cursor.heading("VÝSLEDEK KONTROLY NEMOVITOSTI");
    cursor.plain("AI Automatická Kontrola");
    cursor.gap();

    recommendation_banner(&mut cursor, results);
    basic_data(&mut cursor, content.property);
    field_rows(&mut cursor, content.property, results);
    floor_area(&mut cursor, content.property, &results.floor_area_estimate);
    cadastral_map(&mut cursor, results);
    issues(&mut cursor, results);

    cursor.heading("SHRNUTÍ");
    cursor.paragraph(&results.summary);
    cursor.gap();

    if let Some(note) = content.bank_officer_note.map(str::trim).filter(|n| !n.is_empty()) {
        cursor.heading("POZNÁMKA BANKÉŘE");
        cursor.paragraph(note);
    }

    let mut layout = ReportLayout {
        pages: cursor.pages,
    };
    add_footers(&mut layout, &content.checked_at);
    layout
}

fn recommendation_banner(cursor: &mut PageCursor, results: &AiResponse) {
    let color: Rgb = results.recommendation.color().into();
    let y = cursor.y;
    cursor.rect(MARGIN, y - 20.0, PAGE_WIDTH - 2.0 * MARGIN, 30.0, color);
    cursor.text_at(
        MARGIN + 10.0,
        y - 5.0,
        format!(
            "DOPORUČENÍ: {}",
            results.recommendation.label().to_uppercase()
        ),
        Font::Bold,
        Rgb::BLACK,
    );
    cursor.y -= 50.0;
}

fn basic_data(cursor: &mut PageCursor, property: &dyn DeclaredProperty) {
    cursor.heading("ZÁKLADNÍ ÚDAJE");
    cursor.plain(format!("Adresa: {}", property.address_line()));
    cursor.plain(format!("PSČ: {}", property.zip_code()));
    if let Some(cadastral) = property.cadastral_line() {
        cursor.plain(format!("Katastr: {}", cadastral));
    }
    cursor.gap();
}

fn field_rows(cursor: &mut PageCursor, property: &dyn DeclaredProperty, results: &AiResponse) {
    cursor.heading("VÝSLEDKY KONTROLY POLÍ");

    for field in CheckedField::ALL {
        let verdict = results.field(field).unwrap_or_default();
        let label_lines = wrap(
            &format!("{}: {}", field.label(), property.declared_value(field)),
            LABEL_COLUMN_CHARS,
        );
        let note_lines = if verdict.note.trim().is_empty() {
            Vec::new()
        } else {
            wrap(&format!("({})", verdict.note.trim()), NOTE_COLUMN_CHARS)
        };

        let rows = label_lines.len().max(note_lines.len()).max(1);
        cursor.ensure_room(rows);
        let top = cursor.y;
        cursor.rect(MARGIN, top - 12.0, 20.0, 12.0, verdict.color.into());

        for (i, line) in label_lines.into_iter().enumerate() {
            let y = top - 5.0 - i as f32 * LINE_HEIGHT;
            cursor.text_at(MARGIN + 25.0, y, line, Font::Regular, Rgb::BLACK);
        }
        for (i, line) in note_lines.into_iter().enumerate() {
            let y = top - 5.0 - i as f32 * LINE_HEIGHT;
            cursor.text_at(NOTE_COLUMN_X, y, line, Font::Regular, Rgb::GRAY);
        }
        cursor.y = top - rows as f32 * LINE_HEIGHT;
    }
    cursor.gap();
}

fn floor_area(cursor: &mut PageCursor, property: &dyn DeclaredProperty, estimate: &FloorAreaEstimate) {
    cursor.heading("VÝPOČET PODLAHOVÉ PLOCHY");
    cursor.plain(format!("Klient uvedl: {}", property.declared_floor_area()));
    if let Some(pdf_value) = estimate.pdf_value {
        cursor.plain(format!("Údaj v PDF: {} m²", format_number(pdf_value)));
    }
    cursor.plain(format!(
        "AI vypočítala: {} m²",
        format_number(estimate.calculated)
    ));
    cursor.plain(format!("Jistota: {}%", format_number(estimate.confidence)));
    cursor.plain(format!("Metoda: {}", estimate.method.label()));
    if !estimate.matches_client_data {
        if let Some(difference) = estimate.difference {
            cursor.line(
                MARGIN,
                format!("Rozdíl: {} m²", format_number(difference)),
                Font::Regular,
                Rgb::RED,
            );
        }
    }
    if !estimate.details.trim().is_empty() {
        cursor.paragraph(&format!("Detail: {}", estimate.details.trim()));
    }
    cursor.gap();
}

fn cadastral_map(cursor: &mut PageCursor, results: &AiResponse) {
    let Some(check) = results.cadastral_map_check.as_ref().filter(|c| c.available) else {
        return;
    };
    let verdict = |v: Option<bool>| match v {
        Some(true) => "Ano",
        Some(false) => "Ne",
        None => "neověřeno",
    };

    cursor.heading("KATASTRÁLNÍ MAPA");
    cursor.plain(format!(
        "Výměra pozemku odpovídá: {}",
        verdict(check.land_area_matches)
    ));
    cursor.plain(format!(
        "Umístění stavby odpovídá: {}",
        verdict(check.building_location_correct)
    ));
    if !check.notes.trim().is_empty() {
        cursor.paragraph(&format!("Poznámka: {}", check.notes.trim()));
    }
    cursor.gap();
}

fn direction_label(direction: &str) -> &str {
    match direction {
        "north" => "sever",
        "south" => "jih",
        "east" => "východ",
        "west" => "západ",
        other => other,
    }
}

fn issues(cursor: &mut PageCursor, results: &AiResponse) {
    let issues = &results.issues;
    if !issues.any() {
        return;
    }

    cursor.heading("NALEZENÉ PROBLÉMY");
    if issues.under_construction {
        cursor.line(MARGIN, "• Nemovitost je v rekonstrukci", Font::Regular, Rgb::RED);
    }
    if issues.severely_damaged {
        cursor.line(MARGIN, "• Výrazné poškození nemovitosti", Font::Regular, Rgb::RED);
    }
    if issues.visible_cracks {
        cursor.line(MARGIN, "• Viditelné praskliny", Font::Regular, Rgb::RED);
    }
    if issues.facade_damage_percent > 0.0 {
        cursor.line(
            MARGIN,
            format!(
                "• Poškození fasády: {}%",
                format_number(issues.facade_damage_percent)
            ),
            Font::Regular,
            Rgb::RED,
        );
    }
    if let Some(coverage) = issues
        .incomplete_exterior_coverage
        .as_ref()
        .filter(|c| c.severity == CoverageSeverity::Critical)
    {
        let missing: Vec<&str> = coverage
            .missing_directions
            .iter()
            .map(|d| direction_label(d))
            .collect();
        cursor.line(
            MARGIN,
            format!("• Chybí pohledy na dům: {}", missing.join(", ")),
            Font::Regular,
            Rgb::RED,
        );
    }
    if issues.photos_outdated {
        cursor.line(MARGIN, "• Fotografie nejsou aktuální", Font::Regular, Rgb::ORANGE);
    }
    if !issues.missing_photos.is_empty() {
        cursor.line(MARGIN, "• Chybějící fotografie:", Font::Regular, Rgb::ORANGE);
        for missing in &issues.missing_photos {
            cursor.line(MARGIN + 10.0, format!("  - {}", missing), Font::Regular, Rgb::BLACK);
        }
    }
    cursor.gap();
}

fn add_footers(layout: &mut ReportLayout, checked_at: &str) {
    let total = layout.pages.len();
    for (index, page) in layout.pages.iter_mut().enumerate() {
        let footer = [
            (MARGIN, 30.0, format!("Datum kontroly: {}", checked_at)),
            (MARGIN, 15.0, "Zpracováno pomocí umělé inteligence".to_string()),
            (
                PAGE_WIDTH - MARGIN - 50.0,
                15.0,
                format!("Strana {} / {}", index + 1, total),
            ),
        ];
        for (x, y, text) in footer {
            page.ops.push(DrawOp::Text {
                x,
                y,
                text,
                font: Font::Regular,
                color: Rgb::GRAY,
            });
        }
    }
}
