//! AI analysis response model
//!
//! The external model is asked, by prompt convention only, to answer with a
//! JSON object of this shape. The analysis endpoints pass the reply through
//! untouched; these types exist for the consumers that need typed access
//! (the report generator), and they are deliberately lenient: every member
//! defaults when missing and unknown enumeration values decode to `Unknown`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::property::ExtractedPropertyData;

/// The ten form attributes the model verifies against the photographs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckedField {
    PropertyCondition,
    Layout,
    NumberOfFloors,
    HasAttic,
    AtticHabitable,
    HasBasement,
    RoofType,
    LandArea,
    BuiltUpArea,
    TotalFloorArea,
}

impl CheckedField {
    /// Report and review order
    pub const ALL: [CheckedField; 10] = [
        CheckedField::PropertyCondition,
        CheckedField::Layout,
        CheckedField::NumberOfFloors,
        CheckedField::HasAttic,
        CheckedField::AtticHabitable,
        CheckedField::HasBasement,
        CheckedField::RoofType,
        CheckedField::LandArea,
        CheckedField::BuiltUpArea,
        CheckedField::TotalFloorArea,
    ];

    /// JSON member name inside `validation`
    pub fn key(self) -> &'static str {
        match self {
            CheckedField::PropertyCondition => "propertyCondition",
            CheckedField::Layout => "layout",
            CheckedField::NumberOfFloors => "numberOfFloors",
            CheckedField::HasAttic => "hasAttic",
            CheckedField::AtticHabitable => "atticHabitable",
            CheckedField::HasBasement => "hasBasement",
            CheckedField::RoofType => "roofType",
            CheckedField::LandArea => "landArea",
            CheckedField::BuiltUpArea => "builtUpArea",
            CheckedField::TotalFloorArea => "totalFloorArea",
        }
    }

    /// Czech display label
    pub fn label(self) -> &'static str {
        match self {
            CheckedField::PropertyCondition => "Stav nemovitosti",
            CheckedField::Layout => "Dispozice",
            CheckedField::NumberOfFloors => "Počet podlaží",
            CheckedField::HasAttic => "Podkroví",
            CheckedField::AtticHabitable => "Obytné podkroví",
            CheckedField::HasBasement => "Sklep",
            CheckedField::RoofType => "Typ střechy",
            CheckedField::LandArea => "Plocha pozemku",
            CheckedField::BuiltUpArea => "Zastavěná plocha",
            CheckedField::TotalFloorArea => "Celková plocha",
        }
    }

    pub fn is_area(self) -> bool {
        matches!(
            self,
            CheckedField::LandArea | CheckedField::BuiltUpArea | CheckedField::TotalFloorArea
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Traffic-light verdict color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldColor {
    Green,
    Red,
    Yellow,
    #[default]
    #[serde(other)]
    Unknown,
}

impl FieldColor {
    /// RGB components in 0.0..=1.0
    pub fn rgb(self) -> (f32, f32, f32) {
        match self {
            FieldColor::Green => (0.0, 0.78, 0.33),
            FieldColor::Red => (1.0, 0.23, 0.19),
            FieldColor::Yellow => (1.0, 0.72, 0.0),
            FieldColor::Unknown => (0.5, 0.5, 0.5),
        }
    }
}

/// Per-field verdict bundle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldValidation {
    pub matches: bool,
    pub confidence: ConfidenceLevel,
    pub note: String,
    pub color: FieldColor,
    /// Value the model read from the uploaded form (PDF flow only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_value: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EstimateMethod {
    TechnicalDocumentation,
    ProjectDocumentation,
    PdfDocument,
    InteriorPhotos,
    ExteriorEstimate,
    #[default]
    #[serde(other)]
    Unknown,
}

impl EstimateMethod {
    pub fn label(self) -> &'static str {
        match self {
            EstimateMethod::TechnicalDocumentation => "technická dokumentace",
            EstimateMethod::ProjectDocumentation => "projektová dokumentace",
            EstimateMethod::PdfDocument => "údaj z PDF formuláře",
            EstimateMethod::InteriorPhotos => "fotografie interiéru",
            EstimateMethod::ExteriorEstimate => "odhad z exteriéru",
            EstimateMethod::Unknown => "neuvedeno",
        }
    }
}

/// AI-derived habitable floor area
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FloorAreaEstimate {
    pub calculated: f64,
    /// 0-100 %
    pub confidence: f64,
    pub method: EstimateMethod,
    pub details: String,
    pub matches_client_data: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difference: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_value: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CadastralMapCheck {
    pub available: bool,
    pub land_area_matches: Option<bool>,
    pub building_location_correct: Option<bool>,
    pub notes: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CoverageSeverity {
    Critical,
    Acceptable,
    #[default]
    Complete,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExteriorCoverage {
    pub is_row_house: bool,
    pub missing_directions: Vec<String>,
    pub severity: CoverageSeverity,
}

/// Structured issue set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PropertyIssues {
    pub under_construction: bool,
    pub severely_damaged: bool,
    pub visible_cracks: bool,
    pub facade_damage_percent: f64,
    pub missing_photos: Vec<String>,
    pub photos_outdated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incomplete_exterior_coverage: Option<ExteriorCoverage>,
}

impl PropertyIssues {
    /// Whether the report needs an issues section at all
    pub fn any(&self) -> bool {
        self.under_construction
            || self.severely_damaged
            || self.visible_cracks
            || self.facade_damage_percent > 0.0
            || !self.missing_photos.is_empty()
            || self.photos_outdated
            || self
                .incomplete_exterior_coverage
                .as_ref()
                .is_some_and(|c| c.severity == CoverageSeverity::Critical)
    }
}

/// Final categorical verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Recommendation {
    Approved,
    Rejected,
    #[default]
    #[serde(other)]
    ManualReview,
}

impl Recommendation {
    pub fn label(self) -> &'static str {
        match self {
            Recommendation::Approved => "Schváleno",
            Recommendation::Rejected => "Zamítnuto",
            Recommendation::ManualReview => "Manuální kontrola",
        }
    }

    /// Banner color
    pub fn color(self) -> FieldColor {
        match self {
            Recommendation::Approved => FieldColor::Green,
            Recommendation::Rejected => FieldColor::Red,
            Recommendation::ManualReview => FieldColor::Yellow,
        }
    }
}

/// Complete model verdict
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AiResponse {
    /// Keyed by [`CheckedField::key`]; missing fields are simply absent
    pub validation: Map<String, Value>,
    pub floor_area_estimate: FloorAreaEstimate,
    pub cadastral_map_check: Option<CadastralMapCheck>,
    pub issues: PropertyIssues,
    pub recommendation: Recommendation,
    pub summary: String,
    /// PDF flow only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_data: Option<ExtractedPropertyData>,
}

impl AiResponse {
    /// Typed verdict for one field; `None` when the model omitted it or
    /// answered with something that is not an object
    pub fn field(&self, field: CheckedField) -> Option<FieldValidation> {
        self.validation
            .get(field.key())
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// Overlay a reviewer's partial edits onto the model result
///
/// Top-level members of `edits` replace those of `base` wholesale; nested
/// objects are not merged.
pub fn merge_manual_edits(base: &Value, edits: Option<&Value>) -> Value {
    let mut merged = base.clone();
    if let (Value::Object(target), Some(Value::Object(overlay))) = (&mut merged, edits) {
        for (key, value) in overlay {
            target.insert(key.clone(), value.clone());
        }
    }
    merged
}
