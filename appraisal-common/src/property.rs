//! Property form data model
//!
//! Mirrors the appraisal form a client fills in ("Ocenění rodinného domu").
//! Enumerations serialize to the Czech labels used on the form itself, so the
//! JSON produced by the browser deserializes without any mapping layer.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::analysis::CheckedField;

/// Postal address of the appraised property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub street: String,
    pub house_number: String,
    pub city: String,
    pub zip_code: String,
}

/// Land registry identification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cadastral {
    pub region: String,
    pub district: String,
    pub municipality: String,
    pub cadastral_area: String,
    /// List vlastnictví (LV) number
    pub land_registry_number: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyCondition {
    #[serde(rename = "novostavba")]
    NewBuild,
    #[serde(rename = "výborně udržovaný")]
    Excellent,
    #[serde(rename = "dobře udržovaný")]
    Good,
    #[serde(rename = "neudržovaný k celkové rekonstrukci")]
    NeedsReconstruction,
}

impl PropertyCondition {
    pub fn label(self) -> &'static str {
        match self {
            PropertyCondition::NewBuild => "novostavba",
            PropertyCondition::Excellent => "výborně udržovaný",
            PropertyCondition::Good => "dobře udržovaný",
            PropertyCondition::NeedsReconstruction => "neudržovaný k celkové rekonstrukci",
        }
    }
}

/// Room layout ("dispozice")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Layout {
    #[serde(rename = "1kk")]
    OneKk,
    #[serde(rename = "1+1")]
    OnePlusOne,
    #[serde(rename = "2+1")]
    TwoPlusOne,
    #[serde(rename = "3+1")]
    ThreePlusOne,
    #[serde(rename = "4+1")]
    FourPlusOne,
    #[serde(rename = "5+1")]
    FivePlusOne,
    #[serde(rename = "6+1")]
    SixPlusOne,
    #[serde(rename = "7+1")]
    SevenPlusOne,
    #[serde(rename = "jiný")]
    Other,
}

impl Layout {
    pub fn label(self) -> &'static str {
        match self {
            Layout::OneKk => "1kk",
            Layout::OnePlusOne => "1+1",
            Layout::TwoPlusOne => "2+1",
            Layout::ThreePlusOne => "3+1",
            Layout::FourPlusOne => "4+1",
            Layout::FivePlusOne => "5+1",
            Layout::SixPlusOne => "6+1",
            Layout::SevenPlusOne => "7+1",
            Layout::Other => "jiný",
        }
    }

    /// Number of room photos the layout requires (kitchen, bathroom and
    /// hallway are counted separately)
    pub fn required_room_photos(self) -> u32 {
        match self {
            Layout::OneKk | Layout::OnePlusOne | Layout::Other => 1,
            Layout::TwoPlusOne => 2,
            Layout::ThreePlusOne => 3,
            Layout::FourPlusOne => 4,
            Layout::FivePlusOne => 5,
            Layout::SixPlusOne => 6,
            Layout::SevenPlusOne => 7,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoofType {
    #[serde(rename = "valbová")]
    Hipped,
    #[serde(rename = "mansardová")]
    Mansard,
    #[serde(rename = "plochá")]
    Flat,
    #[serde(rename = "pultová")]
    Shed,
    #[serde(rename = "stanová")]
    Pyramid,
    #[serde(rename = "věžová")]
    Spire,
    #[serde(rename = "polovalbová")]
    HalfHipped,
}

impl RoofType {
    pub fn label(self) -> &'static str {
        match self {
            RoofType::Hipped => "valbová",
            RoofType::Mansard => "mansardová",
            RoofType::Flat => "plochá",
            RoofType::Shed => "pultová",
            RoofType::Pyramid => "stanová",
            RoofType::Spire => "věžová",
            RoofType::HalfHipped => "polovalbová",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaterSupply {
    #[serde(rename = "síť")]
    Mains,
    #[serde(rename = "studna")]
    Well,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElectricitySupply {
    #[serde(rename = "síť")]
    Grid,
    #[serde(rename = "ostrovní")]
    OffGrid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sewage {
    #[serde(rename = "tlaková kanalizace")]
    Pressure,
    #[serde(rename = "spádová kanalizace")]
    Gravity,
    #[serde(rename = "ČOV (čistička odpadních vod)")]
    TreatmentPlant,
}

/// Utility connections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utilities {
    pub water: WaterSupply,
    pub electricity: ElectricitySupply,
    pub sewage: Sewage,
    pub gas: bool,
    pub heating: String,
}

/// Data entered by the bank employee on the intake form
///
/// Immutable once submitted for analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyFormData {
    pub address: Address,
    pub cadastral: Cadastral,
    pub property_condition: PropertyCondition,
    pub layout: Layout,
    /// 1 or 2; enforced by [`crate::validation::validate_property_form`]
    pub number_of_floors: u8,
    pub has_attic: bool,
    pub attic_habitable: bool,
    pub has_basement: bool,
    pub roof_type: RoofType,
    pub land_area: f64,
    pub built_up_area: f64,
    pub total_floor_area: f64,
    pub construction_year: i64,
    pub construction_type: String,
    pub garage_count: i64,
    pub utilities: Utilities,
}

/// Property data as read back by the model from the uploaded form PDF
///
/// Loosely typed: the model is free to answer with strings or numbers, and
/// any member may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractedPropertyData {
    pub address: Option<Value>,
    pub cadastral: Option<Value>,
    pub property_condition: Option<Value>,
    pub construction: Option<Value>,
    pub layout: Option<Value>,
    pub number_of_floors: Option<Value>,
    pub has_attic: Option<Value>,
    pub attic_habitable: Option<Value>,
    pub has_basement: Option<Value>,
    pub roof_type: Option<Value>,
    pub garage_count: Option<Value>,
    pub land_area: Option<Value>,
    pub built_up_area: Option<Value>,
    pub total_floor_area: Option<Value>,
    pub utilities: Option<Value>,
}

/// Everything the report needs to know about the declared property
pub trait DeclaredProperty {
    /// Single address line ("street number, city")
    fn address_line(&self) -> String;
    fn zip_code(&self) -> String;
    /// Cadastral area and land registry number, when known
    fn cadastral_line(&self) -> Option<String>;
    /// Declared value of a checked field, formatted for display
    fn declared_value(&self, field: CheckedField) -> String;
    /// Declared total floor area, formatted with unit
    fn declared_floor_area(&self) -> String {
        self.declared_value(CheckedField::TotalFloorArea)
    }
}

impl DeclaredProperty for PropertyFormData {
    fn address_line(&self) -> String {
        format!(
            "{} {}, {}",
            self.address.street, self.address.house_number, self.address.city
        )
    }

    fn zip_code(&self) -> String {
        self.address.zip_code.clone()
    }

    fn cadastral_line(&self) -> Option<String> {
        Some(format!(
            "k.ú. {}, LV {}",
            self.cadastral.cadastral_area, self.cadastral.land_registry_number
        ))
    }

    fn declared_value(&self, field: CheckedField) -> String {
        match field {
            CheckedField::PropertyCondition => self.property_condition.label().to_string(),
            CheckedField::Layout => self.layout.label().to_string(),
            CheckedField::NumberOfFloors => self.number_of_floors.to_string(),
            CheckedField::HasAttic => yes_no(self.has_attic).to_string(),
            CheckedField::AtticHabitable => yes_no(self.attic_habitable).to_string(),
            CheckedField::HasBasement => yes_no(self.has_basement).to_string(),
            CheckedField::RoofType => self.roof_type.label().to_string(),
            CheckedField::LandArea => square_meters(self.land_area),
            CheckedField::BuiltUpArea => square_meters(self.built_up_area),
            CheckedField::TotalFloorArea => square_meters(self.total_floor_area),
        }
    }
}

impl DeclaredProperty for ExtractedPropertyData {
    fn address_line(&self) -> String {
        let member = |key: &str| {
            self.address
                .as_ref()
                .and_then(|a| a.get(key))
                .map(display_value)
                .unwrap_or_default()
        };
        format!("{} {}, {}", member("street"), member("houseNumber"), member("city"))
    }

    fn zip_code(&self) -> String {
        self.address
            .as_ref()
            .and_then(|a| a.get("zipCode"))
            .map(display_value)
            .unwrap_or_default()
    }

    fn cadastral_line(&self) -> Option<String> {
        let cadastral = self.cadastral.as_ref()?;
        let area = cadastral.get("cadastralArea").map(display_value)?;
        let lv = cadastral
            .get("landRegistryNumber")
            .map(display_value)
            .unwrap_or_default();
        Some(format!("k.ú. {}, LV {}", area, lv))
    }

    fn declared_value(&self, field: CheckedField) -> String {
        let raw = match field {
            CheckedField::PropertyCondition => &self.property_condition,
            CheckedField::Layout => &self.layout,
            CheckedField::NumberOfFloors => &self.number_of_floors,
            CheckedField::HasAttic => &self.has_attic,
            CheckedField::AtticHabitable => &self.attic_habitable,
            CheckedField::HasBasement => &self.has_basement,
            CheckedField::RoofType => &self.roof_type,
            CheckedField::LandArea => &self.land_area,
            CheckedField::BuiltUpArea => &self.built_up_area,
            CheckedField::TotalFloorArea => &self.total_floor_area,
        };
        let Some(value) = raw else {
            return "neuvedeno".to_string();
        };
        let text = display_value(value);
        if field.is_area() && matches!(value, Value::Number(_)) {
            format!("{} m²", text)
        } else {
            text
        }
    }
}

/// "Ano"/"Ne"
pub fn yes_no(value: bool) -> &'static str {
    if value {
        "Ano"
    } else {
        "Ne"
    }
}

/// Area with unit, using the shortest decimal form (120 → "120 m²")
pub fn square_meters(value: f64) -> String {
    format!("{} m²", format_number(value))
}

/// Shortest decimal rendering of a number (120.0 → "120", 120.5 → "120.5")
pub fn format_number(value: f64) -> String {
    format!("{}", value)
}

/// Render a loosely typed JSON scalar for display
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => yes_no(*b).to_string(),
        Value::Number(n) => n.as_f64().map(format_number).unwrap_or_else(|| n.to_string()),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Fully populated form used by unit tests across the crate
#[cfg(test)]
pub(crate) fn sample_form_json() -> Value {
    serde_json::json!({
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
            "gas": true,
            "heating": "plynový kotel"
        }
    })
}
