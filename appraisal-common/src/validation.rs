//! Intake form validation rules
//!
//! Messages are user-facing (Czech). Validation stops at the first violated
//! rule, so the caller can show exactly one actionable message.

use chrono::Datelike;
use serde_json::Value;

use crate::property::{Layout, PropertyFormData};
use crate::{Error, Result};

const REQUIRED: &str = "Povinné pole";

/// Whole-number members and their message for fractional input
const INTEGER_FIELDS: [(&str, &str); 2] = [
    ("constructionYear", "Rok musí být celé číslo"),
    ("garageCount", "Počet garáží musí být celé číslo"),
];

/// Minimum photo counts derived from the form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequiredPhotoCounts {
    /// Four cardinal sides plus the house number plate
    pub exterior: u32,
    pub kitchen: u32,
    pub bathroom: u32,
    pub hallway: u32,
    pub rooms: u32,
    pub garage: u32,
}

impl RequiredPhotoCounts {
    pub fn interior_total(&self) -> u32 {
        self.kitchen + self.bathroom + self.hallway + self.rooms
    }
}

pub fn required_photo_counts(layout: Layout, garage_count: i64) -> RequiredPhotoCounts {
    RequiredPhotoCounts {
        exterior: 5,
        kitchen: 1,
        bathroom: 1,
        hallway: 1,
        rooms: layout.required_room_photos(),
        garage: u32::try_from(garage_count.max(0)).unwrap_or(u32::MAX),
    }
}

/// Parse and validate raw form JSON
///
/// Shape errors (missing members, unknown enumeration labels, wrong types)
/// and rule violations both come back as [`Error::InvalidInput`].
pub fn parse_property_form(raw: &Value) -> Result<PropertyFormData> {
    let mut raw = raw.clone();
    normalize_integers(&mut raw)?;
    let form: PropertyFormData = serde_json::from_value(raw)
        .map_err(|e| Error::InvalidInput(format!("chybný formát ({})", e)))?;
    validate_property_form(&form, chrono::Local::now().year())?;
    Ok(form)
}

/// Reject fractional numbers where a whole number is expected; integral
/// floats such as `1998.0` are accepted
fn normalize_integers(raw: &mut Value) -> Result<()> {
    for (key, message) in INTEGER_FIELDS {
        let Some(Value::Number(number)) = raw.get_mut(key) else {
            continue;
        };
        if number.is_i64() || number.is_u64() {
            continue;
        }
        match number.as_f64() {
            Some(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
                *number = serde_json::Number::from(value as i64);
            }
            _ => return Err(invalid(message)),
        }
    }
    Ok(())
}

/// Check value rules that the type system cannot express
///
/// `current_year` bounds the construction year (at most two years ahead).
pub fn validate_property_form(form: &PropertyFormData, current_year: i32) -> Result<()> {
    let required = [
        &form.address.street,
        &form.address.house_number,
        &form.address.city,
    ];
    for value in required {
        require_non_empty(value)?;
    }

    if !is_valid_zip(&form.address.zip_code) {
        return Err(invalid("Neplatné PSČ (formát: 12345)"));
    }

    let cadastral = [
        &form.cadastral.region,
        &form.cadastral.district,
        &form.cadastral.municipality,
        &form.cadastral.cadastral_area,
        &form.cadastral.land_registry_number,
    ];
    for value in cadastral {
        require_non_empty(value)?;
    }

    if !matches!(form.number_of_floors, 1 | 2) {
        return Err(invalid("Počet podlaží musí být 1 nebo 2"));
    }

    if !(form.land_area > 0.0) {
        return Err(invalid("Plocha pozemku musí být kladné číslo"));
    }
    if !(form.built_up_area > 0.0) {
        return Err(invalid("Zastavěná plocha musí být kladné číslo"));
    }
    if !(form.total_floor_area > 0.0) {
        return Err(invalid("Celková plocha musí být kladné číslo"));
    }

    if form.construction_year < 1800 {
        return Err(invalid("Rok výstavby musí být po roce 1800"));
    }
    if form.construction_year > i64::from(current_year) + 2 {
        return Err(invalid("Rok výstavby nemůže být v budoucnosti"));
    }

    require_non_empty(&form.construction_type)?;

    if form.garage_count < 0 {
        return Err(invalid("Počet garáží nemůže být záporný"));
    }

    require_non_empty(&form.utilities.heating)?;

    Ok(())
}

fn require_non_empty(value: &str) -> Result<()> {
    if value.is_empty() {
        Err(invalid(REQUIRED))
    } else {
        Ok(())
    }
}

fn is_valid_zip(zip: &str) -> bool {
    zip.len() == 5 && zip.bytes().all(|b| b.is_ascii_digit())
}

fn invalid(message: &str) -> Error {
    Error::InvalidInput(message.to_string())
}
