//! Instruction templates for the model
//!
//! Templates live in `prompts/` and are compiled in. Placeholders use the
//! `{{name}}` form; unknown placeholders are left untouched.

use appraisal_common::property::{format_number, yes_no, PropertyFormData};
use appraisal_common::time::iso_date;
use appraisal_common::validation::required_photo_counts;
use chrono::NaiveDate;

const FORM_ANALYSIS: &str = include_str!("../../prompts/form_analysis.txt");
const PDF_ANALYSIS: &str = include_str!("../../prompts/pdf_analysis.txt");

/// Substitute `{{name}}` placeholders
pub fn render(template: &str, vars: &[(&str, String)]) -> String {
    vars.iter().fold(template.to_string(), |text, (name, value)| {
        text.replace(&format!("{{{{{}}}}}", name), value)
    })
}

fn availability(present: bool) -> String {
    if present { "K DISPOZICI" } else { "NENÍ K DISPOZICI" }.to_string()
}

/// Instructions for the form flow: the client's declared values are
/// embedded so the model checks them against the photos
pub fn form_analysis_prompt(
    form: &PropertyFormData,
    today: NaiveDate,
    project_doc: bool,
    cadastral_map: bool,
) -> String {
    let counts = required_photo_counts(form.layout, form.garage_count);
    render(
        FORM_ANALYSIS,
        &[
            ("layout", form.layout.label().to_string()),
            ("required_exterior", counts.exterior.to_string()),
            ("required_kitchen", counts.kitchen.to_string()),
            ("required_bathroom", counts.bathroom.to_string()),
            ("required_hallway", counts.hallway.to_string()),
            ("required_rooms", counts.rooms.to_string()),
            ("required_interior", counts.interior_total().to_string()),
            ("garage_count", counts.garage.to_string()),
            ("property_condition", form.property_condition.label().to_string()),
            ("number_of_floors", form.number_of_floors.to_string()),
            ("has_attic", yes_no(form.has_attic).to_string()),
            ("attic_habitable", yes_no(form.attic_habitable).to_string()),
            ("has_basement", yes_no(form.has_basement).to_string()),
            ("roof_type", form.roof_type.label().to_string()),
            ("land_area", format_number(form.land_area)),
            ("built_up_area", format_number(form.built_up_area)),
            ("total_floor_area", format_number(form.total_floor_area)),
            ("project_doc", availability(project_doc)),
            ("cadastral_map", availability(cadastral_map)),
            ("today", iso_date(today)),
        ],
    )
}

/// Instructions for the PDF flow: extract from the form, then verify
pub fn pdf_analysis_prompt(today: NaiveDate, technical_doc: bool, cadastral_map: bool) -> String {
    render(
        PDF_ANALYSIS,
        &[
            ("technical_doc", availability(technical_doc)),
            ("cadastral_map", availability(cadastral_map)),
            ("today", iso_date(today)),
        ],
    )
}
