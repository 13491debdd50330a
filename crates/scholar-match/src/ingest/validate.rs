use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::portal::domain::{AmountType, NewScholarship};

static NUMBER: OnceLock<Regex> = OnceLock::new();
static ISO_DATE: OnceLock<Regex> = OnceLock::new();

fn number_pattern() -> &'static Regex {
    NUMBER.get_or_init(|| Regex::new(r"\d+(?:\.\d+)?").expect("valid regex"))
}

fn iso_date_pattern() -> &'static Regex {
    ISO_DATE.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid regex"))
}

const PLACEHOLDERS: [&str; 6] = ["null", "none", "n/a", "na", "-", "not specified"];

/// One listing as emitted by the model or read from a CSV row. Every field is
/// loosely typed; [`normalize_entry`] decides what survives.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawEntry {
    #[serde(default)]
    pub title: Option<Value>,
    #[serde(default)]
    pub provider: Option<Value>,
    #[serde(default)]
    pub amount: Option<Value>,
    #[serde(default, rename = "amountType")]
    pub amount_type: Option<Value>,
    #[serde(default)]
    pub deadline: Option<Value>,
    #[serde(default, rename = "minCGPA", alias = "minCgpa")]
    pub min_cgpa: Option<Value>,
    #[serde(default, rename = "maxIncome")]
    pub max_income: Option<Value>,
    #[serde(default, rename = "courseRestriction")]
    pub course_restriction: Option<Value>,
    #[serde(default, rename = "categoryRestriction")]
    pub category_restriction: Option<Value>,
    #[serde(default, rename = "yearRestriction")]
    pub year_restriction: Option<Value>,
    #[serde(default, rename = "applyLink")]
    pub apply_link: Option<Value>,
    #[serde(default)]
    pub description: Option<Value>,
    #[serde(default)]
    pub location: Option<Value>,
    #[serde(default, rename = "educationLevel")]
    pub education_level: Option<Value>,
}

/// Why an entry was skipped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EntryRejection {
    #[error("entry is not a JSON object")]
    NotAnObject,
    #[error("missing title")]
    MissingTitle,
    #[error("missing provider")]
    MissingProvider,
    #[error("row {row} could not be read: {reason}")]
    Malformed { row: usize, reason: String },
}

pub fn parse_entry(value: Value) -> Result<RawEntry, EntryRejection> {
    if !value.is_object() {
        return Err(EntryRejection::NotAnObject);
    }
    serde_json::from_value(value).map_err(|_| EntryRejection::NotAnObject)
}

/// Turn a raw entry into a listing, dropping any field that fails its format rule.
pub fn normalize_entry(raw: RawEntry, source: Option<&str>) -> Result<NewScholarship, EntryRejection> {
    let title = text(raw.title.as_ref()).ok_or(EntryRejection::MissingTitle)?;
    let provider = text(raw.provider.as_ref()).ok_or(EntryRejection::MissingProvider)?;

    Ok(NewScholarship {
        title,
        provider,
        amount: number(raw.amount.as_ref()).filter(|amount| *amount >= 0.0),
        amount_type: text(raw.amount_type.as_ref()).and_then(|value| AmountType::parse(&value)),
        deadline: text(raw.deadline.as_ref()).and_then(|value| iso_date(&value)),
        location: text(raw.location.as_ref()),
        education_level: text(raw.education_level.as_ref()),
        min_cgpa: number(raw.min_cgpa.as_ref()).and_then(cgpa_scale),
        max_income: number(raw.max_income.as_ref()).filter(|income| *income >= 0.0),
        course_restriction: text(raw.course_restriction.as_ref()),
        category_restriction: text(raw.category_restriction.as_ref()),
        year_restriction: text(raw.year_restriction.as_ref()),
        apply_link: text(raw.apply_link.as_ref()).filter(|link| is_http_link(link)),
        description: text(raw.description.as_ref()),
        tags: Vec::new(),
        source_document: source.map(str::to_string),
    })
}

fn text(value: Option<&Value>) -> Option<String> {
    let rendered = match value? {
        Value::String(value) => value.trim().to_string(),
        Value::Number(number) => number.to_string(),
        _ => return None,
    };
    if rendered.is_empty()
        || PLACEHOLDERS
            .iter()
            .any(|placeholder| rendered.eq_ignore_ascii_case(placeholder))
    {
        None
    } else {
        Some(rendered)
    }
}

/// Numbers arrive as JSON numbers or as strings such as "₹50,000 per annum".
pub(crate) fn number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(number) => number.as_f64(),
        Value::String(raw) => parse_number_text(raw),
        _ => None,
    }
}

pub(crate) fn parse_number_text(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|ch| *ch != ',').collect();
    number_pattern()
        .find(&cleaned)
        .and_then(|found| found.as_str().parse::<f64>().ok())
}

/// CGPA on the 10-point scale. Percentages are rescaled; anything else is dropped.
pub(crate) fn cgpa_scale(value: f64) -> Option<f32> {
    if (0.0..=10.0).contains(&value) {
        Some(value as f32)
    } else if value > 10.0 && value <= 100.0 {
        Some((value / 10.0) as f32)
    } else {
        None
    }
}

pub(crate) fn iso_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if !iso_date_pattern().is_match(trimmed) {
        return None;
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").ok()
}

pub(crate) fn is_http_link(link: &str) -> bool {
    let lower = link.to_ascii_lowercase();
    (lower.starts_with("http://") || lower.starts_with("https://")) && !link.contains(char::is_whitespace)
}
