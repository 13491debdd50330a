use std::io::Read;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::validate::{EntryRejection, RawEntry};

/// Header names match the extraction prompt's JSON keys.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    title: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    provider: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    amount: Option<String>,
    #[serde(default, rename = "amountType", deserialize_with = "empty_string_as_none")]
    amount_type: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    deadline: Option<String>,
    #[serde(default, rename = "minCGPA", deserialize_with = "empty_string_as_none")]
    min_cgpa: Option<String>,
    #[serde(default, rename = "maxIncome", deserialize_with = "empty_string_as_none")]
    max_income: Option<String>,
    #[serde(
        default,
        rename = "courseRestriction",
        deserialize_with = "empty_string_as_none"
    )]
    course_restriction: Option<String>,
    #[serde(
        default,
        rename = "categoryRestriction",
        deserialize_with = "empty_string_as_none"
    )]
    category_restriction: Option<String>,
    #[serde(
        default,
        rename = "yearRestriction",
        deserialize_with = "empty_string_as_none"
    )]
    year_restriction: Option<String>,
    #[serde(default, rename = "applyLink", deserialize_with = "empty_string_as_none")]
    apply_link: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    description: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    location: Option<String>,
    #[serde(
        default,
        rename = "educationLevel",
        deserialize_with = "empty_string_as_none"
    )]
    education_level: Option<String>,
}

impl From<CsvRow> for RawEntry {
    fn from(row: CsvRow) -> Self {
        let value = |field: Option<String>| field.map(Value::String);
        RawEntry {
            title: value(row.title),
            provider: value(row.provider),
            amount: value(row.amount),
            amount_type: value(row.amount_type),
            deadline: value(row.deadline),
            min_cgpa: value(row.min_cgpa),
            max_income: value(row.max_income),
            course_restriction: value(row.course_restriction),
            category_restriction: value(row.category_restriction),
            year_restriction: value(row.year_restriction),
            apply_link: value(row.apply_link),
            description: value(row.description),
            location: value(row.location),
            education_level: value(row.education_level),
        }
    }
}

/// Read a bulk-import sheet into raw entries for the shared validation path.
///
/// An unreadable header fails the sheet. An unreadable row becomes a
/// [`EntryRejection::Malformed`] in its place so the other rows still go through.
pub fn read_entries<R: Read>(
    reader: R,
) -> Result<Vec<Result<RawEntry, EntryRejection>>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    csv_reader.headers()?;
    let mut entries = Vec::new();

    for (index, record) in csv_reader.deserialize::<CsvRow>().enumerate() {
        match record {
            Ok(row) => entries.push(Ok(RawEntry::from(row))),
            Err(err) if matches!(err.kind(), csv::ErrorKind::Io(_)) => return Err(err),
            Err(err) => entries.push(Err(EntryRejection::Malformed {
                row: index + 1,
                reason: err.to_string(),
            })),
        }
    }

    Ok(entries)
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
