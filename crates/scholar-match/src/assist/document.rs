use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ingest::{cgpa_scale, iso_date, parse_number_text};
use crate::llm::CompletionRequest;
use crate::portal::domain::{Category, EducationLevel, Gender};

/// Characters of document text sent to the model.
pub const PROMPT_TEXT_LIMIT: usize = 6000;

const SYSTEM: &str = "You extract data from student documents precisely. Reply with valid JSON only.";

const RULES: &str = "Rules:\n- Reply with JSON only, no commentary.\n- Use null for anything not present.\n- Dates are YYYY-MM-DD.\n- CGPA uses the 10-point scale; convert percentages (75% becomes 7.5).\n";

/// Supporting documents a student can parse into profile fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Resume,
    Marksheet,
    #[serde(rename = "idproof")]
    IdProof,
    Income,
    Category,
    Disability,
}

impl DocumentType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "resume" | "cv" => Some(Self::Resume),
            "marksheet" | "transcript" => Some(Self::Marksheet),
            "idproof" | "id" => Some(Self::IdProof),
            "income" => Some(Self::Income),
            "category" => Some(Self::Category),
            "disability" => Some(Self::Disability),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            DocumentType::Resume => "resume",
            DocumentType::Marksheet => "marksheet",
            DocumentType::IdProof => "idproof",
            DocumentType::Income => "income",
            DocumentType::Category => "category",
            DocumentType::Disability => "disability",
        }
    }

    /// Lower wins when two documents disagree.
    pub const fn priority(self) -> u8 {
        match self {
            DocumentType::IdProof => 0,
            DocumentType::Resume => 1,
            DocumentType::Marksheet => 2,
            DocumentType::Income => 3,
            DocumentType::Category => 4,
            DocumentType::Disability => 5,
        }
    }

    fn instructions(self) -> &'static str {
        match self {
            DocumentType::Resume => {
                r#"Parse this resume. Reply with:
{
  "personalInfo": { "name": "", "email": "", "phone": "", "dateOfBirth": "YYYY-MM-DD" },
  "education": [ { "institution": "", "degree": "", "course": "", "year": "graduation year", "cgpa": "out of 10" } ],
  "skills": [""]
}
List the most recent education first."#
            }
            DocumentType::Marksheet => {
                r#"Parse this mark sheet or transcript. Reply with:
{
  "studentInfo": { "name": "", "institution": "", "degree": "", "year": "graduation or academic year" },
  "academicInfo": { "cgpa": "overall CGPA out of 10", "percentage": "overall percentage" }
}
Use the most recent overall figures."#
            }
            DocumentType::IdProof => {
                r#"Parse this identity document. Reply with:
{
  "personalInfo": { "name": "", "dateOfBirth": "YYYY-MM-DD", "gender": "Male/Female/Other", "address": "" },
  "documentInfo": { "documentType": "Aadhaar/PAN/Passport/...", "documentNumber": "" }
}"#
            }
            DocumentType::Income => {
                r#"Parse this income certificate. Reply with:
{
  "financialInfo": { "annualIncome": "annual family income as a number", "incomeSource": "" },
  "documentInfo": { "certificateDate": "YYYY-MM-DD", "issuingAuthority": "" }
}
Drop currency symbols from the income."#
            }
            DocumentType::Category => {
                r#"Parse this caste/category certificate. Reply with:
{
  "categoryInfo": { "category": "General/OBC/SC/ST/EWS/Other", "certificateNumber": "", "issuingAuthority": "" }
}"#
            }
            DocumentType::Disability => {
                r#"Parse this disability certificate. Reply with:
{
  "disabilityInfo": { "disabilityType": "", "disabilityPercentage": "", "certificateNumber": "", "issuingAuthority": "" }
}"#
            }
        }
    }
}

pub fn truncate_for_prompt(text: &str) -> String {
    match text.char_indices().nth(PROMPT_TEXT_LIMIT) {
        Some((cut, _)) => format!("{}\n[...truncated]", &text[..cut]),
        None => text.to_string(),
    }
}

pub fn document_request(kind: DocumentType, text: &str) -> CompletionRequest {
    CompletionRequest::new(format!(
        "{}\n\n{RULES}\nDOCUMENT TEXT:\n{}",
        kind.instructions(),
        truncate_for_prompt(text)
    ))
    .with_system(SYSTEM)
    .with_max_tokens(4096)
}

/// Profile fields suggested by parsed documents, ready for the student to review.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileDraft {
    pub name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub university: Option<String>,
    pub education_level: Option<EducationLevel>,
    pub course: Option<String>,
    pub graduation_year: Option<i32>,
    pub cgpa: Option<f32>,
    pub income: Option<f64>,
    pub category: Option<Category>,
}

impl ProfileDraft {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Fill gaps in `self` from `other`; present values are kept.
    fn fill_from(&mut self, other: ProfileDraft) {
        self.name = self.name.take().or(other.name);
        self.date_of_birth = self.date_of_birth.or(other.date_of_birth);
        self.gender = self.gender.or(other.gender);
        self.university = self.university.take().or(other.university);
        self.education_level = self.education_level.or(other.education_level);
        self.course = self.course.take().or(other.course);
        self.graduation_year = self.graduation_year.or(other.graduation_year);
        self.cgpa = self.cgpa.or(other.cgpa);
        self.income = self.income.or(other.income);
        self.category = self.category.or(other.category);
    }
}

/// Merge drafts so each field comes from the highest-priority document that has it.
pub fn merge_drafts(mut drafts: Vec<(DocumentType, ProfileDraft)>) -> ProfileDraft {
    drafts.sort_by_key(|(kind, _)| kind.priority());
    drafts
        .into_iter()
        .fold(ProfileDraft::default(), |mut merged, (_, draft)| {
            merged.fill_from(draft);
            merged
        })
}

fn field<'a>(object: &'a Map<String, Value>, path: &[&str]) -> Option<&'a Value> {
    let (last, parents) = path.split_last()?;
    let mut current = object;
    for key in parents {
        current = current.get(*key)?.as_object()?;
    }
    current.get(*last).filter(|value| !value.is_null())
}

fn text(value: Option<&Value>) -> Option<String> {
    let rendered = match value? {
        Value::String(value) => value.trim().to_string(),
        Value::Number(number) => number.to_string(),
        _ => return None,
    };
    (!rendered.is_empty() && !rendered.eq_ignore_ascii_case("null")).then_some(rendered)
}

fn number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(number) => number.as_f64(),
        Value::String(raw) => parse_number_text(raw),
        _ => None,
    }
}

fn year(value: Option<&Value>) -> Option<i32> {
    let raw = text(value)?;
    // "2021-2025" or "2025": the last four-digit run is the graduation year.
    raw.split(|ch: char| !ch.is_ascii_digit())
        .filter(|run| run.len() == 4)
        .filter_map(|run| run.parse::<i32>().ok())
        .last()
}

fn gender(value: Option<&Value>) -> Option<Gender> {
    match text(value)?.to_ascii_lowercase().as_str() {
        "male" | "m" => Some(Gender::Male),
        "female" | "f" => Some(Gender::Female),
        "other" | "transgender" => Some(Gender::Other),
        _ => None,
    }
}

/// Map a model reply for any document type onto profile fields.
pub fn draft_from_reply(reply: &Map<String, Value>) -> ProfileDraft {
    let mut draft = ProfileDraft {
        name: text(field(reply, &["personalInfo", "name"])),
        date_of_birth: text(field(reply, &["personalInfo", "dateOfBirth"]))
            .and_then(|raw| iso_date(&raw)),
        gender: gender(field(reply, &["personalInfo", "gender"])),
        ..ProfileDraft::default()
    };

    if let Some(education) = reply
        .get("education")
        .and_then(Value::as_array)
        .and_then(|entries| entries.first())
        .and_then(Value::as_object)
    {
        draft.university = text(education.get("institution"));
        draft.education_level = text(education.get("degree"))
            .map(|degree| EducationLevel::from_degree(&degree));
        draft.course = text(education.get("course"));
        draft.graduation_year = year(education.get("year"));
        draft.cgpa = number(education.get("cgpa")).and_then(cgpa_scale);
    }

    if reply.contains_key("studentInfo") || reply.contains_key("academicInfo") {
        draft.name = draft
            .name
            .or_else(|| text(field(reply, &["studentInfo", "name"])));
        if let Some(institution) = text(field(reply, &["studentInfo", "institution"])) {
            draft.university = Some(institution);
        }
        if let Some(degree) = text(field(reply, &["studentInfo", "degree"])) {
            draft.education_level = Some(EducationLevel::from_degree(&degree));
        }
        if let Some(graduation) = year(field(reply, &["studentInfo", "year"])) {
            draft.graduation_year = Some(graduation);
        }
        let cgpa = number(field(reply, &["academicInfo", "cgpa"]))
            .or_else(|| number(field(reply, &["academicInfo", "percentage"])))
            .and_then(cgpa_scale);
        if cgpa.is_some() {
            draft.cgpa = cgpa;
        }
    }

    draft.income = number(field(reply, &["financialInfo", "annualIncome"]))
        .filter(|income| *income >= 0.0);
    draft.category = text(field(reply, &["categoryInfo", "category"]))
        .and_then(|raw| Category::parse(&raw));

    draft
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().expect("object")
    }

    #[test]
    fn resume_reply_maps_education_and_personal_info() {
        let draft = draft_from_reply(&object(json!({
            "personalInfo": { "name": "Asha Rao", "dateOfBirth": "2003-04-12" },
            "education": [
                { "institution": "NIT Trichy", "degree": "B.Tech", "course": "Computer Science",
                  "year": "2021-2025", "cgpa": "8.6" },
                { "institution": "Kendriya Vidyalaya", "degree": "12th" }
            ]
        })));
        assert_eq!(draft.name.as_deref(), Some("Asha Rao"));
        assert_eq!(draft.date_of_birth, NaiveDate::from_ymd_opt(2003, 4, 12));
        assert_eq!(draft.university.as_deref(), Some("NIT Trichy"));
        assert_eq!(draft.education_level, Some(EducationLevel::Undergraduate));
        assert_eq!(draft.graduation_year, Some(2025));
        assert_eq!(draft.cgpa, Some(8.6));
    }

    #[test]
    fn marksheet_percentage_is_rescaled() {
        let draft = draft_from_reply(&object(json!({
            "studentInfo": { "institution": "Anna University", "degree": "M.Sc" },
            "academicInfo": { "cgpa": null, "percentage": "82%" }
        })));
        assert_eq!(draft.cgpa, Some(8.2));
        assert_eq!(draft.education_level, Some(EducationLevel::Postgraduate));
    }

    #[test]
    fn certificates_map_income_and_category() {
        let income = draft_from_reply(&object(json!({
            "financialInfo": { "annualIncome": "Rs. 1,80,000" }
        })));
        assert_eq!(income.income, Some(180_000.0));

        let category = draft_from_reply(&object(json!({
            "categoryInfo": { "category": "OBC" }
        })));
        assert_eq!(category.category, Some(Category::Obc));
        assert!(draft_from_reply(&object(json!({ "disabilityInfo": {} }))).is_empty());
    }

    #[test]
    fn merge_prefers_identity_proof_then_resume() {
        let resume = ProfileDraft {
            name: Some("A. Rao".to_string()),
            university: Some("NIT Trichy".to_string()),
            ..ProfileDraft::default()
        };
        let id_proof = ProfileDraft {
            name: Some("Asha Rao".to_string()),
            gender: Some(Gender::Female),
            ..ProfileDraft::default()
        };
        let income = ProfileDraft {
            income: Some(180_000.0),
            ..ProfileDraft::default()
        };
        let merged = merge_drafts(vec![
            (DocumentType::Income, income),
            (DocumentType::Resume, resume),
            (DocumentType::IdProof, id_proof),
        ]);
        assert_eq!(merged.name.as_deref(), Some("Asha Rao"));
        assert_eq!(merged.university.as_deref(), Some("NIT Trichy"));
        assert_eq!(merged.income, Some(180_000.0));
        assert_eq!(merged.gender, Some(Gender::Female));
    }

    #[test]
    fn long_documents_are_truncated() {
        let text = "x".repeat(PROMPT_TEXT_LIMIT + 50);
        let truncated = truncate_for_prompt(&text);
        assert!(truncated.ends_with("[...truncated]"));
        assert_eq!(truncated.chars().filter(|ch| *ch == 'x').count(), PROMPT_TEXT_LIMIT);
        assert_eq!(truncate_for_prompt("short"), "short");
    }
}
