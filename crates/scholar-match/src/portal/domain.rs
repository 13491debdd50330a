use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for catalog entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScholarshipId(pub String);

/// Identity assigned by the upstream identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

/// Whether the award is paid out or applied against fees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AmountType {
    Cash,
    Waiver,
}

impl AmountType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "CASH" => Some(Self::Cash),
            "WAIVER" => Some(Self::Waiver),
            _ => None,
        }
    }
}

/// Normalized (title, provider) pair used to detect duplicate listings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DedupeKey {
    pub title: String,
    pub provider: String,
}

impl DedupeKey {
    pub fn new(title: &str, provider: &str) -> Self {
        Self {
            title: normalize_key_text(title),
            provider: normalize_key_text(provider),
        }
    }
}

/// Lowercase, fold separator punctuation to spaces and collapse whitespace.
pub fn normalize_key_text(value: &str) -> String {
    let folded: String = value
        .chars()
        .map(|ch| match ch {
            '_' | '-' | '\u{2013}' | '\u{2014}' | '/' | '\\' | '|' | ',' | '.' | '(' | ')'
            | '[' | ']' | '{' | '}' => ' ',
            other => other,
        })
        .collect::<String>()
        .to_lowercase();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A catalog entry as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scholarship {
    pub id: ScholarshipId,
    pub title: String,
    pub provider: String,
    pub amount: Option<f64>,
    pub amount_type: Option<AmountType>,
    pub deadline: Option<NaiveDate>,
    pub location: String,
    pub education_level: String,
    pub min_cgpa: Option<f32>,
    pub max_income: Option<f64>,
    pub course_restriction: Option<String>,
    pub category_restriction: Option<String>,
    pub year_restriction: Option<String>,
    pub apply_link: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub source_document: Option<String>,
    pub dedupe_key: DedupeKey,
    pub created_at: DateTime<Utc>,
}

impl Scholarship {
    pub fn is_open_on(&self, today: NaiveDate) -> bool {
        self.deadline.map(|deadline| deadline >= today).unwrap_or(true)
    }

    /// Whole days until the deadline; negative once it has passed.
    pub fn days_until_deadline(&self, today: NaiveDate) -> Option<i64> {
        self.deadline.map(|deadline| (deadline - today).num_days())
    }
}

/// Fields accepted when a listing is created by hand or by the ingestion pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewScholarship {
    pub title: String,
    pub provider: String,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub amount_type: Option<AmountType>,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub education_level: Option<String>,
    #[serde(default)]
    pub min_cgpa: Option<f32>,
    #[serde(default)]
    pub max_income: Option<f64>,
    #[serde(default)]
    pub course_restriction: Option<String>,
    #[serde(default)]
    pub category_restriction: Option<String>,
    #[serde(default)]
    pub year_restriction: Option<String>,
    #[serde(default)]
    pub apply_link: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub source_document: Option<String>,
}

impl NewScholarship {
    pub fn dedupe_key(&self) -> DedupeKey {
        DedupeKey::new(&self.title, &self.provider)
    }

    pub fn into_scholarship(self, id: ScholarshipId, created_at: DateTime<Utc>) -> Scholarship {
        let dedupe_key = self.dedupe_key();
        Scholarship {
            id,
            title: self.title.trim().to_string(),
            provider: self.provider.trim().to_string(),
            amount: self.amount,
            amount_type: self.amount_type,
            deadline: self.deadline,
            location: self
                .location
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| "Pan-India".to_string()),
            education_level: self
                .education_level
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| "Any".to_string()),
            min_cgpa: self.min_cgpa,
            max_income: self.max_income,
            course_restriction: self.course_restriction,
            category_restriction: self.category_restriction,
            year_restriction: self.year_restriction,
            apply_link: self.apply_link,
            description: self.description,
            tags: self.tags,
            source_document: self.source_document,
            dedupe_key,
            created_at,
        }
    }
}

/// Reservation categories recognised by Indian scholarship schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    General,
    #[serde(rename = "OBC")]
    Obc,
    #[serde(rename = "SC")]
    Sc,
    #[serde(rename = "ST")]
    St,
    #[serde(rename = "EWS")]
    Ews,
    Other,
}

impl Category {
    pub const fn label(self) -> &'static str {
        match self {
            Category::General => "General",
            Category::Obc => "OBC",
            Category::Sc => "SC",
            Category::St => "ST",
            Category::Ews => "EWS",
            Category::Other => "Other",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "general" | "gen" | "open" | "unreserved" => Some(Self::General),
            "obc" => Some(Self::Obc),
            "sc" => Some(Self::Sc),
            "st" => Some(Self::St),
            "ews" => Some(Self::Ews),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EducationLevel {
    #[serde(rename = "High School")]
    HighSchool,
    Undergraduate,
    Postgraduate,
    #[serde(rename = "PhD")]
    Phd,
}

impl EducationLevel {
    pub const fn label(self) -> &'static str {
        match self {
            EducationLevel::HighSchool => "High School",
            EducationLevel::Undergraduate => "Undergraduate",
            EducationLevel::Postgraduate => "Postgraduate",
            EducationLevel::Phd => "PhD",
        }
    }

    /// Map a free-text degree name ("B.Tech", "M.Sc", "10th") to a level.
    pub fn from_degree(degree: &str) -> Self {
        let words: Vec<String> = degree
            .to_lowercase()
            .split(|ch: char| !ch.is_alphanumeric() && ch != '.')
            .filter(|word| !word.is_empty())
            .map(|word| word.replace('.', ""))
            .collect();
        let has = |needle: &str| words.iter().any(|word| word == needle);
        let starts = |prefix: &str| words.iter().any(|word| word.starts_with(prefix));

        if starts("phd") || starts("doctor") {
            Self::Phd
        } else if degree.to_lowercase().contains("high school")
            || has("10th")
            || has("12th")
            || has("sslc")
            || has("hsc")
        {
            Self::HighSchool
        } else if starts("master")
            || has("mtech")
            || has("me")
            || has("ma")
            || has("mcom")
            || has("msc")
            || has("mba")
            || has("mca")
        {
            Self::Postgraduate
        } else {
            Self::Undergraduate
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
    #[serde(rename = "Prefer not to say")]
    Undisclosed,
}

/// Kinds of supporting documents a student can attach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentKind {
    #[serde(rename = "Income Certificate")]
    IncomeCertificate,
    Resume,
    #[serde(rename = "Mark Sheet")]
    MarkSheet,
    #[serde(rename = "ID Proof")]
    IdProof,
    #[serde(rename = "Category Certificate")]
    CategoryCertificate,
    #[serde(rename = "Disability Certificate")]
    DisabilityCertificate,
    Other,
}

/// Metadata for a file already stored on the media CDN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileDocument {
    pub kind: DocumentKind,
    pub file_name: String,
    pub file_url: String,
    #[serde(default)]
    pub public_id: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

/// Student profile used for eligibility checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub user_id: UserId,
    pub email: Option<String>,
    pub name: Option<String>,
    pub cgpa: Option<f32>,
    pub income: Option<f64>,
    pub course: Option<String>,
    pub education_level: EducationLevel,
    pub year_of_study: Option<u8>,
    pub university: Option<String>,
    pub graduation_year: Option<i32>,
    pub state: Option<String>,
    pub country: String,
    pub nationality: String,
    pub category: Option<Category>,
    pub disability: bool,
    pub first_generation: bool,
    pub gender: Option<Gender>,
    pub date_of_birth: Option<NaiveDate>,
    pub documents: Vec<ProfileDocument>,
    pub updated_at: DateTime<Utc>,
}

impl StudentProfile {
    pub fn empty(user_id: UserId, updated_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            email: None,
            name: None,
            cgpa: None,
            income: None,
            course: None,
            education_level: EducationLevel::Undergraduate,
            year_of_study: None,
            university: None,
            graduation_year: None,
            state: None,
            country: "India".to_string(),
            nationality: "Indian".to_string(),
            category: None,
            disability: false,
            first_generation: false,
            gender: None,
            date_of_birth: None,
            documents: Vec::new(),
            updated_at,
        }
    }
}

/// Progress of a student's interest in a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplicationStatus {
    Saved,
    Applied,
    Rejected,
    Won,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Saved => "saved",
            ApplicationStatus::Applied => "applied",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Won => "won",
        }
    }
}

/// A (student, scholarship) link. At most one exists per pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub user_id: UserId,
    pub scholarship_id: ScholarshipId,
    pub status: ApplicationStatus,
    pub applied_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
