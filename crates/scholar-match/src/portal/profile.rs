use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{Category, EducationLevel, Gender, ProfileDocument, StudentProfile, UserId};
use super::error::PortalError;
use super::repository::ProfileRepository;

/// Partial profile edit. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub cgpa: Option<f32>,
    #[serde(default)]
    pub income: Option<f64>,
    #[serde(default)]
    pub course: Option<String>,
    #[serde(default)]
    pub education_level: Option<EducationLevel>,
    #[serde(default)]
    pub year_of_study: Option<u8>,
    #[serde(default)]
    pub university: Option<String>,
    #[serde(default)]
    pub graduation_year: Option<i32>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub nationality: Option<String>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub disability: Option<bool>,
    #[serde(default)]
    pub first_generation: Option<bool>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    /// Replaces the stored documents only when non-empty.
    #[serde(default)]
    pub documents: Option<Vec<ProfileDocument>>,
}

impl ProfileUpdate {
    fn validate(&self) -> Result<(), PortalError> {
        if self.cgpa.is_some_and(|cgpa| !(0.0..=10.0).contains(&cgpa)) {
            return Err(PortalError::Invalid("CGPA must be between 0 and 10".to_string()));
        }
        if self.income.is_some_and(|income| income < 0.0) {
            return Err(PortalError::Invalid("income must not be negative".to_string()));
        }
        if self.year_of_study.is_some_and(|year| !(1..=6).contains(&year)) {
            return Err(PortalError::Invalid("year of study must be between 1 and 6".to_string()));
        }
        Ok(())
    }

    fn apply(self, profile: &mut StudentProfile) {
        fn text(value: Option<String>) -> Option<String> {
            value
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        }

        if let Some(name) = text(self.name) {
            profile.name = Some(name);
        }
        if let Some(cgpa) = self.cgpa {
            profile.cgpa = Some(cgpa);
        }
        if let Some(income) = self.income {
            profile.income = Some(income);
        }
        if let Some(course) = text(self.course) {
            profile.course = Some(course);
        }
        if let Some(level) = self.education_level {
            profile.education_level = level;
        }
        if let Some(year) = self.year_of_study {
            profile.year_of_study = Some(year);
        }
        if let Some(university) = text(self.university) {
            profile.university = Some(university);
        }
        if let Some(year) = self.graduation_year {
            profile.graduation_year = Some(year);
        }
        if let Some(state) = text(self.state) {
            profile.state = Some(state);
        }
        if let Some(country) = text(self.country) {
            profile.country = country;
        }
        if let Some(nationality) = text(self.nationality) {
            profile.nationality = nationality;
        }
        if let Some(category) = self.category {
            profile.category = Some(category);
        }
        if let Some(disability) = self.disability {
            profile.disability = disability;
        }
        if let Some(first_generation) = self.first_generation {
            profile.first_generation = first_generation;
        }
        if let Some(gender) = self.gender {
            profile.gender = Some(gender);
        }
        if let Some(date_of_birth) = self.date_of_birth {
            profile.date_of_birth = Some(date_of_birth);
        }
        if let Some(documents) = self.documents.filter(|documents| !documents.is_empty()) {
            profile.documents = documents;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileCompletion {
    /// 0 to 100.
    pub score: u8,
    pub missing: Vec<&'static str>,
}

/// Ten fields that make a profile useful for matching.
pub fn completion(profile: Option<&StudentProfile>) -> ProfileCompletion {
    let filled = |present: fn(&StudentProfile) -> bool| profile.is_some_and(present);
    let fields: [(&'static str, bool); 10] = [
        ("Full name", filled(|p| p.name.is_some())),
        ("CGPA", filled(|p| p.cgpa.is_some_and(|cgpa| cgpa > 0.0))),
        ("Annual income", filled(|p| p.income.is_some_and(|income| income > 0.0))),
        ("Course", filled(|p| p.course.is_some())),
        ("University", filled(|p| p.university.is_some())),
        ("Graduation year", filled(|p| p.graduation_year.is_some())),
        ("State", filled(|p| p.state.is_some())),
        ("Category", filled(|p| p.category.is_some())),
        ("Gender", filled(|p| p.gender.is_some())),
        ("Date of birth", filled(|p| p.date_of_birth.is_some())),
    ];
    let missing: Vec<&'static str> = fields
        .iter()
        .filter(|(_, present)| !present)
        .map(|(label, _)| *label)
        .collect();
    let filled_count = fields.len() - missing.len();
    let score = ((filled_count as f64 / fields.len() as f64) * 100.0).round() as u8;
    ProfileCompletion { score, missing }
}

pub struct ProfileService {
    profiles: Arc<dyn ProfileRepository>,
}

impl ProfileService {
    pub fn new(profiles: Arc<dyn ProfileRepository>) -> Self {
        Self { profiles }
    }

    pub fn find(&self, user: &UserId) -> Result<Option<StudentProfile>, PortalError> {
        Ok(self.profiles.fetch(user)?)
    }

    pub fn get(&self, user: &UserId) -> Result<StudentProfile, PortalError> {
        self.find(user)?
            .ok_or_else(|| PortalError::NotFound(format!("profile for {}", user.0)))
    }

    /// Create or merge the caller's profile.
    pub fn upsert(
        &self,
        user: &UserId,
        email: Option<&str>,
        update: ProfileUpdate,
        now: DateTime<Utc>,
    ) -> Result<StudentProfile, PortalError> {
        update.validate()?;
        let mut profile = self
            .profiles
            .fetch(user)?
            .unwrap_or_else(|| StudentProfile::empty(user.clone(), now));
        if let Some(email) = email.map(str::trim).filter(|email| !email.is_empty()) {
            profile.email = Some(email.to_string());
        }
        update.apply(&mut profile);
        profile.updated_at = now;
        Ok(self.profiles.upsert(profile)?)
    }
}
