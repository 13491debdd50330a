use super::domain::{Application, DedupeKey, Scholarship, ScholarshipId, StudentProfile, UserId};

/// Storage abstraction for catalog entries.
pub trait ScholarshipRepository: Send + Sync {
    /// Inserts a listing. Fails with `Conflict` when another listing shares its dedupe key.
    fn insert(&self, scholarship: Scholarship) -> Result<Scholarship, RepositoryError>;
    fn update(&self, scholarship: Scholarship) -> Result<(), RepositoryError>;
    fn delete(&self, id: &ScholarshipId) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &ScholarshipId) -> Result<Option<Scholarship>, RepositoryError>;
    fn find_by_key(&self, key: &DedupeKey) -> Result<Option<Scholarship>, RepositoryError>;
    fn all(&self) -> Result<Vec<Scholarship>, RepositoryError>;
}

/// Storage abstraction for student profiles.
pub trait ProfileRepository: Send + Sync {
    fn upsert(&self, profile: StudentProfile) -> Result<StudentProfile, RepositoryError>;
    fn fetch(&self, user: &UserId) -> Result<Option<StudentProfile>, RepositoryError>;
}

/// Storage abstraction for saved/applied links.
pub trait ApplicationRepository: Send + Sync {
    /// Fails with `Conflict` when the (user, scholarship) pair already exists.
    fn insert(&self, application: Application) -> Result<Application, RepositoryError>;
    fn update(&self, application: Application) -> Result<(), RepositoryError>;
    fn delete(&self, user: &UserId, scholarship: &ScholarshipId) -> Result<(), RepositoryError>;
    fn fetch(
        &self,
        user: &UserId,
        scholarship: &ScholarshipId,
    ) -> Result<Option<Application>, RepositoryError>;
    fn for_user(&self, user: &UserId) -> Result<Vec<Application>, RepositoryError>;
}

/// Partner admins granted access at runtime.
pub trait AdminWhitelist: Send + Sync {
    fn grant(&self, email: &str) -> Result<(), RepositoryError>;
    fn revoke(&self, email: &str) -> Result<bool, RepositoryError>;
    fn contains(&self, email: &str) -> Result<bool, RepositoryError>;
    fn list(&self) -> Result<Vec<String>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
