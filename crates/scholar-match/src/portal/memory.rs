//! In-process store backing every repository trait.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{Application, DedupeKey, Scholarship, ScholarshipId, StudentProfile, UserId};
use super::repository::{
    AdminWhitelist, ApplicationRepository, ProfileRepository, RepositoryError,
    ScholarshipRepository,
};

#[derive(Default)]
struct Tables {
    scholarships: BTreeMap<ScholarshipId, Scholarship>,
    keys: HashMap<DedupeKey, ScholarshipId>,
    profiles: HashMap<UserId, StudentProfile>,
    applications: BTreeMap<(UserId, ScholarshipId), Application>,
    admins: BTreeSet<String>,
}

/// Cloneable handle; clones share the same tables.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))
    }
}

fn email_key(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

impl ScholarshipRepository for InMemoryStore {
    fn insert(&self, scholarship: Scholarship) -> Result<Scholarship, RepositoryError> {
        let mut tables = self.lock()?;
        if tables.scholarships.contains_key(&scholarship.id)
            || tables.keys.contains_key(&scholarship.dedupe_key)
        {
            return Err(RepositoryError::Conflict);
        }
        tables
            .keys
            .insert(scholarship.dedupe_key.clone(), scholarship.id.clone());
        tables
            .scholarships
            .insert(scholarship.id.clone(), scholarship.clone());
        Ok(scholarship)
    }

    fn update(&self, scholarship: Scholarship) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        let previous_key = match tables.scholarships.get(&scholarship.id) {
            Some(existing) => existing.dedupe_key.clone(),
            None => return Err(RepositoryError::NotFound),
        };
        if previous_key != scholarship.dedupe_key {
            if tables.keys.contains_key(&scholarship.dedupe_key) {
                return Err(RepositoryError::Conflict);
            }
            tables.keys.remove(&previous_key);
            tables
                .keys
                .insert(scholarship.dedupe_key.clone(), scholarship.id.clone());
        }
        tables
            .scholarships
            .insert(scholarship.id.clone(), scholarship);
        Ok(())
    }

    fn delete(&self, id: &ScholarshipId) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        let removed = tables
            .scholarships
            .remove(id)
            .ok_or(RepositoryError::NotFound)?;
        tables.keys.remove(&removed.dedupe_key);
        tables
            .applications
            .retain(|(_, scholarship_id), _| scholarship_id != id);
        Ok(())
    }

    fn fetch(&self, id: &ScholarshipId) -> Result<Option<Scholarship>, RepositoryError> {
        Ok(self.lock()?.scholarships.get(id).cloned())
    }

    fn find_by_key(&self, key: &DedupeKey) -> Result<Option<Scholarship>, RepositoryError> {
        let tables = self.lock()?;
        Ok(tables
            .keys
            .get(key)
            .and_then(|id| tables.scholarships.get(id))
            .cloned())
    }

    fn all(&self) -> Result<Vec<Scholarship>, RepositoryError> {
        Ok(self.lock()?.scholarships.values().cloned().collect())
    }
}

impl ProfileRepository for InMemoryStore {
    fn upsert(&self, profile: StudentProfile) -> Result<StudentProfile, RepositoryError> {
        let mut tables = self.lock()?;
        tables
            .profiles
            .insert(profile.user_id.clone(), profile.clone());
        Ok(profile)
    }

    fn fetch(&self, user: &UserId) -> Result<Option<StudentProfile>, RepositoryError> {
        Ok(self.lock()?.profiles.get(user).cloned())
    }
}

impl ApplicationRepository for InMemoryStore {
    fn insert(&self, application: Application) -> Result<Application, RepositoryError> {
        let mut tables = self.lock()?;
        let key = (
            application.user_id.clone(),
            application.scholarship_id.clone(),
        );
        if tables.applications.contains_key(&key) {
            return Err(RepositoryError::Conflict);
        }
        tables.applications.insert(key, application.clone());
        Ok(application)
    }

    fn update(&self, application: Application) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        let key = (
            application.user_id.clone(),
            application.scholarship_id.clone(),
        );
        match tables.applications.get_mut(&key) {
            Some(slot) => {
                *slot = application;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn delete(&self, user: &UserId, scholarship: &ScholarshipId) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        tables
            .applications
            .remove(&(user.clone(), scholarship.clone()))
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    fn fetch(
        &self,
        user: &UserId,
        scholarship: &ScholarshipId,
    ) -> Result<Option<Application>, RepositoryError> {
        Ok(self
            .lock()?
            .applications
            .get(&(user.clone(), scholarship.clone()))
            .cloned())
    }

    fn for_user(&self, user: &UserId) -> Result<Vec<Application>, RepositoryError> {
        Ok(self
            .lock()?
            .applications
            .iter()
            .filter(|((owner, _), _)| owner == user)
            .map(|(_, application)| application.clone())
            .collect())
    }
}

impl AdminWhitelist for InMemoryStore {
    fn grant(&self, email: &str) -> Result<(), RepositoryError> {
        self.lock()?.admins.insert(email_key(email));
        Ok(())
    }

    fn revoke(&self, email: &str) -> Result<bool, RepositoryError> {
        Ok(self.lock()?.admins.remove(&email_key(email)))
    }

    fn contains(&self, email: &str) -> Result<bool, RepositoryError> {
        Ok(self.lock()?.admins.contains(&email_key(email)))
    }

    fn list(&self) -> Result<Vec<String>, RepositoryError> {
        Ok(self.lock()?.admins.iter().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portal::domain::{ApplicationStatus, NewScholarship};
    use chrono::Utc;

    fn listing(id: &str, title: &str) -> Scholarship {
        NewScholarship {
            title: title.to_string(),
            provider: "State Board".to_string(),
            ..NewScholarship::default()
        }
        .into_scholarship(ScholarshipId(id.to_string()), Utc::now())
    }

    #[test]
    fn insert_rejects_duplicate_dedupe_key() {
        let store = InMemoryStore::new();
        ScholarshipRepository::insert(&store, listing("sch-1", "Merit Award")).expect("first");
        let err = ScholarshipRepository::insert(&store, listing("sch-2", "merit-award"))
            .expect_err("duplicate key");
        assert!(matches!(err, RepositoryError::Conflict));
    }

    #[test]
    fn delete_cascades_to_applications_and_frees_key() {
        let store = InMemoryStore::new();
        let scholarship =
            ScholarshipRepository::insert(&store, listing("sch-1", "Merit Award")).expect("insert");
        let now = Utc::now();
        ApplicationRepository::insert(
            &store,
            Application {
                user_id: UserId("user-1".to_string()),
                scholarship_id: scholarship.id.clone(),
                status: ApplicationStatus::Saved,
                applied_at: None,
                created_at: now,
                updated_at: now,
            },
        )
        .expect("save");

        ScholarshipRepository::delete(&store, &scholarship.id).expect("delete");

        assert!(store
            .for_user(&UserId("user-1".to_string()))
            .expect("list")
            .is_empty());
        assert!(store
            .find_by_key(&scholarship.dedupe_key)
            .expect("lookup")
            .is_none());
    }

    #[test]
    fn whitelist_is_case_insensitive() {
        let store = InMemoryStore::new();
        store.grant(" Partner@Example.org ").expect("grant");
        assert!(store.contains("partner@example.org").expect("lookup"));
        assert!(store.revoke("PARTNER@example.org").expect("revoke"));
        assert!(!store.contains("partner@example.org").expect("lookup"));
    }
}
