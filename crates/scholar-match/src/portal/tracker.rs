use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use super::domain::{Application, ApplicationStatus, Scholarship, ScholarshipId, UserId};
use super::error::PortalError;
use super::repository::{ApplicationRepository, ScholarshipRepository};

/// Result of toggling the bookmark on a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveToggle {
    Saved,
    Unsaved,
}

/// An application joined with its listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackedScholarship {
    pub application: Application,
    pub scholarship: Scholarship,
}

/// Saved and applied scholarships per student.
pub struct TrackerService {
    scholarships: Arc<dyn ScholarshipRepository>,
    applications: Arc<dyn ApplicationRepository>,
}

impl TrackerService {
    pub fn new(
        scholarships: Arc<dyn ScholarshipRepository>,
        applications: Arc<dyn ApplicationRepository>,
    ) -> Self {
        Self {
            scholarships,
            applications,
        }
    }

    fn ensure_listed(&self, id: &ScholarshipId) -> Result<(), PortalError> {
        match self.scholarships.fetch(id)? {
            Some(_) => Ok(()),
            None => Err(PortalError::NotFound(format!("scholarship {}", id.0))),
        }
    }

    /// Save when absent, remove when merely saved. Anything further along is kept.
    pub fn toggle_save(
        &self,
        user: &UserId,
        scholarship: &ScholarshipId,
        now: DateTime<Utc>,
    ) -> Result<SaveToggle, PortalError> {
        self.ensure_listed(scholarship)?;
        match self.applications.fetch(user, scholarship)? {
            None => {
                self.applications.insert(Application {
                    user_id: user.clone(),
                    scholarship_id: scholarship.clone(),
                    status: ApplicationStatus::Saved,
                    applied_at: None,
                    created_at: now,
                    updated_at: now,
                })?;
                debug!(user = %user.0, scholarship = %scholarship.0, "saved scholarship");
                Ok(SaveToggle::Saved)
            }
            Some(existing) if existing.status == ApplicationStatus::Saved => {
                self.applications.delete(user, scholarship)?;
                debug!(user = %user.0, scholarship = %scholarship.0, "unsaved scholarship");
                Ok(SaveToggle::Unsaved)
            }
            Some(_) => Err(PortalError::Conflict(
                "cannot unsave an active application".to_string(),
            )),
        }
    }

    /// Record progress on a listing, creating the link if needed.
    pub fn set_status(
        &self,
        user: &UserId,
        scholarship: &ScholarshipId,
        status: ApplicationStatus,
        now: DateTime<Utc>,
    ) -> Result<Application, PortalError> {
        self.ensure_listed(scholarship)?;
        let applied_at = |previous: Option<DateTime<Utc>>| match status {
            ApplicationStatus::Applied => previous.or(Some(now)),
            _ => previous,
        };

        match self.applications.fetch(user, scholarship)? {
            Some(mut existing) => {
                existing.applied_at = applied_at(existing.applied_at);
                existing.status = status;
                existing.updated_at = now;
                self.applications.update(existing.clone())?;
                Ok(existing)
            }
            None => Ok(self.applications.insert(Application {
                user_id: user.clone(),
                scholarship_id: scholarship.clone(),
                status,
                applied_at: applied_at(None),
                created_at: now,
                updated_at: now,
            })?),
        }
    }

    /// The student's tracked listings, most recently touched first. Links whose
    /// listing has disappeared are omitted.
    pub fn list(&self, user: &UserId) -> Result<Vec<TrackedScholarship>, PortalError> {
        let mut tracked = Vec::new();
        for application in self.applications.for_user(user)? {
            if let Some(scholarship) = self.scholarships.fetch(&application.scholarship_id)? {
                tracked.push(TrackedScholarship {
                    application,
                    scholarship,
                });
            }
        }
        tracked.sort_by(|left, right| {
            right
                .application
                .updated_at
                .cmp(&left.application.updated_at)
        });
        Ok(tracked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portal::domain::NewScholarship;
    use crate::portal::memory::InMemoryStore;

    fn setup() -> (TrackerService, ScholarshipId) {
        let store = Arc::new(InMemoryStore::new());
        let listing = NewScholarship {
            title: "Merit Award".to_string(),
            provider: "State Board".to_string(),
            ..NewScholarship::default()
        }
        .into_scholarship(ScholarshipId("sch-1".to_string()), Utc::now());
        ScholarshipRepository::insert(store.as_ref(), listing).expect("insert");
        (
            TrackerService::new(store.clone(), store),
            ScholarshipId("sch-1".to_string()),
        )
    }

    #[test]
    fn toggle_saves_then_unsaves() {
        let (tracker, id) = setup();
        let user = UserId("user-1".to_string());
        let now = Utc::now();
        assert_eq!(tracker.toggle_save(&user, &id, now).expect("save"), SaveToggle::Saved);
        assert_eq!(tracker.list(&user).expect("list").len(), 1);
        assert_eq!(
            tracker.toggle_save(&user, &id, now).expect("unsave"),
            SaveToggle::Unsaved
        );
        assert!(tracker.list(&user).expect("list").is_empty());
    }

    #[test]
    fn active_application_cannot_be_unsaved() {
        let (tracker, id) = setup();
        let user = UserId("user-1".to_string());
        let now = Utc::now();
        tracker.toggle_save(&user, &id, now).expect("save");
        let applied = tracker
            .set_status(&user, &id, ApplicationStatus::Applied, now)
            .expect("applied");
        assert_eq!(applied.applied_at, Some(now));

        let err = tracker.toggle_save(&user, &id, now).expect_err("refused");
        assert!(matches!(err, PortalError::Conflict(ref message) if message.contains("cannot unsave")));

        let won = tracker
            .set_status(&user, &id, ApplicationStatus::Won, now + chrono::Duration::days(30))
            .expect("won");
        assert_eq!(won.applied_at, Some(now));
    }

    #[test]
    fn unknown_listing_is_not_found() {
        let (tracker, _) = setup();
        let err = tracker
            .toggle_save(
                &UserId("user-1".to_string()),
                &ScholarshipId("sch-404".to_string()),
                Utc::now(),
            )
            .expect_err("missing");
        assert!(matches!(err, PortalError::NotFound(_)));
    }
}
