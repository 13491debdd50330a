use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

use super::catalog::CatalogService;
use super::domain::{ApplicationStatus, ScholarshipId, UserId};
use super::eligibility::EligibilityEngine;
use super::error::PortalError;
use super::profile::{completion, ProfileCompletion, ProfileService};
use super::tracker::TrackerService;

const URGENT_WINDOW_DAYS: i64 = 7;
const NEW_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UrgentDeadline {
    pub scholarship_id: ScholarshipId,
    pub title: String,
    pub deadline: NaiveDate,
    pub days_left: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub saved: usize,
    pub applied: usize,
    pub total_scholarships: usize,
    pub matching: usize,
    pub new_this_week: usize,
    pub urgent: Vec<UrgentDeadline>,
    pub profile: ProfileCompletion,
}

pub struct DashboardService {
    catalog: Arc<CatalogService>,
    profiles: Arc<ProfileService>,
    tracker: Arc<TrackerService>,
    engine: Arc<EligibilityEngine>,
}

impl DashboardService {
    pub fn new(
        catalog: Arc<CatalogService>,
        profiles: Arc<ProfileService>,
        tracker: Arc<TrackerService>,
        engine: Arc<EligibilityEngine>,
    ) -> Self {
        Self {
            catalog,
            profiles,
            tracker,
            engine,
        }
    }

    pub fn summary(&self, user: &UserId, now: DateTime<Utc>) -> Result<DashboardSummary, PortalError> {
        let today = now.date_naive();
        let scholarships = self.catalog.all()?;
        let profile = self.profiles.find(user)?;
        let tracked = self.tracker.list(user)?;

        let saved: Vec<_> = tracked
            .iter()
            .filter(|entry| entry.application.status == ApplicationStatus::Saved)
            .collect();
        let applied = tracked
            .iter()
            .filter(|entry| entry.application.status == ApplicationStatus::Applied)
            .count();

        let mut urgent: Vec<UrgentDeadline> = saved
            .iter()
            .filter_map(|entry| {
                let deadline = entry.scholarship.deadline?;
                let days_left = entry.scholarship.days_until_deadline(today)?;
                (0..=URGENT_WINDOW_DAYS)
                    .contains(&days_left)
                    .then(|| UrgentDeadline {
                        scholarship_id: entry.scholarship.id.clone(),
                        title: entry.scholarship.title.clone(),
                        deadline,
                        days_left,
                    })
            })
            .collect();
        urgent.sort_by(|left, right| {
            left.days_left
                .cmp(&right.days_left)
                .then_with(|| left.title.cmp(&right.title))
        });

        let week_ago = now - Duration::days(NEW_WINDOW_DAYS);
        let new_this_week = scholarships
            .iter()
            .filter(|scholarship| scholarship.created_at >= week_ago)
            .count();

        let matching = profile
            .as_ref()
            .map(|profile| self.engine.count_eligible(profile, &scholarships, today))
            .unwrap_or(0);

        Ok(DashboardSummary {
            saved: saved.len(),
            applied,
            total_scholarships: scholarships.len(),
            matching,
            new_this_week,
            urgent,
            profile: completion(profile.as_ref()),
        })
    }
}
