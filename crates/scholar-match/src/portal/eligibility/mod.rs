mod config;
mod policy;
mod rules;

pub use config::MatchPolicy;
pub(crate) use policy::newest_first;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{Scholarship, ScholarshipId, StudentProfile};

/// Restriction a listing can place on applicants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    Cgpa,
    Income,
    Category,
    Course,
    Year,
    EducationLevel,
    Deadline,
}

/// Result of a single eligibility predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckOutcome {
    Satisfied,
    Unsatisfied,
    /// The listing places no restriction on this criterion.
    Unrestricted,
    /// The profile cannot answer the restriction.
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityCheck {
    pub criterion: Criterion,
    pub outcome: CheckOutcome,
    pub note: String,
}

/// Per-listing audit trail of every predicate plus the combined verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityReport {
    pub scholarship_id: ScholarshipId,
    pub eligible: bool,
    pub checks: Vec<EligibilityCheck>,
}

impl EligibilityReport {
    pub fn failing(&self) -> impl Iterator<Item = &EligibilityCheck> {
        self.checks
            .iter()
            .filter(|check| check.outcome == CheckOutcome::Unsatisfied)
    }

    pub fn unknown(&self) -> impl Iterator<Item = &EligibilityCheck> {
        self.checks
            .iter()
            .filter(|check| check.outcome == CheckOutcome::Unknown)
    }
}

/// A listing in match order, with its report when a profile was available.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedScholarship {
    pub scholarship: Scholarship,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<EligibilityReport>,
}

/// Stateless evaluator that applies the match policy to a profile.
#[derive(Debug, Clone, Default)]
pub struct EligibilityEngine {
    policy: MatchPolicy,
}

impl EligibilityEngine {
    pub fn new(policy: MatchPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &MatchPolicy {
        &self.policy
    }

    pub fn assess(
        &self,
        profile: &StudentProfile,
        scholarship: &Scholarship,
        today: NaiveDate,
    ) -> EligibilityReport {
        let checks = rules::run_checks(profile, scholarship, today);
        let eligible = policy::decide(&checks, &self.policy);
        EligibilityReport {
            scholarship_id: scholarship.id.clone(),
            eligible,
            checks,
        }
    }

    /// Eligible listings ranked by award, or the newest listings when no profile exists.
    pub fn rank(
        &self,
        profile: Option<&StudentProfile>,
        scholarships: Vec<Scholarship>,
        today: NaiveDate,
    ) -> Vec<RankedScholarship> {
        let Some(profile) = profile else {
            let mut newest = scholarships;
            newest.sort_by(policy::newest_first);
            newest.truncate(self.policy.anonymous_limit);
            return newest
                .into_iter()
                .map(|scholarship| RankedScholarship {
                    scholarship,
                    report: None,
                })
                .collect();
        };

        let mut ranked: Vec<RankedScholarship> = scholarships
            .into_iter()
            .filter_map(|scholarship| {
                let report = self.assess(profile, &scholarship, today);
                report.eligible.then_some(RankedScholarship {
                    scholarship,
                    report: Some(report),
                })
            })
            .collect();
        ranked.sort_by(|left, right| policy::by_award(&left.scholarship, &right.scholarship));
        ranked
    }

    pub fn count_eligible(
        &self,
        profile: &StudentProfile,
        scholarships: &[Scholarship],
        today: NaiveDate,
    ) -> usize {
        scholarships
            .iter()
            .filter(|scholarship| self.assess(profile, scholarship, today).eligible)
            .count()
    }
}
