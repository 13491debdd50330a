//! Student-facing scholarship portal: catalog, profiles, eligibility matching,
//! application tracking, dashboard and admin access.
//!
//! Services run against the repository traits in [`repository`]; the in-memory
//! store backs the binary and the tests. Identity is asserted by the gateway
//! through the `x-user-id` and `x-user-email` headers.

pub mod access;
pub mod catalog;
pub mod dashboard;
pub mod domain;
pub mod eligibility;
pub mod error;
pub mod memory;
pub mod profile;
pub mod repository;
pub mod router;
pub mod service;
pub mod tracker;

#[cfg(test)]
mod tests;

pub use access::AdminAccess;
pub use catalog::{BrowseFilter, CatalogPage, CatalogService};
pub use dashboard::{DashboardService, DashboardSummary, UrgentDeadline};
pub use domain::{
    AmountType, Application, ApplicationStatus, Category, DedupeKey, DocumentKind,
    EducationLevel, Gender, NewScholarship, ProfileDocument, Scholarship, ScholarshipId,
    StudentProfile, UserId,
};
pub use eligibility::{
    CheckOutcome, Criterion, EligibilityCheck, EligibilityEngine, EligibilityReport, MatchPolicy,
    RankedScholarship,
};
pub use error::PortalError;
pub use memory::InMemoryStore;
pub use profile::{completion, ProfileCompletion, ProfileService, ProfileUpdate};
pub use repository::{
    AdminWhitelist, ApplicationRepository, ProfileRepository, RepositoryError,
    ScholarshipRepository,
};
pub use router::portal_router;
pub use service::{Portal, PortalSettings, Repositories};
pub use tracker::{SaveToggle, TrackedScholarship, TrackerService};
