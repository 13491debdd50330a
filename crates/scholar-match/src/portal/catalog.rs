use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{DedupeKey, NewScholarship, Scholarship, ScholarshipId};
use super::eligibility::newest_first;
use super::error::PortalError;
use super::repository::{RepositoryError, ScholarshipRepository};

const DEFAULT_PAGE_SIZE: usize = 50;
const MAX_PAGE_SIZE: usize = 200;
const NATIONWIDE: [&str; 4] = ["pan-india", "pan india", "all india", "india"];

static SCHOLARSHIP_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_scholarship_id() -> ScholarshipId {
    let id = SCHOLARSHIP_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ScholarshipId(format!("sch-{id:06}"))
}

/// Query parameters accepted when browsing the catalog.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BrowseFilter {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub min_amount: Option<f64>,
    #[serde(default)]
    pub education_level: Option<String>,
    #[serde(default)]
    pub open_only: bool,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
}

impl BrowseFilter {
    fn admits(&self, scholarship: &Scholarship, today: NaiveDate) -> bool {
        if self.open_only && !scholarship.is_open_on(today) {
            return false;
        }
        if let Some(min_amount) = self.min_amount {
            if scholarship.amount.map_or(true, |amount| amount < min_amount) {
                return false;
            }
        }
        if let Some(location) = non_blank(self.location.as_deref()) {
            let listed = scholarship.location.to_lowercase();
            let nationwide = NATIONWIDE.contains(&listed.trim());
            if !nationwide && !listed.contains(&location.to_lowercase()) {
                return false;
            }
        }
        if let Some(level) = non_blank(self.education_level.as_deref()) {
            let listed = scholarship.education_level.to_lowercase();
            if listed != "any" && !listed.contains(&level.to_lowercase()) {
                return false;
            }
        }
        if let Some(query) = non_blank(self.q.as_deref()) {
            let query = query.to_lowercase();
            let haystacks = [
                Some(scholarship.title.as_str()),
                Some(scholarship.provider.as_str()),
                scholarship.description.as_deref(),
            ];
            let in_text = haystacks
                .iter()
                .flatten()
                .any(|text| text.to_lowercase().contains(&query));
            let in_tags = scholarship
                .tags
                .iter()
                .any(|tag| tag.to_lowercase().contains(&query));
            if !in_text && !in_tags {
                return false;
            }
        }
        true
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogPage {
    pub total: usize,
    pub offset: usize,
    pub items: Vec<Scholarship>,
}

/// Scholarship listings: admin maintenance plus student browsing.
pub struct CatalogService {
    scholarships: Arc<dyn ScholarshipRepository>,
}

impl CatalogService {
    pub fn new(scholarships: Arc<dyn ScholarshipRepository>) -> Self {
        Self { scholarships }
    }

    /// Validate and store a hand-entered listing.
    pub fn create(
        &self,
        listing: NewScholarship,
        now: DateTime<Utc>,
    ) -> Result<Scholarship, PortalError> {
        validate_listing(&listing)?;
        if self.is_listed(&listing.dedupe_key())? {
            return Err(PortalError::Conflict(format!(
                "'{}' from '{}' is already listed",
                listing.title.trim(),
                listing.provider.trim()
            )));
        }
        self.insert(listing, now).map_err(PortalError::from)
    }

    /// Store an already-normalized listing under a fresh id. The store's key index
    /// is the final duplicate guard.
    pub(crate) fn insert(
        &self,
        listing: NewScholarship,
        now: DateTime<Utc>,
    ) -> Result<Scholarship, RepositoryError> {
        let scholarship = listing.into_scholarship(next_scholarship_id(), now);
        self.scholarships.insert(scholarship)
    }

    pub(crate) fn is_listed(&self, key: &DedupeKey) -> Result<bool, RepositoryError> {
        Ok(self.scholarships.find_by_key(key)?.is_some())
    }

    pub fn get(&self, id: &ScholarshipId) -> Result<Scholarship, PortalError> {
        self.scholarships
            .fetch(id)?
            .ok_or_else(|| PortalError::NotFound(format!("scholarship {}", id.0)))
    }

    pub fn delete(&self, id: &ScholarshipId) -> Result<(), PortalError> {
        self.scholarships.delete(id).map_err(|err| match err {
            RepositoryError::NotFound => PortalError::NotFound(format!("scholarship {}", id.0)),
            other => PortalError::from(other),
        })
    }

    pub fn all(&self) -> Result<Vec<Scholarship>, PortalError> {
        Ok(self.scholarships.all()?)
    }

    /// Filtered listings, newest first.
    pub fn browse(&self, filter: &BrowseFilter, today: NaiveDate) -> Result<CatalogPage, PortalError> {
        let mut matches: Vec<Scholarship> = self
            .scholarships
            .all()?
            .into_iter()
            .filter(|scholarship| filter.admits(scholarship, today))
            .collect();
        matches.sort_by(newest_first);

        let total = matches.len();
        let offset = filter.offset.unwrap_or(0);
        let limit = filter.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let items = matches.into_iter().skip(offset).take(limit).collect();
        Ok(CatalogPage {
            total,
            offset,
            items,
        })
    }
}

fn validate_listing(listing: &NewScholarship) -> Result<(), PortalError> {
    if listing.title.trim().is_empty() {
        return Err(PortalError::Invalid("title is required".to_string()));
    }
    if listing.provider.trim().is_empty() {
        return Err(PortalError::Invalid("provider is required".to_string()));
    }
    if let Some(link) = &listing.apply_link {
        if !crate::ingest::is_http_link(link) {
            return Err(PortalError::Invalid(
                "apply link must start with http:// or https://".to_string(),
            ));
        }
    }
    if let Some(cgpa) = listing.min_cgpa {
        if !(0.0..=10.0).contains(&cgpa) {
            return Err(PortalError::Invalid(
                "minimum CGPA must be between 0 and 10".to_string(),
            ));
        }
    }
    if listing.amount.is_some_and(|amount| amount < 0.0)
        || listing.max_income.is_some_and(|income| income < 0.0)
    {
        return Err(PortalError::Invalid(
            "amounts must not be negative".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portal::memory::InMemoryStore;
    use chrono::Duration;

    fn catalog() -> CatalogService {
        CatalogService::new(Arc::new(InMemoryStore::new()))
    }

    fn listing(title: &str) -> NewScholarship {
        NewScholarship {
            title: title.to_string(),
            provider: "State Board".to_string(),
            ..NewScholarship::default()
        }
    }

    #[test]
    fn create_rejects_invalid_and_duplicate_listings() {
        let catalog = catalog();
        let now = Utc::now();

        let err = catalog
            .create(
                NewScholarship {
                    apply_link: Some("ftp://example.org".to_string()),
                    ..listing("Merit Award")
                },
                now,
            )
            .expect_err("bad link");
        assert!(matches!(err, PortalError::Invalid(_)));

        let err = catalog
            .create(
                NewScholarship {
                    min_cgpa: Some(11.0),
                    ..listing("Merit Award")
                },
                now,
            )
            .expect_err("bad cgpa");
        assert!(matches!(err, PortalError::Invalid(_)));

        catalog.create(listing("Merit Award"), now).expect("created");
        let err = catalog
            .create(listing("merit-award."), now)
            .expect_err("duplicate");
        assert!(matches!(err, PortalError::Conflict(_)));
    }

    #[test]
    fn browse_filters_and_orders_newest_first() {
        let catalog = catalog();
        let now = Utc::now();
        let today = now.date_naive();

        catalog
            .create(
                NewScholarship {
                    amount: Some(10_000.0),
                    location: Some("Karnataka".to_string()),
                    deadline: Some(today - Duration::days(1)),
                    ..listing("Closed Karnataka Grant")
                },
                now - Duration::hours(2),
            )
            .expect("created");
        catalog
            .create(
                NewScholarship {
                    amount: Some(60_000.0),
                    tags: vec!["engineering".to_string()],
                    ..listing("National Merit Award")
                },
                now - Duration::hours(1),
            )
            .expect("created");
        catalog
            .create(
                NewScholarship {
                    location: Some("Kerala".to_string()),
                    ..listing("Kerala Fee Waiver")
                },
                now,
            )
            .expect("created");

        let everything = catalog
            .browse(&BrowseFilter::default(), today)
            .expect("browse");
        assert_eq!(everything.total, 3);
        assert_eq!(everything.items[0].title, "Kerala Fee Waiver");

        let karnataka = catalog
            .browse(
                &BrowseFilter {
                    location: Some("karnataka".to_string()),
                    ..BrowseFilter::default()
                },
                today,
            )
            .expect("browse");
        let titles: Vec<_> = karnataka.items.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["National Merit Award", "Closed Karnataka Grant"]);

        let open_rich = catalog
            .browse(
                &BrowseFilter {
                    open_only: true,
                    min_amount: Some(5_000.0),
                    ..BrowseFilter::default()
                },
                today,
            )
            .expect("browse");
        assert_eq!(open_rich.total, 1);
        assert_eq!(open_rich.items[0].title, "National Merit Award");

        let tagged = catalog
            .browse(
                &BrowseFilter {
                    q: Some("ENGINEERING".to_string()),
                    ..BrowseFilter::default()
                },
                today,
            )
            .expect("browse");
        assert_eq!(tagged.total, 1);
    }

    #[test]
    fn missing_listing_is_not_found() {
        let catalog = catalog();
        let id = ScholarshipId("sch-missing".to_string());
        assert!(matches!(catalog.get(&id), Err(PortalError::NotFound(_))));
        assert!(matches!(catalog.delete(&id), Err(PortalError::NotFound(_))));
    }
}
