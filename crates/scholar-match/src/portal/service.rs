use std::sync::Arc;

use super::access::AdminAccess;
use super::catalog::CatalogService;
use super::dashboard::DashboardService;
use super::eligibility::{EligibilityEngine, MatchPolicy};
use super::memory::InMemoryStore;
use super::profile::ProfileService;
use super::repository::{
    AdminWhitelist, ApplicationRepository, ProfileRepository, ScholarshipRepository,
};
use super::tracker::TrackerService;
use crate::assist::AssistService;
use crate::ingest::IngestionPipeline;
use crate::llm::LanguageModel;

/// Storage handles the portal runs against.
#[derive(Clone)]
pub struct Repositories {
    pub scholarships: Arc<dyn ScholarshipRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub applications: Arc<dyn ApplicationRepository>,
    pub admins: Arc<dyn AdminWhitelist>,
}

impl Repositories {
    pub fn in_memory(store: InMemoryStore) -> Self {
        let store = Arc::new(store);
        Self {
            scholarships: store.clone(),
            profiles: store.clone(),
            applications: store.clone(),
            admins: store,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PortalSettings {
    pub policy: MatchPolicy,
    pub super_admins: Vec<String>,
    pub upload_max_bytes: usize,
}

impl Default for PortalSettings {
    fn default() -> Self {
        Self {
            policy: MatchPolicy::default(),
            super_admins: Vec::new(),
            upload_max_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Every portal service wired to one set of repositories and one model.
pub struct Portal<L> {
    pub catalog: Arc<CatalogService>,
    pub profiles: Arc<ProfileService>,
    pub tracker: Arc<TrackerService>,
    pub dashboard: DashboardService,
    pub access: AdminAccess,
    pub engine: Arc<EligibilityEngine>,
    pub assist: AssistService<L>,
    pub ingest: IngestionPipeline<L>,
    pub upload_max_bytes: usize,
}

impl<L> Portal<L>
where
    L: LanguageModel + 'static,
{
    pub fn new(repositories: Repositories, model: Arc<L>, settings: PortalSettings) -> Self {
        let engine = Arc::new(EligibilityEngine::new(settings.policy));
        let catalog = Arc::new(CatalogService::new(repositories.scholarships.clone()));
        let profiles = Arc::new(ProfileService::new(repositories.profiles));
        let tracker = Arc::new(TrackerService::new(
            repositories.scholarships,
            repositories.applications,
        ));
        let dashboard = DashboardService::new(
            catalog.clone(),
            profiles.clone(),
            tracker.clone(),
            engine.clone(),
        );

        Self {
            access: AdminAccess::new(&settings.super_admins, repositories.admins),
            assist: AssistService::new(model.clone(), engine.clone()),
            ingest: IngestionPipeline::new(model, catalog.clone()),
            catalog,
            profiles,
            tracker,
            dashboard,
            engine,
            upload_max_bytes: settings.upload_max_bytes,
        }
    }
}
