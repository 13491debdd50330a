use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::llm::{CompletionRequest, LanguageModel, LlmError};
use crate::portal::domain::{
    Category, EducationLevel, NewScholarship, Scholarship, ScholarshipId, StudentProfile, UserId,
};
use crate::portal::memory::InMemoryStore;
use crate::portal::service::{Portal, PortalSettings, Repositories};

pub(super) const SUPER_ADMIN: &str = "root@portal.test";

pub(super) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 8, 1).expect("valid date")
}

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 8, 1, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn listing(title: &str, provider: &str) -> NewScholarship {
    NewScholarship {
        title: title.to_string(),
        provider: provider.to_string(),
        ..NewScholarship::default()
    }
}

pub(super) fn stored(id: &str, listing: NewScholarship) -> Scholarship {
    listing.into_scholarship(ScholarshipId(id.to_string()), now())
}

pub(super) fn student() -> StudentProfile {
    let mut profile = StudentProfile::empty(UserId("student-1".to_string()), now());
    profile.name = Some("Asha Verma".to_string());
    profile.cgpa = Some(8.2);
    profile.income = Some(240_000.0);
    profile.course = Some("B.Tech Computer Science".to_string());
    profile.education_level = EducationLevel::Undergraduate;
    profile.year_of_study = Some(2);
    profile.graduation_year = Some(2028);
    profile.state = Some("Karnataka".to_string());
    profile.category = Some(Category::Obc);
    profile
}

/// Language model double that replays queued replies and records every request.
#[derive(Default)]
pub(super) struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedModel {
    pub(super) fn replying<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let model = Self::default();
        model
            .replies
            .lock()
            .expect("reply queue poisoned")
            .extend(replies.into_iter().map(|reply| Ok(reply.into())));
        model
    }

    pub(super) fn failing(error: LlmError) -> Self {
        let model = Self::default();
        model
            .replies
            .lock()
            .expect("reply queue poisoned")
            .push_back(Err(error));
        model
    }

    pub(super) fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().expect("request log poisoned").clone()
    }
}

impl LanguageModel for ScriptedModel {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        self.requests
            .lock()
            .expect("request log poisoned")
            .push(request.clone());
        self.replies
            .lock()
            .expect("reply queue poisoned")
            .pop_front()
            .unwrap_or(Err(LlmError::EmptyReply))
    }
}

pub(super) fn build_portal(model: ScriptedModel) -> (Arc<Portal<ScriptedModel>>, Arc<ScriptedModel>) {
    let model = Arc::new(model);
    let settings = PortalSettings {
        super_admins: vec![SUPER_ADMIN.to_string()],
        upload_max_bytes: 64 * 1024,
        ..PortalSettings::default()
    };
    let portal = Portal::new(
        Repositories::in_memory(InMemoryStore::new()),
        model.clone(),
        settings,
    );
    (Arc::new(portal), model)
}

pub(super) async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}
