use std::sync::Arc;

use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use super::catalog::{BrowseFilter, CatalogPage};
use super::dashboard::DashboardSummary;
use super::domain::{
    Application, ApplicationStatus, NewScholarship, Scholarship, ScholarshipId, StudentProfile,
    UserId,
};
use super::eligibility::{EligibilityReport, RankedScholarship};
use super::error::PortalError;
use super::profile::ProfileUpdate;
use super::service::Portal;
use super::tracker::TrackedScholarship;
use crate::assist::{DocumentType, EligibilityExplanation};
use crate::ingest::{IngestMode, IngestReport};
use crate::llm::LanguageModel;

const USER_HEADER: &str = "x-user-id";
const EMAIL_HEADER: &str = "x-user-email";
/// Headroom for multipart boundaries and part headers on top of the file cap.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Caller identity as asserted by the upstream gateway.
struct Caller {
    user: UserId,
    email: Option<String>,
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn optional_caller(headers: &HeaderMap) -> Option<Caller> {
    header_value(headers, USER_HEADER).map(|user| Caller {
        user: UserId(user),
        email: header_value(headers, EMAIL_HEADER),
    })
}

fn caller(headers: &HeaderMap) -> Result<Caller, PortalError> {
    optional_caller(headers).ok_or(PortalError::Unauthorized)
}

fn require_admin<L>(portal: &Portal<L>, headers: &HeaderMap) -> Result<(), PortalError> {
    let email = header_value(headers, EMAIL_HEADER).ok_or(PortalError::Unauthorized)?;
    portal.access.require_admin(Some(&email))
}

fn multipart_error(err: MultipartError, limit: usize) -> PortalError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        PortalError::PayloadTooLarge { limit }
    } else {
        PortalError::Invalid(format!("malformed upload: {}", err.body_text()))
    }
}

/// Router exposing the student and admin endpoints.
pub fn portal_router<L>(portal: Arc<Portal<L>>) -> Router
where
    L: LanguageModel + 'static,
{
    let upload_limit = DefaultBodyLimit::max(portal.upload_max_bytes + MULTIPART_OVERHEAD);

    Router::new()
        .route(
            "/api/v1/scholarships",
            get(browse_handler::<L>).post(create_handler::<L>),
        )
        .route(
            "/api/v1/scholarships/:scholarship_id",
            get(show_handler::<L>).delete(delete_handler::<L>),
        )
        .route(
            "/api/v1/scholarships/:scholarship_id/eligibility",
            get(eligibility_handler::<L>),
        )
        .route(
            "/api/v1/scholarships/:scholarship_id/save",
            post(toggle_save_handler::<L>),
        )
        .route(
            "/api/v1/scholarships/:scholarship_id/explain",
            post(explain_handler::<L>),
        )
        .route(
            "/api/v1/scholarships/:scholarship_id/sop",
            post(sop_handler::<L>),
        )
        .route("/api/v1/matches", get(matches_handler::<L>))
        .route(
            "/api/v1/profile",
            get(profile_handler::<L>).put(update_profile_handler::<L>),
        )
        .route(
            "/api/v1/profile/documents/parse",
            post(parse_documents_handler::<L>).layer(upload_limit),
        )
        .route("/api/v1/applications", get(applications_handler::<L>))
        .route(
            "/api/v1/applications/:scholarship_id",
            put(set_status_handler::<L>),
        )
        .route("/api/v1/dashboard", get(dashboard_handler::<L>))
        .route("/api/v1/admin/access", get(admin_access_handler::<L>))
        .route(
            "/api/v1/admin/ingest",
            post(ingest_handler::<L>).layer(upload_limit),
        )
        .route(
            "/api/v1/admin/whitelist",
            get(whitelist_handler::<L>).post(grant_handler::<L>),
        )
        .route(
            "/api/v1/admin/whitelist/:email",
            delete(revoke_handler::<L>),
        )
        .with_state(portal)
}

type PortalState<L> = State<Arc<Portal<L>>>;

pub(crate) async fn browse_handler<L>(
    State(portal): PortalState<L>,
    Query(filter): Query<BrowseFilter>,
) -> Result<Json<CatalogPage>, PortalError>
where
    L: LanguageModel + 'static,
{
    let page = portal.catalog.browse(&filter, Utc::now().date_naive())?;
    Ok(Json(page))
}

pub(crate) async fn create_handler<L>(
    State(portal): PortalState<L>,
    headers: HeaderMap,
    Json(listing): Json<NewScholarship>,
) -> Result<(StatusCode, Json<Scholarship>), PortalError>
where
    L: LanguageModel + 'static,
{
    require_admin(&portal, &headers)?;
    let created = portal.catalog.create(listing, Utc::now())?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub(crate) async fn show_handler<L>(
    State(portal): PortalState<L>,
    Path(scholarship_id): Path<String>,
) -> Result<Json<Scholarship>, PortalError>
where
    L: LanguageModel + 'static,
{
    let scholarship = portal.catalog.get(&ScholarshipId(scholarship_id))?;
    Ok(Json(scholarship))
}

pub(crate) async fn delete_handler<L>(
    State(portal): PortalState<L>,
    headers: HeaderMap,
    Path(scholarship_id): Path<String>,
) -> Result<StatusCode, PortalError>
where
    L: LanguageModel + 'static,
{
    require_admin(&portal, &headers)?;
    portal.catalog.delete(&ScholarshipId(scholarship_id))?;
    Ok(StatusCode::NO_CONTENT)
}

/// Eligible listings for the caller, or the newest listings for anonymous callers
/// and students without a profile.
pub(crate) async fn matches_handler<L>(
    State(portal): PortalState<L>,
    headers: HeaderMap,
) -> Result<Json<Vec<RankedScholarship>>, PortalError>
where
    L: LanguageModel + 'static,
{
    let profile = match optional_caller(&headers) {
        Some(caller) => portal.profiles.find(&caller.user)?,
        None => None,
    };
    let ranked = portal.engine.rank(
        profile.as_ref(),
        portal.catalog.all()?,
        Utc::now().date_naive(),
    );
    Ok(Json(ranked))
}

fn profile_and_listing<L>(
    portal: &Portal<L>,
    headers: &HeaderMap,
    scholarship_id: String,
) -> Result<(StudentProfile, Scholarship), PortalError> {
    let caller = caller(headers)?;
    let profile = portal.profiles.get(&caller.user)?;
    let scholarship = portal.catalog.get(&ScholarshipId(scholarship_id))?;
    Ok((profile, scholarship))
}

pub(crate) async fn eligibility_handler<L>(
    State(portal): PortalState<L>,
    headers: HeaderMap,
    Path(scholarship_id): Path<String>,
) -> Result<Json<EligibilityReport>, PortalError>
where
    L: LanguageModel + 'static,
{
    let (profile, scholarship) = profile_and_listing(&portal, &headers, scholarship_id)?;
    let report = portal
        .engine
        .assess(&profile, &scholarship, Utc::now().date_naive());
    Ok(Json(report))
}

pub(crate) async fn explain_handler<L>(
    State(portal): PortalState<L>,
    headers: HeaderMap,
    Path(scholarship_id): Path<String>,
) -> Result<Json<EligibilityExplanation>, PortalError>
where
    L: LanguageModel + 'static,
{
    let (profile, scholarship) = profile_and_listing(&portal, &headers, scholarship_id)?;
    let explanation = portal
        .assist
        .explain(&profile, &scholarship, Utc::now().date_naive())
        .await?;
    Ok(Json(explanation))
}

pub(crate) async fn sop_handler<L>(
    State(portal): PortalState<L>,
    headers: HeaderMap,
    Path(scholarship_id): Path<String>,
) -> Result<Json<Value>, PortalError>
where
    L: LanguageModel + 'static,
{
    let (profile, scholarship) = profile_and_listing(&portal, &headers, scholarship_id)?;
    let statement = portal
        .assist
        .statement_of_purpose(&profile, &scholarship)
        .await?;
    Ok(Json(json!({
        "scholarship_id": scholarship.id,
        "statement": statement,
    })))
}

pub(crate) async fn profile_handler<L>(
    State(portal): PortalState<L>,
    headers: HeaderMap,
) -> Result<Json<StudentProfile>, PortalError>
where
    L: LanguageModel + 'static,
{
    let caller = caller(&headers)?;
    Ok(Json(portal.profiles.get(&caller.user)?))
}

pub(crate) async fn update_profile_handler<L>(
    State(portal): PortalState<L>,
    headers: HeaderMap,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<StudentProfile>, PortalError>
where
    L: LanguageModel + 'static,
{
    let caller = caller(&headers)?;
    let profile =
        portal
            .profiles
            .upsert(&caller.user, caller.email.as_deref(), update, Utc::now())?;
    Ok(Json(profile))
}

/// Each multipart part is one document; the part name is its type
/// (resume, marksheet, idproof, income, category, disability). Always answers
/// 200 so the form can fall back to manual entry.
pub(crate) async fn parse_documents_handler<L>(
    State(portal): PortalState<L>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<Value>, PortalError>
where
    L: LanguageModel + 'static,
{
    caller(&headers)?;
    let limit = portal.upload_max_bytes;
    let mut uploads = Vec::new();
    let mut warnings = Vec::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                warnings.push(multipart_error(err, limit).to_string());
                break;
            }
        };
        let name = field.name().unwrap_or_default().to_string();
        let Some(kind) = DocumentType::parse(&name) else {
            warnings.push(format!("ignored part '{name}': unknown document type"));
            continue;
        };
        let file_name = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}.txt", kind.label()));
        match field.bytes().await {
            Ok(bytes) if bytes.len() > limit => {
                warnings.push(PortalError::PayloadTooLarge { limit }.to_string());
            }
            Ok(bytes) => uploads.push((kind, file_name, bytes.to_vec())),
            Err(err) => {
                warnings.push(multipart_error(err, limit).to_string());
                break;
            }
        }
    }

    let outcome = portal.assist.parse_uploads(uploads).await;
    warnings.extend(
        outcome
            .documents
            .iter()
            .filter_map(|document| document.warning.clone()),
    );
    Ok(Json(json!({
        "draft": outcome.draft,
        "documents": outcome.documents,
        "warnings": warnings,
    })))
}

pub(crate) async fn toggle_save_handler<L>(
    State(portal): PortalState<L>,
    headers: HeaderMap,
    Path(scholarship_id): Path<String>,
) -> Result<Json<Value>, PortalError>
where
    L: LanguageModel + 'static,
{
    let caller = caller(&headers)?;
    let id = ScholarshipId(scholarship_id);
    let toggle = portal.tracker.toggle_save(&caller.user, &id, Utc::now())?;
    Ok(Json(json!({
        "scholarship_id": id,
        "status": toggle,
    })))
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusRequest {
    status: ApplicationStatus,
}

pub(crate) async fn set_status_handler<L>(
    State(portal): PortalState<L>,
    headers: HeaderMap,
    Path(scholarship_id): Path<String>,
    Json(request): Json<StatusRequest>,
) -> Result<Json<Application>, PortalError>
where
    L: LanguageModel + 'static,
{
    let caller = caller(&headers)?;
    let application = portal.tracker.set_status(
        &caller.user,
        &ScholarshipId(scholarship_id),
        request.status,
        Utc::now(),
    )?;
    Ok(Json(application))
}

pub(crate) async fn applications_handler<L>(
    State(portal): PortalState<L>,
    headers: HeaderMap,
) -> Result<Json<Vec<TrackedScholarship>>, PortalError>
where
    L: LanguageModel + 'static,
{
    let caller = caller(&headers)?;
    Ok(Json(portal.tracker.list(&caller.user)?))
}

pub(crate) async fn dashboard_handler<L>(
    State(portal): PortalState<L>,
    headers: HeaderMap,
) -> Result<Json<DashboardSummary>, PortalError>
where
    L: LanguageModel + 'static,
{
    let caller = caller(&headers)?;
    Ok(Json(portal.dashboard.summary(&caller.user, Utc::now())?))
}

pub(crate) async fn admin_access_handler<L>(
    State(portal): PortalState<L>,
    headers: HeaderMap,
) -> Result<Json<Value>, PortalError>
where
    L: LanguageModel + 'static,
{
    let email = header_value(&headers, EMAIL_HEADER);
    let is_admin = portal.access.is_admin(email.as_deref())?;
    Ok(Json(json!({
        "email": email,
        "is_admin": is_admin,
    })))
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct IngestParams {
    #[serde(default)]
    dry_run: bool,
}

/// Accepts a single upload part named `file` or `pdf` (PDF, text or CSV).
pub(crate) async fn ingest_handler<L>(
    State(portal): PortalState<L>,
    headers: HeaderMap,
    Query(params): Query<IngestParams>,
    mut multipart: Multipart,
) -> Result<Json<IngestReport>, PortalError>
where
    L: LanguageModel + 'static,
{
    require_admin(&portal, &headers)?;
    let limit = portal.upload_max_bytes;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| multipart_error(err, limit))?
    {
        if !matches!(field.name(), Some("file" | "pdf")) {
            continue;
        }
        let file_name = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| "upload".to_string());
        let bytes = field
            .bytes()
            .await
            .map_err(|err| multipart_error(err, limit))?;
        upload = Some((file_name, bytes));
        break;
    }

    let (file_name, bytes) =
        upload.ok_or_else(|| PortalError::Invalid("a 'file' or 'pdf' part is required".to_string()))?;
    if bytes.len() > limit {
        return Err(PortalError::PayloadTooLarge { limit });
    }

    let mode = if params.dry_run {
        IngestMode::DryRun
    } else {
        IngestMode::Commit
    };
    let report = portal
        .ingest
        .ingest_document(&file_name, bytes.to_vec(), mode, Utc::now())
        .await?;
    Ok(Json(report))
}

pub(crate) async fn whitelist_handler<L>(
    State(portal): PortalState<L>,
    headers: HeaderMap,
) -> Result<Json<Value>, PortalError>
where
    L: LanguageModel + 'static,
{
    require_admin(&portal, &headers)?;
    Ok(Json(json!({ "emails": portal.access.whitelist()? })))
}

#[derive(Debug, Deserialize)]
pub(crate) struct GrantRequest {
    email: String,
}

pub(crate) async fn grant_handler<L>(
    State(portal): PortalState<L>,
    headers: HeaderMap,
    Json(request): Json<GrantRequest>,
) -> Result<(StatusCode, Json<Value>), PortalError>
where
    L: LanguageModel + 'static,
{
    require_admin(&portal, &headers)?;
    portal.access.grant(&request.email)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "email": request.email.trim().to_ascii_lowercase() })),
    ))
}

pub(crate) async fn revoke_handler<L>(
    State(portal): PortalState<L>,
    headers: HeaderMap,
    Path(email): Path<String>,
) -> Result<Json<Value>, PortalError>
where
    L: LanguageModel + 'static,
{
    require_admin(&portal, &headers)?;
    let revoked = portal.access.revoke(&email)?;
    Ok(Json(json!({ "email": email, "revoked": revoked })))
}
