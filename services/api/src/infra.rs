use chrono::{DateTime, NaiveDate, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use scholar_match::config::AppConfig;
use scholar_match::error::AppError;
use scholar_match::ingest::{normalize_entry, read_entries, IngestError};
use scholar_match::portal::{
    CatalogService, MatchPolicy, NewScholarship, PortalError, PortalSettings,
};
use std::fs;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) fn portal_settings(config: &AppConfig) -> PortalSettings {
    PortalSettings {
        policy: MatchPolicy::default(),
        super_admins: config.access.super_admins.clone(),
        upload_max_bytes: config.server.upload_max_bytes,
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

/// Read listings from a CSV sheet or a JSON array. Invalid CSV rows are logged and dropped.
pub(crate) fn load_catalog_file(path: &Path) -> Result<Vec<NewScholarship>, AppError> {
    let bytes = fs::read(path)?;
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

    if !is_csv {
        return serde_json::from_slice(&bytes).map_err(|err| {
            AppError::Input(format!("{} is not a JSON listing array: {err}", path.display()))
        });
    }

    let source = path.file_name().and_then(|name| name.to_str());
    let entries = read_entries(bytes.as_slice()).map_err(IngestError::from)?;
    let mut listings = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        match entry.and_then(|raw| normalize_entry(raw, source)) {
            Ok(listing) => listings.push(listing),
            Err(reason) => warn!(row = index + 1, %reason, "skipped catalog row"),
        }
    }
    Ok(listings)
}

/// Create each listing in turn. Duplicates and invalid listings are logged and skipped.
pub(crate) fn seed_catalog(
    catalog: &CatalogService,
    listings: Vec<NewScholarship>,
    now: DateTime<Utc>,
) -> Result<usize, PortalError> {
    let mut loaded = 0usize;
    for listing in listings {
        match catalog.create(listing, now) {
            Ok(_) => loaded += 1,
            Err(PortalError::Conflict(reason)) | Err(PortalError::Invalid(reason)) => {
                warn!(%reason, "skipped catalog listing")
            }
            Err(err) => return Err(err),
        }
    }
    Ok(loaded)
}
