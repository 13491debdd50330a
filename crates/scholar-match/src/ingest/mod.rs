//! Bulk population of the catalog from admin uploads.
//!
//! A PDF or text notice goes through text extraction, an LLM structuring call and
//! reply parsing; a CSV sheet skips straight to the shared per-entry stage. Every
//! entry is then normalized, checked against the batch and the store for
//! duplicates, and inserted. Entry-level problems are recorded in the report and
//! never abort the batch.

mod prompt;
mod sheet;
mod text;
mod validate;

use std::collections::HashSet;
use std::io::Cursor;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::llm::{extract_json_array, LanguageModel, LlmError, ReplyError};
use crate::portal::catalog::CatalogService;
use crate::portal::domain::{NewScholarship, ScholarshipId};
use crate::portal::repository::RepositoryError;

pub use prompt::extraction_request;
pub use sheet::read_entries;
pub use text::{extract_text, DocumentFormat, ExtractionError, MIN_MEANINGFUL_CHARS};
pub use validate::{normalize_entry, parse_entry, EntryRejection, RawEntry};

pub(crate) use validate::{cgpa_scale, is_http_link, iso_date, parse_number_text};

/// Whether accepted entries are written to the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestMode {
    Commit,
    DryRun,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedEntry {
    /// Zero-based position in the extracted batch.
    pub index: usize,
    pub title: Option<String>,
    pub reason: String,
}

/// Outcome of one ingestion run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    pub source: String,
    pub mode: IngestMode,
    pub extracted: usize,
    pub inserted: usize,
    pub skipped: usize,
    pub errors: Vec<SkippedEntry>,
    pub inserted_ids: Vec<ScholarshipId>,
    /// Entries that passed validation; populated for dry runs only.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub accepted: Vec<NewScholarship>,
}

impl IngestReport {
    fn new(source: &str, mode: IngestMode, extracted: usize) -> Self {
        Self {
            source: source.to_string(),
            mode,
            extracted,
            inserted: 0,
            skipped: 0,
            errors: Vec::new(),
            inserted_ids: Vec::new(),
            accepted: Vec::new(),
        }
    }

    fn skip(&mut self, index: usize, title: Option<String>, reason: impl ToString) {
        let reason = reason.to_string();
        warn!(source = %self.source, index, title = ?title, %reason, "skipped extracted entry");
        self.skipped += 1;
        self.errors.push(SkippedEntry {
            index,
            title,
            reason,
        });
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("model reply was not a JSON array: {0}")]
    Reply(#[from] ReplyError),
    #[error("no scholarships were found in the document")]
    NoEntries,
    #[error("invalid CSV sheet: {0}")]
    Csv(#[from] csv::Error),
    #[error("catalog unavailable: {0}")]
    Repository(RepositoryError),
    #[error("text extraction worker failed: {0}")]
    Worker(String),
}

/// Upload → text → LLM → JSON → normalize → dedupe → insert.
pub struct IngestionPipeline<L> {
    model: Arc<L>,
    catalog: Arc<CatalogService>,
}

impl<L> IngestionPipeline<L>
where
    L: LanguageModel + 'static,
{
    pub fn new(model: Arc<L>, catalog: Arc<CatalogService>) -> Self {
        Self { model, catalog }
    }

    /// Run an uploaded document through the pipeline.
    pub async fn ingest_document(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        mode: IngestMode,
        now: DateTime<Utc>,
    ) -> Result<IngestReport, IngestError> {
        let format = DocumentFormat::detect(file_name, &bytes).ok_or_else(|| {
            ExtractionError::Unsupported {
                file_name: file_name.to_string(),
            }
        })?;
        info!(source = file_name, ?format, bytes = bytes.len(), ?mode, "ingestion started");

        let entries: Vec<Result<RawEntry, EntryRejection>> = match format {
            DocumentFormat::Csv => read_entries(Cursor::new(bytes))?,
            DocumentFormat::Pdf | DocumentFormat::Text => {
                let text = tokio::task::spawn_blocking(move || extract_text(format, &bytes))
                    .await
                    .map_err(|err| IngestError::Worker(err.to_string()))??;
                self.structure(&text).await?
            }
        };

        self.ingest_entries(file_name, entries, mode, now)
    }

    /// Ask the model for a JSON array of listings and parse each element.
    async fn structure(
        &self,
        text: &str,
    ) -> Result<Vec<Result<RawEntry, EntryRejection>>, IngestError> {
        let reply = self.model.complete(&extraction_request(text)).await?;
        let values = extract_json_array(&reply)?;
        if values.is_empty() {
            return Err(IngestError::NoEntries);
        }
        Ok(values.into_iter().map(parse_entry).collect())
    }

    /// The shared per-entry stage: normalize, dedupe, insert.
    pub fn ingest_entries(
        &self,
        source: &str,
        entries: Vec<Result<RawEntry, EntryRejection>>,
        mode: IngestMode,
        now: DateTime<Utc>,
    ) -> Result<IngestReport, IngestError> {
        if entries.is_empty() {
            return Err(IngestError::NoEntries);
        }
        let mut report = IngestReport::new(source, mode, entries.len());
        let mut seen = HashSet::new();

        for (index, entry) in entries.into_iter().enumerate() {
            let listing = match entry.and_then(|raw| normalize_entry(raw, Some(source))) {
                Ok(listing) => listing,
                Err(rejection) => {
                    report.skip(index, None, rejection);
                    continue;
                }
            };

            let key = listing.dedupe_key();
            if !seen.insert(key.clone()) {
                report.skip(index, Some(listing.title), "duplicate within this document");
                continue;
            }
            if self
                .catalog
                .is_listed(&key)
                .map_err(IngestError::Repository)?
            {
                report.skip(index, Some(listing.title), "already listed");
                continue;
            }

            match mode {
                IngestMode::DryRun => report.accepted.push(listing),
                IngestMode::Commit => {
                    let title = listing.title.clone();
                    match self.catalog.insert(listing, now) {
                        Ok(stored) => {
                            report.inserted += 1;
                            report.inserted_ids.push(stored.id);
                        }
                        Err(RepositoryError::Conflict) => {
                            report.skip(index, Some(title), "already listed");
                        }
                        Err(err) => return Err(IngestError::Repository(err)),
                    }
                }
            }
        }

        info!(
            source = %report.source,
            extracted = report.extracted,
            inserted = report.inserted,
            accepted = report.accepted.len(),
            skipped = report.skipped,
            "ingestion finished"
        );
        Ok(report)
    }
}
