//! Writing assistance backed by the language model: eligibility explanations,
//! statements of purpose and profile pre-fill from uploaded documents.

mod document;

use std::fmt::Write as _;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::warn;

use crate::ingest::{extract_text, DocumentFormat, ExtractionError};
use crate::llm::{extract_json_object, CompletionRequest, LanguageModel, LlmError, ReplyError};
use crate::portal::domain::{Scholarship, StudentProfile};
use crate::portal::eligibility::{CheckOutcome, EligibilityEngine, EligibilityReport};

pub use document::{
    document_request, draft_from_reply, merge_drafts, truncate_for_prompt, DocumentType,
    ProfileDraft, PROMPT_TEXT_LIMIT,
};

const SOP_WORDS: usize = 300;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EligibilityExplanation {
    pub report: EligibilityReport,
    pub explanation: String,
}

#[derive(Debug, thiserror::Error)]
pub enum DocumentParseError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error(transparent)]
    Reply(#[from] ReplyError),
    #[error("text extraction worker failed: {0}")]
    Worker(String),
}

/// One uploaded document and what came of it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedDocument {
    pub kind: DocumentType,
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft: Option<ProfileDraft>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Merged draft plus per-document results. Never an error: failures become warnings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentParseOutcome {
    pub draft: ProfileDraft,
    pub documents: Vec<ParsedDocument>,
}

pub struct AssistService<L> {
    model: Arc<L>,
    engine: Arc<EligibilityEngine>,
}

impl<L> AssistService<L>
where
    L: LanguageModel + 'static,
{
    pub fn new(model: Arc<L>, engine: Arc<EligibilityEngine>) -> Self {
        Self { model, engine }
    }

    /// Plain-language eligibility explanation grounded in the engine's own checks.
    pub async fn explain(
        &self,
        profile: &StudentProfile,
        scholarship: &Scholarship,
        today: NaiveDate,
    ) -> Result<EligibilityExplanation, LlmError> {
        let report = self.engine.assess(profile, scholarship, today);
        let request = CompletionRequest::new(explanation_prompt(profile, scholarship, &report))
            .with_system("You are a scholarship advisor for Indian students. Be accurate and concise.")
            .with_max_tokens(800);
        let explanation = self.model.complete(&request).await?;
        Ok(EligibilityExplanation {
            report,
            explanation,
        })
    }

    pub async fn statement_of_purpose(
        &self,
        profile: &StudentProfile,
        scholarship: &Scholarship,
    ) -> Result<String, LlmError> {
        let request = CompletionRequest::new(sop_prompt(profile, scholarship))
            .with_system("You write professional statements of purpose for scholarship applications.")
            .with_max_tokens(1200);
        self.model.complete(&request).await
    }

    /// Parse one document's text into a draft.
    pub async fn parse_text(
        &self,
        kind: DocumentType,
        text: &str,
    ) -> Result<ProfileDraft, DocumentParseError> {
        let reply = self.model.complete(&document_request(kind, text)).await?;
        let object = extract_json_object(&reply)?;
        Ok(draft_from_reply(&object))
    }

    pub async fn parse_upload(
        &self,
        kind: DocumentType,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<ProfileDraft, DocumentParseError> {
        let format = match DocumentFormat::detect(file_name, &bytes) {
            Some(DocumentFormat::Pdf) => DocumentFormat::Pdf,
            Some(DocumentFormat::Text | DocumentFormat::Csv) => DocumentFormat::Text,
            None => {
                return Err(ExtractionError::Unsupported {
                    file_name: file_name.to_string(),
                }
                .into())
            }
        };
        let text = tokio::task::spawn_blocking(move || extract_text(format, &bytes))
            .await
            .map_err(|err| DocumentParseError::Worker(err.to_string()))??;
        self.parse_text(kind, &text).await
    }

    /// Parse several uploads and merge them by document priority.
    pub async fn parse_uploads(
        &self,
        uploads: Vec<(DocumentType, String, Vec<u8>)>,
    ) -> DocumentParseOutcome {
        let mut documents = Vec::with_capacity(uploads.len());
        let mut drafts = Vec::new();
        for (kind, file_name, bytes) in uploads {
            match self.parse_upload(kind, &file_name, bytes).await {
                Ok(draft) => {
                    drafts.push((kind, draft.clone()));
                    documents.push(ParsedDocument {
                        kind,
                        file_name,
                        draft: Some(draft),
                        warning: None,
                    });
                }
                Err(err) => {
                    warn!(kind = kind.label(), file = %file_name, error = %err, "document parse failed");
                    documents.push(ParsedDocument {
                        kind,
                        file_name,
                        draft: None,
                        warning: Some(format!("could not read this document: {err}")),
                    });
                }
            }
        }
        DocumentParseOutcome {
            draft: merge_drafts(drafts),
            documents,
        }
    }
}

fn or_unknown<T: ToString>(value: Option<T>) -> String {
    value
        .map(|value| value.to_string())
        .unwrap_or_else(|| "not provided".to_string())
}

fn profile_block(profile: &StudentProfile) -> String {
    let mut block = String::new();
    let _ = writeln!(block, "CGPA: {}", or_unknown(profile.cgpa));
    let _ = writeln!(block, "Annual family income: {}", or_unknown(profile.income));
    let _ = writeln!(block, "Category: {}", or_unknown(profile.category.map(|c| c.label())));
    let _ = writeln!(block, "Course: {}", or_unknown(profile.course.as_deref()));
    let _ = writeln!(block, "Education level: {}", profile.education_level.label());
    let _ = writeln!(block, "Year of study: {}", or_unknown(profile.year_of_study));
    let _ = writeln!(block, "State: {}", or_unknown(profile.state.as_deref()));
    block
}

fn scholarship_block(scholarship: &Scholarship) -> String {
    let mut block = String::new();
    let _ = writeln!(block, "Title: {}", scholarship.title);
    let _ = writeln!(block, "Provider: {}", scholarship.provider);
    let _ = writeln!(block, "Amount: {}", or_unknown(scholarship.amount));
    let _ = writeln!(block, "Minimum CGPA: {}", or_unknown(scholarship.min_cgpa));
    let _ = writeln!(block, "Maximum income: {}", or_unknown(scholarship.max_income));
    let _ = writeln!(
        block,
        "Category restriction: {}",
        or_unknown(scholarship.category_restriction.as_deref())
    );
    let _ = writeln!(
        block,
        "Course restriction: {}",
        or_unknown(scholarship.course_restriction.as_deref())
    );
    let _ = writeln!(
        block,
        "Year restriction: {}",
        or_unknown(scholarship.year_restriction.as_deref())
    );
    let _ = writeln!(block, "Deadline: {}", or_unknown(scholarship.deadline));
    block
}

fn explanation_prompt(
    profile: &StudentProfile,
    scholarship: &Scholarship,
    report: &EligibilityReport,
) -> String {
    let mut checks = String::new();
    for check in &report.checks {
        let verdict = match check.outcome {
            CheckOutcome::Satisfied => "met",
            CheckOutcome::Unsatisfied => "NOT met",
            CheckOutcome::Unrestricted => "no restriction",
            CheckOutcome::Unknown => "cannot tell",
        };
        let _ = writeln!(checks, "- {:?}: {verdict} ({})", check.criterion, check.note);
    }
    let verdict = if report.eligible {
        "ELIGIBLE"
    } else {
        "NOT ELIGIBLE"
    };

    format!(
        "Student profile:\n{}\nScholarship:\n{}\nAutomated checks (verdict: {verdict}):\n{checks}\n\
Explain to the student in under 150 words whether they qualify and why. Keep to the checks \
above; where a check says \"cannot tell\", name the profile detail they should add.",
        profile_block(profile),
        scholarship_block(scholarship),
    )
}

fn sop_prompt(profile: &StudentProfile, scholarship: &Scholarship) -> String {
    format!(
        "Write a professional statement of purpose of about {SOP_WORDS} words for the scholarship below.\n\n\
Student:\n{}Name: {}\nUniversity: {}\n\nApplying for:\n{}Description: {}\n\n\
Focus on academic merit and financial need. Do not invent achievements that are not listed.",
        profile_block(profile),
        or_unknown(profile.name.as_deref()),
        or_unknown(profile.university.as_deref()),
        scholarship_block(scholarship),
        or_unknown(scholarship.description.as_deref()),
    )
}
