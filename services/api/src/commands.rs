use crate::infra::{load_catalog_file, portal_settings, seed_catalog};
use chrono::{Local, NaiveDate, Utc};
use clap::Args;
use scholar_match::config::AppConfig;
use scholar_match::error::AppError;
use scholar_match::ingest::{IngestMode, IngestReport};
use scholar_match::llm::ChatCompletionsClient;
use scholar_match::portal::{
    CatalogService, CheckOutcome, EligibilityEngine, EligibilityReport, InMemoryStore, Portal,
    ProfileService, ProfileUpdate, Repositories, Scholarship, UserId,
};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct IngestArgs {
    /// PDF, text or CSV file containing scholarship listings
    #[arg(long)]
    pub(crate) file: PathBuf,
    /// Validate and print the entries without inserting them
    #[arg(long)]
    pub(crate) dry_run: bool,
}

#[derive(Args, Debug)]
pub(crate) struct MatchArgs {
    /// JSON object with profile fields (cgpa, income, course, category, ...)
    #[arg(long)]
    pub(crate) profile: PathBuf,
    /// Catalog as a JSON listing array or a CSV sheet
    #[arg(long)]
    pub(crate) catalog: PathBuf,
    /// Evaluation date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Also list the listings the profile does not qualify for
    #[arg(long)]
    pub(crate) show_all: bool,
}

pub(crate) async fn run_ingest(config: &AppConfig, args: IngestArgs) -> Result<(), AppError> {
    let bytes = fs::read(&args.file)?;
    let file_name = args
        .file
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("upload")
        .to_string();

    let model = Arc::new(ChatCompletionsClient::new(&config.llm)?);
    let portal = Portal::new(
        Repositories::in_memory(InMemoryStore::new()),
        model,
        portal_settings(config),
    );
    let mode = if args.dry_run {
        IngestMode::DryRun
    } else {
        IngestMode::Commit
    };

    let report = portal
        .ingest
        .ingest_document(&file_name, bytes, mode, Utc::now())
        .await?;
    let listings = match mode {
        IngestMode::DryRun => serde_json::to_string_pretty(&report.accepted),
        IngestMode::Commit => serde_json::to_string_pretty(&portal.catalog.all()?),
    }
    .map_err(|err| AppError::Input(err.to_string()))?;

    render_ingest_report(&report);
    println!("\nListings\n{listings}");
    Ok(())
}

fn render_ingest_report(report: &IngestReport) {
    println!("Ingestion report for {}", report.source);
    println!("  Mode: {:?}", report.mode);
    println!("  Extracted entries: {}", report.extracted);
    match report.mode {
        IngestMode::DryRun => println!("  Valid entries: {}", report.accepted.len()),
        IngestMode::Commit => println!("  Inserted: {}", report.inserted),
    }
    println!("  Skipped: {}", report.skipped);
    for skipped in &report.errors {
        println!(
            "    #{} {}: {}",
            skipped.index + 1,
            skipped.title.as_deref().unwrap_or("(untitled)"),
            skipped.reason
        );
    }
}

pub(crate) fn run_match(args: MatchArgs) -> Result<(), AppError> {
    let MatchArgs {
        profile,
        catalog,
        today,
        show_all,
    } = args;
    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let now = Utc::now();

    let update: ProfileUpdate = serde_json::from_slice(&fs::read(&profile)?).map_err(|err| {
        AppError::Input(format!("{} is not a profile object: {err}", profile.display()))
    })?;

    let store = Arc::new(InMemoryStore::new());
    let profiles = ProfileService::new(store.clone());
    let student = profiles.upsert(&UserId("cli".to_string()), None, update, now)?;

    let listings = CatalogService::new(store);
    seed_catalog(&listings, load_catalog_file(&catalog)?, now)?;
    let scholarships = listings.all()?;

    let engine = EligibilityEngine::default();
    let ranked = engine.rank(Some(&student), scholarships.clone(), today);

    println!(
        "Eligible for {} of {} listings on {}",
        ranked.len(),
        scholarships.len(),
        today
    );
    for (position, entry) in ranked.iter().enumerate() {
        println!("\n{}. {}", position + 1, describe(&entry.scholarship));
    }

    if show_all {
        println!("\nNot eligible");
        for scholarship in &scholarships {
            let report = engine.assess(&student, scholarship, today);
            if report.eligible {
                continue;
            }
            println!("\n- {}", describe(scholarship));
            render_reasons(&report);
        }
    }
    Ok(())
}

fn describe(scholarship: &Scholarship) -> String {
    let amount = scholarship
        .amount
        .map(|amount| format!("₹{amount:.0}"))
        .unwrap_or_else(|| "amount not stated".to_string());
    let deadline = scholarship
        .deadline
        .map(|deadline| format!("closes {deadline}"))
        .unwrap_or_else(|| "no deadline".to_string());
    format!(
        "{} ({}) | {amount} | {deadline}",
        scholarship.title, scholarship.provider
    )
}

fn render_reasons(report: &EligibilityReport) {
    for check in &report.checks {
        let marker = match check.outcome {
            CheckOutcome::Unsatisfied => "fails",
            CheckOutcome::Unknown => "unknown",
            CheckOutcome::Satisfied | CheckOutcome::Unrestricted => continue,
        };
        println!("    {marker}: {}", check.note);
    }
}
