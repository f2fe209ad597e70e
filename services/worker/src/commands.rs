use std::path::PathBuf;

use chrono::Utc;
use clap::Args;
use loan_insight::config::AppConfig;
use loan_insight::error::AppError;
use loan_insight::telemetry;
use loan_insight::workflows::document_analysis::{
    parse_fields, parse_fields_at, validate, AnalysisOrchestrator, Document, DocumentId,
    InMemoryResultStore, ParsedFieldSet, ResultStore, UserId, ValidationReport,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::infra::{build_orchestrator, store_upload};

#[derive(Args, Debug)]
pub(crate) struct ParseArgs {
    /// Plain-text application to parse
    #[arg(long)]
    pub(crate) text_file: PathBuf,
    /// Year used to turn a date of birth into an age (defaults to the current year)
    #[arg(long)]
    pub(crate) reference_year: Option<i32>,
}

#[derive(Args, Debug)]
pub(crate) struct AnalyzeArgs {
    /// PDF credit application to ingest
    #[arg(long)]
    pub(crate) pdf: PathBuf,
    /// Owner of the uploaded document
    #[arg(long)]
    pub(crate) user_id: String,
}

#[derive(Serialize)]
struct ParseOutput {
    fields: ParsedFieldSet,
    validation: ValidationReport,
}

#[derive(Serialize)]
struct RerunOutput {
    document_id: DocumentId,
    status: String,
    analyses: usize,
    pages: usize,
    first_analysis: Option<String>,
    current_analysis: String,
}

fn init(config: &AppConfig) -> Result<(), AppError> {
    telemetry::init(&config.telemetry, config.environment)?;
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) async fn run_parse(args: ParseArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    init(&config)?;

    let text = tokio::fs::read_to_string(&args.text_file).await?;
    let mut fields = match args.reference_year {
        Some(year) => parse_fields_at(&text, year),
        None => parse_fields(&text),
    };
    let validation = validate(&fields);
    fields.validation_errors = validation.errors.clone();

    print_json(&ParseOutput { fields, validation })
}

async fn ingest(
    config: &AppConfig,
    orchestrator: &AnalysisOrchestrator<InMemoryResultStore>,
    args: &AnalyzeArgs,
) -> Result<Document, AppError> {
    let bytes = tokio::fs::read(&args.pdf).await?;
    let filename = args
        .pdf
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document.pdf".to_string());

    let document_id = DocumentId(format!("doc-{}", Utc::now().format("%Y%m%d%H%M%S%3f")));
    let document = Document::ingest(document_id, UserId(args.user_id.clone()), &filename, &bytes);
    let path = store_upload(config, &document, &bytes).await?;
    info!(
        document_id = %document.id,
        path = %path.display(),
        "document uploaded"
    );

    Ok(orchestrator.ingest(document)?)
}

pub(crate) async fn run_analyze(args: AnalyzeArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    init(&config)?;

    let orchestrator = build_orchestrator(&config)?;
    let document = ingest(&config, &orchestrator, &args).await?;
    let record = orchestrator.run(&document.id).await?;

    print_json(&record)
}

pub(crate) async fn run_rerun_demo(args: AnalyzeArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    init(&config)?;

    let orchestrator = build_orchestrator(&config)?;
    let document = ingest(&config, &orchestrator, &args).await?;

    let first_analysis = match orchestrator.run(&document.id).await {
        Ok(record) => Some(record.id.0),
        Err(err) => {
            warn!(document_id = %document.id, error = %err, "first run failed; rerunning");
            None
        }
    };
    let current = orchestrator.rerun(&document.id).await?;

    let store = orchestrator.store();
    let status = store
        .fetch_document(&document.id)?
        .map(|document| document.status.label().to_string())
        .unwrap_or_else(|| "missing".to_string());

    print_json(&RerunOutput {
        document_id: document.id.clone(),
        status,
        analyses: store.analyses_for(&document.id)?.len(),
        pages: store.page_texts(&document.id)?.len(),
        first_analysis,
        current_analysis: current.id.0,
    })
}
