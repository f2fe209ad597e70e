use crate::commands::{run_analyze, run_parse, run_rerun_demo, AnalyzeArgs, ParseArgs};
use clap::{Parser, Subcommand};
use loan_insight::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Loan Insight Worker",
    about = "Parse, score and persist credit-application documents from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a plain-text application and print the field set with validation results
    Parse(ParseArgs),
    /// Ingest a PDF, run the full analysis pipeline and print the stored record
    Analyze(AnalyzeArgs),
    /// Analyze a PDF, then rerun it to show that prior results are replaced
    RerunDemo(AnalyzeArgs),
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Parse(args) => run_parse(args).await,
        Command::Analyze(args) => run_analyze(args).await,
        Command::RerunDemo(args) => run_rerun_demo(args).await,
    }
}
