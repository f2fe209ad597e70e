mod cli;
mod commands;
mod infra;

use loan_insight::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
