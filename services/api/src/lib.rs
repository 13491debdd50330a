mod cli;
mod commands;
mod infra;
mod routes;
mod server;

use scholar_match::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
