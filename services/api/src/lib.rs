mod authorize;
mod cli;
mod infra;
mod routes;
mod server;

use careers_intake::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
