//! CLI entry point for the resume store.
//!
//! # Responsibility
//! - Load a nested resume payload from a JSON file and persist it.
//! - Print the reconstructed aggregate so the round trip can be inspected.
//!
//! Usage: `resume_cli <payload.json> [owner-email]`
//!
//! Store and logging settings come from `RESUME_*` environment variables.

use log::error;
use resume_core::{init_from_config, ConnectionPool, CoreConfig, NewResume, ResumeService};
use std::error::Error;
use std::process::ExitCode;

const DEFAULT_OWNER_EMAIL: &str = "cli-owner@example.com";

#[tokio::main]
async fn main() -> ExitCode {
    let mut args = std::env::args().skip(1);
    let Some(payload_path) = args.next() else {
        eprintln!("usage: resume_cli <payload.json> [owner-email]");
        return ExitCode::from(2);
    };
    let owner_email = args
        .next()
        .unwrap_or_else(|| DEFAULT_OWNER_EMAIL.to_string());

    match run(&payload_path, &owner_email).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_run module=cli status=error error={}", err);
            eprintln!("resume_cli: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(payload_path: &str, owner_email: &str) -> Result<(), Box<dyn Error>> {
    let config = CoreConfig::from_env()?;
    init_from_config(&config)?;

    let text = std::fs::read_to_string(payload_path)?;
    let payload: NewResume = serde_json::from_str(&text)?;

    let service = ResumeService::new(ConnectionPool::open(&config)?);
    let owner_id = service.find_or_register_user(owner_email).await?;
    let resume_id = service.create_aggregate(owner_id, payload).await?;
    let aggregate = service.get_aggregate_by_id(resume_id).await?;

    println!("resume_core version={}", resume_core::core_version());
    println!("{}", serde_json::to_string_pretty(&aggregate)?);
    Ok(())
}
