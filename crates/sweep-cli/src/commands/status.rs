use anyhow::Context;
use std::path::Path;
use std::process::ExitCode;
use sweep_core::CandidateRange;
use sweep_db::Database;
use sweep_pipeline::{Next, Sequencer};

/// Print the resume point, stored counts and recent checkpoints.
pub async fn execute(config_path: Option<&Path>, history: u32) -> anyhow::Result<ExitCode> {
    let config = super::load_config(config_path)?;
    let range = CandidateRange::from_config(&config.range)?;

    let db_path = config.database_path()?;
    if !db_path.exists() {
        println!("database:     {} (not created yet)", db_path.display());
        return Ok(ExitCode::SUCCESS);
    }

    let db = Database::open_existing(&db_path)
        .await
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;
    if !db.is_initialized().await? {
        println!(
            "database:     {} (schema version {}, run `permit-sweep run` to initialize)",
            db_path.display(),
            db.schema_version().await?
        );
        db.close().await;
        return Ok(ExitCode::SUCCESS);
    }

    let last = db.last_checkpoint().await?;
    let resume = match &last {
        Some(id) => Some(range.parse(id).context("stored checkpoint does not match range")?),
        None => None,
    };
    let next = match Sequencer::new(range.clone()).next(resume.as_ref()) {
        Next::Candidate(candidate) => candidate.to_string(),
        Next::Done => "none (range exhausted)".to_string(),
    };

    println!("database:     {}", db_path.display());
    println!("schema:       v{}", db.schema_version().await?);
    println!(
        "range:        {}..{}",
        range.render(range.start()),
        range.render(range.end())
    );
    println!("last checked: {}", last.as_deref().unwrap_or("none"));
    println!("next:         {next}");
    println!("records:      {}", db.count_records().await?);
    println!("checkpoints:  {}", db.count_checkpoints().await?);

    let recent = db.list_checkpoints(history).await?;
    if !recent.is_empty() {
        println!("recent:");
        for checkpoint in recent {
            println!("  {}  {}", checkpoint.checked_at, checkpoint.candidate_id);
        }
    }

    db.close().await;
    Ok(ExitCode::SUCCESS)
}
