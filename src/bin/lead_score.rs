//! Score one candidate lead from the command line.
//!
//! # Usage
//!
//! ```bash
//! lead-score candidate.json job_description.txt
//! ```
//!
//! `candidate.json` holds `{"id": "...", "name": "...", "bio": "..."}`.
//!
//! # Environment Variables
//!
//! - `LEAD_SCORE_MODEL` — model name (default: `gpt-4o-mini`)
//! - `OPENAI_API_KEY` — API key for the model provider
//! - `OPENAI_BASE_URL` — OpenAI-compatible endpoint (default: public API)
//! - `LEAD_SCORE_INSTRUCTIONS` — additional instructions for the evaluator
//! - `LEAD_SCORE_AGENTS_CONFIG` / `LEAD_SCORE_TASKS_CONFIG` — YAML overrides
//! - `RUST_LOG` — log filter (default: `info,lead_score=debug`)

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use lead_score::{Candidate, LeadScoreCrew, OpenAICompletion};

const DEFAULT_MODEL: &str = "gpt-4o-mini";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,lead_score=debug".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let (candidate_path, job_path) = match (args.next(), args.next()) {
        (Some(c), Some(j)) => (PathBuf::from(c), PathBuf::from(j)),
        _ => bail!("usage: lead-score <candidate.json> <job_description.txt>"),
    };

    let candidate: Candidate = serde_json::from_str(
        &std::fs::read_to_string(&candidate_path)
            .with_context(|| format!("reading {}", candidate_path.display()))?,
    )
    .with_context(|| format!("parsing candidate from {}", candidate_path.display()))?;
    let job_description = std::fs::read_to_string(&job_path)
        .with_context(|| format!("reading {}", job_path.display()))?;
    let instructions = std::env::var("LEAD_SCORE_INSTRUCTIONS").unwrap_or_default();

    let project = match (
        std::env::var("LEAD_SCORE_AGENTS_CONFIG"),
        std::env::var("LEAD_SCORE_TASKS_CONFIG"),
    ) {
        (Ok(agents), Ok(tasks)) => LeadScoreCrew::from_paths(agents, tasks)?,
        _ => LeadScoreCrew::new()?,
    };

    let model = std::env::var("LEAD_SCORE_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
    let llm = Arc::new(OpenAICompletion::new(model.clone(), None, None).with_json_mode(true));
    let crew = project.crew(llm).context("building lead score crew")?;

    tracing::info!(candidate = %candidate.id, model = %model, "Scoring candidate");
    let score = LeadScoreCrew::score(&crew, &candidate, job_description.trim(), &instructions)
        .with_context(|| format!("scoring candidate {}", candidate.id))?;

    println!("{}", serde_json::to_string_pretty(&score)?);
    Ok(())
}
