use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

use pubtrends::config::LlmConfig;
use pubtrends::fact_check::{FactCheck, FactChecker};
use pubtrends::llm::LlmModel;
use pubtrends::logging::configure_logging;

/// Runs the fact-check engine once and prints the score and issues.
#[derive(Parser)]
#[clap(name = "fact_check", about = "Fact-check a candidate text against a source text")]
struct Args {
    /// File holding the generated text to check
    #[clap(long)]
    candidate: PathBuf,

    /// File holding the grounding text
    #[clap(long)]
    source: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    configure_logging();
    let args = Args::parse();

    match check(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("Fact-check failed: {:#}", err);
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

async fn check(args: &Args) -> Result<()> {
    let candidate = fs::read_to_string(&args.candidate)
        .with_context(|| format!("Failed to read {}", args.candidate.display()))?;
    let source = fs::read_to_string(&args.source)
        .with_context(|| format!("Failed to read {}", args.source.display()))?;

    let llm = LlmConfig::from_env();
    info!("Fact-checking with model {} ({:?})", llm.model, llm.backend);
    let checker = FactChecker::new(Arc::new(LlmModel::new(llm.build_fact_check_params()?)));

    let result = checker.score(&candidate, &source).await?;

    println!("Hallucination score: {}", result.score);
    if result.issues.is_empty() {
        println!("No unsupported claims found");
    } else {
        println!("Unsupported claims:");
        for (index, issue) in result.issues.iter().enumerate() {
            println!("  {}. {}", index + 1, issue);
        }
    }
    Ok(())
}
