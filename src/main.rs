use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

use pubtrends::config::PipelineConfig;
use pubtrends::db::Database;
use pubtrends::fact_check::FactChecker;
use pubtrends::inspect::{listing_table, status_table, Listing};
use pubtrends::llm::LlmModel;
use pubtrends::logging::configure_logging;
use pubtrends::orchestrator::LlmOrchestrator;
use pubtrends::pubmed::PubMedClient;
use pubtrends::stages::{
    run_fetch, run_summarize, run_synthesize, run_validate, StageReport, SynthesisOutcome,
};

#[derive(Parser)]
#[clap(
    name = "pubtrends",
    version,
    about = "Fetch, summarize, fact-check and synthesize PubMed abstracts"
)]
struct Cli {
    /// SQLite database file (overrides DATABASE_PATH)
    #[clap(long, global = true)]
    database: Option<String>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch abstracts month by month and upsert them
    Fetch {
        /// Abstracts to request per month
        #[clap(long)]
        per_period: Option<u32>,

        /// Number of months to fetch
        #[clap(long)]
        periods: Option<u32>,

        /// First month to fetch (1-12)
        #[clap(long)]
        start_month: Option<u32>,

        /// Publication year
        #[clap(long)]
        year: Option<i32>,

        /// PubMed search term
        #[clap(long)]
        query: Option<String>,
    },

    /// Generate layperson summaries for every unsummarized article
    Summarize {
        /// Articles loaded from the database at a time
        #[clap(long)]
        batch_size: Option<usize>,
    },

    /// Fact-check every unvalidated summary against its abstract
    Validate {
        /// Scores above this are reported as warnings
        #[clap(long)]
        threshold: Option<f64>,
    },

    /// Write and fact-check a trend report over all summaries
    Synthesize {
        /// Minimum number of summaries required
        #[clap(long)]
        min_summaries: Option<usize>,

        /// Scores above this are flagged in the output
        #[clap(long)]
        max_score: Option<f64>,
    },

    /// Show stored and pending counts for every stage
    Status,

    /// List stored rows
    List {
        #[clap(value_enum)]
        what: Listing,

        /// Number of rows to show
        #[clap(short, long, default_value = "10")]
        limit: i64,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    configure_logging();

    let cli = Cli::parse();
    let mut config = PipelineConfig::from_env();
    apply_overrides(&mut config, &cli);

    match run(cli.command, &config).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            error!("{:#}", err);
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

/// Command-line flags win over the environment.
fn apply_overrides(config: &mut PipelineConfig, cli: &Cli) {
    if let Some(database) = &cli.database {
        config.database_path = database.clone();
    }

    match &cli.command {
        Commands::Fetch {
            per_period,
            periods,
            start_month,
            year,
            query,
        } => {
            let fetch = &mut config.fetch;
            fetch.per_period = per_period.unwrap_or(fetch.per_period);
            fetch.periods = periods.unwrap_or(fetch.periods);
            fetch.start_month = start_month.unwrap_or(fetch.start_month);
            fetch.year = year.unwrap_or(fetch.year);
            if let Some(query) = query {
                fetch.query = query.clone();
            }
        }
        Commands::Summarize { batch_size } => {
            config.summarize.batch_size = batch_size.unwrap_or(config.summarize.batch_size);
        }
        Commands::Validate { threshold } => {
            config.validate.warn_threshold = threshold.unwrap_or(config.validate.warn_threshold);
        }
        Commands::Synthesize {
            min_summaries,
            max_score,
        } => {
            let synthesize = &mut config.synthesize;
            synthesize.min_summaries = min_summaries.unwrap_or(synthesize.min_summaries);
            synthesize.max_score = max_score.unwrap_or(synthesize.max_score);
        }
        Commands::Status | Commands::List { .. } => {}
    }
}

/// Runs one command. `Ok(false)` means the command finished but some items failed.
async fn run(command: Commands, config: &PipelineConfig) -> Result<bool> {
    let db = Database::new(&config.database_path)
        .await
        .with_context(|| format!("Failed to open database {}", config.database_path))?;

    match command {
        Commands::Fetch { .. } => {
            let client = PubMedClient::new(&config.fetch.base_url, config.fetch.retry_policy())?;
            let report = run_fetch(&db, &client, &config.fetch).await;
            println!(
                "Fetch complete: {}/{} months, {} created, {} updated",
                report.periods.succeeded, report.periods.total, report.created, report.updated
            );
            print_failures(&report.periods);
            Ok(report.is_success())
        }
        Commands::Summarize { .. } => {
            let params = config.llm.build_params()?;
            let summarizer = LlmOrchestrator::new(Arc::new(LlmModel::new(params)));
            let report = run_summarize(&db, &summarizer, &config.summarize).await?;
            println!(
                "Generated {} summaries out of {}",
                report.succeeded, report.total
            );
            print_failures(&report);
            Ok(report.is_success())
        }
        Commands::Validate { .. } => {
            let params = config.llm.build_fact_check_params()?;
            let checker = FactChecker::new(Arc::new(LlmModel::new(params)));
            let report = run_validate(&db, &checker, &config.validate).await?;
            for warning in &report.warnings {
                println!("  Warning: {}", warning);
            }
            println!(
                "Validation complete: {}/{} summaries processed",
                report.succeeded, report.total
            );
            print_failures(&report);
            Ok(report.is_success())
        }
        Commands::Synthesize { .. } => {
            let summarizer =
                LlmOrchestrator::new(Arc::new(LlmModel::new(config.llm.build_params()?)));
            let checker =
                FactChecker::new(Arc::new(LlmModel::new(config.llm.build_fact_check_params()?)));

            match run_synthesize(&db, &summarizer, &checker, &config.synthesize).await? {
                SynthesisOutcome::Created { report, flagged } => {
                    if flagged {
                        println!(
                            "  Warning: hallucination score {:.2} exceeds {:.2}; {} issue(s) flagged",
                            report.hallucination_score,
                            config.synthesize.max_score,
                            report.issues.len()
                        );
                    }
                    println!(
                        "TrendReport #{} saved (hallucination score: {:.2})",
                        report.id, report.hallucination_score
                    );
                }
                SynthesisOutcome::InsufficientSummaries { found, required } => {
                    println!("Insufficient summaries: found {}, need {}", found, required);
                }
            }
            Ok(true)
        }
        Commands::Status => {
            let counts = db.pipeline_counts().await?;
            status_table(&counts).printstd();
            Ok(true)
        }
        Commands::List { what, limit } => {
            let table = listing_table(&db, what, limit).await?;
            info!("Listing up to {} {:?}", limit, what);
            table.printstd();
            Ok(true)
        }
    }
}

fn print_failures(report: &StageReport) {
    for failure in &report.failures {
        println!("  Failed {}: {}", failure.key, failure.reason);
    }
}
