//! Synthesis stage: one trend report over every summary, fact-checked against them.

use tracing::{error, info, warn};

use crate::config::SynthesizeConfig;
use crate::db::{Database, TrendReport};
use crate::error::StageError;
use crate::fact_check::FactCheck;
use crate::orchestrator::Summarizer;
use crate::prompt::join_summaries;
use crate::TARGET_STAGE;

#[derive(Clone, Debug, PartialEq)]
pub enum SynthesisOutcome {
    /// A report was stored. `flagged` is set when its score exceeded the maximum.
    Created { report: TrendReport, flagged: bool },
    /// Too few summaries to write about; nothing was generated or stored.
    InsufficientSummaries { found: usize, required: usize },
}

/// Generates, fact-checks and stores a new trend report.
///
/// Any generation or fact-check error ends the run without storing anything.
pub async fn run_synthesize(
    db: &Database,
    summarizer: &dyn Summarizer,
    checker: &dyn FactCheck,
    config: &SynthesizeConfig,
) -> Result<SynthesisOutcome, StageError> {
    let summaries: Vec<String> = db
        .summaries_in_publication_order()
        .await?
        .into_iter()
        .map(|summary| summary.summary_text)
        .collect();

    if summaries.len() < config.min_summaries {
        warn!(
            target: TARGET_STAGE,
            "Insufficient summaries: found {}, need {}",
            summaries.len(),
            config.min_summaries
        );
        return Ok(SynthesisOutcome::InsufficientSummaries {
            found: summaries.len(),
            required: config.min_summaries,
        });
    }

    info!(target: TARGET_STAGE, "Generating trends article from {} summaries", summaries.len());
    let narrative = summarizer.synthesize_trends(&summaries).await.map_err(|e| {
        error!(target: TARGET_STAGE, "Trend generation failed: {}", e);
        e
    })?;

    info!(target: TARGET_STAGE, "Fact-checking article");
    let grounding = join_summaries(&summaries);
    let result = checker.score(&narrative, &grounding).await.map_err(|e| {
        error!(target: TARGET_STAGE, "Fact-checking the trends article failed: {}", e);
        e
    })?;
    info!(target: TARGET_STAGE, "Hallucination score for article: {}", result.score);

    let flagged = result.exceeds(config.max_score);
    if flagged {
        warn!(
            target: TARGET_STAGE,
            score = result.score,
            threshold = config.max_score,
            issues = result.issues.len(),
            "Trends article hallucination score above maximum; saving with flagged issues"
        );
    }

    let report = db.create_trend_report(&narrative, &result).await?;
    info!(
        target: TARGET_STAGE,
        "TrendReport #{} saved (hallucination score: {:.2})",
        report.id, report.hallucination_score
    );
    Ok(SynthesisOutcome::Created { report, flagged })
}
