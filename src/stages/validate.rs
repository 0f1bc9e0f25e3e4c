//! Validation stage: fact-check each unvalidated summary against its abstract.

use tracing::{error, info, warn};

use super::common::StageReport;
use crate::config::ValidateConfig;
use crate::db::{Database, SummaryWithSource};
use crate::error::StageError;
use crate::fact_check::{FactCheck, FactCheckResult};
use crate::TARGET_STAGE;

/// Validates every summary without a validation. The score never blocks the
/// write; a score above `warn_threshold` is only reported as a warning.
pub async fn run_validate(
    db: &Database,
    checker: &dyn FactCheck,
    config: &ValidateConfig,
) -> Result<StageReport, StageError> {
    let pending = db.pending_validation_summaries().await?;
    let mut report = StageReport::new("validate", pending.len());
    info!(target: TARGET_STAGE, "Validating {} summaries...", pending.len());

    for summary in &pending {
        info!(target: TARGET_STAGE, "Validating PMID={}", summary.external_id);

        match validate_summary(db, checker, summary).await {
            Ok(result) => {
                info!(target: TARGET_STAGE, "  Score={}, Issues={}", result.score, result.issues.len());
                if result.exceeds(config.warn_threshold) {
                    warn!(
                        target: TARGET_STAGE,
                        pmid = %summary.external_id,
                        score = result.score,
                        threshold = config.warn_threshold,
                        "Hallucination score above threshold"
                    );
                    report.record_warning(format!(
                        "PMID={} score {} above {}",
                        summary.external_id, result.score, config.warn_threshold
                    ));
                }
                report.record_success();
            }
            Err(err) => {
                error!(target: TARGET_STAGE, "Error validating PMID={}: {}", summary.external_id, err);
                report.record_failure(&summary.external_id, err);
            }
        }
    }

    info!(
        target: TARGET_STAGE,
        "Validation complete: {}/{} summaries processed",
        report.succeeded, report.total
    );
    Ok(report)
}

async fn validate_summary(
    db: &Database,
    checker: &dyn FactCheck,
    summary: &SummaryWithSource,
) -> Result<FactCheckResult, StageError> {
    let result = checker
        .score(&summary.summary_text, &summary.abstract_text)
        .await?;
    db.create_validation(summary.summary_id, &result).await?;
    Ok(result)
}
