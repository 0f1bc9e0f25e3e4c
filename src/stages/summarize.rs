//! Summarization stage: one layperson summary per article, oldest articles first.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::{error, info};

use super::common::StageReport;
use crate::config::SummarizeConfig;
use crate::db::{Article, Database};
use crate::error::StageError;
use crate::orchestrator::Summarizer;
use crate::TARGET_STAGE;

/// Summarizes every article that has no summary yet.
///
/// A failure for one article is logged against its PMID and the run moves on.
/// If a batch of articles cannot be loaded, every article not yet reached is
/// recorded as failed (keyed by row id) and the run stops with its tally.
pub async fn run_summarize(
    db: &Database,
    summarizer: &dyn Summarizer,
    config: &SummarizeConfig,
) -> Result<StageReport, StageError> {
    let pending = db.pending_summary_article_ids().await?;
    let total = pending.len();
    let mut report = StageReport::new("summarize", total);

    if total == 0 {
        info!(target: TARGET_STAGE, "No articles found requiring summarization");
        return Ok(report);
    }
    info!(target: TARGET_STAGE, "Found {} articles to summarize", total);

    let progress = progress_bar(total, "Generating summaries");
    let batch_size = config.batch_size.max(1);
    let mut position = 0;

    for (batch, chunk) in pending.chunks(batch_size).enumerate() {
        let articles = match db.get_articles_by_ids(chunk).await {
            Ok(articles) => articles,
            Err(err) => {
                let unreached = &pending[batch * batch_size..];
                error!(
                    target: TARGET_STAGE,
                    "Failed to load articles, stopping with {} unprocessed: {}",
                    unreached.len(),
                    err
                );
                for id in unreached {
                    report.record_failure(id.to_string(), &err);
                }
                break;
            }
        };

        for article in articles {
            position += 1;
            info!(target: TARGET_STAGE, "[{}/{}] Summarizing PMID={}", position, total, article.external_id);

            match summarize_article(db, summarizer, &article).await {
                Ok(()) => {
                    info!(target: TARGET_STAGE, "Saved summary for PMID={}", article.external_id);
                    report.record_success();
                }
                Err(err) => {
                    error!(target: TARGET_STAGE, "Error summarizing PMID={}: {}", article.external_id, err);
                    report.record_failure(&article.external_id, err);
                }
            }
            progress.inc(1);
        }
    }

    progress.finish_and_clear();
    info!(target: TARGET_STAGE, "Completed summarization. Success: {}/{}", report.succeeded, total);
    Ok(report)
}

/// Bar on stderr; draws nothing when stderr is not a terminal.
fn progress_bar(total: usize, message: &'static str) -> ProgressBar {
    let bar = ProgressBar::with_draw_target(Some(total as u64), ProgressDrawTarget::stderr());
    bar.set_style(
        ProgressStyle::with_template("{msg} {wide_bar:.cyan/blue} {pos}/{len} [{elapsed_precise}<{eta}]")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.set_message(message);
    bar
}

async fn summarize_article(
    db: &Database,
    summarizer: &dyn Summarizer,
    article: &Article,
) -> Result<(), StageError> {
    let text = summarizer.summarize(&article.abstract_text).await?;
    db.create_summary(article.id, &text).await?;
    Ok(())
}
