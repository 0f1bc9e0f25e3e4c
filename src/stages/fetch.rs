//! Fetch stage: pull one calendar month of abstracts at a time and upsert them.

use chrono::NaiveDate;
use tracing::{error, info, warn};

use super::common::StageReport;
use crate::config::FetchConfig;
use crate::db::{Database, UpsertOutcome};
use crate::error::StageError;
use crate::pubmed::SourceAdapter;
use crate::TARGET_STAGE;

/// An inclusive date range covering one calendar month.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Period {
    /// `YYYY-MM`
    pub fn label(&self) -> String {
        self.start.format("%Y-%m").to_string()
    }
}

/// Up to `count` consecutive months of `year` starting at `start_month`.
/// Never runs past December.
pub fn plan_periods(year: i32, start_month: u32, count: u32) -> Vec<Period> {
    (start_month.max(1)..=12)
        .take(count as usize)
        .filter_map(|month| month_period(year, month))
        .collect()
}

fn month_period(year: i32, month: u32) -> Option<Period> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some(Period {
        start,
        end: next_month.pred_opt()?,
    })
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FetchReport {
    /// One entry per planned month.
    pub periods: StageReport,
    pub created: usize,
    pub updated: usize,
    /// Records dropped because they carried no PMID.
    pub skipped: usize,
}

impl FetchReport {
    pub fn is_success(&self) -> bool {
        self.periods.is_success()
    }
}

#[derive(Default)]
struct PeriodOutcome {
    created: usize,
    updated: usize,
    skipped: usize,
}

/// Fetches every planned month. A month that fails is logged and skipped;
/// months already stored stay stored.
pub async fn run_fetch(
    db: &Database,
    source: &dyn SourceAdapter,
    config: &FetchConfig,
) -> FetchReport {
    let periods = plan_periods(config.year, config.start_month, config.periods);
    let mut report = FetchReport {
        periods: StageReport::new("fetch", periods.len()),
        ..FetchReport::default()
    };

    for period in &periods {
        info!(target: TARGET_STAGE, "Fetching {} abstracts for {}", config.per_period, period.label());

        match fetch_period(db, source, config, period).await {
            Ok(outcome) => {
                report.created += outcome.created;
                report.updated += outcome.updated;
                report.skipped += outcome.skipped;
                report.periods.record_success();
            }
            Err(err) => {
                error!(target: TARGET_STAGE, "Error processing month {}: {}", period.label(), err);
                report.periods.record_failure(period.label(), err);
            }
        }
    }

    info!(
        target: TARGET_STAGE,
        "Fetch complete: {} ({} created, {} updated)",
        report.periods, report.created, report.updated
    );
    report
}

async fn fetch_period(
    db: &Database,
    source: &dyn SourceAdapter,
    config: &FetchConfig,
    period: &Period,
) -> Result<PeriodOutcome, StageError> {
    let records = source
        .fetch(&config.query, period.start, period.end, config.per_period)
        .await?;

    let (keyed, unkeyed): (Vec<_>, Vec<_>) = records
        .into_iter()
        .partition(|record| !record.external_id.is_empty());
    for record in &unkeyed {
        warn!(target: TARGET_STAGE, "Skipping record without PMID (title: {:?})", record.title);
    }

    let mut outcome = PeriodOutcome {
        skipped: unkeyed.len(),
        ..PeriodOutcome::default()
    };
    for (external_id, upsert) in db.upsert_articles(&keyed).await? {
        info!(target: TARGET_STAGE, "  {} Article PMID={}", upsert.verb(), external_id);
        match upsert {
            UpsertOutcome::Created => outcome.created += 1,
            UpsertOutcome::Updated => outcome.updated += 1,
        }
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{record, StubSource};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn config(periods: u32) -> FetchConfig {
        FetchConfig {
            periods,
            per_period: 5,
            ..FetchConfig::default()
        }
    }

    #[test]
    fn test_plan_periods_uses_exact_month_ends() {
        let periods = plan_periods(2020, 1, 12);
        assert_eq!(periods.len(), 12);
        assert_eq!(periods[0], Period { start: ymd(2020, 1, 1), end: ymd(2020, 1, 31) });
        assert_eq!(periods[1].end, ymd(2020, 2, 29));
        assert_eq!(periods[3].end, ymd(2020, 4, 30));
        assert_eq!(periods[11].end, ymd(2020, 12, 31));
        assert_eq!(periods[1].label(), "2020-02");

        assert_eq!(plan_periods(2021, 2, 1)[0].end, ymd(2021, 2, 28));
    }

    #[test]
    fn test_plan_periods_stops_at_december() {
        let periods = plan_periods(2020, 11, 5);
        assert_eq!(periods.len(), 2);
        assert_eq!(periods[1].label(), "2020-12");
        assert!(plan_periods(2020, 1, 0).is_empty());
    }

    #[tokio::test]
    async fn test_fetch_upserts_and_counts_created_and_updated() {
        let db = Database::in_memory().await.unwrap();
        let source = StubSource::new()
            .with_period(ymd(2020, 1, 1), vec![record("1", "A", "a", Some((2020, 1, 3)))])
            .with_period(
                ymd(2020, 2, 1),
                vec![
                    record("1", "A revised", "a2", Some((2020, 1, 3))),
                    record("2", "B", "b", Some((2020, 2, 9))),
                    record("", "No id", "x", None),
                ],
            );

        let report = run_fetch(&db, &source, &config(2)).await;

        assert!(report.is_success());
        assert_eq!(report.created, 2);
        assert_eq!(report.updated, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(db.count_articles().await.unwrap(), 2);

        let calls = source.calls();
        assert_eq!(calls[0], (ymd(2020, 1, 1), ymd(2020, 1, 31), 5));
        assert_eq!(calls[1], (ymd(2020, 2, 1), ymd(2020, 2, 29), 5));
    }

    #[tokio::test]
    async fn test_failed_month_does_not_stop_later_months() {
        let db = Database::in_memory().await.unwrap();
        let source = StubSource::new()
            .failing_period(ymd(2020, 1, 1))
            .with_period(ymd(2020, 2, 1), vec![record("2", "B", "b", Some((2020, 2, 9)))]);

        let report = run_fetch(&db, &source, &config(3)).await;

        assert!(!report.is_success());
        assert_eq!(report.periods.total, 3);
        assert_eq!(report.periods.succeeded, 2);
        assert_eq!(report.periods.failures[0].key, "2020-01");
        assert_eq!(db.count_articles().await.unwrap(), 1);
    }
}
