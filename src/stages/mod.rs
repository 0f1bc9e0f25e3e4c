//! The four pipeline stages.
//!
//! Each stage selects only the work its downstream table does not cover yet,
//! so any stage can be re-run at any time.

mod common;
mod fetch;
mod summarize;
mod synthesize;
mod validate;

pub use self::common::{ItemFailure, StageReport};
pub use self::fetch::{plan_periods, run_fetch, FetchReport, Period};
pub use self::summarize::run_summarize;
pub use self::synthesize::{run_synthesize, SynthesisOutcome};
pub use self::validate::run_validate;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FetchConfig, SummarizeConfig, SynthesizeConfig, ValidateConfig};
    use crate::db::Database;
    use crate::testing::{record, StubFactChecker, StubSource, StubSummarizer};
    use chrono::NaiveDate;

    #[tokio::test]
    async fn test_pipeline_end_to_end_with_stubs() {
        let db = Database::in_memory().await.unwrap();
        let january = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let source = StubSource::new().with_period(
            january,
            vec![
                record("1", "One", "abstract one", Some((2020, 1, 1))),
                record("2", "Two", "abstract two", Some((2020, 1, 2))),
                record("3", "Three", "abstract three", Some((2020, 1, 3))),
            ],
        );
        let fetch_config = FetchConfig {
            periods: 1,
            ..FetchConfig::default()
        };

        let fetched = run_fetch(&db, &source, &fetch_config).await;
        assert_eq!(fetched.created, 3);

        let summarizer = StubSummarizer::new();
        let summarized = run_summarize(&db, &summarizer, &SummarizeConfig::default())
            .await
            .unwrap();
        assert_eq!((summarized.succeeded, summarized.total), (3, 3));

        let ordered = db.summaries_in_publication_order().await.unwrap();
        let ids: Vec<&str> = ordered.iter().map(|s| s.external_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert!(ordered
            .iter()
            .all(|s| s.summary_text == format!("Summary of '{}'", s.abstract_text)));

        let checker = StubFactChecker::returning(0.0, &[]);
        let validated = run_validate(&db, &checker, &ValidateConfig::default())
            .await
            .unwrap();
        assert_eq!((validated.succeeded, validated.total), (3, 3));

        let outcome = run_synthesize(&db, &summarizer, &checker, &SynthesizeConfig::default())
            .await
            .unwrap();
        assert!(matches!(outcome, SynthesisOutcome::Created { flagged: false, .. }));

        let counts = db.pipeline_counts().await.unwrap();
        assert_eq!(counts.articles, 3);
        assert_eq!(counts.summaries, 3);
        assert_eq!(counts.validations, 3);
        assert_eq!(counts.trend_reports, 1);
        assert_eq!(counts.pending_summaries + counts.pending_validations, 0);
    }
}
