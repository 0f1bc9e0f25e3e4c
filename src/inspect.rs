//! Read-only tables for looking at pipeline state from the terminal.

use chrono::Local;
use clap::ValueEnum;
use prettytable::{Cell, Row as PrettyRow, Table};

use crate::db::{Article, Database, PipelineCounts, SummaryWithSource, TrendReport, Validation};

pub const SNIPPET_CHARS: usize = 75;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Listing {
    Articles,
    Summaries,
    Validations,
    Reports,
}

/// First `max_chars` characters of `text` on one line, with an ellipsis if cut.
pub fn snippet(text: &str, max_chars: usize) -> String {
    let flattened = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flattened.chars().count() <= max_chars {
        return flattened;
    }
    let mut cut: String = flattened.chars().take(max_chars).collect();
    cut.push('…');
    cut
}

fn header(titles: &[&str]) -> PrettyRow {
    PrettyRow::new(titles.iter().map(|title| Cell::new(title)).collect())
}

pub fn status_table(counts: &PipelineCounts) -> Table {
    let mut table = Table::new();
    table.add_row(header(&["Collection", "Stored", "Pending"]));
    table.add_row(PrettyRow::new(vec![
        Cell::new("Articles"),
        Cell::new(&counts.articles.to_string()),
        Cell::new("-"),
    ]));
    table.add_row(PrettyRow::new(vec![
        Cell::new("Summaries"),
        Cell::new(&counts.summaries.to_string()),
        Cell::new(&counts.pending_summaries.to_string()),
    ]));
    table.add_row(PrettyRow::new(vec![
        Cell::new("Validations"),
        Cell::new(&counts.validations.to_string()),
        Cell::new(&counts.pending_validations.to_string()),
    ]));
    table.add_row(PrettyRow::new(vec![
        Cell::new("Trend reports"),
        Cell::new(&counts.trend_reports.to_string()),
        Cell::new("-"),
    ]));
    table
}

pub fn articles_table(articles: &[Article]) -> Table {
    let mut table = Table::new();
    table.add_row(header(&["ID", "PMID", "Published", "Title"]));
    for article in articles {
        table.add_row(PrettyRow::new(vec![
            Cell::new(&article.id.to_string()),
            Cell::new(&article.external_id),
            Cell::new(&format_pub_date(article.pub_date)),
            Cell::new(&snippet(&article.title, SNIPPET_CHARS)),
        ]));
    }
    table
}

pub fn summaries_table(summaries: &[SummaryWithSource]) -> Table {
    let mut table = Table::new();
    table.add_row(header(&["ID", "PMID", "Published", "Created", "Summary"]));
    for summary in summaries {
        table.add_row(PrettyRow::new(vec![
            Cell::new(&summary.summary_id.to_string()),
            Cell::new(&summary.external_id),
            Cell::new(&format_pub_date(summary.pub_date)),
            Cell::new(
                &summary
                    .created_at
                    .with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M")
                    .to_string(),
            ),
            Cell::new(&snippet(&summary.summary_text, SNIPPET_CHARS)),
        ]));
    }
    table
}

pub fn validations_table(validations: &[Validation]) -> Table {
    let mut table = Table::new();
    table.add_row(header(&["ID", "Summary", "Score", "Issues"]));
    for validation in validations {
        table.add_row(PrettyRow::new(vec![
            Cell::new(&validation.id.to_string()),
            Cell::new(&validation.summary_id.to_string()),
            Cell::new(&format!("{:.2}", validation.hallucination_score)),
            Cell::new(&snippet(&validation.issues.join("; "), SNIPPET_CHARS)),
        ]));
    }
    table
}

pub fn reports_table(reports: &[TrendReport]) -> Table {
    let mut table = Table::new();
    table.add_row(header(&["ID", "Generated", "Score", "Issues", "Report"]));
    for report in reports {
        table.add_row(PrettyRow::new(vec![
            Cell::new(&report.id.to_string()),
            Cell::new(
                &report
                    .generated_at
                    .with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M")
                    .to_string(),
            ),
            Cell::new(&format!("{:.2}", report.hallucination_score)),
            Cell::new(&report.issues.len().to_string()),
            Cell::new(&snippet(&report.text, SNIPPET_CHARS)),
        ]));
    }
    table
}

/// Loads up to `limit` rows of `listing` and lays them out as a table.
pub async fn listing_table(db: &Database, listing: Listing, limit: i64) -> Result<Table, sqlx::Error> {
    Ok(match listing {
        Listing::Articles => articles_table(&db.list_articles(limit).await?),
        Listing::Summaries => summaries_table(&db.list_summaries(limit).await?),
        Listing::Validations => validations_table(&db.list_validations(limit).await?),
        Listing::Reports => reports_table(&db.list_trend_reports(limit).await?),
    })
}

fn format_pub_date(date: Option<chrono::NaiveDate>) -> String {
    date.map(|d| d.to_string()).unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fact_check::FactCheckResult;
    use crate::testing::{record, seed_summaries};

    #[test]
    fn test_snippet_truncates_on_characters() {
        assert_eq!(snippet("short text", 75), "short text");
        assert_eq!(snippet("line one\n  line two", 75), "line one line two");

        let long = "é".repeat(80);
        let cut = snippet(&long, 75);
        assert_eq!(cut.chars().count(), 76);
        assert!(cut.ends_with('…'));
    }

    #[test]
    fn test_status_table_has_one_row_per_collection() {
        let counts = PipelineCounts {
            articles: 3,
            summaries: 2,
            pending_summaries: 1,
            ..PipelineCounts::default()
        };
        let table = status_table(&counts);
        assert_eq!(table.len(), 5);
        assert!(table.to_string().contains("Summaries"));
    }

    #[tokio::test]
    async fn test_listing_tables_include_stored_rows() {
        let db = Database::in_memory().await.unwrap();
        let summary_ids = seed_summaries(
            &db,
            &[
                record("1", "A title", "a", Some((2020, 1, 1))),
                record("2", "Another title", "b", None),
            ],
        )
        .await;
        db.create_validation(summary_ids[0], &FactCheckResult::default())
            .await
            .unwrap();

        let articles = listing_table(&db, Listing::Articles, 10).await.unwrap();
        assert_eq!(articles.len(), 3);
        assert!(articles.to_string().contains("unknown"));

        assert_eq!(listing_table(&db, Listing::Summaries, 1).await.unwrap().len(), 2);
        assert_eq!(listing_table(&db, Listing::Validations, 10).await.unwrap().len(), 2);
        assert_eq!(listing_table(&db, Listing::Reports, 10).await.unwrap().len(), 1);
    }
}
