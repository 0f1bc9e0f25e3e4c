use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::debug;

use super::article::CHRONOLOGICAL_ORDER;
use super::core::{parse_date, parse_timestamp, Database};
use super::models::{Summary, SummaryWithSource};
use crate::TARGET_DB;

const SUMMARY_WITH_SOURCE_COLUMNS: &str = r#"
    s.id AS summary_id, a.external_id, a.pub_date, s.text AS summary_text,
    a.abstract_text, s.created_at
"#;

impl Database {
    /// Stores the one summary an article may have.
    ///
    /// Fails with a unique-constraint error if the article is already summarized.
    pub async fn create_summary(&self, article_id: i64, text: &str) -> Result<Summary, sqlx::Error> {
        let created_at = Utc::now();
        let mut tx = self.pool().begin().await?;

        let id = sqlx::query(
            r#"
            INSERT INTO summaries (article_id, text, created_at)
            VALUES (?1, ?2, ?3)
            "#,
        )
        .bind(article_id)
        .bind(text)
        .bind(created_at.to_rfc3339())
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        tx.commit().await?;
        debug!(target: TARGET_DB, "Created summary {} for article {}", id, article_id);

        Ok(Summary {
            id,
            article_id,
            text: text.to_string(),
            created_at,
        })
    }

    pub async fn get_summary_for_article(&self, article_id: i64) -> Result<Option<Summary>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT id, article_id, text, created_at FROM summaries WHERE article_id = ?1",
        )
        .bind(article_id)
        .fetch_optional(self.pool())
        .await?;

        row.map(|row| summary_from_row(&row)).transpose()
    }

    /// Every summary, ordered by its article's publication date.
    pub async fn summaries_in_publication_order(&self) -> Result<Vec<SummaryWithSource>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {}
            FROM summaries s
            JOIN articles a ON a.id = s.article_id
            ORDER BY {}
            "#,
            SUMMARY_WITH_SOURCE_COLUMNS, CHRONOLOGICAL_ORDER
        );
        let rows = sqlx::query(&query).fetch_all(self.pool()).await?;
        rows.iter().map(summary_with_source_from_row).collect()
    }

    /// Summaries that have not been validated yet, with their source abstracts.
    pub async fn pending_validation_summaries(&self) -> Result<Vec<SummaryWithSource>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {}
            FROM summaries s
            JOIN articles a ON a.id = s.article_id
            WHERE NOT EXISTS (SELECT 1 FROM validations v WHERE v.summary_id = s.id)
            ORDER BY {}
            "#,
            SUMMARY_WITH_SOURCE_COLUMNS, CHRONOLOGICAL_ORDER
        );
        let rows = sqlx::query(&query).fetch_all(self.pool()).await?;
        rows.iter().map(summary_with_source_from_row).collect()
    }

    pub async fn count_pending_validations(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM summaries s
            WHERE NOT EXISTS (SELECT 1 FROM validations v WHERE v.summary_id = s.id)
            "#,
        )
        .fetch_one(self.pool())
        .await
    }

    pub async fn list_summaries(&self, limit: i64) -> Result<Vec<SummaryWithSource>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {}
            FROM summaries s
            JOIN articles a ON a.id = s.article_id
            ORDER BY {}
            LIMIT ?1
            "#,
            SUMMARY_WITH_SOURCE_COLUMNS, CHRONOLOGICAL_ORDER
        );
        let rows = sqlx::query(&query).bind(limit).fetch_all(self.pool()).await?;
        rows.iter().map(summary_with_source_from_row).collect()
    }

    pub async fn count_summaries(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM summaries")
            .fetch_one(self.pool())
            .await
    }
}

fn summary_from_row(row: &SqliteRow) -> Result<Summary, sqlx::Error> {
    let created_at: String = row.try_get("created_at")?;
    Ok(Summary {
        id: row.try_get("id")?,
        article_id: row.try_get("article_id")?,
        text: row.try_get("text")?,
        created_at: parse_timestamp("created_at", &created_at)?,
    })
}

fn summary_with_source_from_row(row: &SqliteRow) -> Result<SummaryWithSource, sqlx::Error> {
    let created_at: String = row.try_get("created_at")?;
    Ok(SummaryWithSource {
        summary_id: row.try_get("summary_id")?,
        external_id: row.try_get("external_id")?,
        pub_date: parse_date("pub_date", row.try_get("pub_date")?)?,
        summary_text: row.try_get("summary_text")?,
        abstract_text: row.try_get("abstract_text")?,
        created_at: parse_timestamp("created_at", &created_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{record, seed_articles};

    #[tokio::test]
    async fn test_second_summary_for_same_article_is_rejected() {
        let db = Database::in_memory().await.unwrap();
        let ids = seed_articles(&db, &[record("1", "T", "A", Some((2020, 1, 1)))]).await;

        let summary = db.create_summary(ids[0], "first").await.unwrap();
        assert_eq!(summary.article_id, ids[0]);
        assert!(db.create_summary(ids[0], "second").await.is_err());

        let stored = db.get_summary_for_article(ids[0]).await.unwrap().unwrap();
        assert_eq!(stored.text, "first");
        assert_eq!(db.count_summaries().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_summary_requires_existing_article() {
        let db = Database::in_memory().await.unwrap();
        assert!(db.create_summary(999, "orphan").await.is_err());
        assert_eq!(db.count_summaries().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_summaries_follow_article_publication_order() {
        let db = Database::in_memory().await.unwrap();
        let ids = seed_articles(
            &db,
            &[
                record("late", "T", "late abstract", Some((2020, 6, 1))),
                record("early", "T", "early abstract", Some((2020, 2, 1))),
            ],
        )
        .await;
        db.create_summary(ids[0], "late summary").await.unwrap();
        db.create_summary(ids[1], "early summary").await.unwrap();

        let ordered = db.summaries_in_publication_order().await.unwrap();
        let texts: Vec<&str> = ordered.iter().map(|s| s.summary_text.as_str()).collect();
        assert_eq!(texts, vec!["early summary", "late summary"]);
        assert_eq!(ordered[0].abstract_text, "early abstract");
        assert_eq!(db.count_pending_summaries().await.unwrap(), 0);
        assert_eq!(db.count_pending_validations().await.unwrap(), 2);
    }
}
