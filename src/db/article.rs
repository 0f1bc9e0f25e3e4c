use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::collections::HashMap;
use tracing::{debug, instrument};

use super::core::{format_date, parse_date, Database};
use super::models::{Article, UpsertOutcome};
use crate::pubmed::ArticleRecord;
use crate::TARGET_DB;

/// Publication date ascending, undated articles last, insertion order as tiebreak.
pub(crate) const CHRONOLOGICAL_ORDER: &str = "a.pub_date IS NULL, a.pub_date, a.id";

impl Database {
    /// Creates or overwrites articles keyed on their external id, all in one transaction.
    #[instrument(target = "db_query", level = "info", skip(self, records), fields(count = records.len()))]
    pub async fn upsert_articles(
        &self,
        records: &[ArticleRecord],
    ) -> Result<Vec<(String, UpsertOutcome)>, sqlx::Error> {
        let mut outcomes = Vec::with_capacity(records.len());
        let mut tx = self.pool().begin().await?;

        for record in records {
            let existing: Option<i64> =
                sqlx::query_scalar("SELECT id FROM articles WHERE external_id = ?1")
                    .bind(&record.external_id)
                    .fetch_optional(&mut *tx)
                    .await?;

            let raw_payload = serde_json::to_string(&record.raw_payload)
                .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

            sqlx::query(
                r#"
                INSERT INTO articles (external_id, title, abstract_text, pub_date, raw_payload)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(external_id) DO UPDATE SET
                    title = excluded.title,
                    abstract_text = excluded.abstract_text,
                    pub_date = excluded.pub_date,
                    raw_payload = excluded.raw_payload
                "#,
            )
            .bind(&record.external_id)
            .bind(&record.title)
            .bind(&record.abstract_text)
            .bind(format_date(record.pub_date))
            .bind(raw_payload)
            .execute(&mut *tx)
            .await?;

            let outcome = if existing.is_some() {
                UpsertOutcome::Updated
            } else {
                UpsertOutcome::Created
            };
            debug!(target: TARGET_DB, "{} article {}", outcome.verb(), record.external_id);
            outcomes.push((record.external_id.clone(), outcome));
        }

        tx.commit().await?;
        Ok(outcomes)
    }

    pub async fn get_article_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Article>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT a.id, a.external_id, a.title, a.abstract_text, a.pub_date, a.raw_payload
            FROM articles a
            WHERE a.external_id = ?1
            "#,
        )
        .bind(external_id)
        .fetch_optional(self.pool())
        .await?;

        row.map(|row| article_from_row(&row)).transpose()
    }

    /// Ids of articles without a summary, in the order they should be summarized.
    pub async fn pending_summary_article_ids(&self) -> Result<Vec<i64>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT a.id
            FROM articles a
            WHERE NOT EXISTS (SELECT 1 FROM summaries s WHERE s.article_id = a.id)
            ORDER BY {}
            "#,
            CHRONOLOGICAL_ORDER
        );
        sqlx::query_scalar(&query).fetch_all(self.pool()).await
    }

    pub async fn count_pending_summaries(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM articles a
            WHERE NOT EXISTS (SELECT 1 FROM summaries s WHERE s.article_id = a.id)
            "#,
        )
        .fetch_one(self.pool())
        .await
    }

    /// Loads articles by id, returned in the order the ids were given.
    pub async fn get_articles_by_ids(&self, ids: &[i64]) -> Result<Vec<Article>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let query = format!(
            r#"
            SELECT a.id, a.external_id, a.title, a.abstract_text, a.pub_date, a.raw_payload
            FROM articles a
            WHERE a.id IN ({})
            "#,
            placeholders
        );

        let mut statement = sqlx::query(&query);
        for id in ids {
            statement = statement.bind(*id);
        }
        let rows = statement.fetch_all(self.pool()).await?;

        let mut by_id = HashMap::with_capacity(rows.len());
        for row in &rows {
            let article = article_from_row(row)?;
            by_id.insert(article.id, article);
        }
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    pub async fn list_articles(&self, limit: i64) -> Result<Vec<Article>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT a.id, a.external_id, a.title, a.abstract_text, a.pub_date, a.raw_payload
            FROM articles a
            ORDER BY {}
            LIMIT ?1
            "#,
            CHRONOLOGICAL_ORDER
        );
        let rows = sqlx::query(&query).bind(limit).fetch_all(self.pool()).await?;
        rows.iter().map(article_from_row).collect()
    }

    pub async fn count_articles(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM articles")
            .fetch_one(self.pool())
            .await
    }
}

fn article_from_row(row: &SqliteRow) -> Result<Article, sqlx::Error> {
    let raw_payload: String = row.try_get("raw_payload")?;
    Ok(Article {
        id: row.try_get("id")?,
        external_id: row.try_get("external_id")?,
        title: row.try_get("title")?,
        abstract_text: row.try_get("abstract_text")?,
        pub_date: parse_date("pub_date", row.try_get("pub_date")?)?,
        raw_payload: serde_json::from_str(&raw_payload).map_err(|e| {
            sqlx::Error::ColumnDecode {
                index: "raw_payload".to_string(),
                source: Box::new(e),
            }
        })?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::record;
    use chrono::NaiveDate;

    #[tokio::test]
    async fn test_upsert_is_idempotent_and_keeps_latest_values() {
        let db = Database::in_memory().await.unwrap();

        let first = db
            .upsert_articles(&[record("100", "Title A", "Abstract A", Some((2020, 1, 5)))])
            .await
            .unwrap();
        assert_eq!(first, vec![("100".to_string(), UpsertOutcome::Created)]);

        let second = db
            .upsert_articles(&[record("100", "Title B", "Abstract B", Some((2020, 1, 6)))])
            .await
            .unwrap();
        assert_eq!(second, vec![("100".to_string(), UpsertOutcome::Updated)]);

        assert_eq!(db.count_articles().await.unwrap(), 1);
        let article = db.get_article_by_external_id("100").await.unwrap().unwrap();
        assert_eq!(article.title, "Title B");
        assert_eq!(article.abstract_text, "Abstract B");
        assert_eq!(article.pub_date, NaiveDate::from_ymd_opt(2020, 1, 6));
        assert_eq!(article.raw_payload["title"], "Title B");
    }

    #[tokio::test]
    async fn test_pending_ids_are_chronological_with_undated_last() {
        let db = Database::in_memory().await.unwrap();
        db.upsert_articles(&[
            record("undated", "U", "u", None),
            record("march", "M", "m", Some((2020, 3, 1))),
            record("january", "J", "j", Some((2020, 1, 1))),
        ])
        .await
        .unwrap();

        let ids = db.pending_summary_article_ids().await.unwrap();
        let articles = db.get_articles_by_ids(&ids).await.unwrap();
        let order: Vec<&str> = articles.iter().map(|a| a.external_id.as_str()).collect();
        assert_eq!(order, vec!["january", "march", "undated"]);
        assert_eq!(db.count_pending_summaries().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_get_articles_by_ids_preserves_requested_order() {
        let db = Database::in_memory().await.unwrap();
        db.upsert_articles(&[
            record("1", "One", "a", Some((2020, 1, 1))),
            record("2", "Two", "b", Some((2020, 1, 2))),
        ])
        .await
        .unwrap();
        let ids = db.pending_summary_article_ids().await.unwrap();
        let reversed: Vec<i64> = ids.iter().rev().copied().collect();

        let articles = db.get_articles_by_ids(&reversed).await.unwrap();
        assert_eq!(articles[0].external_id, "2");
        assert_eq!(articles[1].external_id, "1");
        assert!(db.get_articles_by_ids(&[]).await.unwrap().is_empty());
    }
}
