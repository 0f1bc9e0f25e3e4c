use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::debug;

use super::core::{encode_issues, parse_issues, Database};
use super::models::Validation;
use crate::fact_check::FactCheckResult;
use crate::TARGET_DB;

impl Database {
    /// Records the fact-check result for a summary. A summary is validated at most once.
    pub async fn create_validation(
        &self,
        summary_id: i64,
        result: &FactCheckResult,
    ) -> Result<Validation, sqlx::Error> {
        let issues = encode_issues(&result.issues)?;
        let mut tx = self.pool().begin().await?;

        let id = sqlx::query(
            r#"
            INSERT INTO validations (summary_id, hallucination_score, issues)
            VALUES (?1, ?2, ?3)
            "#,
        )
        .bind(summary_id)
        .bind(result.score)
        .bind(issues)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        tx.commit().await?;
        debug!(target: TARGET_DB, "Created validation {} for summary {}", id, summary_id);

        Ok(Validation {
            id,
            summary_id,
            hallucination_score: result.score,
            issues: result.issues.clone(),
        })
    }

    pub async fn get_validation_for_summary(
        &self,
        summary_id: i64,
    ) -> Result<Option<Validation>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT id, summary_id, hallucination_score, issues
            FROM validations
            WHERE summary_id = ?1
            "#,
        )
        .bind(summary_id)
        .fetch_optional(self.pool())
        .await?;

        row.map(|row| validation_from_row(&row)).transpose()
    }

    /// Most recent validations first.
    pub async fn list_validations(&self, limit: i64) -> Result<Vec<Validation>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, summary_id, hallucination_score, issues
            FROM validations
            ORDER BY id DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(validation_from_row).collect()
    }

    pub async fn count_validations(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM validations")
            .fetch_one(self.pool())
            .await
    }
}

fn validation_from_row(row: &SqliteRow) -> Result<Validation, sqlx::Error> {
    let issues: String = row.try_get("issues")?;
    Ok(Validation {
        id: row.try_get("id")?,
        summary_id: row.try_get("summary_id")?,
        hallucination_score: row.try_get("hallucination_score")?,
        issues: parse_issues("issues", &issues)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{record, seed_articles};

    #[tokio::test]
    async fn test_validation_round_trip_and_uniqueness() {
        let db = Database::in_memory().await.unwrap();
        let ids = seed_articles(&db, &[record("1", "T", "A", Some((2020, 1, 1)))]).await;
        let summary = db.create_summary(ids[0], "s").await.unwrap();

        let result = FactCheckResult {
            score: 0.5,
            issues: vec!["unsupported dosage".to_string()],
        };
        db.create_validation(summary.id, &result).await.unwrap();

        let stored = db.get_validation_for_summary(summary.id).await.unwrap().unwrap();
        assert_eq!(stored.hallucination_score, 0.5);
        assert_eq!(stored.issues, vec!["unsupported dosage"]);
        assert_eq!(db.count_pending_validations().await.unwrap(), 0);

        assert!(db.create_validation(summary.id, &FactCheckResult::default()).await.is_err());
        assert_eq!(db.count_validations().await.unwrap(), 1);
        assert_eq!(db.list_validations(10).await.unwrap(), vec![stored]);
    }
}
