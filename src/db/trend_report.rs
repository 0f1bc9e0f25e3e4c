use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::info;

use super::core::{encode_issues, parse_issues, parse_timestamp, Database};
use super::models::TrendReport;
use crate::fact_check::FactCheckResult;
use crate::TARGET_DB;

impl Database {
    /// Appends a new trend report. Earlier reports are never touched.
    pub async fn create_trend_report(
        &self,
        text: &str,
        result: &FactCheckResult,
    ) -> Result<TrendReport, sqlx::Error> {
        let generated_at = Utc::now();
        let issues = encode_issues(&result.issues)?;
        let mut tx = self.pool().begin().await?;

        let id = sqlx::query(
            r#"
            INSERT INTO trend_reports (generated_at, text, issues, hallucination_score)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(generated_at.to_rfc3339())
        .bind(text)
        .bind(issues)
        .bind(result.score)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        tx.commit().await?;
        info!(target: TARGET_DB, "Created trend report {}", id);

        Ok(TrendReport {
            id,
            generated_at,
            text: text.to_string(),
            issues: result.issues.clone(),
            hallucination_score: result.score,
        })
    }

    pub async fn latest_trend_report(&self) -> Result<Option<TrendReport>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT id, generated_at, text, issues, hallucination_score
            FROM trend_reports
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(self.pool())
        .await?;

        row.map(|row| trend_report_from_row(&row)).transpose()
    }

    /// Most recent reports first.
    pub async fn list_trend_reports(&self, limit: i64) -> Result<Vec<TrendReport>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, generated_at, text, issues, hallucination_score
            FROM trend_reports
            ORDER BY id DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(trend_report_from_row).collect()
    }

    pub async fn count_trend_reports(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM trend_reports")
            .fetch_one(self.pool())
            .await
    }
}

fn trend_report_from_row(row: &SqliteRow) -> Result<TrendReport, sqlx::Error> {
    let generated_at: String = row.try_get("generated_at")?;
    let issues: String = row.try_get("issues")?;
    Ok(TrendReport {
        id: row.try_get("id")?,
        generated_at: parse_timestamp("generated_at", &generated_at)?,
        text: row.try_get("text")?,
        issues: parse_issues("issues", &issues)?,
        hallucination_score: row.try_get("hallucination_score")?,
    })
}
