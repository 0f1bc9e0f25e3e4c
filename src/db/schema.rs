use tracing::info;

use super::core::Database;
use crate::TARGET_DB;

impl Database {
    pub(crate) async fn initialize_schema(&self) -> Result<(), sqlx::Error> {
        let mut conn = self.pool().acquire().await?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS articles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                external_id TEXT NOT NULL UNIQUE,
                title TEXT NOT NULL,
                abstract_text TEXT NOT NULL,
                pub_date TEXT,
                raw_payload TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_articles_pub_date ON articles (pub_date);

            -- One summary per article; the unique index also serves the pending-work anti-join.
            CREATE TABLE IF NOT EXISTS summaries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                article_id INTEGER NOT NULL UNIQUE,
                text TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (article_id) REFERENCES articles (id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS validations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                summary_id INTEGER NOT NULL UNIQUE,
                hallucination_score REAL NOT NULL,
                issues TEXT NOT NULL,
                FOREIGN KEY (summary_id) REFERENCES summaries (id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_validations_score ON validations (hallucination_score);

            CREATE TABLE IF NOT EXISTS trend_reports (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                generated_at TEXT NOT NULL,
                text TEXT NOT NULL,
                issues TEXT NOT NULL,
                hallucination_score REAL NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_trend_reports_generated_at ON trend_reports (generated_at);
            "#,
        )
        .execute(&mut *conn)
        .await?;
        info!(target: TARGET_DB, "Tables ensured to exist");
        Ok(())
    }
}
