//! SQLite-backed [`SummaryRepository`].
//!
//! File databases run in WAL mode so list queries from the API do not block
//! the writes of an in-flight pipeline. In-memory databases (tests, `inspect`
//! style one-offs) are pinned to a single connection that never expires,
//! because each SQLite connection to `:memory:` is its own database.

use super::{NewSummary, PersistedSummary, SummaryRepository, SummaryStatus, User};
use crate::error::PdfDeckError;
use crate::slides::encode_slides;
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::Row;
use std::str::FromStr;
use tracing::{debug, info};

/// SQLite implementation of [`SummaryRepository`].
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

fn now_ts() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn is_memory_url(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) the database at `database_url` and make
    /// sure the schema exists.
    pub async fn connect(database_url: &str) -> Result<Self, PdfDeckError> {
        if is_memory_url(database_url) {
            return Self::in_memory().await;
        }

        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        info!("Connected to {}", database_url);
        let store = Self::new(pool);
        store.init_schema().await?;
        Ok(store)
    }

    /// A fresh, private in-memory database with the schema applied.
    pub async fn in_memory() -> Result<Self, PdfDeckError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self::new(pool);
        store.init_schema().await?;
        Ok(store)
    }

    /// Create tables and indexes. Safe to run on every start.
    pub async fn init_schema(&self) -> Result<(), PdfDeckError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                external_id TEXT NOT NULL UNIQUE,
                email TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS pdf_summaries (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                original_file_url TEXT NOT NULL,
                summary_text TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL DEFAULT 'pending',
                title TEXT,
                file_name TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_pdf_summaries_user_created ON pdf_summaries(user_id, created_at)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_pdf_summaries_status ON pdf_summaries(status)")
            .execute(&self.pool)
            .await?;

        debug!("Schema ready");
        Ok(())
    }
}

fn user_from_row(row: &SqliteRow) -> User {
    User {
        id: row.get("id"),
        external_id: row.get("external_id"),
        email: row.get("email"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn summary_from_row(row: &SqliteRow) -> Result<PersistedSummary, PdfDeckError> {
    let status: String = row.get("status");
    Ok(PersistedSummary {
        id: row.get("id"),
        user_id: row.get("user_id"),
        original_file_url: row.get("original_file_url"),
        summary_text: row.get("summary_text"),
        status: status.parse()?,
        title: row.get("title"),
        file_name: row.get("file_name"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

const SUMMARY_COLUMNS: &str = "id, user_id, original_file_url, summary_text, status, title, \
                               file_name, created_at, updated_at";

#[async_trait]
impl SummaryRepository for SqliteStore {
    async fn upsert_user(
        &self,
        external_id: &str,
        email: Option<&str>,
    ) -> Result<User, PdfDeckError> {
        let now = now_ts();
        sqlx::query(
            r#"
            INSERT INTO users (id, external_id, email, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(external_id) DO UPDATE SET
                email = COALESCE(excluded.email, users.email),
                updated_at = excluded.updated_at
            "#,
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(external_id)
        .bind(email)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.user_by_external_id(external_id).await?.ok_or_else(|| {
            PdfDeckError::Internal(format!("user {external_id} vanished after upsert"))
        })
    }

    async fn user_by_external_id(&self, external_id: &str) -> Result<Option<User>, PdfDeckError> {
        let row = sqlx::query(
            "SELECT id, external_id, email, created_at, updated_at FROM users WHERE external_id = ?",
        )
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn create_summary(&self, new: NewSummary) -> Result<PersistedSummary, PdfDeckError> {
        let summary = PersistedSummary {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: new.user_id,
            original_file_url: new.original_file_url,
            summary_text: String::new(),
            status: SummaryStatus::Pending,
            title: None,
            file_name: Some(new.file_name),
            created_at: now_ts(),
            updated_at: now_ts(),
        };

        sqlx::query(
            r#"
            INSERT INTO pdf_summaries (id, user_id, original_file_url, summary_text, status,
                                       title, file_name, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&summary.id)
        .bind(&summary.user_id)
        .bind(&summary.original_file_url)
        .bind(&summary.summary_text)
        .bind(summary.status.as_str())
        .bind(&summary.title)
        .bind(&summary.file_name)
        .bind(&summary.created_at)
        .bind(&summary.updated_at)
        .execute(&self.pool)
        .await?;

        debug!(
            "Created summary {} for user {}",
            summary.id, summary.user_id
        );
        Ok(summary)
    }

    async fn set_status(&self, id: &str, status: SummaryStatus) -> Result<(), PdfDeckError> {
        let result = sqlx::query("UPDATE pdf_summaries SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(now_ts())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PdfDeckError::NotFound { id: id.to_string() });
        }
        debug!("Summary {} -> {}", id, status);
        Ok(())
    }

    async fn complete_summary(
        &self,
        id: &str,
        title: &str,
        slides: &[String],
    ) -> Result<(), PdfDeckError> {
        let summary_text = encode_slides(slides)?;
        let result = sqlx::query(
            r#"
            UPDATE pdf_summaries
            SET title = ?, summary_text = ?, status = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(title)
        .bind(&summary_text)
        .bind(SummaryStatus::Completed.as_str())
        .bind(now_ts())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PdfDeckError::NotFound { id: id.to_string() });
        }
        Ok(())
    }

    async fn get_summary(
        &self,
        user_id: &str,
        id: &str,
    ) -> Result<Option<PersistedSummary>, PdfDeckError> {
        let row = sqlx::query(&format!(
            "SELECT {SUMMARY_COLUMNS} FROM pdf_summaries WHERE id = ? AND user_id = ?"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(summary_from_row).transpose()
    }

    async fn list_summaries(&self, user_id: &str) -> Result<Vec<PersistedSummary>, PdfDeckError> {
        let rows = sqlx::query(&format!(
            "SELECT {SUMMARY_COLUMNS} FROM pdf_summaries WHERE user_id = ? \
             ORDER BY created_at DESC, rowid DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(summary_from_row).collect()
    }

    async fn delete_summary(&self, user_id: &str, id: &str) -> Result<bool, PdfDeckError> {
        let result = sqlx::query("DELETE FROM pdf_summaries WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store_with_user() -> (SqliteStore, User) {
        let store = SqliteStore::in_memory().await.unwrap();
        let user = store.upsert_user("user_abc", Some("a@example.com")).await.unwrap();
        (store, user)
    }

    fn new_summary(user: &User, name: &str) -> NewSummary {
        NewSummary {
            user_id: user.id.clone(),
            original_file_url: format!("https://files.example/{name}"),
            file_name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn upsert_user_is_get_or_create() {
        let (store, user) = store_with_user().await;
        let again = store.upsert_user("user_abc", None).await.unwrap();
        assert_eq!(again.id, user.id);
        assert_eq!(again.email.as_deref(), Some("a@example.com"));

        let updated = store.upsert_user("user_abc", Some("b@example.com")).await.unwrap();
        assert_eq!(updated.email.as_deref(), Some("b@example.com"));
        assert!(store.user_by_external_id("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn summary_lifecycle() {
        let (store, user) = store_with_user().await;
        let created = store.create_summary(new_summary(&user, "a.pdf")).await.unwrap();
        assert_eq!(created.status, SummaryStatus::Pending);

        store.set_status(&created.id, SummaryStatus::Processing).await.unwrap();
        let slides = vec!["# One\n\nBody".to_string(), "# Two".to_string()];
        store.complete_summary(&created.id, "Deck", &slides).await.unwrap();

        let row = store.get_summary(&user.id, &created.id).await.unwrap().unwrap();
        assert_eq!(row.status, SummaryStatus::Completed);
        assert_eq!(row.title.as_deref(), Some("Deck"));
        assert_eq!(row.slides(), slides);
    }

    #[tokio::test]
    async fn rows_are_scoped_to_their_owner() {
        let (store, user) = store_with_user().await;
        let other = store.upsert_user("user_xyz", None).await.unwrap();
        let created = store.create_summary(new_summary(&user, "a.pdf")).await.unwrap();

        let foreign = store.get_summary(&other.id, &created.id).await.unwrap();
        assert!(foreign.is_none());
        assert!(!store.delete_summary(&other.id, &created.id).await.unwrap());
        assert!(store.delete_summary(&user.id, &created.id).await.unwrap());
        let deleted = store.get_summary(&user.id, &created.id).await.unwrap();
        assert!(deleted.is_none());
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let (store, user) = store_with_user().await;
        let first = store.create_summary(new_summary(&user, "first.pdf")).await.unwrap();
        let second = store.create_summary(new_summary(&user, "second.pdf")).await.unwrap();

        let ids: Vec<String> = store
            .list_summaries(&user.id)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn missing_rows_are_not_found() {
        let (store, _) = store_with_user().await;
        let err = store.set_status("nope", SummaryStatus::Failed).await.unwrap_err();
        assert!(matches!(err, PdfDeckError::NotFound { .. }));
    }

    #[tokio::test]
    async fn summaries_need_an_existing_user() {
        let store = SqliteStore::in_memory().await.unwrap();
        let res = store
            .create_summary(NewSummary {
                user_id: "ghost".into(),
                original_file_url: "u".into(),
                file_name: "f.pdf".into(),
            })
            .await;
        assert!(matches!(res, Err(PdfDeckError::Database(_))));
    }

    #[tokio::test]
    async fn deleting_a_user_cascades_to_summaries() {
        let (store, user) = store_with_user().await;
        let created = store.create_summary(new_summary(&user, "a.pdf")).await.unwrap();
        store.create_summary(new_summary(&user, "b.pdf")).await.unwrap();

        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(&user.id)
            .execute(&store.pool)
            .await
            .unwrap();

        assert!(store.list_summaries(&user.id).await.unwrap().is_empty());
        let orphan = store.get_summary(&user.id, &created.id).await.unwrap();
        assert!(orphan.is_none());
        let left: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pdf_summaries")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(left, 0);
    }

    #[tokio::test]
    async fn schema_init_is_idempotent() {
        let (store, _) = store_with_user().await;
        store.init_schema().await.unwrap();
        store.init_schema().await.unwrap();
    }
}
