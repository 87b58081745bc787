//! Durable storage for users and their summaries.
//!
//! Handlers and the pipeline only see the [`SummaryRepository`] trait; the
//! shipped implementation is [`SqliteStore`]. Every lookup that returns a
//! summary is scoped by `user_id`, so one user can never read or delete
//! another user's rows.
//!
//! # Lifecycle of a summary row
//!
//! ```text
//! create_summary ─▶ pending ─▶ processing ─┬─▶ completed (slides stored)
//!                                          └─▶ failed
//! ```

mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::PdfDeckError;
use crate::slides::normalize_summary_text;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Processing status of a summary row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl SummaryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SummaryStatus::Pending => "pending",
            SummaryStatus::Processing => "processing",
            SummaryStatus::Completed => "completed",
            SummaryStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for SummaryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SummaryStatus {
    type Err = PdfDeckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SummaryStatus::Pending),
            "processing" => Ok(SummaryStatus::Processing),
            "completed" => Ok(SummaryStatus::Completed),
            "failed" => Ok(SummaryStatus::Failed),
            other => Err(PdfDeckError::Internal(format!("unknown summary status '{other}'"))),
        }
    }
}

/// An authenticated user, keyed by the identity provider's id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub external_id: String,
    pub email: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A stored summary row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSummary {
    pub id: String,
    pub user_id: String,
    pub original_file_url: String,
    /// JSON-encoded slide array (possibly a legacy shape).
    pub summary_text: String,
    pub status: SummaryStatus,
    pub title: Option<String>,
    pub file_name: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl PersistedSummary {
    /// Slides decoded through the normalizer.
    pub fn slides(&self) -> Vec<String> {
        normalize_summary_text(&self.summary_text)
    }
}

/// Fields needed to open a new summary row.
#[derive(Debug, Clone)]
pub struct NewSummary {
    pub user_id: String,
    pub original_file_url: String,
    pub file_name: String,
}

/// Storage operations used by the API and CLI.
#[async_trait]
pub trait SummaryRepository: Send + Sync {
    /// Get or create the user for `external_id`, refreshing the email when
    /// one is supplied.
    async fn upsert_user(
        &self,
        external_id: &str,
        email: Option<&str>,
    ) -> Result<User, PdfDeckError>;

    async fn user_by_external_id(&self, external_id: &str) -> Result<Option<User>, PdfDeckError>;

    /// Insert a `pending` row with empty summary text.
    async fn create_summary(&self, new: NewSummary) -> Result<PersistedSummary, PdfDeckError>;

    /// Fails with [`PdfDeckError::NotFound`] when `id` does not exist.
    async fn set_status(&self, id: &str, status: SummaryStatus) -> Result<(), PdfDeckError>;

    /// Store title and slides and mark the row `completed`.
    async fn complete_summary(
        &self,
        id: &str,
        title: &str,
        slides: &[String],
    ) -> Result<(), PdfDeckError>;

    async fn get_summary(
        &self,
        user_id: &str,
        id: &str,
    ) -> Result<Option<PersistedSummary>, PdfDeckError>;

    /// All of a user's summaries, newest first.
    async fn list_summaries(&self, user_id: &str) -> Result<Vec<PersistedSummary>, PdfDeckError>;

    /// Returns whether a row was deleted.
    async fn delete_summary(&self, user_id: &str, id: &str) -> Result<bool, PdfDeckError>;
}
