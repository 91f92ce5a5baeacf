//! Repository for upload tracking records.

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::{UploadRecord, UploadRow};
use coverup_thumbnail::Resolution;
use exn::ResultExt;
use sqlx::SqlitePool;

/// Repository for managing upload records in the tracking database.
///
/// Records are keyed by (book id, resolution). The presence of a record is the
/// sole signal that a resolution has already been uploaded; there is no
/// "pending" or "failed" state, because a record is only ever written after
/// the object store acknowledged the upload.
///
/// When constructed in dry-run mode every write is silently skipped, while all
/// reads still hit the database.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
    dry_run: bool,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone(), dry_run: false }
    }
}
impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool, dry_run: bool) -> Self {
        Self { pool, dry_run }
    }

    fn book_id(book_id: u64) -> Result<i64> {
        i64::try_from(book_id).or_raise(|| ErrorKind::InvalidData("book id"))
    }

    // =========================================================================
    // Insert
    // =========================================================================

    /// Record a completed upload.
    ///
    /// Upsert semantics: recording the same (book, resolution) again replaces
    /// the previous record, so calling this twice with the same record leaves
    /// the same final state.
    pub async fn record_upload(&self, record: &UploadRecord) -> Result<()> {
        if self.dry_run {
            return Ok(());
        }
        let row = UploadRow::try_from(record)?;
        sqlx::query(include_str!("../queries/upsert_upload.sql"))
            .bind(row.book_id)
            .bind(row.resolution)
            .bind(row.destination_key)
            .bind(row.uploaded_at)
            .bind(row.file_size)
            .bind(row.etag)
            .bind(row.status)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        tracing::debug!(book_id = record.book_id, resolution = %record.resolution, key = %record.key, "Recorded upload");
        Ok(())
    }

    // =========================================================================
    // Get/Fetch
    // =========================================================================

    /// Check whether a (book, resolution) pair has been uploaded.
    pub async fn is_uploaded(&self, book_id: u64, resolution: Resolution) -> Result<bool> {
        sqlx::query_scalar(include_str!("../queries/exists_upload.sql"))
            .bind(Self::book_id(book_id)?)
            .bind(resolution.as_str())
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)
    }

    /// Get the upload record for a (book, resolution) pair.
    pub async fn get(&self, book_id: u64, resolution: Resolution) -> Result<Option<UploadRecord>> {
        let row: Option<UploadRow> = sqlx::query_as(include_str!("../queries/get_upload.sql"))
            .bind(Self::book_id(book_id)?)
            .bind(resolution.as_str())
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(UploadRecord::try_from).transpose()
    }

    /// List every upload record for a book.
    pub async fn list_for_book(&self, book_id: u64) -> Result<Vec<UploadRecord>> {
        let rows: Vec<UploadRow> = sqlx::query_as(include_str!("../queries/list_uploads_for_book.sql"))
            .bind(Self::book_id(book_id)?)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(UploadRecord::try_from).collect()
    }

    /// Resolutions already uploaded for a book, in [`Resolution::ALL`] order.
    pub async fn uploaded_resolutions(&self, book_id: u64) -> Result<Vec<Resolution>> {
        let mut resolutions: Vec<Resolution> =
            self.list_for_book(book_id).await?.into_iter().map(|record| record.resolution).collect();
        resolutions.sort();
        Ok(resolutions)
    }

    /// Total number of upload records.
    pub async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(include_str!("../queries/count_uploads.sql"))
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        u64::try_from(count).or_raise(|| ErrorKind::InvalidData("count"))
    }

    // =========================================================================
    // Delete
    // =========================================================================

    /// Delete the record for a (book, resolution) pair, e.g. because the
    /// object it points to no longer exists.
    ///
    /// Returns `true` if a record was deleted (always `true` in dry-run mode).
    pub async fn delete(&self, book_id: u64, resolution: Resolution) -> Result<bool> {
        if self.dry_run {
            return Ok(true);
        }
        let result = sqlx::query(include_str!("../queries/delete_upload.sql"))
            .bind(Self::book_id(book_id)?)
            .bind(resolution.as_str())
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::UtcDateTime;

    async fn repo() -> Repository {
        let db = Database::connect_in_memory().await.unwrap();
        Repository::from(&db)
    }

    fn record(book_id: u64, resolution: Resolution) -> UploadRecord {
        UploadRecord::new(book_id, resolution, coverup_thumbnail::destination_key(book_id, resolution), 1024)
    }

    #[tokio::test]
    async fn test_record_and_check() {
        let repo = repo().await;
        assert!(!repo.is_uploaded(59, Resolution::Small).await.unwrap());
        repo.record_upload(&record(59, Resolution::Small)).await.unwrap();
        assert!(repo.is_uploaded(59, Resolution::Small).await.unwrap());
        // Other resolutions and books are unaffected.
        assert!(!repo.is_uploaded(59, Resolution::Medium).await.unwrap());
        assert!(!repo.is_uploaded(60, Resolution::Small).await.unwrap());
    }

    #[tokio::test]
    async fn test_record_is_idempotent() {
        let repo = repo().await;
        let first = record(59, Resolution::Original).with_etag(Some("first"));
        repo.record_upload(&first).await.unwrap();
        repo.record_upload(&first).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 1);

        let uploaded_at = UtcDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let second = record(59, Resolution::Original).with_etag(Some("second")).with_uploaded_at(uploaded_at);
        repo.record_upload(&second).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 1);
        let stored = repo.get(59, Resolution::Original).await.unwrap().unwrap();
        assert_eq!(stored.etag.as_deref(), Some("second"));
        assert_eq!(stored.uploaded_at, uploaded_at);
        assert_eq!(stored.key, "cw-cover/59/cover.jpg");
    }

    #[tokio::test]
    async fn test_uploaded_resolutions_are_ordered() {
        let repo = repo().await;
        for resolution in [Resolution::Large, Resolution::Original, Resolution::Small] {
            repo.record_upload(&record(7, resolution)).await.unwrap();
        }
        let resolutions = repo.uploaded_resolutions(7).await.unwrap();
        assert_eq!(resolutions, vec![Resolution::Original, Resolution::Small, Resolution::Large]);
        assert!(repo.uploaded_resolutions(8).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = repo().await;
        repo.record_upload(&record(3, Resolution::Medium)).await.unwrap();
        assert!(repo.delete(3, Resolution::Medium).await.unwrap());
        assert!(!repo.is_uploaded(3, Resolution::Medium).await.unwrap());
        assert!(!repo.delete(3, Resolution::Medium).await.unwrap());
    }

    #[tokio::test]
    async fn test_dry_run_never_writes() {
        let db = Database::connect_in_memory().await.unwrap();
        let repo = Repository::new(db.pool().clone(), true);
        repo.record_upload(&record(59, Resolution::Small)).await.unwrap();
        assert!(!repo.is_uploaded(59, Resolution::Small).await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_survives_reconnect() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.db");
        let db = Database::connect(&path).await.unwrap();
        Repository::from(&db).record_upload(&record(59, Resolution::Large)).await.unwrap();
        db.close().await;

        let db = Database::connect(&path).await.unwrap();
        assert!(Repository::from(&db).is_uploaded(59, Resolution::Large).await.unwrap());
        db.close().await;
    }
}
