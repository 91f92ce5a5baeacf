use crate::error::{ErrorKind, Result};
use crate::models::{Book, BookRow, Selection};
use exn::ResultExt;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::io;
use std::path::{Path, PathBuf};

/// Calibre's metadata database, relative to the library root.
pub const METADATA_FILENAME: &str = "metadata.db";

/// An open, read-only Calibre library.
#[derive(Debug, Clone)]
pub struct Library {
    root: PathBuf,
    pool: SqlitePool,
}

impl Library {
    /// Open the library rooted at `root`.
    ///
    /// Fails with [`ErrorKind::Unavailable`] if `metadata.db` is missing,
    /// unreadable or does not look like a Calibre database. Never creates or
    /// modifies anything.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let path = root.join(METADATA_FILENAME);
        let options = SqliteConnectOptions::new()
            .filename(&path)
            .read_only(true)
            .create_if_missing(false)
            // Calibre itself may hold the database open.
            .busy_timeout(std::time::Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .or_raise(|| ErrorKind::Unavailable(path.clone()))?;
        // A file that opens is not necessarily a Calibre library.
        let books: i64 = sqlx::query_scalar(include_str!("../queries/probe.sql"))
            .fetch_one(&pool)
            .await
            .or_raise(|| ErrorKind::Unavailable(path.clone()))?;
        tracing::debug!(library = %root.display(), books, "Opened calibre library");
        Ok(Self { root, pool })
    }

    /// Books with a cover, ordered by id.
    ///
    /// Selecting a single book that doesn't exist (or has no cover) returns an
    /// empty list, not an error.
    pub async fn list_books(&self, selection: Selection) -> Result<Vec<Book>> {
        let rows: Vec<BookRow> = match selection {
            Selection::All => sqlx::query_as(include_str!("../queries/list_books.sql"))
                .fetch_all(&self.pool)
                .await
                .or_raise(|| ErrorKind::Query)?,
            Selection::Book(id) => {
                // Larger than any SQLite rowid, so it can't exist.
                let Ok(id) = i64::try_from(id) else {
                    return Ok(Vec::new());
                };
                sqlx::query_as(include_str!("../queries/get_book.sql"))
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await
                    .or_raise(|| ErrorKind::Query)?
                    .into_iter()
                    .collect()
            },
        };
        rows.into_iter().map(Book::try_from).collect()
    }

    pub fn cover_path(&self, book: &Book) -> PathBuf {
        book.cover_path(&self.root)
    }

    /// Read a book's cover file into memory.
    pub async fn read_cover(&self, book: &Book) -> Result<Vec<u8>> {
        let path = self.cover_path(book);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => exn::bail!(ErrorKind::CoverMissing(path)),
            Err(e) => Err(e).or_raise(|| ErrorKind::CoverUnreadable(path)),
        }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
