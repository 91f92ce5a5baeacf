//! Database connection and pool management.

use exn::ResultExt;
use sqlx::SqliteConnection;
use sqlx::pool::PoolConnectionMetadata;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::path::Path;
use tracing::instrument;

use crate::error::{ErrorKind, Result};

/// Embedded migrations that are run automatically on connect.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
// Uploads are processed one book at a time; a second connection only helps
// when something else reads the store at the same time.
const MAX_CONNECTIONS: u32 = 2;

/// Database connection pool for the tracking store.
///
/// This is the main entry point for interacting with the tracking database.
/// It manages the SQLite connection pool and provides access to the
/// [`Repository`](crate::Repository).
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    async fn new(options: SqliteConnectOptions, max: Option<u32>) -> Result<Self> {
        let pool = Self::build_pool(options, max).await?;
        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    async fn build_pool(options: SqliteConnectOptions, max: Option<u32>) -> Result<SqlitePool> {
        SqlitePoolOptions::new()
            // This is IMPORTANT to apply the query-based PRAGMAs to EVERY
            // connection (set by max connections) instead of only the
            // first connection returned by the pool.
            .after_connect(|conn, meta| Box::pin(async move { Self::apply_pragmas(conn, meta).await }))
            .max_connections(max.unwrap_or(MAX_CONNECTIONS))
            .connect_with(options)
            .await
            .or_raise(|| ErrorKind::Database)
    }

    /// Connect to the tracking database at the given path.
    ///
    /// Creates the parent directory and the database file if they don't exist
    /// and runs migrations.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).or_raise(|| ErrorKind::Unavailable(path.to_path_buf()))?;
        }
        let options = Self::base_options().filename(path).create_if_missing(true);
        Self::new(options, None).await.or_raise(|| ErrorKind::Unavailable(path.to_path_buf()))
    }

    /// Open an existing tracking database without ever writing to it.
    ///
    /// Migrations are NOT run. Returns [`ErrorKind::MissingSchema`] if the
    /// database exists but has never been initialised.
    pub async fn connect_read_only(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let options = SqliteConnectOptions::new().filename(path).read_only(true).create_if_missing(false);
        let pool = Self::build_pool(options, Some(1)).await.or_raise(|| ErrorKind::Unavailable(path.to_path_buf()))?;
        let exists: bool = sqlx::query_scalar(include_str!("../queries/schema_exists.sql"))
            .fetch_one(&pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        if !exists {
            pool.close().await;
            exn::bail!(ErrorKind::MissingSchema(path.to_path_buf()));
        }
        Ok(Self { pool })
    }

    /// Open the tracking database for a run.
    ///
    /// A live run connects (creating and migrating the store as needed). A
    /// dry run never creates or migrates anything: an existing store is used
    /// read-only, and an empty in-memory store stands in when there is no
    /// file or the file has never been initialised.
    pub async fn open(path: impl AsRef<Path>, dry_run: bool) -> Result<Self> {
        let path = path.as_ref();
        if !dry_run {
            tracing::info!(path = %path.display(), "Using tracking database");
            return Self::connect(path).await;
        }
        if path.is_file() {
            match Self::connect_read_only(path).await {
                Ok(db) => {
                    tracing::info!(path = %path.display(), "Using tracking database (read-only)");
                    return Ok(db);
                },
                Err(e) if matches!(&*e, ErrorKind::MissingSchema(_)) => (),
                Err(e) => return Err(e),
            }
        }
        tracing::info!(path = %path.display(), "No tracking database yet, dry run starts from an empty one");
        Self::connect_in_memory().await
    }

    /// Connect to an in-memory database (useful for testing and dry runs).
    ///
    /// Note:
    /// - In-memory databases are destroyed when the connection closes.
    /// - Do NOT apply `#[cfg(test)]` so that other crates can also use this in their tests.
    pub async fn connect_in_memory() -> Result<Self> {
        let options = Self::base_options().filename(":memory:");
        // In-memory database must either use the same cache `.shared_cache(true)`,
        // or be limited to one connection. Otherwise parallel connections will
        // see different databases that contain different data.
        Self::new(options, Some(1)).await
    }

    /// Base connection options for writable databases.
    fn base_options() -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            // Enable WAL mode so a reader (e.g. the web app) never blocks an upload run
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            // PRAGMA synchronous = NORMAL (balance between safety and speed)
            .synchronous(SqliteSynchronous::Normal)
            // PRAGMA busy_timeout = 1500ms
            .busy_timeout(std::time::Duration::from_millis(1500))
    }

    /// Apply additional PRAGMA settings that aren't exposed via SqliteConnectOptions.
    async fn apply_pragmas(conn: &mut SqliteConnection, _meta: PoolConnectionMetadata) -> sqlx::Result<()> {
        sqlx::query(
            r#"
                PRAGMA cache_size = -2048;
                PRAGMA temp_store = MEMORY;
            "#,
        )
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Run database migrations.
    ///
    /// This is called automatically by `connect` and `connect_in_memory`.
    #[instrument("performing database migrations", skip(self))]
    async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await.or_raise(|| ErrorKind::Migration)
    }

    /// Get a reference to the underlying connection pool.
    ///
    /// This is useful for running custom queries or transactions.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection pool.
    ///
    /// This waits for all connections to be returned to the pool and then
    /// closes them. After calling this, the Database instance should not
    /// be used.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_in_memory() {
        let db = Database::connect_in_memory().await.unwrap();
        assert!(!db.pool().is_closed());
        db.close().await;
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let db = Database::connect_in_memory().await.unwrap();
        // Running migrate again should succeed (already applied)
        db.migrate().await.unwrap();
        db.close().await;
    }

    #[tokio::test]
    async fn test_connect_creates_file_and_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config").join("app.db");
        let db = Database::connect(&path).await.unwrap();
        db.close().await;
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_connect_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where a directory is expected.
        let blocker = dir.path().join("config");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let err = Database::connect(blocker.join("app.db")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_read_only_requires_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.db");
        // Create a valid, but empty, SQLite database.
        let options = SqliteConnectOptions::new().filename(&path).create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await.unwrap();
        sqlx::query("CREATE TABLE unrelated (id INTEGER)").execute(&pool).await.unwrap();
        pool.close().await;

        let err = Database::connect_read_only(&path).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::MissingSchema(_)));
    }

    async fn table_names(path: &Path) -> Vec<String> {
        let options = SqliteConnectOptions::new().filename(path).read_only(true);
        let pool = SqlitePool::connect_with(options).await.unwrap();
        let names = sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .fetch_all(&pool)
            .await
            .unwrap();
        pool.close().await;
        names
    }

    #[tokio::test]
    async fn test_open_live_creates_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config").join("app.db");
        let db = Database::open(&path, false).await.unwrap();
        db.close().await;
        assert!(table_names(&path).await.contains(&"cover_uploads".to_string()));
    }

    #[tokio::test]
    async fn test_dry_run_without_store_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config").join("app.db");
        let db = Database::open(&path, true).await.unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cover_uploads").fetch_one(db.pool()).await.unwrap();
        assert_eq!(count, 0);
        db.close().await;
        assert!(!path.exists());
        assert!(!dir.path().join("config").exists());
    }

    #[tokio::test]
    async fn test_dry_run_reads_existing_store_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.db");
        let db = Database::connect(&path).await.unwrap();
        let record = crate::UploadRecord::new(1, coverup_thumbnail::Resolution::Small, "cw-cover/1/cover_sm.jpg", 3);
        crate::Repository::from(&db).record_upload(&record).await.unwrap();
        db.close().await;

        let db = Database::open(&path, true).await.unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cover_uploads").fetch_one(db.pool()).await.unwrap();
        assert_eq!(count, 1);
        // The connection itself refuses writes.
        let write = sqlx::query("DELETE FROM cover_uploads").execute(db.pool()).await;
        assert!(write.is_err());
        db.close().await;

        let db = Database::connect_read_only(&path).await.unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cover_uploads").fetch_one(db.pool()).await.unwrap();
        assert_eq!(count, 1);
        db.close().await;
    }

    #[tokio::test]
    async fn test_dry_run_never_migrates_foreign_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.db");
        let options = SqliteConnectOptions::new().filename(&path).create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await.unwrap();
        sqlx::query("CREATE TABLE settings (id INTEGER)").execute(&pool).await.unwrap();
        pool.close().await;

        let db = Database::open(&path, true).await.unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cover_uploads").fetch_one(db.pool()).await.unwrap();
        assert_eq!(count, 0);
        db.close().await;
        assert_eq!(table_names(&path).await, vec!["settings".to_string()]);
    }

    #[tokio::test]
    async fn test_read_only_existing_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.db");
        Database::connect(&path).await.unwrap().close().await;
        let db = Database::connect_read_only(&path).await.unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cover_uploads").fetch_one(db.pool()).await.unwrap();
        assert_eq!(count, 0);
        db.close().await;
    }
}
