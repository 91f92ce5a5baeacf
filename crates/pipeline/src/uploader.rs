use crate::error::{ErrorKind, Result};
use crate::report::{BookReport, Outcome, Report};
use crate::state::BookState;
use coverup_calibre::{Book, Library, Selection};
use coverup_storage::{BackendHandle, Object};
use coverup_thumbnail::{Generator, Planned, Resolution, destination_key};
use coverup_tracking::{Repository, UploadRecord};
use exn::ResultExt;

fn storage_reason(err: &coverup_storage::error::Error) -> String {
    let kind: &coverup_storage::error::ErrorKind = err;
    kind.to_string()
}

/// How a run behaves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Options {
    /// Work out what would be uploaded without encoding, uploading or
    /// recording anything.
    pub dry_run: bool,
    /// Upload every resolution regardless of existing tracking records.
    pub force: bool,
    /// Check tracked objects still exist before trusting their records.
    pub verify: bool,
}

/// Drives a run from library to object store.
pub struct Uploader {
    library: Library,
    tracking: Repository,
    backend: BackendHandle,
    generator: Generator,
    cache_control: Option<String>,
    options: Options,
}

impl Uploader {
    pub fn new(library: Library, tracking: Repository, backend: BackendHandle, options: Options) -> Self {
        Self {
            library,
            tracking,
            backend,
            generator: Generator::default(),
            cache_control: None,
            options,
        }
    }

    pub fn with_generator(mut self, generator: Generator) -> Self {
        self.generator = generator;
        self
    }

    /// `Cache-Control` header sent with every upload.
    pub fn with_cache_control(mut self, cache_control: impl Into<String>) -> Self {
        self.cache_control = Some(cache_control.into());
        self
    }

    /// Process every selected book and report what happened.
    ///
    /// Failures limited to one book are recorded in the [`Report`] and the run
    /// continues. An error is only returned when the run cannot continue: the
    /// library or tracking store is unusable, or the object store rejected the
    /// credentials.
    pub async fn run(&self, selection: Selection) -> Result<Report> {
        let mut report = Report::new(self.options.dry_run);
        self.run_into(selection, &mut report).await?;
        Ok(report)
    }

    /// Same as [`run`](Self::run), but books are added to a report owned by
    /// the caller, which keeps every book finished before a fatal error.
    pub async fn run_into(&self, selection: Selection, report: &mut Report) -> Result<()> {
        if !self.options.dry_run {
            // Surface bad credentials or a missing bucket before touching any book.
            if let Err(e) = self.backend.check().await {
                let reason = storage_reason(&e);
                return Err(e).or_raise(|| ErrorKind::Storage(reason));
            }
        }
        let books = self.library.list_books(selection).await.or_raise(|| ErrorKind::Library)?;
        tracing::info!(%selection, books = books.len(), dry_run = self.options.dry_run, "Processing books with covers");

        for book in books {
            match self.process(&book).await {
                Ok(mut book_report) => {
                    book_report.resolutions.sort_by_key(|r| r.resolution);
                    report.books.push(book_report);
                },
                Err(e) => {
                    let kind: &ErrorKind = &e;
                    tracing::error!(book_id = book.id, error = %kind, completed = report.books.len(), "Aborting run");
                    return Err(e);
                },
            }
        }
        Ok(())
    }

    async fn process(&self, book: &Book) -> Result<BookReport> {
        let mut report = BookReport::new(book.id, &book.title);
        let uploaded = self.uploaded(book, &mut report).await?;
        let missing: Vec<Resolution> =
            Resolution::ALL.into_iter().filter(|r| self.options.force || !uploaded.contains(r)).collect();
        for resolution in Resolution::ALL.into_iter().filter(|r| !missing.contains(r)) {
            report.push(resolution, destination_key(book.id, resolution), Outcome::AlreadyUploaded);
        }
        if missing.is_empty() {
            tracing::debug!(book_id = book.id, "Every resolution already uploaded");
            report.transition(BookState::Skipped);
            return Ok(report);
        }

        let bytes = match self.library.read_cover(book).await {
            Ok(bytes) => bytes,
            Err(e) => {
                let kind: &coverup_calibre::error::ErrorKind = &e;
                let reason = kind.to_string();
                tracing::warn!(book_id = book.id, %reason, "Skipping book");
                report.transition(BookState::Failed(reason));
                return Ok(report);
            },
        };
        // The header alone decides which missing resolutions can be produced.
        let source = match self.generator.inspect(&bytes) {
            Ok(source) => source,
            Err(e) => {
                let kind: &coverup_thumbnail::error::ErrorKind = &e;
                let reason = kind.to_string();
                tracing::warn!(book_id = book.id, %reason, "Skipping book");
                report.transition(BookState::Failed(reason));
                return Ok(report);
            },
        };
        let (produce, too_small): (Vec<Planned>, Vec<Planned>) =
            self.generator.plan(&source, &missing).into_iter().partition(Planned::is_produced);
        for planned in too_small {
            let resolution = planned.resolution();
            tracing::debug!(book_id = book.id, %resolution, "Cover too small, not upscaling");
            report.push(resolution, destination_key(book.id, resolution), Outcome::TooSmall);
        }
        if produce.is_empty() {
            tracing::debug!(book_id = book.id, "Every resolution the cover can produce is already uploaded");
            report.transition(BookState::Skipped);
            return Ok(report);
        }

        if self.options.dry_run {
            self.plan(book, &produce, &mut report);
            return Ok(report);
        }
        report.transition(BookState::Uploading);
        self.upload(book, bytes, &produce, &mut report).await?;
        Ok(report)
    }

    /// Resolutions with a trusted tracking record.
    ///
    /// In verify mode, records whose object has disappeared are dropped (and
    /// deleted, outside of dry runs) so the resolution is uploaded again.
    async fn uploaded(&self, book: &Book, report: &mut BookReport) -> Result<Vec<Resolution>> {
        let mut uploaded = self.tracking.uploaded_resolutions(book.id).await.or_raise(|| ErrorKind::Tracking)?;
        if !self.options.verify {
            return Ok(uploaded);
        }
        let mut trusted = Vec::with_capacity(uploaded.len());
        for resolution in uploaded.drain(..) {
            let key = destination_key(book.id, resolution);
            match self.backend.exists(&key).await {
                Ok(true) => trusted.push(resolution),
                Ok(false) => {
                    tracing::info!(book_id = book.id, %resolution, %key, "Tracked object is missing, will upload again");
                    if !self.options.dry_run {
                        self.tracking.delete(book.id, resolution).await.or_raise(|| ErrorKind::Tracking)?;
                    }
                    report.stale.push(resolution);
                },
                Err(e) if e.is_fatal() => {
                    let reason = storage_reason(&e);
                    return Err(e).or_raise(|| ErrorKind::Storage(reason));
                },
                // Can't tell; keep trusting the record.
                Err(e) => {
                    let kind: &coverup_storage::error::ErrorKind = &e;
                    tracing::warn!(book_id = book.id, %resolution, error = %kind, "Could not verify object");
                    trusted.push(resolution);
                },
            }
        }
        Ok(trusted)
    }

    /// Dry run: report what would be uploaded, without encoding anything.
    fn plan(&self, book: &Book, produce: &[Planned], report: &mut BookReport) {
        for planned in produce {
            let resolution = planned.resolution();
            if let Planned::Produce { width, height, .. } = *planned {
                tracing::info!(book_id = book.id, %resolution, width, height, "Planned");
                report.push(resolution, destination_key(book.id, resolution), Outcome::Planned { width, height });
            }
        }
        report.transition(BookState::Planned);
    }

    async fn upload(&self, book: &Book, bytes: Vec<u8>, produce: &[Planned], report: &mut BookReport) -> Result<()> {
        let generator = self.generator;
        let wanted: Vec<Resolution> = produce.iter().map(Planned::resolution).collect();
        let targets = wanted.clone();
        let variants = match tokio::task::spawn_blocking(move || generator.generate(&bytes, &targets)).await {
            Ok(Ok(variants)) => variants,
            Ok(Err(e)) => {
                let kind: &coverup_thumbnail::error::ErrorKind = &e;
                tracing::warn!(book_id = book.id, error = %kind, "Could not generate thumbnails");
                report.transition(BookState::Failed(kind.to_string()));
                return Ok(());
            },
            Err(e) => {
                tracing::error!(book_id = book.id, error = %e, "Thumbnail generation panicked");
                report.transition(BookState::Failed("thumbnail generation panicked".to_string()));
                return Ok(());
            },
        };

        for resolution in wanted {
            let key = destination_key(book.id, resolution);
            let Some(variant) = variants.iter().find(|v| v.resolution == resolution) else {
                tracing::debug!(book_id = book.id, %resolution, "Cover too small, not upscaling");
                report.push(resolution, key, Outcome::TooSmall);
                continue;
            };
            let mut object = Object::new(variant.bytes.clone(), variant.content_type);
            if let Some(cache_control) = &self.cache_control {
                object = object.with_cache_control(cache_control.as_str());
            }
            match self.backend.put(&key, object).await {
                Ok(receipt) => {
                    let record =
                        UploadRecord::new(book.id, resolution, receipt.key, receipt.size).with_etag(receipt.etag.clone());
                    // Only ever recorded after the object store acknowledged the upload.
                    self.tracking.record_upload(&record).await.or_raise(|| ErrorKind::Tracking)?;
                    tracing::info!(book_id = book.id, %resolution, %key, bytes = receipt.size, "Uploaded");
                    report.push(resolution, key, Outcome::Uploaded { size: receipt.size, etag: receipt.etag });
                },
                Err(e) if e.is_fatal() => {
                    let reason = storage_reason(&e);
                    return Err(e).or_raise(|| ErrorKind::Storage(reason));
                },
                Err(e) => {
                    let kind: &coverup_storage::error::ErrorKind = &e;
                    tracing::warn!(book_id = book.id, %resolution, %key, error = %kind, "Upload failed");
                    report.push(resolution, key, Outcome::Failed(kind.to_string()));
                },
            }
        }

        let failures = report.failure_reasons();
        if failures.is_empty() {
            tracing::info!(book_id = book.id, uploaded = report.uploaded(), "Book done");
            report.transition(BookState::Done);
        } else {
            report.transition(BookState::Failed(failures.join("; ")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coverup_storage::backend::{MockBackend, RetryBackend, RetryPolicy};
    use coverup_storage::error::ErrorKind as StorageErrorKind;
    use coverup_tracking::Database;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
    use std::io::Cursor;
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    enum Cover {
        Jpeg(u32, u32),
        Corrupt,
        Missing,
    }

    struct Fixture {
        _dir: TempDir,
        library: Library,
        db: Database,
        backend: Arc<MockBackend>,
    }

    impl Fixture {
        async fn new(books: &[(i64, Cover)]) -> Self {
            let dir = tempfile::tempdir().unwrap();
            create_library(dir.path(), books).await;
            Self {
                library: Library::open(dir.path()).await.unwrap(),
                db: Database::connect_in_memory().await.unwrap(),
                backend: Arc::new(MockBackend::default()),
                _dir: dir,
            }
        }

        fn uploader(&self, options: Options) -> Uploader {
            let backend: BackendHandle = self.backend.clone();
            self.uploader_with(backend, options)
        }

        fn uploader_with(&self, backend: BackendHandle, options: Options) -> Uploader {
            let tracking = Repository::new(self.db.pool().clone(), options.dry_run);
            Uploader::new(self.library.clone(), tracking, backend, options).with_cache_control("public, max-age=31536000")
        }

        fn repo(&self) -> Repository {
            Repository::from(&self.db)
        }
    }

    async fn create_library(root: &Path, books: &[(i64, Cover)]) {
        let options = SqliteConnectOptions::new().filename(root.join("metadata.db")).create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await.unwrap();
        sqlx::query("CREATE TABLE books (id INTEGER PRIMARY KEY, title TEXT NOT NULL, path TEXT NOT NULL, has_cover BOOL)")
            .execute(&pool)
            .await
            .unwrap();
        for (id, cover) in books {
            let path = format!("Author/Book ({id})");
            sqlx::query("INSERT INTO books (id, title, path, has_cover) VALUES (?, ?, ?, 1)")
                .bind(id)
                .bind(format!("Book {id}"))
                .bind(&path)
                .execute(&pool)
                .await
                .unwrap();
            let cover_path = root.join(&path).join("cover.jpg");
            std::fs::create_dir_all(cover_path.parent().unwrap()).unwrap();
            match cover {
                Cover::Jpeg(width, height) => std::fs::write(&cover_path, jpeg(*width, *height)).unwrap(),
                Cover::Corrupt => std::fs::write(&cover_path, b"not an image").unwrap(),
                Cover::Missing => (),
            }
        }
        pool.close().await;
    }

    fn jpeg(width: u32, height: u32) -> Vec<u8> {
        let image = RgbImage::from_pixel(width, height, Rgb([90, 120, 200]));
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(image).write_to(&mut buffer, ImageFormat::Jpeg).unwrap();
        buffer.into_inner()
    }

    fn live() -> Options {
        Options::default()
    }

    #[tokio::test]
    async fn test_first_run_uploads_every_resolution() {
        let fixture = Fixture::new(&[(59, Cover::Jpeg(1000, 1500))]).await;
        let report = fixture.uploader(live()).run(Selection::All).await.unwrap();

        assert_eq!(fixture.backend.put_calls(), 4);
        assert_eq!(
            fixture.backend.keys(),
            vec![
                "cw-cover/59/cover.jpg",
                "cw-cover/59/cover_lg.jpg",
                "cw-cover/59/cover_md.jpg",
                "cw-cover/59/cover_sm.jpg",
            ]
        );
        assert_eq!(fixture.repo().count().await.unwrap(), 4);
        assert_eq!(report.books_processed(), 1);
        assert_eq!(report.resolutions_uploaded(), 4);
        assert_eq!(report.books[0].state, BookState::Done);

        let small = fixture.backend.get("cw-cover/59/cover_sm.jpg").unwrap();
        assert_eq!(small.content_type, "image/jpeg");
        assert_eq!(small.cache_control.as_deref(), Some("public, max-age=31536000"));
        let record = fixture.repo().get(59, Resolution::Small).await.unwrap().unwrap();
        assert_eq!(record.key, "cw-cover/59/cover_sm.jpg");
        assert_eq!(record.size, small.len());
        assert!(record.etag.is_some());
    }

    #[tokio::test]
    async fn test_second_run_skips_uploaded_book() {
        let fixture = Fixture::new(&[(59, Cover::Jpeg(1000, 1500))]).await;
        fixture.uploader(live()).run(Selection::All).await.unwrap();
        let report = fixture.uploader(live()).run(Selection::All).await.unwrap();

        assert_eq!(fixture.backend.put_calls(), 4);
        assert_eq!(report.books_skipped(), 1);
        assert_eq!(report.resolutions_uploaded(), 0);
        assert_eq!(report.resolutions_skipped(), 4);
    }

    #[tokio::test]
    async fn test_force_uploads_everything_again() {
        let fixture = Fixture::new(&[(59, Cover::Jpeg(1000, 1500))]).await;
        fixture.uploader(live()).run(Selection::All).await.unwrap();
        let report = fixture.uploader(Options { force: true, ..live() }).run(Selection::All).await.unwrap();

        assert_eq!(fixture.backend.put_calls(), 8);
        assert_eq!(report.resolutions_uploaded(), 4);
        // Upserted, not duplicated.
        assert_eq!(fixture.repo().count().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_only_missing_resolutions_are_uploaded() {
        let fixture = Fixture::new(&[(59, Cover::Jpeg(1000, 1500))]).await;
        let record = UploadRecord::new(59, Resolution::Medium, destination_key(59, Resolution::Medium), 1);
        fixture.repo().record_upload(&record).await.unwrap();

        let report = fixture.uploader(live()).run(Selection::All).await.unwrap();
        assert_eq!(fixture.backend.put_calls(), 3);
        assert!(!fixture.backend.contains("cw-cover/59/cover_md.jpg"));
        let outcomes: Vec<_> = report.books[0].resolutions.iter().map(|r| (r.resolution, &r.outcome)).collect();
        assert_eq!(outcomes[2], (Resolution::Medium, &Outcome::AlreadyUploaded));
        assert_eq!(report.books[0].resolutions[0].resolution, Resolution::Original);
    }

    #[rstest::rstest]
    #[case(Options { dry_run: true, force: false, verify: false })]
    #[case(Options { dry_run: true, force: true, verify: false })]
    #[case(Options { dry_run: true, force: true, verify: true })]
    #[tokio::test]
    async fn test_dry_run_has_no_side_effects(#[case] options: Options) {
        let fixture = Fixture::new(&[(59, Cover::Jpeg(1000, 1500)), (60, Cover::Jpeg(150, 150))]).await;
        // Even an unusable backend is never contacted.
        fixture.backend.fail_check(StorageErrorKind::PermissionDenied("AccessDenied".to_string()));
        let report = fixture.uploader(options).run(Selection::All).await.unwrap();

        assert_eq!(fixture.backend.put_calls(), 0);
        assert_eq!(fixture.repo().count().await.unwrap(), 0);
        assert!(report.dry_run);
        assert_eq!(report.resolutions_planned(), 5);
        assert_eq!(report.resolutions_too_small(), 3);
        assert_eq!(report.books[0].state, BookState::Planned);
        assert_eq!(
            report.books[0].resolutions[1].outcome,
            Outcome::Planned { width: 133, height: 200 }
        );
    }

    #[tokio::test]
    async fn test_unknown_book_is_an_empty_run() {
        let fixture = Fixture::new(&[(59, Cover::Jpeg(1000, 1500))]).await;
        let report = fixture.uploader(live()).run(Selection::Book(42)).await.unwrap();
        assert_eq!(report.books_processed(), 0);
        assert_eq!(report.books_failed(), 0);
        assert_eq!(fixture.backend.put_calls(), 0);
    }

    #[tokio::test]
    async fn test_single_book_selection() {
        let fixture = Fixture::new(&[(59, Cover::Jpeg(1000, 1500)), (60, Cover::Jpeg(1000, 1500))]).await;
        let report = fixture.uploader(live()).run(Selection::Book(60)).await.unwrap();
        assert_eq!(report.books_processed(), 1);
        assert!(fixture.backend.keys().iter().all(|key| key.starts_with("cw-cover/60/")));
    }

    #[tokio::test]
    async fn test_auth_failure_aborts_run() {
        let fixture = Fixture::new(&[(59, Cover::Jpeg(1000, 1500)), (60, Cover::Jpeg(1000, 1500))]).await;
        fixture.backend.fail_next(StorageErrorKind::PermissionDenied("InvalidAccessKeyId".to_string()));
        let err = fixture.uploader(live()).run(Selection::All).await.unwrap_err();

        assert!(matches!(&*err, ErrorKind::Storage(_)), "{err:?}");
        // No further upload, of this book or the next, was attempted.
        assert_eq!(fixture.backend.put_calls(), 1);
        assert_eq!(fixture.repo().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_preflight_failure_aborts_before_any_book() {
        let fixture = Fixture::new(&[(59, Cover::Jpeg(1000, 1500))]).await;
        fixture.backend.fail_check(StorageErrorKind::NotFound("NoSuchBucket".to_string()));
        let err = fixture.uploader(live()).run(Selection::All).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Storage(_)), "{err:?}");
        assert_eq!(fixture.backend.put_calls(), 0);
    }

    #[tokio::test]
    async fn test_transient_failure_is_per_resolution() {
        let fixture = Fixture::new(&[(59, Cover::Jpeg(1000, 1500)), (60, Cover::Jpeg(1000, 1500))]).await;
        // Consumed by the first upload, which is the original.
        fixture.backend.fail_next(StorageErrorKind::Network("connection reset".to_string()));
        let report = fixture.uploader(live()).run(Selection::Book(59)).await.unwrap();
        let book = &report.books[0];
        assert!(matches!(&book.state, BookState::Failed(reason) if reason.contains("original: network error")));
        // The other resolutions of the same book were still uploaded and recorded.
        assert_eq!(report.resolutions_uploaded(), 3);
        assert_eq!(fixture.repo().uploaded_resolutions(59).await.unwrap().len(), 3);
        assert_eq!(report.failures().len(), 1);

        // The next run only uploads what is missing, and carries on to other books.
        let report = fixture.uploader(live()).run(Selection::All).await.unwrap();
        assert_eq!(report.books[0].uploaded(), 1);
        assert_eq!(report.books[1].uploaded(), 4);
        assert_eq!(report.books_failed(), 0);
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let fixture = Fixture::new(&[(59, Cover::Jpeg(1000, 1500))]).await;
        fixture.backend.fail_next(StorageErrorKind::Throttled("SlowDown".to_string()));
        fixture.backend.fail_next(StorageErrorKind::Network("timed out".to_string()));
        let inner: BackendHandle = fixture.backend.clone();
        let policy = RetryPolicy { attempts: 3, backoff: Duration::ZERO };
        let backend: BackendHandle = Arc::new(RetryBackend::new(inner, policy));

        let report = fixture.uploader_with(backend, live()).run(Selection::All).await.unwrap();
        assert_eq!(report.books_failed(), 0);
        assert_eq!(report.resolutions_uploaded(), 4);
        assert_eq!(fixture.backend.put_calls(), 6);
    }

    #[tokio::test]
    async fn test_small_cover_is_not_upscaled() {
        let fixture = Fixture::new(&[(7, Cover::Jpeg(150, 150))]).await;
        let report = fixture.uploader(live()).run(Selection::All).await.unwrap();
        assert_eq!(fixture.backend.keys(), vec!["cw-cover/7/cover.jpg"]);
        assert_eq!(report.resolutions_too_small(), 3);
        assert_eq!(report.books[0].state, BookState::Done);
    }

    #[tokio::test]
    async fn test_small_cover_rerun_is_skipped() {
        let fixture = Fixture::new(&[(7, Cover::Jpeg(150, 150))]).await;
        fixture.uploader(live()).run(Selection::All).await.unwrap();
        let report = fixture.uploader(live()).run(Selection::All).await.unwrap();

        assert_eq!(fixture.backend.put_calls(), 1);
        assert_eq!(report.books_skipped(), 1);
        assert_eq!(report.books[0].state, BookState::Skipped);
        assert_eq!(report.resolutions_skipped(), 1);
        assert_eq!(report.resolutions_too_small(), 3);

        let report = fixture.uploader(Options { dry_run: true, ..live() }).run(Selection::All).await.unwrap();
        assert_eq!(report.books_skipped(), 1);
        assert_eq!(report.resolutions_planned(), 0);
    }

    #[tokio::test]
    async fn test_auth_failure_keeps_finished_books() {
        let fixture = Fixture::new(&[(59, Cover::Jpeg(1000, 1500)), (60, Cover::Jpeg(1000, 1500))]).await;
        fixture.uploader(live()).run(Selection::Book(59)).await.unwrap();
        fixture.backend.fail_next(StorageErrorKind::PermissionDenied("InvalidAccessKeyId".to_string()));

        let mut report = Report::new(false);
        let err = fixture.uploader(live()).run_into(Selection::All, &mut report).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Storage(_)), "{err:?}");
        assert_eq!(report.books_processed(), 1);
        assert_eq!(report.books[0].book_id, 59);
        assert_eq!(report.books_skipped(), 1);
        assert!(report.to_string().contains("Books processed:      1"));
    }

    #[tokio::test]
    async fn test_bad_covers_fail_only_their_book() {
        let fixture =
            Fixture::new(&[(1, Cover::Missing), (2, Cover::Corrupt), (3, Cover::Jpeg(500, 300))]).await;
        let report = fixture.uploader(live()).run(Selection::All).await.unwrap();

        assert_eq!(report.books_processed(), 3);
        assert_eq!(report.books_failed(), 2);
        let failures = report.failures();
        assert_eq!(failures[0].0, 1);
        assert!(failures[0].1.starts_with("cover file not found"));
        assert_eq!(failures[1], (2, "could not decode image"));
        // No record for anything that wasn't uploaded.
        assert!(fixture.repo().uploaded_resolutions(1).await.unwrap().is_empty());
        assert!(fixture.repo().uploaded_resolutions(2).await.unwrap().is_empty());
        assert_eq!(fixture.repo().uploaded_resolutions(3).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_verify_reuploads_stale_records() {
        let fixture = Fixture::new(&[(59, Cover::Jpeg(1000, 1500))]).await;
        fixture.uploader(live()).run(Selection::All).await.unwrap();
        assert!(fixture.backend.remove("cw-cover/59/cover_sm.jpg"));

        // Without verify the record is trusted.
        let report = fixture.uploader(live()).run(Selection::All).await.unwrap();
        assert_eq!(report.books_skipped(), 1);

        // A dry run reports the stale record but keeps it.
        let report = fixture.uploader(Options { dry_run: true, verify: true, ..live() }).run(Selection::All).await.unwrap();
        assert_eq!(report.stale_records(), 1);
        assert_eq!(report.resolutions_planned(), 1);
        assert!(fixture.repo().is_uploaded(59, Resolution::Small).await.unwrap());

        let report = fixture.uploader(Options { verify: true, ..live() }).run(Selection::All).await.unwrap();
        assert_eq!(report.books[0].stale, vec![Resolution::Small]);
        assert_eq!(report.resolutions_uploaded(), 1);
        assert_eq!(fixture.backend.put_calls(), 5);
        assert!(fixture.backend.contains("cw-cover/59/cover_sm.jpg"));
    }
}
