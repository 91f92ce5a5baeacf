use clap::{ArgGroup, Parser};
use coverup_calibre::Selection;
use coverup_config::Overrides;
use coverup_pipeline::Options;
use std::path::PathBuf;

/// Migrate Calibre cover images, and thumbnails generated from them, to
/// S3-compatible object storage.
///
/// Object store settings may also come from the environment (`S3_BUCKET`,
/// `S3_REGION`, `S3_ACCESS_KEY`, `S3_SECRET_KEY`, `S3_ENDPOINT`, `S3_PREFIX`,
/// `S3_CDN_URL`) or a configuration file. Flags win over both.
#[derive(Debug, Parser)]
#[command(name = "coverup", version, about)]
#[command(group(ArgGroup::new("selection").required(true).args(["all", "book_id"])))]
pub struct Cli {
    /// Calibre library root, the directory containing `metadata.db` [default: ~/calibre-web]
    #[arg(short, long, value_name = "PATH")]
    pub library: Option<PathBuf>,

    /// Process every book that has a cover.
    #[arg(long)]
    pub all: bool,

    /// Process a single book.
    #[arg(long, value_name = "ID")]
    pub book_id: Option<u64>,

    /// Show what would be uploaded without uploading or recording anything.
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Upload every resolution, even those already recorded as uploaded.
    #[arg(short, long)]
    pub force: bool,

    /// Check that tracked objects still exist; re-upload any that don't.
    #[arg(long)]
    pub verify: bool,

    #[arg(long, value_name = "BUCKET")]
    pub s3_bucket: Option<String>,

    #[arg(long, value_name = "REGION")]
    pub s3_region: Option<String>,

    #[arg(long, value_name = "KEY")]
    pub s3_access_key: Option<String>,

    #[arg(long, value_name = "SECRET")]
    pub s3_secret_key: Option<String>,

    /// Endpoint URL of an S3-compatible service (MinIO, Backblaze B2, ...).
    #[arg(long, value_name = "URL")]
    pub s3_endpoint: Option<String>,

    /// Prefix prepended to every object key.
    #[arg(long, value_name = "PREFIX")]
    pub s3_prefix: Option<String>,

    /// Tracking database [default: first existing of ./config/app.db,
    /// ~/calibre-web-automated/config/app.db, <exe dir>/config/app.db]
    #[arg(long, value_name = "PATH")]
    pub tracking_db: Option<PathBuf>,

    /// Configuration file (TOML, YAML or JSON).
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// More logging (-v debug, -vv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn selection(&self) -> Selection {
        match self.book_id {
            Some(id) => Selection::Book(id),
            None => Selection::All,
        }
    }

    pub fn options(&self) -> Options {
        Options { dry_run: self.dry_run, force: self.force, verify: self.verify }
    }

    pub fn overrides(&self) -> Overrides {
        Overrides {
            library: self.library.clone(),
            tracking: self.tracking_db.clone(),
            bucket: self.s3_bucket.clone(),
            region: self.s3_region.clone(),
            access_key: self.s3_access_key.clone(),
            secret_key: self.s3_secret_key.clone(),
            endpoint: self.s3_endpoint.clone(),
            prefix: self.s3_prefix.clone(),
        }
    }
}
