mod cli;

use crate::cli::Cli;
use clap::Parser;
use coverup_calibre::Library;
use coverup_config::Config;
use coverup_pipeline::{Outcome, Report, Uploader};
use coverup_storage::BackendHandle;
use coverup_storage::backend::{RetryBackend, RetryPolicy, S3Backend};
use coverup_thumbnail::Generator;
use coverup_tracking::{Database, Repository};
use std::fmt::{Debug, Display};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const CRATES: &[&str] = &[
    "coverup",
    "coverup_calibre",
    "coverup_config",
    "coverup_pipeline",
    "coverup_storage",
    "coverup_thumbnail",
    "coverup_tracking",
];

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    // Dependencies stay at `warn` unless asked for through `RUST_LOG`.
    let directives: Vec<String> =
        std::iter::once("warn".to_string()).chain(CRATES.iter().map(|krate| format!("{krate}={level}"))).collect();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives.join(","))))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Log the full error tree, tell the user what went wrong, and exit non-zero.
fn fatal(kind: &impl Display, err: &impl Debug) -> ExitCode {
    tracing::debug!("{err:?}");
    eprintln!("error: {kind}");
    ExitCode::FAILURE
}

fn backend(config: &Config) -> coverup_storage::error::Result<BackendHandle> {
    let s3 = S3Backend::new(
        "s3",
        &config.s3.bucket,
        config.s3.prefix.clone(),
        &config.s3.region,
        config.s3.endpoint.as_deref(),
        &config.s3.access_key,
        &config.s3.secret_key,
        config.upload.timeout,
    )?;
    let policy = RetryPolicy { attempts: config.upload.attempts, backoff: config.upload.backoff };
    Ok(Arc::new(RetryBackend::new(Arc::new(s3), policy)))
}

/// Every uploaded (or, in a dry run, planned) object with its public URL.
fn print_objects(report: &Report, config: &Config) {
    for book in &report.books {
        for resolution in &book.resolutions {
            let verb = match resolution.outcome {
                Outcome::Uploaded { .. } => "uploaded",
                Outcome::Planned { .. } => "would upload",
                _ => continue,
            };
            println!("book {} {:<8} {verb} {}", book.book_id, resolution.resolution, config.s3.public_url(&resolution.key));
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match Config::load(cli.config.as_deref(), &cli.overrides()) {
        Ok(config) => config,
        Err(e) => {
            let kind: &coverup_config::error::ErrorKind = &e;
            return fatal(kind, &e);
        },
    };
    tracing::debug!(?config, "Loaded configuration");
    let options = cli.options();

    let library = match Library::open(&config.library).await {
        Ok(library) => library,
        Err(e) => {
            let kind: &coverup_calibre::error::ErrorKind = &e;
            return fatal(kind, &e);
        },
    };
    let location = config.tracking_location();
    tracing::debug!(path = %location.path.display(), exists = location.exists, "Tracking database location");
    let db = match Database::open(&location.path, options.dry_run).await {
        Ok(db) => db,
        Err(e) => {
            let kind: &coverup_tracking::error::ErrorKind = &e;
            return fatal(kind, &e);
        },
    };
    let backend = match backend(&config) {
        Ok(backend) => backend,
        Err(e) => {
            let kind: &coverup_storage::error::ErrorKind = &e;
            return fatal(kind, &e);
        },
    };

    let tracking = Repository::new(db.pool().clone(), options.dry_run);
    let uploader = Uploader::new(library.clone(), tracking, backend, options)
        .with_generator(Generator::new(config.thumbnail.quality))
        .with_cache_control(&config.upload.cache_control);
    let mut report = Report::new(options.dry_run);
    let result = uploader.run_into(cli.selection(), &mut report).await;
    db.close().await;
    library.close().await;

    // Includes the books finished before a fatal error.
    if result.is_ok() || !report.books.is_empty() {
        if options.dry_run || cli.verbose > 0 {
            print_objects(&report, &config);
        }
        print!("{report}");
    }
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let kind: &coverup_pipeline::error::ErrorKind = &e;
            fatal(kind, &e)
        },
    }
}
