//! Read-only access to a Calibre library.
//!
//! A Calibre library is a directory holding `metadata.db` (owned by Calibre)
//! and one directory per book. This crate never writes to either: the
//! database is opened with `SQLITE_OPEN_READONLY` and cover files are only
//! ever read.

pub mod error;
mod library;
mod models;

pub use crate::library::{Library, METADATA_FILENAME};
pub use crate::models::{Book, COVER_FILENAME, Selection};
