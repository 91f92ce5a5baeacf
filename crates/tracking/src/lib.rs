//! SQLite tracking database for uploaded covers.
//!
//! This crate provides the durable record of which (book, resolution) pairs
//! have been uploaded to object storage. Unlike the object store itself, the
//! tracking database is the source of truth for "already uploaded": nothing is
//! ever read back from the bucket to make that decision.
//!
//! Records are upserted, so writing the same (book, resolution) twice leaves a
//! single row describing the latest upload.

mod db;
pub mod error;
mod models;
mod repo;

pub use crate::db::Database;
pub use crate::models::{STATUS_UPLOADED, UploadRecord};
pub use crate::repo::Repository;
