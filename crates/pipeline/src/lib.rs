//! The upload pipeline.
//!
//! For every selected book the [`Uploader`] works out which resolutions are
//! missing from the tracking store, generates them from the book's cover,
//! uploads each one and records it. Books are processed one at a time, and a
//! book's resolutions in [`Resolution::ALL`](coverup_thumbnail::Resolution::ALL)
//! order.

pub mod error;
mod report;
mod state;
mod uploader;

pub use crate::report::{BookReport, Outcome, Report, ResolutionReport};
pub use crate::state::BookState;
pub use crate::uploader::{Options, Uploader};
