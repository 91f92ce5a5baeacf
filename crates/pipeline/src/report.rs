use crate::BookState;
use coverup_thumbnail::Resolution;
use std::fmt;

/// What happened to one resolution of one book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Uploaded { size: u64, etag: Option<String> },
    /// Dry run: would have been uploaded.
    Planned { width: u32, height: u32 },
    /// A tracking record exists and `force` was not set.
    AlreadyUploaded,
    /// The source is not larger than the target, so nothing is produced.
    TooSmall,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionReport {
    pub resolution: Resolution,
    /// Object key, relative to the backend's prefix.
    pub key: String,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookReport {
    pub book_id: u64,
    pub title: String,
    pub state: BookState,
    pub resolutions: Vec<ResolutionReport>,
    /// Tracking records found to point at missing objects (verify mode).
    pub stale: Vec<Resolution>,
}

impl BookReport {
    pub(crate) fn new(book_id: u64, title: impl Into<String>) -> Self {
        Self {
            book_id,
            title: title.into(),
            state: BookState::Pending,
            resolutions: Vec::new(),
            stale: Vec::new(),
        }
    }

    /// Move to the next state, logging the change.
    pub(crate) fn transition(&mut self, next: BookState) {
        if !self.state.can_transition_to(&next) {
            tracing::warn!(book_id = self.book_id, from = %self.state, to = %next, "Unexpected book state transition");
        }
        tracing::trace!(book_id = self.book_id, from = %self.state, to = %next, "Book state changed");
        self.state = next;
    }

    pub(crate) fn push(&mut self, resolution: Resolution, key: impl Into<String>, outcome: Outcome) {
        self.resolutions.push(ResolutionReport { resolution, key: key.into(), outcome });
    }

    fn count(&self, predicate: impl Fn(&Outcome) -> bool) -> usize {
        self.resolutions.iter().filter(|r| predicate(&r.outcome)).count()
    }

    pub fn uploaded(&self) -> usize {
        self.count(|outcome| matches!(outcome, Outcome::Uploaded { .. }))
    }

    /// Failures of individual resolutions, as `resolution: reason`.
    pub(crate) fn failure_reasons(&self) -> Vec<String> {
        self.resolutions
            .iter()
            .filter_map(|r| match &r.outcome {
                Outcome::Failed(reason) => Some(format!("{}: {reason}", r.resolution)),
                _ => None,
            })
            .collect()
    }
}

/// The final report of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub dry_run: bool,
    pub books: Vec<BookReport>,
}

impl Report {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run, books: Vec::new() }
    }

    fn resolutions(&self, predicate: impl Fn(&Outcome) -> bool) -> usize {
        self.books.iter().map(|book| book.count(&predicate)).sum()
    }

    fn books_in(&self, predicate: impl Fn(&BookState) -> bool) -> usize {
        self.books.iter().filter(|book| predicate(&book.state)).count()
    }

    /// Every book the library returned for the selection.
    pub fn books_processed(&self) -> usize {
        self.books.len()
    }

    pub fn books_skipped(&self) -> usize {
        self.books_in(|state| matches!(state, BookState::Skipped))
    }

    pub fn books_failed(&self) -> usize {
        self.books_in(|state| matches!(state, BookState::Failed(_)))
    }

    pub fn resolutions_uploaded(&self) -> usize {
        self.resolutions(|outcome| matches!(outcome, Outcome::Uploaded { .. }))
    }

    pub fn resolutions_planned(&self) -> usize {
        self.resolutions(|outcome| matches!(outcome, Outcome::Planned { .. }))
    }

    /// Resolutions not uploaded because a tracking record already exists.
    pub fn resolutions_skipped(&self) -> usize {
        self.resolutions(|outcome| matches!(outcome, Outcome::AlreadyUploaded))
    }

    pub fn resolutions_too_small(&self) -> usize {
        self.resolutions(|outcome| matches!(outcome, Outcome::TooSmall))
    }

    pub fn stale_records(&self) -> usize {
        self.books.iter().map(|book| book.stale.len()).sum()
    }

    /// Failed books with the reason they failed.
    pub fn failures(&self) -> Vec<(u64, &str)> {
        self.books
            .iter()
            .filter_map(|book| match &book.state {
                BookState::Failed(reason) => Some((book.book_id, reason.as_str())),
                _ => None,
            })
            .collect()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dry_run {
            writeln!(f, "Dry run: nothing was uploaded or recorded.")?;
        }
        writeln!(f, "Books processed:      {}", self.books_processed())?;
        writeln!(f, "Books skipped:        {}", self.books_skipped())?;
        writeln!(f, "Books failed:         {}", self.books_failed())?;
        if self.dry_run {
            writeln!(f, "Resolutions planned:  {}", self.resolutions_planned())?;
        } else {
            writeln!(f, "Resolutions uploaded: {}", self.resolutions_uploaded())?;
        }
        writeln!(f, "Resolutions skipped:  {}", self.resolutions_skipped())?;
        writeln!(f, "Resolutions too small: {}", self.resolutions_too_small())?;
        if self.stale_records() > 0 {
            writeln!(f, "Stale records:        {}", self.stale_records())?;
        }
        let failures = self.failures();
        if !failures.is_empty() {
            writeln!(f, "Failures:")?;
            for (book_id, reason) in failures {
                writeln!(f, "  book {book_id}: {reason}")?;
            }
        }
        Ok(())
    }
}
