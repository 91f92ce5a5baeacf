use derive_more::Display;

/// Where a book is in the pipeline.
///
/// ```text
/// Pending ─┬─> Skipped
///          ├─> Planned                      (dry run)
///          └─> Uploading ─┬─> Done
///                         └─> Failed
/// Pending ───> Failed                       (cover unreadable)
/// ```
#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum BookState {
    #[display("pending")]
    Pending,
    /// Every resolution the cover can produce already has a tracking record.
    #[display("skipped")]
    Skipped,
    /// Dry run: the resolutions that would be uploaded have been worked out.
    #[display("planned")]
    Planned,
    #[display("uploading")]
    Uploading,
    /// All resolutions were uploaded, already present, or too small to produce.
    #[display("done")]
    Done,
    #[display("failed: {_0}")]
    Failed(String),
}

impl BookState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Skipped | Self::Planned | Self::Done | Self::Failed(_))
    }

    pub fn can_transition_to(&self, next: &BookState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Skipped | Self::Planned | Self::Uploading | Self::Failed(_))
                | (Self::Uploading, Self::Done | Self::Failed(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn failed() -> BookState {
        BookState::Failed("cover file not found".to_string())
    }

    #[rstest]
    #[case(BookState::Pending, BookState::Skipped, true)]
    #[case(BookState::Pending, BookState::Planned, true)]
    #[case(BookState::Pending, BookState::Uploading, true)]
    #[case(BookState::Pending, failed(), true)]
    #[case(BookState::Uploading, BookState::Done, true)]
    #[case(BookState::Uploading, failed(), true)]
    #[case(BookState::Pending, BookState::Done, false)]
    #[case(BookState::Skipped, BookState::Uploading, false)]
    #[case(BookState::Done, failed(), false)]
    #[case(failed(), BookState::Uploading, false)]
    fn test_transitions(#[case] from: BookState, #[case] to: BookState, #[case] allowed: bool) {
        assert_eq!(from.can_transition_to(&to), allowed);
    }

    #[test]
    fn test_terminal() {
        assert!(!BookState::Pending.is_terminal());
        assert!(!BookState::Uploading.is_terminal());
        assert!(BookState::Done.is_terminal());
        assert!(failed().is_terminal());
    }
}
