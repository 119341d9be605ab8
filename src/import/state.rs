//! Document load states and internal import stages.

use std::fmt;

use crate::util::{Error, FailureKind};

/// Why a load ended in [`ImportState::Error`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl ImportFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    /// True if retrying the load may succeed.
    #[inline]
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl From<&Error> for ImportFailure {
    fn from(err: &Error) -> Self {
        Self::new(err.failure_kind(), err.to_string())
    }
}

impl fmt::Display for ImportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// Externally visible state of a document load.
///
/// Moves forward only: `Initializing -> Downloading -> Loading -> Ready`,
/// with `Downloading` skipped for local files and `Error` reachable from
/// any non-terminal state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ImportState {
    #[default]
    Initializing,
    Downloading,
    Loading,
    Ready,
    Error(ImportFailure),
}

impl ImportState {
    fn rank(&self) -> u8 {
        match self {
            Self::Initializing => 0,
            Self::Downloading => 1,
            Self::Loading => 2,
            Self::Ready | Self::Error(_) => 3,
        }
    }

    /// `Ready` or `Error`.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready | Self::Error(_))
    }

    /// True if moving to `next` goes forward.
    pub fn can_transition_to(&self, next: &ImportState) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            Self::Error(_) => true,
            Self::Ready => matches!(self, Self::Loading),
            _ => next.rank() > self.rank(),
        }
    }

    /// Move to `next`; returns false and stays put if that would go backwards.
    pub fn transition(&mut self, next: ImportState) -> bool {
        if !self.can_transition_to(&next) {
            tracing::warn!(from = ?self, to = ?next, "rejected state transition");
            return false;
        }
        tracing::debug!(from = ?self, to = ?next, "state transition");
        *self = next;
        true
    }

    /// Failure details when in `Error`.
    pub fn failure(&self) -> Option<&ImportFailure> {
        match self {
            Self::Error(f) => Some(f),
            _ => None,
        }
    }
}

/// Fine-grained stage of one import run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    #[default]
    Pending,
    ReadingTables,
    ResolvingReferences,
    WritingEntities,
    Finished,
    Failed,
}

impl Stage {
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Failed)
    }

    /// Step to the next stage. Only the immediate successor, or `Failed`
    /// from a non-terminal stage, is accepted.
    pub fn advance(&mut self, next: Stage) -> bool {
        let ok = match (*self, next) {
            (s, _) if s.is_terminal() => false,
            (_, Self::Failed) => true,
            (Self::Pending, Self::ReadingTables)
            | (Self::ReadingTables, Self::ResolvingReferences)
            | (Self::ResolvingReferences, Self::WritingEntities)
            | (Self::WritingEntities, Self::Finished) => true,
            _ => false,
        };
        if ok {
            *self = next;
        }
        ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_forward_only() {
        let mut s = ImportState::default();
        assert!(s.transition(ImportState::Downloading));
        assert!(!s.transition(ImportState::Initializing));
        assert!(!s.transition(ImportState::Ready));
        assert!(s.transition(ImportState::Loading));
        assert!(s.transition(ImportState::Ready));
        assert!(!s.transition(ImportState::Error(ImportFailure::new(FailureKind::TransientIo, "late"))));
        assert_eq!(s, ImportState::Ready);
    }

    #[test]
    fn test_local_skips_download() {
        let mut s = ImportState::Initializing;
        assert!(s.transition(ImportState::Loading));
        assert!(!s.transition(ImportState::Downloading));
    }

    #[test]
    fn test_error_is_terminal() {
        let mut s = ImportState::Downloading;
        assert!(s.transition(ImportState::Error(ImportFailure::new(FailureKind::Cancelled, "stop"))));
        assert!(s.is_terminal());
        assert!(!s.transition(ImportState::Loading));
        assert_eq!(s.failure().map(|f| f.kind), Some(FailureKind::Cancelled));
        assert!(!s.failure().unwrap().is_retryable());
    }

    #[test]
    fn test_stage_advance() {
        let mut s = Stage::Pending;
        assert!(!s.advance(Stage::WritingEntities));
        assert!(s.advance(Stage::ReadingTables));
        assert!(s.advance(Stage::ResolvingReferences));
        assert!(!s.advance(Stage::ReadingTables));
        assert!(s.advance(Stage::Failed));
        assert!(!s.advance(Stage::Finished));
        assert_eq!(s, Stage::Failed);
    }
}
