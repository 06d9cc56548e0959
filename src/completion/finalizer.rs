//! Exactly-once finalization of a wrapped call.
//!
//! ```text
//!           ┌──────────── on_success(no awaitable) / on_failure ────────────┐
//!           │                                                               ▼
//!      Started ── on_success(awaitable) ──► AsyncHandoff ── continuation ──► AsyncCompleted
//!           │                                                               (terminal)
//!           └──────────────────────────────────────────────────────────► SyncCompleted
//!                                                                           (terminal)
//! ```
//!
//! Reaching a terminal state performs the finalization effects in a fixed
//! order: record the error (if any), end the segment, end the transaction.
//! A panic while recording the error or ending the segment is logged and the
//! remaining steps still run.

use super::protocol::handle_exceptions;
use crate::agent::{Segment, Transaction};
use crate::error::CallError;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Where a wrapped call is in its completion protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CompletionState {
    Started = 0,
    SyncCompleted = 1,
    AsyncHandoff = 2,
    AsyncCompleted = 3,
}

impl CompletionState {
    fn from_u8(state: u8) -> Self {
        match state {
            1 => CompletionState::SyncCompleted,
            2 => CompletionState::AsyncHandoff,
            3 => CompletionState::AsyncCompleted,
            _ => CompletionState::Started,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CompletionState::SyncCompleted | CompletionState::AsyncCompleted
        )
    }
}

/// Owns the segment (and optionally the transaction) of one wrapped call.
pub struct CallFinalizer {
    segment: Arc<dyn Segment>,
    transaction: Option<Arc<dyn Transaction>>,
    state: AtomicU8,
}

impl CallFinalizer {
    /// Finalizes both the segment and the transaction that owns it.
    pub fn new(segment: Arc<dyn Segment>, transaction: Arc<dyn Transaction>) -> Arc<Self> {
        Arc::new(Self {
            segment,
            transaction: Some(transaction),
            state: AtomicU8::new(CompletionState::Started as u8),
        })
    }

    /// Finalizes only the segment; the transaction belongs to someone else.
    pub fn segment_only(segment: Arc<dyn Segment>) -> Arc<Self> {
        Arc::new(Self {
            segment,
            transaction: None,
            state: AtomicU8::new(CompletionState::Started as u8),
        })
    }

    pub fn segment(&self) -> &Arc<dyn Segment> {
        &self.segment
    }

    pub fn transaction(&self) -> Option<&Arc<dyn Transaction>> {
        self.transaction.as_ref()
    }

    pub fn state(&self) -> CompletionState {
        CompletionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Move to `AsyncHandoff`. Returns false if the call already left `Started`.
    pub fn hand_off(&self) -> bool {
        self.state
            .compare_exchange(
                CompletionState::Started as u8,
                CompletionState::AsyncHandoff as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Finalize the call, at most once. Returns whether this call did the work.
    pub fn finish(&self, error: Option<&CallError>) -> bool {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            let next = match CompletionState::from_u8(current) {
                CompletionState::Started => CompletionState::SyncCompleted,
                CompletionState::AsyncHandoff => CompletionState::AsyncCompleted,
                terminal => {
                    debug!(state = ?terminal, "Call already finalized, ignoring");
                    return false;
                }
            };
            match self.state.compare_exchange(
                current,
                next as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }

        // A panicking collaborator must not keep the later steps from running
        match (error, &self.transaction) {
            (Some(error), Some(transaction)) => {
                handle_exceptions("notice error", || transaction.notice_error(error));
            }
            (Some(error), None) => {
                debug!(
                    error_type = %error.type_name,
                    error = %error.message,
                    "Segment-only finalizer does not record call errors, dropping it"
                );
            }
            (None, _) => {}
        }
        handle_exceptions("end segment", || self.segment.end());
        if let Some(transaction) = &self.transaction {
            transaction.end();
        }
        true
    }
}

impl fmt::Debug for CallFinalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallFinalizer")
            .field("state", &self.state())
            .field("owns_transaction", &self.transaction.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::SegmentName;
    use crate::model::{MethodCall, NamePriority};
    use crate::test_helpers::{Event, RecordingAgent, RecordingTransaction};

    #[test]
    fn test_finish_runs_once_in_order() {
        let agent = RecordingAgent::new();
        let transaction = agent.other_transaction("Custom", "Jobs/Run");
        let segment = transaction.segment_for_test();
        let finalizer = CallFinalizer::new(segment, transaction);

        assert_eq!(finalizer.state(), CompletionState::Started);
        assert!(finalizer.finish(Some(&CallError::new("Boom", "bad"))));
        assert!(!finalizer.finish(None));
        assert_eq!(finalizer.state(), CompletionState::SyncCompleted);

        assert_eq!(
            agent.events(),
            vec![
                Event::TransactionCreated { web: false, name: "Jobs/Run".into() },
                Event::SegmentStarted("test".into()),
                Event::ErrorNoticed("Boom".into()),
                Event::SegmentEnded,
                Event::TransactionEnded,
            ]
        );
    }

    /// Delegates to a recording transaction but panics when noticing errors.
    struct BrokenNoticeTransaction(Arc<RecordingTransaction>);

    impl Transaction for BrokenNoticeTransaction {
        fn start_segment(&self, call: &MethodCall, name: SegmentName) -> Arc<dyn Segment> {
            self.0.start_segment(call, name)
        }

        fn set_custom_name(&self, name: &str, priority: NamePriority) {
            self.0.set_custom_name(name, priority);
        }

        fn notice_error(&self, _error: &CallError) {
            panic!("error collector is full");
        }

        fn end(&self) {
            self.0.end();
        }

        fn detach(&self) {
            self.0.detach();
        }

        fn attach_to_async(&self) {
            self.0.attach_to_async();
        }

        fn ignore(&self) {
            self.0.ignore();
        }
    }

    #[test]
    fn test_panicking_notice_error_still_ends_everything() {
        let agent = RecordingAgent::new();
        let recording = agent.other_transaction("Custom", "Jobs/Run");
        let segment = recording.segment_for_test();
        let finalizer = CallFinalizer::new(segment, Arc::new(BrokenNoticeTransaction(recording)));

        assert!(finalizer.finish(Some(&CallError::new("Boom", "bad"))));

        assert_eq!(finalizer.state(), CompletionState::SyncCompleted);
        assert_eq!(agent.count(&Event::SegmentEnded), 1);
        assert_eq!(agent.count(&Event::TransactionEnded), 1);
    }

    #[test]
    fn test_handoff_then_async_completion() {
        let agent = RecordingAgent::new();
        let transaction = agent.other_transaction("Custom", "Jobs/Run");
        let finalizer = CallFinalizer::segment_only(transaction.segment_for_test());

        assert!(finalizer.hand_off());
        assert!(!finalizer.hand_off());
        assert!(finalizer.finish(None));
        assert_eq!(finalizer.state(), CompletionState::AsyncCompleted);
        assert!(finalizer.state().is_terminal());
        assert!(!agent.events().contains(&Event::TransactionEnded));
    }
}
