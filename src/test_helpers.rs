// Test Helpers - Recording Collaborators
//
// In-memory Agent/Transaction/Segment implementations that log every call, with
// the calling thread, so tests can check exactly-once and ordering invariants
// of the completion protocol. Also used by the benchmarks.

use crate::agent::{Agent, Segment, SegmentName, Transaction};
use crate::error::CallError;
use crate::model::{MethodCall, NamePriority};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

/// One collaborator call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    TransactionCreated { web: bool, name: String },
    CustomNameSet { name: String, priority: i32 },
    SegmentStarted(String),
    /// Carries the error's type name
    ErrorNoticed(String),
    SegmentEnded,
    SegmentRemovedFromCallStack,
    TransactionEnded,
    TransactionDetached,
    AttachedToAsync,
    TransactionIgnored,
}

type EventLog = Arc<Mutex<Vec<(Event, ThreadId)>>>;

fn record(log: &EventLog, event: Event) {
    log.lock().push((event, thread::current().id()));
}

/// An agent whose transactions and segments record into one shared log.
#[derive(Debug, Default)]
pub struct RecordingAgent {
    log: EventLog,
    current: Mutex<Option<Arc<RecordingTransaction>>>,
}

impl RecordingAgent {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make a pre-existing transaction current. Nothing is recorded.
    pub fn begin_transaction(&self, name: &str) -> Arc<RecordingTransaction> {
        let transaction = Arc::new(RecordingTransaction::new(name, Arc::clone(&self.log)));
        *self.current.lock() = Some(Arc::clone(&transaction));
        transaction
    }

    pub fn clear_current_transaction(&self) {
        *self.current.lock() = None;
    }

    pub fn other_transaction(&self, _category: &str, name: &str) -> Arc<RecordingTransaction> {
        self.create(false, name)
    }

    fn create(&self, web: bool, name: &str) -> Arc<RecordingTransaction> {
        record(
            &self.log,
            Event::TransactionCreated {
                web,
                name: name.to_string(),
            },
        );
        Arc::new(RecordingTransaction::new(name, Arc::clone(&self.log)))
    }

    pub fn events(&self) -> Vec<Event> {
        self.log.lock().iter().map(|(event, _)| event.clone()).collect()
    }

    /// Events with the thread that produced each one.
    pub fn recorded(&self) -> Vec<(Event, ThreadId)> {
        self.log.lock().clone()
    }

    pub fn count(&self, event: &Event) -> usize {
        self.log.lock().iter().filter(|(e, _)| e == event).count()
    }

    /// The thread that recorded the first `event`, if any.
    pub fn thread_of(&self, event: &Event) -> Option<ThreadId> {
        self.log
            .lock()
            .iter()
            .find(|(e, _)| e == event)
            .map(|(_, thread)| *thread)
    }

    pub fn clear(&self) {
        self.log.lock().clear();
    }
}

impl Agent for RecordingAgent {
    fn create_web_transaction(&self, _category: &str, name: &str) -> Arc<dyn Transaction> {
        self.create(true, name)
    }

    fn create_other_transaction(&self, _category: &str, name: &str) -> Arc<dyn Transaction> {
        self.create(false, name)
    }

    fn current_transaction(&self) -> Option<Arc<dyn Transaction>> {
        self.current
            .lock()
            .as_ref()
            .map(|transaction| Arc::clone(transaction) as Arc<dyn Transaction>)
    }
}

#[derive(Debug)]
pub struct RecordingTransaction {
    name: String,
    log: EventLog,
    valid: AtomicBool,
}

impl RecordingTransaction {
    fn new(name: &str, log: EventLog) -> Self {
        Self {
            name: name.to_string(),
            log,
            valid: AtomicBool::new(true),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn invalidate(&self) {
        self.valid.store(false, Ordering::Release);
    }

    /// Start a segment named `test` without a method call.
    pub fn segment_for_test(&self) -> Arc<dyn Segment> {
        self.segment("test".to_string())
    }

    fn segment(&self, label: String) -> Arc<dyn Segment> {
        record(&self.log, Event::SegmentStarted(label));
        Arc::new(RecordingSegment {
            log: Arc::clone(&self.log),
        })
    }
}

impl Transaction for RecordingTransaction {
    fn start_segment(&self, _call: &MethodCall, name: SegmentName) -> Arc<dyn Segment> {
        let label = match name {
            SegmentName::Method {
                type_name,
                method_name,
            } => format!("{type_name}.{method_name}"),
            SegmentName::Custom(name) => name,
        };
        self.segment(label)
    }

    fn set_custom_name(&self, name: &str, priority: NamePriority) {
        record(
            &self.log,
            Event::CustomNameSet {
                name: name.to_string(),
                priority: priority.0,
            },
        );
    }

    fn notice_error(&self, error: &CallError) {
        record(&self.log, Event::ErrorNoticed(error.type_name.clone()));
    }

    fn end(&self) {
        record(&self.log, Event::TransactionEnded);
    }

    fn detach(&self) {
        record(&self.log, Event::TransactionDetached);
    }

    fn attach_to_async(&self) {
        record(&self.log, Event::AttachedToAsync);
    }

    fn ignore(&self) {
        record(&self.log, Event::TransactionIgnored);
    }

    fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
pub struct RecordingSegment {
    log: EventLog,
}

impl Segment for RecordingSegment {
    fn end(&self) {
        record(&self.log, Event::SegmentEnded);
    }

    fn remove_from_call_stack(&self) {
        record(&self.log, Event::SegmentRemovedFromCallStack);
    }
}
