//! A resolved wrapper paired with its consecutive-failure counter.

use super::wrapper::Wrapper;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// The unit handed out by the resolution engine.
///
/// One instance exists per strategy, so every call site resolved to the same
/// strategy shares its counter.
pub struct TrackedWrapper {
    wrapper: Arc<dyn Wrapper>,
    consecutive_failures: AtomicU32,
}

impl TrackedWrapper {
    pub fn new(wrapper: Arc<dyn Wrapper>) -> Self {
        Self {
            wrapper,
            consecutive_failures: AtomicU32::new(0),
        }
    }

    pub fn wrapper(&self) -> &Arc<dyn Wrapper> {
        &self.wrapper
    }

    pub fn name(&self) -> &str {
        self.wrapper.name()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Acquire)
    }

    pub fn notice_success(&self) {
        self.consecutive_failures.store(0, Ordering::Release);
    }

    /// Record a failure and return the new count.
    pub fn notice_failure(&self) -> u32 {
        self.consecutive_failures
            .fetch_add(1, Ordering::AcqRel)
            .saturating_add(1)
    }
}

impl fmt::Debug for TrackedWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackedWrapper")
            .field("wrapper", &self.wrapper.name())
            .field("consecutive_failures", &self.consecutive_failures())
            .finish()
    }
}
