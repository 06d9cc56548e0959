//! Lookup of strategies by requested wrapper name, consulted after the specific tier.

use super::registration::Registration;
use super::wrapper::Wrapper;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Finds candidate strategies by the wrapper name a call site requests.
pub trait DynamicWrapperSource: Send + Sync + fmt::Debug {
    /// Candidates for `name`, in probe order. Unknown names yield an empty list.
    ///
    /// The order must be stable across calls: resolved candidates are tracked by
    /// name and position, not by instance.
    fn find_by_name(&self, name: &str) -> Vec<Arc<dyn Wrapper>>;
}

/// An in-memory source populated at startup.
#[derive(Debug, Default)]
pub struct StaticWrapperSource {
    wrappers: HashMap<String, Vec<Arc<dyn Wrapper>>>,
}

impl StaticWrapperSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_wrapper(mut self, name: impl Into<String>, wrapper: Arc<dyn Wrapper>) -> Self {
        self.wrappers.entry(name.into()).or_default().push(wrapper);
        self
    }

    /// Add every registration produced for a strategy under `name`.
    #[must_use]
    pub fn with_registrations(
        mut self,
        name: impl Into<String>,
        registrations: Vec<Arc<Registration>>,
    ) -> Self {
        let entry = self.wrappers.entry(name.into()).or_default();
        entry.extend(
            registrations
                .into_iter()
                .map(|registration| registration as Arc<dyn Wrapper>),
        );
        self
    }

    pub fn len(&self) -> usize {
        self.wrappers.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.wrappers.is_empty()
    }
}

impl DynamicWrapperSource for StaticWrapperSource {
    fn find_by_name(&self, name: &str) -> Vec<Arc<dyn Wrapper>> {
        self.wrappers.get(name).cloned().unwrap_or_default()
    }
}
