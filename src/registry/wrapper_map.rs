//! # Wrapper Resolution Engine
//!
//! Picks the wrapper for a call site by probing strategies in a fixed order.
//!
//! ```text
//! CallSite ──► specific tier ──► dynamic tier ──► default tier ──► no-op
//!               (user + built-in,  (looked up by     (async and
//!                in registration    requested name)   sync defaults)
//!                order)
//! ```
//!
//! The first positive probe wins; later candidates are never probed. Resolution
//! never fails: when nothing matches, a warning is logged and the shared no-op
//! wrapper is returned.
//!
//! Tracked wrappers are created lazily, one per strategy, so every call site
//! resolved to the same strategy shares its failure counter.

use super::dynamic_source::DynamicWrapperSource;
use super::registration::{MethodWrapper, Registrar};
use super::tracked_wrapper::TrackedWrapper;
use super::wrapper::{Wrapper, WrapperKind};
use crate::config::HostEnvironment;
use crate::error::panic_message;
use crate::logging::log_registration_operation;
use crate::model::CallSite;
use crate::wrappers::{
    AttachToAsyncWrapper, CustomSegmentWrapper, DefaultWrapper, DefaultWrapperAsync,
    DetachWrapper, IgnoreTransactionWrapper, MultithreadedTrackingWrapper, NoOpWrapper,
    OtherTransactionWrapper, OtherTransactionWrapperAsync,
};
use dashmap::DashMap;
use std::any::type_name;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};
use tracing::{debug, error, info, warn};

struct TrackedSlot {
    wrapper: Arc<dyn Wrapper>,
    tracked: OnceLock<Arc<TrackedWrapper>>,
}

impl TrackedSlot {
    fn new(wrapper: Arc<dyn Wrapper>) -> Self {
        Self {
            wrapper,
            tracked: OnceLock::new(),
        }
    }

    fn tracked(&self) -> Arc<TrackedWrapper> {
        Arc::clone(
            self.tracked
                .get_or_init(|| Arc::new(TrackedWrapper::new(Arc::clone(&self.wrapper)))),
        )
    }
}

/// The resolution engine. Immutable after [`WrapperMapBuilder::build`].
pub struct WrapperMap {
    specific: Vec<TrackedSlot>,
    dynamic_source: Option<Arc<dyn DynamicWrapperSource>>,
    /// Tracked dynamic candidates by requested name and position in the source's list
    dynamic_tracked: DashMap<(String, usize), Arc<TrackedWrapper>>,
    defaults: Vec<TrackedSlot>,
    noop: Arc<TrackedWrapper>,
}

impl WrapperMap {
    pub fn builder(environment: HostEnvironment) -> WrapperMapBuilder {
        WrapperMapBuilder::new(environment)
    }

    /// Resolve the wrapper for `call_site`. Never fails.
    pub fn get(&self, call_site: &CallSite) -> Arc<TrackedWrapper> {
        if let Some(slot) = self
            .specific
            .iter()
            .find(|slot| can_wrap(slot.wrapper.as_ref(), call_site))
        {
            return slot.tracked();
        }

        if let Some(tracked) = self.get_dynamic(call_site) {
            return tracked;
        }

        if let Some(slot) = self
            .defaults
            .iter()
            .find(|slot| can_wrap(slot.wrapper.as_ref(), call_site))
        {
            return slot.tracked();
        }

        let method = call_site.method();
        warn!(
            call_site_id = call_site.id(),
            method = %format!("{}.{}", method.declaring_type().full_name(), method.name()),
            parameters = %method.parameter_type_names(),
            assembly = %method.declaring_type().assembly(),
            requested_wrapper = %call_site.requested_wrapper_name(),
            "⚠️ No matching wrapper found, method will not be instrumented"
        );
        self.noop_wrapper()
    }

    fn get_dynamic(&self, call_site: &CallSite) -> Option<Arc<TrackedWrapper>> {
        let source = self.dynamic_source.as_ref()?;
        let requested = call_site.requested_wrapper_name();
        if requested.is_empty() {
            return None;
        }

        let (position, wrapper) = source
            .find_by_name(requested)
            .into_iter()
            .enumerate()
            .find(|(_, wrapper)| can_wrap(wrapper.as_ref(), call_site))?;

        // Keyed by where the candidate sits, so a source handing out fresh
        // instances still shares one failure counter per candidate
        let tracked = self
            .dynamic_tracked
            .entry((requested.to_string(), position))
            .or_insert_with(|| Arc::new(TrackedWrapper::new(wrapper)));
        Some(Arc::clone(tracked.value()))
    }

    /// The shared no-op tracked wrapper.
    pub fn noop_wrapper(&self) -> Arc<TrackedWrapper> {
        Arc::clone(&self.noop)
    }

    #[must_use]
    pub fn stats(&self) -> WrapperMapStats {
        WrapperMapStats {
            specific_count: self.specific.len(),
            default_count: self.defaults.len(),
            has_dynamic_source: self.dynamic_source.is_some(),
            tracked_dynamic_count: self.dynamic_tracked.len(),
            specific_names: self
                .specific
                .iter()
                .map(|slot| slot.wrapper.name().to_string())
                .collect(),
            default_names: self
                .defaults
                .iter()
                .map(|slot| slot.wrapper.name().to_string())
                .collect(),
        }
    }
}

impl fmt::Debug for WrapperMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrapperMap")
            .field("stats", &self.stats())
            .finish()
    }
}

/// Probe `wrapper`, logging its diagnostic. A panicking probe counts as no match.
fn can_wrap(wrapper: &dyn Wrapper, call_site: &CallSite) -> bool {
    let result = match catch_unwind(AssertUnwindSafe(|| wrapper.probe(call_site))) {
        Ok(result) => result,
        Err(panic) => {
            error!(
                wrapper = wrapper.name(),
                call_site_id = call_site.id(),
                error = %panic_message(panic.as_ref()),
                "❌ Wrapper probe panicked, treating as no match"
            );
            return false;
        }
    };

    if let Some(diagnostic) = result.diagnostic.as_deref().filter(|d| !d.is_empty()) {
        if result.matched {
            info!(wrapper = wrapper.name(), "{}", diagnostic);
        } else {
            warn!(wrapper = wrapper.name(), "{}", diagnostic);
        }
    }

    if result.matched {
        let method = call_site.method();
        debug!(
            wrapper = wrapper.name(),
            call_site_id = call_site.id(),
            "Wrapper {} will be used for instrumented method {}.{}",
            wrapper.name(),
            method.declaring_type().full_name(),
            method.name()
        );
    }
    result.matched
}

/// Statistics about a wrapper map.
#[derive(Debug, Clone)]
pub struct WrapperMapStats {
    /// Strategies in the specific tier, built-ins included
    pub specific_count: usize,

    pub default_count: usize,

    pub has_dynamic_source: bool,

    /// Dynamic strategies resolved so far
    pub tracked_dynamic_count: usize,

    /// Specific-tier names in probe order
    pub specific_names: Vec<String>,

    /// Default-tier names in probe order
    pub default_names: Vec<String>,
}

/// Assembles a [`WrapperMap`] at startup.
pub struct WrapperMapBuilder {
    registrar: Registrar,
    specific: Vec<Arc<dyn Wrapper>>,
    discovered_defaults: Vec<Arc<dyn Wrapper>>,
    dynamic_source: Option<Arc<dyn DynamicWrapperSource>>,
    default_wrapper: Option<Arc<dyn Wrapper>>,
}

impl WrapperMapBuilder {
    pub fn new(environment: HostEnvironment) -> Self {
        Self {
            registrar: Registrar::new(environment),
            specific: Vec::new(),
            discovered_defaults: Vec::new(),
            dynamic_source: None,
            default_wrapper: None,
        }
    }

    /// Register strategy `S`. A strategy that fails registration is logged and skipped.
    #[must_use]
    pub fn with_strategy<S: MethodWrapper>(mut self) -> Self {
        match self.registrar.register::<S>() {
            Ok(registrations) => {
                for registration in registrations {
                    self.add_wrapper(registration);
                }
            }
            Err(registration_error) => {
                error!(
                    strategy = type_name::<S>(),
                    error = %registration_error,
                    "❌ Failed to register wrapper strategy, skipping it"
                );
                log_registration_operation(
                    "register",
                    type_name::<S>(),
                    "failed",
                    0,
                    Some(&registration_error.to_string()),
                );
            }
        }
        self
    }

    /// Add an already-built wrapper, placed by its kind.
    #[must_use]
    pub fn with_wrapper(mut self, wrapper: Arc<dyn Wrapper>) -> Self {
        self.add_wrapper(wrapper);
        self
    }

    #[must_use]
    pub fn with_dynamic_source(mut self, source: Arc<dyn DynamicWrapperSource>) -> Self {
        self.dynamic_source = Some(source);
        self
    }

    /// Replace the synchronous default wrapper.
    #[must_use]
    pub fn with_default_wrapper(mut self, wrapper: Arc<dyn Wrapper>) -> Self {
        self.default_wrapper = Some(wrapper);
        self
    }

    fn add_wrapper(&mut self, wrapper: Arc<dyn Wrapper>) {
        match wrapper.kind() {
            WrapperKind::Specific => self.specific.push(wrapper),
            WrapperKind::Default => self.discovered_defaults.push(wrapper),
            WrapperKind::NoOp => {
                debug!(wrapper = wrapper.name(), "Ignoring discovered no-op wrapper");
            }
        }
    }

    pub fn build(self) -> WrapperMap {
        let environment = self.registrar.environment();

        if self.specific.is_empty() && self.discovered_defaults.is_empty() {
            warn!("⚠️ No instrumentation strategies were loaded, only built-in wrappers are available");
        }

        let builtins: [Arc<dyn Wrapper>; 8] = [
            Arc::new(OtherTransactionWrapper),
            Arc::new(OtherTransactionWrapperAsync::new(environment)),
            Arc::new(CustomSegmentWrapper::new(environment)),
            Arc::new(IgnoreTransactionWrapper),
            Arc::new(AttachToAsyncWrapper),
            Arc::new(DetachWrapper),
            Arc::new(MultithreadedTrackingWrapper),
            Arc::new(NoOpWrapper),
        ];

        let specific: Vec<TrackedSlot> = self
            .specific
            .into_iter()
            .chain(builtins)
            .map(TrackedSlot::new)
            .collect();

        let default_wrapper = self
            .default_wrapper
            .unwrap_or_else(|| Arc::new(DefaultWrapper) as Arc<dyn Wrapper>);
        let defaults: Vec<TrackedSlot> = self
            .discovered_defaults
            .into_iter()
            .chain([
                default_wrapper,
                Arc::new(DefaultWrapperAsync::new(environment)) as Arc<dyn Wrapper>,
            ])
            .map(TrackedSlot::new)
            .collect();

        info!(
            specific = specific.len(),
            defaults = defaults.len(),
            dynamic_source = self.dynamic_source.is_some(),
            "✅ Wrapper map built"
        );

        WrapperMap {
            specific,
            dynamic_source: self.dynamic_source,
            dynamic_tracked: DashMap::new(),
            defaults,
            noop: Arc::new(TrackedWrapper::new(Arc::new(NoOpWrapper))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Method, TypeDescriptor};

    fn site(id: u64, wrapper_name: &str, is_async: bool) -> CallSite {
        let method = Method::new(
            TypeDescriptor::new("App.Worker", "App"),
            "Run",
            std::iter::empty::<&str>(),
        );
        CallSite::builder(id, method)
            .wrapper_name(wrapper_name)
            .asynchronous(is_async)
            .build()
    }

    #[test]
    fn test_builtin_tiers_in_order() {
        let map = WrapperMap::builder(HostEnvironment::default()).build();
        let stats = map.stats();

        assert_eq!(
            stats.specific_names,
            vec![
                "OtherTransactionWrapper",
                "OtherTransactionWrapperAsync",
                "CustomSegmentWrapper",
                "IgnoreTransactionWrapper",
                "AttachToAsyncWrapper",
                "DetachWrapper",
                "MultithreadedTrackingWrapper",
                "NoOpWrapper",
            ]
        );
        assert_eq!(
            stats.default_names,
            vec!["DefaultWrapper", "DefaultWrapperAsync"]
        );
        assert!(!stats.has_dynamic_source);
    }

    #[test]
    fn test_defaults_split_by_async_flag() {
        let map = WrapperMap::builder(HostEnvironment::default()).build();

        assert_eq!(map.get(&site(1, "", false)).name(), "DefaultWrapper");
        assert_eq!(map.get(&site(2, "", true)).name(), "DefaultWrapperAsync");
    }

    #[test]
    fn test_tracked_wrapper_shared_per_strategy() {
        let map = WrapperMap::builder(HostEnvironment::default()).build();
        let first = map.get(&site(1, "", false));
        let second = map.get(&site(2, "", false));
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_unknown_name_falls_back_to_noop() {
        let map = WrapperMap::builder(HostEnvironment::default()).build();
        let resolved = map.get(&site(1, "Unknown.Wrapper", false));
        assert!(Arc::ptr_eq(&resolved, &map.noop_wrapper()));
    }
}
