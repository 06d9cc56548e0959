//! Call-site descriptors supplied by the call-interception collaborator.

use super::method::Method;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Transaction naming priority. Higher values win when several names are proposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NamePriority(pub i32);

impl NamePriority {
    pub const HANDLER: NamePriority = NamePriority(1);
    pub const URI: NamePriority = NamePriority(3);
    pub const FRAMEWORK_LOW: NamePriority = NamePriority(5);
    pub const FRAMEWORK_HIGH: NamePriority = NamePriority(8);
    pub const USER: NamePriority = NamePriority(10);
}

impl Default for NamePriority {
    fn default() -> Self {
        Self::URI
    }
}

/// Immutable description of one instrumentation point.
///
/// **Identity shortcut:** equality and hashing use the numeric call-site id
/// only. The injector interns exactly one descriptor per instrumentation point,
/// so two descriptors with the same id are the same call site even if their
/// method data differs. Callers must keep ids unique per distinct
/// instrumentation point; a shared id makes caches keyed by `CallSite`
/// silently return the other site's wrapper.
#[derive(Debug, Clone)]
pub struct CallSite {
    id: u64,
    method: Method,
    requested_wrapper_name: String,
    is_async: bool,
    requested_metric_name: Option<String>,
    requested_name_priority: Option<NamePriority>,
    start_web_transaction: bool,
}

impl CallSite {
    pub fn builder(id: u64, method: Method) -> CallSiteBuilder {
        CallSiteBuilder {
            site: CallSite {
                id,
                method,
                requested_wrapper_name: String::new(),
                is_async: false,
                requested_metric_name: None,
                requested_name_priority: None,
                start_web_transaction: false,
            },
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn requested_wrapper_name(&self) -> &str {
        &self.requested_wrapper_name
    }

    pub fn is_async(&self) -> bool {
        self.is_async
    }

    /// Metric-name override; empty overrides are reported as absent.
    pub fn requested_metric_name(&self) -> Option<&str> {
        self.requested_metric_name
            .as_deref()
            .filter(|name| !name.is_empty())
    }

    pub fn requested_name_priority(&self) -> Option<NamePriority> {
        self.requested_name_priority
    }

    pub fn start_web_transaction(&self) -> bool {
        self.start_web_transaction
    }
}

impl PartialEq for CallSite {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for CallSite {}

impl Hash for CallSite {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.id, self.method)
    }
}

pub struct CallSiteBuilder {
    site: CallSite,
}

impl CallSiteBuilder {
    #[must_use]
    pub fn wrapper_name(mut self, name: impl Into<String>) -> Self {
        self.site.requested_wrapper_name = name.into();
        self
    }

    #[must_use]
    pub fn asynchronous(mut self, is_async: bool) -> Self {
        self.site.is_async = is_async;
        self
    }

    #[must_use]
    pub fn metric_name(mut self, name: impl Into<String>) -> Self {
        self.site.requested_metric_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn name_priority(mut self, priority: NamePriority) -> Self {
        self.site.requested_name_priority = Some(priority);
        self
    }

    #[must_use]
    pub fn web_transaction(mut self, start_web_transaction: bool) -> Self {
        self.site.start_web_transaction = start_web_transaction;
        self
    }

    pub fn build(self) -> CallSite {
        self.site
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TypeDescriptor;
    use std::collections::HashMap;

    fn method(name: &str) -> Method {
        Method::new(TypeDescriptor::new("Acme.Jobs", "Acme"), name, ["System.String"])
    }

    #[test]
    fn test_equality_uses_id_only() {
        let a = CallSite::builder(7, method("Run")).build();
        let b = CallSite::builder(7, method("Stop"))
            .wrapper_name("OtherTransactionWrapper")
            .build();
        let c = CallSite::builder(8, method("Run")).build();

        assert_eq!(a, b);
        assert_ne!(a, c);

        let mut cache = HashMap::new();
        cache.insert(a, "first");
        // Same id: the entry is shared even though the method differs
        assert_eq!(cache.get(&b), Some(&"first"));
    }

    #[test]
    fn test_builder_fields() {
        let site = CallSite::builder(1, method("Run"))
            .wrapper_name("OtherTransactionWrapperAsync")
            .asynchronous(true)
            .metric_name("Jobs/Run")
            .name_priority(NamePriority::USER)
            .web_transaction(true)
            .build();

        assert_eq!(site.id(), 1);
        assert!(site.is_async());
        assert_eq!(site.requested_wrapper_name(), "OtherTransactionWrapperAsync");
        assert_eq!(site.requested_metric_name(), Some("Jobs/Run"));
        assert_eq!(site.requested_name_priority(), Some(NamePriority::USER));
        assert!(site.start_web_transaction());
    }

    #[test]
    fn test_empty_metric_name_is_absent() {
        let site = CallSite::builder(2, method("Run")).metric_name("").build();
        assert_eq!(site.requested_metric_name(), None);
    }
}
