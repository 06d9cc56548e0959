//! Method identity: declaring type, method name, and parameter-type signature.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Identity of a type in the monitored application.
///
/// Two descriptors are equal when their full name and assembly match. The
/// `interfaces` list records the interfaces (and base types) the type can be
/// assigned to; it is consulted only for interface-matching strategies.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    full_name: Arc<str>,
    assembly: Arc<str>,
    interfaces: Arc<[Arc<str>]>,
}

impl TypeDescriptor {
    pub fn new(full_name: impl Into<Arc<str>>, assembly: impl Into<Arc<str>>) -> Self {
        Self {
            full_name: full_name.into(),
            assembly: assembly.into(),
            interfaces: Arc::from(Vec::new()),
        }
    }

    /// Declare the interfaces this type implements.
    #[must_use]
    pub fn implementing<I, S>(mut self, interfaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        self.interfaces = interfaces.into_iter().map(Into::into).collect();
        self
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn assembly(&self) -> &str {
        &self.assembly
    }

    pub fn interfaces(&self) -> impl Iterator<Item = &str> {
        self.interfaces.iter().map(|i| &**i)
    }

    /// True when a value of this type can be used where `target` is expected.
    pub fn is_assignable_to(&self, target: &TypeDescriptor) -> bool {
        self == target || self.interfaces.iter().any(|i| **i == *target.full_name)
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.full_name == other.full_name && self.assembly == other.assembly
    }
}

impl Eq for TypeDescriptor {}

impl Hash for TypeDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.full_name.hash(state);
        self.assembly.hash(state);
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.full_name, self.assembly)
    }
}

/// Structural method identity with a precomputed hash.
#[derive(Debug, Clone)]
pub struct Method {
    declaring_type: TypeDescriptor,
    name: Arc<str>,
    parameter_types: Arc<[Arc<str>]>,
    hash: u64,
}

impl Method {
    pub fn new<I, S>(declaring_type: TypeDescriptor, name: impl Into<Arc<str>>, parameter_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        let name = name.into();
        let parameter_types: Arc<[Arc<str>]> = parameter_types.into_iter().map(Into::into).collect();

        let mut hasher = DefaultHasher::new();
        declaring_type.hash(&mut hasher);
        name.hash(&mut hasher);
        parameter_types.hash(&mut hasher);

        Self {
            declaring_type,
            name,
            parameter_types,
            hash: hasher.finish(),
        }
    }

    pub fn declaring_type(&self) -> &TypeDescriptor {
        &self.declaring_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameter_types(&self) -> impl ExactSizeIterator<Item = &str> {
        self.parameter_types.iter().map(|p| &**p)
    }

    pub fn parameter_count(&self) -> usize {
        self.parameter_types.len()
    }

    /// Comma-separated parameter signature, as reported in diagnostics.
    pub fn parameter_type_names(&self) -> String {
        self.parameter_types
            .iter()
            .map(|p| &**p)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Per-position parameter-type equality.
    pub fn has_signature<S: AsRef<str>>(&self, parameter_types: &[S]) -> bool {
        self.parameter_types.len() == parameter_types.len()
            && self
                .parameter_types
                .iter()
                .zip(parameter_types)
                .all(|(mine, theirs)| **mine == *theirs.as_ref())
    }
}

impl PartialEq for Method {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
            && self.declaring_type == other.declaring_type
            && self.name == other.name
            && self.parameter_types == other.parameter_types
    }
}

impl Eq for Method {}

impl Hash for Method {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}({})",
            self.declaring_type,
            self.name,
            self.parameter_type_names()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn widget() -> TypeDescriptor {
        TypeDescriptor::new("Acme.Widget", "Acme").implementing(["System.IDisposable"])
    }

    #[test]
    fn test_type_assignability() {
        let disposable = TypeDescriptor::new("System.IDisposable", "System.Runtime");
        let other = TypeDescriptor::new("Acme.Gadget", "Acme");

        assert!(widget().is_assignable_to(&widget()));
        assert!(widget().is_assignable_to(&disposable));
        assert!(!widget().is_assignable_to(&other));
        assert!(!disposable.is_assignable_to(&widget()));
    }

    #[test]
    fn test_type_equality_ignores_interfaces() {
        assert_eq!(widget(), TypeDescriptor::new("Acme.Widget", "Acme"));
        assert_ne!(widget(), TypeDescriptor::new("Acme.Widget", "Other"));
    }

    #[test]
    fn test_method_structural_equality() {
        let a = Method::new(widget(), "Spin", ["System.Int32", "System.String"]);
        let b = Method::new(widget(), "Spin", ["System.Int32", "System.String"]);
        let c = Method::new(widget(), "Spin", ["System.String", "System.Int32"]);

        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<Method> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_signature_matching() {
        let method = Method::new(widget(), "Spin", ["System.Int32"]);
        assert!(method.has_signature(&["System.Int32"]));
        assert!(!method.has_signature(&["System.String"]));
        assert!(!method.has_signature(&["System.Int32", "System.Int32"]));
        assert!(!method.has_signature::<&str>(&[]));
        assert_eq!(method.parameter_type_names(), "System.Int32");
        assert_eq!(method.to_string(), "Acme.Widget, Acme:Spin(System.Int32)");
    }
}
