//! # Instrumentation Model
//!
//! Immutable descriptions of what is being intercepted:
//!
//! ```text
//! TypeDescriptor ──► Method ──► CallSite ──► MethodCall
//!  (declaring type)   (identity)  (per instrumentation   (per actual call:
//!                                  point, id-interned)    target + arguments)
//! ```

pub mod call_site;
pub mod method;
pub mod method_call;

pub use call_site::{CallSite, CallSiteBuilder, NamePriority};
pub use method::{Method, TypeDescriptor};
pub use method_call::{value, Argument, MethodCall, Value};
