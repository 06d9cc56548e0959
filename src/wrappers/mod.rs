//! # Built-in Wrappers
//!
//! Strategies that ship with the dispatcher. They are matched by the wrapper
//! name a call site requests rather than by method identity.
//!
//! | Wrapper                        | Tier     | Effect                                   |
//! |--------------------------------|----------|------------------------------------------|
//! | `OtherTransactionWrapper`      | specific | new transaction + segment, sync          |
//! | `OtherTransactionWrapperAsync` | specific | new transaction + segment, async         |
//! | `CustomSegmentWrapper`         | specific | segment in the current transaction       |
//! | `IgnoreTransactionWrapper`     | specific | discard the current transaction          |
//! | `AttachToAsyncWrapper`         | specific | attach the transaction to the async flow |
//! | `DetachWrapper`                | specific | detach the current transaction           |
//! | `MultithreadedTrackingWrapper` | specific | segment for work started on a new thread |
//! | `NoOpWrapper`                  | specific | nothing (also the last-resort fallback)  |
//! | `DefaultWrapper`               | default  | segment in the current transaction, sync |
//! | `DefaultWrapperAsync`          | default  | same, finalized by a continuation        |

pub mod custom_segment;
pub mod default;
pub mod multithreaded_tracking;
pub mod no_op;
pub mod other_transaction;
pub mod transaction_control;

pub use custom_segment::CustomSegmentWrapper;
pub use default::{DefaultWrapper, DefaultWrapperAsync};
pub use multithreaded_tracking::MultithreadedTrackingWrapper;
pub use no_op::NoOpWrapper;
pub use other_transaction::{OtherTransactionWrapper, OtherTransactionWrapperAsync};
pub use transaction_control::{AttachToAsyncWrapper, DetachWrapper, IgnoreTransactionWrapper};

use crate::agent::Transaction;
use crate::config::HostEnvironment;
use crate::error::{ConstructionError, WrapperError};
use crate::model::CallSite;
use crate::registry::ProbeResult;
use std::sync::Arc;

fn requests_any(call_site: &CallSite, names: &[&str]) -> bool {
    names.contains(&call_site.requested_wrapper_name())
}

fn require_transaction(
    transaction: Option<Arc<dyn Transaction>>,
) -> Result<Arc<dyn Transaction>, WrapperError> {
    transaction.ok_or(WrapperError::Construction(ConstructionError::Missing(
        "transaction",
    )))
}

/// Negative probe for continuation-based wrappers in a legacy environment.
fn legacy_rejection(
    wrapper: &str,
    call_site: &CallSite,
    environment: HostEnvironment,
) -> Option<ProbeResult> {
    if environment.supports_continuations() {
        return None;
    }
    let method = call_site.method();
    Some(ProbeResult::rejected(format!(
        "{} does not support async methods in the legacy async pipeline. {}.{} will not be instrumented",
        wrapper,
        method.declaring_type().full_name(),
        method.name()
    )))
}
