//! Request-to-site binding

mod binder;
mod middleware;

pub use binder::{BindOutcome, SiteBinder};
pub use middleware::{site_binding_middleware, BindingState, RejectionPolicy};
