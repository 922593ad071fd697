//! Multihost API Library
//!
//! This crate contains the server components for Multihost: resolving the Host
//! header of each request to a site and binding that site to the request.

pub mod binding;
pub mod config;
pub mod context;
pub mod error;
pub mod observability;
pub mod routes;
pub mod routing;
pub mod state;

pub use binding::{BindOutcome, SiteBinder};
pub use config::Config;
pub use context::{RequestContext, SiteBinding};
pub use error::{ApiError, ApiResult};
pub use routing::{DomainCache, HostResolver, Resolution, SiteResolver};
pub use state::AppState;
