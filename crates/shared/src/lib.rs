//! Multihost Shared Types and Utilities
//!
//! This crate contains the site model, the site store, and database helpers shared
//! across Multihost.

pub mod db;
pub mod error;
pub mod store;
pub mod types;

pub use db::*;
pub use error::*;
pub use store::{MemorySiteStore, PgSiteStore, SiteStore};
pub use types::*;
