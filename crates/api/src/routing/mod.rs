//! Host-based site routing
//!
//! This module handles resolving incoming Host headers to sites, so one
//! deployment can serve many domains:
//! - Exact domains: shop.example.com
//! - Domains behind a port: shop.example.com:8080
//! - www and bare variants of the same domain

mod cache;
mod host_resolver;
mod redis_cache;

pub use cache::{CacheStats, CachedSite, DomainCache, ResolutionCache, DEFAULT_CACHE_TTL};
pub(crate) use host_resolver::is_malformed_host;
pub use host_resolver::{normalize_host, HostResolveError, HostResolver, Resolution, SiteResolver};
pub use redis_cache::RedisCache;
