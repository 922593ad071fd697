//! Host-to-Site Resolution
//!
//! Resolves incoming Host headers to sites. A host is tried, in order:
//! 1. exactly as given (after normalization), e.g. `shop.example.com:8080`
//! 2. with the port stripped, e.g. `shop.example.com`
//! 3. with `www.` added or removed, running steps 1-2 once more for that variant
//! 4. otherwise the configured default site, or NotFound without one
//!
//! Every outcome for a host (including "nothing matched") is written to the
//! resolution cache under the host as received, so repeat lookups skip the store
//! until the entry expires or is invalidated.

use async_trait::async_trait;
use multihost_shared::{Site, SiteId, SiteStore, StoreError};
use std::sync::{Arc, RwLock};

use super::cache::{CachedSite, DomainCache, ResolutionCache};
use crate::config::ResolverSettings;

const WWW_PREFIX: &str = "www.";

/// Result of resolving a host
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// A site is registered for the host or one of its fallback variants
    Matched(Site),
    /// Nothing matched; this is the configured default site
    Fallback(Site),
    /// Nothing matched and no default site is configured
    NotFound,
}

impl Resolution {
    pub fn site(&self) -> Option<&Site> {
        match self {
            Resolution::Matched(site) | Resolution::Fallback(site) => Some(site),
            Resolution::NotFound => None,
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, Resolution::Matched(_))
    }
}

/// Decides which site a host belongs to
///
/// Injected into the request pipeline at startup so deployments can swap in
/// their own strategy.
#[async_trait]
pub trait SiteResolver: Send + Sync {
    async fn resolve(&self, host: &str) -> Result<Resolution, HostResolveError>;

    /// Id of the site unmatched hosts fall back to
    fn default_site_id(&self) -> Option<SiteId>;
}

/// Host resolver with caching
#[derive(Clone)]
pub struct HostResolver {
    store: Arc<dyn SiteStore>,
    cache: Arc<dyn ResolutionCache>,
    settings: ResolverSettings,
    default_site: Arc<RwLock<Option<Site>>>,
}

impl HostResolver {
    /// Create a new host resolver backed by an in-memory domain cache
    pub fn new(store: Arc<dyn SiteStore>, settings: ResolverSettings) -> Self {
        Self::with_cache(store, settings, Arc::new(DomainCache::new()))
    }

    /// Create a new host resolver with custom cache
    pub fn with_cache(
        store: Arc<dyn SiteStore>,
        settings: ResolverSettings,
        cache: Arc<dyn ResolutionCache>,
    ) -> Self {
        Self {
            store,
            cache,
            settings,
            default_site: Arc::new(RwLock::new(None)),
        }
    }

    /// Resolve a host header to a site
    ///
    /// Returns:
    /// - Ok(Resolution::Matched) if the host or a fallback variant has a site
    /// - Ok(Resolution::Fallback) if nothing matched and a default site is configured
    /// - Ok(Resolution::NotFound) if nothing matched and there is no default
    /// - Err if the store could not be consulted or the default site is missing
    pub async fn resolve(&self, host: &str) -> Result<Resolution, HostResolveError> {
        let host = normalize_host(host);

        if is_malformed_host(&host) {
            tracing::debug!(host = %host, "Malformed host, skipping site lookup");
            return self.fallback().await;
        }

        match self.find_cached(&host).await? {
            Some(site) => Ok(Resolution::Matched(site)),
            None => self.fallback().await,
        }
    }

    /// Load the default site, failing if it is configured but does not exist
    ///
    /// Run at startup: a missing default site is a deployment error that no
    /// request can recover from.
    pub async fn validate_default(&self) -> Result<Option<Site>, HostResolveError> {
        match self.settings.default_site_id {
            Some(id) => self.default_site(id).await.map(Some),
            None => Ok(None),
        }
    }

    /// Cache-through lookup: exact and port-stripped, then the www variant once
    async fn find_cached(&self, host: &str) -> Result<Option<Site>, HostResolveError> {
        if let Some(entry) = self.cache.get(host).await {
            tracing::trace!(host = %host, "Site cache hit");
            return Ok(entry.into_site());
        }

        let mut site = self.find_in_store(host).await?;

        if site.is_none() && self.settings.auto_www {
            if let Some(alternate) = toggle_www(host) {
                // The variant's own entry is only equivalent when toggling it leads
                // back here; `www.www.x` -> `www.x` would otherwise skip `x`.
                let symmetric = toggle_www(&alternate).as_deref() == Some(host);
                site = match self.cache.get(&alternate).await.filter(|_| symmetric) {
                    Some(entry) => entry.into_site(),
                    None => {
                        let found = self.find_in_store(&alternate).await?;
                        if symmetric {
                            self.cache.set(&alternate, found.clone().into()).await;
                        }
                        found
                    }
                };
            }
        }

        self.cache.set(host, site.clone().into()).await;
        Ok(site)
    }

    /// Exact match, then port-stripped match. Never toggles www.
    async fn find_in_store(&self, host: &str) -> Result<Option<Site>, HostResolveError> {
        if let Some(site) = self.store.find_by_domain(host).await? {
            tracing::debug!(host = %host, site_id = %site.id, "Site matched host");
            return Ok(Some(site));
        }

        if let Some(bare) = strip_port(host) {
            if let Some(site) = self.store.find_by_domain(bare).await? {
                tracing::debug!(host = %host, site_id = %site.id, "Site matched host without port");
                return Ok(Some(site));
            }
        }

        Ok(None)
    }

    async fn fallback(&self) -> Result<Resolution, HostResolveError> {
        match self.settings.default_site_id {
            Some(id) => Ok(Resolution::Fallback(self.default_site(id).await?)),
            None => Ok(Resolution::NotFound),
        }
    }

    async fn default_site(&self, id: SiteId) -> Result<Site, HostResolveError> {
        if let Some(site) = self.default_site.read().ok().and_then(|site| site.clone()) {
            return Ok(site);
        }

        let site = self.store.find_default(id).await?.ok_or_else(|| {
            HostResolveError::Configuration(format!("default site {id} does not exist"))
        })?;

        if let Ok(mut default_site) = self.default_site.write() {
            *default_site = Some(site.clone());
        }
        Ok(site)
    }

    /// Invalidate cache for a host and its www variant
    pub async fn invalidate_host(&self, host: &str) {
        let host = normalize_host(host);
        if let Some(alternate) = toggle_www(&host) {
            self.cache.invalidate(&alternate).await;
        }
        self.cache.invalidate(&host).await;
    }

    /// Invalidate all cached entries for a site
    pub async fn invalidate_site(&self, site_id: SiteId) {
        self.cache.invalidate_site(site_id).await;
        if let Ok(mut default_site) = self.default_site.write() {
            if default_site.as_ref().map(|site| site.id) == Some(site_id) {
                *default_site = None;
            }
        }
    }
}

#[async_trait]
impl SiteResolver for HostResolver {
    async fn resolve(&self, host: &str) -> Result<Resolution, HostResolveError> {
        HostResolver::resolve(self, host).await
    }

    fn default_site_id(&self) -> Option<SiteId> {
        self.settings.default_site_id
    }
}

/// Normalize a host header value for lookup and caching
///
/// Host names are case-insensitive and may carry a trailing root dot. The port
/// is kept: it is part of the cache key and is stripped only as a fallback.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim().to_lowercase();
    match host.split_once(':') {
        Some((name, port)) => format!("{}:{}", name.trim_end_matches('.'), port),
        None => host.trim_end_matches('.').to_string(),
    }
}

/// Empty hosts, or hosts with characters no domain or port can contain
pub(crate) fn is_malformed_host(host: &str) -> bool {
    host.is_empty()
        || host.starts_with(':')
        || !host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | ':' | '[' | ']'))
}

/// Everything before the first `:`, if the host has a port
fn strip_port(host: &str) -> Option<&str> {
    host.split_once(':')
        .map(|(name, _)| name)
        .filter(|name| !name.is_empty())
}

/// `www.example.com` <-> `example.com`
fn toggle_www(host: &str) -> Option<String> {
    match host.strip_prefix(WWW_PREFIX) {
        Some("") => None,
        Some(rest) if rest.starts_with(':') => None,
        Some(rest) => Some(rest.to_string()),
        None => Some(format!("{WWW_PREFIX}{host}")),
    }
}

/// Errors that can occur during host resolution
#[derive(Debug, thiserror::Error)]
pub enum HostResolveError {
    #[error("Site store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<StoreError> for HostResolveError {
    fn from(err: StoreError) -> Self {
        HostResolveError::StoreUnavailable(err.to_string())
    }
}
