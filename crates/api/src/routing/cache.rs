//! Resolution caches
//!
//! Caches host-to-site lookups to reduce store queries for routing. A cache is an
//! optimization only: entries may vanish at any time and the store stays
//! authoritative.

use async_trait::async_trait;
use multihost_shared::{Site, SiteId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Default cache TTL (5 minutes)
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Default upper bound on cached hosts
const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// What the cache remembers about a host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "site", rename_all = "snake_case")]
pub enum CachedSite {
    /// The host resolved to this site
    Found(Site),
    /// The host was looked up and nothing matched
    Missing,
}

impl CachedSite {
    pub fn into_site(self) -> Option<Site> {
        match self {
            CachedSite::Found(site) => Some(site),
            CachedSite::Missing => None,
        }
    }

    fn site_id(&self) -> Option<SiteId> {
        match self {
            CachedSite::Found(site) => Some(site.id),
            CachedSite::Missing => None,
        }
    }
}

impl From<Option<Site>> for CachedSite {
    fn from(site: Option<Site>) -> Self {
        site.map_or(CachedSite::Missing, CachedSite::Found)
    }
}

/// Host -> site cache used by the resolver
///
/// Implementations must be safe to share between concurrent requests. Failures
/// inside the backend are reported as misses; they never fail a resolution.
#[async_trait]
pub trait ResolutionCache: Send + Sync {
    /// Returns `None` on a miss (absent, expired, or backend trouble)
    async fn get(&self, host: &str) -> Option<CachedSite>;

    async fn set(&self, host: &str, entry: CachedSite);

    async fn invalidate(&self, host: &str);

    /// Drop every entry that points at `site_id`. Backends that cannot enumerate
    /// their keys leave entries to expire.
    async fn invalidate_site(&self, _site_id: SiteId) {}
}

/// Cache entry with expiration
#[derive(Clone)]
struct CacheEntry {
    site: CachedSite,
    expires_at: Instant,
}

impl CacheEntry {
    fn new(site: CachedSite, ttl: Duration) -> Self {
        Self {
            site,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() > self.expires_at
    }
}

/// Thread-safe in-memory domain cache
pub struct DomainCache {
    /// Maps normalized host -> cached resolution
    cache: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
    max_entries: usize,
}

impl Default for DomainCache {
    fn default() -> Self {
        Self::new()
    }
}

impl DomainCache {
    /// Create a new cache with default TTL
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_CACHE_TTL)
    }

    /// Create a new cache with custom TTL
    pub fn with_ttl(ttl: Duration) -> Self {
        Self::with_limits(ttl, DEFAULT_MAX_ENTRIES)
    }

    /// Create a new cache with custom TTL and entry cap
    pub fn with_limits(ttl: Duration, max_entries: usize) -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
            ttl,
            max_entries,
        }
    }

    /// Get the cached resolution for a host
    /// Returns Some(CachedSite::Found) if found and valid
    /// Returns Some(CachedSite::Missing) if host was cached as not resolving
    /// Returns None if not in cache or expired
    pub fn get_entry(&self, host: &str) -> Option<CachedSite> {
        let cache = self.cache.read().ok()?;
        let entry = cache.get(host)?;

        if entry.is_expired() {
            None
        } else {
            Some(entry.site.clone())
        }
    }

    /// Cache a host -> site mapping
    ///
    /// When the cache is full, expired entries go first, then negative ones. If
    /// it is still full of live matches the new entry is not cached.
    pub fn set_entry(&self, host: &str, site: CachedSite) {
        let Ok(mut cache) = self.cache.write() else {
            return;
        };

        if cache.len() >= self.max_entries && !cache.contains_key(host) {
            cache.retain(|_, entry| !entry.is_expired());
            if cache.len() >= self.max_entries {
                cache.retain(|_, entry| entry.site != CachedSite::Missing);
            }
            if cache.len() >= self.max_entries {
                return;
            }
        }

        cache.insert(host.to_string(), CacheEntry::new(site, self.ttl));
    }

    /// Invalidate a specific host
    pub fn invalidate_host(&self, host: &str) {
        if let Ok(mut cache) = self.cache.write() {
            cache.remove(host);
        }
    }

    /// Invalidate all entries for a site (useful when the site's domain or settings change)
    pub fn invalidate_site_entries(&self, site_id: SiteId) {
        if let Ok(mut cache) = self.cache.write() {
            cache.retain(|_, entry| entry.site.site_id() != Some(site_id));
        }
    }

    /// Clear expired entries (call periodically for memory management)
    pub fn cleanup(&self) -> usize {
        if let Ok(mut cache) = self.cache.write() {
            let before = cache.len();
            cache.retain(|_, entry| !entry.is_expired());
            before - cache.len()
        } else {
            0
        }
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        if let Ok(cache) = self.cache.read() {
            let total = cache.len();
            let expired = cache.values().filter(|e| e.is_expired()).count();
            let negative = cache
                .values()
                .filter(|e| !e.is_expired() && e.site == CachedSite::Missing)
                .count();
            CacheStats {
                total_entries: total,
                expired_entries: expired,
                active_entries: total - expired,
                negative_entries: negative,
            }
        } else {
            CacheStats::default()
        }
    }
}

#[async_trait]
impl ResolutionCache for DomainCache {
    async fn get(&self, host: &str) -> Option<CachedSite> {
        self.get_entry(host)
    }

    async fn set(&self, host: &str, entry: CachedSite) {
        self.set_entry(host, entry);
    }

    async fn invalidate(&self, host: &str) {
        self.invalidate_host(host);
    }

    async fn invalidate_site(&self, site_id: SiteId) {
        self.invalidate_site_entries(site_id);
    }
}

/// Cache statistics
#[derive(Default, Debug, Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub expired_entries: usize,
    pub active_entries: usize,
    pub negative_entries: usize,
}
