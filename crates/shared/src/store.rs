//! Site record storage
//!
//! The store is the authoritative source for sites. Callers that need speed put
//! a cache in front of it; nothing here caches.

use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;
use time::OffsetDateTime;

use crate::error::StoreError;
use crate::types::{Site, SiteId};

/// Lookup-by-domain datastore for site records
#[async_trait]
pub trait SiteStore: Send + Sync {
    /// Find the site registered for exactly `domain`
    async fn find_by_domain(&self, domain: &str) -> Result<Option<Site>, StoreError>;

    /// Find a site by id (used for the configured default site)
    async fn find_default(&self, id: SiteId) -> Result<Option<Site>, StoreError>;

    /// Check that the store is reachable
    async fn ping(&self) -> Result<(), StoreError>;
}

// =============================================================================
// PostgreSQL
// =============================================================================

#[derive(sqlx::FromRow)]
struct SiteRow {
    id: i64,
    domain: String,
    name: String,
    settings: sqlx::types::Json<serde_json::Value>,
    created_at: OffsetDateTime,
}

impl From<SiteRow> for Site {
    fn from(row: SiteRow) -> Self {
        Site {
            id: SiteId(row.id),
            domain: row.domain,
            name: row.name,
            settings: row.settings.0,
            created_at: row.created_at,
        }
    }
}

/// Site store backed by the `sites` table
#[derive(Clone)]
pub struct PgSiteStore {
    pool: PgPool,
}

impl PgSiteStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SiteStore for PgSiteStore {
    async fn find_by_domain(&self, domain: &str) -> Result<Option<Site>, StoreError> {
        let row: Option<SiteRow> = sqlx::query_as(
            "SELECT id, domain, name, settings, created_at FROM sites WHERE domain = $1",
        )
        .bind(domain)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Site::from))
    }

    async fn find_default(&self, id: SiteId) -> Result<Option<Site>, StoreError> {
        let row: Option<SiteRow> = sqlx::query_as(
            "SELECT id, domain, name, settings, created_at FROM sites WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Site::from))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

// =============================================================================
// In-memory
// =============================================================================

/// In-memory site store
///
/// Useful for local development and tests. Counts every lookup so callers can
/// assert how often the store was actually hit, and can simulate an outage.
#[derive(Default)]
pub struct MemorySiteStore {
    sites: RwLock<HashMap<String, Site>>,
    lookups: AtomicUsize,
    unavailable: AtomicBool,
}

impl MemorySiteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sites(sites: impl IntoIterator<Item = Site>) -> Self {
        let store = Self::new();
        for site in sites {
            store.insert(site);
        }
        store
    }

    /// Register (or replace) a site under its domain
    pub fn insert(&self, site: Site) {
        if let Ok(mut sites) = self.sites.write() {
            sites.insert(site.domain.clone(), site);
        }
    }

    /// Remove the site registered for `domain`
    pub fn remove(&self, domain: &str) -> Option<Site> {
        self.sites.write().ok()?.remove(domain)
    }

    /// Number of lookups served so far (domain and id lookups alike)
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    /// Toggle a simulated outage; while unavailable every call fails
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store offline".to_string()));
        }
        Ok(())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, HashMap<String, Site>>, StoreError> {
        self.sites
            .read()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl SiteStore for MemorySiteStore {
    async fn find_by_domain(&self, domain: &str) -> Result<Option<Site>, StoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(self.read()?.get(domain).cloned())
    }

    async fn find_default(&self, id: SiteId) -> Result<Option<Site>, StoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(self.read()?.values().find(|site| site.id == id).cloned())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_available()
    }
}
