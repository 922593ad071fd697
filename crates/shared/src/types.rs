//! Common types used across Multihost

use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;

// =============================================================================
// ID Wrappers
// =============================================================================

/// Site ID wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteId(pub i64);

impl From<i64> for SiteId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SiteId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

// =============================================================================
// Sites
// =============================================================================

/// A site (tenant) that incoming requests are routed to by Host header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub id: SiteId,
    /// Domain name the site answers to, e.g. `shop.example.com`
    pub domain: String,
    /// Human-readable display name
    pub name: String,
    /// Arbitrary per-site configuration
    #[serde(default)]
    pub settings: serde_json::Value,
    pub created_at: OffsetDateTime,
}

impl Site {
    /// Build a site with an empty settings object, named after its domain
    pub fn new(id: impl Into<SiteId>, domain: impl Into<String>) -> Self {
        let domain = domain.into();
        Self {
            id: id.into(),
            name: domain.clone(),
            domain,
            settings: serde_json::Value::Object(Default::default()),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_settings(mut self, settings: serde_json::Value) -> Self {
        self.settings = settings;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_id_parse() {
        assert_eq!("5".parse::<SiteId>().unwrap(), SiteId(5));
        assert_eq!(" 12 ".parse::<SiteId>().unwrap(), SiteId(12));
        assert!("abc".parse::<SiteId>().is_err());
    }

    #[test]
    fn test_site_serializes_id_transparently() {
        let site = Site::new(5, "shop.test").with_name("Shop");
        let json = serde_json::to_value(&site).unwrap();

        assert_eq!(json["id"], 5);
        assert_eq!(json["domain"], "shop.test");
        assert_eq!(json["name"], "Shop");

        let back: Site = serde_json::from_value(json).unwrap();
        assert_eq!(back, site);
    }
}
