//! Logging setup and log-noise control

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LogFormat;

/// Default window during which a repeated warning is suppressed
pub const DEFAULT_WARN_WINDOW: Duration = Duration::from_secs(300);

/// Upper bound on remembered warning keys
const MAX_WARN_KEYS: usize = 10_000;

/// Initialize the global tracing subscriber
pub fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "multihost_api=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Deduplicates warnings by key within a time window
///
/// A host that matches no site tends to be requested over and over (bots,
/// stale DNS). The first request in each window is logged; the rest are not.
pub struct WarnThrottle {
    window: Duration,
    seen: Mutex<HashMap<String, Instant>>,
}

impl Default for WarnThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_WARN_WINDOW)
    }
}

impl WarnThrottle {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Returns true if a warning for `key` should be emitted now
    pub fn should_emit(&self, key: &str) -> bool {
        let Ok(mut seen) = self.seen.lock() else {
            return true;
        };
        let now = Instant::now();

        if let Some(last) = seen.get(key) {
            if now.duration_since(*last) < self.window {
                return false;
            }
        }

        if seen.len() >= MAX_WARN_KEYS {
            let window = self.window;
            seen.retain(|_, last| now.duration_since(*last) < window);
            if seen.len() >= MAX_WARN_KEYS {
                seen.clear();
            }
        }

        seen.insert(key.to_string(), now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_repeated_key_is_suppressed() {
        let throttle = WarnThrottle::new(Duration::from_secs(60));

        assert!(throttle.should_emit("unknown.test"));
        assert!(!throttle.should_emit("unknown.test"));
        assert!(throttle.should_emit("other.test"));
    }

    #[test]
    fn test_key_is_emitted_again_after_window() {
        let throttle = WarnThrottle::new(Duration::from_millis(30));

        assert!(throttle.should_emit("unknown.test"));
        sleep(Duration::from_millis(40));
        assert!(throttle.should_emit("unknown.test"));
    }
}
