//! Shared application state

use multihost_shared::SiteStore;
use std::sync::Arc;

use crate::binding::{BindingState, RejectionPolicy, SiteBinder};
use crate::config::Config;
use crate::routing::HostResolver;

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn SiteStore>,
    binder: SiteBinder,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn SiteStore>, resolver: HostResolver) -> Self {
        let binder = SiteBinder::new(Arc::new(resolver))
            .trust_forwarded_host(config.trust_forwarded_host);

        Self {
            config: Arc::new(config),
            store,
            binder,
        }
    }

    /// State for the site binding middleware
    pub fn binding_state(&self) -> BindingState {
        let rejection = match (self.config.redirect_on_no_match, &self.config.redirect_url) {
            (true, Some(url)) => RejectionPolicy::Redirect(url.clone()),
            _ => RejectionPolicy::Respond,
        };

        BindingState {
            binder: self.binder.clone(),
            rejection,
        }
    }
}
