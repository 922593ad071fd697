//! Binds inbound requests to sites

use axum::http::{HeaderMap, Request};
use std::sync::Arc;
use uuid::Uuid;

use crate::context::{BindState, RejectReason, RequestContext, SiteBinding};
use crate::observability::WarnThrottle;
use crate::routing::{is_malformed_host, HostResolveError, Resolution, SiteResolver};

const X_FORWARDED_HOST: &str = "x-forwarded-host";
const X_REQUEST_ID: &str = "x-request-id";

/// Outcome of binding a request
#[derive(Debug, Clone, PartialEq)]
pub enum BindOutcome {
    Bound(SiteBinding),
    /// No real site for this request; the caller decides how to respond
    Rejected(RejectReason),
}

/// Extracts the host from a request, resolves it, and attaches the site
#[derive(Clone)]
pub struct SiteBinder {
    resolver: Arc<dyn SiteResolver>,
    trust_forwarded_host: bool,
    warnings: Arc<WarnThrottle>,
}

impl SiteBinder {
    pub fn new(resolver: Arc<dyn SiteResolver>) -> Self {
        Self {
            resolver,
            trust_forwarded_host: false,
            warnings: Arc::new(WarnThrottle::default()),
        }
    }

    /// Prefer `X-Forwarded-Host` over `Host` (only behind a trusted proxy)
    pub fn trust_forwarded_host(mut self, trust: bool) -> Self {
        self.trust_forwarded_host = trust;
        self
    }

    /// Bind `request` to a site
    ///
    /// A request whose context is already settled (bound upstream, overridden,
    /// or rejected) is returned as-is without resolving again. Store failures
    /// are returned as errors and leave the context unresolved.
    pub async fn bind<B>(&self, request: &mut Request<B>) -> Result<BindOutcome, HostResolveError> {
        let mut context = match request.extensions().get::<RequestContext>() {
            Some(context) => match context.state() {
                BindState::Bound(binding) => return Ok(BindOutcome::Bound(binding.clone())),
                BindState::Rejected(reason) => return Ok(BindOutcome::Rejected(*reason)),
                BindState::Unresolved => context.clone(),
            },
            None => RequestContext::new(request_id(request.headers())),
        };

        let outcome = match self.request_host(request) {
            Some(host) => self.resolve(&host).await?,
            None => BindOutcome::Rejected(RejectReason::MalformedHost),
        };

        match &outcome {
            BindOutcome::Bound(binding) => {
                tracing::debug!(
                    request_id = %context.request_id(),
                    site_id = %binding.site().id,
                    "Request bound to site"
                );
                context.bind(binding.clone());
            }
            BindOutcome::Rejected(reason) => {
                context.reject(*reason);
            }
        }
        request.extensions_mut().insert(context);

        Ok(outcome)
    }

    async fn resolve(&self, host: &str) -> Result<BindOutcome, HostResolveError> {
        let default_site_id = self.resolver.default_site_id();

        match self.resolver.resolve(host).await? {
            Resolution::Matched(site) if Some(site.id) != default_site_id => {
                Ok(BindOutcome::Bound(SiteBinding::Resolved(site)))
            }
            _ => {
                if self.warnings.should_emit(host) {
                    tracing::warn!(host = %host, "No site matches host, rejecting request");
                } else {
                    tracing::debug!(host = %host, "No site matches host, rejecting request");
                }
                Ok(BindOutcome::Rejected(RejectReason::NoMatchingSite))
            }
        }
    }

    /// Host the request was addressed to, if it carried a usable one
    pub fn request_host<B>(&self, request: &Request<B>) -> Option<String> {
        let headers = request.headers();

        let forwarded = self
            .trust_forwarded_host
            .then(|| header_str(headers, X_FORWARDED_HOST))
            .flatten()
            .and_then(|value| value.split(',').next());

        forwarded
            .or_else(|| header_str(headers, axum::http::header::HOST.as_str()))
            .or_else(|| request.uri().authority().map(|authority| authority.as_str()))
            .map(str::trim)
            .filter(|host| !is_malformed_host(host))
            .map(str::to_string)
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Use the caller's request id when it is a UUID, otherwise mint one
fn request_id(headers: &HeaderMap) -> Uuid {
    header_str(headers, X_REQUEST_ID)
        .and_then(|value| Uuid::parse_str(value.trim()).ok())
        .unwrap_or_else(Uuid::new_v4)
}
