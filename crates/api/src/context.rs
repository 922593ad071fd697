//! Per-request site context
//!
//! The site a request belongs to travels with the request in two places:
//! - a [`RequestContext`] in the request extensions, for anything holding the request
//! - a tokio task-local for the handler future, read with [`current_site`]
//!
//! Both are scoped to a single request. The task-local only exists inside
//! [`scope`], so a binding can never outlive its request or be observed by
//! another request's task.

use multihost_shared::Site;
use std::fmt;
use std::future::Future;
use uuid::Uuid;

tokio::task_local! {
    static CURRENT_SITE: SiteBinding;
}

/// The site attached to a request
#[derive(Debug, Clone, PartialEq)]
pub enum SiteBinding {
    /// Resolved from the request's Host header
    Resolved(Site),
    /// Attached by an upstream layer; passed through without resolution
    Override(Site),
}

impl SiteBinding {
    pub fn site(&self) -> &Site {
        match self {
            SiteBinding::Resolved(site) | SiteBinding::Override(site) => site,
        }
    }

    pub fn is_override(&self) -> bool {
        matches!(self, SiteBinding::Override(_))
    }
}

/// Why a request was not bound to a site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The host matched nothing, or only the default site
    NoMatchingSite,
    /// The request carried no usable host
    MalformedHost,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::NoMatchingSite => f.write_str("no matching tenant"),
            RejectReason::MalformedHost => f.write_str("malformed host"),
        }
    }
}

/// Binding lifecycle of one request: `Unresolved -> {Bound | Rejected}`
///
/// Both outcomes are terminal.
#[derive(Debug, Clone, PartialEq)]
pub enum BindState {
    Unresolved,
    Bound(SiteBinding),
    Rejected(RejectReason),
}

/// Request-scoped site context, stored in the request extensions
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: Uuid,
    state: BindState,
}

impl RequestContext {
    pub fn new(request_id: Uuid) -> Self {
        Self {
            request_id,
            state: BindState::Unresolved,
        }
    }

    /// Context pre-bound to `site`, for layers that pick the site themselves
    pub fn with_override(request_id: Uuid, site: Site) -> Self {
        Self {
            request_id,
            state: BindState::Bound(SiteBinding::Override(site)),
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn state(&self) -> &BindState {
        &self.state
    }

    /// Bind the request to a site. Returns false if the context already reached
    /// a terminal state, in which case nothing changes.
    pub fn bind(&mut self, binding: SiteBinding) -> bool {
        self.transition(BindState::Bound(binding))
    }

    /// Mark the request as rejected. Same terminal rules as [`Self::bind`].
    pub fn reject(&mut self, reason: RejectReason) -> bool {
        self.transition(BindState::Rejected(reason))
    }

    fn transition(&mut self, next: BindState) -> bool {
        if self.state != BindState::Unresolved {
            tracing::debug!(request_id = %self.request_id, state = ?self.state, "Request context already settled");
            return false;
        }
        self.state = next;
        true
    }

    /// The bound site, if any
    pub fn current(&self) -> Option<&SiteBinding> {
        match &self.state {
            BindState::Bound(binding) => Some(binding),
            _ => None,
        }
    }
}

/// Run `fut` with `binding` as the current site
pub async fn scope<F>(binding: SiteBinding, fut: F) -> F::Output
where
    F: Future,
{
    CURRENT_SITE.scope(binding, fut).await
}

/// The site bound to the running request task, if any
pub fn current_site() -> Option<SiteBinding> {
    CURRENT_SITE.try_with(|binding| binding.clone()).ok()
}
