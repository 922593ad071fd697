//! Site binding middleware
//!
//! Binds every request to a site before it reaches a handler. Handlers read the
//! site from the `RequestContext` extension or from `context::current_site()`.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::binder::{BindOutcome, SiteBinder};
use crate::context::{self, RejectReason};
use crate::error::ApiError;

/// What to do with requests that match no site
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionPolicy {
    /// `302 Found` to a safe location
    Redirect(String),
    /// JSON error response
    Respond,
}

/// State required by the site binding middleware
#[derive(Clone)]
pub struct BindingState {
    pub binder: SiteBinder,
    pub rejection: RejectionPolicy,
}

/// Middleware that binds the request to its site
///
/// - Bound: the handler runs with the site in scope
/// - Rejected: redirect or JSON error, per the rejection policy
/// - Store unavailable: 503, never a silent default site
pub async fn site_binding_middleware(
    State(state): State<BindingState>,
    mut request: Request,
    next: Next,
) -> Response {
    match state.binder.bind(&mut request).await {
        Ok(BindOutcome::Bound(binding)) => context::scope(binding, next.run(request)).await,
        Ok(BindOutcome::Rejected(reason)) => rejection_response(&state.rejection, reason),
        Err(e) => ApiError::from(e).into_response(),
    }
}

fn rejection_response(policy: &RejectionPolicy, reason: RejectReason) -> Response {
    match (policy, reason) {
        (RejectionPolicy::Redirect(url), _) => {
            (StatusCode::FOUND, [(header::LOCATION, url.clone())]).into_response()
        }
        (RejectionPolicy::Respond, RejectReason::MalformedHost) => {
            ApiError::BadRequest(reason.to_string()).into_response()
        }
        (RejectionPolicy::Respond, RejectReason::NoMatchingSite) => {
            ApiError::NoMatchingSite.into_response()
        }
    }
}
