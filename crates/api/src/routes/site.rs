//! Current site endpoint

use axum::{Extension, Json};
use multihost_shared::SiteId;
use serde::Serialize;
use uuid::Uuid;

use crate::context::RequestContext;
use crate::error::{ApiError, ApiResult};

#[derive(Debug, Serialize)]
pub struct SiteResponse {
    pub id: SiteId,
    pub domain: String,
    pub name: String,
    pub settings: serde_json::Value,
    /// True when an upstream layer picked the site instead of the Host header
    pub overridden: bool,
    pub request_id: Uuid,
}

/// Return the site the request is bound to
pub async fn current_site(
    Extension(context): Extension<RequestContext>,
) -> ApiResult<Json<SiteResponse>> {
    let binding = context.current().ok_or(ApiError::NoMatchingSite)?;
    let site = binding.site();

    Ok(Json(SiteResponse {
        id: site.id,
        domain: site.domain.clone(),
        name: site.name.clone(),
        settings: site.settings.clone(),
        overridden: binding.is_override(),
        request_id: context.request_id(),
    }))
}
