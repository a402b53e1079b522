use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use super::auth::AuthUser;
use crate::app::AppState;
use crate::error::ApiError;
use crate::services::TenantContext;

/// Header carrying the caller's chosen tenant when no `?tenant=` is given
pub const TENANT_HEADER: &str = "x-tenant-id";

/// Id of the tenant a request is scoped to, injected by [`require_tenant_middleware`]
#[derive(Clone, Copy, Debug)]
pub struct CurrentTenant(pub Uuid);

/// Resolve the caller's [`TenantContext`] and inject it into the request
pub async fn tenant_context_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("JWT authentication required before tenant resolution"))?;

    let requested = requested_tenant(request.uri().query(), &headers);
    let context = state
        .tenants
        .load(auth_user.user_id, requested.as_deref())
        .await?;

    if let Some(tenant) = &context.current_tenant {
        tracing::debug!("Request scoped to tenant {} ({})", tenant.name, tenant.id);
    }

    request.extensions_mut().insert(context);

    Ok(next.run(request).await)
}

/// Reject callers whose context has no current tenant
pub async fn require_tenant_middleware(mut request: Request, next: Next) -> Result<Response, ApiError> {
    let tenant_id = request
        .extensions()
        .get::<TenantContext>()
        .ok_or_else(|| ApiError::internal_server_error("Tenant context required before tenant guard"))?
        .require_tenant()?;

    request.extensions_mut().insert(CurrentTenant(tenant_id));

    Ok(next.run(request).await)
}

/// `?tenant=` wins over the `X-Tenant-Id` header
fn requested_tenant(query: Option<&str>, headers: &HeaderMap) -> Option<String> {
    let present = |v: &String| !v.trim().is_empty();

    let from_query = query.and_then(|q| {
        url::form_urlencoded::parse(q.as_bytes())
            .find(|(key, _)| key == "tenant")
            .map(|(_, value)| value.into_owned())
    });

    from_query.filter(present).or_else(|| {
        headers
            .get(TENANT_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .filter(present)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn query_parameter_beats_header() {
        let mut headers = HeaderMap::new();
        headers.insert(TENANT_HEADER, HeaderValue::from_static("from-header"));

        assert_eq!(
            requested_tenant(Some("page=2&tenant=from-query"), &headers).as_deref(),
            Some("from-query")
        );
        assert_eq!(requested_tenant(Some("page=2"), &headers).as_deref(), Some("from-header"));
        assert_eq!(requested_tenant(None, &HeaderMap::new()), None);
        assert_eq!(requested_tenant(Some("tenant="), &HeaderMap::new()), None);
        assert_eq!(requested_tenant(Some("tenant="), &headers).as_deref(), Some("from-header"));
    }
}
