//! HTTP boundary
//!
//! Extracts a [`RequestSource`] from an `http::Request` and turns an
//! unresolved request into a hard failure.

use crate::context::ResolutionContext;
use crate::error::{Result, TenantError};
use crate::lifecycle::{Resolution, TenantLifecycle};
use crate::resolver::{RequestSource, ResolutionSource, strip_port};
use crate::tenant::Tenant;
use envtenant_log::emergency;
use http::Request;
use http::header::HOST;
use std::net::SocketAddr;

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_REAL_IP: &str = "x-real-ip";

impl RequestSource {
    /// Read host, first path segment, URL and caller address from a request.
    ///
    /// The host comes from the `Host` header, falling back to the URI
    /// authority. The caller address is the first `X-Forwarded-For` hop,
    /// then `X-Real-IP`, then a `SocketAddr` request extension.
    pub fn from_request<B>(request: &Request<B>) -> Self {
        let raw_host = request
            .headers()
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .or_else(|| request.uri().authority().map(|a| a.as_str().to_string()))
            .unwrap_or_default();
        let host = strip_port(raw_host.trim()).to_lowercase();

        let path_segment = request
            .uri()
            .path()
            .split('/')
            .find(|segment| !segment.is_empty())
            .map(str::to_string);

        let url = if request.uri().scheme().is_some() {
            request.uri().to_string()
        } else {
            let path = request
                .uri()
                .path_and_query()
                .map(|p| p.as_str())
                .unwrap_or("/");
            format!("http://{}{}", raw_host.trim(), path)
        };

        Self {
            host,
            path_segment,
            url,
            client_addr: client_addr(request),
        }
    }
}

fn client_addr<B>(request: &Request<B>) -> Option<String> {
    let header = |name: &str| {
        request
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(forwarded) = header(X_FORWARDED_FOR) {
        if let Some(first) = forwarded.split(',').map(str::trim).find(|h| !h.is_empty()) {
            return Some(first.to_string());
        }
    }

    if let Some(real_ip) = header(X_REAL_IP) {
        return Some(real_ip.to_string());
    }

    request
        .extensions()
        .get::<SocketAddr>()
        .map(|addr| addr.ip().to_string())
}

/// Resolve the tenant of an HTTP request, failing when there is none.
///
/// An unresolved request is recorded at emergency severity with the URL and
/// caller address before [`TenantError::NotResolved`] is returned.
pub async fn resolve_request(
    lifecycle: &TenantLifecycle,
    ctx: &mut ResolutionContext,
    source: RequestSource,
) -> Result<Tenant> {
    let url = source.url.clone();
    let client_addr = source.client_addr.clone().unwrap_or_else(|| "unknown".to_string());
    let fallback_key = source.host.clone();

    match lifecycle.resolve(ctx, &ResolutionSource::Http(source)).await? {
        Resolution::Resolved(tenant) => Ok(tenant),
        Resolution::NotResolved { key } => {
            emergency!(url = %url, client_addr = %client_addr, key = %key, "Tenant could not be resolved");
            Err(TenantError::NotResolved(key))
        }
        Resolution::Unscoped => Err(TenantError::NotResolved(fallback_key)),
    }
}
