//! Identity Resolver
//!
//! Turns the inbound context of a unit of work into at most one tenant.
//! Resolution is a pure lookup: nothing is switched or published here.

use crate::directory::TenantDirectory;
use crate::error::Result;
use crate::tenant::{Tenant, normalize_domain};
use std::sync::Arc;
use tracing::debug;

/// What an HTTP request tells us about its tenant
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestSource {
    /// Host name without port
    pub host: String,
    /// First segment of the request path, used as a numeric id fallback
    pub path_segment: Option<String>,
    /// Full request URL, for the security record
    pub url: String,
    /// Caller address, for the security record
    pub client_addr: Option<String>,
}

impl RequestSource {
    /// Source for `host` with a bare `http://<host>/` URL
    pub fn new(host: impl Into<String>) -> Self {
        let host = host.into();
        Self {
            url: format!("http://{}/", host),
            host,
            ..Default::default()
        }
    }

    /// Set the first path segment
    pub fn with_path_segment(mut self, segment: impl Into<String>) -> Self {
        self.path_segment = Some(segment.into());
        self
    }

    /// Set the caller address
    pub fn with_client_addr(mut self, addr: impl Into<String>) -> Self {
        self.client_addr = Some(addr.into());
        self
    }
}

/// Where a unit of work came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionSource {
    /// Incoming HTTP request
    Http(RequestSource),
    /// Console invocation with the raw `--tenant` value, if any
    Console { token: Option<String> },
}

impl ResolutionSource {
    /// Console source for a raw `--tenant` value
    pub fn console(token: Option<impl Into<String>>) -> Self {
        ResolutionSource::Console {
            token: token.map(Into::into),
        }
    }

    /// Whether the unit of work is a console command
    pub fn is_console(&self) -> bool {
        matches!(self, ResolutionSource::Console { .. })
    }
}

/// Leftmost host label used for subdomain matching.
///
/// The port is dropped, the host lower-cased, and the label is cut at its
/// first hyphen so `staging-acme.example.com` yields `staging`.
///
/// ```
/// use envtenant_core::subdomain_label;
///
/// assert_eq!(subdomain_label("Acme.Example.com:8080").as_deref(), Some("acme"));
/// assert_eq!(subdomain_label("staging-acme.example.com").as_deref(), Some("staging"));
/// ```
pub fn subdomain_label(host: &str) -> Option<String> {
    let host = strip_port(host.trim()).to_lowercase();
    let label = host.split('.').next()?.split('-').next()?;
    normalize_domain(label)
}

pub(crate) fn strip_port(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        // IPv6 literal
        return rest.split(']').next().unwrap_or(rest);
    }
    host.split(':').next().unwrap_or(host)
}

/// Looks up the tenant for a [`ResolutionSource`]
#[derive(Clone)]
pub struct IdentityResolver {
    directory: Arc<dyn TenantDirectory>,
    pending_connection: String,
    require_active: bool,
}

impl IdentityResolver {
    /// Resolver over `directory` that requires active, provisioned tenants
    pub fn new(directory: Arc<dyn TenantDirectory>) -> Self {
        Self {
            directory,
            pending_connection: "pending".to_string(),
            require_active: true,
        }
    }

    /// Connection name meaning "not provisioned"
    pub fn with_pending_connection(mut self, sentinel: impl Into<String>) -> Self {
        self.pending_connection = sentinel.into();
        self
    }

    /// Whether inactive tenants resolve as not found
    pub fn with_require_active(mut self, require_active: bool) -> Self {
        self.require_active = require_active;
        self
    }

    /// Directory tenants are looked up in
    pub fn directory(&self) -> &Arc<dyn TenantDirectory> {
        &self.directory
    }

    /// Sentinel connection name of unprovisioned tenants
    pub fn pending_connection(&self) -> &str {
        &self.pending_connection
    }

    /// Find the tenant for `source`.
    ///
    /// `Ok(None)` covers both "no match" and "match that must not be
    /// activated". Directory failures are returned as errors.
    pub async fn resolve(&self, source: &ResolutionSource) -> Result<Option<Tenant>> {
        let found = match source {
            ResolutionSource::Http(request) => self.lookup_http(request).await?,
            ResolutionSource::Console { token } => match token {
                Some(token) => self.lookup_console(token).await?,
                None => None,
            },
        };

        Ok(found.filter(|tenant| self.is_activatable(tenant)))
    }

    /// Key reported when `source` does not resolve
    pub fn lookup_key(&self, source: &ResolutionSource) -> String {
        match source {
            ResolutionSource::Http(request) => strip_port(&request.host).to_lowercase(),
            ResolutionSource::Console { token } => {
                token.as_deref().map(str::trim).unwrap_or_default().to_string()
            }
        }
    }

    fn is_activatable(&self, tenant: &Tenant) -> bool {
        if !tenant.is_provisioned(&self.pending_connection) {
            debug!(tenant_id = tenant.id, "Tenant is not provisioned");
            return false;
        }
        if self.require_active && !tenant.is_active {
            debug!(tenant_id = tenant.id, "Tenant is inactive");
            return false;
        }
        true
    }

    async fn lookup_http(&self, request: &RequestSource) -> Result<Option<Tenant>> {
        let host = strip_port(request.host.trim()).to_lowercase();

        if let Some(label) = subdomain_label(&host) {
            if let Some(tenant) = self.directory.find_by_subdomain(&label).await? {
                return Ok(Some(tenant));
            }
        }

        if let Some(alias) = normalize_domain(&host) {
            if let Some(tenant) = self.directory.find_by_alias_domain(&alias).await? {
                return Ok(Some(tenant));
            }
        }

        // Bare tenants (no subdomain, no alias) are addressed by id in the path.
        let id = request
            .path_segment
            .as_deref()
            .and_then(|segment| segment.trim().parse::<u64>().ok());
        if let Some(id) = id {
            let tenant = self.directory.find_by_id(id).await?;
            return Ok(tenant.filter(|t| t.subdomain.is_none() && t.alias_domain.is_none()));
        }

        Ok(None)
    }

    async fn lookup_console(&self, token: &str) -> Result<Option<Tenant>> {
        if let Some(key) = normalize_domain(token.trim()) {
            if let Some(tenant) = self.directory.find_by_subdomain(&key).await? {
                return Ok(Some(tenant));
            }
            if let Some(tenant) = self.directory.find_by_alias_domain(&key).await? {
                return Ok(Some(tenant));
            }
        }

        match token.trim().parse::<u64>() {
            Ok(id) => self.directory.find_by_id(id).await,
            Err(_) => Ok(None),
        }
    }
}
