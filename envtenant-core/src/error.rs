//! Tenant errors

use envtenant_config::ConfigError;
use envtenant_events::EventBusError;

/// Error type returned by a unit of work
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type used across envtenant-core
pub type Result<T> = std::result::Result<T, TenantError>;

/// Errors raised while resolving tenants and switching connections
#[derive(Debug, thiserror::Error)]
pub enum TenantError {
    /// No tenant matched, or the match is not provisioned
    #[error("Tenant not found: {0}")]
    NotFound(String),

    /// The unit of work requires a tenant and none could be identified
    #[error("Tenant could not be resolved for '{0}'")]
    NotResolved(String),

    /// The connection pool refused a configuration change
    #[error("Failed to switch to connection '{connection}': {reason}")]
    ConnectionSwitch {
        /// Connection being switched to
        connection: String,
        /// Pool's explanation
        reason: String,
    },

    /// The tenant directory failed while looking up a tenant
    #[error("Tenant directory lookup failed: {0}")]
    DirectoryLookup(String),

    /// A tenant record, or the lifecycle setup, is malformed
    #[error("Invalid tenant: {0}")]
    Invalid(String),

    /// A subscriber rejected a tenant notification
    #[error("Tenant notification aborted: {0}")]
    Notification(#[from] EventBusError),

    /// A unit of work failed under an active tenant
    #[error("Command failed for tenant {tenant_name} (id {tenant_id}): {source}")]
    UnitOfWork {
        /// Id of the active tenant
        tenant_id: u64,
        /// Name of the active tenant
        tenant_name: String,
        /// Error returned by the unit of work
        #[source]
        source: BoxError,
    },

    /// A unit of work failed while no tenant was active
    #[error("Command failed: {0}")]
    Command(#[source] BoxError),

    /// Tenancy settings could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl TenantError {
    pub(crate) fn switch(connection: &str, reason: impl Into<String>) -> Self {
        TenantError::ConnectionSwitch {
            connection: connection.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether the error means "no tenant" rather than an infrastructure failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, TenantError::NotFound(_) | TenantError::NotResolved(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_of_work_names_tenant() {
        let err = TenantError::UnitOfWork {
            tenant_id: 7,
            tenant_name: "Acme".to_string(),
            source: "disk full".into(),
        };
        assert_eq!(
            err.to_string(),
            "Command failed for tenant Acme (id 7): disk full"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_is_not_found() {
        assert!(TenantError::NotFound("acme".into()).is_not_found());
        assert!(TenantError::NotResolved("acme.example.com".into()).is_not_found());
        assert!(!TenantError::switch("mysql", "unknown connection").is_not_found());
    }
}
