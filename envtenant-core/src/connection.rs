//! Connection Context Switch
//!
//! Re-points the connection pool at a tenant's connection and table prefix.
//! The [`ResolutionContext`] is only updated once the pool accepted every
//! change, so readers never observe a half-applied switch.

use crate::context::ResolutionContext;
use crate::error::{Result, TenantError};
use crate::tenant::Tenant;
use async_trait::async_trait;
use envtenant_config::{ConnectionConfig, TenancyConfig};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};

/// Connection parameter holding the table prefix
pub const PREFIX_PARAMETER: &str = "prefix";

/// Connection pool collaborator
#[async_trait]
pub trait ConnectionPool: Send + Sync {
    /// Make `name` the target of subsequent queries
    async fn set_default_connection(&self, name: &str) -> Result<()>;

    /// Set a per-connection parameter such as [`PREFIX_PARAMETER`]
    ///
    /// Takes effect for handles opened after the call.
    async fn set_connection_parameter(&self, name: &str, key: &str, value: &str) -> Result<()>;

    /// Drop any cached handle so the next use reopens with current parameters
    async fn purge_connection(&self, name: &str) -> Result<()>;
}

/// An open (simulated) connection handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionHandle {
    /// Connection name the handle was opened on
    pub connection: String,
    /// Prefix parameter at the time the handle was opened
    pub prefix: String,
    /// Incremented every time a handle is opened
    pub generation: u64,
}

#[derive(Debug, Default)]
struct RegistryState {
    known: BTreeMap<String, ConnectionConfig>,
    default: String,
    parameters: HashMap<String, HashMap<String, String>>,
    handles: HashMap<String, ConnectionHandle>,
    generation: u64,
    purged: Vec<String>,
}

/// In-memory [`ConnectionPool`] over a fixed set of configured connections.
///
/// Tracks the default connection, per-connection parameters and one cached
/// handle per connection. Create one per concurrently running unit of work.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    state: RwLock<RegistryState>,
}

impl ConnectionRegistry {
    /// Registry over `connections`, with `default_connection` always known.
    ///
    /// Each connection's prefix parameter starts at its configured prefix.
    pub fn new(
        default_connection: impl Into<String>,
        connections: impl IntoIterator<Item = (String, ConnectionConfig)>,
    ) -> Self {
        let default = default_connection.into();
        let mut known: BTreeMap<String, ConnectionConfig> = connections.into_iter().collect();
        known.entry(default.clone()).or_default();

        let parameters = known
            .iter()
            .map(|(name, config)| {
                let mut params = HashMap::new();
                params.insert(
                    PREFIX_PARAMETER.to_string(),
                    config.prefix.clone().unwrap_or_default(),
                );
                (name.clone(), params)
            })
            .collect();

        Self {
            state: RwLock::new(RegistryState {
                known,
                default,
                parameters,
                ..Default::default()
            }),
        }
    }

    /// Registry over the connections in the tenancy settings
    pub fn from_config(config: &TenancyConfig) -> Self {
        Self::new(
            config.default_connection.clone(),
            config
                .connections
                .iter()
                .map(|(name, c)| (name.clone(), c.clone())),
        )
    }

    /// Current default connection name
    pub fn default_connection(&self) -> String {
        self.state.read().default.clone()
    }

    /// Parameter `key` of `connection`, if set
    pub fn parameter(&self, connection: &str, key: &str) -> Option<String> {
        self.state
            .read()
            .parameters
            .get(connection)
            .and_then(|params| params.get(key).cloned())
    }

    /// Whether `connection` is configured
    pub fn is_known(&self, connection: &str) -> bool {
        self.state.read().known.contains_key(connection)
    }

    /// Whether a handle for `connection` is currently open
    pub fn is_cached(&self, connection: &str) -> bool {
        self.state.read().handles.contains_key(connection)
    }

    /// Connections purged so far, in order
    pub fn purged(&self) -> Vec<String> {
        self.state.read().purged.clone()
    }

    /// Number of purges so far
    pub fn purge_count(&self) -> usize {
        self.state.read().purged.len()
    }

    /// Handle for the current default connection, opened on first use
    pub fn connect(&self) -> ConnectionHandle {
        let mut state = self.state.write();
        let name = state.default.clone();

        if let Some(handle) = state.handles.get(&name) {
            return handle.clone();
        }

        state.generation += 1;
        let handle = ConnectionHandle {
            prefix: state
                .parameters
                .get(&name)
                .and_then(|p| p.get(PREFIX_PARAMETER).cloned())
                .unwrap_or_default(),
            connection: name.clone(),
            generation: state.generation,
        };
        debug!(connection = %name, generation = handle.generation, "Opened connection");
        state.handles.insert(name, handle.clone());
        handle
    }

    fn ensure_known(state: &RegistryState, name: &str) -> Result<()> {
        if state.known.contains_key(name) {
            Ok(())
        } else {
            Err(TenantError::switch(name, "connection is not configured"))
        }
    }
}

#[async_trait]
impl ConnectionPool for ConnectionRegistry {
    async fn set_default_connection(&self, name: &str) -> Result<()> {
        let mut state = self.state.write();
        Self::ensure_known(&state, name)?;
        state.default = name.to_string();
        Ok(())
    }

    async fn set_connection_parameter(&self, name: &str, key: &str, value: &str) -> Result<()> {
        let mut state = self.state.write();
        Self::ensure_known(&state, name)?;
        state
            .parameters
            .entry(name.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn purge_connection(&self, name: &str) -> Result<()> {
        let mut state = self.state.write();
        Self::ensure_known(&state, name)?;
        state.handles.remove(name);
        state.purged.push(name.to_string());
        Ok(())
    }
}

/// Connection and prefix a tenant runs under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    /// Connection name
    pub connection: String,
    /// Table prefix, `None` for unprefixed tables
    pub prefix: Option<String>,
    /// Whether the connection belongs to the tenant rather than the fallback
    pub dedicated: bool,
}

impl ConnectionTarget {
    /// The tenant's own connection, or `fallback` when it has none
    pub fn for_tenant(tenant: &Tenant, fallback: &str) -> Self {
        match &tenant.connection {
            Some(connection) => Self {
                connection: connection.clone(),
                prefix: tenant.table_prefix(),
                dedicated: true,
            },
            None => Self::fallback(fallback),
        }
    }

    /// `connection` with no prefix
    pub fn fallback(connection: &str) -> Self {
        Self {
            connection: connection.to_string(),
            prefix: None,
            dedicated: false,
        }
    }
}

/// Applies connection targets to a [`ConnectionPool`]
#[derive(Clone)]
pub struct ConnectionSwitch {
    pool: Arc<dyn ConnectionPool>,
}

impl ConnectionSwitch {
    /// Switch driving `pool`
    pub fn new(pool: Arc<dyn ConnectionPool>) -> Self {
        Self { pool }
    }

    /// Pool the switch drives
    pub fn pool(&self) -> &Arc<dyn ConnectionPool> {
        &self.pool
    }

    /// Make `tenant` the active tenant of `ctx`.
    ///
    /// Sets the prefix, purges cached handles when the tenant has its own
    /// connection, then moves the default. Every call purges again, but the
    /// resulting connection and prefix are the same.
    pub async fn activate(&self, ctx: &mut ResolutionContext, tenant: &Tenant) -> Result<ConnectionTarget> {
        let target = ConnectionTarget::for_tenant(tenant, ctx.fallback_connection());
        self.apply(ctx, &target).await?;

        ctx.commit(target.clone(), Some(tenant));
        debug!(
            tenant_id = tenant.id,
            connection = %target.connection,
            prefix = target.prefix.as_deref().unwrap_or(""),
            "Tenant connection activated"
        );
        Ok(target)
    }

    /// Re-target the fallback connection with no prefix.
    ///
    /// The active tenant stays recorded in `ctx`. A cached handle on the
    /// fallback connection is purged when the prefix changes.
    pub async fn reset(&self, ctx: &mut ResolutionContext) -> Result<ConnectionTarget> {
        let target = ConnectionTarget::fallback(ctx.fallback_connection());
        self.apply(ctx, &target).await?;
        ctx.commit(target.clone(), None);
        Ok(target)
    }

    async fn apply(&self, ctx: &ResolutionContext, target: &ConnectionTarget) -> Result<()> {
        let prefix = target.prefix.as_deref().unwrap_or("");

        let result = async {
            self.pool
                .set_connection_parameter(&target.connection, PREFIX_PARAMETER, prefix)
                .await?;

            if target.dedicated {
                self.pool.purge_connection(ctx.connection()).await?;
                if target.connection != ctx.connection() {
                    self.pool.purge_connection(&target.connection).await?;
                }
            } else if ctx.prefix() != target.prefix.as_deref() {
                // A cached handle may still carry the previous prefix
                self.pool.purge_connection(&target.connection).await?;
            }

            self.pool.set_default_connection(&target.connection).await
        }
        .await;

        if let Err(e) = result {
            warn!(connection = %target.connection, error = %e, "Connection switch failed");
            self.restore(ctx).await;
            return Err(e);
        }

        Ok(())
    }

    /// Best-effort re-application of the settings recorded in `ctx`
    async fn restore(&self, ctx: &ResolutionContext) {
        let prefix = ctx.prefix().unwrap_or("");
        let restored = async {
            self.pool
                .set_connection_parameter(ctx.connection(), PREFIX_PARAMETER, prefix)
                .await?;
            self.pool.set_default_connection(ctx.connection()).await
        }
        .await;

        if let Err(e) = restored {
            warn!(connection = %ctx.connection(), error = %e, "Failed to restore previous connection");
        }
    }
}
