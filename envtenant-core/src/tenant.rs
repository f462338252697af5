//! Tenant records
//!
//! The unit of isolation: who a request belongs to, and which connection and
//! table prefix its data lives behind.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

static DOMAIN_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9.\-]").unwrap());

/// Clean a subdomain or alias domain: lower-case it and drop every character
/// other than ASCII letters, digits, `.` and `-`. Empty results mean "absent".
///
/// ```
/// use envtenant_core::normalize_domain;
///
/// assert_eq!(normalize_domain(" Acme_Corp! "), Some("acmecorp".to_string()));
/// assert_eq!(normalize_domain("***"), None);
/// ```
pub fn normalize_domain(value: &str) -> Option<String> {
    let cleaned = DOMAIN_CHARS.replace_all(value, "").to_lowercase();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

fn deserialize_domain<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(normalize_domain))
}

fn deserialize_connection<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty()))
}

fn default_true() -> bool {
    true
}

fn empty_meta() -> Value {
    Value::Object(serde_json::Map::new())
}

/// Tenant record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    /// Positive, unique id
    pub id: u64,

    /// Display name
    pub name: String,

    /// Contact address
    #[serde(default)]
    pub email: Option<String>,

    /// Lower-case label matched against the first host label
    #[serde(default, deserialize_with = "deserialize_domain")]
    pub subdomain: Option<String>,

    /// Full host name matched as is
    #[serde(default, deserialize_with = "deserialize_domain")]
    pub alias_domain: Option<String>,

    /// Name of the dedicated connection; absent means the shared default
    #[serde(default, deserialize_with = "deserialize_connection")]
    pub connection: Option<String>,

    /// Inactive tenants are rejected when `require_active` is set
    #[serde(default = "default_true")]
    pub is_active: bool,

    /// Opaque application data
    #[serde(default = "empty_meta")]
    pub meta: Value,

    /// Creation time
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    /// Last modification time
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,

    /// Soft-delete marker
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Tenant {
    /// Active tenant on the shared connection, with no domains.
    ///
    /// # Examples
    ///
    /// ```
    /// use envtenant_core::Tenant;
    ///
    /// let tenant = Tenant::new(7, "Acme")
    ///     .with_subdomain("acme")
    ///     .with_connection("mysql_tenant");
    /// assert_eq!(tenant.table_prefix().as_deref(), Some("acme_"));
    /// ```
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            email: None,
            subdomain: None,
            alias_domain: None,
            connection: None,
            is_active: true,
            meta: empty_meta(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Set the contact address
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into().trim().to_string());
        self
    }

    /// Set the subdomain, normalized with [`normalize_domain`]
    pub fn with_subdomain(mut self, subdomain: &str) -> Self {
        self.subdomain = normalize_domain(subdomain);
        self
    }

    /// Set the alias domain, normalized with [`normalize_domain`]
    pub fn with_alias_domain(mut self, alias_domain: &str) -> Self {
        self.alias_domain = normalize_domain(alias_domain);
        self
    }

    /// Set the dedicated connection; blank clears it
    pub fn with_connection(mut self, connection: &str) -> Self {
        let connection = connection.trim();
        self.connection = (!connection.is_empty()).then(|| connection.to_string());
        self
    }

    /// Set the active flag
    pub fn with_active(mut self, active: bool) -> Self {
        self.is_active = active;
        self
    }

    /// Add one entry to the metadata object
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        if !self.meta.is_object() {
            self.meta = empty_meta();
        }
        if let Value::Object(map) = &mut self.meta {
            map.insert(key.into(), value.into());
        }
        self
    }

    /// Mark the record as soft-deleted
    pub fn deleted(mut self) -> Self {
        self.deleted_at = Some(Utc::now());
        self
    }

    /// Whether the tenant names its own connection
    pub fn has_dedicated_connection(&self) -> bool {
        self.connection.is_some()
    }

    /// A tenant is provisioned once it names a non-blank connection other
    /// than `sentinel`
    pub fn is_provisioned(&self, sentinel: &str) -> bool {
        matches!(&self.connection, Some(c) if !c.trim().is_empty() && c != sentinel)
    }

    /// Whether the record is soft-deleted
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Table prefix used while this tenant is active.
    ///
    /// `<subdomain>_` or `tenant<id>_` for a dedicated connection, none for
    /// the shared default connection.
    pub fn table_prefix(&self) -> Option<String> {
        if !self.has_dedicated_connection() {
            return None;
        }

        Some(match &self.subdomain {
            Some(subdomain) => format!("{}_", subdomain),
            None => format!("tenant{}_", self.id),
        })
    }

    /// Snapshot of every attribute, as published into the current tenant slot
    pub fn attributes(&self) -> Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

impl std::fmt::Display for Tenant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (id {})", self.name, self.id)
    }
}
