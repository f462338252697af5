//! Tenant Directory
//!
//! Read-only lookup of tenant records. Storage is the application's concern;
//! implement [`TenantDirectory`] over your database, or use
//! [`InMemoryTenantDirectory`] for fixtures and small deployments.

use crate::error::{Result, TenantError};
use crate::tenant::Tenant;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::path::Path;

/// Tenant lookup collaborator.
///
/// Implementations must never return soft-deleted records.
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    /// Tenant whose subdomain equals `subdomain`
    async fn find_by_subdomain(&self, subdomain: &str) -> Result<Option<Tenant>>;

    /// Tenant whose alias domain equals `alias_domain`
    async fn find_by_alias_domain(&self, alias_domain: &str) -> Result<Option<Tenant>>;

    /// Tenant with the given id
    async fn find_by_id(&self, id: u64) -> Result<Option<Tenant>>;

    /// Every tenant, in a stable order
    async fn list_all(&self) -> Result<Vec<Tenant>>;
}

/// In-memory directory preserving insertion order
#[derive(Debug, Default)]
pub struct InMemoryTenantDirectory {
    tenants: RwLock<Vec<Tenant>>,
}

impl InMemoryTenantDirectory {
    /// Empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a directory from records, rejecting conflicting ones
    pub fn with_tenants(tenants: impl IntoIterator<Item = Tenant>) -> Result<Self> {
        let directory = Self::new();
        for tenant in tenants {
            directory.insert(tenant)?;
        }
        Ok(directory)
    }

    /// Load a JSON array of tenant records
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            TenantError::DirectoryLookup(format!("{}: {}", path.display(), e))
        })?;
        Self::from_json_str(&content)
    }

    /// Parse a JSON array of tenant records
    pub fn from_json_str(content: &str) -> Result<Self> {
        let tenants: Vec<Tenant> = serde_json::from_str(content)
            .map_err(|e| TenantError::Invalid(format!("tenant records: {}", e)))?;
        Self::with_tenants(tenants)
    }

    /// Add a record.
    ///
    /// Ids are unique across all records; subdomains and alias domains are
    /// unique among records that are not soft-deleted.
    pub fn insert(&self, tenant: Tenant) -> Result<()> {
        let mut tenants = self.tenants.write();

        if tenants.iter().any(|t| t.id == tenant.id) {
            return Err(TenantError::Invalid(format!(
                "duplicate tenant id {}",
                tenant.id
            )));
        }

        if !tenant.is_deleted() {
            for existing in tenants.iter().filter(|t| !t.is_deleted()) {
                if tenant.subdomain.is_some() && existing.subdomain == tenant.subdomain {
                    return Err(TenantError::Invalid(format!(
                        "subdomain '{}' is already used by tenant {}",
                        tenant.subdomain.as_deref().unwrap_or_default(),
                        existing.id
                    )));
                }
                if tenant.alias_domain.is_some() && existing.alias_domain == tenant.alias_domain {
                    return Err(TenantError::Invalid(format!(
                        "alias domain '{}' is already used by tenant {}",
                        tenant.alias_domain.as_deref().unwrap_or_default(),
                        existing.id
                    )));
                }
            }
        }

        tenants.push(tenant);
        Ok(())
    }

    /// Number of records that are not soft-deleted
    pub fn len(&self) -> usize {
        self.tenants.read().iter().filter(|t| !t.is_deleted()).count()
    }

    /// Whether every record is soft-deleted, or there are none
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn find(&self, predicate: impl Fn(&Tenant) -> bool) -> Option<Tenant> {
        self.tenants
            .read()
            .iter()
            .find(|t| !t.is_deleted() && predicate(t))
            .cloned()
    }
}

#[async_trait]
impl TenantDirectory for InMemoryTenantDirectory {
    async fn find_by_subdomain(&self, subdomain: &str) -> Result<Option<Tenant>> {
        Ok(self.find(|t| t.subdomain.as_deref() == Some(subdomain)))
    }

    async fn find_by_alias_domain(&self, alias_domain: &str) -> Result<Option<Tenant>> {
        Ok(self.find(|t| t.alias_domain.as_deref() == Some(alias_domain)))
    }

    async fn find_by_id(&self, id: u64) -> Result<Option<Tenant>> {
        Ok(self.find(|t| t.id == id))
    }

    async fn list_all(&self) -> Result<Vec<Tenant>> {
        Ok(self
            .tenants
            .read()
            .iter()
            .filter(|t| !t.is_deleted())
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn directory() -> InMemoryTenantDirectory {
        InMemoryTenantDirectory::with_tenants([
            Tenant::new(7, "Acme")
                .with_subdomain("acme")
                .with_connection("mysql_tenant"),
            Tenant::new(8, "Globex")
                .with_alias_domain("globex.test")
                .with_connection("mysql_tenant"),
            Tenant::new(3, "Gone").with_subdomain("gone").deleted(),
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn test_lookups() {
        let directory = directory();

        let acme = directory.find_by_subdomain("acme").await.unwrap().unwrap();
        assert_eq!(acme.id, 7);

        let globex = directory
            .find_by_alias_domain("globex.test")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(globex.id, 8);

        assert!(directory.find_by_id(8).await.unwrap().is_some());
        assert!(directory.find_by_subdomain("initech").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_soft_deleted_are_invisible() {
        let directory = directory();

        assert!(directory.find_by_subdomain("gone").await.unwrap().is_none());
        assert!(directory.find_by_id(3).await.unwrap().is_none());
        assert_eq!(directory.len(), 2);
    }

    #[tokio::test]
    async fn test_list_all_keeps_insertion_order() {
        let ids: Vec<u64> = directory()
            .list_all()
            .await
            .unwrap()
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![7, 8]);
    }

    #[test]
    fn test_uniqueness() {
        let directory = directory();

        let clash = Tenant::new(10, "Acme Two").with_subdomain("ACME");
        assert!(matches!(
            directory.insert(clash),
            Err(TenantError::Invalid(_))
        ));

        let alias_clash = Tenant::new(11, "Globex Two").with_alias_domain("globex.test");
        assert!(directory.insert(alias_clash).is_err());

        let duplicate_id = Tenant::new(7, "Other");
        assert!(directory.insert(duplicate_id).is_err());

        // A soft-deleted tenant releases its subdomain.
        let reuse = Tenant::new(12, "Gone Again").with_subdomain("gone");
        assert!(directory.insert(reuse).is_ok());
    }

    #[tokio::test]
    async fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"id": 7, "name": "Acme", "subdomain": "acme", "connection": "mysql_tenant"}},
                {{"id": 9, "name": "Globex", "connection": "mysql_tenant"}}
            ]"#
        )
        .unwrap();

        let directory = InMemoryTenantDirectory::from_json_file(file.path()).unwrap();
        assert_eq!(directory.len(), 2);
        let globex = directory.find_by_id(9).await.unwrap().unwrap();
        assert_eq!(globex.table_prefix().as_deref(), Some("tenant9_"));
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(InMemoryTenantDirectory::from_json_str("{").is_err());
        assert!(InMemoryTenantDirectory::from_json_file("/nonexistent/tenants.json").is_err());
    }
}
