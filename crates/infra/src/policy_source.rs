//! Where policy rules come from: a static JSON file, a storage-backed store,
//! or the built-in default.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use warden_auth::{PolicyError, PolicyRule, Role, StoreError};

/// On-disk policy file: `{"rules": [{"role": .., "path": .., "method": ..}]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDocument {
    pub rules: Vec<PolicyRule>,
}

#[derive(Debug, Error)]
pub enum PolicySourceError {
    #[error("failed to read policy file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse policy file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Invalid(#[from] PolicyError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Read and validate a policy file. Every rule must compile.
pub async fn load_policy_file(path: &Path) -> Result<Vec<PolicyRule>, PolicySourceError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| PolicySourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    let doc: PolicyDocument =
        serde_json::from_slice(&bytes).map_err(|source| PolicySourceError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    for rule in &doc.rules {
        rule.compile()?;
    }

    tracing::info!(path = %path.display(), rules = doc.rules.len(), "loaded policy file");
    Ok(doc.rules)
}

/// Persistent rule storage, for deployments that edit policy at runtime.
#[async_trait]
pub trait PolicyStore: Send + Sync {
    async fn load_rules(&self) -> Result<Vec<PolicyRule>, StoreError>;

    /// Replace everything stored for `role`.
    async fn save_role_rules(&self, role: &Role, rules: &[PolicyRule]) -> Result<(), StoreError>;
}

/// In-memory policy store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryPolicyStore {
    inner: RwLock<BTreeMap<Role, Vec<PolicyRule>>>,
}

impl InMemoryPolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(rules: impl IntoIterator<Item = PolicyRule>) -> Self {
        let mut map: BTreeMap<Role, Vec<PolicyRule>> = BTreeMap::new();
        for rule in rules {
            map.entry(rule.role.clone()).or_default().push(rule);
        }
        Self {
            inner: RwLock::new(map),
        }
    }
}

#[async_trait]
impl PolicyStore for InMemoryPolicyStore {
    async fn load_rules(&self) -> Result<Vec<PolicyRule>, StoreError> {
        let map = self
            .inner
            .read()
            .map_err(|_| StoreError::Backend("policy table lock poisoned".into()))?;
        Ok(map.values().flatten().cloned().collect())
    }

    async fn save_role_rules(&self, role: &Role, rules: &[PolicyRule]) -> Result<(), StoreError> {
        let stored: Vec<PolicyRule> = rules
            .iter()
            .map(|r| PolicyRule::new(role.clone(), r.path.clone(), r.method.clone()))
            .collect();
        let mut map = self
            .inner
            .write()
            .map_err(|_| StoreError::Backend("policy table lock poisoned".into()))?;
        map.insert(role.clone(), stored);
        Ok(())
    }
}

/// Built-in policy used when no policy file is configured.
///
/// - `admin`: everything
/// - `editor`: user administration short of roles and deletion
/// - `viewer`: read access to users
///
/// Every role may inspect itself, change its own password and switch its own
/// active role.
pub fn default_policy() -> Vec<PolicyRule> {
    let mut rules = vec![PolicyRule::new(Role::new("admin"), "/*", "*")];

    for role in ["editor", "viewer"] {
        let role = Role::new(role);
        rules.push(PolicyRule::new(role.clone(), "/whoami", "GET"));
        rules.push(PolicyRule::new(role.clone(), "/user/info", "GET"));
        rules.push(PolicyRule::new(role.clone(), "/user/password", "POST"));
        rules.push(PolicyRule::new(role.clone(), "/user/authority", "POST"));
        rules.push(PolicyRule::new(role, "/user/list", "POST"));
    }

    let editor = Role::new("editor");
    rules.push(PolicyRule::new(editor.clone(), "/user/register", "POST"));
    rules.push(PolicyRule::new(editor, "/user/:id", "PUT"));

    rules
}
