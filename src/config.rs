//! Declarative provisioning of roles and user bindings
//!
//! ```json
//! {
//!   "roles": {
//!     "reader": { "rpc": ["user.get", "user.list"], "sync": ["subscribe:chat.*"] },
//!     "chat":   { "sync": ["all:chat.*"] }
//!   },
//!   "bindings": [
//!     { "user": "alice", "secret": "s3cr3t", "roles": ["reader", "chat"] },
//!     { "user": "alice", "secret": "kiosk", "mask": "reader", "roles": ["chat"] }
//!   ]
//! }
//! ```

use crate::auth::{GrantError, GrantSet, Role, Table, TableError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Environment variable naming a provisioning file
pub const PROVISIONING_ENV: &str = "RBAC_PROVISIONING";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read provisioning file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid provisioning document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid grant in role '{role}': {source}")]
    Grant {
        role: String,
        #[source]
        source: GrantError,
    },

    #[error(transparent)]
    Table(#[from] TableError),
}

/// A role built from method and topic allow-lists
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleDef {
    /// RPC method names; a trailing `*` matches by prefix
    #[serde(default)]
    pub rpc: Vec<String>,
    /// Sync grants as `<method>:<pattern>`
    #[serde(default)]
    pub sync: Vec<String>,
}

impl RoleDef {
    /// Build the role. An empty list leaves that slot unset, so it denies.
    pub fn build(&self) -> Result<Role, GrantError> {
        let role = if self.rpc.is_empty() {
            Role::new()
        } else {
            Role::rpc_methods(self.rpc.iter().cloned())
        };

        Ok(role.with_grants(GrantSet::parse(&self.sync)?))
    }
}

/// One user secret and the roles it carries
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Binding {
    pub user: String,
    pub secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Binding {
    fn role_names(&self) -> impl Iterator<Item = &str> {
        self.roles.iter().map(String::as_str).chain(self.mask.as_deref())
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("user", &self.user)
            .field("secret", &"[REDACTED]")
            .field("mask", &self.mask)
            .field("roles", &self.roles)
            .finish()
    }
}

/// Roles and bindings to install into a [`Table`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Provisioning {
    #[serde(default)]
    pub roles: BTreeMap<String, RoleDef>,
    #[serde(default)]
    pub bindings: Vec<Binding>,
}

impl Provisioning {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Load the file named by `RBAC_PROVISIONING`, if set
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        match std::env::var_os(PROVISIONING_ENV) {
            Some(path) => Self::from_file(path).map(Some),
            None => Ok(None),
        }
    }

    /// Register the declared roles and load every binding in one update.
    ///
    /// All role and mask names are validated first, against roles already in
    /// the table plus the ones declared here; on failure the table is left
    /// untouched.
    pub fn apply(&self, table: &Table) -> Result<(), ConfigError> {
        let mut built = Vec::with_capacity(self.roles.len());
        for (name, def) in &self.roles {
            let role = def.build().map_err(|source| ConfigError::Grant {
                role: name.clone(),
                source,
            })?;
            built.push((name.clone(), role.into_auther()));
        }

        table.update(|state| {
            let declared: HashSet<&str> = self.roles.keys().map(String::as_str).collect();
            for binding in &self.bindings {
                let missing = binding.role_names().filter(|name| !declared.contains(name));
                state.require_roles(missing)?;
            }

            for (name, role) in built {
                state.register(name, role);
            }
            for binding in &self.bindings {
                state.load(
                    &binding.user,
                    &binding.secret,
                    binding.mask.as_deref(),
                    &binding.roles,
                );
            }
            Ok::<_, ConfigError>(())
        })?;

        info!(
            roles = self.roles.len(),
            bindings = self.bindings.len(),
            "Applied provisioning"
        );
        Ok(())
    }
}
