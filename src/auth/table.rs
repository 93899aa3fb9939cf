//! The authorization table
//!
//! One reader-writer lock guards both registries. Authorization checks,
//! `check` and `view` share it; `register`, `load` and `update` take it
//! exclusively. Role sets are installed as new `Arc`s and never mutated after
//! publication.

use crate::auth::role::{Auther, RoleSet};
use crate::auth::token::{self, Credentials};
use crate::auth::user::{Denial, User};
use crate::messages::{Request, SyncMethod};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("role not found: {0}")]
    RoleNotFound(String),
}

/// The registries guarded by the table lock
#[derive(Default)]
pub struct TableState {
    roles: HashMap<String, Arc<dyn Auther>>,
    users: HashMap<String, User>,
}

impl TableState {
    pub fn user(&self, name: &str) -> Option<&User> {
        self.users.get(name)
    }

    /// Bind `name` to `auther`, returning the previous binding
    pub fn register(&mut self, name: impl Into<String>, auther: Arc<dyn Auther>) -> Option<Arc<dyn Auther>> {
        self.roles.insert(name.into(), auther)
    }

    /// Fail with the first name that is not registered
    pub fn require_roles<I, S>(&self, names: I) -> Result<(), TableError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            let name = name.as_ref();
            if !self.roles.contains_key(name) {
                return Err(TableError::RoleNotFound(name.to_string()));
            }
        }
        Ok(())
    }

    /// Bind `secret` of user `name` to the named roles and optional mask.
    ///
    /// Names are resolved to the authorizers registered right now; later
    /// re-registrations do not affect this binding. Unknown role names are
    /// skipped and an unknown mask name leaves the secret unmasked.
    pub fn load<I, S>(&mut self, name: &str, secret: &str, mask: Option<&str>, roles: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mask_auther = mask.and_then(|m| {
            let found = self.roles.get(m).cloned();
            if found.is_none() {
                warn!(user = name, mask = m, "Mask role not registered, secret left unmasked");
            }
            found
        });

        let mut authers = Vec::new();
        for role in roles {
            let role = role.as_ref();
            match self.roles.get(role) {
                Some(a) => authers.push(a.clone()),
                None => warn!(user = name, role = role, "Role not registered, skipping"),
            }
        }
        let granted = authers.len();

        if name.is_empty() {
            warn!("Loading a user with an empty name; it can never authorize");
        }
        let user = self.users.entry(name.to_string()).or_default();
        user.set_mask(secret, mask_auther);
        user.add_secret(secret, authers);

        info!(user = name, roles = granted, masked = user.mask(secret).is_some(), "Loaded user secret");
    }

    fn authorize<F>(&self, creds: &Credentials, check: F) -> Result<(), Denial>
    where
        F: Fn(&dyn Auther) -> bool,
    {
        // Undecodable tokens yield an empty name, which never names a user
        if creds.name.is_empty() {
            return Err(Denial::UnknownUser);
        }
        let user = self.users.get(&creds.name).ok_or(Denial::UnknownUser)?;
        user.authorize(&creds.secret, check)
    }
}

fn denial_reason(creds: &Credentials, denial: Denial) -> &'static str {
    if creds.is_empty() {
        "malformed token"
    } else {
        denial.reason()
    }
}

/// Role-based authorization table for RPC requests and sync operations.
///
/// Every check fails closed: unknown users, unknown secrets, malformed
/// tokens and empty role sets all deny.
#[derive(Default)]
pub struct Table {
    state: RwLock<TableState>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Authorize an RPC request by its token
    pub fn auth_rpc(&self, req: &Request) -> bool {
        let creds = token::decode(&req.token);
        let verdict = self.state.read().authorize(&creds, |a| a.auth_rpc(req));

        match verdict {
            Ok(()) => true,
            Err(denial) => {
                debug!(user = ?creds.name, method = ?req.method, reason = denial_reason(&creds, denial), "RPC denied");
                false
            }
        }
    }

    /// Authorize a sync operation on `topic`
    pub fn auth_sync(&self, token: &str, method: SyncMethod, topic: &str) -> bool {
        let creds = token::decode(token);
        let verdict = self
            .state
            .read()
            .authorize(&creds, |a| a.auth_sync(token, method, topic));

        match verdict {
            Ok(()) => true,
            Err(denial) => {
                debug!(user = ?creds.name, method = %method, topic = ?topic, reason = denial_reason(&creds, denial), "Sync denied");
                false
            }
        }
    }

    pub fn register(&self, name: impl Into<String>, auther: Arc<dyn Auther>) {
        let name = name.into();
        let replaced = self.state.write().register(name.clone(), auther).is_some();
        info!(role = %name, replaced, "Registered role");
    }

    /// True if every name is a registered role
    pub fn check<I, S>(&self, names: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.require_roles(names).is_ok()
    }

    /// Like [`Table::check`], but names the first missing role
    pub fn require_roles<I, S>(&self, names: I) -> Result<(), TableError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.view(|state| state.require_roles(names))
    }

    /// Replace the role set (and mask) of one user secret.
    ///
    /// See [`TableState::load`].
    pub fn load<I, S>(&self, name: &str, secret: &str, mask: Option<&str>, roles: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.state.write().load(name, secret, mask, roles);
    }

    /// Run `f` with exclusive access to the table
    pub fn update<T, E>(&self, f: impl FnOnce(&mut TableState) -> Result<T, E>) -> Result<T, E> {
        let mut state = self.state.write();
        f(&mut *state)
    }

    /// Run `f` with shared access to the table
    pub fn view<T, E>(&self, f: impl FnOnce(&TableState) -> Result<T, E>) -> Result<T, E> {
        let state = self.state.read();
        f(&*state)
    }

    pub fn role_count(&self) -> usize {
        self.state.read().roles.len()
    }

    pub fn user_count(&self) -> usize {
        self.state.read().users.len()
    }

    /// Role set currently bound to a user secret
    pub fn role_set(&self, name: &str, secret: &str) -> Option<Arc<RoleSet>> {
        self.state
            .read()
            .user(name)
            .and_then(|u| u.role_set(secret))
            .cloned()
    }
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("Table")
            .field("roles", &state.roles.len())
            .field("users", &state.users.len())
            .finish()
    }
}
