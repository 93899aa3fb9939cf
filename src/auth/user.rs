//! Per-user secret bindings

use crate::auth::role::{Auther, RoleSet};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Why a user-level check denied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Denial {
    UnknownUser,
    MaskDenied,
    NoRoleSet,
    NotGranted,
}

impl Denial {
    pub(crate) fn reason(self) -> &'static str {
        match self {
            Denial::UnknownUser => "unknown user",
            Denial::MaskDenied => "mask denied",
            Denial::NoRoleSet => "no role set for secret",
            Denial::NotGranted => "no role granted",
        }
    }
}

/// A named principal holding one or more secrets.
///
/// Each secret carries its own role set and, optionally, a mask that must
/// also authorize any call made with that secret.
#[derive(Clone, Default)]
pub struct User {
    secrets: HashMap<String, Arc<RoleSet>>,
    masks: HashMap<String, Arc<dyn Auther>>,
}

impl User {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `secret` to a fresh role set made of `authers`, replacing any
    /// previous binding for it
    pub fn add_secret<I>(&mut self, secret: impl Into<String>, authers: I) -> &mut Self
    where
        I: IntoIterator<Item = Arc<dyn Auther>>,
    {
        let roles: RoleSet = authers.into_iter().collect();
        self.secrets.insert(secret.into(), Arc::new(roles));
        self
    }

    /// Set or clear the mask for `secret`
    pub fn set_mask(&mut self, secret: impl Into<String>, mask: Option<Arc<dyn Auther>>) -> &mut Self {
        let secret = secret.into();
        match mask {
            Some(mask) => {
                self.masks.insert(secret, mask);
            }
            None => {
                self.masks.remove(&secret);
            }
        }
        self
    }

    pub fn role_set(&self, secret: &str) -> Option<&Arc<RoleSet>> {
        self.secrets.get(secret)
    }

    pub fn mask(&self, secret: &str) -> Option<&Arc<dyn Auther>> {
        self.masks.get(secret)
    }

    pub fn secret_count(&self) -> usize {
        self.secrets.len()
    }

    /// Run `check` against the mask (if any) and then the role set bound to
    /// `secret`. Both must pass.
    pub(crate) fn authorize<F>(&self, secret: &str, check: F) -> Result<(), Denial>
    where
        F: Fn(&dyn Auther) -> bool,
    {
        if let Some(mask) = self.masks.get(secret) {
            if !check(&**mask) {
                return Err(Denial::MaskDenied);
            }
        }

        let roles: &dyn Auther = &**self.secrets.get(secret).ok_or(Denial::NoRoleSet)?;
        if check(roles) {
            Ok(())
        } else {
            Err(Denial::NotGranted)
        }
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("secrets", &self.secret_count())
            .field("masks", &self.masks.len())
            .finish()
    }
}
