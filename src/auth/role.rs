//! Roles, role sets and the `Auther` capability they share

use crate::auth::grants::GrantSet;
use crate::messages::{Request, SyncMethod};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Predicate over RPC requests
pub type RpcCheck = dyn Fn(&Request) -> bool + Send + Sync;

/// Predicate over sync operations: `(token, method, topic)`
pub type SyncCheck = dyn Fn(&str, SyncMethod, &str) -> bool + Send + Sync;

/// Anything that can authorize RPC requests and sync operations.
///
/// Implementations are evaluated concurrently from many threads and must not
/// block.
pub trait Auther: Send + Sync {
    fn auth_rpc(&self, req: &Request) -> bool;
    fn auth_sync(&self, token: &str, method: SyncMethod, topic: &str) -> bool;
}

impl<A: Auther + ?Sized> Auther for Arc<A> {
    fn auth_rpc(&self, req: &Request) -> bool {
        (**self).auth_rpc(req)
    }

    fn auth_sync(&self, token: &str, method: SyncMethod, topic: &str) -> bool {
        (**self).auth_sync(token, method, topic)
    }
}

/// An absent authorizer denies everything
impl<A: Auther> Auther for Option<A> {
    fn auth_rpc(&self, req: &Request) -> bool {
        self.as_ref().is_some_and(|a| a.auth_rpc(req))
    }

    fn auth_sync(&self, token: &str, method: SyncMethod, topic: &str) -> bool {
        self.as_ref()
            .is_some_and(|a| a.auth_sync(token, method, topic))
    }
}

/// Leaf authorizer with one optional predicate per call kind.
///
/// An empty slot denies. A role's identity is its allocation: two roles built
/// from the same predicates are still different members of a [`RoleSet`].
#[derive(Clone, Default)]
pub struct Role {
    rpc: Option<Arc<RpcCheck>>,
    sync: Option<Arc<SyncCheck>>,
}

impl Role {
    /// A role with both slots empty
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rpc<F>(mut self, check: F) -> Self
    where
        F: Fn(&Request) -> bool + Send + Sync + 'static,
    {
        self.rpc = Some(Arc::new(check));
        self
    }

    pub fn with_sync<F>(mut self, check: F) -> Self
    where
        F: Fn(&str, SyncMethod, &str) -> bool + Send + Sync + 'static,
    {
        self.sync = Some(Arc::new(check));
        self
    }

    pub fn allow_all() -> Self {
        Self::new().with_rpc(|_| true).with_sync(|_, _, _| true)
    }

    pub fn deny_all() -> Self {
        Self::new()
    }

    /// RPC allow-list by method name.
    ///
    /// A pattern ending in `*` matches by prefix, so `user.*` covers
    /// `user.get` and `*` covers every method.
    pub fn rpc_methods<I, S>(methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let methods: Vec<String> = methods.into_iter().map(Into::into).collect();
        Self::new().with_rpc(move |req| {
            methods.iter().any(|m| match m.strip_suffix('*') {
                Some(prefix) => req.method.starts_with(prefix),
                None => req.method == *m,
            })
        })
    }

    /// Sync allow-list by topic grants
    pub fn sync_grants(grants: GrantSet) -> Self {
        Self::new().with_grants(grants)
    }

    /// Fill the sync slot from `grants`; an empty set leaves the slot as is
    pub fn with_grants(self, grants: GrantSet) -> Self {
        if grants.is_empty() {
            return self;
        }
        self.with_sync(move |_, method, topic| grants.allows(method, topic))
    }

    pub fn has_rpc(&self) -> bool {
        self.rpc.is_some()
    }

    pub fn has_sync(&self) -> bool {
        self.sync.is_some()
    }

    pub fn into_auther(self) -> Arc<dyn Auther> {
        Arc::new(self)
    }
}

impl Auther for Role {
    fn auth_rpc(&self, req: &Request) -> bool {
        match &self.rpc {
            Some(check) => check(req),
            None => false,
        }
    }

    fn auth_sync(&self, token: &str, method: SyncMethod, topic: &str) -> bool {
        match &self.sync {
            Some(check) => check(token, method, topic),
            None => false,
        }
    }
}

impl fmt::Debug for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Role")
            .field("rpc", &self.has_rpc())
            .field("sync", &self.has_sync())
            .finish()
    }
}

/// Identity of an authorizer: the address of its allocation
fn auther_id(auther: &Arc<dyn Auther>) -> usize {
    Arc::as_ptr(auther) as *const () as usize
}

/// An unordered set of authorizers that authorizes if any member does.
///
/// Membership is by identity. Sets are built up front and then shared
/// behind an `Arc`; a published set is never modified.
#[derive(Clone, Default)]
pub struct RoleSet {
    members: Vec<Arc<dyn Auther>>,
    ids: HashSet<usize>,
}

impl RoleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a member; returns false if this exact authorizer is already present
    pub fn insert(&mut self, auther: Arc<dyn Auther>) -> bool {
        if !self.ids.insert(auther_id(&auther)) {
            return false;
        }
        self.members.push(auther);
        true
    }

    pub fn contains(&self, auther: &Arc<dyn Auther>) -> bool {
        self.ids.contains(&auther_id(auther))
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl Auther for RoleSet {
    fn auth_rpc(&self, req: &Request) -> bool {
        self.members.iter().any(|m| m.auth_rpc(req))
    }

    fn auth_sync(&self, token: &str, method: SyncMethod, topic: &str) -> bool {
        self.members
            .iter()
            .any(|m| m.auth_sync(token, method, topic))
    }
}

impl FromIterator<Arc<dyn Auther>> for RoleSet {
    fn from_iter<T: IntoIterator<Item = Arc<dyn Auther>>>(iter: T) -> Self {
        let iter = iter.into_iter();
        let mut set = RoleSet {
            members: Vec::with_capacity(iter.size_hint().0),
            ids: HashSet::with_capacity(iter.size_hint().0),
        };
        for auther in iter {
            set.insert(auther);
        }
        set
    }
}

impl fmt::Debug for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoleSet")
            .field("members", &self.members.len())
            .finish()
    }
}
