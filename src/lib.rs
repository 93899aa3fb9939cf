//! rbac-table - role-based authorization for RPC requests and pub/sub sync operations
//!
//! Callers present a bearer token packing a user name and secret. The [`Table`]
//! decodes it, finds the user, and authorizes the call against the role set
//! bound to that secret, additionally capped by an optional per-secret mask.
//! Every lookup miss denies.

pub mod auth;
pub mod config;
pub mod messages;
pub mod topics;

pub use auth::{Auther, Credentials, Grant, GrantSet, Role, RoleSet, Table, TableError, User};
pub use config::{Binding, ConfigError, Provisioning, RoleDef};
pub use messages::{Request, SyncMethod};
pub use topics::TopicPattern;
