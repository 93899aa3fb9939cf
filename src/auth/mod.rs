//! Authorization
//!
//! - `token`: packs a (name, secret) pair into a bearer token and back
//! - `role`: the `Auther` capability, leaf `Role`s and OR-composed `RoleSet`s
//! - `user`: per-secret role sets and masks
//! - `table`: the lock-guarded registry that answers `auth_rpc` / `auth_sync`
//! - `grants`: topic grants used to build sync roles

mod grants;
mod role;
mod table;
pub mod token;
mod user;

pub use grants::{Grant, GrantError, GrantSet};
pub use role::{Auther, Role, RoleSet, RpcCheck, SyncCheck};
pub use table::{Table, TableError, TableState};
pub use token::{Credentials, TOKEN_SEPARATOR};
pub use user::User;
