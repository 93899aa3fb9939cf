//! Call shapes handed to the table by the RPC and sync layers

use serde::{Deserialize, Serialize};
use std::fmt;

/// An inbound RPC request
///
/// Authorization reads `token`; the method allow-list roles also read `method`.
/// `params` is carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub token: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

impl Request {
    pub fn new(token: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            method: method.into(),
            params: serde_json::Value::Null,
        }
    }
}

/// Kind of sync operation being authorized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMethod {
    /// Start receiving events on a topic
    Subscribe,
    /// Stop receiving events on a topic
    Unsubscribe,
    /// Push an event to a topic
    Publish,
}

impl SyncMethod {
    pub const ALL: [SyncMethod; 3] = [
        SyncMethod::Subscribe,
        SyncMethod::Unsubscribe,
        SyncMethod::Publish,
    ];

    /// Parse from string, including "all" which expands to every method
    pub fn parse_all(s: &str) -> Option<Vec<SyncMethod>> {
        match s.to_lowercase().as_str() {
            "subscribe" | "sub" => Some(vec![SyncMethod::Subscribe]),
            "unsubscribe" | "unsub" => Some(vec![SyncMethod::Unsubscribe]),
            "publish" | "pub" => Some(vec![SyncMethod::Publish]),
            "all" => Some(Self::ALL.to_vec()),
            _ => None,
        }
    }
}

impl fmt::Display for SyncMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncMethod::Subscribe => write!(f, "subscribe"),
            SyncMethod::Unsubscribe => write!(f, "unsubscribe"),
            SyncMethod::Publish => write!(f, "publish"),
        }
    }
}
