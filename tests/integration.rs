//! Integration tests for the authorization table
//!
//! These exercise the public surface the RPC and sync layers call, including
//! concurrent access from many tasks.

use rbac_table::auth::token;
use rbac_table::{Auther, GrantSet, Provisioning, Request, Role, SyncMethod, Table};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

fn chat_table() -> Table {
    let table = Table::new();
    table.register("admin", Role::allow_all().into_auther());
    table.register(
        "chat-reader",
        Role::sync_grants(GrantSet::parse(["subscribe:chat.*", "unsubscribe:chat.*"]).unwrap())
            .into_auther(),
    );
    table.register(
        "chat-writer",
        Role::sync_grants(GrantSet::parse(["publish:chat.*"]).unwrap()).into_auther(),
    );
    table.register("api", Role::rpc_methods(["user.*", "health"]).into_auther());
    table
}

#[test]
fn test_concrete_admin_scenario() {
    init_tracing();
    let table = Table::new();
    table.register("admin", Role::allow_all().into_auther());
    table.load("alice", "s3cr3t", None, ["admin"]);

    let tok = token::encode("alice", "s3cr3t");
    assert!(table.auth_rpc(&Request::new(tok, "anything")));

    let wrong = token::encode("alice", "guess");
    assert!(!table.auth_rpc(&Request::new(wrong, "anything")));

    let other = Table::new();
    other.load("alice", "s3cr3t", None, ["unknown-role"]);
    assert!(!other.auth_rpc(&Request::new(token::encode("alice", "s3cr3t"), "anything")));
}

#[test]
fn test_check_scenario() {
    let table = chat_table();
    assert!(table.check(["admin"]));
    assert!(table.check(["admin", "api", "chat-reader"]));
    assert!(!table.check(["admin", "ghost"]));
}

#[test]
fn test_rpc_and_sync_slots_combine_across_roles() {
    init_tracing();
    let table = chat_table();
    table.load("svc", "key", None, ["api", "chat-writer"]);
    let tok = token::encode("svc", "key");

    assert!(table.auth_rpc(&Request::new(tok.clone(), "user.get")));
    assert!(!table.auth_rpc(&Request::new(tok.clone(), "admin.drop")));
    assert!(table.auth_sync(&tok, SyncMethod::Publish, "chat.lobby"));
    assert!(!table.auth_sync(&tok, SyncMethod::Subscribe, "chat.lobby"));
    assert!(!table.auth_sync(&tok, SyncMethod::Publish, "news.today"));
}

#[test]
fn test_mask_restricts_sub_token_to_one_topic() {
    let table = chat_table();
    table.register(
        "lobby-only",
        Role::new()
            .with_sync(|_, _, topic| topic == "chat.lobby")
            .into_auther(),
    );

    table.load("bob", "main", None, ["chat-reader", "chat-writer"]);
    table.load("bob", "widget", Some("lobby-only"), ["chat-reader", "chat-writer"]);

    let main = token::encode("bob", "main");
    let widget = token::encode("bob", "widget");

    assert!(table.auth_sync(&main, SyncMethod::Publish, "chat.support"));
    assert!(table.auth_sync(&widget, SyncMethod::Publish, "chat.lobby"));
    assert!(!table.auth_sync(&widget, SyncMethod::Publish, "chat.support"));
    assert!(!table.auth_sync(&widget, SyncMethod::Subscribe, "chat.support"));
}

#[test]
fn test_mask_both_ways() {
    let table = Table::new();
    let allows_x = Role::rpc_methods(["x"]).into_auther();
    table.register("r", allows_x.clone());
    table.register("deny-x", Role::rpc_methods(["y"]).into_auther());
    table.register("allow-x", allows_x);

    table.load("n", "s", Some("deny-x"), ["r"]);
    let req = Request::new(token::encode("n", "s"), "x");
    assert!(!table.auth_rpc(&req));

    table.load("n", "s", Some("allow-x"), ["r"]);
    assert!(table.auth_rpc(&req));
}

#[test]
fn test_load_replaces_not_merges() {
    let table = Table::new();
    table.register("roleA", Role::rpc_methods(["a"]).into_auther());
    table.register("roleB", Role::rpc_methods(["b"]).into_auther());

    table.load("name", "secret", None, ["roleA"]);
    table.load("name", "secret", None, ["roleB"]);

    let tok = token::encode("name", "secret");
    assert!(!table.auth_rpc(&Request::new(tok.clone(), "a")));
    assert!(table.auth_rpc(&Request::new(tok, "b")));
}

#[test]
fn test_malformed_tokens_deny() {
    let table = chat_table();
    table.load("", "", None, ["admin"]);

    // Undecodable tokens come back as empty credentials; an empty name is
    // never a user, even if something was loaded under it.
    assert!(!table.auth_rpc(&Request::new(token::encode("", ""), "x")));
    assert!(!table.auth_rpc(&Request::new("%%%", "x")));
    assert!(!table.auth_rpc(&Request::new("", "x")));
    assert!(!table.auth_sync("%%%", SyncMethod::Publish, "chat.lobby"));
}

#[test]
fn test_provisioning_round_trip_through_table() {
    let table = Table::new();
    let doc = Provisioning::from_json(
        r#"{
            "roles": {
                "ops": { "rpc": ["*"] },
                "watch": { "sync": ["subscribe:metrics.*"] }
            },
            "bindings": [
                { "user": "ops", "secret": "k1", "roles": ["ops", "watch"] },
                { "user": "dash", "secret": "k2", "roles": ["watch"] }
            ]
        }"#,
    )
    .unwrap();
    doc.apply(&table).unwrap();

    assert!(table.auth_rpc(&Request::new(token::encode("ops", "k1"), "node.restart")));
    assert!(!table.auth_rpc(&Request::new(token::encode("dash", "k2"), "node.restart")));
    assert!(table.auth_sync(&token::encode("dash", "k2"), SyncMethod::Subscribe, "metrics.cpu"));
    assert!(!table.auth_sync(&token::encode("dash", "k2"), SyncMethod::Publish, "metrics.cpu"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_readers_and_writers() {
    let table = Arc::new(chat_table());
    for i in 0..50 {
        table.load(&format!("user-{}", i), "secret", None, ["chat-reader"]);
    }

    let mut handles = vec![];

    // Readers: every check must succeed for existing bindings and fail for unknown users
    for i in 0..50 {
        let table = table.clone();
        handles.push(tokio::spawn(async move {
            let tok = token::encode(&format!("user-{}", i), "secret");
            let ghost = token::encode(&format!("ghost-{}", i), "secret");
            for _ in 0..200 {
                assert!(table.auth_sync(&tok, SyncMethod::Subscribe, "chat.lobby"));
                assert!(!table.auth_sync(&ghost, SyncMethod::Subscribe, "chat.lobby"));
                tokio::task::yield_now().await;
            }
        }));
    }

    // Writers: add new users and re-register unrelated roles
    for i in 0..10 {
        let table = table.clone();
        handles.push(tokio::spawn(async move {
            for j in 0..50 {
                table.load(&format!("new-{}-{}", i, j), "secret", None, ["chat-writer"]);
                table.register(format!("scratch-{}", i), Role::deny_all().into_auther());
                tokio::task::yield_now().await;
            }
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(table.user_count(), 50 + 10 * 50);
    assert!(table.check(["scratch-0", "scratch-9"]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reload_never_exposes_partial_role_set() {
    let table = Arc::new(Table::new());
    table.register("a", Role::rpc_methods(["a"]).into_auther());
    table.register("b", Role::rpc_methods(["b"]).into_auther());
    table.load("flip", "s", None, ["a"]);

    let stop = Arc::new(AtomicBool::new(false));

    let writer = {
        let table = table.clone();
        let stop = stop.clone();
        tokio::spawn(async move {
            let mut use_a = false;
            while !stop.load(Ordering::Relaxed) {
                let role = if use_a { "a" } else { "b" };
                table.load("flip", "s", None, [role]);
                use_a = !use_a;
                tokio::task::yield_now().await;
            }
        })
    };

    let tok = token::encode("flip", "s");
    let reader = {
        let table = table.clone();
        tokio::spawn(async move {
            for _ in 0..2_000 {
                // A captured role set stays intact while reloads replace it
                let set = table.role_set("flip", "s").unwrap();
                assert_eq!(set.len(), 1);
                let a = set.auth_rpc(&Request::new(tok.clone(), "a"));
                let b = set.auth_rpc(&Request::new(tok.clone(), "b"));
                assert!(a != b);
                tokio::task::yield_now().await;
            }
        })
    };

    tokio::time::timeout(Duration::from_secs(30), reader)
        .await
        .expect("reader timed out")
        .unwrap();
    stop.store(true, Ordering::Relaxed);
    writer.await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_auth_rpc_during_reload_sees_complete_role_set() {
    let table = Arc::new(Table::new());
    table.register("a", Role::rpc_methods(["a"]).into_auther());
    table.register("b", Role::rpc_methods(["b"]).into_auther());
    table.register("c", Role::rpc_methods(["c"]).into_auther());
    table.load("flip", "s", None, ["a", "b"]);

    let stop = Arc::new(AtomicBool::new(false));

    // Every binding the writer installs grants "a"; "b" and "c" alternate
    let writer = {
        let table = table.clone();
        let stop = stop.clone();
        tokio::spawn(async move {
            let mut with_b = false;
            while !stop.load(Ordering::Relaxed) {
                let roles: &[&str] = if with_b { &["a", "b"] } else { &["c", "a"] };
                table.load("flip", "s", None, roles);
                with_b = !with_b;
                tokio::task::yield_now().await;
            }
        })
    };

    let tok = token::encode("flip", "s");
    let readers: Vec<_> = (0..3)
        .map(|_| {
            let table = table.clone();
            let tok = tok.clone();
            tokio::spawn(async move {
                for _ in 0..2_000 {
                    assert!(table.auth_rpc(&Request::new(tok.clone(), "a")));
                    assert!(!table.auth_rpc(&Request::new(tok.clone(), "d")));

                    // One snapshot grants exactly one of "b" and "c"
                    let set = table.role_set("flip", "s").unwrap();
                    let b = set.auth_rpc(&Request::new(tok.clone(), "b"));
                    let c = set.auth_rpc(&Request::new(tok.clone(), "c"));
                    assert!(b != c);
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    for reader in readers {
        tokio::time::timeout(Duration::from_secs(30), reader)
            .await
            .expect("reader timed out")
            .unwrap();
    }
    stop.store(true, Ordering::Relaxed);
    writer.await.unwrap();
}
