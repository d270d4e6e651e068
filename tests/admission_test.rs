//! End-to-end admission tests over a real socket.

use std::sync::Arc;
use std::time::Duration;

use admission_gate::http::GateState;
use admission_gate::sessions::{MemorySessionStore, SessionStore};
use axum::routing::{get, post};
use axum::Router;
use chrono::Utc;
use reqwest::StatusCode;

mod common;

fn app_routes() -> Router<GateState> {
    Router::new()
        .route("/login", post(|| async { "welcome" }))
        .route("/students/{id}", get(|| async { "student" }))
}

#[tokio::test]
async fn test_login_burst_then_reject() {
    let gate = common::start_gate(
        common::quiet_config(),
        Arc::new(MemorySessionStore::new()),
        app_routes(),
    )
    .await;
    let client = common::client();

    for attempt in 0..5 {
        let res = client.post(gate.url("/login")).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK, "attempt {}", attempt);
    }

    let res = client.post(gate.url("/login")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(res.text().await.unwrap().contains("Rate limit exceeded"));

    // Other routes for the same client stay unmetered.
    let res = client.get(gate.url("/students/42")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(gate.state.registry.snapshot().routes, 1);

    gate.stop().await;
}

#[tokio::test]
async fn test_concurrent_logins_admit_exactly_capacity() {
    let gate = common::start_gate(
        common::quiet_config(),
        Arc::new(MemorySessionStore::new()),
        app_routes(),
    )
    .await;
    let client = common::client();

    let mut tasks = Vec::new();
    for _ in 0..40 {
        let client = client.clone();
        let url = gate.url("/login");
        tasks.push(tokio::spawn(async move {
            client.post(url).send().await.unwrap().status()
        }));
    }

    let mut admitted = 0;
    let mut rejected = 0;
    for task in tasks {
        match task.await.unwrap() {
            StatusCode::OK => admitted += 1,
            StatusCode::TOO_MANY_REQUESTS => rejected += 1,
            other => panic!("unexpected status {}", other),
        }
    }

    assert_eq!(admitted, 5);
    assert_eq!(rejected, 35);

    gate.stop().await;
}

#[tokio::test]
async fn test_privileged_identity_gets_larger_quota() {
    let store = MemorySessionStore::new();
    let now = Utc::now();
    store
        .insert_session(common::session("sess_admin", &["admin"], now))
        .await
        .unwrap();
    store
        .insert_session(common::session("sess_student", &["student"], now))
        .await
        .unwrap();

    let mut config = common::quiet_config();
    for (class, capacity) in [("authenticated-user", 3.0), ("privileged-user", 6.0)] {
        config.limiter.classes.insert(
            class.to_string(),
            admission_gate::config::PolicyConfig {
                capacity,
                refill_per_minute: capacity,
            },
        );
    }

    let gate = common::start_gate(config, Arc::new(store), app_routes()).await;
    let client = common::client();

    let count_admitted = |session: &'static str| {
        let client = client.clone();
        let url = gate.url("/students/1");
        async move {
            let mut admitted = 0;
            for _ in 0..10 {
                let res = client
                    .get(&url)
                    .header("x-session-id", session)
                    .send()
                    .await
                    .unwrap();
                if res.status() == StatusCode::OK {
                    admitted += 1;
                }
            }
            admitted
        }
    };

    assert_eq!(count_admitted("sess_student").await, 3);
    assert_eq!(count_admitted("sess_admin").await, 6);
    assert_eq!(gate.state.registry.snapshot().identities, 2);

    gate.stop().await;
}

#[tokio::test]
async fn test_session_sweeper_reclaims_idle_sessions() {
    let store = MemorySessionStore::new();
    let stale = Utc::now() - chrono::Duration::hours(1);
    store
        .insert_session(common::session("sess_idle", &["student"], stale))
        .await
        .unwrap();
    store
        .insert_session(common::session("sess_active", &["student"], Utc::now()))
        .await
        .unwrap();

    let mut config = common::quiet_config();
    config.session_sweeper.enabled = true;
    config.session_sweeper.interval_secs = 1;

    let gate = common::start_gate(config, Arc::new(store.clone()), app_routes()).await;
    tokio::time::sleep(Duration::from_millis(1_500)).await;

    assert!(store.get_session("sess_idle").await.unwrap().is_none());
    assert!(store.get_session("sess_active").await.unwrap().is_some());

    let res = common::client()
        .get(gate.url("/whoami"))
        .header("cookie", "session_id=sess_idle")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_expires_session_cookie(&res);

    gate.stop().await;
}

#[tokio::test]
async fn test_swept_session_cookie_can_still_log_in() {
    let store = MemorySessionStore::new();
    let stale = Utc::now() - chrono::Duration::hours(1);
    store
        .insert_session(common::session("sess_idle", &["student"], stale))
        .await
        .unwrap();

    let mut config = common::quiet_config();
    config.session_sweeper.enabled = true;
    config.session_sweeper.interval_secs = 1;

    let gate = common::start_gate(config, Arc::new(store.clone()), app_routes()).await;
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    assert!(store.is_empty());

    let res = common::client()
        .post(gate.url("/login"))
        .header("cookie", "session_id=sess_idle")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_expires_session_cookie(&res);
    assert_eq!(res.text().await.unwrap(), "welcome");

    gate.stop().await;
}

#[tokio::test]
async fn test_revoked_session_on_login_path_continues_anonymously() {
    let store = MemorySessionStore::new();
    let mut revoked = common::session("sess_revoked", &["student"], Utc::now());
    revoked.is_revoked = true;
    store.insert_session(revoked).await.unwrap();

    let gate = common::start_gate(common::quiet_config(), Arc::new(store.clone()), app_routes()).await;

    let res = common::client()
        .post(gate.url("/login"))
        .header("x-session-id", "sess_revoked")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_expires_session_cookie(&res);
    assert!(store.is_empty());
    assert_eq!(gate.state.registry.snapshot().identities, 0);
    assert_eq!(gate.state.registry.snapshot().routes, 1);

    gate.stop().await;
}

fn assert_expires_session_cookie(res: &reqwest::Response) {
    let cookie = res
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(cookie.starts_with("session_id=;"), "set-cookie was {cookie:?}");
    assert!(cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_shutdown_stops_server_and_sweepers() {
    let gate = common::start_gate(
        admission_gate::GateConfig::default(),
        Arc::new(MemorySessionStore::new()),
        app_routes(),
    )
    .await;
    let url = gate.url("/health");

    let res = common::client().get(&url).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));

    gate.stop().await;
    assert!(common::client().get(&url).send().await.is_err());
}
