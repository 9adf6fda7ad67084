// SPDX-License-Identifier: MIT

//! Session lifecycle integration tests, exercised through the router
//! with the in-memory store and offline Stream adapter.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use codepair::models::{Session, SessionStatus};
use tower::ServiceExt;

mod common;

fn authed(method: Method, uri: &str, token: &str, body: Option<serde_json::Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token));

    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn create_session(
    app: &axum::Router,
    token: &str,
    problem: &str,
    difficulty: &str,
) -> serde_json::Value {
    let response = app
        .clone()
        .oneshot(authed(
            Method::POST,
            "/api/sessions",
            token,
            Some(serde_json::json!({ "problem": problem, "difficulty": difficulty })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    common::body_json(response).await
}

#[tokio::test]
async fn test_create_session_shape() {
    let (app, state) = common::create_test_app();
    common::seed_user(&state, "idp_a", "Ada").await;
    let token = common::identity_token("idp_a", Some("Ada"));

    let body = create_session(&app, &token, "Two Sum", "Easy").await;
    let session = &body["session"];

    assert_eq!(session["problem"], "Two Sum");
    assert_eq!(session["difficulty"], "Easy");
    assert_eq!(session["status"], "active");
    assert_eq!(session["host"]["external_id"], "idp_a");
    assert!(session["participant"].is_null());
    assert!(session["call_id"]
        .as_str()
        .unwrap()
        .starts_with("session_"));
}

#[tokio::test]
async fn test_create_session_rejects_missing_fields() {
    let (app, state) = common::create_test_app();
    common::seed_user(&state, "idp_a", "Ada").await;
    let token = common::identity_token("idp_a", Some("Ada"));

    let response = app
        .clone()
        .oneshot(authed(
            Method::POST,
            "/api/sessions",
            &token,
            Some(serde_json::json!({ "problem": "", "difficulty": "Easy" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Whitespace-only is just as empty
    let response = app
        .oneshot(authed(
            Method::POST,
            "/api/sessions",
            &token,
            Some(serde_json::json!({ "problem": "Two Sum", "difficulty": "   " })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

/// The concrete end-to-end scenario: create as A, join as B, end as A,
/// end again fails.
#[tokio::test]
async fn test_full_session_scenario() {
    let (app, state) = common::create_test_app();
    common::seed_user(&state, "idp_a", "Ada").await;
    common::seed_user(&state, "idp_b", "Brian").await;
    let token_a = common::identity_token("idp_a", Some("Ada"));
    let token_b = common::identity_token("idp_b", Some("Brian"));

    let created = create_session(&app, &token_a, "Two Sum", "Easy").await;
    let id = created["session"]["id"].as_str().unwrap().to_string();

    // Fresh session has no participant
    let response = app
        .clone()
        .oneshot(authed(
            Method::GET,
            &format!("/api/sessions/{}", id),
            &token_a,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    assert!(body["session"]["participant"].is_null());

    // B joins
    let response = app
        .clone()
        .oneshot(authed(
            Method::PUT,
            &format!("/api/sessions/{}/join", id),
            &token_b,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    assert_eq!(body["session"]["participant"]["external_id"], "idp_b");
    assert_eq!(body["session"]["status"], "active");

    // A (host) ends
    let response = app
        .clone()
        .oneshot(authed(
            Method::PUT,
            &format!("/api/sessions/{}/end", id),
            &token_a,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    assert_eq!(body["session"]["status"], "completed");
    assert_eq!(body["message"], "Session ended successfully");

    // Second end is invalid state
    let response = app
        .oneshot(authed(
            Method::PUT,
            &format!("/api/sessions/{}/end", id),
            &token_a,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = common::body_json(response).await;
    assert_eq!(body["error"], "invalid_state");
}

#[tokio::test]
async fn test_host_cannot_join_own_session() {
    let (app, state) = common::create_test_app();
    common::seed_user(&state, "idp_a", "Ada").await;
    let token_a = common::identity_token("idp_a", Some("Ada"));

    let created = create_session(&app, &token_a, "Two Sum", "Easy").await;
    let id = created["session"]["id"].as_str().unwrap();

    let response = app
        .oneshot(authed(
            Method::POST,
            &format!("/api/sessions/{}/join", id),
            &token_a,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_second_joiner_gets_conflict() {
    let (app, state) = common::create_test_app();
    common::seed_user(&state, "idp_a", "Ada").await;
    common::seed_user(&state, "idp_b", "Brian").await;
    common::seed_user(&state, "idp_c", "Clara").await;
    let token_a = common::identity_token("idp_a", Some("Ada"));

    let created = create_session(&app, &token_a, "Two Sum", "Easy").await;
    let id = created["session"]["id"].as_str().unwrap();

    let join = |who: &str| {
        authed(
            Method::PUT,
            &format!("/api/sessions/{}/join", id),
            &common::identity_token(who, None),
            None,
        )
    };

    let response = app.clone().oneshot(join("idp_b")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(join("idp_c")).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_non_host_cannot_end() {
    let (app, state) = common::create_test_app();
    common::seed_user(&state, "idp_a", "Ada").await;
    common::seed_user(&state, "idp_b", "Brian").await;
    let token_a = common::identity_token("idp_a", Some("Ada"));
    let token_b = common::identity_token("idp_b", Some("Brian"));

    let created = create_session(&app, &token_a, "Two Sum", "Easy").await;
    let id = created["session"]["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(authed(
            Method::PUT,
            &format!("/api/sessions/{}/end", id),
            &token_b,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Status unchanged
    let session = state.db.get_session(&id).await.unwrap().unwrap();
    assert_eq!(session.status, SessionStatus::Active);
}

#[tokio::test]
async fn test_cannot_join_completed_session() {
    let (app, state) = common::create_test_app();
    common::seed_user(&state, "idp_a", "Ada").await;
    common::seed_user(&state, "idp_b", "Brian").await;
    let token_a = common::identity_token("idp_a", Some("Ada"));
    let token_b = common::identity_token("idp_b", Some("Brian"));

    let created = create_session(&app, &token_a, "Two Sum", "Easy").await;
    let id = created["session"]["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(authed(
            Method::PUT,
            &format!("/api/sessions/{}/end", id),
            &token_a,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(authed(
            Method::PUT,
            &format!("/api/sessions/{}/join", id),
            &token_b,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = common::body_json(response).await;
    assert_eq!(body["error"], "invalid_state");
}

#[tokio::test]
async fn test_unknown_session_is_404() {
    let (app, state) = common::create_test_app();
    common::seed_user(&state, "idp_a", "Ada").await;
    let token = common::identity_token("idp_a", Some("Ada"));

    for uri in [
        "/api/sessions/does-not-exist",
        "/api/sessions/does-not-exist/join",
        "/api/sessions/does-not-exist/end",
    ] {
        let method = if uri.ends_with("join") || uri.ends_with("end") {
            Method::PUT
        } else {
            Method::GET
        };
        let response = app
            .clone()
            .oneshot(authed(method, uri, &token, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "uri: {}", uri);
    }
}

fn seeded_session(id: u32, status: SessionStatus, host: &str, participant: Option<&str>) -> Session {
    Session {
        id: format!("seed{:03}", id),
        problem: "Two Sum".to_string(),
        difficulty: "Easy".to_string(),
        host_id: host.to_string(),
        participant_id: participant.map(String::from),
        call_id: format!("session_{}_{:04x}", id, id),
        status,
        created_at: format!("2026-02-0{}T{:02}:{:02}:00+00:00", 1 + id / 60 / 24, id / 60 % 24, id % 60),
        updated_at: "2026-02-01T00:00:00+00:00".to_string(),
    }
}

#[tokio::test]
async fn test_listings_partition_cap_and_order() {
    let (app, state) = common::create_test_app();
    common::seed_user(&state, "idp_a", "Ada").await;
    common::seed_user(&state, "idp_b", "Brian").await;
    let token_b = common::identity_token("idp_b", Some("Brian"));

    // 25 active sessions hosted by A, 25 completed with B as participant
    for i in 0..25 {
        state
            .db
            .create_session(&seeded_session(i, SessionStatus::Active, "idp_a", None))
            .await
            .unwrap();
        state
            .db
            .create_session(&seeded_session(
                100 + i,
                SessionStatus::Completed,
                "idp_a",
                Some("idp_b"),
            ))
            .await
            .unwrap();
    }

    // Active listing: only active, capped at 20, newest first
    let response = app
        .clone()
        .oneshot(authed(Method::GET, "/api/sessions/active", &token_b, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    let sessions = body["sessions"].as_array().unwrap();
    assert_eq!(sessions.len(), 20);
    for s in sessions {
        assert_eq!(s["status"], "active");
    }
    let timestamps: Vec<&str> = sessions
        .iter()
        .map(|s| s["created_at"].as_str().unwrap())
        .collect();
    let mut sorted = timestamps.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(timestamps, sorted);

    // "Mine" listing: only completed sessions involving B, capped at 20
    let response = app
        .oneshot(authed(Method::GET, "/api/sessions/mine", &token_b, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    let sessions = body["sessions"].as_array().unwrap();
    assert_eq!(sessions.len(), 20);
    for s in sessions {
        assert_eq!(s["status"], "completed");
        assert_eq!(s["participant"]["external_id"], "idp_b");
    }
}

#[tokio::test]
async fn test_mine_listing_excludes_other_users() {
    let (app, state) = common::create_test_app();
    common::seed_user(&state, "idp_a", "Ada").await;
    common::seed_user(&state, "idp_c", "Clara").await;
    let token_c = common::identity_token("idp_c", Some("Clara"));

    state
        .db
        .create_session(&seeded_session(1, SessionStatus::Completed, "idp_a", None))
        .await
        .unwrap();

    let response = app
        .oneshot(authed(Method::GET, "/api/sessions/mine", &token_c, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    assert!(body["sessions"].as_array().unwrap().is_empty());
}
