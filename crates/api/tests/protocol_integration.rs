//! End-to-end tests for the registration handshake and the encrypted
//! command-queue/delivery protocol.
//!
//! These tests need a PostgreSQL database; set `TEST_DATABASE_URL` to run
//! them. Without it each test skips.

mod common;

use axum::http::Method;
use domain::models::ActionPayload;
use tower::ServiceExt;

use common::*;

macro_rules! require_pool {
    () => {
        match try_test_pool().await {
            Some(pool) => pool,
            None => {
                eprintln!("TEST_DATABASE_URL not set; skipping integration test");
                return;
            }
        }
    };
}

#[tokio::test]
async fn full_protocol_round_trip() {
    let pool = require_pool!();
    let app = create_test_app(pool);

    // Owner registers a device and receives a single-use token.
    let owner = signup_owner(&app).await;
    let (device_id, token) = issue_registration(&app, &owner, "Living Room TV").await;

    // Device activates with its public key.
    let (activated_id, private_key) = activate_device(&app, &token, "living-room-tv").await;
    assert_eq!(activated_id, device_id);

    // The token is consumed: a second activation fails with NotFound.
    let keys = shared::crypto::generate_key_pair().unwrap();
    let replay = json_request(
        Method::POST,
        "/api/v1/devices/activate",
        serde_json::json!({
            "token": token,
            "publicKey": keys.public_key_pem,
            "name": "imposter"
        }),
    );
    let response = app.clone().oneshot(replay).await.unwrap();
    assert_eq!(response.status(), 404);

    // Owner enqueues a volume increase with no due time.
    let enqueue = json_request_with_auth(
        Method::POST,
        "/api/v1/commands",
        serde_json::json!({
            "deviceId": device_id,
            "type": "volume",
            "payload": {"volume": {"action": "increase"}}
        }),
        &owner.token,
    );
    let response = app.clone().oneshot(enqueue).await.unwrap();
    let status = response.status();
    let body = parse_response_body(response).await;
    assert_eq!(status, 201, "enqueue failed: {}", body);
    assert_eq!(body["isSent"], false);
    // The stored payload is ciphertext, not the plaintext JSON.
    assert!(!body["payload"].as_str().unwrap().contains("increase"));

    // Device polls and receives exactly one command.
    let response = app
        .clone()
        .oneshot(bare_request(
            Method::GET,
            &format!("/api/v1/commands/poll/{}", device_id),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let delivered = parse_response_body(response).await;
    let delivered = delivered.as_array().unwrap();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0]["isSent"], true);

    // The payload decrypts to the original action.
    let plaintext = shared::crypto::decrypt_payload(
        &private_key,
        delivered[0]["payload"].as_str().unwrap(),
    )
    .unwrap();
    let payload = ActionPayload::from_bytes(&plaintext).unwrap();
    assert_eq!(
        payload,
        ActionPayload::Volume {
            action: domain::models::VolumeAction::Increase,
            value: None
        }
    );

    // A second poll immediately after is empty.
    let response = app
        .clone()
        .oneshot(bare_request(
            Method::GET,
            &format!("/api/v1/commands/poll/{}", device_id),
        ))
        .await
        .unwrap();
    let body = parse_response_body(response).await;
    assert_eq!(body.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn activation_with_unknown_token_fails() {
    let pool = require_pool!();
    let app = create_test_app(pool);

    let keys = shared::crypto::generate_key_pair().unwrap();
    let request = json_request(
        Method::POST,
        "/api/v1/devices/activate",
        serde_json::json!({
            "token": "reg_does-not-exist",
            "publicKey": keys.public_key_pem,
            "name": "nobody"
        }),
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn activation_rejects_malformed_public_key() {
    let pool = require_pool!();
    let app = create_test_app(pool);

    let owner = signup_owner(&app).await;
    let (_, token) = issue_registration(&app, &owner, "Desk").await;

    let request = json_request(
        Method::POST,
        "/api/v1/devices/activate",
        serde_json::json!({
            "token": token,
            "publicKey": "not a pem",
            "name": "desk"
        }),
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn enqueue_requires_ownership() {
    let pool = require_pool!();
    let app = create_test_app(pool);

    let owner = signup_owner(&app).await;
    let intruder = signup_owner(&app).await;
    let (device_id, token) = issue_registration(&app, &owner, "Bedroom").await;
    activate_device(&app, &token, "bedroom").await;

    let request = json_request_with_auth(
        Method::POST,
        "/api/v1/commands",
        serde_json::json!({
            "deviceId": device_id,
            "type": "media",
            "payload": {"media": {"action": "next"}}
        }),
        &intruder.token,
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn enqueue_to_pending_device_conflicts() {
    let pool = require_pool!();
    let app = create_test_app(pool);

    let owner = signup_owner(&app).await;
    let (device_id, _token) = issue_registration(&app, &owner, "Unactivated").await;

    let request = json_request_with_auth(
        Method::POST,
        "/api/v1/commands",
        serde_json::json!({
            "deviceId": device_id,
            "type": "media",
            "payload": {"media": {"action": "next"}}
        }),
        &owner.token,
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), 409);
}

#[tokio::test]
async fn enqueue_validates_payload() {
    let pool = require_pool!();
    let app = create_test_app(pool);

    let owner = signup_owner(&app).await;
    let (device_id, token) = issue_registration(&app, &owner, "Validator").await;
    activate_device(&app, &token, "validator").await;

    // Payload variant does not match the declared type.
    let mismatched = json_request_with_auth(
        Method::POST,
        "/api/v1/commands",
        serde_json::json!({
            "deviceId": device_id,
            "type": "volume",
            "payload": {"media": {"action": "next"}}
        }),
        &owner.token,
    );
    let response = app.clone().oneshot(mismatched).await.unwrap();
    assert_eq!(response.status(), 400);

    // Out-of-range value.
    let out_of_range = json_request_with_auth(
        Method::POST,
        "/api/v1/commands",
        serde_json::json!({
            "deviceId": device_id,
            "type": "brightness",
            "payload": {"brightness": {"action": "set", "value": 101}}
        }),
        &owner.token,
    );
    let response = app.clone().oneshot(out_of_range).await.unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn deferred_command_gated_by_due_time() {
    let pool = require_pool!();
    let app = create_test_app(pool.clone());

    let owner = signup_owner(&app).await;
    let (device_id, token) = issue_registration(&app, &owner, "Deferred").await;
    activate_device(&app, &token, "deferred").await;

    let due_at = chrono::Utc::now() + chrono::Duration::minutes(10);
    let enqueue = json_request_with_auth(
        Method::POST,
        "/api/v1/commands",
        serde_json::json!({
            "deviceId": device_id,
            "type": "media",
            "payload": {"media": {"action": "play_pause"}},
            "dueAt": due_at.to_rfc3339()
        }),
        &owner.token,
    );
    let response = app.clone().oneshot(enqueue).await.unwrap();
    let body = parse_response_body(response).await;
    let command_id = body["id"].as_i64().unwrap();

    // Not yet due: poll returns nothing.
    let response = app
        .clone()
        .oneshot(bare_request(
            Method::GET,
            &format!("/api/v1/commands/poll/{}", device_id),
        ))
        .await
        .unwrap();
    let body = parse_response_body(response).await;
    assert_eq!(body.as_array().unwrap().len(), 0);

    // Move the due time into the past instead of waiting ten minutes.
    sqlx::query("UPDATE commands SET due_at = NOW() - INTERVAL '1 second' WHERE id = $1")
        .bind(command_id)
        .execute(&pool)
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(bare_request(
            Method::GET,
            &format!("/api/v1/commands/poll/{}", device_id),
        ))
        .await
        .unwrap();
    let body = parse_response_body(response).await;
    let delivered = body.as_array().unwrap();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0]["id"].as_i64().unwrap(), command_id);
}

#[tokio::test]
async fn failure_report_is_idempotent_and_keeps_first_reason() {
    let pool = require_pool!();
    let app = create_test_app(pool);

    let owner = signup_owner(&app).await;
    let (device_id, token) = issue_registration(&app, &owner, "Flaky").await;
    activate_device(&app, &token, "flaky").await;

    let enqueue = json_request_with_auth(
        Method::POST,
        "/api/v1/commands",
        serde_json::json!({
            "deviceId": device_id,
            "type": "media",
            "payload": {"media": {"action": "stop"}}
        }),
        &owner.token,
    );
    let response = app.clone().oneshot(enqueue).await.unwrap();
    let body = parse_response_body(response).await;
    let command_id = body["id"].as_i64().unwrap();

    // Deliver it, then report failure.
    app.clone()
        .oneshot(bare_request(
            Method::GET,
            &format!("/api/v1/commands/poll/{}", device_id),
        ))
        .await
        .unwrap();

    let report = json_request(
        Method::PATCH,
        &format!("/api/v1/commands/{}/failure", command_id),
        serde_json::json!({"failureReason": "player not found"}),
    );
    let response = app.clone().oneshot(report).await.unwrap();
    assert_eq!(response.status(), 204);

    // A second report with a different reason must not overwrite the first.
    let second = json_request(
        Method::PATCH,
        &format!("/api/v1/commands/{}/failure", command_id),
        serde_json::json!({"failureReason": "something else entirely"}),
    );
    let response = app.clone().oneshot(second).await.unwrap();
    assert_eq!(response.status(), 204);

    let response = app
        .clone()
        .oneshot(get_request_with_auth(
            &format!("/api/v1/devices/{}/commands", device_id),
            &owner.token,
        ))
        .await
        .unwrap();
    let history = parse_response_body(response).await;
    let entry = history
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["id"].as_i64() == Some(command_id))
        .unwrap();
    assert_eq!(entry["isSent"], true);
    assert_eq!(entry["failureReason"], "player not found");
}

#[tokio::test]
async fn concurrent_polls_deliver_each_command_once() {
    let pool = require_pool!();
    let app = create_test_app(pool);

    let owner = signup_owner(&app).await;
    let (device_id, token) = issue_registration(&app, &owner, "Racer").await;
    activate_device(&app, &token, "racer").await;

    for _ in 0..5 {
        let enqueue = json_request_with_auth(
            Method::POST,
            "/api/v1/commands",
            serde_json::json!({
                "deviceId": device_id,
                "type": "volume",
                "payload": {"volume": {"action": "decrease"}}
            }),
            &owner.token,
        );
        let response = app.clone().oneshot(enqueue).await.unwrap();
        assert_eq!(response.status(), 201);
    }

    let poll_uri = format!("/api/v1/commands/poll/{}", device_id);
    let (first, second) = tokio::join!(
        app.clone().oneshot(bare_request(Method::GET, &poll_uri)),
        app.clone().oneshot(bare_request(Method::GET, &poll_uri)),
    );

    let first = parse_response_body(first.unwrap()).await;
    let second = parse_response_body(second.unwrap()).await;

    let mut ids: Vec<i64> = first
        .as_array()
        .unwrap()
        .iter()
        .chain(second.as_array().unwrap())
        .map(|c| c["id"].as_i64().unwrap())
        .collect();
    ids.sort_unstable();
    let total = ids.len();
    ids.dedup();

    // No duplication across the two responses, no loss overall.
    assert_eq!(total, 5, "each command must be delivered exactly once");
    assert_eq!(ids.len(), 5, "no command may appear in both responses");
}

#[tokio::test]
async fn device_listing_hides_secrets_and_tracks_liveness() {
    let pool = require_pool!();
    let app = create_test_app(pool);

    let owner = signup_owner(&app).await;
    let (device_id, token) = issue_registration(&app, &owner, "Visible").await;

    // The listing never echoes the registration token.
    let response = app
        .clone()
        .oneshot(get_request_with_auth("/api/v1/devices", &owner.token))
        .await
        .unwrap();
    let body = parse_response_body(response).await;
    assert!(!body.to_string().contains(&token));
    let device = body["devices"]
        .as_array()
        .unwrap()
        .iter()
        .find(|d| d["id"].as_i64() == Some(device_id))
        .unwrap();
    assert_eq!(device["isActive"], false);
    assert_eq!(device["online"], false);

    // After activation and a check-in the device reads as online.
    activate_device(&app, &token, "visible").await;
    let response = app
        .clone()
        .oneshot(bare_request(
            Method::POST,
            &format!("/api/v1/devices/{}/check-in", device_id),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), 204);

    let response = app
        .clone()
        .oneshot(get_request_with_auth("/api/v1/devices", &owner.token))
        .await
        .unwrap();
    let body = parse_response_body(response).await;
    let device = body["devices"]
        .as_array()
        .unwrap()
        .iter()
        .find(|d| d["id"].as_i64() == Some(device_id))
        .unwrap();
    assert_eq!(device["isActive"], true);
    assert_eq!(device["online"], true);
}

#[tokio::test]
async fn deleting_a_device_cascades_to_commands() {
    let pool = require_pool!();
    let app = create_test_app(pool.clone());

    let owner = signup_owner(&app).await;
    let (device_id, token) = issue_registration(&app, &owner, "Doomed").await;
    activate_device(&app, &token, "doomed").await;

    let enqueue = json_request_with_auth(
        Method::POST,
        "/api/v1/commands",
        serde_json::json!({
            "deviceId": device_id,
            "type": "media",
            "payload": {"media": {"action": "next"}}
        }),
        &owner.token,
    );
    app.clone().oneshot(enqueue).await.unwrap();

    let delete = json_request_with_auth(
        Method::DELETE,
        &format!("/api/v1/devices/{}", device_id),
        serde_json::json!({}),
        &owner.token,
    );
    let response = app.clone().oneshot(delete).await.unwrap();
    assert_eq!(response.status(), 204);

    let remaining: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM commands WHERE device_id = $1")
        .bind(device_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(remaining.0, 0);

    // Deleting again reports not found.
    let delete = json_request_with_auth(
        Method::DELETE,
        &format!("/api/v1/devices/{}", device_id),
        serde_json::json!({}),
        &owner.token,
    );
    let response = app.clone().oneshot(delete).await.unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn auth_rejects_bad_credentials_and_duplicates() {
    let pool = require_pool!();
    let app = create_test_app(pool);

    let owner = signup_owner(&app).await;

    // Wrong password.
    let login = json_request(
        Method::POST,
        "/api/v1/auth/login",
        serde_json::json!({
            "username": owner.username,
            "password": "definitely not the password"
        }),
    );
    let response = app.clone().oneshot(login).await.unwrap();
    assert_eq!(response.status(), 401);

    // Duplicate username.
    let signup = json_request(
        Method::POST,
        "/api/v1/auth/signup",
        serde_json::json!({
            "username": owner.username,
            "password": "another long password"
        }),
    );
    let response = app.clone().oneshot(signup).await.unwrap();
    assert_eq!(response.status(), 409);

    // Owner routes reject missing tokens.
    let response = app
        .clone()
        .oneshot(bare_request(Method::GET, "/api/v1/devices"))
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn mark_sent_compare_and_set_is_terminal() {
    let pool = require_pool!();
    let app = create_test_app(pool.clone());

    let owner = signup_owner(&app).await;
    let (device_id, token) = issue_registration(&app, &owner, "CasTest").await;
    activate_device(&app, &token, "cas-test").await;

    let enqueue = json_request_with_auth(
        Method::POST,
        "/api/v1/commands",
        serde_json::json!({
            "deviceId": device_id,
            "type": "volume",
            "payload": {"volume": {"action": "mute"}}
        }),
        &owner.token,
    );
    let response = app.clone().oneshot(enqueue).await.unwrap();
    let body = parse_response_body(response).await;
    let command_id = body["id"].as_i64().unwrap();

    let repo = persistence::repositories::CommandRepository::new(pool);

    // Only the first mark wins; the second is a no-op.
    assert!(repo.mark_sent(command_id).await.unwrap());
    assert!(!repo.mark_sent(command_id).await.unwrap());

    // Once sent, the command never shows up as pending again.
    let pending = repo.pending_for_device(device_id).await.unwrap();
    assert!(pending.iter().all(|c| c.id != command_id));
}
