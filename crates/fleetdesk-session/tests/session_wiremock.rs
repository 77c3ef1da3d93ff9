//! Session lifecycle against a mocked account API

use base64::prelude::*;
use chrono::{Duration, Utc};
use fleetdesk_api::{ApiClient, ApiError, Credentials, HttpClientConfig};
use fleetdesk_core::{Action, AuthState, Resource};
use fleetdesk_session::{SessionContext, TenantContext};
use fleetdesk_storage::keys::ACCESS_TOKEN_KEY;
use fleetdesk_storage::{MemoryStateStore, StateStore};
use serde_json::{Value, json};
use std::sync::Arc;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, method, path},
};

fn token_expiring_in(offset: Duration) -> String {
    let header = BASE64_URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256"}"#);
    let claims = json!({"sub": "u1", "exp": (Utc::now() + offset).timestamp()});
    let payload = BASE64_URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{}.{}.sig", header, payload)
}

fn invoice_editor() -> Value {
    json!({
        "_id": "u1",
        "name": "Asha",
        "permissions": {"invoice": {"edit": true}},
        "tenant": {"_id": "t1", "name": "Acme Logistics", "features": {"gps": true}}
    })
}

async fn context_with(server: &MockServer, token: Option<String>) -> (SessionContext, Arc<MemoryStateStore>) {
    let store = Arc::new(MemoryStateStore::new());
    if let Some(token) = token {
        store.set(ACCESS_TOKEN_KEY, token).await.unwrap();
    }
    let api = Arc::new(ApiClient::new(server.uri(), &HttpClientConfig::default()).unwrap());
    (SessionContext::new(api, store.clone()), store)
}

#[tokio::test]
async fn test_initialize_without_token() {
    let server = MockServer::start().await;
    let (ctx, _) = context_with(&server, None).await;
    assert!(ctx.current().is_loading());

    let session = ctx.initialize().await;

    assert_eq!(session.state, AuthState::Unauthenticated);
    assert!(!ctx.has_permission(Resource::Invoice, Action::View));
}

#[tokio::test]
async fn test_initialize_restores_valid_token() {
    let server = MockServer::start().await;
    let token = token_expiring_in(Duration::hours(2));
    Mock::given(method("GET"))
        .and(path("/api/account/my-account"))
        .and(header("authorization", format!("Bearer {}", token).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"user": invoice_editor()})))
        .expect(1)
        .mount(&server)
        .await;

    let (ctx, _) = context_with(&server, Some(token)).await;
    let mut updates = ctx.subscribe();
    let session = ctx.initialize().await;

    assert!(session.is_authenticated());
    assert!(updates.has_changed().unwrap());
    assert!(updates.borrow_and_update().is_authenticated());

    assert!(ctx.has_permission(Resource::Invoice, Action::Edit));
    assert!(!ctx.has_permission(Resource::Invoice, Action::Delete));
    assert!(!ctx.has_permission(Resource::Bank, Action::Edit));

    let tenant = TenantContext::from_session(&ctx.current());
    assert!(tenant.feature_enabled("gps"));
}

#[tokio::test]
async fn test_restore_accepts_mongo_style_account() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/account/my-account"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_id": "u1",
            "id": "u1",
            "tenantId": "",
            "permissions": {"trip": {"view": true}}
        })))
        .mount(&server)
        .await;

    let (ctx, store) = context_with(&server, Some(token_expiring_in(Duration::hours(1)))).await;
    let session = ctx.initialize().await;

    assert!(session.is_authenticated());
    assert!(ctx.has_permission(Resource::Trip, Action::View));
    assert!(TenantContext::from_session(&session).tenant_id().is_none());
    assert!(store.get(ACCESS_TOKEN_KEY).await.unwrap().is_some());
}

#[tokio::test]
async fn test_expired_token_is_discarded_without_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(invoice_editor()))
        .expect(0)
        .mount(&server)
        .await;

    let (ctx, store) = context_with(&server, Some(token_expiring_in(Duration::minutes(-1)))).await;
    let session = ctx.initialize().await;

    assert_eq!(session.state, AuthState::Unauthenticated);
    assert!(store.get(ACCESS_TOKEN_KEY).await.unwrap().is_none());
    assert!(!ctx.api().has_token());
}

#[tokio::test]
async fn test_rejected_token_is_discarded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/account/my-account"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "jwt revoked"})))
        .mount(&server)
        .await;

    let (ctx, store) = context_with(&server, Some(token_expiring_in(Duration::hours(1)))).await;
    let session = ctx.initialize().await;

    assert_eq!(session.state, AuthState::Unauthenticated);
    assert!(store.get(ACCESS_TOKEN_KEY).await.unwrap().is_none());
}

#[tokio::test]
async fn test_login_persists_token_and_logout_clears_it() {
    let server = MockServer::start().await;
    let token = token_expiring_in(Duration::hours(8));
    Mock::given(method("POST"))
        .and(path("/api/account/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessToken": token,
            "user": invoice_editor()
        })))
        .mount(&server)
        .await;

    let (ctx, store) = context_with(&server, None).await;
    ctx.initialize().await;

    let user = ctx
        .login(&Credentials::new("asha@acme.test", "pw"))
        .await
        .unwrap();

    assert_eq!(user.id, "u1");
    assert!(ctx.is_authenticated());
    assert_eq!(store.get(ACCESS_TOKEN_KEY).await.unwrap(), Some(token));
    assert!(ctx.api().has_token());

    ctx.logout().await;

    assert_eq!(ctx.current().state, AuthState::Unauthenticated);
    assert!(ctx.user().is_none());
    assert!(store.get(ACCESS_TOKEN_KEY).await.unwrap().is_none());
    assert!(!ctx.api().has_token());
}

#[tokio::test]
async fn test_login_without_user_fetches_account() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/account/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "a.b.c"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/account/my-account"))
        .and(header("authorization", "Bearer a.b.c"))
        .respond_with(ResponseTemplate::new(200).set_body_json(invoice_editor()))
        .expect(1)
        .mount(&server)
        .await;

    let (ctx, _) = context_with(&server, None).await;
    let user = ctx.login(&Credentials::new("asha@acme.test", "pw")).await.unwrap();

    assert_eq!(user.name.as_deref(), Some("Asha"));
}

#[tokio::test]
async fn test_failed_login_leaves_session_unchanged() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/account/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Invalid credentials"})))
        .mount(&server)
        .await;

    let (ctx, store) = context_with(&server, None).await;
    ctx.initialize().await;
    let before = ctx.current();

    let err = ctx
        .login(&Credentials::new("asha@acme.test", "nope"))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Unauthorized { .. }));
    assert_eq!(ctx.current(), before);
    assert!(store.get(ACCESS_TOKEN_KEY).await.unwrap().is_none());
}
