//! HTTP tests for the accounts service
//!
//! These drive the full router (routing, auth middleware, handlers) over the
//! in-memory repository, so no database is needed.

use std::sync::Arc;

use accounts::{
    AppState, create_router,
    jwt::{JwtConfig, JwtService, TokenType, now},
    repositories::InMemoryAccountRepository,
    routes::{AuthResponse, MeResponse},
};
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt; // For oneshot()
use uuid::Uuid;

const SECRET: &str = "test-secret-that-is-long-enough-0123";

struct TestApp {
    router: Router,
    repository: InMemoryAccountRepository,
    jwt: JwtService,
}

impl TestApp {
    fn new() -> Self {
        let repository = InMemoryAccountRepository::new();
        let jwt = JwtService::new(JwtConfig::with_secret(SECRET)).unwrap();
        let state = AppState::new(Arc::new(repository.clone()), jwt.clone());

        Self {
            router: create_router(state),
            repository,
            jwt,
        }
    }

    async fn request(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();
        self.request(request).await
    }

    async fn me(&self, authorization: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method("GET").uri("/me/");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        self.request(builder.body(Body::empty()).unwrap()).await
    }

    async fn register(&self, body: Value) -> (StatusCode, Value) {
        self.post("/register/", body).await
    }
}

fn registration(email: &str, username: &str, phone_number: &str) -> Value {
    json!({
        "email": email,
        "username": username,
        "password": "password123",
        "password_confirm": "password123",
        "profile": {
            "phone_number": phone_number,
            "role": "student"
        }
    })
}

fn alice() -> Value {
    registration("a@x.com", "alice_1", "123-456-7890")
}

#[tokio::test]
async fn test_register_returns_user_and_tokens() {
    let app = TestApp::new();

    let (status, body) = app.register(alice()).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "User registered successfully");
    assert_eq!(body["user"]["email"], "a@x.com");
    assert_eq!(body["user"]["username"], "alice_1");
    assert_eq!(body["user"]["is_active"], true);
    assert_eq!(body["user"]["is_verified"], false);
    assert_eq!(body["user"]["profile"]["phone_number"], "1234567890");
    assert_eq!(body["user"]["profile"]["role"], "student");
    assert!(body["user"].get("password").is_none());
    assert!(body["user"].get("password_hash").is_none());

    let response: AuthResponse = serde_json::from_value(body).unwrap();
    assert!(!response.tokens.access.is_empty());
    assert!(!response.tokens.refresh.is_empty());
    assert_ne!(response.tokens.access, response.tokens.refresh);

    let claims = app
        .jwt
        .validate_token(&response.tokens.access, TokenType::Access)
        .unwrap();
    assert_eq!(claims.sub, response.user.id);
}

#[tokio::test]
async fn test_register_normalizes_email_and_accepts_birth_date() {
    let app = TestApp::new();

    let (status, body) = app
        .register(json!({
            "email": "  NewUser@Example.com ",
            "username": "newuser",
            "password": "newpass123",
            "password_confirm": "newpass123",
            "profile": {
                "phone_number": "9876543210",
                "role": "vendor",
                "date_of_birth": "1990-01-01"
            }
        }))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["email"], "newuser@example.com");
    assert_eq!(body["user"]["profile"]["role"], "vendor");
    assert_eq!(body["user"]["profile"]["date_of_birth"], "1990-01-01");
}

#[tokio::test]
async fn test_register_defaults_role_to_student() {
    let app = TestApp::new();

    let (status, body) = app
        .register(json!({
            "email": "b@x.com",
            "username": "bob",
            "password": "password123",
            "password_confirm": "password123",
            "profile": { "phone_number": "5555555555" }
        }))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["profile"]["role"], "student");
}

#[tokio::test]
async fn test_register_twice_with_same_email_fails_on_email() {
    let app = TestApp::new();
    assert_eq!(app.register(alice()).await.0, StatusCode::CREATED);

    let (status, body) = app
        .register(registration("A@X.com", "alice_2", "2223334444"))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation failed");
    assert_eq!(
        body["details"]["email"][0],
        "An account with this email already exists."
    );
    assert_eq!(app.repository.len().await, 1);
}

#[tokio::test]
async fn test_register_rejects_same_phone_digits_with_other_formatting() {
    let app = TestApp::new();
    assert_eq!(app.register(alice()).await.0, StatusCode::CREATED);

    let (status, body) = app
        .register(registration("c@x.com", "carol", "1234567890"))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["details"]["phone_number"][0],
        "This phone number is already registered."
    );
    assert_eq!(app.repository.len().await, 1);
}

#[tokio::test]
async fn test_register_rejects_taken_username() {
    let app = TestApp::new();
    assert_eq!(app.register(alice()).await.0, StatusCode::CREATED);

    let (status, body) = app
        .register(registration("d@x.com", "alice_1", "2223334444"))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["username"][0], "This username is already taken.");
}

#[tokio::test]
async fn test_register_password_mismatch_is_reported_with_other_errors() {
    let app = TestApp::new();

    let (status, body) = app
        .register(json!({
            "email": "not-an-email",
            "username": "ab",
            "password": "short",
            "password_confirm": "different",
            "profile": { "phone_number": "123", "role": "mentor" }
        }))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let details = &body["details"];
    assert_eq!(details["password_confirm"][0], "Passwords do not match.");
    for field in ["email", "username", "password", "phone_number", "role"] {
        assert!(details.get(field).is_some(), "missing error for {}", field);
    }
    assert!(app.repository.is_empty().await);
}

#[tokio::test]
async fn test_register_password_mismatch_alone() {
    let app = TestApp::new();
    let mut body = alice();
    body["password_confirm"] = json!("differentpass");

    let (status, body) = app.register(body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["password_confirm"][0], "Passwords do not match.");
    assert!(body["details"].get("password").is_none());
}

#[tokio::test]
async fn test_register_missing_password_confirm() {
    let app = TestApp::new();
    let mut body = alice();
    body.as_object_mut().unwrap().remove("password_confirm");

    let (status, body) = app.register(body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["details"]["password_confirm"][0],
        "You must confirm your password."
    );
}

#[tokio::test]
async fn test_register_rejects_malformed_json() {
    let app = TestApp::new();
    let request = Request::builder()
        .method("POST")
        .uri("/register/")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, body) = app.request(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["details"]["non_field_errors"][0],
        "Malformed JSON request body."
    );
}

#[tokio::test]
async fn test_register_reports_wrong_type_against_its_field() {
    let app = TestApp::new();

    let (status, body) = app
        .register(json!({
            "email": "e@x.com",
            "username": 12,
            "password": "password123",
            "password_confirm": "nope12345",
            "profile": { "phone_number": "2223334444" }
        }))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let details = &body["details"];
    assert_eq!(details["password_confirm"][0], "Passwords do not match.");
    assert_eq!(
        details["username"][0],
        "Username must be at least 3 characters long."
    );
    assert!(details.get("non_field_errors").is_none());

    let (status, body) = app
        .register(json!({
            "email": "e@x.com",
            "username": ["alice"],
            "password": "password123",
            "password_confirm": "password123",
            "profile": "student"
        }))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["username"][0], "Not a valid string.");
    assert_eq!(
        body["details"]["profile"][0],
        "Invalid data. Expected a dictionary, but got str."
    );
    assert_eq!(app.repository.len().await, 0);
}

#[tokio::test]
async fn test_register_accepts_numeric_phone_number() {
    let app = TestApp::new();

    let (status, body) = app
        .register(json!({
            "email": "f@x.com",
            "username": "frank",
            "password": "password123",
            "password_confirm": "password123",
            "profile": { "phone_number": 1234567890_u64 }
        }))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["profile"]["phone_number"], "1234567890");
}

#[tokio::test]
async fn test_login_reports_wrong_type_against_its_field() {
    let app = TestApp::new();

    let (status, body) = app
        .post("/login/", json!({ "email": true, "password": "password123" }))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["email"][0], "Not a valid string.");
}

#[tokio::test]
async fn test_login_success() {
    let app = TestApp::new();
    app.register(alice()).await;

    let (status, body) = app
        .post("/login/", json!({ "email": "A@x.com", "password": "password123" }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Login successful");
    let response: AuthResponse = serde_json::from_value(body).unwrap();
    assert_eq!(response.user.username, "alice_1");
    assert_ne!(response.tokens.access, response.tokens.refresh);
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = TestApp::new();
    app.register(alice()).await;

    let wrong_password = app
        .post("/login/", json!({ "email": "a@x.com", "password": "wrongpassword" }))
        .await;
    let unknown_email = app
        .post(
            "/login/",
            json!({ "email": "nobody@x.com", "password": "password123" }),
        )
        .await;

    assert_eq!(wrong_password.0, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password, unknown_email);
    assert_eq!(wrong_password.1, json!({ "detail": "Invalid credentials" }));
}

#[tokio::test]
async fn test_login_rejects_disabled_account() {
    let app = TestApp::new();
    let (_, body) = app.register(alice()).await;
    let user_id: Uuid = serde_json::from_value(body["user"]["id"].clone()).unwrap();
    app.repository.set_active(user_id, false).await;

    let (status, body) = app
        .post("/login/", json!({ "email": "a@x.com", "password": "password123" }))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "detail": "User account is disabled." }));
}

#[tokio::test]
async fn test_login_requires_both_fields() {
    let app = TestApp::new();

    let (status, body) = app.post("/login/", json!({ "email": "a@x.com" })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"]["password"].is_array());
}

#[tokio::test]
async fn test_me_returns_the_token_owner() {
    let app = TestApp::new();
    let (_, body) = app.register(alice()).await;
    let registered: AuthResponse = serde_json::from_value(body).unwrap();

    let (status, body) = app
        .me(Some(&format!("Bearer {}", registered.tokens.access)))
        .await;

    assert_eq!(status, StatusCode::OK);
    let me: MeResponse = serde_json::from_value(body).unwrap();
    assert_eq!(me.user, registered.user);
}

#[tokio::test]
async fn test_token_for_one_user_never_authenticates_another() {
    let app = TestApp::new();
    let (_, alice_body) = app.register(alice()).await;
    let (_, bob_body) = app
        .register(registration("b@x.com", "bob", "5555555555"))
        .await;
    let alice: AuthResponse = serde_json::from_value(alice_body).unwrap();
    let bob: AuthResponse = serde_json::from_value(bob_body).unwrap();

    let (_, body) = app.me(Some(&format!("Bearer {}", alice.tokens.access))).await;
    assert_eq!(body["user"]["id"], json!(alice.user.id));
    assert_ne!(body["user"]["id"], json!(bob.user.id));

    let (_, body) = app.me(Some(&format!("Bearer {}", bob.tokens.access))).await;
    assert_eq!(body["user"]["email"], "b@x.com");
}

#[tokio::test]
async fn test_me_without_credentials() {
    let app = TestApp::new();

    let (status, body) = app.me(None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Authentication credentials were not provided.");
}

#[tokio::test]
async fn test_me_rejects_bad_tokens() {
    let app = TestApp::new();
    let (_, body) = app.register(alice()).await;
    let registered: AuthResponse = serde_json::from_value(body).unwrap();

    for authorization in [
        "Bearer not-a-token".to_string(),
        format!("Token {}", registered.tokens.access),
        format!("Bearer {}", registered.tokens.refresh),
    ] {
        let (status, body) = app.me(Some(&authorization)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", authorization);
        assert_eq!(body["detail"], "Given token is invalid or expired.");
    }
}

#[tokio::test]
async fn test_me_rejects_expired_access_token() {
    let app = TestApp::new();
    let (_, body) = app.register(alice()).await;
    let user_id: Uuid = serde_json::from_value(body["user"]["id"].clone()).unwrap();

    let expired = app
        .jwt
        .issue_pair_at(user_id, now().unwrap() - 61 * 60)
        .unwrap();

    let (status, body) = app.me(Some(&format!("Bearer {}", expired.access))).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Given token is invalid or expired.");
}

#[tokio::test]
async fn test_me_rejects_token_of_unknown_or_disabled_user() {
    let app = TestApp::new();
    let stranger = app.jwt.issue_pair(Uuid::new_v4()).unwrap();

    let (status, _) = app.me(Some(&format!("Bearer {}", stranger.access))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, body) = app.register(alice()).await;
    let registered: AuthResponse = serde_json::from_value(body).unwrap();
    app.repository.set_active(registered.user.id, false).await;

    let (status, _) = app
        .me(Some(&format!("Bearer {}", registered.tokens.access)))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_issues_new_tokens() {
    let app = TestApp::new();
    let (_, body) = app.register(alice()).await;
    let registered: AuthResponse = serde_json::from_value(body).unwrap();

    let (status, body) = app
        .post(
            "/token/refresh/",
            json!({ "refresh": registered.tokens.refresh }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    let access = body["access"].as_str().unwrap();
    assert_ne!(access, registered.tokens.access);
    let (status, _) = app.me(Some(&format!("Bearer {}", access))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_rejects_access_tokens() {
    let app = TestApp::new();
    let (_, body) = app.register(alice()).await;
    let registered: AuthResponse = serde_json::from_value(body).unwrap();

    let (status, _) = app
        .post(
            "/token/refresh/",
            json!({ "refresh": registered.tokens.access }),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new();
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let (status, body) = app.request(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
