//! In-process stub of the Gongbu backend for protocol tests.
//!
//! Serves the auth endpoints plus a protected `/tasks` and public `/schools`
//! resource, counting refresh calls and recording the `Authorization` header
//! of every protected request so tests can assert exactly which credential
//! was sent.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{AppendHeaders, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use parking_lot::Mutex;
use serde_json::{Value, json};

pub const REFRESH_COOKIE: &str = "gongbu_refresh";
pub const USERNAME: &str = "student1";
pub const PASSWORD: &str = "password";

#[derive(Default)]
pub struct BackendOptions {
    /// Delay inside the refresh handler, to widen the window in which
    /// concurrent 401s can attach to one in-flight renewal.
    pub refresh_delay: Option<Duration>,
    /// Accept refresh calls without a refresh cookie (models a pre-existing
    /// cookie from an earlier visit, for bootstrap tests on a fresh jar).
    pub skip_cookie_check: bool,
}

struct Inner {
    refresh_calls: AtomicUsize,
    issued: AtomicUsize,
    valid_token: Mutex<Option<String>>,
    refresh_ok: Mutex<bool>,
    issue_expired_on_login: Mutex<bool>,
    tasks_always_unauthorized: Mutex<bool>,
    schools_unauthorized: Mutex<bool>,
    me_fails: Mutex<bool>,
    me_auth: Mutex<Vec<Option<String>>>,
    tasks_auth: Mutex<Vec<Option<String>>>,
    schools_auth: Mutex<Vec<Option<String>>>,
    refresh_delay: Option<Duration>,
    skip_cookie_check: bool,
}

#[derive(Clone)]
pub struct Backend(Arc<Inner>);

impl Backend {
    /// Binds the stub backend on an ephemeral port; returns it with its base
    /// URL.
    pub async fn spawn(options: BackendOptions) -> (Self, String) {
        let backend = Self(Arc::new(Inner {
            refresh_calls: AtomicUsize::new(0),
            issued: AtomicUsize::new(0),
            valid_token: Mutex::new(None),
            refresh_ok: Mutex::new(true),
            issue_expired_on_login: Mutex::new(false),
            tasks_always_unauthorized: Mutex::new(false),
            schools_unauthorized: Mutex::new(false),
            me_fails: Mutex::new(false),
            me_auth: Mutex::new(Vec::new()),
            tasks_auth: Mutex::new(Vec::new()),
            schools_auth: Mutex::new(Vec::new()),
            refresh_delay: options.refresh_delay,
            skip_cookie_check: options.skip_cookie_check,
        }));

        let router = Router::new()
            .route("/auth/login", post(login))
            .route("/auth/refresh", post(refresh))
            .route("/auth/logout", post(logout))
            .route("/auth/me", get(me))
            .route("/tasks", get(tasks))
            .route("/schools", get(schools))
            .with_state(backend.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("serve stub backend");
        });

        (backend, format!("http://{addr}"))
    }

    pub fn refresh_calls(&self) -> usize {
        self.0.refresh_calls.load(Ordering::SeqCst)
    }

    /// The token the backend currently accepts.
    pub fn current_token(&self) -> Option<String> {
        self.0.valid_token.lock().clone()
    }

    /// Stop accepting the currently issued token; the next refresh issues a
    /// working one.
    pub fn revoke_access(&self) {
        *self.0.valid_token.lock() = None;
    }

    pub fn set_refresh_ok(&self, ok: bool) {
        *self.0.refresh_ok.lock() = ok;
    }

    pub fn set_issue_expired_on_login(&self, expired: bool) {
        *self.0.issue_expired_on_login.lock() = expired;
    }

    pub fn set_tasks_always_unauthorized(&self, always: bool) {
        *self.0.tasks_always_unauthorized.lock() = always;
    }

    pub fn set_schools_unauthorized(&self, unauthorized: bool) {
        *self.0.schools_unauthorized.lock() = unauthorized;
    }

    pub fn set_me_fails(&self, fails: bool) {
        *self.0.me_fails.lock() = fails;
    }

    /// `Authorization` bearer values seen on `/auth/me`, in order.
    pub fn me_auth_headers(&self) -> Vec<Option<String>> {
        self.0.me_auth.lock().clone()
    }

    /// `Authorization` bearer values seen on `/tasks`, in order.
    pub fn tasks_auth_headers(&self) -> Vec<Option<String>> {
        self.0.tasks_auth.lock().clone()
    }

    /// `Authorization` bearer values seen on `/schools`, in order.
    pub fn schools_auth_headers(&self) -> Vec<Option<String>> {
        self.0.schools_auth.lock().clone()
    }

    fn mint(&self, expired: bool) -> String {
        let n = self.0.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let now = time::OffsetDateTime::now_utc().unix_timestamp();
        let exp = if expired { now - 600 } else { now + 3600 };
        let token = make_jwt(&json!({"sub": USERNAME, "exp": exp, "n": n}));
        *self.0.valid_token.lock() = Some(token.clone());
        token
    }

    fn accepts(&self, bearer: Option<&str>) -> bool {
        match (self.0.valid_token.lock().as_deref(), bearer) {
            (Some(valid), Some(sent)) => valid == sent,
            _ => false,
        }
    }
}

/// Unsigned JWT-shaped token; the client only decodes claims, it never
/// verifies signatures.
pub fn make_jwt(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string().as_bytes());
    format!("{header}.{payload}.stub-signature")
}

fn ok(data: Value) -> Value {
    json!({"success": true, "message": null, "data": data})
}

fn fail(message: &str) -> Value {
    json!({"success": false, "message": message, "data": null})
}

fn user_json() -> Value {
    json!({
        "id": 1,
        "username": USERNAME,
        "name": "Kim Jiwoo",
        "phoneNumber": "01012345678",
        "roles": ["STUDENT"],
        "createdAt": "2025-03-01T09:00:00Z",
        "studentProfile": {
            "status": "ACTIVE",
            "school": {"id": 7, "name": "Hanguk High School"},
            "grade": 2,
            "gender": "F"
        }
    })
}

fn bearer_of(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.to_string())
}

fn unauthorized(message: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(fail(message))).into_response()
}

async fn login(State(backend): State<Backend>, Json(body): Json<Value>) -> Response {
    let username = body["username"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();
    if username != USERNAME || password != PASSWORD {
        return unauthorized("bad credentials");
    }

    let expired = *backend.0.issue_expired_on_login.lock();
    let token = backend.mint(expired);
    let cookie = format!("{REFRESH_COOKIE}=refresh-secret; HttpOnly; Path=/");
    let data = json!({
        "userId": 1,
        "username": USERNAME,
        "name": "Kim Jiwoo",
        "roles": ["STUDENT"],
        "accessToken": token,
        "tokenType": "Bearer"
    });
    (
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(ok(data)),
    )
        .into_response()
}

async fn refresh(State(backend): State<Backend>, headers: HeaderMap) -> Response {
    backend.0.refresh_calls.fetch_add(1, Ordering::SeqCst);

    if let Some(delay) = backend.0.refresh_delay {
        tokio::time::sleep(delay).await;
    }

    if !*backend.0.refresh_ok.lock() {
        return unauthorized("refresh token invalid");
    }

    if !backend.0.skip_cookie_check {
        let has_cookie = headers
            .get(header::COOKIE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|cookies| cookies.contains(REFRESH_COOKIE));
        if !has_cookie {
            return unauthorized("missing refresh cookie");
        }
    }

    let token = backend.mint(false);
    Json(ok(json!({"accessToken": token}))).into_response()
}

async fn logout(State(backend): State<Backend>, headers: HeaderMap) -> Response {
    if !backend.accepts(bearer_of(&headers).as_deref()) {
        return unauthorized("not authenticated");
    }
    backend.revoke_access();
    Json(ok(Value::Null)).into_response()
}

async fn me(State(backend): State<Backend>, headers: HeaderMap) -> Response {
    let bearer = bearer_of(&headers);
    backend.0.me_auth.lock().push(bearer.clone());

    if *backend.0.me_fails.lock() {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(fail("user lookup failed")),
        )
            .into_response();
    }
    if !backend.accepts(bearer.as_deref()) {
        return unauthorized("invalid access token");
    }
    Json(ok(user_json())).into_response()
}

async fn tasks(State(backend): State<Backend>, headers: HeaderMap) -> Response {
    let bearer = bearer_of(&headers);
    backend.0.tasks_auth.lock().push(bearer.clone());

    if *backend.0.tasks_always_unauthorized.lock() || !backend.accepts(bearer.as_deref()) {
        return unauthorized("invalid access token");
    }
    Json(ok(json!([
        {"id": "t1", "title": "Math homework", "isCompleted": false}
    ])))
    .into_response()
}

async fn schools(State(backend): State<Backend>, headers: HeaderMap) -> Response {
    backend.0.schools_auth.lock().push(bearer_of(&headers));

    if *backend.0.schools_unauthorized.lock() {
        return unauthorized("school list unavailable");
    }
    Json(ok(json!([{"id": 7, "name": "Hanguk High School"}]))).into_response()
}
