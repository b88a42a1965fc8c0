//! HTTP routes.
//!
//! - `GET /` - liveness
//! - `POST /user` - registration
//! - `POST /refresh-app-token` - reissue the caller's session token
//! - `GET /me` - the caller's public profile
//! - `GET /scp` - what the caller is playing on Spotify
//!
//! Everything but liveness and registration sits behind the session gate.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{
        HeaderValue, Method, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use nowplaying_identity::{Registration, RegistrationOutcome, User};
use nowplaying_upstream::CurrentActivity;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{debug, warn};

use crate::auth::{AppState, CurrentSession, require_session};
use crate::config::CorsConfig;
use crate::error::ApiError;

/// Builds the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/refresh-app-token", post(refresh_app_token))
        .route("/me", get(me))
        .route("/scp", get(currently_playing))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    Router::new()
        .route("/", get(health))
        .route("/user", post(register))
        .merge(protected)
        .with_state(state)
}

/// Builds the CORS layer for the configured origins.
///
/// Origins that are not valid header values are skipped with a warning.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
}

async fn health() -> &'static str {
    "ok"
}

/// Public view of a user. Never carries credentials or the session secret.
#[derive(Debug, Serialize)]
struct UserView {
    id: String,
    username: String,
    email: String,
    spotify_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id().to_string(),
            username: user.username().to_string(),
            email: user.email().to_string(),
            spotify_id: user.provider_account_id().to_string(),
            created_at: user.created_at(),
            updated_at: user.updated_at(),
        }
    }
}

#[derive(Debug, Serialize)]
struct RegisterResponse {
    token: String,
    expires_at: DateTime<Utc>,
    already_exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<UserView>,
}

#[derive(Debug, Serialize)]
struct TokenResponse {
    token: String,
    expires_at: DateTime<Utc>,
}

async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Registration>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let Json(registration) = payload.map_err(|e| {
        debug!(error = %e, "rejected registration body");
        ApiError::INVALID_INPUT
    })?;

    let session = state.registrar.register(registration).await?;
    let status = match session.outcome {
        RegistrationOutcome::Created => StatusCode::CREATED,
        RegistrationOutcome::AlreadyExists => StatusCode::OK,
    };

    Ok((
        status,
        Json(RegisterResponse {
            token: session.token,
            expires_at: session.expires_at,
            already_exists: session.outcome == RegistrationOutcome::AlreadyExists,
            user: session.user.as_ref().map(UserView::from),
        }),
    ))
}

async fn refresh_app_token(
    State(state): State<Arc<AppState>>,
    CurrentSession(claims): CurrentSession,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = state
        .codec
        .reissue(&claims)
        .map_err(|e| ApiError::from(&e))?;

    Ok(Json(TokenResponse {
        expires_at: token.expires_at(),
        token: token.into_string(),
    }))
}

async fn me(
    State(state): State<Arc<AppState>>,
    CurrentSession(claims): CurrentSession,
) -> Result<Json<UserView>, ApiError> {
    let user = state
        .directory
        .find_by_id(claims.user_id())
        .await
        .map_err(|e| ApiError::from_lookup(&e))?;

    Ok(Json(UserView::from(&user)))
}

async fn currently_playing(
    State(state): State<Arc<AppState>>,
    CurrentSession(claims): CurrentSession,
) -> Result<Response, ApiError> {
    match state.orchestrator.current_activity(&claims).await? {
        CurrentActivity::Playing(payload) => Ok(Json(payload).into_response()),
        CurrentActivity::Idle => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use nowplaying_core::UserId;
    use nowplaying_identity::{
        DirectoryError, Identity, InMemorySessionCache, InMemoryUserDirectory, SessionCodec,
        UserDirectory,
    };
    use nowplaying_upstream::{ActivityClient, ActivityResponse, TokenRefresher, UpstreamError};
    use serde_json::{Value, json};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    /// Directory that counts every call before delegating.
    #[derive(Default)]
    struct CountingDirectory {
        inner: InMemoryUserDirectory,
        calls: AtomicUsize,
    }

    impl CountingDirectory {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl UserDirectory for CountingDirectory {
        async fn create(&self, user: &User) -> Result<UserId, DirectoryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.create(user).await
        }

        async fn find_by_email(&self, email: &str) -> Result<User, DirectoryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.find_by_email(email).await
        }

        async fn find_by_id(&self, id: UserId) -> Result<User, DirectoryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.find_by_id(id).await
        }

        async fn update_access_token(&self, email: &str, token: &str) -> Result<(), DirectoryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.update_access_token(email, token).await
        }
    }

    struct FixedRefresher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TokenRefresher for FixedRefresher {
        async fn refresh(&self, _refresh_token: &str) -> Result<String, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("access-2".to_string())
        }
    }

    struct ScriptedClient {
        responses: Mutex<VecDeque<ActivityResponse>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ActivityClient for ScriptedClient {
        async fn currently_playing(
            &self,
            _access_token: &str,
        ) -> Result<ActivityResponse, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .expect("lock")
                .pop_front()
                .ok_or_else(|| UpstreamError::Unavailable {
                    reason: "no scripted response".to_string(),
                })
        }
    }

    struct Harness {
        app: Router,
        codec: SessionCodec,
        directory: Arc<CountingDirectory>,
        refresher: Arc<FixedRefresher>,
        client: Arc<ScriptedClient>,
    }

    fn harness(responses: Vec<ActivityResponse>) -> Harness {
        let codec = SessionCodec::new(
            Some("route-test-secret".to_string()),
            "nowplaying",
            chrono::Duration::minutes(60),
        );
        let directory = Arc::new(CountingDirectory::default());
        let refresher = Arc::new(FixedRefresher {
            calls: AtomicUsize::new(0),
        });
        let client = Arc::new(ScriptedClient {
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
        });
        let state = Arc::new(AppState::new(
            codec.clone(),
            directory.clone(),
            Arc::new(InMemorySessionCache::new()),
            refresher.clone(),
            client.clone(),
        ));

        Harness {
            app: router(state),
            codec,
            directory,
            refresher,
            client,
        }
    }

    fn registration_body(email: &str) -> Body {
        Body::from(
            json!({
                "username": "alice",
                "email": email,
                "spotify_id": "sp-alice",
                "access_token": "access-1",
                "refresh_token": "refresh-1"
            })
            .to_string(),
        )
    }

    fn post_user(email: &str) -> Request<Body> {
        Request::post("/user")
            .header(CONTENT_TYPE, "application/json")
            .body(registration_body(email))
            .expect("request")
    }

    fn authorized(method: Method, uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .expect("request")
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, body)
    }

    async fn register_token(h: &Harness, email: &str) -> String {
        let (status, body) = send(&h.app, post_user(email)).await;
        assert_eq!(status, StatusCode::CREATED);
        body["token"].as_str().expect("token").to_string()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let h = harness(vec![]);
        let response = h
            .app
            .clone()
            .oneshot(Request::get("/").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn registering_twice_returns_the_same_token() {
        let h = harness(vec![]);

        let (status, first) = send(&h.app, post_user("a@x.com")).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(first["already_exists"], false);
        assert_eq!(first["user"]["email"], "a@x.com");
        assert_eq!(first["user"]["spotify_id"], "sp-alice");
        assert!(first["user"].get("access_token").is_none());

        let (status, second) = send(&h.app, post_user("a@x.com")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(second["already_exists"], true);
        assert_eq!(second["token"], first["token"]);
        assert!(second.get("user").is_none());

        assert_eq!(h.directory.inner.count_email("a@x.com").await, 1);
    }

    #[tokio::test]
    async fn invalid_registration_is_bad_request() {
        let h = harness(vec![]);

        let (status, body) = send(&h.app, post_user("not-an-email")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_input");

        let malformed = Request::post("/user")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from("{\"username\":"))
            .expect("request");
        let (status, body) = send(&h.app, malformed).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_input");
        assert_eq!(h.directory.calls(), 0);
    }

    #[tokio::test]
    async fn malformed_headers_touch_nothing() {
        let h = harness(vec![ActivityResponse::Activity(CurrentActivity::Idle)]);

        for header in [None, Some(""), Some("Bearer"), Some("Bearer ")] {
            let mut request = Request::get("/scp");
            if let Some(value) = header {
                request = request.header(AUTHORIZATION, value);
            }
            let (status, body) = send(&h.app, request.body(Body::empty()).expect("request")).await;

            assert_eq!(status, StatusCode::UNAUTHORIZED, "{header:?}");
            assert_eq!(body["error"], "missing_credential");
        }

        assert_eq!(h.directory.calls(), 0);
        assert_eq!(h.client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn invalid_token_is_unauthorized() {
        let h = harness(vec![]);

        let (status, body) = send(&h.app, authorized(Method::GET, "/me", "not.a.token")).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "invalid_token");
        assert_eq!(h.directory.calls(), 0);
    }

    #[tokio::test]
    async fn refresh_app_token_reissues_same_identity() {
        let h = harness(vec![]);
        let token = register_token(&h, "a@x.com").await;

        let (status, body) = send(
            &h.app,
            authorized(Method::POST, "/refresh-app-token", &token),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let fresh = body["token"].as_str().expect("token");
        let before = h.codec.verify(&token).expect("verify old");
        let after = h.codec.verify(fresh).expect("verify new");
        assert_eq!(after.identity(), before.identity());
        assert!(body["expires_at"].is_string());
    }

    #[tokio::test]
    async fn me_returns_public_profile() {
        let h = harness(vec![]);
        let token = register_token(&h, "a@x.com").await;

        let (status, body) = send(&h.app, authorized(Method::GET, "/me", &token)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], "a@x.com");
        assert_eq!(body["username"], "alice");
        assert!(body["id"].as_str().expect("id").starts_with("usr_"));
        for secret in ["access_token", "refresh_token", "session_secret"] {
            assert!(body.get(secret).is_none(), "{secret} leaked");
        }
    }

    #[tokio::test]
    async fn me_for_unknown_user_is_not_found() {
        let h = harness(vec![]);
        let token = h
            .codec
            .issue(&Identity {
                user_id: UserId::new(),
                username: "ghost".to_string(),
                email: "ghost@x.com".to_string(),
            })
            .expect("issue");

        let (status, body) = send(&h.app, authorized(Method::GET, "/me", token.as_str())).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "user_not_found");
    }

    #[tokio::test]
    async fn scp_passes_payload_through_after_one_refresh() {
        let payload = json!({"is_playing": true, "item": {"name": "Song"}});
        let h = harness(vec![
            ActivityResponse::Unauthorized,
            ActivityResponse::Activity(CurrentActivity::Playing(payload.clone())),
        ]);
        let token = register_token(&h, "a@x.com").await;

        let (status, body) = send(&h.app, authorized(Method::GET, "/scp", &token)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, payload);
        assert_eq!(h.refresher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.client.calls.load(Ordering::SeqCst), 2);
        let stored = h.directory.inner.find_by_email("a@x.com").await.expect("find");
        assert_eq!(stored.access_token(), "access-2");
    }

    #[tokio::test]
    async fn scp_idle_is_no_content() {
        let h = harness(vec![ActivityResponse::Activity(CurrentActivity::Idle)]);
        let token = register_token(&h, "a@x.com").await;

        let (status, body) = send(&h.app, authorized(Method::GET, "/scp", &token)).await;

        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, Value::Null);
    }

    #[tokio::test]
    async fn scp_rejected_after_refresh_is_bad_gateway() {
        let h = harness(vec![
            ActivityResponse::Unauthorized,
            ActivityResponse::Unauthorized,
        ]);
        let token = register_token(&h, "a@x.com").await;

        let (status, body) = send(&h.app, authorized(Method::GET, "/scp", &token)).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "upstream_auth");
        assert_eq!(h.refresher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn scp_for_unknown_user_is_unauthorized() {
        let h = harness(vec![]);
        let token = h
            .codec
            .issue(&Identity {
                user_id: UserId::new(),
                username: "ghost".to_string(),
                email: "ghost@x.com".to_string(),
            })
            .expect("issue");

        let (status, body) = send(&h.app, authorized(Method::GET, "/scp", token.as_str())).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "user_not_found");
        assert_eq!(h.client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cors_allows_configured_origin() {
        let h = harness(vec![]);
        let app = h.app.layer(cors_layer(&CorsConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        }));
        let preflight = Request::builder()
            .method(Method::OPTIONS)
            .uri("/scp")
            .header("origin", "http://localhost:3000")
            .header("access-control-request-method", "GET")
            .header("access-control-request-headers", "authorization")
            .body(Body::empty())
            .expect("request");

        let response = app.oneshot(preflight).await.expect("response");

        assert_eq!(
            response
                .headers()
                .get("access-control-allow-origin")
                .and_then(|v| v.to_str().ok()),
            Some("http://localhost:3000")
        );
    }
}
