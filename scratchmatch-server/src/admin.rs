//! Admin HTTP surface: approvals, event open/close, configuration, reset.
//!
//! Access control is a credential login that mints a bearer session token,
//! validated on every admin request. The check fails closed: no configured
//! credentials means the whole surface answers 503, and anything short of a
//! valid, unexpired token is a 401. This is deliberately minimal - a gate in
//! front of event bookkeeping, not an identity system.

use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use scratchmatch_core::{EventConfig, EventConfigPatch, Participant};

use crate::api::ApiError;
use crate::status::StatusData;
use crate::AppState;

/// How long an admin session stays valid.
const SESSION_TTL_HOURS: i64 = 12;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

fn disabled_response() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({
            "error": "Admin surface is disabled (ADMIN_USERNAME/ADMIN_PASSWORD not configured)"
        })),
    )
        .into_response()
}

fn unauthorized_response(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": message })),
    )
        .into_response()
}

async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Response {
    let Some(credentials) = &state.admin_credentials else {
        return disabled_response();
    };

    if request.username != credentials.username || request.password != credentials.password {
        warn!("Rejected admin login for username {:?}", request.username);
        return unauthorized_response("Invalid credentials");
    }

    let token = Uuid::new_v4().to_string();
    let expires_at = Utc::now() + Duration::hours(SESSION_TTL_HOURS);
    {
        // Abandoned sessions are never re-presented, so sweep them here
        // rather than letting the map grow for the life of the process.
        let mut sessions = state.sessions.write().await;
        let now = Utc::now();
        sessions.retain(|_, expiry| *expiry > now);
        sessions.insert(token.clone(), expires_at);
    }

    info!("Admin session opened");
    Json(json!({
        "token": token,
        "expiresAt": expires_at.to_rfc3339(),
    }))
    .into_response()
}

/// Validate the bearer session on an admin request.
///
/// Expired tokens are pruned as they are seen.
async fn validate_session(state: &AppState, headers: &HeaderMap) -> Result<(), Response> {
    if state.admin_credentials.is_none() {
        return Err(disabled_response());
    }

    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| unauthorized_response("Missing bearer token"))?;

    let mut sessions = state.sessions.write().await;
    match sessions.get(token) {
        Some(expiry) if *expiry > Utc::now() => Ok(()),
        Some(_) => {
            sessions.remove(token);
            Err(unauthorized_response("Session expired"))
        }
        None => Err(unauthorized_response("Invalid session")),
    }
}

async fn require_session(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if let Err(response) = validate_session(&state, request.headers()).await {
        return response;
    }
    next.run(request).await
}

async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusData> {
    let participants = state.store.participants().await;
    let config = state.store.config().await;
    Json(StatusData::from_snapshot(
        participants,
        &config,
        crate::service_version().to_string(),
    ))
}

async fn approve_handler(
    State(state): State<Arc<AppState>>,
    Path(email): Path<String>,
) -> Result<Json<Participant>, ApiError> {
    let participant = state.store.approve(&email).await?;
    Ok(Json(participant))
}

async fn config_handler(
    State(state): State<Arc<AppState>>,
    Json(patch): Json<EventConfigPatch>,
) -> Json<EventConfig> {
    Json(state.store.update_config(&patch).await)
}

async fn open_handler(State(state): State<Arc<AppState>>) -> Json<EventConfig> {
    Json(state.store.set_event_open(true).await)
}

async fn close_handler(State(state): State<Arc<AppState>>) -> Json<EventConfig> {
    Json(state.store.set_event_open(false).await)
}

async fn reset_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    state.store.reset().await;
    Json(json!({ "status": "reset" }))
}

pub fn admin_router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/admin/status", get(status_handler))
        .route("/admin/participants/:email/approve", post(approve_handler))
        .route("/admin/config", post(config_handler))
        .route("/admin/event/open", post(open_handler))
        .route("/admin/event/close", post(close_handler))
        .route("/admin/reset", post(reset_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    Router::new()
        .route("/admin/login", post(login_handler))
        .merge(protected)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdminCredentials;
    use crate::store::EventStore;
    use axum::http::HeaderValue;

    async fn state_with_credentials() -> Arc<AppState> {
        let store = Arc::new(EventStore::in_memory().await);
        Arc::new(AppState::new(
            store,
            Some(AdminCredentials {
                username: "admin".to_string(),
                password: "secret".to_string(),
            }),
        ))
    }

    fn bearer_headers(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    #[tokio::test]
    async fn login_is_disabled_without_configured_credentials() {
        let store = Arc::new(EventStore::in_memory().await);
        let state = Arc::new(AppState::new(store, None));

        let response = login_handler(
            State(state),
            Json(LoginRequest {
                username: "admin".to_string(),
                password: "secret".to_string(),
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn login_rejects_bad_credentials() {
        let state = state_with_credentials().await;

        let response = login_handler(
            State(state.clone()),
            Json(LoginRequest {
                username: "admin".to_string(),
                password: "wrong".to_string(),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(state.sessions.read().await.is_empty());
    }

    #[tokio::test]
    async fn login_mints_a_usable_session() {
        let state = state_with_credentials().await;

        let response = login_handler(
            State(state.clone()),
            Json(LoginRequest {
                username: "admin".to_string(),
                password: "secret".to_string(),
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let token = state
            .sessions
            .read()
            .await
            .keys()
            .next()
            .cloned()
            .expect("session should exist");

        let headers = bearer_headers(&token);
        assert!(validate_session(&state, &headers).await.is_ok());
    }

    #[tokio::test]
    async fn validation_fails_closed() {
        let state = state_with_credentials().await;

        // No Authorization header
        assert!(validate_session(&state, &HeaderMap::new()).await.is_err());

        // Unknown token
        let headers = bearer_headers("not-a-session");
        assert!(validate_session(&state, &headers).await.is_err());
    }

    #[tokio::test]
    async fn login_sweeps_abandoned_expired_sessions() {
        let state = state_with_credentials().await;
        state
            .sessions
            .write()
            .await
            .insert("abandoned".to_string(), Utc::now() - Duration::minutes(1));

        let response = login_handler(
            State(state.clone()),
            Json(LoginRequest {
                username: "admin".to_string(),
                password: "secret".to_string(),
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let sessions = state.sessions.read().await;
        assert!(!sessions.contains_key("abandoned"));
        assert_eq!(sessions.len(), 1);
    }

    #[tokio::test]
    async fn expired_sessions_are_rejected_and_pruned() {
        let state = state_with_credentials().await;
        let token = "stale-token".to_string();
        state
            .sessions
            .write()
            .await
            .insert(token.clone(), Utc::now() - Duration::minutes(1));

        let headers = bearer_headers(&token);
        assert!(validate_session(&state, &headers).await.is_err());
        assert!(state.sessions.read().await.is_empty());
    }

    #[tokio::test]
    async fn approve_then_status_reflects_the_change() {
        let state = state_with_credentials().await;
        state.store.sign_in("a@example.com").await;

        let Json(participant) =
            approve_handler(State(state.clone()), Path("a@example.com".to_string()))
                .await
                .unwrap();
        assert!(participant.approved);

        let Json(status) = status_handler(State(state)).await;
        assert_eq!(status.summary.approved, 1);
    }

    #[tokio::test]
    async fn approve_unknown_email_is_not_found() {
        let state = state_with_credentials().await;
        let result = approve_handler(State(state), Path("ghost@example.com".to_string())).await;
        assert_eq!(result.err(), Some(ApiError::UnknownParticipant));
    }

    #[tokio::test]
    async fn reset_clears_participants_and_keeps_config() {
        let state = state_with_credentials().await;
        state.store.sign_in("a@example.com").await;
        let Json(config) = config_handler(
            State(state.clone()),
            Json(EventConfigPatch {
                number_of_groups: Some(4),
                ..Default::default()
            }),
        )
        .await;

        reset_handler(State(state.clone())).await;

        assert!(state.store.participants().await.is_empty());
        assert_eq!(state.store.config().await, config);
    }
}
