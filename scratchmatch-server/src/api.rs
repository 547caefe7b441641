//! Public participant-facing HTTP API.
//!
//! Sign-in, registration, the reveal itself, a snapshot read for views, and
//! a long-poll endpoint for change notification.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use scratchmatch_core::Participant;

use crate::store::EventError;
use crate::sync::{wait_for_change, LONG_POLL_WINDOW};
use crate::AppState;

/// An error surfaced to API clients.
///
/// Persistence failures never appear here: the store logs and swallows them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("an email address is required")]
    InvalidEmail,
    #[error("no participant with that email")]
    UnknownParticipant,
    #[error("a full name and department are required")]
    IncompleteRegistration,
    #[error("registration has not been completed")]
    NotRegistered,
    #[error("participant has not been approved")]
    NotApproved,
    #[error("the event is not open")]
    EventClosed,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidEmail | ApiError::IncompleteRegistration => StatusCode::BAD_REQUEST,
            ApiError::UnknownParticipant => StatusCode::NOT_FOUND,
            ApiError::NotRegistered | ApiError::NotApproved | ApiError::EventClosed => {
                StatusCode::CONFLICT
            }
        }
    }

    /// Stable machine-readable code for clients.
    fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidEmail => "invalid_email",
            ApiError::IncompleteRegistration => "incomplete_registration",
            ApiError::UnknownParticipant => "unknown_participant",
            ApiError::NotRegistered => "not_registered",
            ApiError::NotApproved => "not_approved",
            ApiError::EventClosed => "event_closed",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.to_string(),
            "code": self.code(),
        });
        (self.status(), Json(body)).into_response()
    }
}

impl From<EventError> for ApiError {
    fn from(e: EventError) -> Self {
        match e {
            EventError::UnknownParticipant(_) => ApiError::UnknownParticipant,
            EventError::NotRegistered => ApiError::NotRegistered,
            EventError::NotApproved => ApiError::NotApproved,
            EventError::EventClosed => ApiError::EventClosed,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub full_name: String,
    pub department: String,
}

#[derive(Debug, Deserialize)]
pub struct ScratchRequest {
    pub email: String,
}

/// The slice of configuration a participant view needs.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventView {
    pub event_open: bool,
    pub number_of_groups: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantSnapshot {
    pub participant: Participant,
    pub event: EventView,
    /// Store version as of this read; pass to `/api/updates` to wait for
    /// the next change.
    pub version: u64,
}

#[derive(Debug, Deserialize)]
pub struct UpdatesQuery {
    #[serde(default)]
    pub version: u64,
}

#[derive(Debug, Serialize)]
pub struct UpdatesResponse {
    pub version: u64,
    pub changed: bool,
}

fn require_email(email: &str) -> Result<&str, ApiError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ApiError::InvalidEmail);
    }
    Ok(email)
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": "scratchmatch",
        "version": crate::service_version(),
    }))
}

async fn sign_in_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SignInRequest>,
) -> Result<Json<Participant>, ApiError> {
    let email = require_email(&request.email)?;
    Ok(Json(state.store.sign_in(email).await))
}

async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<Participant>, ApiError> {
    let email = require_email(&request.email)?;

    // Both profile fields are required on the registration form.
    let full_name = request.full_name.trim();
    let department = request.department.trim();
    if full_name.is_empty() || department.is_empty() {
        return Err(ApiError::IncompleteRegistration);
    }

    let participant = state.store.register(email, full_name, department).await?;
    Ok(Json(participant))
}

async fn scratch_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ScratchRequest>,
) -> Result<Json<Participant>, ApiError> {
    let email = require_email(&request.email)?;
    let participant = state.store.scratch(email).await?;
    Ok(Json(participant))
}

async fn participant_handler(
    State(state): State<Arc<AppState>>,
    Path(email): Path<String>,
) -> Result<Json<ParticipantSnapshot>, ApiError> {
    let participant = state
        .store
        .participant(&email)
        .await
        .ok_or(ApiError::UnknownParticipant)?;
    let config = state.store.config().await;

    Ok(Json(ParticipantSnapshot {
        participant,
        event: EventView {
            event_open: config.event_open,
            number_of_groups: config.number_of_groups,
        },
        version: state.store.version(),
    }))
}

/// Long-poll: responds when the store version advances past the one the
/// client has seen, or when the window elapses.
async fn updates_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UpdatesQuery>,
) -> Json<UpdatesResponse> {
    let rx = state.store.subscribe();
    match wait_for_change(rx, query.version, LONG_POLL_WINDOW).await {
        Some(version) => Json(UpdatesResponse {
            version,
            changed: true,
        }),
        None => Json(UpdatesResponse {
            version: state.store.version(),
            changed: false,
        }),
    }
}

pub fn api_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/signin", post(sign_in_handler))
        .route("/api/register", post(register_handler))
        .route("/api/scratch", post(scratch_handler))
        .route("/api/participants/:email", get(participant_handler))
        .route("/api/updates", get(updates_handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::EventStore;

    async fn test_state() -> Arc<AppState> {
        let store = Arc::new(EventStore::in_memory().await);
        Arc::new(AppState::new(store, None))
    }

    #[tokio::test]
    async fn sign_in_rejects_blank_email() {
        let state = test_state().await;
        let result = sign_in_handler(
            State(state),
            Json(SignInRequest {
                email: "   ".to_string(),
            }),
        )
        .await;
        assert_eq!(result.err(), Some(ApiError::InvalidEmail));
    }

    #[tokio::test]
    async fn sign_in_creates_a_record() {
        let state = test_state().await;
        let Json(participant) = sign_in_handler(
            State(state.clone()),
            Json(SignInRequest {
                email: "a@example.com".to_string(),
            }),
        )
        .await
        .unwrap();

        assert_eq!(participant.email, "a@example.com");
        assert!(!participant.registered);
        assert!(state.store.participant("a@example.com").await.is_some());
    }

    #[tokio::test]
    async fn register_unknown_email_is_not_found() {
        let state = test_state().await;
        let result = register_handler(
            State(state),
            Json(RegisterRequest {
                email: "ghost@example.com".to_string(),
                full_name: "Ghost".to_string(),
                department: "None".to_string(),
            }),
        )
        .await;
        assert_eq!(result.err(), Some(ApiError::UnknownParticipant));
    }

    #[tokio::test]
    async fn register_rejects_blank_profile_fields() {
        let state = test_state().await;
        state.store.sign_in("a@example.com").await;

        let result = register_handler(
            State(state.clone()),
            Json(RegisterRequest {
                email: "a@example.com".to_string(),
                full_name: "Alan Turing".to_string(),
                department: "   ".to_string(),
            }),
        )
        .await;
        assert_eq!(result.err(), Some(ApiError::IncompleteRegistration));

        // The record is untouched: still not registered.
        let participant = state.store.participant("a@example.com").await.unwrap();
        assert!(!participant.registered);
        assert!(participant.full_name.is_none());
    }

    #[tokio::test]
    async fn scratch_guard_failures_map_to_conflict() {
        let state = test_state().await;
        state.store.sign_in("a@example.com").await;

        let result = scratch_handler(
            State(state),
            Json(ScratchRequest {
                email: "a@example.com".to_string(),
            }),
        )
        .await;

        let err = result.err().expect("scratch should be rejected");
        assert_eq!(err, ApiError::NotRegistered);
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn snapshot_exposes_only_the_view_slice_of_config() {
        let state = test_state().await;
        state.store.sign_in("a@example.com").await;

        let Json(snapshot) =
            participant_handler(State(state.clone()), Path("a@example.com".to_string()))
                .await
                .unwrap();

        assert_eq!(snapshot.participant.email, "a@example.com");
        assert!(!snapshot.event.event_open);
        assert_eq!(snapshot.version, state.store.version());
    }

    #[tokio::test]
    async fn updates_long_poll_sees_a_mutation() {
        let state = test_state().await;
        let version = state.store.version();

        let poll = tokio::spawn(updates_handler(
            State(state.clone()),
            Query(UpdatesQuery { version }),
        ));
        tokio::task::yield_now().await;
        state.store.sign_in("a@example.com").await;

        let Json(response) = poll.await.unwrap();
        assert!(response.changed);
        assert!(response.version > version);
    }

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(ApiError::UnknownParticipant.code(), "unknown_participant");
        assert_eq!(ApiError::UnknownParticipant.status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::EventClosed.code(), "event_closed");
        assert_eq!(ApiError::InvalidEmail.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::IncompleteRegistration.code(),
            "incomplete_registration"
        );
        assert_eq!(
            ApiError::IncompleteRegistration.status(),
            StatusCode::BAD_REQUEST
        );
    }
}
