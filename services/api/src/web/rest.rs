//! services/api/src/web/rest.rs
//!
//! Shared pieces of the REST API: the error response, the health endpoint and
//! the master definition for the OpenAPI specification.

use crate::web::{applications, auth, chat, connections, jobs, profile, state::AppState};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use job_portal_core::{ApplicationError, ChatError, ConnectionError, PortError, ProfileError};
use serde::Serialize;
use std::sync::Arc;
use tracing::error;
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        profile::get_profile_handler,
        profile::put_profile_handler,
        profile::delete_profile_handler,
        jobs::list_jobs_handler,
        jobs::get_job_handler,
        jobs::refresh_jobs_handler,
        jobs::role_defaults_handler,
        applications::list_applications_handler,
        applications::apply_handler,
        applications::withdraw_handler,
        connections::overview_handler,
        connections::request_handler,
        connections::accept_handler,
        connections::decline_handler,
        connections::cancel_handler,
        connections::remove_handler,
        chat::list_messages_handler,
        chat::send_message_handler,
    ),
    components(
        schemas(
            ErrorBody,
            HealthResponse,
            auth::SignupRequest,
            auth::LoginRequest,
            auth::AuthResponse,
            profile::ProfileRequest,
            profile::ListInput,
            profile::ProfileResponse,
            jobs::JobResponse,
            jobs::JobFeedResponse,
            jobs::RefreshResponse,
            jobs::RoleDefaultsResponse,
            applications::ApplyRequest,
            applications::ApplicationResponse,
            applications::SubmissionResponse,
            connections::PairStatus,
            connections::PairStatusResponse,
            connections::RequestResponse,
            connections::ConnectionsResponse,
            chat::SendMessageRequest,
            chat::MessageResponse,
        )
    ),
    tags(
        (name = "Job Portal API", description = "Job feed, applications, connections and chat for employees.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Error Response
//=========================================================================================

/// The JSON body of every error response.
#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

/// An error ready to be sent to the client.
#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    message: String,
}

impl HttpError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

impl From<PortError> for HttpError {
    fn from(e: PortError) -> Self {
        match e {
            PortError::NotFound(what) => Self::new(StatusCode::NOT_FOUND, what),
            PortError::Conflict(what) => Self::new(StatusCode::CONFLICT, what),
            PortError::Unauthorized => Self::new(StatusCode::UNAUTHORIZED, "Login required"),
            other => {
                error!("Request failed on a port: {:?}", other);
                Self::internal()
            }
        }
    }
}

impl From<ApplicationError> for HttpError {
    fn from(e: ApplicationError) -> Self {
        let status = match e {
            ApplicationError::Port(port) => return port.into(),
            ApplicationError::JobNotFound(_) | ApplicationError::ApplicationNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            ApplicationError::ProfileIncomplete => StatusCode::UNPROCESSABLE_ENTITY,
            ApplicationError::DuplicateApplication | ApplicationError::InvalidState(_) => {
                StatusCode::CONFLICT
            }
            ApplicationError::NotOwner => StatusCode::FORBIDDEN,
        };
        Self::new(status, e.to_string())
    }
}

impl From<ConnectionError> for HttpError {
    fn from(e: ConnectionError) -> Self {
        let status = match e {
            ConnectionError::Port(port) => return port.into(),
            ConnectionError::SelfConnection => StatusCode::BAD_REQUEST,
            ConnectionError::UserNotFound(_)
            | ConnectionError::NoPendingRequest
            | ConnectionError::NotConnected => StatusCode::NOT_FOUND,
        };
        Self::new(status, e.to_string())
    }
}

impl From<ChatError> for HttpError {
    fn from(e: ChatError) -> Self {
        let status = match e {
            ChatError::Port(port) => return port.into(),
            ChatError::UnauthorizedChat => StatusCode::FORBIDDEN,
            ChatError::EmptyMessage | ChatError::MessageTooLong(_) => StatusCode::BAD_REQUEST,
        };
        Self::new(status, e.to_string())
    }
}

impl From<ProfileError> for HttpError {
    fn from(e: ProfileError) -> Self {
        let status = match e {
            ProfileError::Port(port) => return port.into(),
            ProfileError::InvalidResumeLink => StatusCode::BAD_REQUEST,
            ProfileError::NotFound => StatusCode::NOT_FOUND,
        };
        Self::new(status, e.to_string())
    }
}

//=========================================================================================
// Health
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub last_synced_at: Option<DateTime<Utc>>,
}

/// Liveness probe, also reporting when the job cache was last refreshed.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        last_synced_at: state.sync.last_synced_at(),
    })
}
