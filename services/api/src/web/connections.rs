//! services/api/src/web/connections.rs
//!
//! Endpoints driving the connection gate between the caller and another user.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use job_portal_core::{ConnectionRequest, GateAction, PairState};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::rest::{ErrorBody, HttpError};
use crate::web::state::AppState;

/// The pair's state as seen from the caller's side.
#[derive(Serialize, ToSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PairStatus {
    None,
    PendingOutgoing,
    PendingIncoming,
    Connected,
}

impl PairStatus {
    pub fn for_caller(state: PairState, caller: Uuid) -> Self {
        match state {
            PairState::Unconnected => PairStatus::None,
            PairState::Pending { requester, .. } if requester == caller => {
                PairStatus::PendingOutgoing
            }
            PairState::Pending { .. } => PairStatus::PendingIncoming,
            PairState::Connected => PairStatus::Connected,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PairStatusResponse {
    pub user_id: Uuid,
    pub status: PairStatus,
}

#[derive(Serialize, ToSchema)]
pub struct RequestResponse {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub recipient_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<ConnectionRequest> for RequestResponse {
    fn from(r: ConnectionRequest) -> Self {
        Self {
            id: r.id,
            requester_id: r.requester_id,
            recipient_id: r.recipient_id,
            created_at: r.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ConnectionsResponse {
    pub connected_user_ids: Vec<Uuid>,
    pub incoming: Vec<RequestResponse>,
    pub outgoing: Vec<RequestResponse>,
}

#[utoipa::path(
    get,
    path = "/connections",
    responses((status = 200, description = "Connections and pending requests", body = ConnectionsResponse))
)]
pub async fn overview_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<ConnectionsResponse>, HttpError> {
    let overview = state.gate.overview(user_id).await?;
    Ok(Json(ConnectionsResponse {
        connected_user_ids: overview.connected_user_ids,
        incoming: overview.incoming.into_iter().map(Into::into).collect(),
        outgoing: overview.outgoing.into_iter().map(Into::into).collect(),
    }))
}

async fn run(
    state: &AppState,
    caller: Uuid,
    other: Uuid,
    action: GateAction,
) -> Result<Json<PairStatusResponse>, HttpError> {
    let pair_state = state.gate.act(caller, other, action).await?;
    Ok(Json(PairStatusResponse {
        user_id: other,
        status: PairStatus::for_caller(pair_state, caller),
    }))
}

/// Sends a connection request. If the other user already asked, both are connected.
#[utoipa::path(
    post,
    path = "/connections/{user_id}/request",
    params(("user_id" = Uuid, Path, description = "The other user")),
    responses(
        (status = 200, description = "Resulting pair state", body = PairStatusResponse),
        (status = 400, description = "Cannot connect with yourself", body = ErrorBody),
        (status = 404, description = "Unknown user", body = ErrorBody)
    )
)]
pub async fn request_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(other): Path<Uuid>,
) -> Result<Json<PairStatusResponse>, HttpError> {
    run(&state, user_id, other, GateAction::Request).await
}

#[utoipa::path(
    post,
    path = "/connections/{user_id}/accept",
    params(("user_id" = Uuid, Path, description = "The requester")),
    responses(
        (status = 200, description = "Now connected", body = PairStatusResponse),
        (status = 404, description = "No pending request from this user", body = ErrorBody)
    )
)]
pub async fn accept_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(other): Path<Uuid>,
) -> Result<Json<PairStatusResponse>, HttpError> {
    run(&state, user_id, other, GateAction::Accept).await
}

#[utoipa::path(
    post,
    path = "/connections/{user_id}/decline",
    params(("user_id" = Uuid, Path, description = "The requester")),
    responses(
        (status = 200, description = "Request declined", body = PairStatusResponse),
        (status = 404, description = "No pending request from this user", body = ErrorBody)
    )
)]
pub async fn decline_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(other): Path<Uuid>,
) -> Result<Json<PairStatusResponse>, HttpError> {
    run(&state, user_id, other, GateAction::Decline).await
}

#[utoipa::path(
    post,
    path = "/connections/{user_id}/cancel",
    params(("user_id" = Uuid, Path, description = "The recipient of the caller's request")),
    responses(
        (status = 200, description = "Request cancelled", body = PairStatusResponse),
        (status = 404, description = "No pending request to this user", body = ErrorBody)
    )
)]
pub async fn cancel_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(other): Path<Uuid>,
) -> Result<Json<PairStatusResponse>, HttpError> {
    run(&state, user_id, other, GateAction::Cancel).await
}

#[utoipa::path(
    delete,
    path = "/connections/{user_id}",
    params(("user_id" = Uuid, Path, description = "The connected user")),
    responses(
        (status = 204, description = "Connection removed"),
        (status = 404, description = "Not connected", body = ErrorBody)
    )
)]
pub async fn remove_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(other): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    state.gate.remove(user_id, other).await?;
    Ok(StatusCode::NO_CONTENT)
}
