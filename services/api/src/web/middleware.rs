//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use job_portal_core::PortError;
use std::sync::Arc;
use tracing::{debug, error};

use crate::web::auth::session_cookie;
use crate::web::rest::HttpError;
use crate::web::state::AppState;

/// Resolves the `session` cookie to a user id and stores it as an
/// `Extension<Uuid>` for the handlers behind this layer.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, HttpError> {
    let user_id = authenticate(&state, req.headers()).await?;
    req.extensions_mut().insert(user_id);
    Ok(next.run(req).await)
}

async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<uuid::Uuid, HttpError> {
    let unauthorized = || HttpError::new(StatusCode::UNAUTHORIZED, "Login required");

    let session_id = session_cookie(headers).ok_or_else(unauthorized)?;
    match state.db.validate_auth_session(session_id).await {
        Ok(user_id) => Ok(user_id),
        Err(PortError::Unauthorized) => {
            debug!("Rejected unknown or expired session");
            Err(unauthorized())
        }
        Err(e) => {
            error!("Failed to validate auth session: {:?}", e);
            Err(unauthorized())
        }
    }
}
