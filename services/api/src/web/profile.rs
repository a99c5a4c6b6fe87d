//! services/api/src/web/profile.rs
//!
//! Endpoints for the authenticated user's own profile.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use chrono::{DateTime, Utc};
use job_portal_core::profiles::parse_comma_separated;
use job_portal_core::{Profile, ProfileDraft};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::rest::{ErrorBody, HttpError};
use crate::web::state::AppState;

/// Skills and certifications may be sent as a list or as one comma-separated string.
#[derive(Deserialize, ToSchema, Debug)]
#[serde(untagged)]
pub enum ListInput {
    List(Vec<String>),
    Text(String),
}

impl ListInput {
    fn into_entries(self) -> Vec<String> {
        match self {
            ListInput::List(items) => items,
            ListInput::Text(raw) => parse_comma_separated(&raw),
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct ProfileRequest {
    pub headline: Option<String>,
    pub summary: Option<String>,
    pub experience: Option<String>,
    pub resume_link: Option<String>,
    pub skills: Option<ListInput>,
    pub certifications: Option<ListInput>,
}

#[derive(Serialize, ToSchema)]
pub struct ProfileResponse {
    pub user_id: Uuid,
    pub headline: Option<String>,
    pub summary: Option<String>,
    pub experience: Option<String>,
    pub resume_link: Option<String>,
    pub skills: Vec<String>,
    pub certifications: Vec<String>,
    /// Whether the profile may be used to apply for jobs.
    pub complete: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<Profile> for ProfileResponse {
    fn from(profile: Profile) -> Self {
        let complete = profile.is_complete();
        Self {
            user_id: profile.user_id,
            headline: profile.headline,
            summary: profile.summary,
            experience: profile.experience,
            resume_link: profile.resume_link,
            skills: profile.skills,
            certifications: profile.certifications,
            complete,
            updated_at: profile.updated_at,
        }
    }
}

#[utoipa::path(
    get,
    path = "/profile",
    responses(
        (status = 200, description = "The caller's profile", body = ProfileResponse),
        (status = 404, description = "No profile yet", body = ErrorBody)
    )
)]
pub async fn get_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<ProfileResponse>, HttpError> {
    Ok(Json(state.profiles.get(user_id).await?.into()))
}

/// Creates or replaces the caller's profile.
#[utoipa::path(
    put,
    path = "/profile",
    request_body = ProfileRequest,
    responses(
        (status = 200, description = "Profile saved", body = ProfileResponse),
        (status = 400, description = "Invalid resume link", body = ErrorBody)
    )
)]
pub async fn put_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<ProfileRequest>,
) -> Result<Json<ProfileResponse>, HttpError> {
    let draft = ProfileDraft {
        headline: req.headline,
        summary: req.summary,
        experience: req.experience,
        resume_link: req.resume_link,
        skills: req.skills.map(ListInput::into_entries).unwrap_or_default(),
        certifications: req
            .certifications
            .map(ListInput::into_entries)
            .unwrap_or_default(),
    };
    Ok(Json(state.profiles.upsert(user_id, draft).await?.into()))
}

#[utoipa::path(
    delete,
    path = "/profile",
    responses(
        (status = 204, description = "Profile deleted"),
        (status = 404, description = "No profile to delete", body = ErrorBody)
    )
)]
pub async fn delete_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    state.profiles.delete(user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
