//! services/api/src/web/applications.rs
//!
//! Endpoints for applying to jobs and managing the caller's applications.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use job_portal_core::{Application, ApplicationForm, SubmissionOutcome};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::rest::{ErrorBody, HttpError};
use crate::web::state::AppState;

#[derive(Deserialize, ToSchema, Default)]
pub struct ApplyRequest {
    /// Overrides the resume link stored on the profile.
    pub resume_link: Option<String>,
    pub cover_letter: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ApplicationResponse {
    pub id: Uuid,
    pub job_id: Uuid,
    pub status: String,
    pub resume_link: String,
    pub skills: Vec<String>,
    pub certifications: Vec<String>,
    pub cover_letter: Option<String>,
    pub remote_application_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Application> for ApplicationResponse {
    fn from(a: Application) -> Self {
        Self {
            id: a.id,
            job_id: a.job_id,
            status: a.status.to_string(),
            resume_link: a.resume_link,
            skills: a.skills,
            certifications: a.certifications,
            cover_letter: a.cover_letter,
            remote_application_id: a.remote_application_id,
            created_at: a.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct SubmissionResponse {
    pub application: ApplicationResponse,
    /// Set when the application was saved but the employer API did not take it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[utoipa::path(
    get,
    path = "/applications",
    responses((status = 200, description = "The caller's applications, newest first", body = [ApplicationResponse]))
)]
pub async fn list_applications_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<Vec<ApplicationResponse>>, HttpError> {
    let applications = state.applications.list_applications(user_id).await?;
    Ok(Json(applications.into_iter().map(Into::into).collect()))
}

/// Applies to a job with the caller's current profile.
///
/// The application is stored even if the employer API fails; the response then
/// carries a warning instead of an error.
#[utoipa::path(
    post,
    path = "/jobs/{id}/apply",
    params(("id" = Uuid, Path, description = "Local job id")),
    request_body = ApplyRequest,
    responses(
        (status = 201, description = "Application stored", body = SubmissionResponse),
        (status = 404, description = "Unknown job", body = ErrorBody),
        (status = 409, description = "Already applied", body = ErrorBody),
        (status = 422, description = "Profile incomplete", body = ErrorBody)
    )
)]
pub async fn apply_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(job_id): Path<Uuid>,
    body: Option<Json<ApplyRequest>>,
) -> Result<impl IntoResponse, HttpError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let submission = state
        .applications
        .submit_application(
            user_id,
            job_id,
            ApplicationForm {
                resume_link: req.resume_link,
                cover_letter: req.cover_letter,
            },
        )
        .await?;

    let warning = match submission.outcome {
        SubmissionOutcome::Submitted => None,
        SubmissionOutcome::SavedLocally { warning } => Some(warning),
    };
    Ok((
        StatusCode::CREATED,
        Json(SubmissionResponse {
            application: submission.application.into(),
            warning,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/applications/{id}/withdraw",
    params(("id" = Uuid, Path, description = "Application id")),
    responses(
        (status = 200, description = "Application withdrawn", body = ApplicationResponse),
        (status = 403, description = "Not the caller's application", body = ErrorBody),
        (status = 404, description = "Unknown application", body = ErrorBody),
        (status = 409, description = "Already withdrawn", body = ErrorBody)
    )
)]
pub async fn withdraw_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(application_id): Path<Uuid>,
) -> Result<Json<ApplicationResponse>, HttpError> {
    let application = state
        .applications
        .withdraw_application(user_id, application_id)
        .await?;
    Ok(Json(application.into()))
}
