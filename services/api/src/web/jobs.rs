//! services/api/src/web/jobs.rs
//!
//! The job feed: every read goes through the sync engine first, so a stale
//! cache is refreshed lazily by whoever asks next.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use job_portal_core::scoring::role_defaults;
use job_portal_core::sync::ReconcileSummary;
use job_portal_core::{match_score, rank_feed, FeedFilter, Job, ScoredJob, SyncOutcome, SyncResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::web::rest::{ErrorBody, HttpError};
use crate::web::state::AppState;

#[derive(Deserialize, IntoParams, Default)]
pub struct FeedQuery {
    /// Case-insensitive substring of the role.
    pub role: Option<String>,
    /// Case-insensitive substring of the location.
    pub location: Option<String>,
    /// Case-insensitive substring of any required skill.
    pub skill: Option<String>,
    /// Show postings older than 30 days instead of current ones.
    #[serde(default)]
    pub archived: bool,
}

#[derive(Serialize, ToSchema)]
pub struct JobResponse {
    pub id: Uuid,
    pub external_id: String,
    pub title: String,
    pub role: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub required_skills: Vec<String>,
    pub required_certifications: Vec<String>,
    pub posted_at: DateTime<Utc>,
    /// Percentage of requirements covered by the caller's profile.
    pub match_score: f64,
    /// Status of the caller's current application, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_status: Option<String>,
}

impl JobResponse {
    fn new(job: Job, match_score: f64) -> Self {
        Self {
            id: job.id,
            external_id: job.external_id,
            title: job.title,
            role: job.role,
            company: job.company,
            location: job.location,
            description: job.description,
            required_skills: job.required_skills,
            required_certifications: job.required_certifications,
            posted_at: job.posted_at,
            match_score,
            application_status: None,
        }
    }
}

impl From<ScoredJob> for JobResponse {
    fn from(scored: ScoredJob) -> Self {
        Self::new(scored.job, scored.score)
    }
}

#[derive(Serialize, ToSchema)]
pub struct JobFeedResponse {
    pub jobs: Vec<JobResponse>,
    /// True when the employer API could not be reached and cached or sample data is shown.
    pub degraded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
    pub last_synced_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, ToSchema)]
pub struct RefreshResponse {
    /// One of `cache_hit`, `refreshed` or `degraded`.
    pub outcome: String,
    pub inserted: usize,
    pub updated: usize,
    pub removed: usize,
    pub retained: usize,
    pub total_jobs: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct RoleDefaultsResponse {
    pub role: String,
    pub skills: Vec<String>,
    pub certifications: Vec<String>,
}

fn degraded_notice(outcome: &SyncOutcome) -> Option<String> {
    match outcome {
        SyncOutcome::Degraded { seeded: true, .. } => Some(
            "The employer API is unavailable; showing sample job listings.".to_string(),
        ),
        SyncOutcome::Degraded { seeded: false, .. } => Some(
            "The employer API is unavailable; showing cached job listings.".to_string(),
        ),
        _ => None,
    }
}

/// The caller's feed, ranked by match score.
#[utoipa::path(
    get,
    path = "/jobs",
    params(FeedQuery),
    responses((status = 200, description = "Ranked job feed", body = JobFeedResponse))
)]
pub async fn list_jobs_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<JobFeedResponse>, HttpError> {
    let SyncResult { outcome, jobs } = state.sync.sync(false).await?;
    let profile = state.db.get_profile(user_id).await?;

    let filter = FeedFilter {
        role: query.role,
        location: query.location,
        skill: query.skill,
        archived: query.archived,
    };
    let ranked = rank_feed(profile.as_ref(), filter.apply(jobs, Utc::now()));

    Ok(Json(JobFeedResponse {
        jobs: ranked.into_iter().map(JobResponse::from).collect(),
        degraded: matches!(outcome, SyncOutcome::Degraded { .. }),
        notice: degraded_notice(&outcome),
        last_synced_at: state.sync.last_synced_at(),
    }))
}

#[utoipa::path(
    get,
    path = "/jobs/{id}",
    params(("id" = Uuid, Path, description = "Local job id")),
    responses(
        (status = 200, description = "The job with the caller's match score", body = JobResponse),
        (status = 404, description = "Unknown job", body = ErrorBody)
    )
)]
pub async fn get_job_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobResponse>, HttpError> {
    let job = state.db.get_job(job_id).await?;
    let profile = state.db.get_profile(user_id).await?;
    let application = state.db.find_active_application(user_id, job_id).await?;

    let score = match_score(profile.as_ref(), &job);
    let mut response = JobResponse::new(job, score);
    response.application_status = application.map(|a| a.status.to_string());
    Ok(Json(response))
}

/// Forces a sync with the employer API, ignoring the cache lifetime.
#[utoipa::path(
    post,
    path = "/jobs/refresh",
    responses((status = 200, description = "Result of the sync", body = RefreshResponse))
)]
pub async fn refresh_jobs_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<RefreshResponse>, HttpError> {
    let result = state.sync.sync(true).await?;
    let notice = degraded_notice(&result.outcome);
    let (outcome, summary) = match result.outcome {
        SyncOutcome::CacheHit => ("cache_hit", ReconcileSummary::default()),
        SyncOutcome::Refreshed(summary) => ("refreshed", summary),
        SyncOutcome::Degraded { .. } => ("degraded", ReconcileSummary::default()),
    };

    Ok(Json(RefreshResponse {
        outcome: outcome.to_string(),
        inserted: summary.inserted,
        updated: summary.updated,
        removed: summary.removed,
        retained: summary.retained,
        total_jobs: result.jobs.len(),
        notice,
    }))
}

/// Suggested skills and certifications for a role. Informational only.
#[utoipa::path(
    get,
    path = "/roles/{role}/defaults",
    params(("role" = String, Path, description = "Role name, case-insensitive")),
    responses(
        (status = 200, description = "Suggestions for the role", body = RoleDefaultsResponse),
        (status = 404, description = "No suggestions for this role", body = ErrorBody)
    )
)]
pub async fn role_defaults_handler(
    Path(role): Path<String>,
) -> Result<Json<RoleDefaultsResponse>, HttpError> {
    let defaults = role_defaults(&role).ok_or_else(|| {
        HttpError::new(
            StatusCode::NOT_FOUND,
            format!("No suggestions for role {}", role),
        )
    })?;
    Ok(Json(RoleDefaultsResponse {
        role: defaults.role.to_string(),
        skills: defaults.skills.iter().map(|s| s.to_string()).collect(),
        certifications: defaults
            .certifications
            .iter()
            .map(|s| s.to_string())
            .collect(),
    }))
}
