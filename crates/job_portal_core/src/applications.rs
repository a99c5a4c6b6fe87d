//! crates/job_portal_core/src/applications.rs
//!
//! The application workflow: validate, snapshot, persist, then forward to the
//! job source. Local persistence always wins; a failed forward downgrades the
//! result to a warning instead of undoing the application.

use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::{Application, ApplicationStatus, RemoteApplication};
use crate::error::ApplicationError;
use crate::ports::{DatabaseService, JobSourceService, PortError};

/// What the applicant typed on the apply form.
#[derive(Debug, Clone, Default)]
pub struct ApplicationForm {
    /// Overrides the profile's resume link when present.
    pub resume_link: Option<String>,
    pub cover_letter: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    /// Saved locally and accepted by the job source.
    Submitted,
    /// Saved locally; the job source could not be reached or refused it.
    SavedLocally { warning: String },
}

#[derive(Debug, Clone)]
pub struct Submission {
    pub application: Application,
    pub outcome: SubmissionOutcome,
}

pub struct ApplicationWorkflow {
    db: Arc<dyn DatabaseService>,
    source: Arc<dyn JobSourceService>,
    remote_timeout: std::time::Duration,
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

impl ApplicationWorkflow {
    pub fn new(
        db: Arc<dyn DatabaseService>,
        source: Arc<dyn JobSourceService>,
        remote_timeout: std::time::Duration,
    ) -> Self {
        Self {
            db,
            source,
            remote_timeout,
        }
    }

    /// Applies `user_id` to `job_id`.
    ///
    /// Checks run in order and the first failure wins: the profile must be
    /// complete, then no other non-withdrawn application may exist for the pair.
    pub async fn submit_application(
        &self,
        user_id: Uuid,
        job_id: Uuid,
        form: ApplicationForm,
    ) -> Result<Submission, ApplicationError> {
        let job = self.db.get_job(job_id).await.map_err(|e| match e {
            PortError::NotFound(_) => ApplicationError::JobNotFound(job_id),
            other => ApplicationError::Port(other),
        })?;

        let profile = match self.db.get_profile(user_id).await? {
            Some(profile) if profile.is_complete() => profile,
            _ => return Err(ApplicationError::ProfileIncomplete),
        };

        if self.db.find_active_application(user_id, job_id).await?.is_some() {
            return Err(ApplicationError::DuplicateApplication);
        }

        let resume_link = non_blank(form.resume_link.as_deref())
            .or_else(|| non_blank(profile.resume_link.as_deref()))
            .unwrap_or_default();

        let mut application = Application {
            id: Uuid::new_v4(),
            user_id,
            job_id,
            resume_link,
            skills: profile.skills.clone(),
            certifications: profile.certifications.clone(),
            cover_letter: non_blank(form.cover_letter.as_deref()),
            status: ApplicationStatus::Submitted,
            created_at: Utc::now(),
            remote_application_id: None,
        };

        // The store's unique index settles races the check above cannot see.
        self.db
            .insert_application(&application)
            .await
            .map_err(|e| match e {
                PortError::Conflict(_) => ApplicationError::DuplicateApplication,
                other => ApplicationError::Port(other),
            })?;
        info!(
            "Application {} saved for user {} on job {}",
            application.id, user_id, job.external_id
        );

        let remote = RemoteApplication {
            job_external_id: job.external_id.clone(),
            user_id,
            resume_link: application.resume_link.clone(),
            skills: application.skills.clone(),
            certifications: application.certifications.clone(),
            cover_letter: application.cover_letter.clone(),
        };

        let forwarded = match tokio::time::timeout(
            self.remote_timeout,
            self.source.submit_application(&remote),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(PortError::RemoteUnavailable(format!(
                "timed out after {:?}",
                self.remote_timeout
            ))),
        };

        let outcome = match forwarded {
            Ok(receipt) => {
                // The application exists on both sides by now; a lost remote id is only logged.
                if let Err(e) = self
                    .db
                    .set_remote_application_id(application.id, &receipt.application_id)
                    .await
                {
                    error!(
                        "Application {} was forwarded as {} but the remote id was not stored: {}",
                        application.id, receipt.application_id, e
                    );
                }
                application.remote_application_id = Some(receipt.application_id);
                SubmissionOutcome::Submitted
            }
            Err(e @ (PortError::RemoteUnavailable(_) | PortError::RemoteRejected(_))) => {
                warn!(
                    "Application {} saved locally but not forwarded: {}",
                    application.id, e
                );
                SubmissionOutcome::SavedLocally {
                    warning: format!("Application saved locally but API error: {}", e),
                }
            }
            Err(e) => {
                error!(
                    "Unexpected failure forwarding application {}: {}",
                    application.id, e
                );
                SubmissionOutcome::SavedLocally {
                    warning: "Application saved locally but could not be forwarded".to_string(),
                }
            }
        };

        Ok(Submission {
            application,
            outcome,
        })
    }

    /// Withdraws an application. Only its owner may do so, and only once.
    /// Nothing is sent to the job source; the local status is authoritative.
    pub async fn withdraw_application(
        &self,
        user_id: Uuid,
        application_id: Uuid,
    ) -> Result<Application, ApplicationError> {
        let mut application = self
            .db
            .get_application(application_id)
            .await
            .map_err(|e| match e {
                PortError::NotFound(_) => ApplicationError::ApplicationNotFound(application_id),
                other => ApplicationError::Port(other),
            })?;

        if application.user_id != user_id {
            return Err(ApplicationError::NotOwner);
        }
        if application.status != ApplicationStatus::Submitted {
            return Err(ApplicationError::InvalidState(application.status));
        }

        self.db
            .update_application_status(application_id, ApplicationStatus::Withdrawn)
            .await?;
        application.status = ApplicationStatus::Withdrawn;
        info!("Application {} withdrawn by user {}", application_id, user_id);
        Ok(application)
    }

    /// The user's applications, newest first.
    pub async fn list_applications(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<Application>, ApplicationError> {
        Ok(self.db.list_applications_for_user(user_id).await?)
    }
}
