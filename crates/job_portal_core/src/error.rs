//! crates/job_portal_core/src/error.rs
//!
//! Typed errors returned by the core services. Port failures are wrapped,
//! never leaked as raw network or database errors.

use crate::domain::ApplicationStatus;
use crate::ports::PortError;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ApplicationError {
    #[error("Job {0} not found")]
    JobNotFound(Uuid),
    #[error("Application {0} not found")]
    ApplicationNotFound(Uuid),
    #[error("Please complete your profile before applying to jobs")]
    ProfileIncomplete,
    #[error("You have already applied for this job")]
    DuplicateApplication,
    #[error("You can only change your own applications")]
    NotOwner,
    #[error("Cannot withdraw application with status: {0}")]
    InvalidState(ApplicationStatus),
    #[error(transparent)]
    Port(#[from] PortError),
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("You cannot connect with yourself")]
    SelfConnection,
    #[error("User {0} not found")]
    UserNotFound(Uuid),
    #[error("No pending connection request found")]
    NoPendingRequest,
    #[error("No active connection found")]
    NotConnected,
    #[error(transparent)]
    Port(#[from] PortError),
}

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Connection required before sending messages")]
    UnauthorizedChat,
    #[error("Message content is empty")]
    EmptyMessage,
    #[error("Message is {0} characters long, the limit is {limit}", limit = crate::chat::MAX_MESSAGE_CHARS)]
    MessageTooLong(usize),
    #[error(transparent)]
    Port(#[from] PortError),
}

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("Resume link must be an http(s) URL")]
    InvalidResumeLink,
    #[error("No profile found")]
    NotFound,
    #[error(transparent)]
    Port(#[from] PortError),
}
